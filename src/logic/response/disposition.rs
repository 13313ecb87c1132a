//! Dispositions
//!
//! What happens to a file once it is found malicious. The engine only
//! calls [`Disposition::on_malicious`]; terminal prompts and quarantine
//! moves live here so the engine never blocks on user input itself.

use std::fs;
use std::io::{BufRead, Write};

use parking_lot::Mutex;

use crate::logic::sample::Sample;
use crate::logic::threat::VerdictReport;

use super::file_quarantine::QuarantineManager;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispositionAction {
    /// Reported only, file left in place
    Reported,
    Kept,
    Deleted,
    Quarantined { id: String },
    Failed(String),
}

/// Callback invoked for every malicious verdict
pub trait Disposition: Send + Sync {
    fn on_malicious(&self, sample: &Sample, report: &VerdictReport) -> DispositionAction;
}

/// Logs the detection and leaves the file alone
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDisposition;

impl Disposition for LogDisposition {
    fn on_malicious(&self, _sample: &Sample, report: &VerdictReport) -> DispositionAction {
        log::error!("[MALWARE] {}", report);
        DispositionAction::Reported
    }
}

/// Asks on the terminal whether the file should be deleted
pub struct PromptDisposition {
    input: Mutex<Box<dyn BufRead + Send>>,
}

impl PromptDisposition {
    pub fn stdin() -> Self {
        Self::with_input(Box::new(std::io::BufReader::new(std::io::stdin())))
    }

    pub fn with_input(input: Box<dyn BufRead + Send>) -> Self {
        Self { input: Mutex::new(input) }
    }

    /// Ask until the answer is yes or no; end of input counts as no
    fn confirm(&self, question: &str) -> bool {
        let mut input = self.input.lock();
        loop {
            print!("{} [yes/no] ", question);
            let _ = std::io::stdout().flush();

            let mut answer = String::new();
            match input.read_line(&mut answer) {
                Ok(0) | Err(_) => return false,
                Ok(_) => {}
            }
            match answer.trim().to_lowercase().as_str() {
                "yes" | "y" => return true,
                "no" | "n" => return false,
                _ => continue,
            }
        }
    }
}

impl Disposition for PromptDisposition {
    fn on_malicious(&self, sample: &Sample, report: &VerdictReport) -> DispositionAction {
        log::error!("[MALWARE] {}", report);

        if !self.confirm(&format!("{} is a malware. Do you want to delete this file?", sample.file_name())) {
            log::info!("[Disposition] Keeping {}", sample.path().display());
            return DispositionAction::Kept;
        }

        match fs::remove_file(sample.path()) {
            Ok(()) => {
                log::info!("[Disposition] Deleted {}", sample.path().display());
                DispositionAction::Deleted
            }
            Err(e) => {
                log::error!("[Disposition] Failed to delete {}: {}", sample.path().display(), e);
                DispositionAction::Failed(e.to_string())
            }
        }
    }
}

/// Daemon mode: move the file into quarantine without asking
pub struct QuarantineDisposition {
    manager: Mutex<QuarantineManager>,
}

impl QuarantineDisposition {
    pub fn new(manager: QuarantineManager) -> Self {
        Self {
            manager: Mutex::new(manager),
        }
    }
}

impl Disposition for QuarantineDisposition {
    fn on_malicious(&self, sample: &Sample, report: &VerdictReport) -> DispositionAction {
        log::error!("[MALWARE] {}", report);

        match self.manager.lock().quarantine(sample.path(), sample.sha256(), report.reason.as_str()) {
            Ok(entry) => DispositionAction::Quarantined { id: entry.id },
            Err(e) => {
                log::error!("[Disposition] Quarantine failed: {}", e);
                DispositionAction::Failed(e.to_string())
            }
        }
    }
}
