//! Analysis Session
//!
//! Shared state of one batch. Written by the batch driver, polled by
//! whoever started it (CLI, watcher, UI). All access goes through one mutex.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::logic::sandbox::CancelFlag;
use crate::logic::threat::VerdictReport;

use super::progress::{Checkpoint, Progress};
use super::types::{LogEntry, LogLevel};

struct SessionState {
    files: Vec<PathBuf>,
    progress: Progress,
    logs: Vec<LogEntry>,
    running: bool,
    results: Vec<VerdictReport>,
    detected: Vec<PathBuf>,
}

#[derive(Clone)]
pub struct AnalysisSession {
    state: Arc<Mutex<SessionState>>,
    cancel: CancelFlag,
}

impl AnalysisSession {
    pub fn new(files: Vec<PathBuf>) -> Self {
        let progress = Progress::new(files.len());
        Self {
            state: Arc::new(Mutex::new(SessionState {
                files,
                progress,
                logs: Vec::new(),
                running: false,
                results: Vec::new(),
                detected: Vec::new(),
            })),
            cancel: CancelFlag::new(),
        }
    }

    // ========================================================================
    // POLLING ACCESSORS
    // ========================================================================

    pub fn files(&self) -> Vec<PathBuf> {
        self.state.lock().files.clone()
    }

    /// Batch progress in percent, 0 - 100
    pub fn progress(&self) -> f64 {
        self.state.lock().progress.value()
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.state.lock().logs.clone()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn results(&self) -> Vec<VerdictReport> {
        self.state.lock().results.clone()
    }

    /// Files found malicious and not yet dealt with
    pub fn detected(&self) -> Vec<PathBuf> {
        self.state.lock().detected.clone()
    }

    pub fn forget_detected(&self, path: &Path) -> bool {
        let mut state = self.state.lock();
        let before = state.detected.len();
        state.detected.retain(|p| p != path);
        state.detected.len() != before
    }

    /// Abandon the rest of the batch, including an in-flight sandbox wait
    pub fn cancel(&self) {
        log::info!("[Session] Cancellation requested");
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    // ========================================================================
    // DRIVER SIDE
    // ========================================================================

    pub(crate) fn set_running(&self, running: bool) {
        self.state.lock().running = running;
    }

    pub(crate) fn log(&self, level: LogLevel, message: impl Into<String>, path: Option<&Path>) {
        let entry = LogEntry::new(level, message, path.map(Path::to_path_buf));
        self.state.lock().logs.push(entry);
    }

    pub(crate) fn checkpoint(&self, index: usize, checkpoint: Checkpoint) {
        self.state.lock().progress.checkpoint(index, checkpoint);
    }

    pub(crate) fn finish_slot(&self, index: usize) {
        self.state.lock().progress.finish_slot(index);
    }

    pub(crate) fn record(&self, report: VerdictReport) {
        let mut state = self.state.lock();
        if report.verdict.is_malicious() {
            state.detected.push(report.path.clone());
        }
        state.results.push(report);
    }
}
