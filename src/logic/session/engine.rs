//! Analysis Engine
//!
//! Drives one sample at a time through
//! `Loading -> StaticScoring -> (Malicious | DynamicScoring) -> (Malicious | Clean)`.
//! Static analysis always finishes before a sample is detonated, and a sample
//! already certain from its static score is never sent to the sandbox.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::logic::config::EngineConfig;
use crate::logic::model::{BehaviorClassifier, OnnxSyscallModel, SyscallModel};
use crate::logic::response::{Disposition, LogDisposition};
use crate::logic::rules::{PatternScanner, RuleEngine};
use crate::logic::sample::{load_sample, Sample};
use crate::logic::sandbox::{CancelFlag, Sandbox, SandboxClient};
use crate::logic::signatures::{FuzzyDigest, GitSignatureSync, SignatureDatabase, SignatureSync, SsdeepDigest};
use crate::logic::threat::{decide_combined, decide_static, Decision, ScoreRecord, StaticScorer, VerdictReport};

use super::progress::Checkpoint;
use super::state::AnalysisSession;
use super::types::{AnalysisError, DynamicError, EngineError, LogLevel};

// ============================================================================
// BUILDER
// ============================================================================

/// Assembles an [`Engine`]; every collaborator not supplied gets its production default
pub struct EngineBuilder {
    config: EngineConfig,
    scanner: Option<Arc<dyn PatternScanner>>,
    fuzzy: Option<Arc<dyn FuzzyDigest>>,
    sync: Option<Arc<dyn SignatureSync>>,
    sandbox: Option<Arc<dyn Sandbox>>,
    model: Option<Arc<dyn SyscallModel>>,
    disposition: Option<Arc<dyn Disposition>>,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            scanner: None,
            fuzzy: None,
            sync: None,
            sandbox: None,
            model: None,
            disposition: None,
        }
    }

    #[must_use]
    pub fn scanner(mut self, scanner: Arc<dyn PatternScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    #[must_use]
    pub fn fuzzy(mut self, fuzzy: Arc<dyn FuzzyDigest>) -> Self {
        self.fuzzy = Some(fuzzy);
        self
    }

    #[must_use]
    pub fn signature_sync(mut self, sync: Arc<dyn SignatureSync>) -> Self {
        self.sync = Some(sync);
        self
    }

    #[must_use]
    pub fn sandbox(mut self, sandbox: Arc<dyn Sandbox>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    #[must_use]
    pub fn model(mut self, model: Arc<dyn SyscallModel>) -> Self {
        self.model = Some(model);
        self
    }

    #[must_use]
    pub fn disposition(mut self, disposition: Arc<dyn Disposition>) -> Self {
        self.disposition = Some(disposition);
        self
    }

    /// Initialise the engine. Any failure here is fatal to the caller.
    pub fn build(self) -> Result<Engine, EngineError> {
        let config = self.config;

        let scanner: Arc<dyn PatternScanner> = match self.scanner {
            Some(scanner) => scanner,
            None => {
                let rules = RuleEngine::load(&config.rule_layout())?;
                for skipped in rules.skipped() {
                    log::warn!("[Engine] Rule statement skipped: {} ({})", skipped.statement, skipped.reason);
                }
                Arc::new(rules)
            }
        };

        let fuzzy = self.fuzzy.unwrap_or_else(|| Arc::new(SsdeepDigest));
        let sync = self
            .sync
            .unwrap_or_else(|| Arc::new(GitSignatureSync::new(config.signature_repo.clone(), config.data_dir.clone())));

        let sandbox: Arc<dyn Sandbox> = match self.sandbox {
            Some(sandbox) => sandbox,
            None => Arc::new(SandboxClient::new(config.sandbox.clone())?),
        };

        let model: Arc<dyn SyscallModel> = match self.model {
            Some(model) => model,
            None => Arc::new(OnnxSyscallModel::load(&config.model_path)?),
        };

        let disposition = self.disposition.unwrap_or_else(|| Arc::new(LogDisposition));

        log::info!("[Engine] Initialised (signatures: {})", config.data_dir.display());

        Ok(Engine {
            scorer: Arc::new(StaticScorer::new(SignatureDatabase::new(&config.data_dir), fuzzy.clone(), sync)),
            classifier: Arc::new(BehaviorClassifier::new(model)),
            config,
            scanner,
            fuzzy,
            sandbox,
            disposition,
            sessions: Mutex::new(Vec::new()),
        })
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct Engine {
    config: EngineConfig,
    scanner: Arc<dyn PatternScanner>,
    fuzzy: Arc<dyn FuzzyDigest>,
    scorer: Arc<StaticScorer>,
    sandbox: Arc<dyn Sandbox>,
    classifier: Arc<BehaviorClassifier>,
    disposition: Arc<dyn Disposition>,
    /// Cancel handles of batches still running
    sessions: Mutex<Vec<CancelFlag>>,
}

impl Engine {
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// Initialise with every production collaborator
    pub fn initialize(config: EngineConfig) -> Result<Self, EngineError> {
        EngineBuilder::new(config).build()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyse one file; errors are returned to the caller
    pub async fn analyze_one(&self, path: &Path) -> Result<VerdictReport, AnalysisError> {
        let (sample, report) = self.analyze_sample(path, &CancelFlag::new(), None).await?;
        log::info!("[Engine] {}", report);

        if report.verdict.is_malicious() {
            self.dispose(sample, report.clone()).await;
        }
        Ok(report)
    }

    /// Analyse `paths` in order and return the finished session
    pub async fn analyze_batch(&self, paths: Vec<PathBuf>) -> AnalysisSession {
        let session = AnalysisSession::new(paths);
        self.register(&session);
        self.run_batch(&session).await;
        session
    }

    /// Start a batch in the background; poll the returned session for progress
    pub fn start_batch(self: &Arc<Self>, paths: Vec<PathBuf>) -> AnalysisSession {
        let session = AnalysisSession::new(paths);
        session.set_running(true);
        self.register(&session);

        let engine = Arc::clone(self);
        let driven = session.clone();
        tokio::spawn(async move {
            engine.run_batch(&driven).await;
        });

        session
    }

    /// Cancel every running batch
    pub fn shutdown(&self) -> Result<(), EngineError> {
        let sessions = std::mem::take(&mut *self.sessions.lock());
        if !sessions.is_empty() {
            log::info!("[Engine] Cancelling {} running batch(es)", sessions.len());
        }
        for cancel in sessions {
            cancel.cancel();
        }

        log::info!("[Engine] Shut down");
        Ok(())
    }

    // ========================================================================
    // BATCH DRIVER
    // ========================================================================

    /// Make `session` reachable from [`Engine::shutdown`]
    fn register(&self, session: &AnalysisSession) {
        self.sessions.lock().push(session.cancel_flag().clone());
    }

    async fn run_batch(&self, session: &AnalysisSession) {
        session.set_running(true);

        let files = session.files();
        log::info!("[Engine] Batch of {} file(s) started", files.len());

        for (index, path) in files.iter().enumerate() {
            if session.is_cancelled() {
                session.log(LogLevel::Warning, "batch cancelled", None);
                if let Some(last) = files.len().checked_sub(1) {
                    session.finish_slot(last);
                }
                break;
            }

            match self.analyze_sample(path, session.cancel_flag(), Some((session, index))).await {
                Ok((sample, report)) => {
                    let level = if report.verdict.is_malicious() { LogLevel::Warning } else { LogLevel::Info };
                    session.log(level, report.to_string(), Some(path));
                    session.record(report.clone());

                    if report.verdict.is_malicious() {
                        self.dispose(sample, report).await;
                    }
                }
                Err(e) => {
                    log::error!("[Engine] {}: {}", path.display(), e);
                    session.log(LogLevel::Error, format!("{}: {}", path.display(), e), Some(path));
                }
            }

            session.finish_slot(index);
        }

        self.sessions.lock().retain(|c| !c.same_as(session.cancel_flag()));
        session.set_running(false);
        log::info!("[Engine] Batch finished");
    }

    // ========================================================================
    // PER-SAMPLE PIPELINE
    // ========================================================================

    async fn analyze_sample(
        &self,
        path: &Path,
        cancel: &CancelFlag,
        progress: Option<(&AnalysisSession, usize)>,
    ) -> Result<(Arc<Sample>, VerdictReport), AnalysisError> {
        let mark = |checkpoint: Checkpoint| {
            if let Some((session, index)) = progress {
                session.checkpoint(index, checkpoint);
            }
        };

        // Loading
        let fuzzy = Arc::clone(&self.fuzzy);
        let owned = path.to_path_buf();
        let sample = Arc::new(off_runtime(move || load_sample(&owned, fuzzy.as_ref())).await??);
        log::info!("[Engine] Analysing\n{}", sample);
        mark(Checkpoint::Loaded);

        // Static scoring
        let (scorer, scanner, scored) = (Arc::clone(&self.scorer), Arc::clone(&self.scanner), Arc::clone(&sample));
        let record = off_runtime(move || scorer.score(&scored, scanner.as_ref())).await??;
        log::info!("[Engine] Static score of {}: {}", sample.file_name(), record.score);
        mark(Checkpoint::StaticScored);

        let thresholds = &self.config.thresholds;
        if let Some(decision) = decide_static(record.score, thresholds) {
            let report = verdict_report(&sample, record, None, decision);
            return Ok((sample, report));
        }

        // Dynamic scoring
        let static_score = record.score;
        let dynamic = |source: DynamicError| AnalysisError::Dynamic { static_score, source };

        let behavior = self
            .sandbox
            .detonate(&sample, cancel)
            .await
            .map_err(|e| dynamic(e.into()))?;
        let classifier = Arc::clone(&self.classifier);
        let assessment = off_runtime(move || classifier.assess(&behavior))
            .await?
            .map_err(|e| dynamic(e.into()))?;
        log::info!(
            "[Engine] Dynamic score of {}: {} (max p = {:.3})",
            sample.file_name(),
            assessment.score,
            assessment.max_probability
        );
        mark(Checkpoint::DynamicScored);

        let decision = decide_combined(static_score, assessment.score, thresholds);
        let report = verdict_report(&sample, record, Some(assessment.score), decision);
        Ok((sample, report))
    }

    /// Hand a malicious sample to the disposition off the async runtime
    async fn dispose(&self, sample: Arc<Sample>, report: VerdictReport) {
        let disposition = Arc::clone(&self.disposition);
        let path = report.path.clone();

        match tokio::task::spawn_blocking(move || disposition.on_malicious(&sample, &report)).await {
            Ok(action) => log::info!("[Engine] Disposition of {}: {:?}", path.display(), action),
            Err(e) => log::error!("[Engine] Disposition of {} failed: {}", path.display(), e),
        }
    }
}

/// Run a blocking stage (file I/O, hashing, rule scan, inference) on the blocking pool
async fn off_runtime<T, F>(stage: F) -> Result<T, AnalysisError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(stage)
        .await
        .map_err(|e| AnalysisError::Worker(e.to_string()))
}

fn verdict_report(sample: &Sample, record: ScoreRecord, dynamic_score: Option<u32>, decision: Decision) -> VerdictReport {
    VerdictReport {
        path: sample.path().to_path_buf(),
        sha256: sample.sha256().to_string(),
        verdict: decision.verdict,
        static_score: record.score,
        dynamic_score,
        reason: decision.reason,
        findings: record.reasons,
    }
}
