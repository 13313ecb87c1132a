//! End-to-end engine scenarios with deterministic collaborators

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::{tempdir, TempDir};

use super::*;
use crate::constants::{DOMAIN_IOC_FILE, FUZZY_CORPUS_FILE, MD5_BLACKLIST_FILE};
use crate::logic::config::EngineConfig;
use crate::logic::model::{ClassifierError, SyscallModel};
use crate::logic::response::{Disposition, DispositionAction};
use crate::logic::rules::{PatternScanner, RuleError, RuleMatch};
use crate::logic::sample::loader::tests::elf_bytes;
use crate::logic::sample::Sample;
use crate::logic::sandbox::{BehaviorReport, CancelFlag, ProcessTrace, Sandbox, SandboxError};
use crate::logic::signatures::{FuzzyDigest, SignatureError, SignatureSync, SyncError};
use crate::logic::threat::{DecisionReason, Verdict, VerdictReport};

// ============================================================================
// FAKES
// ============================================================================

struct FixedScanner(Vec<RuleMatch>);

impl PatternScanner for FixedScanner {
    fn scan(&self, _content: &[u8]) -> Result<Vec<RuleMatch>, RuleError> {
        Ok(self.0.clone())
    }
}

/// Rule scan that hogs its thread
struct SlowScanner(Duration);

impl PatternScanner for SlowScanner {
    fn scan(&self, _content: &[u8]) -> Result<Vec<RuleMatch>, RuleError> {
        std::thread::sleep(self.0);
        Ok(vec![])
    }
}

/// Every corpus comparison reports the same distance
struct FixedDistance(u32);

impl FuzzyDigest for FixedDistance {
    fn digest(&self, content: &[u8]) -> String {
        format!("96:{}:fake", content.len())
    }

    fn compare(&self, _left: &str, _right: &str) -> Result<u32, SignatureError> {
        Ok(self.0)
    }
}

struct NoSync;

impl SignatureSync for NoSync {
    fn sync(&self) -> Result<(), SyncError> {
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum SandboxMode {
    Report,
    NoBehavior,
    /// Never finishes until the wait is cancelled
    Hang,
}

struct FakeSandbox {
    mode: SandboxMode,
    detonations: AtomicU32,
}

impl FakeSandbox {
    fn new(mode: SandboxMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            detonations: AtomicU32::new(0),
        })
    }

    fn count(&self) -> u32 {
        self.detonations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sandbox for FakeSandbox {
    async fn detonate(&self, _sample: &Sample, cancel: &CancelFlag) -> Result<BehaviorReport, SandboxError> {
        self.detonations.fetch_add(1, Ordering::SeqCst);

        match self.mode {
            SandboxMode::Report => Ok(BehaviorReport {
                task_id: 1,
                processes: vec![ProcessTrace {
                    pid: 100,
                    process_name: "sample".to_string(),
                    syscalls: vec!["execve".to_string(), "openat".to_string(), "read".to_string()],
                    opened_files: vec![],
                }],
            }),
            SandboxMode::NoBehavior => Err(SandboxError::NoBehavior { task_id: 1 }),
            SandboxMode::Hang => loop {
                if cancel.is_cancelled() {
                    return Err(SandboxError::Cancelled { task_id: 1 });
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            },
        }
    }
}

struct FixedModel(f32);

impl SyscallModel for FixedModel {
    fn predict(&self, _sequence: &[u32]) -> Result<f32, ClassifierError> {
        Ok(self.0)
    }
}

#[derive(Default)]
struct RecordingDisposition {
    calls: AtomicU32,
}

impl Disposition for RecordingDisposition {
    fn on_malicious(&self, _sample: &Sample, _report: &VerdictReport) -> DispositionAction {
        self.calls.fetch_add(1, Ordering::SeqCst);
        DispositionAction::Reported
    }
}

// ============================================================================
// FIXTURE
// ============================================================================

struct Fixture {
    dir: TempDir,
    config: EngineConfig,
}

impl Fixture {
    fn new(known_md5: &[&str]) -> Self {
        let dir = tempdir().unwrap();
        let config = EngineConfig::rooted_at(dir.path());

        fs::create_dir_all(&config.data_dir).unwrap();
        fs::write(config.data_dir.join(MD5_BLACKLIST_FILE), known_md5.join("\n")).unwrap();
        fs::write(config.data_dir.join(FUZZY_CORPUS_FILE), "96:ref:corpus\n").unwrap();
        fs::write(config.data_dir.join(DOMAIN_IOC_FILE), "bad-domain.com\n").unwrap();

        Self { dir, config }
    }

    fn write_sample(&self, name: &str, len: usize) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, elf_bytes(2, len)).unwrap();
        path
    }

    fn engine(
        &self,
        matches: Vec<RuleMatch>,
        sandbox: Arc<FakeSandbox>,
        probability: f32,
        disposition: Arc<RecordingDisposition>,
    ) -> Engine {
        self.engine_with_scanner(Arc::new(FixedScanner(matches)), sandbox, probability, disposition)
    }

    fn engine_with_scanner(
        &self,
        scanner: Arc<dyn PatternScanner>,
        sandbox: Arc<FakeSandbox>,
        probability: f32,
        disposition: Arc<RecordingDisposition>,
    ) -> Engine {
        Engine::builder(self.config.clone())
            .scanner(scanner)
            .fuzzy(Arc::new(FixedDistance(40)))
            .signature_sync(Arc::new(NoSync))
            .sandbox(sandbox)
            .model(Arc::new(FixedModel(probability)))
            .disposition(disposition)
            .build()
            .unwrap()
    }
}

fn md5_of(path: &Path) -> String {
    use md5::{Digest, Md5};
    hex::encode(Md5::digest(fs::read(path).unwrap()))
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[tokio::test]
async fn test_known_hash_is_malicious_without_detonation() {
    let staging = Fixture::new(&[]);
    let path = staging.write_sample("known.bin", 8192);
    let fixture = Fixture::new(&[&md5_of(&path)]);

    let sandbox = FakeSandbox::new(SandboxMode::Report);
    let disposition = Arc::new(RecordingDisposition::default());
    let engine = fixture.engine(vec![], sandbox.clone(), 0.0, disposition.clone());

    let report = engine.analyze_one(&path).await.unwrap();
    assert_eq!(report.verdict, Verdict::Malicious);
    assert_eq!(report.static_score, 100);
    assert_eq!(report.dynamic_score, None);
    assert_eq!(report.reason, DecisionReason::StaticCertain);
    assert_eq!(sandbox.count(), 0);
    assert_eq!(disposition.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_clean_sample_runs_dynamic_phase() {
    let fixture = Fixture::new(&[]);
    let path = fixture.write_sample("clean.bin", 8192);

    let sandbox = FakeSandbox::new(SandboxMode::Report);
    let disposition = Arc::new(RecordingDisposition::default());
    let engine = fixture.engine(vec![], sandbox.clone(), 0.3, disposition.clone());

    let report = engine.analyze_one(&path).await.unwrap();
    assert_eq!(report.static_score, 0);
    assert_eq!(report.dynamic_score, Some(60));
    assert_eq!(report.verdict, Verdict::Clean);
    assert_eq!(sandbox.count(), 1);
    assert_eq!(disposition.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_corroboration_threshold() {
    let fixture = Fixture::new(&[]);
    let path = fixture.write_sample("sample.bin", 2048);
    let disposition = Arc::new(RecordingDisposition::default());

    // 60 + 70 = 130
    let below = fixture.engine(
        vec![RuleMatch::new("anti-debug/vm", "vmdetect_misc")],
        FakeSandbox::new(SandboxMode::Report),
        0.35,
        disposition.clone(),
    );
    let report = below.analyze_one(&path).await.unwrap();
    assert_eq!((report.static_score, report.dynamic_score), (60, Some(70)));
    assert_eq!(report.verdict, Verdict::Clean);

    // 90 + 80 = 170
    let at = fixture.engine(
        vec![RuleMatch::new("packer", "UPX"), RuleMatch::new("anti-debug/vm", "anti_dbg")],
        FakeSandbox::new(SandboxMode::Report),
        0.4,
        disposition.clone(),
    );
    let report = at.analyze_one(&path).await.unwrap();
    assert_eq!((report.static_score, report.dynamic_score), (90, Some(80)));
    assert_eq!(report.verdict, Verdict::Malicious);
    assert_eq!(report.reason, DecisionReason::Corroborated);
}

#[tokio::test]
async fn test_half_probability_is_dynamic_certainty() {
    let fixture = Fixture::new(&[]);
    let path = fixture.write_sample("edge.bin", 2048);

    let engine = fixture.engine(
        vec![],
        FakeSandbox::new(SandboxMode::Report),
        0.5,
        Arc::new(RecordingDisposition::default()),
    );

    let report = engine.analyze_one(&path).await.unwrap();
    assert_eq!(report.dynamic_score, Some(100));
    assert_eq!(report.reason, DecisionReason::DynamicCertain);
}

#[tokio::test]
async fn test_dynamic_failure_keeps_static_score() {
    let fixture = Fixture::new(&[]);
    let path = fixture.write_sample("nobehavior.bin", 2048);

    let engine = fixture.engine(
        vec![RuleMatch::new("anti-debug/vm", "vmdetect_misc")],
        FakeSandbox::new(SandboxMode::NoBehavior),
        0.0,
        Arc::new(RecordingDisposition::default()),
    );

    let err = engine.analyze_one(&path).await.unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Dynamic { static_score: 60, source: DynamicError::Sandbox(SandboxError::NoBehavior { .. }) }
    ));
    assert_eq!(err.static_score(), Some(60));
}

#[tokio::test]
async fn test_single_file_errors_surface() {
    let fixture = Fixture::new(&[]);
    let engine = fixture.engine(
        vec![],
        FakeSandbox::new(SandboxMode::Report),
        0.0,
        Arc::new(RecordingDisposition::default()),
    );

    let err = engine.analyze_one(&fixture.dir.path().join("missing")).await.unwrap_err();
    assert!(matches!(err, AnalysisError::Load(_)));
}

#[tokio::test]
async fn test_batch_isolates_unreadable_file() {
    let fixture = Fixture::new(&[]);
    let mut paths = Vec::new();
    for i in 0..10 {
        if i == 2 {
            paths.push(fixture.dir.path().join("unreadable"));
        } else {
            paths.push(fixture.write_sample(&format!("file{}.bin", i), 1024));
        }
    }

    let engine = fixture.engine(
        vec![],
        FakeSandbox::new(SandboxMode::Report),
        0.1,
        Arc::new(RecordingDisposition::default()),
    );
    let session = engine.analyze_batch(paths).await;

    assert_eq!(session.progress(), 100.0);
    assert!(!session.is_running());
    assert_eq!(session.results().len(), 9);

    let errors: Vec<_> = session.logs().into_iter().filter(|l| l.level == LogLevel::Error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path.as_deref(), Some(fixture.dir.path().join("unreadable").as_path()));
}

#[tokio::test]
async fn test_batch_records_detections() {
    let fixture = Fixture::new(&[]);
    let paths = vec![fixture.write_sample("a.bin", 1024), fixture.write_sample("b.bin", 1024)];
    let disposition = Arc::new(RecordingDisposition::default());

    let engine = fixture.engine(
        vec![RuleMatch::new("malware", "Linux_Backdoor_Generic")],
        FakeSandbox::new(SandboxMode::Report),
        0.0,
        disposition.clone(),
    );
    let session = engine.analyze_batch(paths.clone()).await;

    assert_eq!(session.detected(), paths);
    assert_eq!(disposition.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_background_batch_can_be_cancelled() {
    let fixture = Fixture::new(&[]);
    let paths = vec![fixture.write_sample("a.bin", 1024), fixture.write_sample("b.bin", 1024)];
    let sandbox = FakeSandbox::new(SandboxMode::Hang);

    let engine = Arc::new(fixture.engine(vec![], sandbox.clone(), 0.0, Arc::new(RecordingDisposition::default())));
    let session = engine.start_batch(paths);
    assert!(session.is_running());

    while sandbox.count() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    session.cancel();

    while session.is_running() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(sandbox.count(), 1);
    assert_eq!(session.progress(), 100.0);
    assert!(session.results().is_empty());
}

#[tokio::test]
async fn test_shutdown_cancels_running_batches() {
    let fixture = Fixture::new(&[]);
    let paths = vec![fixture.write_sample("a.bin", 1024)];
    let sandbox = FakeSandbox::new(SandboxMode::Hang);

    let engine = Arc::new(fixture.engine(vec![], sandbox.clone(), 0.0, Arc::new(RecordingDisposition::default())));
    let session = engine.start_batch(paths);

    while sandbox.count() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    engine.shutdown().unwrap();

    while session.is_running() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(session.is_cancelled());
}

#[tokio::test]
async fn test_shutdown_reaches_batch_not_yet_started() {
    let fixture = Fixture::new(&[]);
    let paths = vec![fixture.write_sample("a.bin", 1024), fixture.write_sample("b.bin", 1024)];
    let sandbox = FakeSandbox::new(SandboxMode::Hang);

    let engine = Arc::new(fixture.engine(vec![], sandbox.clone(), 0.0, Arc::new(RecordingDisposition::default())));
    // Single-threaded runtime: the batch task has not been polled yet
    let session = engine.start_batch(paths);
    engine.shutdown().unwrap();

    while session.is_running() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(session.is_cancelled());
    assert_eq!(sandbox.count(), 0);
    assert_eq!(session.progress(), 100.0);
}

#[tokio::test]
async fn test_slow_rule_scan_does_not_stall_runtime() {
    let fixture = Fixture::new(&[]);
    let path = fixture.write_sample("slow.bin", 1024);

    let engine = fixture.engine_with_scanner(
        Arc::new(SlowScanner(Duration::from_millis(300))),
        FakeSandbox::new(SandboxMode::Report),
        0.0,
        Arc::new(RecordingDisposition::default()),
    );

    let ticks = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&ticks);
    let ticker = tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_millis(10)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    let report = engine.analyze_one(&path).await.unwrap();
    ticker.abort();

    assert_eq!(report.static_score, 0);
    assert!(ticks.load(Ordering::SeqCst) >= 10);
}
