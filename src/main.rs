//! malscan - Command-line driver
//!
//! Single file, fast/full system sweep, or daemon watch over the engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};

use malscan_core::constants::{self, APP_NAME, APP_VERSION};
use malscan_core::logic::response::{default_quarantine_dir, PromptDisposition, QuarantineDisposition, QuarantineManager};
use malscan_core::logic::scan::{collect_all, fast_scan_roots, full_scan_roots, watch_roots, FileWatch};
use malscan_core::logic::signatures::{GitSignatureSync, SignatureSync};
use malscan_core::{AnalysisSession, Engine, EngineConfig, LogLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
enum Verbosity {
    Debug,
    Info,
    Warning,
}

impl Verbosity {
    fn filter(self) -> &'static str {
        match self {
            Verbosity::Debug => "debug",
            Verbosity::Info => "info",
            Verbosity::Warning => "warn",
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = APP_NAME, version = APP_VERSION, about = "Static + behavioral malware scanner", arg_required_else_help = true)]
struct Args {
    /// File to analyse
    #[arg(value_name = "FILE", conflicts_with_all = ["fast_scan", "full_scan", "daemon"])]
    file: Option<PathBuf>,

    /// Scan the most probable places (/home, /opt, $PATH)
    #[arg(short = 's', long, conflicts_with_all = ["full_scan", "daemon"])]
    fast_scan: bool,

    /// Scan the whole file system
    #[arg(long, conflicts_with = "daemon")]
    full_scan: bool,

    /// Watch $PATH and ~/Downloads, analysing every new file
    #[arg(short = 'd', long)]
    daemon: bool,

    /// Synchronise the signature database before starting
    #[arg(long)]
    sync: bool,

    #[arg(short = 'l', long = "log-level", value_enum, default_value_t = Verbosity::Info)]
    log_level: Verbosity,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level.filter())).init();
    log::info!("Starting {} v{}", APP_NAME, APP_VERSION);

    let config = EngineConfig::default();

    if args.sync || !config.data_dir.exists() {
        GitSignatureSync::new(config.signature_repo.clone(), config.data_dir.clone())
            .sync()
            .context("signature database synchronisation failed")?;
        if args.file.is_none() && !args.fast_scan && !args.full_scan && !args.daemon {
            return Ok(());
        }
    }

    if args.daemon {
        return run_daemon(config).await;
    }

    let engine = Engine::builder(config)
        .disposition(Arc::new(PromptDisposition::stdin()))
        .build()
        .context("can't initialize the engine")?;

    let outcome = if let Some(file) = &args.file {
        analyze_file(&engine, file).await
    } else if args.fast_scan {
        log::info!("Fast scan starting...");
        sweep(&engine, collect_all(&fast_scan_roots())).await;
        Ok(())
    } else if args.full_scan {
        log::info!("Full scan starting...");
        sweep(&engine, collect_all(&full_scan_roots())).await;
        Ok(())
    } else {
        Ok(())
    };

    engine.shutdown().context("can't stop the engine properly")?;
    outcome
}

async fn analyze_file(engine: &Engine, file: &Path) -> Result<()> {
    let report = engine
        .analyze_one(file)
        .await
        .with_context(|| format!("analysis of {} failed", file.display()))?;
    println!("{}", report);
    Ok(())
}

/// Analyse every file found; per-file failures only land in the session log
async fn sweep(engine: &Engine, paths: Vec<PathBuf>) {
    let session = engine.analyze_batch(paths).await;
    summarize(&session);
}

fn summarize(session: &AnalysisSession) {
    let errors = session.logs().iter().filter(|l| l.level == LogLevel::Error).count();
    let detected = session.detected();

    log::info!(
        "Scan done: {} analysed, {} failed, {} malicious",
        session.results().len(),
        errors,
        detected.len()
    );
    for path in detected {
        println!("MALWARE {}", path.display());
    }
}

// ============================================================================
// DAEMON
// ============================================================================

async fn run_daemon(config: EngineConfig) -> Result<()> {
    let settle = Duration::from_secs(config.watch_settle_secs);
    let quarantine = QuarantineManager::open(default_quarantine_dir()).context("can't open the quarantine folder")?;

    let engine = Arc::new(
        Engine::builder(config)
            .disposition(Arc::new(QuarantineDisposition::new(quarantine)))
            .build()
            .context("can't initialize the engine")?,
    );

    let roots = watch_roots();
    let mut watch = FileWatch::start(&roots).context("can't start the file watch")?;
    if watch.watched().is_empty() {
        bail!("none of {} candidate directories could be watched", roots.len());
    }
    log::info!(
        "[Daemon] Watching {} directories (settle {}s, poll {}s)",
        watch.watched().len(),
        settle.as_secs(),
        constants::get_poll_interval()
    );

    loop {
        tokio::select! {
            created = watch.next_created() => {
                let Some(path) = created else { break };

                // Created files are still being written; give them time to settle
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    tokio::time::sleep(settle).await;
                    let session = engine.analyze_batch(vec![path]).await;
                    summarize(&session);
                });
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("[Daemon] Interrupted");
                break;
            }
        }
    }

    engine.shutdown().context("can't stop the engine properly")?;
    Ok(())
}
