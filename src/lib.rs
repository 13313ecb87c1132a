//! malscan-core - static + behavioral malware scoring engine
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use malscan_core::{Engine, EngineConfig};
//!
//! let engine = Engine::initialize(EngineConfig::default())?;
//! let report = engine.analyze_one(std::path::Path::new("/tmp/sample")).await?;
//! println!("{}", report);
//! engine.shutdown()?;
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod logic;

pub use logic::config::EngineConfig;
pub use logic::session::{AnalysisError, AnalysisSession, Engine, EngineBuilder, EngineError, LogEntry, LogLevel};
pub use logic::threat::{Verdict, VerdictReport};
