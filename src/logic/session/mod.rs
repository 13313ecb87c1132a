//! Analysis Session Module
//!
//! The engine entry points (initialise, analyse one, analyse a batch,
//! shut down) and the shared state of a running batch.

pub mod engine;
pub mod progress;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;

pub use engine::{Engine, EngineBuilder};
pub use progress::{Checkpoint, Progress};
pub use state::AnalysisSession;
pub use types::{AnalysisError, DynamicError, EngineError, LogEntry, LogLevel};
