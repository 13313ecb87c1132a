//! Session Types

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::model::ClassifierError;
use crate::logic::rules::RuleError;
use crate::logic::sample::SampleError;
use crate::logic::sandbox::SandboxError;
use crate::logic::threat::StaticError;

// ============================================================================
// LOG
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub path: Option<PathBuf>,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self {
            level,
            message: message.into(),
            path,
            timestamp: Utc::now(),
        }
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} {}", self.timestamp.format("%H:%M:%S"), self.level.as_str(), self.message)
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum DynamicError {
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

/// Why one sample could not be given a verdict
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("load failed: {0}")]
    Load(#[from] SampleError),

    #[error("static analysis failed: {0}")]
    Static(#[from] StaticError),

    /// The static score reached before the failure is kept
    #[error("dynamic analysis failed (static score {static_score}): {source}")]
    Dynamic {
        static_score: u32,
        #[source]
        source: DynamicError,
    },

    /// A blocking analysis stage panicked or was aborted
    #[error("analysis worker failed: {0}")]
    Worker(String),
}

impl AnalysisError {
    /// Static score reached before the failure, if static analysis finished
    pub fn static_score(&self) -> Option<u32> {
        match self {
            AnalysisError::Dynamic { static_score, .. } => Some(*static_score),
            _ => None,
        }
    }
}

/// Engine initialisation failures; fatal to the process
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("rule engine: {0}")]
    Rules(#[from] RuleError),

    #[error("sandbox client: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("classifier: {0}")]
    Classifier(#[from] ClassifierError),
}
