//! Response Types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A file moved into quarantine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarantineEntry {
    pub id: String,
    pub original_path: PathBuf,
    pub quarantine_path: PathBuf,
    pub file_name: String,
    pub file_size: u64,
    pub sha256: String,
    /// Unix timestamp
    pub quarantine_time: i64,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum QuarantineError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("quarantine io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
