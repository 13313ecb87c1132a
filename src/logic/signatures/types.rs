//! Signature Database Types

use std::path::PathBuf;
use thiserror::Error;

/// Lookup failures against the local signature database.
///
/// These are data-staleness errors: they are repaired by a resync of the
/// database, see [`super::retry::RetryPolicy`].
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("signature list {} unavailable: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt fuzzy hash entry '{entry}': {message}")]
    CorruptFuzzyEntry { entry: String, message: String },

    #[error("signature resync failed: {0}")]
    Sync(#[from] SyncError),
}

/// Failures of the signature synchronisation collaborator
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git {command} exited with {status}: {stderr}")]
    Git {
        command: String,
        status: String,
        stderr: String,
    },
}
