//! Sandbox Types

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::sample::Sample;

/// Activity of one sandboxed process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessTrace {
    pub pid: u64,
    pub process_name: String,
    /// Syscall names in call order
    pub syscalls: Vec<String>,
    pub opened_files: Vec<String>,
}

/// Behavioral section of a finished sandbox report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorReport {
    pub task_id: u64,
    pub processes: Vec<ProcessTrace>,
}

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox unreachable: {0}")]
    Network(String),

    #[error("sandbox rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("sandbox response carries no task id")]
    MissingTaskId,

    #[error("malformed sandbox response: {0}")]
    Parse(String),

    #[error("no behavior analysis in the report of task {task_id}")]
    NoBehavior { task_id: u64 },

    #[error("report of task {task_id} not ready after {waited:?}")]
    Timeout { task_id: u64, waited: Duration },

    #[error("wait for task {task_id} cancelled")]
    Cancelled { task_id: u64 },
}

/// Cooperative cancellation shared between a session and its in-flight detonation
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Whether both handles control the same flag
    pub fn same_as(&self, other: &CancelFlag) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Detonates samples and returns their behavior
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn detonate(&self, sample: &Sample, cancel: &CancelFlag) -> Result<BehaviorReport, SandboxError>;
}
