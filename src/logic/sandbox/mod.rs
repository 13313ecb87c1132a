//! Sandbox Orchestrator Module
//!
//! Submits samples to an external sandbox and collects their behavior.

pub mod client;
pub mod report;
pub mod types;

pub use client::{SandboxClient, SandboxConfig};
pub use report::{parse_report, ReportFormat};
pub use types::{BehaviorReport, CancelFlag, ProcessTrace, Sandbox, SandboxError};
