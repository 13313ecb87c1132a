//! Response Module
//!
//! Dispositions applied to malicious samples, and the file quarantine
//! used by daemon mode.

pub mod disposition;
pub mod file_quarantine;
pub mod types;

pub use disposition::{Disposition, DispositionAction, LogDisposition, PromptDisposition, QuarantineDisposition};
pub use file_quarantine::{default_quarantine_dir, QuarantineManager};
pub use types::{QuarantineEntry, QuarantineError};
