//! Rule Engine Module
//!
//! YARA rule sets grouped by namespace, compiled with yara-x and cached on disk.

pub mod cache;
pub mod compiler;
pub mod engine;
pub mod index;
pub mod types;

pub use engine::RuleEngine;
pub use types::{PatternScanner, RuleError, RuleMatch, RuleSetOrigin, RuleSourceLayout, SkippedStatement};
