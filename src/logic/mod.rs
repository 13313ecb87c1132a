//! Logic Module - Analysis Engine Components
//!
//! ## Pipeline
//! - `sample/` - load + fingerprint a file
//! - `signatures/` - hash blacklist, fuzzy corpus, IOC lists, git sync
//! - `rules/` - YARA rule sets, compiled once and cached
//! - `threat/` - static scoring, rule policy, decision aggregation
//! - `sandbox/` - detonation through the sandbox HTTP API
//! - `model/` - syscall-sequence classifier (ONNX)
//! - `session/` - engine entry points + batch session state
//!
//! ## Around it
//! - `config` - engine configuration from the environment
//! - `response/` - what happens to malicious samples
//! - `scan/` - directory sweeps and the daemon file watch

pub mod config;
pub mod model;
pub mod response;
pub mod rules;
pub mod sample;
pub mod sandbox;
pub mod scan;
pub mod session;
pub mod signatures;
pub mod threat;
