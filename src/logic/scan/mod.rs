//! Scan Module - candidate file discovery
//!
//! - walker.rs: directory sweeps for fast and full scans
//! - watcher.rs: file-creation watch for daemon mode

pub mod walker;
pub mod watcher;

pub use walker::{collect_all, collect_files, fast_scan_roots, full_scan_roots, path_entries};
pub use watcher::{watch_roots, FileWatch};
