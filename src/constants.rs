//! Central Configuration Constants
//!
//! Single source of truth for all engine defaults.
//! Every path and interval can be overridden with a `MALSCAN_*` environment variable.

use std::path::PathBuf;

/// Signature database root (hash list, fuzzy corpus, IOC lists)
pub const DEFAULT_DATA_DIR: &str = "files";

/// Rule root, holds one index file per namespace
pub const DEFAULT_RULES_DIR: &str = "files/yara";

/// Where the compiled rule cache and its checksum marker are kept
pub const DEFAULT_CACHE_DIR: &str = ".";

/// Default sandbox API
///
/// A local Cuckoo-compatible instance.
pub const DEFAULT_SANDBOX_URL: &str = "http://localhost:8090";

/// Report endpoint template, `{id}` is replaced by the task id
pub const DEFAULT_REPORT_PATH: &str = "/tasks/report/{id}";

/// Report schema of the sandbox backend, `cuckoo` or `cape`
pub const DEFAULT_REPORT_FORMAT: &str = "cuckoo";

/// Default report poll interval (seconds)
pub const DEFAULT_POLL_INTERVAL: u64 = 2;

/// Default timeout of a single sandbox HTTP request (seconds)
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 60;

/// Default syscall classifier
pub const DEFAULT_MODEL_PATH: &str = "models/syscall_classifier.onnx";

/// Git repository the signature database is synced from
pub const DEFAULT_SIGNATURE_REPO: &str = "https://github.com/OctAVProject/OctAV-Files";

/// Delay before a freshly created file is analysed in watch mode (seconds)
pub const DEFAULT_WATCH_SETTLE: u64 = 3;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "malscan";

// ============================================
// Signature database / rule cache file names
// ============================================

/// One MD5 hex digest per line
pub const MD5_BLACKLIST_FILE: &str = "malicious_md5";

/// One ssdeep digest per line
pub const FUZZY_CORPUS_FILE: &str = "malicious_ssdeep";

/// One domain per line
pub const DOMAIN_IOC_FILE: &str = "justdomains";

/// One IPv4 address per line (optional)
pub const IP_IOC_FILE: &str = "justips";

pub const COMPILED_RULES_FILE: &str = "rules.compiled";
pub const RULES_CHECKSUM_FILE: &str = "rules_index.sha256";

// ============================================
// Helper functions to read from env with fallback
// ============================================

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Get signature database root from environment or use default
pub fn get_data_dir() -> PathBuf {
    env_path("MALSCAN_DATA_DIR", DEFAULT_DATA_DIR)
}

/// Get rule root from environment or use default
pub fn get_rules_dir() -> PathBuf {
    env_path("MALSCAN_RULES_DIR", DEFAULT_RULES_DIR)
}

/// Get compiled rule cache directory from environment or use default
pub fn get_cache_dir() -> PathBuf {
    env_path("MALSCAN_CACHE_DIR", DEFAULT_CACHE_DIR)
}

/// Get sandbox base URL from environment or use default
pub fn get_sandbox_url() -> String {
    std::env::var("MALSCAN_SANDBOX_URL")
        .unwrap_or_else(|_| DEFAULT_SANDBOX_URL.to_string())
}

/// Get report endpoint template from environment or use default
pub fn get_report_path() -> String {
    std::env::var("MALSCAN_SANDBOX_REPORT_PATH")
        .unwrap_or_else(|_| DEFAULT_REPORT_PATH.to_string())
}

/// Get report schema name from environment or use default
pub fn get_report_format() -> String {
    std::env::var("MALSCAN_SANDBOX_FORMAT")
        .unwrap_or_else(|_| DEFAULT_REPORT_FORMAT.to_string())
}

/// Get report poll interval from environment or use default
pub fn get_poll_interval() -> u64 {
    env_u64("MALSCAN_SANDBOX_POLL_SECS", DEFAULT_POLL_INTERVAL)
}

/// Get the optional detonation deadline.
///
/// Unset means the report is awaited until it shows up or the caller cancels.
pub fn get_sandbox_timeout() -> Option<u64> {
    std::env::var("MALSCAN_SANDBOX_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
}

/// Get classifier model path from environment or use default
pub fn get_model_path() -> PathBuf {
    env_path("MALSCAN_MODEL_PATH", DEFAULT_MODEL_PATH)
}

/// Get signature repository URL from environment or use default
pub fn get_signature_repo() -> String {
    std::env::var("MALSCAN_SIGNATURE_REPO")
        .unwrap_or_else(|_| DEFAULT_SIGNATURE_REPO.to_string())
}

/// Get watch-mode settle delay from environment or use default
pub fn get_watch_settle() -> u64 {
    env_u64("MALSCAN_WATCH_SETTLE_SECS", DEFAULT_WATCH_SETTLE)
}
