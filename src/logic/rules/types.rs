//! Rule Engine Types

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::{COMPILED_RULES_FILE, RULES_CHECKSUM_FILE};

/// One matching rule, qualified by the namespace of its index file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleMatch {
    pub namespace: String,
    pub rule: String,
}

impl RuleMatch {
    pub fn new(namespace: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            rule: rule.into(),
        }
    }
}

/// An include statement dropped from the rule set because it did not compile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedStatement {
    pub namespace: String,
    pub statement: String,
    pub reason: String,
}

/// Where the active rule set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSetOrigin {
    /// Freshly compiled from source
    Compiled,
    /// Reused from the compiled cache
    Cache,
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule index {} unreadable: {source}", path.display())]
    IndexUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("compiled rule cache {}: {message}", path.display())]
    Cache { path: PathBuf, message: String },

    #[error("rule scan failed: {0}")]
    Scan(String),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that matches compiled patterns against sample bytes
pub trait PatternScanner: Send + Sync {
    fn scan(&self, content: &[u8]) -> Result<Vec<RuleMatch>, RuleError>;
}

/// On-disk layout of rule sources and the compiled cache.
///
/// Each namespace is backed by one index file listing `include "..."` lines.
#[derive(Debug, Clone)]
pub struct RuleSourceLayout {
    pub rules_root: PathBuf,
    pub cache_file: PathBuf,
    pub checksum_file: PathBuf,
    /// (namespace, index file relative to `rules_root`), in compile order
    pub namespaces: Vec<(String, String)>,
}

impl RuleSourceLayout {
    pub fn new(rules_root: impl Into<PathBuf>, cache_dir: &Path) -> Self {
        Self {
            rules_root: rules_root.into(),
            cache_file: cache_dir.join(COMPILED_RULES_FILE),
            checksum_file: cache_dir.join(RULES_CHECKSUM_FILE),
            namespaces: vec![
                ("packer".to_string(), "Packers_index.yar".to_string()),
                ("malware".to_string(), "malware_index.yar".to_string()),
                ("anti-debug/vm".to_string(), "Antidebug_AntiVM_index.yar".to_string()),
            ],
        }
    }

    /// Replace the namespace table
    pub fn with_namespaces<I, N, F>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = (N, F)>,
        N: Into<String>,
        F: Into<String>,
    {
        self.namespaces = namespaces.into_iter().map(|(n, f)| (n.into(), f.into())).collect();
        self
    }

    pub fn index_path(&self, index_file: &str) -> PathBuf {
        self.rules_root.join(index_file)
    }
}
