//! Rule index parsing and staleness checksum

use std::fs;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::types::{RuleError, RuleSourceLayout};

static INCLUDE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*include\s+"([^"]+)""#).expect("include pattern is valid"));

/// One `include` line of a namespace index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeStatement {
    pub namespace: String,
    /// The line as written in the index
    pub statement: String,
    /// Resolved rule file
    pub path: PathBuf,
}

fn read_index(layout: &RuleSourceLayout, index_file: &str) -> Result<String, RuleError> {
    let path = layout.index_path(index_file);
    fs::read_to_string(&path).map_err(|source| RuleError::IndexUnreadable { path, source })
}

/// All include statements of every namespace, in compile order
pub fn parse_index(layout: &RuleSourceLayout) -> Result<Vec<IncludeStatement>, RuleError> {
    let mut statements = Vec::new();

    for (namespace, index_file) in &layout.namespaces {
        let content = read_index(layout, index_file)?;

        for line in content.lines() {
            let Some(caps) = INCLUDE_PATTERN.captures(line) else {
                continue;
            };
            let relative = caps[1].trim_start_matches("./");
            statements.push(IncludeStatement {
                namespace: namespace.clone(),
                statement: line.trim().to_string(),
                path: layout.rules_root.join(relative),
            });
        }
    }

    Ok(statements)
}

/// SHA-256 over every namespace name and index file content.
///
/// Any edit to an index invalidates the compiled cache.
pub fn index_checksum(layout: &RuleSourceLayout) -> Result<String, RuleError> {
    let mut hasher = Sha256::new();

    for (namespace, index_file) in &layout.namespaces {
        let content = read_index(layout, index_file)?;
        hasher.update(namespace.as_bytes());
        hasher.update([0u8]);
        hasher.update(content.as_bytes());
        hasher.update([0u8]);
    }

    Ok(hex::encode(hasher.finalize()))
}
