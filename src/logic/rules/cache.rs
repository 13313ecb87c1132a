//! Compiled rule cache and its checksum marker

use std::fs;
use std::path::Path;

use super::types::RuleError;

/// Checksum recorded with the cache, `None` if never written
pub fn read_marker(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn write_marker(path: &Path, checksum: &str) -> Result<(), RuleError> {
    fs::write(path, checksum).map_err(|source| RuleError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_compiled(path: &Path) -> Result<yara_x::Rules, RuleError> {
    let bytes = fs::read(path).map_err(|source| RuleError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    yara_x::Rules::deserialize(&bytes).map_err(|e| RuleError::Cache {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Persist through a temporary sibling so a crash never leaves a torn cache
pub fn save_compiled(path: &Path, rules: &yara_x::Rules) -> Result<(), RuleError> {
    let bytes = rules.serialize().map_err(|e| RuleError::Cache {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)
        .and_then(|_| fs::rename(&tmp, path))
        .map_err(|source| RuleError::Io {
            path: path.to_path_buf(),
            source,
        })
}
