//! File Quarantine
//!
//! Moves detected files into a quarantine folder and keeps a JSON metadata
//! index (origin, SHA-256, reason, time) next to them.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use super::types::{QuarantineEntry, QuarantineError};

// ============================================================================
// CONSTANTS
// ============================================================================

const QUARANTINE_FOLDER: &str = "quarantine";
const METADATA_FILE: &str = "quarantine_metadata.json";

/// Per-user quarantine location
pub fn default_quarantine_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(crate::constants::APP_NAME)
        .join(QUARANTINE_FOLDER)
}

// ============================================================================
// QUARANTINE MANAGER
// ============================================================================

pub struct QuarantineManager {
    entries: HashMap<String, QuarantineEntry>,
    quarantine_dir: PathBuf,
}

impl QuarantineManager {
    /// Open (and create if needed) a quarantine folder. Entries already in
    /// its index are kept when the index is rewritten.
    pub fn open(quarantine_dir: impl Into<PathBuf>) -> Result<Self, QuarantineError> {
        let quarantine_dir = quarantine_dir.into();
        fs::create_dir_all(&quarantine_dir).map_err(|source| QuarantineError::Io {
            path: quarantine_dir.clone(),
            source,
        })?;

        let mut manager = Self {
            entries: HashMap::new(),
            quarantine_dir,
        };
        manager.load_metadata();
        Ok(manager)
    }

    pub fn dir(&self) -> &Path {
        &self.quarantine_dir
    }

    /// Move `path` into quarantine
    pub fn quarantine(&mut self, path: &Path, sha256: &str, reason: &str) -> Result<QuarantineEntry, QuarantineError> {
        let metadata = fs::metadata(path).map_err(|_| QuarantineError::FileNotFound(path.to_path_buf()))?;

        let id = Uuid::new_v4().to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        // Named by id so equal file names never collide
        let quarantine_path = self.quarantine_dir.join(format!("{}.quarantine", id));
        move_file(path, &quarantine_path)?;

        let entry = QuarantineEntry {
            id: id.clone(),
            original_path: path.to_path_buf(),
            quarantine_path: quarantine_path.clone(),
            file_name,
            file_size: metadata.len(),
            sha256: sha256.to_string(),
            quarantine_time: Utc::now().timestamp(),
            reason: reason.to_string(),
        };

        self.entries.insert(id, entry.clone());
        self.save_metadata();

        log::warn!("[Quarantine] {} -> {}", path.display(), quarantine_path.display());
        Ok(entry)
    }

    fn load_metadata(&mut self) {
        let metadata_path = self.quarantine_dir.join(METADATA_FILE);

        if let Ok(content) = fs::read_to_string(&metadata_path) {
            match serde_json::from_str::<Vec<QuarantineEntry>>(&content) {
                Ok(entries) => {
                    for entry in entries.into_iter().filter(|e| e.quarantine_path.exists()) {
                        self.entries.insert(entry.id.clone(), entry);
                    }
                }
                Err(e) => log::warn!("[Quarantine] Ignoring corrupt metadata: {}", e),
            }
        }
    }

    fn save_metadata(&self) {
        let metadata_path = self.quarantine_dir.join(METADATA_FILE);
        let entries: Vec<_> = self.entries.values().collect();

        match serde_json::to_string_pretty(&entries) {
            Ok(json) => {
                if let Err(e) = fs::write(&metadata_path, json) {
                    log::warn!("[Quarantine] Failed to save metadata: {}", e);
                }
            }
            Err(e) => log::warn!("[Quarantine] Failed to encode metadata: {}", e),
        }
    }
}

/// Rename, falling back to copy + delete across devices
fn move_file(from: &Path, to: &Path) -> Result<(), QuarantineError> {
    fs::rename(from, to)
        .or_else(|_| fs::copy(from, to).and_then(|_| fs::remove_file(from)))
        .map_err(|source| QuarantineError::Io {
            path: from.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn index(dir: &Path) -> Vec<QuarantineEntry> {
        serde_json::from_str(&fs::read_to_string(dir.join(METADATA_FILE)).unwrap()).unwrap()
    }

    #[test]
    fn test_quarantine_moves_file_and_records_metadata() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("dropper");
        fs::write(&file, b"payload").unwrap();

        let mut manager = QuarantineManager::open(dir.path().join("q")).unwrap();
        let entry = manager.quarantine(&file, "abc123", "StaticCertain").unwrap();

        assert!(!file.exists());
        assert_eq!(fs::read(&entry.quarantine_path).unwrap(), b"payload");
        assert!(entry.quarantine_path.starts_with(manager.dir()));

        let recorded = index(manager.dir());
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].original_path, file);
        assert_eq!(recorded[0].sha256, "abc123");
        assert_eq!(recorded[0].reason, "StaticCertain");
        assert_eq!(recorded[0].file_size, 7);
    }

    #[test]
    fn test_reopened_index_keeps_earlier_entries() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.bin");
        let second = dir.path().join("b.bin");
        fs::write(&first, b"a").unwrap();
        fs::write(&second, b"b").unwrap();

        QuarantineManager::open(dir.path().join("q")).unwrap().quarantine(&first, "", "x").unwrap();
        let mut reopened = QuarantineManager::open(dir.path().join("q")).unwrap();
        reopened.quarantine(&second, "", "y").unwrap();

        let mut originals: Vec<_> = index(reopened.dir()).into_iter().map(|e| e.original_path).collect();
        originals.sort();
        assert_eq!(originals, vec![first, second]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let mut manager = QuarantineManager::open(dir.path()).unwrap();

        assert!(matches!(
            manager.quarantine(&dir.path().join("nope"), "", ""),
            Err(QuarantineError::FileNotFound(_))
        ));
    }
}
