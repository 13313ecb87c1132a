//! Directory walker
//!
//! Turns scan roots into the ordered list of candidate files a batch runs over.

use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Kernel pseudo filesystems never hold samples
const PSEUDO_FILESYSTEMS: &[&str] = &["/proc", "/sys", "/dev", "/run"];

/// Every regular file below `root`. Unreadable directories are skipped.
pub fn collect_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut skipped = 0usize;

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_pseudo_filesystem(entry.path()));

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => {
                skipped += 1;
                log::debug!("[Walker] Skipping {}: {}", e.path().unwrap_or(root).display(), e);
            }
        }
    }

    log::info!(
        "[Walker] {} file(s) under {} ({} unreadable entries skipped)",
        files.len(),
        root.display(),
        skipped
    );
    files
}

/// Files under all `roots`, first occurrence wins
pub fn collect_all(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    roots
        .iter()
        .filter(|root| root.is_dir())
        .flat_map(|root| collect_files(root))
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// Directories listed in `$PATH`
pub fn path_entries() -> Vec<PathBuf> {
    env::var_os("PATH")
        .map(|path| env::split_paths(&path).filter(|p| !p.as_os_str().is_empty()).collect())
        .unwrap_or_default()
}

/// `/home`, `/opt` and every `$PATH` entry
pub fn fast_scan_roots() -> Vec<PathBuf> {
    let mut roots = vec![PathBuf::from("/home"), PathBuf::from("/opt")];
    roots.extend(path_entries());
    roots
}

pub fn full_scan_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("/")]
}

fn is_pseudo_filesystem(path: &Path) -> bool {
    PSEUDO_FILESYSTEMS.iter().any(|p| path == Path::new(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_collects_nested_files_only() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("top.bin"), b"x").unwrap();
        fs::write(dir.path().join("a/b/deep.bin"), b"y").unwrap();

        let mut files = collect_files(dir.path());
        files.sort();

        assert_eq!(files, vec![dir.path().join("a/b/deep.bin"), dir.path().join("top.bin")]);
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let dir = tempdir().unwrap();
        assert!(collect_files(&dir.path().join("absent")).is_empty());
    }

    #[test]
    fn test_overlapping_roots_are_deduplicated() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/file.bin"), b"x").unwrap();

        let roots = vec![dir.path().to_path_buf(), dir.path().join("sub"), dir.path().join("absent")];
        assert_eq!(collect_all(&roots), vec![dir.path().join("sub/file.bin")]);
    }

    #[test]
    fn test_pseudo_filesystems() {
        assert!(is_pseudo_filesystem(Path::new("/proc")));
        assert!(!is_pseudo_filesystem(Path::new("/procedures")));
        assert_eq!(full_scan_roots(), vec![PathBuf::from("/")]);
        assert!(fast_scan_roots().starts_with(&[PathBuf::from("/home"), PathBuf::from("/opt")]));
    }
}
