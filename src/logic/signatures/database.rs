//! Signature Database
//!
//! Read-only view over the on-disk lists refreshed by the sync collaborator:
//! - known-malicious MD5 digests
//! - known-malicious fuzzy hash corpus
//! - domain (and optional IPv4) indicators of compromise
//!
//! Lists are re-read on every lookup so a resync is picked up immediately.

use std::collections::HashSet;
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::constants::{DOMAIN_IOC_FILE, FUZZY_CORPUS_FILE, IP_IOC_FILE, MD5_BLACKLIST_FILE};

use super::fuzzy::FuzzyDigest;
use super::types::SignatureError;

#[derive(Debug, Clone)]
pub struct SignatureDatabase {
    root: PathBuf,
}

impl SignatureDatabase {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn list_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Exact lookup of an MD5 hex digest in the hash blacklist
    pub fn is_known_hash(&self, md5: &str) -> Result<bool, SignatureError> {
        let wanted = md5.to_lowercase();
        let entries = read_list(&self.list_path(MD5_BLACKLIST_FILE))?;

        Ok(entries.iter().any(|entry| entry.to_lowercase() == wanted))
    }

    /// Reference fuzzy hashes, one per entry.
    ///
    /// Accepts plain digests and `digest,"filename"` lines as written by ssdeep.
    pub fn fuzzy_corpus(&self) -> Result<Vec<String>, SignatureError> {
        let entries = read_list(&self.list_path(FUZZY_CORPUS_FILE))?;

        Ok(entries
            .into_iter()
            .filter_map(|line| line.split(',').next().map(|d| d.trim().to_string()))
            .filter(|digest| !digest.is_empty())
            .collect())
    }

    /// Highest similarity between `fuzzy_hash` and any corpus entry.
    ///
    /// Returns 0 without touching the corpus when the sample has no fuzzy hash.
    /// Entries that cannot be compared are logged and skipped; only a corpus
    /// with no comparable entry at all is an error.
    pub fn highest_fuzzy_distance(&self, fuzzy_hash: &str, digest: &dyn FuzzyDigest) -> Result<u32, SignatureError> {
        if fuzzy_hash.is_empty() {
            return Ok(0);
        }

        let corpus = self.fuzzy_corpus()?;
        let mut highest = 0;
        let mut first_error = None;
        let mut compared = 0usize;

        for reference in &corpus {
            match digest.compare(fuzzy_hash, reference) {
                Ok(distance) => {
                    compared += 1;
                    highest = highest.max(distance);
                }
                Err(e) => {
                    log::warn!("[Signatures] Skipping fuzzy corpus entry: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if compared == 0 => Err(e),
            _ => Ok(highest),
        }
    }

    /// Known-malicious domains, lowercased
    pub fn malicious_domains(&self) -> Result<HashSet<String>, SignatureError> {
        let entries = read_list(&self.list_path(DOMAIN_IOC_FILE))?;

        Ok(entries
            .into_iter()
            .map(|d| d.to_lowercase())
            .filter(|d| d.contains('.'))
            .collect())
    }

    /// Known-malicious IPv4 addresses.
    ///
    /// The IP list is optional: `Ok(None)` when the database ships without one.
    pub fn malicious_ips(&self) -> Result<Option<HashSet<Ipv4Addr>>, SignatureError> {
        let path = self.list_path(IP_IOC_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let entries = read_list(&path)?;
        Ok(Some(entries.iter().filter_map(|line| line.parse().ok()).collect()))
    }
}

/// Non-empty, non-comment lines of a list file
fn read_list(path: &Path) -> Result<Vec<String>, SignatureError> {
    let content = fs::read_to_string(path).map_err(|source| SignatureError::Unavailable {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
