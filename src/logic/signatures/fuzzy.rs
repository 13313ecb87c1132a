//! Fuzzy Hashing
//!
//! ssdeep-style similarity digests. Hidden behind [`FuzzyDigest`] so the
//! scorer does not depend on one hashing library.

use fuzzyhash::FuzzyHash;

use super::types::SignatureError;

/// Below this size a fuzzy digest is too unreliable to be computed or compared
pub const FUZZY_HASH_MIN_SIZE: usize = 4096;

/// Similarity digest provider
pub trait FuzzyDigest: Send + Sync {
    /// Digest of `content`
    fn digest(&self, content: &[u8]) -> String;

    /// Similarity between two digests, 0 (unrelated) - 100 (identical)
    fn compare(&self, left: &str, right: &str) -> Result<u32, SignatureError>;
}

/// ssdeep implementation backed by the `fuzzyhash` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct SsdeepDigest;

impl FuzzyDigest for SsdeepDigest {
    fn digest(&self, content: &[u8]) -> String {
        FuzzyHash::new(content).to_string()
    }

    fn compare(&self, left: &str, right: &str) -> Result<u32, SignatureError> {
        FuzzyHash::compare(left, right).map_err(|e| SignatureError::CorruptFuzzyEntry {
            entry: right.to_string(),
            message: format!("{:?}", e),
        })
    }
}
