//! Sample Types

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// MIME types accepted for analysis
pub const EXECUTABLE_MIME_TYPES: &[&str] = &[
    "application/x-executable",
    "application/x-sharedlib",
    "application/x-dosexec",
    "application/x-mach-binary",
];

/// A file under analysis with its precomputed fingerprints.
///
/// Immutable once loaded; shared read-only across the static and dynamic stages.
#[derive(Debug, Clone)]
pub struct Sample {
    pub(super) path: PathBuf,
    pub(super) content: Vec<u8>,
    pub(super) mime: String,
    pub(super) md5: String,
    pub(super) sha1: String,
    pub(super) sha256: String,
    /// Empty when the content is below the fuzzy hash minimum size
    pub(super) fuzzy_hash: String,
}

impl Sample {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base name used for sandbox submission
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "sample".to_string())
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn md5(&self) -> &str {
        &self.md5
    }

    pub fn sha1(&self) -> &str {
        &self.sha1
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn fuzzy_hash(&self) -> &str {
        &self.fuzzy_hash
    }

    pub fn is_executable(&self) -> bool {
        EXECUTABLE_MIME_TYPES.contains(&self.mime.as_str())
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File:   {}", self.path.display())?;
        writeln!(f, "Type:   {}", self.mime)?;
        writeln!(f, "Size:   {} bytes", self.content.len())?;
        writeln!(f, "MD5:    {}", self.md5)?;
        writeln!(f, "SHA1:   {}", self.sha1)?;
        writeln!(f, "SHA256: {}", self.sha256)?;
        let fuzzy = if self.fuzzy_hash.is_empty() { "-" } else { self.fuzzy_hash.as_str() };
        write!(f, "SSDEEP: {}", fuzzy)
    }
}

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is empty", path.display())]
    Empty { path: PathBuf },

    #[error("{} is not an executable ({mime})", path.display())]
    UnsupportedType { path: PathBuf, mime: String },
}
