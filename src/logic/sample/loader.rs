//! Sample Loader
//!
//! Reads a file, sniffs its type from the magic bytes and precomputes the
//! digests every later stage needs.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use goblin::Hint;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::logic::signatures::{FuzzyDigest, FUZZY_HASH_MIN_SIZE};

use super::types::{Sample, SampleError, EXECUTABLE_MIME_TYPES};

const OCTET_STREAM: &str = "application/octet-stream";

/// Enough for the magic bytes and the ELF `e_type` field
const HEADER_LEN: u64 = 64;

/// Load `path` as an analysis sample.
///
/// Fails when the file is unreadable, empty, or not an executable. The type
/// is decided from the header alone, so rejected files are never read whole.
pub fn load_sample(path: &Path, fuzzy: &dyn FuzzyDigest) -> Result<Sample, SampleError> {
    let io_error = |source| SampleError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(io_error)?;
    let mut content = Vec::new();
    (&mut file).take(HEADER_LEN).read_to_end(&mut content).map_err(io_error)?;

    if content.is_empty() {
        return Err(SampleError::Empty { path: path.to_path_buf() });
    }
    check_type(path, detect_mime(&content))?;

    file.read_to_end(&mut content).map_err(io_error)?;
    sample_from_bytes(path, content, fuzzy)
}

/// Build a sample from content already in memory
pub fn sample_from_bytes(path: &Path, content: Vec<u8>, fuzzy: &dyn FuzzyDigest) -> Result<Sample, SampleError> {
    if content.is_empty() {
        return Err(SampleError::Empty { path: path.to_path_buf() });
    }

    let mime = detect_mime(&content);
    check_type(path, mime)?;

    let sample = Sample {
        path: path.to_path_buf(),
        mime: mime.to_string(),
        md5: hex::encode(Md5::digest(&content)),
        sha1: hex::encode(Sha1::digest(&content)),
        sha256: hex::encode(Sha256::digest(&content)),
        fuzzy_hash: if content.len() < FUZZY_HASH_MIN_SIZE {
            String::new()
        } else {
            fuzzy.digest(&content)
        },
        content,
    };

    log::debug!("[Sample] Loaded {} ({}, {} bytes)", path.display(), sample.mime, sample.size());
    Ok(sample)
}

fn check_type(path: &Path, mime: &str) -> Result<(), SampleError> {
    if EXECUTABLE_MIME_TYPES.contains(&mime) {
        return Ok(());
    }
    Err(SampleError::UnsupportedType {
        path: path.to_path_buf(),
        mime: mime.to_string(),
    })
}

/// MIME type from magic bytes
pub fn detect_mime(content: &[u8]) -> &'static str {
    let Some(head) = content.get(..16).and_then(|h| <&[u8; 16]>::try_from(h).ok()) else {
        return OCTET_STREAM;
    };

    match goblin::peek_bytes(head) {
        Ok(Hint::Elf(_)) => elf_mime(content),
        Ok(Hint::PE) => "application/x-dosexec",
        Ok(Hint::Mach(_)) | Ok(Hint::MachFat(_)) => "application/x-mach-binary",
        _ => OCTET_STREAM,
    }
}

/// ELF flavour from `e_type`
fn elf_mime(content: &[u8]) -> &'static str {
    // EI_DATA: 1 = little endian, 2 = big endian
    let little_endian = content.get(5).copied() != Some(2);
    let e_type = match content.get(16..18) {
        Some(&[a, b]) if little_endian => u16::from_le_bytes([a, b]),
        Some(&[a, b]) => u16::from_be_bytes([a, b]),
        _ => return OCTET_STREAM,
    };

    match e_type {
        1 => "application/x-object",
        2 => "application/x-executable",
        3 => "application/x-sharedlib",
        4 => "application/x-coredump",
        _ => OCTET_STREAM,
    }
}
