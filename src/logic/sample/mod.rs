//! Sample Module - loading and fingerprinting of files under analysis

pub mod loader;
pub mod types;

pub use loader::{detect_mime, load_sample, sample_from_bytes};
pub use types::{Sample, SampleError, EXECUTABLE_MIME_TYPES};
