//! Signature Database Module
//!
//! Hash blacklist, fuzzy corpus and IOC lists, plus the git sync that
//! keeps them fresh.

pub mod database;
pub mod fuzzy;
pub mod ioc;
pub mod retry;
pub mod sync;
pub mod types;

pub use database::SignatureDatabase;
pub use fuzzy::{FuzzyDigest, SsdeepDigest, FUZZY_HASH_MIN_SIZE};
pub use retry::RetryPolicy;
pub use sync::{GitSignatureSync, SignatureSync};
pub use types::{SignatureError, SyncError};
