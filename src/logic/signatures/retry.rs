//! Resync-and-retry for signature lookups.
//!
//! A failed lookup is treated as a stale database: it triggers one resync
//! and the lookup is repeated. The attempt budget is bounded.

use super::sync::SignatureSync;
use super::types::SignatureError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total lookups, including the first one
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 2 }
    }
}

impl RetryPolicy {
    /// Run `lookup`, resyncing through `recovery` between failed attempts.
    ///
    /// The last lookup error is returned once the budget is spent. A failing
    /// resync aborts immediately.
    pub fn run<T, F>(&self, what: &str, recovery: &dyn SignatureSync, mut lookup: F) -> Result<T, SignatureError>
    where
        F: FnMut() -> Result<T, SignatureError>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match lookup() {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    log::warn!("[Signatures] {} failed ({}), resyncing database", what, e);
                    recovery.sync()?;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::signatures::types::SyncError;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingSync {
        calls: AtomicU32,
        fail: bool,
    }

    impl SignatureSync for CountingSync {
        fn sync(&self) -> Result<(), SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SyncError::Git {
                    command: "pull".into(),
                    status: "exit status: 1".into(),
                    stderr: "offline".into(),
                });
            }
            Ok(())
        }
    }

    fn unavailable() -> SignatureError {
        SignatureError::Unavailable {
            path: PathBuf::from("files/malicious_md5"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        }
    }

    #[test]
    fn test_success_needs_no_resync() {
        let sync = CountingSync::default();
        let value = RetryPolicy::default().run("hash lookup", &sync, || Ok(7)).unwrap();

        assert_eq!(value, 7);
        assert_eq!(sync.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failure_resyncs_then_retries() {
        let sync = CountingSync::default();
        let mut calls = 0;
        let value = RetryPolicy::default()
            .run("hash lookup", &sync, || {
                calls += 1;
                if calls == 1 { Err(unavailable()) } else { Ok(true) }
            })
            .unwrap();

        assert!(value);
        assert_eq!(calls, 2);
        assert_eq!(sync.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_budget_is_bounded() {
        let sync = CountingSync::default();
        let mut calls = 0;
        let result: Result<(), _> = RetryPolicy::default().run("hash lookup", &sync, || {
            calls += 1;
            Err(unavailable())
        });

        assert!(matches!(result, Err(SignatureError::Unavailable { .. })));
        assert_eq!(calls, 2);
        assert_eq!(sync.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_resync_aborts() {
        let sync = CountingSync { fail: true, ..Default::default() };
        let result: Result<(), _> = RetryPolicy::default().run("fuzzy lookup", &sync, || Err(unavailable()));

        assert!(matches!(result, Err(SignatureError::Sync(_))));
    }
}
