//! Static Scorer
//!
//! Cheap local checks, most conclusive first:
//! 1. known MD5 (certain, short-circuits)
//! 2. domain / IPv4 indicators of compromise
//! 3. fuzzy hash similarity against the reference corpus
//! 4. namespaced rule matches through [`RULE_POLICY`](super::rules::RULE_POLICY)

use std::sync::Arc;

use thiserror::Error;

use crate::logic::rules::{PatternScanner, RuleError};
use crate::logic::sample::Sample;
use crate::logic::signatures::{ioc, FuzzyDigest, RetryPolicy, SignatureDatabase, SignatureError, SignatureSync};

use super::rules::{evaluate, Contribution, CERTAIN_SCORE, FUZZY_DISTANCE_THRESHOLD, FUZZY_SCORE, IOC_SCORE};
use super::types::ScoreRecord;

#[derive(Debug, Error)]
pub enum StaticError {
    #[error("known-hash lookup failed: {0}")]
    KnownHash(#[source] SignatureError),

    #[error("IOC lookup failed: {0}")]
    IocLookup(#[source] SignatureError),

    #[error("fuzzy hash lookup failed: {0}")]
    FuzzyLookup(#[source] SignatureError),

    #[error(transparent)]
    Rules(#[from] RuleError),
}

pub struct StaticScorer {
    signatures: SignatureDatabase,
    fuzzy: Arc<dyn FuzzyDigest>,
    sync: Arc<dyn SignatureSync>,
    retry: RetryPolicy,
}

impl StaticScorer {
    pub fn new(signatures: SignatureDatabase, fuzzy: Arc<dyn FuzzyDigest>, sync: Arc<dyn SignatureSync>) -> Self {
        Self {
            signatures,
            fuzzy,
            sync,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn signatures(&self) -> &SignatureDatabase {
        &self.signatures
    }

    /// Static score of `sample`
    pub fn score(&self, sample: &Sample, scanner: &dyn PatternScanner) -> Result<ScoreRecord, StaticError> {
        // 1. Known hash
        let known = self
            .retry
            .run("known-hash lookup", self.sync.as_ref(), || self.signatures.is_known_hash(sample.md5()))
            .map_err(StaticError::KnownHash)?;

        if known {
            log::warn!("[Static] {} matches a known malicious MD5", sample.path().display());
            return Ok(ScoreRecord::certain(CERTAIN_SCORE, format!("known malicious md5 {}", sample.md5())));
        }

        let mut record = ScoreRecord::default();

        // 2. Indicators of compromise
        if let Some(indicator) = self.find_indicator(sample)? {
            log::warn!("[Static] Malicious indicator {} in {}", indicator, sample.path().display());
            record.add(IOC_SCORE, format!("malicious indicator {}", indicator));
        }

        // 3. Fuzzy hash, only computed for samples above the minimum size
        if !sample.fuzzy_hash().is_empty() {
            let distance = self
                .retry
                .run("fuzzy hash lookup", self.sync.as_ref(), || {
                    self.signatures.highest_fuzzy_distance(sample.fuzzy_hash(), self.fuzzy.as_ref())
                })
                .map_err(StaticError::FuzzyLookup)?;

            log::debug!("[Static] Highest fuzzy distance {}", distance);
            if distance > FUZZY_DISTANCE_THRESHOLD {
                log::warn!("[Static] Fuzzy hash {}% similar to known malware", distance);
                record.add(FUZZY_SCORE, format!("fuzzy hash {}% similar to known malware", distance));
            }
        }

        // 4. Rules
        for m in scanner.scan(sample.content())? {
            let Some(policy) = evaluate(&m) else {
                log::warn!("[Static] Ignoring match {} in unknown namespace {}", m.rule, m.namespace);
                continue;
            };

            match policy.contribution {
                Contribution::Ignore => {}
                Contribution::Add(points) => {
                    log::info!("[Static] Rule {}/{} ({}) +{}", m.namespace, m.rule, policy.note, points);
                    record.add(points, format!("{}: {}/{}", policy.note, m.namespace, m.rule));
                }
                Contribution::Conclusive => {
                    log::warn!("[Static] Rule {}/{} is conclusive", m.namespace, m.rule);
                    record.reasons.push(format!("{}: {}/{}", policy.note, m.namespace, m.rule));
                    record.score = CERTAIN_SCORE;
                    return Ok(record);
                }
            }
        }

        Ok(record)
    }

    /// First blacklisted domain, else first blacklisted IPv4 address
    fn find_indicator(&self, sample: &Sample) -> Result<Option<String>, StaticError> {
        let domains = ioc::extract_domains(sample.content());
        if !domains.is_empty() {
            let blacklist = self.signatures.malicious_domains().map_err(StaticError::IocLookup)?;
            if let Some(domain) = ioc::find_malicious_domain(&domains, &blacklist) {
                return Ok(Some(domain));
            }
        }

        let ips = ioc::extract_ipv4(sample.content());
        if ips.is_empty() {
            return Ok(None);
        }

        match self.signatures.malicious_ips().map_err(StaticError::IocLookup)? {
            Some(blacklist) => Ok(ioc::find_malicious_ip(&ips, &blacklist).map(|ip| ip.to_string())),
            None => {
                log::debug!("[Static] No IP indicator list configured");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DOMAIN_IOC_FILE, FUZZY_CORPUS_FILE, IP_IOC_FILE, MD5_BLACKLIST_FILE};
    use crate::logic::rules::RuleMatch;
    use crate::logic::sample::loader::tests::elf_bytes;
    use crate::logic::sample::sample_from_bytes;
    use crate::logic::signatures::SyncError;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::{tempdir, TempDir};

    struct FixedScanner(Vec<RuleMatch>);

    impl PatternScanner for FixedScanner {
        fn scan(&self, _content: &[u8]) -> Result<Vec<RuleMatch>, RuleError> {
            Ok(self.0.clone())
        }
    }

    /// Every comparison reports the same similarity
    struct FixedSimilarity(u32, AtomicU32);

    impl FuzzyDigest for FixedSimilarity {
        fn digest(&self, content: &[u8]) -> String {
            format!("3:{}:x", content.len())
        }

        fn compare(&self, _left: &str, _right: &str) -> Result<u32, SignatureError> {
            self.1.fetch_add(1, Ordering::SeqCst);
            Ok(self.0)
        }
    }

    /// Restores the hash list on sync
    struct RestoringSync {
        root: PathBuf,
        calls: AtomicU32,
    }

    impl SignatureSync for RestoringSync {
        fn sync(&self) -> Result<(), SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            fs::write(self.root.join(MD5_BLACKLIST_FILE), "").map_err(SyncError::Spawn)
        }
    }

    struct NoSync;

    impl SignatureSync for NoSync {
        fn sync(&self) -> Result<(), SyncError> {
            Ok(())
        }
    }

    fn database(md5s: &[&str]) -> TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(MD5_BLACKLIST_FILE), md5s.join("\n")).unwrap();
        fs::write(dir.path().join(FUZZY_CORPUS_FILE), "3:ref:ref\n").unwrap();
        fs::write(dir.path().join(DOMAIN_IOC_FILE), "evil-c2.com\n").unwrap();
        dir
    }

    fn scorer(root: &Path, similarity: u32) -> StaticScorer {
        StaticScorer::new(
            SignatureDatabase::new(root),
            Arc::new(FixedSimilarity(similarity, AtomicU32::new(0))),
            Arc::new(NoSync),
        )
    }

    fn sample_with(len: usize, payload: &[u8]) -> Sample {
        let mut content = elf_bytes(2, len);
        content[64..64 + payload.len()].copy_from_slice(payload);
        sample_from_bytes(Path::new("sample.bin"), content, &FixedSimilarity(0, AtomicU32::new(0))).unwrap()
    }

    #[test]
    fn test_known_hash_short_circuits() {
        let sample = sample_with(512, b"");
        let db = database(&[sample.md5()]);
        let scanner = FixedScanner(vec![RuleMatch::new("packer", "UPX")]);

        let record = scorer(db.path(), 100).score(&sample, &scanner).unwrap();
        assert_eq!(record.score, 100);
        assert_eq!(record.reasons.len(), 1);
    }

    #[test]
    fn test_domain_ioc_adds_seventy() {
        let sample = sample_with(512, b"http://EVIL-C2.com/x");
        let db = database(&[]);

        let record = scorer(db.path(), 0).score(&sample, &FixedScanner(vec![])).unwrap();
        assert_eq!(record.score, 70);
    }

    #[test]
    fn test_ip_ioc_counts_once_with_domain() {
        let sample = sample_with(512, b"evil-c2.com 6.6.6.6");
        let db = database(&[]);
        fs::write(db.path().join(IP_IOC_FILE), "6.6.6.6\n").unwrap();

        let record = scorer(db.path(), 0).score(&sample, &FixedScanner(vec![])).unwrap();
        assert_eq!(record.score, 70);

        let ip_only = sample_with(512, b"connect 6.6.6.6:443");
        let record = scorer(db.path(), 0).score(&ip_only, &FixedScanner(vec![])).unwrap();
        assert_eq!(record.score, 70);
    }

    #[test]
    fn test_fuzzy_is_a_step_function() {
        let db = database(&[]);
        let sample = sample_with(8192, b"");

        for (similarity, expected) in [(90, 0), (91, 80), (100, 80)] {
            let record = scorer(db.path(), similarity).score(&sample, &FixedScanner(vec![])).unwrap();
            assert_eq!(record.score, expected, "similarity {}", similarity);
        }
    }

    #[test]
    fn test_small_sample_skips_fuzzy() {
        let db = database(&[]);
        let fuzzy = Arc::new(FixedSimilarity(100, AtomicU32::new(0)));
        let scorer = StaticScorer::new(SignatureDatabase::new(db.path()), fuzzy.clone(), Arc::new(NoSync));

        let record = scorer.score(&sample_with(4095, b""), &FixedScanner(vec![])).unwrap();
        assert_eq!(record.score, 0);
        assert_eq!(fuzzy.1.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_malware_rule_forces_exactly_one_hundred() {
        let db = database(&[]);
        let sample = sample_with(512, b"evil-c2.com");
        let scanner = FixedScanner(vec![
            RuleMatch::new("packer", "UPX"),
            RuleMatch::new("malware", "Linux_Trojan_Gafgyt"),
            RuleMatch::new("anti-debug/vm", "vmdetect_misc"),
        ]);

        let record = scorer(db.path(), 0).score(&sample, &scanner).unwrap();
        assert_eq!(record.score, 100);
    }

    #[test]
    fn test_rule_contributions_are_additive_per_match() {
        let db = database(&[]);
        let scanner = FixedScanner(vec![
            RuleMatch::new("malware", "is__elf"),
            RuleMatch::new("malware", "with_sqlite"),
            RuleMatch::new("malware", "ldpreload"),
            RuleMatch::new("anti-debug/vm", "network_udp"),
            RuleMatch::new("anti-debug/vm", "network_udp"),
            RuleMatch::new("unknown-ns", "whatever"),
        ]);

        let record = scorer(db.path(), 0).score(&sample_with(512, b""), &scanner).unwrap();
        assert_eq!(record.score, 20 + 20 + 20);
    }

    #[test]
    fn test_identical_content_scores_identically() {
        let db = database(&[]);
        let scanner = FixedScanner(vec![RuleMatch::new("packer", "UPX0")]);
        let scorer = scorer(db.path(), 95);

        let a = scorer.score(&sample_with(8192, b"evil-c2.com"), &scanner).unwrap();
        let b = scorer.score(&sample_with(8192, b"evil-c2.com"), &scanner).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.score, 70 + 80 + 50);
    }

    #[test]
    fn test_missing_hash_list_resyncs_once() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(DOMAIN_IOC_FILE), "").unwrap();
        let sync = Arc::new(RestoringSync {
            root: dir.path().to_path_buf(),
            calls: AtomicU32::new(0),
        });
        let scorer = StaticScorer::new(
            SignatureDatabase::new(dir.path()),
            Arc::new(FixedSimilarity(0, AtomicU32::new(0))),
            sync.clone(),
        );

        let record = scorer.score(&sample_with(512, b""), &FixedScanner(vec![])).unwrap();
        assert_eq!(record.score, 0);
        assert_eq!(sync.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_second_lookup_failure_surfaces() {
        let dir = tempdir().unwrap();
        let result = scorer(dir.path(), 0).score(&sample_with(512, b""), &FixedScanner(vec![]));

        assert!(matches!(result, Err(StaticError::KnownHash(SignatureError::Unavailable { .. }))));
    }
}
