//! Rule Engine
//!
//! Owns the active compiled rule set. On load the index checksum is compared
//! with the marker stored next to the compiled cache:
//! - match: the cache is deserialized (rebuild on any cache failure)
//! - mismatch or no marker: rebuild, persist, then record the new checksum

use super::cache::{load_compiled, read_marker, save_compiled, write_marker};
use super::compiler::compile_rules;
use super::index::index_checksum;
use super::types::{PatternScanner, RuleError, RuleMatch, RuleSetOrigin, RuleSourceLayout, SkippedStatement};

pub struct RuleEngine {
    rules: yara_x::Rules,
    checksum: String,
    skipped: Vec<SkippedStatement>,
    origin: RuleSetOrigin,
}

impl RuleEngine {
    /// Load the rule set described by `layout`, reusing the cache when fresh
    pub fn load(layout: &RuleSourceLayout) -> Result<Self, RuleError> {
        let checksum = index_checksum(layout)?;

        let cache_is_fresh =
            read_marker(&layout.checksum_file).as_deref() == Some(checksum.as_str()) && layout.cache_file.exists();

        if cache_is_fresh {
            match load_compiled(&layout.cache_file) {
                Ok(rules) => {
                    log::info!("[Rules] Loaded compiled rules from {}", layout.cache_file.display());
                    return Ok(Self {
                        rules,
                        checksum,
                        skipped: Vec::new(),
                        origin: RuleSetOrigin::Cache,
                    });
                }
                Err(e) => log::warn!("[Rules] Compiled cache unusable, rebuilding: {}", e),
            }
        } else {
            log::info!("[Rules] Rule index changed, rebuilding");
        }

        let outcome = compile_rules(layout)?;

        match save_compiled(&layout.cache_file, &outcome.rules) {
            Ok(()) => {
                if let Err(e) = write_marker(&layout.checksum_file, &checksum) {
                    log::warn!("[Rules] Failed to record rule checksum: {}", e);
                }
            }
            Err(e) => log::warn!("[Rules] Failed to persist compiled rules: {}", e),
        }

        Ok(Self {
            rules: outcome.rules,
            checksum,
            skipped: outcome.skipped,
            origin: RuleSetOrigin::Compiled,
        })
    }

    /// Matching rules for `content`, namespace-qualified
    pub fn scan_bytes(&self, content: &[u8]) -> Result<Vec<RuleMatch>, RuleError> {
        let mut scanner = yara_x::Scanner::new(&self.rules);
        let results = scanner.scan(content).map_err(|e| RuleError::Scan(e.to_string()))?;

        Ok(results
            .matching_rules()
            .map(|rule| RuleMatch::new(rule.namespace(), rule.identifier()))
            .collect())
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Statements excluded during the last rebuild (empty when loaded from cache)
    pub fn skipped(&self) -> &[SkippedStatement] {
        &self.skipped
    }

    pub fn origin(&self) -> RuleSetOrigin {
        self.origin
    }
}

impl PatternScanner for RuleEngine {
    fn scan(&self, content: &[u8]) -> Result<Vec<RuleMatch>, RuleError> {
        self.scan_bytes(content)
    }
}
