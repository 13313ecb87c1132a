//! Scoring Constants & Rule Policy
//!
//! Thresholds of the decision aggregator and the per-namespace table that
//! turns YARA matches into score contributions.
//! No scoring logic here, only constants and the lookup.

use serde::{Deserialize, Serialize};

use crate::logic::rules::RuleMatch;

// ============================================================================
// THRESHOLDS
// ============================================================================

/// A score at or above this is conclusive on its own
pub const CERTAIN_SCORE: u32 = 100;

/// Static + dynamic at or above this = Malicious
pub const CORROBORATION_THRESHOLD: u32 = 170;

/// Probability above which a single process is conclusive
pub const MALICIOUS_PROBABILITY: f32 = 0.5;

// ============================================================================
// STATIC CONTRIBUTIONS
// ============================================================================

/// Any blacklisted domain or IP found in the sample
pub const IOC_SCORE: u32 = 70;

/// Fuzzy similarity must exceed this to count
pub const FUZZY_DISTANCE_THRESHOLD: u32 = 90;

pub const FUZZY_SCORE: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionThresholds {
    pub certain: u32,
    pub corroboration: u32,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            certain: CERTAIN_SCORE,
            corroboration: CORROBORATION_THRESHOLD,
        }
    }
}

// ============================================================================
// RULE POLICY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceSelector {
    Any,
    Named(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSelector {
    Exact(&'static str),
    Prefix(&'static str),
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contribution {
    Ignore,
    Add(u32),
    /// Forces the static score to certainty
    Conclusive,
}

#[derive(Debug, Clone, Copy)]
pub struct RulePolicy {
    pub namespace: NamespaceSelector,
    pub rule: RuleSelector,
    pub contribution: Contribution,
    pub note: &'static str,
}

impl RulePolicy {
    fn applies(&self, m: &RuleMatch) -> bool {
        let namespace_ok = match self.namespace {
            NamespaceSelector::Any => true,
            NamespaceSelector::Named(ns) => m.namespace == ns,
        };
        let rule_ok = match self.rule {
            RuleSelector::Exact(name) => m.rule == name,
            RuleSelector::Prefix(prefix) => m.rule.starts_with(prefix),
            RuleSelector::Any => true,
        };
        namespace_ok && rule_ok
    }
}

const fn policy(namespace: NamespaceSelector, rule: RuleSelector, contribution: Contribution, note: &'static str) -> RulePolicy {
    RulePolicy { namespace, rule, contribution, note }
}

use Contribution::{Add, Conclusive, Ignore};
use NamespaceSelector::{Any as AnyNamespace, Named};
use RuleSelector::{Any as AnyRule, Exact, Prefix};

/// First matching entry wins
pub static RULE_POLICY: &[RulePolicy] = &[
    policy(AnyNamespace, Exact("is__elf"), Ignore, "file type marker"),
    policy(Named("malware"), Exact("with_sqlite"), Ignore, "benign library marker"),
    policy(Named("malware"), Exact("suspicious_packer_section"), Add(50), "suspicious packer section"),
    policy(Named("malware"), Exact("ldpreload"), Add(20), "LD_PRELOAD hijack"),
    policy(Named("malware"), AnyRule, Conclusive, "malware signature"),
    policy(Named("packer"), Prefix("UPX"), Add(50), "UPX packed"),
    policy(Named("packer"), AnyRule, Ignore, "other packer"),
    policy(Named("anti-debug/vm"), Exact("vmdetect_misc"), Add(60), "VM detection"),
    policy(Named("anti-debug/vm"), Prefix("network_"), Add(20), "network capability"),
    policy(Named("anti-debug/vm"), AnyRule, Add(40), "anti-debug/anti-VM technique"),
];

/// Policy entry for a match, `None` for an unknown namespace
pub fn evaluate(m: &RuleMatch) -> Option<&'static RulePolicy> {
    RULE_POLICY.iter().find(|p| p.applies(m))
}
