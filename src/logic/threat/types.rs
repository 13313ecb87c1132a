//! Threat Types
//!
//! Scores, verdicts and the report handed to dispositions.
//! Data only, scoring lives in `static_scorer` and `decision`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ============================================================================
// VERDICT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Clean,
    Malicious,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Clean => "clean",
            Verdict::Malicious => "malicious",
        }
    }

    pub fn is_malicious(&self) -> bool {
        matches!(self, Verdict::Malicious)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// SCORE
// ============================================================================

/// Accumulated integer score with the findings that produced it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub score: u32,
    pub reasons: Vec<String>,
}

impl ScoreRecord {
    /// Short-circuit record: the sample is known bad
    pub fn certain(score: u32, reason: impl Into<String>) -> Self {
        Self {
            score,
            reasons: vec![reason.into()],
        }
    }

    pub fn add(&mut self, points: u32, reason: impl Into<String>) {
        self.score = self.score.saturating_add(points);
        self.reasons.push(reason.into());
    }
}

// ============================================================================
// DECISION
// ============================================================================

/// Which rule of the aggregator produced the verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionReason {
    /// Static score alone reached certainty, dynamic analysis skipped
    StaticCertain,
    DynamicCertain,
    /// Static and dynamic together crossed the corroboration threshold
    Corroborated,
    BelowThreshold,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::StaticCertain => "static analysis certain",
            DecisionReason::DynamicCertain => "dynamic analysis certain",
            DecisionReason::Corroborated => "static and dynamic corroborate",
            DecisionReason::BelowThreshold => "below threshold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub verdict: Verdict,
    pub reason: DecisionReason,
}

/// Final outcome for one sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictReport {
    pub path: PathBuf,
    pub sha256: String,
    pub verdict: Verdict,
    pub static_score: u32,
    /// `None` when dynamic analysis was skipped
    pub dynamic_score: Option<u32>,
    pub reason: DecisionReason,
    pub findings: Vec<String>,
}

impl std::fmt::Display for VerdictReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} (static {}, dynamic {}, {})",
            self.path.display(),
            self.verdict,
            self.static_score,
            self.dynamic_score.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
            self.reason.as_str()
        )
    }
}
