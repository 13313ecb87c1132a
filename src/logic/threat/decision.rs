//! Decision Aggregator
//!
//! Pure functions combining static and dynamic scores into a verdict.

use super::rules::DecisionThresholds;
use super::types::{Decision, DecisionReason, Verdict};

/// Verdict from the static score alone, `None` if dynamic analysis must run
pub fn decide_static(static_score: u32, th: &DecisionThresholds) -> Option<Decision> {
    (static_score >= th.certain).then_some(Decision {
        verdict: Verdict::Malicious,
        reason: DecisionReason::StaticCertain,
    })
}

/// Verdict once both scores are known
pub fn decide_combined(static_score: u32, dynamic_score: u32, th: &DecisionThresholds) -> Decision {
    if let Some(decision) = decide_static(static_score, th) {
        return decision;
    }

    let (verdict, reason) = if dynamic_score >= th.certain {
        (Verdict::Malicious, DecisionReason::DynamicCertain)
    } else if static_score.saturating_add(dynamic_score) >= th.corroboration {
        (Verdict::Malicious, DecisionReason::Corroborated)
    } else {
        (Verdict::Clean, DecisionReason::BelowThreshold)
    };

    Decision { verdict, reason }
}
