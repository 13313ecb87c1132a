//! Threat Scoring Module
//!
//! Static scoring, rule policy and the decision aggregator.
//!
//! Structure:
//! - types.rs: Verdict, ScoreRecord, Decision, VerdictReport
//! - rules.rs: thresholds, contributions, rule policy table
//! - static_scorer.rs: hash / IOC / fuzzy / rule checks
//! - decision.rs: static + dynamic -> verdict

pub mod decision;
pub mod rules;
pub mod static_scorer;
pub mod types;

pub use decision::{decide_combined, decide_static};
pub use rules::{DecisionThresholds, RULE_POLICY};
pub use static_scorer::{StaticError, StaticScorer};
pub use types::{Decision, DecisionReason, ScoreRecord, Verdict, VerdictReport};
