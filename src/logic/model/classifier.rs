//! Behavioral Classifier
//!
//! Turns a sandbox behavior report into the dynamic score. Every process is
//! classified on its own; the most suspicious one decides.

use std::sync::Arc;

use crate::logic::sandbox::BehaviorReport;
use crate::logic::threat::rules::{CERTAIN_SCORE, MALICIOUS_PROBABILITY};

use super::inference::{ClassifierError, SyscallModel};
use super::vocabulary::encode;

/// Outcome of classifying one behavior report
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicAssessment {
    pub score: u32,
    pub max_probability: f32,
    /// Processes classified before the decision was reached
    pub processes: usize,
}

/// Dynamic score of a probability.
///
/// Above the malicious probability the sample is certain (100); otherwise the
/// 0 - 0.5 range is rescaled linearly onto 0 - 100.
pub fn dynamic_score(probability: f32) -> u32 {
    if probability > MALICIOUS_PROBABILITY {
        return CERTAIN_SCORE;
    }
    let scaled = f64::from(probability.max(0.0)) * f64::from(CERTAIN_SCORE) / f64::from(MALICIOUS_PROBABILITY);
    scaled.round() as u32
}

pub struct BehaviorClassifier {
    model: Arc<dyn SyscallModel>,
}

impl BehaviorClassifier {
    pub fn new(model: Arc<dyn SyscallModel>) -> Self {
        Self { model }
    }

    pub fn assess(&self, report: &BehaviorReport) -> Result<DynamicAssessment, ClassifierError> {
        if report.processes.is_empty() {
            return Err(ClassifierError::NoProcesses);
        }

        let mut max_probability = 0.0f32;
        let mut classified = 0;

        for process in &report.processes {
            // An empty trace means the capture failed, not that the process was inert
            if process.syscalls.is_empty() {
                return Err(ClassifierError::EmptyTrace { pid: process.pid });
            }

            let sequence = encode(&process.syscalls);
            if sequence.is_empty() {
                return Err(ClassifierError::NoKnownSyscalls {
                    pid: process.pid,
                    traced: process.syscalls.len(),
                });
            }

            let probability = self.model.predict(&sequence)?;
            classified += 1;

            log::debug!(
                "[Dynamic] Process {} ({}): {} syscalls, p(malicious) = {:.3}",
                process.pid,
                process.process_name,
                sequence.len(),
                probability
            );

            max_probability = max_probability.max(probability);
            if probability > MALICIOUS_PROBABILITY {
                log::warn!("[Dynamic] Process {} classified malicious", process.pid);
                break;
            }
        }

        Ok(DynamicAssessment {
            score: dynamic_score(max_probability),
            max_probability,
            processes: classified,
        })
    }
}
