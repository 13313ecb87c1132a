//! Batch progress accounting
//!
//! Every sample owns an equal slot of `100 / file_count`. Inside a slot the
//! progress moves at fixed checkpoints; finishing a slot folds in whatever
//! is left, so the batch always ends at exactly 100.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Checkpoint {
    Loaded,
    StaticScored,
    DynamicScored,
}

impl Checkpoint {
    /// Share of the slot reached at this checkpoint
    fn fraction(&self) -> f64 {
        match self {
            Checkpoint::Loaded => 0.25,
            Checkpoint::StaticScored => 0.5,
            Checkpoint::DynamicScored => 0.75,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    file_count: usize,
    value: f64,
}

impl Progress {
    pub fn new(file_count: usize) -> Self {
        Self {
            file_count,
            value: if file_count == 0 { 100.0 } else { 0.0 },
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    fn slot_share(&self) -> f64 {
        100.0 / self.file_count.max(1) as f64
    }

    pub fn checkpoint(&mut self, index: usize, checkpoint: Checkpoint) {
        let target = self.slot_share() * (index as f64 + checkpoint.fraction());
        self.value = self.value.max(target.min(100.0));
    }

    /// Mark slot `index` done, whether it produced a verdict or an error
    pub fn finish_slot(&mut self, index: usize) {
        let target = if index + 1 >= self.file_count {
            100.0
        } else {
            100.0 * (index + 1) as f64 / self.file_count as f64
        };
        self.value = self.value.max(target);
    }
}
