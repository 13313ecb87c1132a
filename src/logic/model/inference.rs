//! Inference Engine - ONNX Runtime Integration
//!
//! Runs the syscall-sequence classifier. The model takes one fixed-length
//! id sequence and returns the probability of the malicious class.

use std::path::Path;

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;
use thiserror::Error;

/// Input length the classifier was trained on
pub const SEQUENCE_LENGTH: usize = 25077;

/// Preferred output when the model exposes labels and probabilities separately
const PROBABILITY_OUTPUT: &str = "probabilities";

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("failed to load model: {0}")]
    Load(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("process {pid} has no traced syscalls")]
    EmptyTrace { pid: u64 },

    #[error("process {pid} traced {traced} calls, none of them a known syscall")]
    NoKnownSyscalls { pid: u64, traced: usize },

    #[error("report contains no processes")]
    NoProcesses,
}

/// Probability that a syscall id sequence is malicious
pub trait SyscallModel: Send + Sync {
    fn predict(&self, sequence: &[u32]) -> Result<f32, ClassifierError>;
}

/// Post-pad with zeros, or keep the most recent `len` ids
pub fn pad_sequence(sequence: &[u32], len: usize) -> Vec<u32> {
    if sequence.len() >= len {
        return sequence[sequence.len() - len..].to_vec();
    }

    let mut padded = Vec::with_capacity(len);
    padded.extend_from_slice(sequence);
    padded.resize(len, 0);
    padded
}

pub struct OnnxSyscallModel {
    session: Mutex<Session>,
    output_name: String,
}

impl OnnxSyscallModel {
    pub fn load(model_path: &Path) -> Result<Self, ClassifierError> {
        log::info!("[Model] Loading ONNX model from: {}", model_path.display());

        if !model_path.exists() {
            return Err(ClassifierError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()
            .map_err(|e| ClassifierError::Load(format!("session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ClassifierError::Load(format!("optimization: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| ClassifierError::Load(e.to_string()))?;

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name == PROBABILITY_OUTPUT)
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .ok_or_else(|| ClassifierError::Load("no output defined".to_string()))?;

        log::info!("[Model] ONNX model loaded, reading output '{}'", output_name);

        Ok(Self {
            session: Mutex::new(session),
            output_name,
        })
    }
}

impl SyscallModel for OnnxSyscallModel {
    fn predict(&self, sequence: &[u32]) -> Result<f32, ClassifierError> {
        let prepared: Vec<f32> = pad_sequence(sequence, SEQUENCE_LENGTH).into_iter().map(|id| id as f32).collect();

        let input_array = Array2::<f32>::from_shape_vec((1, SEQUENCE_LENGTH), prepared)
            .map_err(|e| ClassifierError::Inference(format!("array error: {}", e)))?;
        let input_tensor =
            Value::from_array(input_array).map_err(|e| ClassifierError::Inference(format!("tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| ClassifierError::Inference(format!("missing output '{}'", self.output_name)))?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("extract error: {}", e)))?;

        // [p(clean), p(malicious)] for a two-class model, a bare score otherwise
        let probability = match data {
            [_, malicious, ..] => *malicious,
            [score] => *score,
            [] => return Err(ClassifierError::Inference("empty output".to_string())),
        };

        Ok(probability.clamp(0.0, 1.0))
    }
}
