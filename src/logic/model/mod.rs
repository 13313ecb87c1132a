//! Behavioral Model Module
//!
//! Structure:
//! - vocabulary.rs: syscall name -> id
//! - inference.rs: ONNX classifier behind the `SyscallModel` trait
//! - classifier.rs: behavior report -> dynamic score

pub mod classifier;
pub mod inference;
pub mod vocabulary;

pub use classifier::{dynamic_score, BehaviorClassifier, DynamicAssessment};
pub use inference::{pad_sequence, ClassifierError, OnnxSyscallModel, SyscallModel, SEQUENCE_LENGTH};
pub use vocabulary::{encode, syscall_id};
