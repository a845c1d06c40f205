//! # yolobox-model
//!
//! Everything that touches the model itself rather than pixels or boxes:
//! the immutable pipeline configuration, the tensor names and shapes read
//! from the model at load time, and the ONNX Runtime session that runs it.
//!
//! ## Features
//!
//! - [`PipelineConfig`] with JSON load/save and validation
//! - [`ModelSpec`] introspected once per session, never hardcoded
//! - [`InferenceEngine`] seam with an ONNX Runtime implementation ([`OrtEngine`])
//! - Opaque execution-provider selection (CPU, CUDA behind the `cuda` feature)

use std::path::Path;
use thiserror::Error;

pub mod config;
pub mod engine;
pub mod spec;

pub use config::{
    ExecutionProvider, PipelineConfig, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD,
};
pub use engine::{InferenceEngine, OrtEngine};
pub use spec::{ModelSpec, RawOutput};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("ONNX Runtime error: {0}")]
    Runtime(String),
    #[error("Invalid model: {0}")]
    InvalidModel(String),
    #[error("Inference returned no tensor named {0:?}")]
    InferenceResultMissing(String),
    #[error("Input shape mismatch: model expects {expected:?}, got {actual:?}")]
    InputShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },
    #[error("Output shape mismatch: model declares {expected:?}, got {actual:?}")]
    OutputShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },
    #[error("Execution provider `{0}` is not compiled in")]
    ProviderUnavailable(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Open a model with default session options and report its tensor layout.
pub fn inspect_model(model_path: &Path) -> Result<ModelSpec> {
    let config = PipelineConfig {
        model_path: model_path.to_path_buf(),
        ..Default::default()
    };
    let engine = OrtEngine::load(&config)?;
    Ok(engine.spec().clone())
}
