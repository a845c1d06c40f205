//! Inference engine seam and its ONNX Runtime implementation.

use ndarray::Array4;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::value::{Tensor, ValueType};
use tracing::{debug, info};

use crate::{ExecutionProvider, ModelError, ModelSpec, PipelineConfig, RawOutput, Result};

/// A black box that maps one named input tensor to one named output
/// tensor. Implementations report the layout they were loaded with.
pub trait InferenceEngine {
    fn spec(&self) -> &ModelSpec;
    fn run(&mut self, input: &Array4<f32>) -> Result<RawOutput>;
}

/// ONNX Runtime session. Created once, released when dropped.
pub struct OrtEngine {
    session: Session,
    spec: ModelSpec,
}

fn runtime(e: impl std::fmt::Display) -> ModelError {
    ModelError::Runtime(e.to_string())
}

impl OrtEngine {
    /// Build a session for `config.model_path` and read its tensor layout.
    pub fn load(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        info!(path = ?config.model_path, provider = ?config.execution_provider, "loading model");

        let mut builder = Session::builder()
            .map_err(runtime)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(runtime)?;
        if let Some(threads) = config.intra_threads {
            builder = builder.with_intra_threads(threads).map_err(runtime)?;
        }
        let builder = with_provider(builder, config.execution_provider)?;
        let session = builder.commit_from_file(&config.model_path).map_err(runtime)?;

        let spec = Self::introspect(&session)?;
        info!(
            input = %spec.input_name,
            input_shape = ?spec.input_shape,
            output = %spec.output_name,
            output_shape = ?spec.output_shape,
            "model loaded"
        );
        Ok(Self { session, spec })
    }

    /// Exactly one input; the first declared output is the detection head.
    fn introspect(session: &Session) -> Result<ModelSpec> {
        let input = match session.inputs.as_slice() {
            [input] => input,
            other => {
                return Err(ModelError::InvalidModel(format!(
                    "expected exactly one input, model has {}",
                    other.len()
                )))
            }
        };
        let output = session
            .outputs
            .first()
            .ok_or_else(|| ModelError::InvalidModel("model has no outputs".into()))?;

        let input_dims = tensor_dims(&input.name, &input.input_type)?;
        let output_dims = tensor_dims(&output.name, &output.output_type)?;
        ModelSpec::from_dims(&input.name, &input_dims, &output.name, &output_dims)
    }
}

fn tensor_dims(name: &str, ty: &ValueType) -> Result<Vec<i64>> {
    match ty {
        ValueType::Tensor { shape, .. } => Ok(shape.iter().copied().collect()),
        other => Err(ModelError::InvalidModel(format!(
            "`{name}` is not a tensor: {other:?}"
        ))),
    }
}

fn with_provider(builder: SessionBuilder, provider: ExecutionProvider) -> Result<SessionBuilder> {
    match provider {
        ExecutionProvider::Cpu => Ok(builder),
        #[cfg(feature = "cuda")]
        ExecutionProvider::Cuda { device_id } => {
            use ort::execution_providers::CUDAExecutionProvider;
            builder
                .with_execution_providers([CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build()])
                .map_err(runtime)
        }
        #[cfg(not(feature = "cuda"))]
        ExecutionProvider::Cuda { .. } => Err(ModelError::ProviderUnavailable("cuda".into())),
    }
}

impl InferenceEngine for OrtEngine {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn run(&mut self, input: &Array4<f32>) -> Result<RawOutput> {
        let [b, c, h, w] = self.spec.input_shape;
        if input.shape() != [b, c, h, w] {
            return Err(ModelError::InputShapeMismatch {
                expected: vec![b, c, h, w],
                actual: input.shape().to_vec(),
            });
        }

        // logical iteration order == standard (row-major) layout
        let data: Vec<f32> = input.iter().copied().collect();
        let tensor = Tensor::from_array(([b, c, h, w], data)).map_err(runtime)?;

        debug!(input = %self.spec.input_name, "running session");
        let outputs = self
            .session
            .run(ort::inputs![self.spec.input_name.as_str() => tensor])
            .map_err(runtime)?;

        let value = outputs
            .get(self.spec.output_name.as_str())
            .ok_or_else(|| ModelError::InferenceResultMissing(self.spec.output_name.clone()))?;
        let (shape, data) = value.try_extract_tensor::<f32>().map_err(runtime)?;

        let shape: Vec<usize> = shape.iter().map(|&d| usize::try_from(d).unwrap_or(0)).collect();
        debug!(output = %self.spec.output_name, shape = ?shape, "session returned");
        Ok(RawOutput { shape, data: data.to_vec() })
    }
}

impl Drop for OrtEngine {
    fn drop(&mut self) {
        debug!(model_input = %self.spec.input_name, "releasing inference session");
    }
}
