//! Tensor layout read from the model, and raw engine output.

use crate::{ModelError, Result};
use ndarray::ArrayView3;

/// Fields before the class scores in one output row: cx, cy, w, h, obj.
pub const FIXED_FIELDS: usize = 5;

/// Names and shapes of the single input and output tensor.
///
/// * input  – `[batch_capacity, 3, H, W]`
/// * output – `[batch_capacity, N, 5 + num_classes]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub input_name: String,
    pub input_shape: [usize; 4],
    pub output_name: String,
    pub output_shape: [usize; 3],
}

impl ModelSpec {
    /// Validate declared dims. Dynamic (`-1`) dims are rejected: the
    /// pipeline runs fixed-shape models only.
    pub fn from_dims(
        input_name: &str,
        input_dims: &[i64],
        output_name: &str,
        output_dims: &[i64],
    ) -> Result<Self> {
        let input = fixed_dims(input_name, input_dims)?;
        let output = fixed_dims(output_name, output_dims)?;

        let input_shape: [usize; 4] = input.try_into().map_err(|dims: Vec<usize>| {
            ModelError::InvalidModel(format!(
                "input `{input_name}` must be [B,3,H,W], got {} dims",
                dims.len()
            ))
        })?;
        let output_shape: [usize; 3] = output.try_into().map_err(|dims: Vec<usize>| {
            ModelError::InvalidModel(format!(
                "output `{output_name}` must be [B,N,E], got {} dims",
                dims.len()
            ))
        })?;

        if input_shape[1] != 3 {
            return Err(ModelError::InvalidModel(format!(
                "input `{input_name}` has {} channels, expected 3",
                input_shape[1]
            )));
        }
        if output_shape[0] != input_shape[0] {
            return Err(ModelError::InvalidModel(format!(
                "output batch {} differs from input batch {}",
                output_shape[0], input_shape[0]
            )));
        }
        if output_shape[2] < FIXED_FIELDS {
            return Err(ModelError::InvalidModel(format!(
                "output rows hold {} values, need at least {FIXED_FIELDS}",
                output_shape[2]
            )));
        }

        Ok(Self {
            input_name: input_name.to_string(),
            input_shape,
            output_name: output_name.to_string(),
            output_shape,
        })
    }

    pub fn batch_capacity(&self) -> usize {
        self.input_shape[0]
    }

    pub fn input_height(&self) -> usize {
        self.input_shape[2]
    }

    pub fn input_width(&self) -> usize {
        self.input_shape[3]
    }

    pub fn num_detections(&self) -> usize {
        self.output_shape[1]
    }

    pub fn elements_per_detection(&self) -> usize {
        self.output_shape[2]
    }

    pub fn num_classes(&self) -> usize {
        self.output_shape[2] - FIXED_FIELDS
    }
}

fn fixed_dims(name: &str, dims: &[i64]) -> Result<Vec<usize>> {
    dims.iter()
        .map(|&d| {
            usize::try_from(d).ok().filter(|&d| d > 0).ok_or_else(|| {
                ModelError::InvalidModel(format!("tensor `{name}` has non-fixed dims {dims:?}"))
            })
        })
        .collect()
}

/// Dense f32 tensor as returned by an engine, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutput {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl RawOutput {
    /// View as `[B, N, E]`, failing unless the shape is exactly `expected`
    /// and the buffer length matches it.
    pub fn view(&self, expected: [usize; 3]) -> Result<ArrayView3<'_, f32>> {
        let mismatch = || ModelError::OutputShapeMismatch {
            expected: expected.to_vec(),
            actual: self.shape.clone(),
        };
        if self.shape.as_slice() != expected.as_slice() {
            return Err(mismatch());
        }
        ArrayView3::from_shape((expected[0], expected[1], expected[2]), &self.data)
            .map_err(|_| mismatch())
    }
}
