// yolobox-detect/src/lib.rs
// ============================================================
// yolobox-detect  –  Post-processing + batch pipeline
// Runs a fixed-shape YOLO-layout network through any
// InferenceEngine (ONNX Runtime by default).
// ------------------------------------------------------------
// Pipeline: [Option<Frame>] → Array4<f32> → engine →
//           [B,N,5+C] → Vec<Detection> → NMS → original px
// ------------------------------------------------------------
// Public API
//   * decode(view, conf)                  – candidate rows
//   * non_max_suppression(dets, iou)      – per-class greedy NMS
//   * map_to_original(det, params)        – undo the letterbox
//   * BatchDetector::detect_batch(slots)  – all of the above
// ============================================================

//! yolobox – detection layer
//!
//! This crate turns the raw `[batch, N, 5 + classes]` output of a
//! YOLO-layout model into boxes on the source images. It provides a
//! [`Detector`] trait plus the concrete **`BatchDetector`**, generic over
//! the [`InferenceEngine`] that actually runs the network.
//!
//! Geometry stays in letterboxed pixel space until [`map_to_original`]
//! runs; nothing else inverts the letterbox.

use std::time::Duration;

use thiserror::Error;
use yolobox_model::ModelError;
use yolobox_preprocess::{Frame, PreprocessError};

mod decode;
mod detection;
mod mapping;
mod nms;
mod pipeline;

pub use decode::decode;
pub use detection::{Detection, MappedDetection};
pub use mapping::{map_detections, map_to_original};
pub use nms::{iou, non_max_suppression, suppress_batch};
pub use pipeline::BatchDetector;
pub use yolobox_model::{InferenceEngine, ModelSpec, OrtEngine, PipelineConfig, RawOutput};

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("Output rows hold {0} values, need at least 5 (cx, cy, w, h, conf)")]
    RowTooShort(usize),
    #[error("Deadline passed {0:?} ago")]
    DeadlineExceeded(Duration),
}

pub type Result<T> = std::result::Result<T, DetectError>;

/// Trait for object detectors.
pub trait Detector {
    /// One result list per input slot, in slot order.
    fn detect_batch(&mut self, slots: &[Option<Frame>]) -> Result<Vec<Vec<MappedDetection>>>;

    /// Single image: a batch with one filled slot.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<MappedDetection>> {
        let mut results = self.detect_batch(&[Some(frame.clone())])?;
        Ok(results.pop().unwrap_or_default())
    }
}
