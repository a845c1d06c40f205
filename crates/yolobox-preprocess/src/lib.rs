// yolobox-preprocess/src/lib.rs
// ============================================================
// yolobox-preprocess  –  letterbox + batch tensor packing
// ------------------------------------------------------------
// Pipeline: Frame (interleaved u8) → letterboxed canvas →
//           planar RGB f32 slot inside [B,3,H,W]
// ------------------------------------------------------------
// Public API
//   * LetterboxParams::compute(w,h,W,H) – ratio + padding
//   * letterbox(frame, W, H)            – gray canvas + params
//   * TensorPacker::pack(slots)         – PackedBatch
//   * load_frame / load_slots           – decode PNG/JPEG files
// ============================================================

//! yolobox – preprocessing layer
//!
//! Turns decoded images into the dense `[batch, 3, H, W]` tensor a
//! YOLO-layout detector expects. Every slot is resized with a uniform
//! ratio, centred on a `(114,114,114)` canvas and normalised to `0‑1`.
//! The [`LetterboxParams`] of each slot are handed back so detections
//! can later be mapped onto the source image.

use std::path::PathBuf;
use thiserror::Error;

mod frame;
mod letterbox;
mod packer;

pub use frame::{load_frame, load_slots, ChannelOrder, Frame};
pub use letterbox::{letterbox, LetterboxParams, Letterboxed, PAD_VALUE};
pub use packer::{PackedBatch, TensorPacker};

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Dimensions must be positive: source {src_w}x{src_h}, target {dst_w}x{dst_h}")]
    ZeroDimension { src_w: u32, src_h: u32, dst_w: u32, dst_h: u32 },
    #[error("Pixel buffer holds {actual} bytes, expected {expected} for {width}x{height}x3")]
    BufferSize { width: u32, height: u32, expected: usize, actual: usize },
    #[error("Batch holds {capacity} slots, got {given} images")]
    BatchOverflow { capacity: usize, given: usize },
    #[error("Resize failed: {0}")]
    Resize(String),
    #[error("Failed to decode {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type Result<T> = std::result::Result<T, PreprocessError>;
