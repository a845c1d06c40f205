//! Aspect-preserving resize into a fixed, gray-padded canvas.

use resize::{Pixel, Type};
use rgb::FromSlice;

use crate::{Frame, PreprocessError, Result};

/// Neutral gray used for the padding bands.
pub const PAD_VALUE: u8 = 114;

/// Geometry of one letterbox operation. Computed once per image and
/// never changed afterwards; the same value drives the inverse mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxParams {
    ratio: f32,
    pad_x: u32,
    pad_y: u32,
    orig_width: u32,
    orig_height: u32,
    target_width: u32,
    target_height: u32,
    new_width: u32,
    new_height: u32,
}

impl LetterboxParams {
    /// `ratio = min(W/w, H/h)`, scaled size floored, padding centred
    /// (floored).
    ///
    /// The limiting side is picked with an exact integer comparison and the
    /// other side is the exact integer floor of `side * ratio`, so the
    /// limiting dimension is always filled completely.
    pub fn compute(orig_width: u32, orig_height: u32, target_width: u32, target_height: u32) -> Result<Self> {
        if orig_width == 0 || orig_height == 0 || target_width == 0 || target_height == 0 {
            return Err(PreprocessError::ZeroDimension {
                src_w: orig_width,
                src_h: orig_height,
                dst_w: target_width,
                dst_h: target_height,
            });
        }

        let (w, h) = (orig_width as u64, orig_height as u64);
        let (tw, th) = (target_width as u64, target_height as u64);

        // W/w <= H/h  <=>  W*h <= H*w
        let (ratio, new_width, new_height) = if tw * h <= th * w {
            (target_width as f32 / orig_width as f32, target_width, (h * tw / w) as u32)
        } else {
            (target_height as f32 / orig_height as f32, (w * th / h) as u32, target_height)
        };

        Ok(Self {
            ratio,
            pad_x: (target_width - new_width) / 2,
            pad_y: (target_height - new_height) / 2,
            orig_width,
            orig_height,
            target_width,
            target_height,
            new_width,
            new_height,
        })
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn pad_x(&self) -> u32 {
        self.pad_x
    }

    pub fn pad_y(&self) -> u32 {
        self.pad_y
    }

    pub fn orig_width(&self) -> u32 {
        self.orig_width
    }

    pub fn orig_height(&self) -> u32 {
        self.orig_height
    }

    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    pub fn target_height(&self) -> u32 {
        self.target_height
    }

    /// Width of the resized image inside the canvas.
    pub fn new_width(&self) -> u32 {
        self.new_width
    }

    /// Height of the resized image inside the canvas.
    pub fn new_height(&self) -> u32 {
        self.new_height
    }

    /// Source pixel position → canvas position.
    pub fn to_letterbox_point(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.ratio + self.pad_x as f32, y * self.ratio + self.pad_y as f32)
    }

    /// Source length → canvas length.
    pub fn to_letterbox_length(&self, len: f32) -> f32 {
        len * self.ratio
    }

    /// Canvas position → source pixel position. No clamping.
    pub fn to_original_point(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x as f32) / self.ratio, (y - self.pad_y as f32) / self.ratio)
    }

    /// Canvas length → source length.
    pub fn to_original_length(&self, len: f32) -> f32 {
        len / self.ratio
    }
}

/// A letterboxed canvas plus the parameters that produced it.
#[derive(Debug, Clone)]
pub struct Letterboxed {
    pub canvas: Frame,
    pub params: LetterboxParams,
}

/// Resize `frame` into a `target_width x target_height` canvas filled with
/// [`PAD_VALUE`], the scaled image centred at `(pad_x, pad_y)`.
///
/// The canvas keeps the channel order of the source.
pub fn letterbox(frame: &Frame, target_width: u32, target_height: u32) -> Result<Letterboxed> {
    let params = LetterboxParams::compute(frame.width(), frame.height(), target_width, target_height)?;

    let tw = target_width as usize;
    let mut canvas = vec![PAD_VALUE; tw * target_height as usize * 3];

    // a side can collapse to 0 px for extreme aspect ratios; the canvas
    // then stays pure padding
    if params.new_width > 0 && params.new_height > 0 {
        let resized = resample(frame, params.new_width, params.new_height)?;
        let row_bytes = params.new_width as usize * 3;
        for (row, src) in resized.chunks_exact(row_bytes).enumerate() {
            let start = ((params.pad_y as usize + row) * tw + params.pad_x as usize) * 3;
            canvas[start..start + row_bytes].copy_from_slice(src);
        }
    }

    Ok(Letterboxed {
        canvas: Frame::new(target_width, target_height, frame.order(), canvas)?,
        params,
    })
}

fn resample(frame: &Frame, dst_w: u32, dst_h: u32) -> Result<Vec<u8>> {
    if frame.width() == dst_w && frame.height() == dst_h {
        return Ok(frame.data().to_vec());
    }

    let mut dst = vec![0u8; dst_w as usize * dst_h as usize * 3];
    let mut resizer = resize::new(
        frame.width() as usize,
        frame.height() as usize,
        dst_w as usize,
        dst_h as usize,
        Pixel::RGB8,
        Type::Triangle,
    )
    .map_err(|e| PreprocessError::Resize(format!("{e:?}")))?;

    resizer
        .resize(frame.data().as_rgb(), dst.as_rgb_mut())
        .map_err(|e| PreprocessError::Resize(format!("{e:?}")))?;
    Ok(dst)
}
