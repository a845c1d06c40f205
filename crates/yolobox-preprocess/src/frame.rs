//! Interleaved 8-bit frames and file loading.

use std::path::Path;

use image::{DynamicImage, RgbImage};
use tracing::{debug, warn};

use crate::{PreprocessError, Result};

/// Byte order of the three interleaved channels of a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    /// `R,G,B` – what the `image` crate decodes to.
    Rgb,
    /// `B,G,R` – OpenCV / GDI style buffers.
    Bgr,
}

impl ChannelOrder {
    /// Offset inside one interleaved pixel of the byte that feeds output
    /// plane `plane` (0=R, 1=G, 2=B).
    pub fn source_index(self, plane: usize) -> usize {
        match self {
            ChannelOrder::Rgb => plane,
            ChannelOrder::Bgr => 2 - plane,
        }
    }
}

/// A decoded image: `width * height` pixels, 3 bytes each, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    order: ChannelOrder,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap an interleaved buffer. The length must be exactly `w*h*3`.
    pub fn new(width: u32, height: u32, order: ChannelOrder, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(PreprocessError::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, order, data })
    }

    /// Decode a PNG/JPEG file into an RGB frame.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| PreprocessError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from(img))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixel at `(x, y)` as stored, i.e. in [`Frame::order`].
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let base = (y as usize * self.width as usize + x as usize) * 3;
        let px = self.data.get(base..base + 3)?;
        Some([px[0], px[1], px[2]])
    }

    /// Convert to an `image` buffer, swapping to RGB when needed.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        let data = match self.order {
            ChannelOrder::Rgb => self.data.clone(),
            ChannelOrder::Bgr => self
                .data
                .chunks_exact(3)
                .flat_map(|px| [px[2], px[1], px[0]])
                .collect(),
        };
        RgbImage::from_raw(self.width, self.height, data)
    }
}

impl From<RgbImage> for Frame {
    fn from(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            order: ChannelOrder::Rgb,
            data: img.into_raw(),
        }
    }
}

impl From<DynamicImage> for Frame {
    fn from(img: DynamicImage) -> Self {
        Self::from(img.to_rgb8())
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("order", &self.order)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Decode one image file.
pub fn load_frame(path: impl AsRef<Path>) -> Result<Frame> {
    Frame::open(path)
}

/// Decode a list of image files into batch slots.
///
/// A file that is missing or cannot be decoded becomes an empty slot
/// (`None`); the batch is never shortened.
pub fn load_slots<P: AsRef<Path>>(paths: &[P]) -> Vec<Option<Frame>> {
    paths
        .iter()
        .map(|path| match Frame::open(path) {
            Ok(frame) => {
                debug!(path = ?path.as_ref(), w = frame.width, h = frame.height, "loaded image");
                Some(frame)
            }
            Err(e) => {
                warn!("skipping slot: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_buffer() {
        let err = Frame::new(2, 2, ChannelOrder::Rgb, vec![0; 11]).unwrap_err();
        assert!(matches!(err, PreprocessError::BufferSize { expected: 12, actual: 11, .. }));
    }

    #[test]
    fn bgr_source_index_swaps_outer_channels() {
        assert_eq!(ChannelOrder::Bgr.source_index(0), 2);
        assert_eq!(ChannelOrder::Bgr.source_index(1), 1);
        assert_eq!(ChannelOrder::Bgr.source_index(2), 0);
        assert_eq!(ChannelOrder::Rgb.source_index(0), 0);
    }

    #[test]
    fn pixel_lookup_is_bounds_checked() {
        let frame = Frame::new(2, 1, ChannelOrder::Rgb, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(frame.pixel(1, 0), Some([4, 5, 6]));
        assert_eq!(frame.pixel(2, 0), None);
        assert_eq!(frame.pixel(0, 1), None);
    }

    #[test]
    fn bgr_frame_converts_back_to_rgb() {
        let frame = Frame::new(1, 1, ChannelOrder::Bgr, vec![10, 20, 30]).unwrap();
        let img = frame.to_rgb_image().unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [30, 20, 10]);
    }

    #[test]
    fn missing_files_become_empty_slots() {
        let slots = load_slots(&["/definitely/not/here.png", "/nor/here.jpg"]);
        assert_eq!(slots.len(), 2);
        assert!(slots.iter().all(Option::is_none));
    }
}
