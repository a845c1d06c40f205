//! Batch tensor packing: `[capacity, 3, H, W]`, planar RGB, `0‑1`.

use ndarray::parallel::prelude::*;
use ndarray::{Array4, ArrayViewMut3, Axis};
use tracing::{debug, warn};

use crate::{letterbox, Frame, LetterboxParams, PreprocessError, Result};

/// Result of packing one batch.
#[derive(Debug, Clone)]
pub struct PackedBatch {
    /// Shape `[capacity, 3, H, W]`; empty slots are all zero.
    pub tensor: Array4<f32>,
    /// One entry per slot, `None` where the slot was empty.
    pub params: Vec<Option<LetterboxParams>>,
}

/// Packs up to `capacity` frames into one dense model input.
#[derive(Debug, Clone)]
pub struct TensorPacker {
    capacity: usize,
    width: u32,
    height: u32,
}

impl TensorPacker {
    pub fn new(capacity: usize, width: u32, height: u32) -> Result<Self> {
        if capacity == 0 || width == 0 || height == 0 {
            return Err(PreprocessError::ZeroDimension {
                src_w: capacity as u32,
                src_h: 3,
                dst_w: width,
                dst_h: height,
            });
        }
        Ok(Self { capacity, width, height })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Letterbox every present slot and write it into its own
    /// `[3, H, W]` sub-view. Slots are independent, so they are packed in
    /// parallel; missing trailing slots count as empty. A frame with no
    /// pixels is left as an empty slot.
    pub fn pack(&self, slots: &[Option<Frame>]) -> Result<PackedBatch> {
        if slots.len() > self.capacity {
            return Err(PreprocessError::BatchOverflow {
                capacity: self.capacity,
                given: slots.len(),
            });
        }

        let mut tensor = Array4::<f32>::zeros((
            self.capacity,
            3,
            self.height as usize,
            self.width as usize,
        ));

        let params = tensor
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .map(|(slot, mut view)| match slots.get(slot) {
                Some(Some(frame)) if frame.width() == 0 || frame.height() == 0 => {
                    warn!(slot, w = frame.width(), h = frame.height(), "skipping empty frame");
                    Ok(None)
                }
                Some(Some(frame)) => self.pack_slot(frame, &mut view).map(Some),
                _ => Ok(None),
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            capacity = self.capacity,
            filled = params.iter().filter(|p| p.is_some()).count(),
            "packed batch"
        );
        Ok(PackedBatch { tensor, params })
    }

    fn pack_slot(&self, frame: &Frame, view: &mut ArrayViewMut3<f32>) -> Result<LetterboxParams> {
        let boxed = letterbox(frame, self.width, self.height)?;
        write_planar(&boxed.canvas, view);
        Ok(boxed.params)
    }
}

/// `view[[c, y, x]] = canvas[(y*W + x)*3 + k] / 255` where `k` is the
/// interleaved offset of output plane `c` in the canvas channel order.
fn write_planar(canvas: &Frame, view: &mut ArrayViewMut3<f32>) {
    let width = canvas.width() as usize;
    let order = canvas.order();
    let data = canvas.data();
    for ((c, y, x), value) in view.indexed_iter_mut() {
        let src = (y * width + x) * 3 + order.source_index(c);
        *value = f32::from(data[src]) / 255.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChannelOrder, PAD_VALUE};

    fn gradient(w: u32, h: u32, order: ChannelOrder) -> Frame {
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&[x as u8, y as u8, (x + y) as u8]);
            }
        }
        Frame::new(w, h, order, data).unwrap()
    }

    #[test]
    fn first_and_last_pixel_land_in_planar_positions() {
        let packer = TensorPacker::new(1, 8, 8).unwrap();
        let frame = gradient(8, 8, ChannelOrder::Rgb);
        let packed = packer.pack(&[Some(frame)]).unwrap();
        let t = &packed.tensor;

        assert_eq!(t[[0, 0, 0, 0]], 0.0);
        assert_eq!(t[[0, 2, 0, 0]], 0.0);
        assert_eq!(t[[0, 0, 7, 7]], 7.0 / 255.0);
        assert_eq!(t[[0, 1, 7, 7]], 7.0 / 255.0);
        assert_eq!(t[[0, 2, 7, 7]], 14.0 / 255.0);
    }

    #[test]
    fn row_stride_edge_does_not_bleed() {
        let packer = TensorPacker::new(1, 8, 8).unwrap();
        let packed = packer.pack(&[Some(gradient(8, 8, ChannelOrder::Rgb))]).unwrap();
        let t = &packed.tensor;
        // last pixel of row 2 and first pixel of row 3
        assert_eq!(t[[0, 0, 2, 7]], 7.0 / 255.0);
        assert_eq!(t[[0, 1, 2, 7]], 2.0 / 255.0);
        assert_eq!(t[[0, 0, 3, 0]], 0.0);
        assert_eq!(t[[0, 1, 3, 0]], 3.0 / 255.0);
    }

    #[test]
    fn bgr_source_is_swapped_to_rgb_planes() {
        let packer = TensorPacker::new(1, 2, 2).unwrap();
        let frame = Frame::new(2, 2, ChannelOrder::Bgr, [10u8, 20, 30].repeat(4)).unwrap();
        let packed = packer.pack(&[Some(frame)]).unwrap();
        let t = &packed.tensor;
        assert_eq!(t[[0, 0, 1, 1]], 30.0 / 255.0);
        assert_eq!(t[[0, 1, 1, 1]], 20.0 / 255.0);
        assert_eq!(t[[0, 2, 1, 1]], 10.0 / 255.0);
    }

    #[test]
    fn empty_slots_stay_zero_and_keep_shape() {
        let packer = TensorPacker::new(3, 4, 4).unwrap();
        let frame = gradient(4, 2, ChannelOrder::Rgb);
        let packed = packer.pack(&[None, Some(frame)]).unwrap();

        assert_eq!(packed.tensor.shape(), &[3, 3, 4, 4]);
        assert_eq!(packed.params.len(), 3);
        assert!(packed.params[0].is_none());
        assert!(packed.params[1].is_some());
        assert!(packed.params[2].is_none());
        assert!(packed.tensor.index_axis(Axis(0), 0).iter().all(|&v| v == 0.0));
        assert!(packed.tensor.index_axis(Axis(0), 2).iter().all(|&v| v == 0.0));
        // padding band of the filled slot is gray
        let gray = f32::from(PAD_VALUE) / 255.0;
        assert_eq!(packed.tensor[[1, 0, 0, 0]], gray);
    }

    #[test]
    fn values_are_normalised() {
        let packer = TensorPacker::new(2, 16, 16).unwrap();
        let frame = Frame::new(5, 9, ChannelOrder::Rgb, vec![255; 5 * 9 * 3]).unwrap();
        let packed = packer.pack(&[Some(frame.clone()), Some(frame)]).unwrap();
        assert!(packed.tensor.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn zero_sized_frames_become_empty_slots() {
        let packer = TensorPacker::new(3, 8, 8).unwrap();
        let empty_w = Frame::new(0, 4, ChannelOrder::Rgb, Vec::new()).unwrap();
        let empty_h = Frame::new(4, 0, ChannelOrder::Bgr, Vec::new()).unwrap();
        let packed = packer
            .pack(&[Some(empty_w), Some(gradient(8, 8, ChannelOrder::Rgb)), Some(empty_h)])
            .unwrap();

        assert!(packed.params[0].is_none());
        assert!(packed.params[1].is_some());
        assert!(packed.params[2].is_none());
        assert!(packed.tensor.index_axis(Axis(0), 0).iter().all(|&v| v == 0.0));
        assert!(packed.tensor.index_axis(Axis(0), 2).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn overflow_is_an_error() {
        let packer = TensorPacker::new(1, 4, 4).unwrap();
        let err = packer.pack(&[None, None]).unwrap_err();
        assert!(matches!(err, PreprocessError::BatchOverflow { capacity: 1, given: 2 }));
    }
}
