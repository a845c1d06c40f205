//! Letterboxed canvas coordinates → source image pixels.

use yolobox_preprocess::LetterboxParams;

use crate::{Detection, MappedDetection};

/// Undo the letterbox for one detection using the parameters recorded
/// when its image was packed. Results are not clamped to the image.
pub fn map_to_original(det: &Detection, params: &LetterboxParams) -> MappedDetection {
    let (center_x, center_y) = params.to_original_point(det.center_x, det.center_y);
    let width = params.to_original_length(det.width);
    let height = params.to_original_length(det.height);

    MappedDetection {
        confidence: det.confidence,
        class_id: det.class_id,
        center_x,
        center_y,
        width,
        height,
        left: center_x - width / 2.0,
        top: center_y - height / 2.0,
    }
}

pub fn map_detections(dets: &[Detection], params: &LetterboxParams) -> Vec<MappedDetection> {
    dets.iter().map(|d| map_to_original(d, params)).collect()
}
