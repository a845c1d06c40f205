//! Raw `[B, N, 5 + C]` rows → candidate detections.

use ndarray::{s, ArrayView1, ArrayView3, Axis};
use tracing::debug;
use yolobox_model::spec::FIXED_FIELDS;

use crate::{DetectError, Detection, Result};

/// Scan every row of every image.
///
/// A row survives when its objectness is strictly greater than
/// `confidence_threshold`. Its class is the first index holding the
/// maximum positive class score; with no class columns, or no score above
/// zero, the class stays unset.
/// Geometry is copied as-is. Output order is row order.
pub fn decode(output: ArrayView3<'_, f32>, confidence_threshold: f32) -> Result<Vec<Vec<Detection>>> {
    let elements = output.len_of(Axis(2));
    if elements < FIXED_FIELDS {
        return Err(DetectError::RowTooShort(elements));
    }

    let batch: Vec<Vec<Detection>> = output
        .outer_iter()
        .map(|image| {
            image
                .outer_iter()
                .filter_map(|row| decode_row(row, confidence_threshold))
                .collect()
        })
        .collect();

    debug!(
        rows = output.len_of(Axis(1)),
        candidates = ?batch.iter().map(Vec::len).collect::<Vec<_>>(),
        "decoded output"
    );
    Ok(batch)
}

fn decode_row(row: ArrayView1<'_, f32>, confidence_threshold: f32) -> Option<Detection> {
    let confidence = row[4];
    // also drops NaN
    if !(confidence > confidence_threshold) {
        return None;
    }
    Some(Detection {
        confidence,
        center_x: row[0],
        center_y: row[1],
        width: row[2],
        height: row[3],
        class_id: argmax(row.slice(s![FIXED_FIELDS..])),
    })
}

/// Left-to-right scan from an unset class at score 0; only a strictly
/// greater score replaces the best. Rows whose scores are all `<= 0` keep
/// no class.
fn argmax(scores: ArrayView1<'_, f32>) -> Option<usize> {
    let mut best = None;
    let mut top = 0.0_f32;
    for (idx, &score) in scores.iter().enumerate() {
        if score > top {
            top = score;
            best = Some(idx);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn rows(batch: usize, rows: &[&[f32]]) -> Array3<f32> {
        let e = rows[0].len();
        let n = rows.len() / batch;
        let flat: Vec<f32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Array3::from_shape_vec((batch, n, e), flat).unwrap()
    }

    #[test]
    fn decodes_the_reference_row() {
        let out = rows(1, &[&[80.0, 80.0, 20.0, 20.0, 0.9, 0.1, 0.95]]);
        let dets = decode(out.view(), 0.45).unwrap();
        assert_eq!(
            dets[0],
            vec![Detection {
                confidence: 0.9,
                center_x: 80.0,
                center_y: 80.0,
                width: 20.0,
                height: 20.0,
                class_id: Some(1),
            }]
        );
    }

    #[test]
    fn threshold_is_exclusive() {
        let out = rows(1, &[&[1.0, 1.0, 1.0, 1.0, 0.45, 1.0], &[1.0, 1.0, 1.0, 1.0, 0.4500001, 1.0]]);
        let dets = decode(out.view(), 0.45).unwrap();
        assert_eq!(dets[0].len(), 1);
        assert_eq!(dets[0][0].confidence, 0.4500001);
    }

    #[test]
    fn class_ties_go_to_lowest_index() {
        let out = rows(1, &[&[0.0, 0.0, 1.0, 1.0, 0.9, 0.2, 0.7, 0.7, 0.1]]);
        let dets = decode(out.view(), 0.45).unwrap();
        assert_eq!(dets[0][0].class_id, Some(1));
    }

    #[test]
    fn all_zero_scores_leave_class_unset() {
        let out = rows(1, &[&[0.0, 0.0, 1.0, 1.0, 0.9, 0.0, 0.0, 0.0]]);
        let dets = decode(out.view(), 0.45).unwrap();
        assert_eq!(dets[0].len(), 1);
        assert_eq!(dets[0][0].class_id, None);
    }

    #[test]
    fn negative_scores_leave_class_unset() {
        let out = rows(1, &[&[0.0, 0.0, 1.0, 1.0, 0.9, -0.5, -0.1, -2.0]]);
        let dets = decode(out.view(), 0.45).unwrap();
        assert_eq!(dets[0][0].class_id, None);
    }

    #[test]
    fn first_positive_score_wins_over_earlier_zeros() {
        let out = rows(1, &[&[0.0, 0.0, 1.0, 1.0, 0.9, 0.0, 0.0, 0.3]]);
        let dets = decode(out.view(), 0.45).unwrap();
        assert_eq!(dets[0][0].class_id, Some(2));
    }

    #[test]
    fn zero_class_model_keeps_class_unset() {
        let out = rows(1, &[&[5.0, 6.0, 7.0, 8.0, 0.8], &[5.0, 6.0, 7.0, 8.0, 0.1]]);
        let dets = decode(out.view(), 0.45).unwrap();
        assert_eq!(dets[0].len(), 1);
        assert_eq!(dets[0][0].class_id, None);
    }

    #[test]
    fn batches_are_decoded_separately_in_row_order() {
        let out = rows(
            2,
            &[
                &[1.0, 1.0, 1.0, 1.0, 0.5, 1.0],
                &[2.0, 2.0, 1.0, 1.0, 0.9, 1.0],
                &[3.0, 3.0, 1.0, 1.0, 0.1, 1.0],
                &[4.0, 4.0, 1.0, 1.0, 0.7, 1.0],
            ],
        );
        let dets = decode(out.view(), 0.45).unwrap();
        assert_eq!(dets.len(), 2);
        let xs: Vec<f32> = dets[0].iter().map(|d| d.center_x).collect();
        assert_eq!(xs, vec![1.0, 2.0]);
        assert_eq!(dets[1].len(), 1);
        assert_eq!(dets[1][0].center_x, 4.0);
    }

    #[test]
    fn nan_confidence_is_dropped() {
        let out = rows(1, &[&[1.0, 1.0, 1.0, 1.0, f32::NAN, 1.0]]);
        assert!(decode(out.view(), 0.45).unwrap()[0].is_empty());
    }

    #[test]
    fn short_rows_are_rejected() {
        let out = Array3::<f32>::zeros((1, 3, 4));
        assert!(matches!(decode(out.view(), 0.45), Err(DetectError::RowTooShort(4))));
    }
}
