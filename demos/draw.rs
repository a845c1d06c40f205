//! Box and label overlay for saved results.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use yolobox_detect::MappedDetection;

const THICKNESS: i32 = 2;
const LABEL_FONT_SIZE: f32 = 14.0;
const SATURATION: f32 = 0.8;
const VALUE: f32 = 0.9;

/// `n` colors with evenly spaced hues.
pub fn palette(n: usize) -> Vec<Rgb<u8>> {
    let n = n.max(1);
    (0..n)
        .map(|i| hsv_to_rgb(i as f32 * 360.0 / n as f32, SATURATION, VALUE))
        .collect()
}

fn hsv_to_rgb(hue: f32, sat: f32, val: f32) -> Rgb<u8> {
    let c = val * sat;
    let h = (hue % 360.0) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = val - c;
    let byte = |v: f32| ((v + m) * 255.0).round() as u8;
    Rgb([byte(r), byte(g), byte(b)])
}

/// `"<class>,<confidence>"`, `-` for an unset class.
pub fn label(det: &MappedDetection) -> String {
    match det.class_id {
        Some(class) => format!("{class},{:.2}", det.confidence),
        None => format!("-,{:.2}", det.confidence),
    }
}

pub struct Draw {
    colors: Vec<Rgb<u8>>,
    font: Option<FontVec>,
}

impl Draw {
    /// Labels are only written when a font is given.
    pub fn new(num_classes: usize, font: Option<FontVec>) -> Self {
        Self { colors: palette(num_classes), font }
    }

    pub fn load_font(path: &Path) -> Result<FontVec> {
        let bytes = std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
        FontVec::try_from_vec(bytes).with_context(|| format!("parsing font {}", path.display()))
    }

    fn color(&self, det: &MappedDetection) -> Rgb<u8> {
        self.colors[det.class_id.unwrap_or(0) % self.colors.len()]
    }

    /// Outline every detection in its class color, label at the top-left
    /// corner. Out-of-image parts are clipped by imageproc.
    pub fn draw_detections(&self, image: &mut RgbImage, dets: &[MappedDetection]) {
        for det in dets {
            let color = self.color(det);
            let (left, top) = (det.left.round() as i32, det.top.round() as i32);
            for t in 0..THICKNESS {
                let w = det.width.round() as i32 - 2 * t;
                let h = det.height.round() as i32 - 2 * t;
                if w <= 0 || h <= 0 {
                    break;
                }
                let rect = Rect::at(left + t, top + t).of_size(w as u32, h as u32);
                draw_hollow_rect_mut(image, rect, color);
            }
            if let Some(font) = &self.font {
                draw_text_mut(
                    image,
                    color,
                    left + THICKNESS,
                    top + THICKNESS,
                    PxScale::from(LABEL_FONT_SIZE),
                    font,
                    &label(det),
                );
            }
        }
    }
}
