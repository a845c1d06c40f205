use serde::{Deserialize, Serialize};

/// A candidate box in letterboxed pixel space (centre form).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Objectness of the row, in `[0, 1]`.
    pub confidence: f32,
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
    /// Argmax class; `None` when no class score is above zero.
    pub class_id: Option<usize>,
}

impl Detection {
    /// `[x1, y1, x2, y2]`
    pub fn corners(&self) -> [f32; 4] {
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        [
            self.center_x - hw,
            self.center_y - hh,
            self.center_x + hw,
            self.center_y + hh,
        ]
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// A surviving detection expressed in source-image pixels.
///
/// Not clamped: boxes may extend past the image borders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MappedDetection {
    pub confidence: f32,
    pub class_id: Option<usize>,
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
    /// Left edge (`center_x - width / 2`).
    pub left: f32,
    /// Top edge (`center_y - height / 2`).
    pub top: f32,
}

impl MappedDetection {
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}
