//! Metrics the host display reports to the layout.

/// Padding around text inside a region, in logical units.
pub const TEXT_BORDER: f32 = 4.0;

/// Metrics the layout needs from whatever paints the editor.
pub trait Display {
    fn pixel_scale(&self) -> f32 {
        1.0
    }

    /// Height of one text line in layout units, already scaled.
    fn line_height(&self) -> f32;

    fn text_border(&self) -> f32 {
        TEXT_BORDER
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedDisplay {
    pub pixel_scale: f32,
    pub line_height: f32,
    pub text_border: f32,
}

impl FixedDisplay {
    /// Character-cell metrics: one unit per line, no padding.
    pub fn terminal() -> Self {
        Self {
            pixel_scale: 1.0,
            line_height: 1.0,
            text_border: 0.0,
        }
    }
}

impl Default for FixedDisplay {
    fn default() -> Self {
        Self {
            pixel_scale: 1.0,
            line_height: 16.0,
            text_border: TEXT_BORDER,
        }
    }
}

impl Display for FixedDisplay {
    fn pixel_scale(&self) -> f32 {
        self.pixel_scale
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }

    fn text_border(&self) -> f32 {
        self.text_border
    }
}
