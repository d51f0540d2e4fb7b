//! Canvas-to-output coordinate mapping.
//!
//! Clip transforms are authored in project-canvas pixels. The export
//! resolution is independent of the canvas, so every position and size is
//! rescaled per axis before it reaches the graph.

use montage_project_model::project::Clip;

/// Font size used when a text clip does not set `fontSize`.
pub const DEFAULT_FONT_SIZE: f64 = 32.0;

/// Smallest font size emitted, in output pixels.
pub const MIN_FONT_SIZE_PX: u32 = 12;

/// Rectangle in output pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Placement of a text layer in output pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextAnchor {
    pub x: i64,
    pub y: i64,
    pub font_size: u32,
}

/// Maps clip transforms from project-canvas space into output space.
#[derive(Debug, Clone, Copy)]
pub struct GeometryMapper {
    project_width: f64,
    project_height: f64,
    output_width: f64,
    output_height: f64,
}

impl GeometryMapper {
    pub fn new(project_width: u32, project_height: u32, output_width: u32, output_height: u32) -> Self {
        Self {
            project_width: project_width.max(1) as f64,
            project_height: project_height.max(1) as f64,
            output_width: output_width as f64,
            output_height: output_height as f64,
        }
    }

    /// Output rectangle for a video or image clip.
    ///
    /// Width and height never drop below one pixel.
    pub fn overlay_rect(&self, clip: &Clip) -> PixelRect {
        let t = clip.transform_or_default();
        let (pw, ph) = (self.project_width, self.project_height);
        let (ow, oh) = (self.output_width, self.output_height);

        let width = ((pw * t.scale_x.abs()) / pw * ow).round().max(1.0);
        let height = ((ph * t.scale_y.abs()) / ph * oh).round().max(1.0);

        PixelRect {
            x: (t.x / pw * ow).round() as i64,
            y: (t.y / ph * oh).round() as i64,
            width: width as u32,
            height: height as u32,
        }
    }

    /// Anchored position and font size for a text clip.
    pub fn text_anchor(&self, clip: &Clip) -> TextAnchor {
        let t = clip.transform_or_default();
        let font_size = clip.font_size_param().unwrap_or(DEFAULT_FONT_SIZE);
        let scaled = (font_size / self.project_height * self.output_height).round();

        TextAnchor {
            x: ((t.x - t.anchor_x) / self.project_width * self.output_width).round() as i64,
            y: ((t.y - t.anchor_y) / self.project_height * self.output_height).round() as i64,
            font_size: (scaled.max(0.0) as u32).max(MIN_FONT_SIZE_PX),
        }
    }
}

/// Render a number for the engine with at most three decimals.
///
/// Trailing zeros are dropped, so `2.0` renders as `2` and `0.5` as `0.5`.
pub fn fmt_num(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = format!("{value:.3}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}
