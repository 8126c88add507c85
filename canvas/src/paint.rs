use super::color::*;

use serde::{Deserialize, Serialize};

///
/// Whether geometry is filled, stroked, or both
///
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum PaintStyle {
    #[default]
    Fill,
    Stroke,
    FillAndStroke,
}

///
/// A dash pattern applied along a stroked path
///
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct PathEffect {
    /// Alternating on/off dash lengths
    pub dash_lengths: Vec<f32>,

    /// Offset into the pattern at the start of the path
    pub dash_offset: f32,
}

///
/// How recorded geometry is coloured and composited
///
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Paint {
    pub color: Rgba8,
    pub style: PaintStyle,
    pub stroke_width: f32,
    pub antialias: bool,
    pub path_effect: Option<PathEffect>,
    pub blend_mode: BlendMode,
}

impl Default for Paint {
    fn default() -> Paint {
        Paint {
            color:          Rgba8::BLACK,
            style:          PaintStyle::Fill,
            stroke_width:   1.0,
            antialias:      false,
            path_effect:    None,
            blend_mode:     BlendMode::SourceOver,
        }
    }
}

impl Paint {
    ///
    /// A filled paint with the specified colour
    ///
    pub fn fill(color: Rgba8) -> Paint {
        Paint { color, ..Paint::default() }
    }

    ///
    /// An otherwise default paint carrying only an alpha value (save-layer paints)
    ///
    pub fn with_alpha(alpha: f32) -> Paint {
        let alpha = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        Paint::fill(Rgba8([0, 0, 0, alpha]))
    }

    ///
    /// The paint's alpha as a fraction in 0..=1
    ///
    #[inline]
    pub fn alpha(&self) -> f32 {
        self.color.alpha_fraction()
    }

    ///
    /// True if this paint's style includes a stroked edge
    ///
    #[inline]
    pub fn has_stroke(&self) -> bool {
        self.style != PaintStyle::Fill
    }
}
