use serde::{Deserialize, Serialize};

///
/// An 8-bit RGBA colour value
///
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Rgba8(pub [u8; 4]);

impl Rgba8 {
    pub const BLACK: Rgba8 = Rgba8([0, 0, 0, 255]);
    pub const WHITE: Rgba8 = Rgba8([255, 255, 255, 255]);
    pub const TRANSPARENT: Rgba8 = Rgba8([0, 0, 0, 0]);

    #[inline]
    pub fn alpha(&self) -> u8 {
        self.0[3]
    }

    ///
    /// The alpha channel as a fraction in 0..=1
    ///
    #[inline]
    pub fn alpha_fraction(&self) -> f32 {
        self.0[3] as f32 / 255.0
    }

    ///
    /// True for fully opaque black (the fast path for text rendering)
    ///
    #[inline]
    pub fn is_opaque_black(&self) -> bool {
        *self == Rgba8::BLACK
    }

    ///
    /// Packs the colour into a single value, usable as a merge key
    ///
    #[inline]
    pub fn packed(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }
}

impl Default for Rgba8 {
    fn default() -> Rgba8 {
        Rgba8::BLACK
    }
}

///
/// Blend mode to use when drawing
///
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    SourceOver,
    SourceIn,
    SourceOut,
    DestinationOver,
    DestinationIn,
    DestinationOut,
    SourceAtop,
    DestinationAtop,

    Multiply,
    Screen,
    Darken,
    Lighten,

    /// Replaces the destination with transparent pixels (layer clears)
    Clear,
}
