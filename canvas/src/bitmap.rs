use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_BITMAP_ID: AtomicU64 = AtomicU64::new(1);

///
/// Pixel layout of a bitmap
///
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ColorType {
    /// Alpha-only mask (paints supply the colour, so these never merge)
    Alpha8,

    /// Full-colour RGBA
    Rgba8888,
}

///
/// An immutable bitmap, identified by a generation id
///
/// Pixel data lives with the caller; the engine only needs dimensions,
/// format, and an identity to use as a merge key.
///
#[derive(Clone, Debug)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub color_type: ColorType,
    generation_id: u64,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, color_type: ColorType) -> Bitmap {
        Bitmap {
            width,
            height,
            color_type,
            generation_id: NEXT_BITMAP_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    #[inline]
    pub fn generation_id(&self) -> u64 {
        self.generation_id
    }
}

///
/// Stretch metadata for a nine-patch draw
///
#[derive(Clone, Debug)]
pub struct Patch {
    /// Horizontal stretchable segments, as pixel ranges in the source bitmap
    pub x_divs: Vec<(u32, u32)>,

    /// Vertical stretchable segments
    pub y_divs: Vec<(u32, u32)>,
}
