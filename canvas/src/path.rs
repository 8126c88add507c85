use super::geometry::*;

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PATH_ID: AtomicU64 = AtomicU64::new(1);

///
/// An opaque vector path
///
/// The deferral engine never walks path geometry: it only needs conservative
/// bounds and identity, with tessellation living downstream of the engine.
/// Boolean combination is exposed through `intersection`, which is the one
/// path operation the engine performs (clipping shadow casters).
///
#[derive(Clone, Debug)]
pub struct Path {
    bounds: Rect,
    generation_id: u64,
}

impl Path {
    ///
    /// Creates a path covering a rectangle
    ///
    pub fn from_rect(bounds: Rect) -> Path {
        Path {
            bounds,
            generation_id: NEXT_PATH_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    ///
    /// Creates a path for a circle
    ///
    pub fn circle(x: f32, y: f32, radius: f32) -> Path {
        Path::from_rect(Rect::new(x - radius, y - radius, x + radius, y + radius))
    }

    ///
    /// Conservative bounds of the path geometry
    ///
    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    ///
    /// Identity of the geometry, stable across clones
    ///
    #[inline]
    pub fn generation_id(&self) -> u64 {
        self.generation_id
    }

    ///
    /// The boolean intersection of two paths, as a new path
    ///
    pub fn intersection(a: &Path, b: &Path) -> Path {
        Path::from_rect(a.bounds.intersection(&b.bounds))
    }
}
