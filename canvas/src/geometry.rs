use serde::{Deserialize, Serialize};

///
/// An axis-aligned rectangle, stored as its left/top/right/bottom edges
///
/// A rect is empty when `left >= right` or `top >= bottom`. NaN coordinates
/// fail both comparisons, so a rect containing a NaN is always empty; geometry
/// built from bad coordinates quietly rejects instead of propagating.
///
#[derive(Clone, Copy, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    ///
    /// Creates a rect from its four edges
    ///
    #[inline]
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Rect {
        Rect { left, top, right, bottom }
    }

    ///
    /// Creates a rect anchored at the origin with the specified size
    ///
    #[inline]
    pub fn from_size(width: f32, height: f32) -> Rect {
        Rect::new(0.0, 0.0, width, height)
    }

    ///
    /// An empty rect at the origin
    ///
    #[inline]
    pub fn empty() -> Rect {
        Rect::default()
    }

    ///
    /// True if this rect covers no area (including the NaN case)
    ///
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.left < self.right && self.top < self.bottom)
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    ///
    /// Empties this rect
    ///
    pub fn set_empty(&mut self) {
        *self = Rect::empty();
    }

    ///
    /// True if the two rects overlap in a region with non-zero area
    ///
    /// Empty rects never intersect anything.
    ///
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right && other.left < self.right
            && self.top < other.bottom && other.top < self.bottom
    }

    ///
    /// Shrinks this rect to the region shared with `other` (empty if the two
    /// rects do not overlap)
    ///
    pub fn intersect(&mut self, other: &Rect) {
        if self.intersects(other) {
            self.left   = f32::max(self.left, other.left);
            self.top    = f32::max(self.top, other.top);
            self.right  = f32::min(self.right, other.right);
            self.bottom = f32::min(self.bottom, other.bottom);
        } else {
            self.set_empty();
        }
    }

    ///
    /// Returns the overlap of two rects without modifying either
    ///
    pub fn intersection(&self, other: &Rect) -> Rect {
        let mut result = *self;
        result.intersect(other);
        result
    }

    ///
    /// Grows this rect to cover `other` as well (empty rects contribute nothing)
    ///
    pub fn unite(&mut self, other: &Rect) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *other;
            return;
        }

        self.left   = f32::min(self.left, other.left);
        self.top    = f32::min(self.top, other.top);
        self.right  = f32::max(self.right, other.right);
        self.bottom = f32::max(self.bottom, other.bottom);
    }

    ///
    /// True if `other` lies entirely within this rect
    ///
    pub fn contains(&self, other: &Rect) -> bool {
        !self.is_empty() && !other.is_empty()
            && self.left <= other.left && self.top <= other.top
            && self.right >= other.right && self.bottom >= other.bottom
    }

    ///
    /// Expands every edge outwards by `delta`
    ///
    pub fn outset(&mut self, delta: f32) {
        self.left   -= delta;
        self.top    -= delta;
        self.right  += delta;
        self.bottom += delta;
    }

    ///
    /// Snaps the edges outwards to integer coordinates
    ///
    pub fn round_out(&mut self) {
        self.left   = self.left.floor();
        self.top    = self.top.floor();
        self.right  = self.right.ceil();
        self.bottom = self.bottom.ceil();
    }

    ///
    /// Moves the rect without changing its size
    ///
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.left   += dx;
        self.top    += dy;
        self.right  += dx;
        self.bottom += dy;
    }
}

///
/// A point or direction in 3D space (light positions, z offsets)
///
#[derive(Clone, Copy, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Vector3 {
        Vector3 { x, y, z }
    }
}
