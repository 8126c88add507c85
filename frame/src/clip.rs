use ember_canvas::{Matrix4, Rect};

///
/// Boolean operation applied when a clip rect modifies the clip area
///
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClipOp {
    Intersect,
    Replace,
    Difference,
    Union,
    Xor,
    ReverseDifference,
}

///
/// Shape class of a clip, as seen by batching and merging
///
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClipMode {
    /// A single rectangle; the common case, and the only mergeable one
    Rectangle,

    /// A set of disjoint rectangles produced by non-intersect clip ops
    Region,
}

///
/// The clip a baked op carries into the renderer
///
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ClipState {
    pub bounds: Rect,
    pub mode: ClipMode,
}

impl ClipState {
    ///
    /// True if this clip doesn't rule out merging (an absent clip state also
    /// counts as rectangular)
    ///
    pub fn is_mergeable(clip_state: &Option<ClipState>) -> bool {
        match clip_state {
            Some(state) => state.mode == ClipMode::Rectangle,
            None        => true,
        }
    }
}

///
/// The clip area of a snapshot, in render-target space
///
/// Stays in the cheap single-rect representation until a clip op other than
/// intersect/replace forces a region of disjoint pieces.
///
#[derive(Clone, PartialEq, Debug)]
pub struct ClipArea {
    rect: Rect,
    pieces: Vec<Rect>,
    mode: ClipMode,
}

impl ClipArea {
    pub fn new(rect: Rect) -> ClipArea {
        ClipArea {
            rect,
            pieces: vec![],
            mode:   ClipMode::Rectangle,
        }
    }

    #[inline]
    pub fn mode(&self) -> ClipMode {
        self.mode
    }

    ///
    /// Bounding rect of the clipped area
    ///
    pub fn bounds(&self) -> Rect {
        match self.mode {
            ClipMode::Rectangle => self.rect,
            ClipMode::Region    => {
                let mut bounds = Rect::empty();
                for piece in &self.pieces {
                    bounds.unite(piece);
                }
                bounds
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bounds().is_empty()
    }

    ///
    /// True if any part of `rect` survives this clip
    ///
    pub fn intersects(&self, rect: &Rect) -> bool {
        match self.mode {
            ClipMode::Rectangle => self.rect.intersects(rect),
            ClipMode::Region    => self.pieces.iter().any(|piece| piece.intersects(rect)),
        }
    }

    ///
    /// Replaces the clip outright
    ///
    pub fn set_rect(&mut self, rect: Rect) {
        self.rect   = rect;
        self.pieces = vec![];
        self.mode   = ClipMode::Rectangle;
    }

    ///
    /// Applies a rect (already in render-target space) with the given op
    ///
    pub fn clip_rect(&mut self, rect: Rect, op: ClipOp) {
        match (op, self.mode) {
            (ClipOp::Intersect, ClipMode::Rectangle) => {
                self.rect.intersect(&rect);
            }

            (ClipOp::Intersect, ClipMode::Region) => {
                self.pieces = self.pieces.iter()
                    .map(|piece| piece.intersection(&rect))
                    .filter(|piece| !piece.is_empty())
                    .collect();
                self.collapse();
            }

            (ClipOp::Replace, _) => {
                self.set_rect(rect);
            }

            (other_op, _) => {
                self.promote_to_region();
                self.apply_region_op(rect, other_op);
                self.collapse();
            }
        }
    }

    ///
    /// Intersects a record-time clip, transformed into render-target space
    ///
    pub fn apply_clip(&mut self, local_clip: Option<&Rect>, transform: &Matrix4) {
        if let Some(clip) = local_clip {
            self.clip_rect(transform.map_rect(clip), ClipOp::Intersect);
        }
    }

    ///
    /// Serializes this clip for a baked op whose mapped bounds are known
    ///
    /// Returns None when the clip provably doesn't cut the op, which marks
    /// the op freely mergeable.
    ///
    pub fn serialize_intersected(&self, mapped_op_bounds: &Rect) -> Option<ClipState> {
        if self.mode == ClipMode::Rectangle && self.rect.contains(mapped_op_bounds) {
            return None;
        }

        Some(ClipState {
            bounds: self.bounds(),
            mode:   self.mode,
        })
    }

    fn promote_to_region(&mut self) {
        if self.mode == ClipMode::Rectangle {
            self.pieces = if self.rect.is_empty() { vec![] } else { vec![self.rect] };
            self.mode   = ClipMode::Region;
        }
    }

    fn apply_region_op(&mut self, rect: Rect, op: ClipOp) {
        match op {
            ClipOp::Difference => {
                self.pieces = subtract_from_all(&self.pieces, &rect);
            }

            ClipOp::Union => {
                // Keep pieces disjoint: only the parts of the new rect not
                // already covered are added
                let mut addition = vec![rect];
                for piece in &self.pieces {
                    addition = subtract_from_all(&addition, piece);
                }
                self.pieces.extend(addition);
            }

            ClipOp::Xor => {
                let ours    = subtract_from_all(&self.pieces, &rect);
                let mut new = vec![rect];
                for piece in &self.pieces {
                    new = subtract_from_all(&new, piece);
                }

                self.pieces = ours;
                self.pieces.extend(new);
            }

            ClipOp::ReverseDifference => {
                let mut remaining = vec![rect];
                for piece in &self.pieces {
                    remaining = subtract_from_all(&remaining, piece);
                }
                self.pieces = remaining;
            }

            ClipOp::Intersect | ClipOp::Replace => unreachable!("handled before region promotion"),
        }
    }

    ///
    /// Falls back to the rectangle representation when the region has
    /// degenerated to a single piece (or nothing)
    ///
    fn collapse(&mut self) {
        if self.mode == ClipMode::Region && self.pieces.len() <= 1 {
            self.rect   = self.pieces.pop().unwrap_or_else(Rect::empty);
            self.pieces = vec![];
            self.mode   = ClipMode::Rectangle;
        }
    }
}

///
/// Subtracts `hole` from `piece`, producing up to four disjoint remainder rects
///
fn subtract_rect(piece: &Rect, hole: &Rect) -> Vec<Rect> {
    if !piece.intersects(hole) {
        return vec![*piece];
    }

    let mut result = vec![];

    // Band above the hole
    if hole.top > piece.top {
        result.push(Rect::new(piece.left, piece.top, piece.right, hole.top));
    }
    // Band below the hole
    if hole.bottom < piece.bottom {
        result.push(Rect::new(piece.left, hole.bottom, piece.right, piece.bottom));
    }

    let band_top    = f32::max(piece.top, hole.top);
    let band_bottom = f32::min(piece.bottom, hole.bottom);

    // Left remainder within the hole's vertical span
    if hole.left > piece.left {
        result.push(Rect::new(piece.left, band_top, hole.left, band_bottom));
    }
    // Right remainder
    if hole.right < piece.right {
        result.push(Rect::new(hole.right, band_top, piece.right, band_bottom));
    }

    result.retain(|rect| !rect.is_empty());
    result
}

fn subtract_from_all(pieces: &[Rect], hole: &Rect) -> Vec<Rect> {
    let mut result = vec![];
    for piece in pieces {
        result.extend(subtract_rect(piece, hole));
    }
    result
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn intersect_stays_rectangular() {
        let mut clip = ClipArea::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        clip.clip_rect(Rect::new(50.0, 50.0, 200.0, 200.0), ClipOp::Intersect);

        assert!(clip.mode() == ClipMode::Rectangle);
        assert!(clip.bounds() == Rect::new(50.0, 50.0, 100.0, 100.0));
    }

    #[test]
    fn intersect_never_grows() {
        let mut clip = ClipArea::new(Rect::new(0.0, 0.0, 50.0, 50.0));
        clip.clip_rect(Rect::new(0.0, 0.0, 500.0, 500.0), ClipOp::Intersect);

        assert!(clip.bounds() == Rect::new(0.0, 0.0, 50.0, 50.0));
    }

    #[test]
    fn difference_punches_a_hole() {
        let mut clip = ClipArea::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        clip.clip_rect(Rect::new(25.0, 25.0, 75.0, 75.0), ClipOp::Difference);

        assert!(clip.mode() == ClipMode::Region);
        assert!(!clip.intersects(&Rect::new(40.0, 40.0, 60.0, 60.0)));
        assert!(clip.intersects(&Rect::new(0.0, 0.0, 20.0, 20.0)));
        assert!(clip.bounds() == Rect::new(0.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn union_extends_the_area() {
        let mut clip = ClipArea::new(Rect::new(0.0, 0.0, 50.0, 50.0));
        clip.clip_rect(Rect::new(100.0, 0.0, 150.0, 50.0), ClipOp::Union);

        assert!(clip.mode() == ClipMode::Region);
        assert!(clip.intersects(&Rect::new(110.0, 10.0, 120.0, 20.0)));
        assert!(!clip.intersects(&Rect::new(60.0, 10.0, 90.0, 20.0)));
    }

    #[test]
    fn reverse_difference_keeps_only_the_new_rect() {
        let mut clip = ClipArea::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        clip.clip_rect(Rect::new(50.0, 0.0, 150.0, 100.0), ClipOp::ReverseDifference);

        assert!(!clip.intersects(&Rect::new(0.0, 0.0, 40.0, 40.0)));
        assert!(clip.intersects(&Rect::new(110.0, 10.0, 140.0, 40.0)));
    }

    #[test]
    fn xor_drops_the_overlap() {
        let mut clip = ClipArea::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        clip.clip_rect(Rect::new(50.0, 0.0, 150.0, 100.0), ClipOp::Xor);

        assert!(clip.intersects(&Rect::new(10.0, 10.0, 40.0, 40.0)));
        assert!(clip.intersects(&Rect::new(110.0, 10.0, 140.0, 40.0)));
        assert!(!clip.intersects(&Rect::new(60.0, 10.0, 90.0, 40.0)));
    }

    #[test]
    fn replace_collapses_back_to_a_rect() {
        let mut clip = ClipArea::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        clip.clip_rect(Rect::new(25.0, 25.0, 75.0, 75.0), ClipOp::Difference);
        clip.clip_rect(Rect::new(0.0, 0.0, 30.0, 30.0), ClipOp::Replace);

        assert!(clip.mode() == ClipMode::Rectangle);
        assert!(clip.bounds() == Rect::new(0.0, 0.0, 30.0, 30.0));
    }

    #[test]
    fn serialize_contained_op_has_no_clip_state() {
        let clip = ClipArea::new(Rect::new(0.0, 0.0, 100.0, 100.0));

        assert!(clip.serialize_intersected(&Rect::new(10.0, 10.0, 20.0, 20.0)).is_none());

        let state = clip.serialize_intersected(&Rect::new(50.0, 50.0, 150.0, 150.0));
        assert!(state.is_some());
        assert!(state.unwrap().mode == ClipMode::Rectangle);
    }
}
