use super::clip::*;
use super::snapshot::*;

use ember_canvas::{Matrix4, Outline, Path, Rect, Vector3};

use std::sync::Arc;

///
/// The save/restore stack of snapshots driving a deferral pass
///
/// The stack is never empty once initialized; the bottom snapshot belongs to
/// the current render target and restoring past it is a caller contract
/// violation.
///
pub struct CanvasState {
    stack: Vec<Snapshot>,
}

impl CanvasState {
    pub fn new() -> CanvasState {
        CanvasState { stack: vec![] }
    }

    ///
    /// Sets up the root snapshot for the frame's render target
    ///
    #[allow(clippy::too_many_arguments)]
    pub fn initialize_save_stack(&mut self, viewport_width: u32, viewport_height: u32,
        clip_left: f32, clip_top: f32, clip_right: f32, clip_bottom: f32,
        light_center: Vector3)
    {
        self.stack.clear();
        self.stack.push(Snapshot::root(
            viewport_width, viewport_height,
            Rect::new(clip_left, clip_top, clip_right, clip_bottom),
            light_center));
    }

    ///
    /// Pushes a snapshot, returning the depth to later pass to
    /// `restore_to_count`
    ///
    pub fn save(&mut self, flags: SaveFlags) -> usize {
        let count        = self.stack.len();
        let mut snapshot = self.current_snapshot().clone();
        snapshot.flags   = flags;
        self.stack.push(snapshot);
        count
    }

    ///
    /// Pops a single snapshot
    ///
    pub fn restore(&mut self) {
        let depth = self.stack.len();
        assert!(depth > 1, "restore past the initial snapshot");

        let removed = self.stack.pop().unwrap();
        let parent  = self.stack.last_mut().unwrap();

        // Sub-state the save didn't capture survives the restore
        if !removed.flags.contains(SaveFlags::CLIP) {
            parent.clip = removed.clip;
        }
        if !removed.flags.contains(SaveFlags::MATRIX) {
            parent.transform = removed.transform;
        }
    }

    ///
    /// Pops snapshots until the stack is `count` deep again
    ///
    pub fn restore_to_count(&mut self, count: usize) {
        assert!(count >= 1, "restore past the initial snapshot");
        while self.stack.len() > count {
            self.restore();
        }
    }

    #[inline]
    pub fn save_count(&self) -> usize {
        self.stack.len()
    }

    #[inline]
    pub fn current_snapshot(&self) -> &Snapshot {
        self.stack.last().expect("save stack not initialized")
    }

    #[inline]
    pub fn writable_snapshot(&mut self) -> &mut Snapshot {
        self.stack.last_mut().expect("save stack not initialized")
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.writable_snapshot().transform.translate(dx, dy);
    }

    pub fn concat_matrix(&mut self, matrix: &Matrix4) {
        self.writable_snapshot().transform.multiply(matrix);
    }

    ///
    /// Multiplies the current snapshot's alpha
    ///
    pub fn scale_alpha(&mut self, alpha: f32) {
        self.writable_snapshot().alpha *= alpha;
    }

    ///
    /// Applies a clip rect, given in current-transform space
    ///
    pub fn clip_rect(&mut self, left: f32, top: f32, right: f32, bottom: f32, op: ClipOp) {
        let snapshot = self.writable_snapshot();
        let mapped   = snapshot.transform.map_rect(&Rect::new(left, top, right, bottom));
        snapshot.clip.clip_rect(mapped, op);
    }

    ///
    /// Attaches a round-rect mask to the current snapshot's clip
    ///
    pub fn set_clipping_round_rect(&mut self, bounds: Rect, radius: f32) {
        self.writable_snapshot().round_rect_clip = Some(RoundRectClip { bounds, radius });
    }

    ///
    /// Attaches a node outline as the clipping mask
    ///
    pub fn set_clipping_outline(&mut self, outline: &Outline) {
        self.writable_snapshot().round_rect_clip = Some(RoundRectClip {
            bounds: outline.bounds,
            radius: outline.radius,
        });
    }

    ///
    /// Records the mask projected content is clipped to
    ///
    pub fn set_projection_path_mask(&mut self, path: Option<Arc<Path>>) {
        self.writable_snapshot().projection_path_mask = path;
    }

    ///
    /// True if bounds given in current-transform space provably fall outside
    /// the clip (NaN and infinite coordinates reject)
    ///
    pub fn quick_reject_conservative(&self, left: f32, top: f32, right: f32, bottom: f32) -> bool {
        let snapshot = self.current_snapshot();
        let mapped   = snapshot.transform.map_rect(&Rect::new(left, top, right, bottom));

        if mapped.is_empty() || !mapped.left.is_finite() || !mapped.top.is_finite()
            || !mapped.right.is_finite() || !mapped.bottom.is_finite()
        {
            return true;
        }

        !snapshot.clip.intersects(&mapped)
    }

    ///
    /// The current clip mapped back into current-transform space (used when a
    /// caster's shadow needs clipping in local coordinates)
    ///
    pub fn local_clip_bounds(&self) -> Rect {
        let snapshot = self.current_snapshot();
        match snapshot.transform.invert() {
            Some(inverse)   => inverse.map_rect(&snapshot.clip.bounds()),
            None            => Rect::empty(),
        }
    }
}

impl Default for CanvasState {
    fn default() -> CanvasState {
        CanvasState::new()
    }
}
