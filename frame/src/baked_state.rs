use super::arena::*;
use super::clip::*;
use super::snapshot::*;

use ember_canvas::{Matrix4, OpKind, RecordedOp, Rect};

///
/// Whether stroke width expands an op's bounds at bake time
///
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StrokeBehavior {
    /// Only expand when the paint's style strokes
    Styled,

    /// Always expand (lines and points are stroked regardless of style)
    Forced,
}

///
/// An op's state once fully resolved against a snapshot
///
#[derive(Clone, Debug)]
pub struct ComputedState {
    /// Snapshot transform composed with the op's local matrix
    pub transform: Matrix4,

    /// The clip the op must honour; None when the clip provably doesn't cut it
    pub clip_state: Option<ClipState>,

    /// World-space bounds after clipping; never empty for a successfully
    /// baked op
    pub clipped_bounds: Rect,
}

///
/// A recorded op bound to the state it will render with
///
#[derive(Clone, Debug)]
pub struct BakedOpState<'a> {
    pub computed: ComputedState,
    pub op: OpRef<'a>,
    pub alpha: f32,
}

impl<'a> BakedOpState<'a> {
    ///
    /// Bakes an op against the current snapshot; None is the quick reject
    ///
    pub fn try_bake(arena: &mut FrameArena<'a>, snapshot: &Snapshot,
        op: &RecordedOp, op_ref: OpRef<'a>) -> Option<BakedHandle>
    {
        Self::bake_internal(arena, snapshot, op, op_ref, 0.0, None)
    }

    ///
    /// Bakes a strokeable op, outsetting the bounds for the paint's stroke
    ///
    pub fn try_bake_strokeable(arena: &mut FrameArena<'a>, snapshot: &Snapshot,
        op: &RecordedOp, op_ref: OpRef<'a>, stroke_behavior: StrokeBehavior) -> Option<BakedHandle>
    {
        let expand = match stroke_behavior {
            StrokeBehavior::Forced => true,
            StrokeBehavior::Styled => op.paint.has_stroke(),
        };

        let outset = if expand {
            // Hairline strokes still cover half a pixel either side
            if op.paint.stroke_width == 0.0 { 0.5 } else { op.paint.stroke_width * 0.5 }
        } else {
            0.0
        };

        Self::bake_internal(arena, snapshot, op, op_ref, outset, None)
    }

    ///
    /// Bakes a shadow op; the caster's combined alpha replaces the paint's
    ///
    pub fn try_bake_shadow(arena: &mut FrameArena<'a>, snapshot: &Snapshot,
        op: &RecordedOp, op_ref: OpRef<'a>) -> Option<BakedHandle>
    {
        let caster_alpha = match &op.kind {
            OpKind::Shadow { caster_alpha, .. } => *caster_alpha,
            _                                   => op.paint.alpha(),
        };

        Self::bake_internal(arena, snapshot, op, op_ref, 0.0, Some(caster_alpha))
    }

    ///
    /// Wraps an op that already carries resolved render-target coordinates
    /// (unclipped save-layer copies); no quick reject
    ///
    pub fn direct_construct(arena: &mut FrameArena<'a>, clip: &Rect, dst_rect: Rect,
        op_ref: OpRef<'a>) -> BakedHandle
    {
        let computed = ComputedState {
            transform:      Matrix4::identity(),
            clip_state:     Some(ClipState { bounds: *clip, mode: ClipMode::Rectangle }),
            clipped_bounds: dst_rect.intersection(clip),
        };

        arena.create_baked(BakedOpState {
            computed,
            op:    op_ref,
            alpha: 1.0,
        })
    }

    fn bake_internal(arena: &mut FrameArena<'a>, snapshot: &Snapshot,
        op: &RecordedOp, op_ref: OpRef<'a>, outset: f32,
        alpha_override: Option<f32>) -> Option<BakedHandle>
    {
        let mut transform = snapshot.transform;
        transform.multiply(&op.local_matrix);

        let mut unmapped = op.unmapped_bounds;
        if outset > 0.0 {
            unmapped.outset(outset);
        }
        let mapped = transform.map_rect(&unmapped);

        // Record-time clip composes with the defer-time clip
        let mut clip = snapshot.clip.clone();
        clip.apply_clip(op.local_clip.as_ref(), &snapshot.transform);

        let clip_state = clip.serialize_intersected(&mapped);

        let mut clipped_bounds = mapped;
        clipped_bounds.intersect(&clip.bounds());
        if clipped_bounds.is_empty() {
            return None;
        }

        let alpha = snapshot.alpha * alpha_override.unwrap_or_else(|| op.paint.alpha());

        Some(arena.create_baked(BakedOpState {
            computed: ComputedState { transform, clip_state, clipped_bounds },
            op:       op_ref,
            alpha,
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use ember_canvas::{Paint, Vector3};

    fn snapshot_100() -> Snapshot {
        Snapshot::root(100, 100, Rect::new(0.0, 0.0, 100.0, 100.0),
            Vector3::new(50.0, 0.0, 600.0))
    }

    #[test]
    fn bake_clips_bounds() {
        let mut arena = FrameArena::new();
        let snapshot  = snapshot_100();
        let op = RecordedOp::new(Rect::new(50.0, 50.0, 150.0, 150.0),
            Paint::default(), OpKind::Rect);

        let handle = BakedOpState::try_bake(&mut arena, &snapshot, &op, OpRef::Recorded(&op))
            .map(|handle| arena.baked(handle).clone());
        let baked = handle.expect("visible op bakes");

        assert!(baked.computed.clipped_bounds == Rect::new(50.0, 50.0, 100.0, 100.0));
        assert!(baked.computed.clip_state.is_some());
    }

    #[test]
    fn offscreen_op_quick_rejects() {
        let mut arena = FrameArena::new();
        let snapshot  = snapshot_100();
        let op = RecordedOp::new(Rect::new(500.0, 500.0, 600.0, 600.0),
            Paint::default(), OpKind::Rect);

        assert!(BakedOpState::try_bake(&mut arena, &snapshot, &op, OpRef::Recorded(&op)).is_none());
    }

    #[test]
    fn nan_bounds_quick_reject() {
        let mut arena = FrameArena::new();
        let snapshot  = snapshot_100();
        let op = RecordedOp::new(Rect::new(f32::NAN, 0.0, 50.0, 50.0),
            Paint::default(), OpKind::Rect);

        assert!(BakedOpState::try_bake(&mut arena, &snapshot, &op, OpRef::Recorded(&op)).is_none());
    }

    #[test]
    fn stroke_expands_bounds() {
        let mut arena = FrameArena::new();
        let snapshot  = snapshot_100();

        let mut paint = Paint::default();
        paint.style = ember_canvas::PaintStyle::Stroke;
        paint.stroke_width = 4.0;
        let op = RecordedOp::new(Rect::new(10.0, 10.0, 20.0, 20.0), paint, OpKind::Rect);

        let handle = BakedOpState::try_bake_strokeable(&mut arena, &snapshot, &op,
            OpRef::Recorded(&op), StrokeBehavior::Styled).expect("bakes");

        assert!(arena.baked(handle).computed.clipped_bounds == Rect::new(8.0, 8.0, 22.0, 22.0));
    }

    #[test]
    fn fill_style_ignores_stroke_width_unless_forced() {
        let mut arena = FrameArena::new();
        let snapshot  = snapshot_100();

        let mut paint = Paint::default();
        paint.stroke_width = 4.0;
        let op = RecordedOp::new(Rect::new(10.0, 10.0, 20.0, 20.0), paint, OpKind::Rect);

        let styled = BakedOpState::try_bake_strokeable(&mut arena, &snapshot, &op,
            OpRef::Recorded(&op), StrokeBehavior::Styled).expect("bakes");
        assert!(arena.baked(styled).computed.clipped_bounds == Rect::new(10.0, 10.0, 20.0, 20.0));

        let forced = BakedOpState::try_bake_strokeable(&mut arena, &snapshot, &op,
            OpRef::Recorded(&op), StrokeBehavior::Forced).expect("bakes");
        assert!(arena.baked(forced).computed.clipped_bounds == Rect::new(8.0, 8.0, 22.0, 22.0));
    }

    #[test]
    fn alpha_is_snapshot_times_paint() {
        let mut arena    = FrameArena::new();
        let mut snapshot = snapshot_100();
        snapshot.alpha   = 0.5;

        let paint = Paint::fill(ember_canvas::Rgba8([255, 0, 0, 128]));
        let op = RecordedOp::new(Rect::new(0.0, 0.0, 10.0, 10.0), paint, OpKind::Rect);

        let handle = BakedOpState::try_bake(&mut arena, &snapshot, &op, OpRef::Recorded(&op))
            .expect("bakes");
        let alpha = arena.baked(handle).alpha;

        assert!((alpha - 0.5 * (128.0 / 255.0)).abs() < 0.001);
    }
}
