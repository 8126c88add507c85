use super::frame_builder::*;

use crate::arena::*;
use crate::baked_state::*;
use crate::clip::*;
use crate::layer_builder::*;

use ember_canvas::{BlendMode, ColorType, OpKind, RecordedOp, Rect};

impl<'a> FrameBuilder<'a> {
    ///
    /// Bakes and defers an op with no batching subtleties
    ///
    pub(super) fn defer_simple_op(&mut self, op: &RecordedOp, op_ref: OpRef<'a>,
        batch_id: OpBatchType)
    {
        let baked = BakedOpState::try_bake(&mut self.arena,
            self.canvas_state.current_snapshot(), op, op_ref);

        if let Some(state) = baked {
            self.defer_unmergeable(state, batch_id);
        }
    }

    ///
    /// Bakes and defers a strokeable op, accounting for the paint's style on
    /// the bounds being computed
    ///
    pub(super) fn defer_strokeable_op(&mut self, op: &RecordedOp, op_ref: OpRef<'a>,
        batch_id: OpBatchType, stroke_behavior: StrokeBehavior)
    {
        let baked = BakedOpState::try_bake_strokeable(&mut self.arena,
            self.canvas_state.current_snapshot(), op, op_ref, stroke_behavior);

        if let Some(state) = baked {
            self.defer_unmergeable(state, batch_id);
        }
    }

    ///
    /// Bitmaps merge by generation id when nothing rules the texture batch out
    ///
    pub(super) fn defer_bitmap_op(&mut self, op: &'a RecordedOp, op_ref: OpRef<'a>) {
        let bitmap = match &op.kind {
            OpKind::Bitmap { bitmap } => bitmap,
            _                         => return,
        };

        let baked = BakedOpState::try_bake(&mut self.arena,
            self.canvas_state.current_snapshot(), op, op_ref);
        let state = match baked {
            Some(state) => state,
            None        => return, // quick rejected
        };

        // Rotated, negatively scaled or A8 bitmaps can't share a textured
        // quad batch; the merged path also requires a rectangular clip
        let (simple, positive, mergeable_clip) = {
            let computed = &self.arena.baked(state).computed;
            (computed.transform.is_simple(),
                computed.transform.positive_scale(),
                ClipState::is_mergeable(&computed.clip_state))
        };

        if simple && positive
            && op.paint.blend_mode == BlendMode::SourceOver
            && bitmap.color_type != ColorType::Alpha8
            && mergeable_clip
        {
            self.defer_mergeable(state, OpBatchType::Bitmap, bitmap.generation_id());
        } else {
            self.defer_unmergeable(state, OpBatchType::Bitmap);
        }
    }

    ///
    /// Nine-patches merge by generation id when translated only; otherwise
    /// they batch with bitmaps, which share their shader
    ///
    pub(super) fn defer_patch_op(&mut self, op: &'a RecordedOp, op_ref: OpRef<'a>) {
        let bitmap = match &op.kind {
            OpKind::Patch { bitmap, .. } => bitmap,
            _                            => return,
        };

        let baked = BakedOpState::try_bake(&mut self.arena,
            self.canvas_state.current_snapshot(), op, op_ref);
        let state = match baked {
            Some(state) => state,
            None        => return, // quick rejected
        };

        let (pure_translate, mergeable_clip) = {
            let computed = &self.arena.baked(state).computed;
            (computed.transform.is_pure_translate(),
                ClipState::is_mergeable(&computed.clip_state))
        };

        if pure_translate
            && op.paint.blend_mode == BlendMode::SourceOver
            && mergeable_clip
        {
            // MergedPatch only when actually merging, so bitmaps and patches
            // don't try to coalesce with each other
            self.defer_mergeable(state, OpBatchType::MergedPatch, bitmap.generation_id());
        } else {
            self.defer_unmergeable(state, OpBatchType::Bitmap);
        }
    }

    ///
    /// Text merges by paint colour; pure black runs through the faster
    /// single-channel batch
    ///
    pub(super) fn defer_text_op(&mut self, op: &'a RecordedOp, op_ref: OpRef<'a>) {
        let baked = BakedOpState::try_bake(&mut self.arena,
            self.canvas_state.current_snapshot(), op, op_ref);
        let state = match baked {
            Some(state) => state,
            None        => return, // quick rejected
        };

        let batch_id = text_batch_id(&op.paint);

        let (pure_translate, mergeable_clip) = {
            let computed = &self.arena.baked(state).computed;
            (computed.transform.is_pure_translate(),
                ClipState::is_mergeable(&computed.clip_state))
        };

        if pure_translate
            && op.paint.blend_mode == BlendMode::SourceOver
            && mergeable_clip
        {
            self.defer_mergeable(state, batch_id, op.paint.color.packed() as MergeId);
        } else {
            self.defer_unmergeable(state, batch_id);
        }
    }

    ///
    /// Resolves the property cells into a concrete oval op so downstream code
    /// never sees the indirection
    ///
    pub(super) fn defer_circle_props_op(&mut self, op: &RecordedOp) {
        let (x, y, radius) = match &op.kind {
            OpKind::CircleProps { x, y, radius } => (x.get(), y.get(), radius.get()),
            _                                    => return,
        };

        let resolved = RecordedOp {
            unmapped_bounds: Rect::new(x - radius, y - radius, x + radius, y + radius),
            local_matrix:    op.local_matrix,
            local_clip:      op.local_clip,
            paint:           op.paint.clone(),
            kind:            OpKind::Oval,
        };
        let resolved_ref = OpRef::Resolved(self.arena.create_resolved_op(resolved.clone()));

        self.defer_strokeable_op(&resolved, resolved_ref, tess_batch_id(&resolved.paint),
            StrokeBehavior::Styled);
    }

    ///
    /// As above, for the round-rect property cells
    ///
    pub(super) fn defer_round_rect_props_op(&mut self, op: &RecordedOp) {
        let resolved = match &op.kind {
            OpKind::RoundRectProps { left, top, right, bottom, rx, ry } => RecordedOp {
                unmapped_bounds: Rect::new(left.get(), top.get(), right.get(), bottom.get()),
                local_matrix:    op.local_matrix,
                local_clip:      op.local_clip,
                paint:           op.paint.clone(),
                kind:            OpKind::RoundRect { rx: rx.get(), ry: ry.get() },
            },
            _ => return,
        };
        let resolved_ref = OpRef::Resolved(self.arena.create_resolved_op(resolved.clone()));

        self.defer_strokeable_op(&resolved, resolved_ref, tess_batch_id(&resolved.paint),
            StrokeBehavior::Styled);
    }
}
