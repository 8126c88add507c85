use super::arena::*;
use super::baked_state::*;
use super::clip::*;

use ember_canvas as canvas;
use ember_canvas::{BlendMode, NodeId, OffscreenBufferId, OpKind, Paint, RecordedOp, Rect};

use std::collections::HashMap;
use std::mem;

///
/// The closed set of batch kinds a layer builder groups ops into
///
/// Ops sharing a batch can be issued to the GPU together; the renderer picks
/// a pipeline per batch id.
///
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum OpBatchType {
    Bitmap,
    MergedPatch,
    Patch,
    AlphaMaskTexture,
    Text,
    ColorText,
    Vertices,
    AlphaVertices,
    Shadow,
    Functor,
    TextureLayer,
    CopyToLayer,
    CopyFromLayer,
}

impl OpBatchType {
    pub const COUNT: usize = 13;

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

///
/// Key identifying ops that may coalesce into one batch entry (bitmap
/// generation ids, packed text colours)
///
pub type MergeId = u64;

///
/// A maximal run of same-kind ops that preserves visual ordering with the
/// batches around it
///
#[derive(Clone, Debug)]
pub struct OpBatch {
    pub batch_id: OpBatchType,

    /// Union of the clipped bounds of every op in the batch
    pub bounds: Rect,

    pub ops: Vec<BakedHandle>,

    /// Set for merging batches; unmergeable batches carry None
    pub merge_id: Option<MergeId>,
}

///
/// Collects the batched ops bound for one render target
///
/// Batching maintains the overlap-preserving invariant: an op only joins an
/// earlier batch when no batch recorded in between overlaps it, so the
/// renderer can issue batches in order without visual reordering.
///
pub struct LayerBuilder<'a> {
    pub width: u32,
    pub height: u32,

    /// The region of this layer being repainted this frame
    pub repaint_rect: Rect,

    /// Clip applied to ops constructed directly in render-target space
    pub viewport_clip: Rect,

    /// The recorded op that opened this layer, for save-layers
    pub begin_layer_op: Option<OpRef<'a>>,

    /// The node owning this layer, for layer updates
    pub render_node: Option<NodeId>,

    /// Filled by the renderer once the layer's buffer exists
    pub offscreen_buffer: Option<OffscreenBufferId>,

    /// Copy-from ops waiting for their balancing end-unclipped-layer
    pub active_unclipped_save_layers: Vec<BakedHandle>,

    batches: Vec<OpBatch>,
    batch_lookup: [Option<usize>; OpBatchType::COUNT],
    merge_index: HashMap<(OpBatchType, MergeId), usize>,
    clear_rects: Vec<Rect>,
}

impl<'a> LayerBuilder<'a> {
    ///
    /// A builder for an off-screen target
    ///
    pub fn new(width: u32, height: u32, repaint_rect: Rect,
        begin_layer_op: Option<OpRef<'a>>, render_node: Option<NodeId>) -> LayerBuilder<'a>
    {
        LayerBuilder {
            width,
            height,
            repaint_rect,
            viewport_clip:                  Rect::from_size(width as f32, height as f32),
            begin_layer_op,
            render_node,
            offscreen_buffer:               None,
            active_unclipped_save_layers:   vec![],
            batches:                        vec![],
            batch_lookup:                   [None; OpBatchType::COUNT],
            merge_index:                    HashMap::new(),
            clear_rects:                    vec![],
        }
    }

    ///
    /// The builder for the primary framebuffer
    ///
    pub fn primary(viewport_width: u32, viewport_height: u32, clip: Rect) -> LayerBuilder<'a> {
        LayerBuilder::new(viewport_width, viewport_height, clip, None, None)
    }

    #[inline]
    pub fn batches(&self) -> &[OpBatch] {
        &self.batches
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    ///
    /// Appends an op that never merges, coalescing with the most recent batch
    /// of the same kind when no overlapping batch intervenes
    ///
    pub fn defer_unmergeable_op(&mut self, arena: &mut FrameArena<'a>, state: BakedHandle,
        batch_id: OpBatchType)
    {
        self.flush_layer_clears(arena);
        self.push_unmergeable(arena, state, batch_id);
    }

    ///
    /// Appends an op that may coalesce with earlier ops sharing its merge id
    ///
    pub fn defer_mergeable_op(&mut self, arena: &mut FrameArena<'a>, state: BakedHandle,
        batch_id: OpBatchType, merge_id: MergeId)
    {
        self.flush_layer_clears(arena);

        let bounds = arena.baked(state).computed.clipped_bounds;

        if let Some(&target) = self.merge_index.get(&(batch_id, merge_id)) {
            if self.can_reach(target, &bounds) && self.can_merge(arena, target, state) {
                self.append_to(target, state, &bounds);
                return;
            }
        }

        let index = self.push_batch(batch_id, state, bounds, Some(merge_id));
        self.merge_index.insert((batch_id, merge_id), index);
    }

    ///
    /// Queues a region to clear before the next draw into this layer
    ///
    /// Clears accumulate so multiple unclipped save-layers flush as a single
    /// operation, as late after their copy-outs as possible.
    ///
    pub fn defer_layer_clear(&mut self, rect: Rect) {
        self.clear_rects.push(rect);
    }

    ///
    /// Discards all deferred work (a save-layer that turned out invisible)
    ///
    pub fn clear(&mut self) {
        self.batches.clear();
        self.batch_lookup = [None; OpBatchType::COUNT];
        self.merge_index.clear();
        self.clear_rects.clear();
    }

    ///
    /// Turns pending clear rects into a single clear op ahead of the op about
    /// to be deferred
    ///
    fn flush_layer_clears(&mut self, arena: &mut FrameArena<'a>) {
        if self.clear_rects.is_empty() {
            return;
        }

        let rects = mem::take(&mut self.clear_rects);
        let mut bounds = Rect::empty();
        for rect in &rects {
            bounds.unite(rect);
        }

        let paint       = Paint { blend_mode: BlendMode::Clear, ..Paint::default() };
        let clear_op    = RecordedOp::new(bounds, paint, OpKind::SimpleRects { rects });
        let op_ref      = OpRef::Resolved(arena.create_resolved_op(clear_op));
        let state       = BakedOpState::direct_construct(arena, &self.viewport_clip, bounds, op_ref);

        self.push_unmergeable(arena, state, OpBatchType::Vertices);
    }

    fn push_unmergeable(&mut self, arena: &FrameArena<'a>, state: BakedHandle,
        batch_id: OpBatchType)
    {
        let bounds = arena.baked(state).computed.clipped_bounds;

        let target = self.batch_lookup[batch_id.index()]
            .filter(|&target| self.can_reach(target, &bounds));

        match target {
            Some(target) => self.append_to(target, state, &bounds),
            None         => { self.push_batch(batch_id, state, bounds, None); }
        }
    }

    ///
    /// True if no batch recorded after `target` overlaps the new op, meaning
    /// appending to `target` can't change what ends up on screen
    ///
    fn can_reach(&self, target: usize, bounds: &Rect) -> bool {
        self.batches[target + 1..].iter().all(|batch| !batch.bounds.intersects(bounds))
    }

    ///
    /// Batch-kind-specific merge predicate, applied after the overlap check
    ///
    fn can_merge(&self, arena: &FrameArena<'a>, target: usize, state: BakedHandle) -> bool {
        let baked = arena.baked(state);
        if !ClipState::is_mergeable(&baked.computed.clip_state) {
            return false;
        }

        let batch = &self.batches[target];
        match batch.batch_id {
            // Merged text shares one colour uniform across the whole batch
            OpBatchType::Text | OpBatchType::ColorText => {
                match batch.ops.first() {
                    Some(&first) => {
                        arena.paint_for(first).color == arena.paint_for(state).color
                    }
                    None => true,
                }
            }

            _ => true,
        }
    }

    fn append_to(&mut self, target: usize, state: BakedHandle, bounds: &Rect) {
        let batch = &mut self.batches[target];
        batch.ops.push(state);
        batch.bounds.unite(bounds);
    }

    fn push_batch(&mut self, batch_id: OpBatchType, state: BakedHandle, bounds: Rect,
        merge_id: Option<MergeId>) -> usize
    {
        let index = self.batches.len();
        self.batches.push(OpBatch {
            batch_id,
            bounds,
            ops: vec![state],
            merge_id,
        });

        // Merging batches are only reachable through the merge index
        if merge_id.is_none() {
            self.batch_lookup[batch_id.index()] = Some(index);
        }
        index
    }
}

///
/// Batch id for tessellated shapes, from the paint: path effects render
/// through an alpha mask, antialiasing through alpha vertices
///
pub fn tess_batch_id(paint: &canvas::Paint) -> OpBatchType {
    if paint.path_effect.is_some() {
        OpBatchType::AlphaMaskTexture
    } else if paint.antialias {
        OpBatchType::AlphaVertices
    } else {
        OpBatchType::Vertices
    }
}

///
/// Batch id for text, from the paint colour
///
pub fn text_batch_id(paint: &canvas::Paint) -> OpBatchType {
    if paint.color.is_opaque_black() {
        OpBatchType::Text
    } else {
        OpBatchType::ColorText
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::snapshot::*;

    use ember_canvas::Vector3;

    fn bake(arena: &mut FrameArena<'static>, bounds: Rect) -> BakedHandle {
        let snapshot = Snapshot::root(100, 100, Rect::new(0.0, 0.0, 100.0, 100.0),
            Vector3::new(50.0, 0.0, 600.0));
        let op     = RecordedOp::new(bounds, Paint::default(), OpKind::Rect);
        let handle = arena.create_resolved_op(op.clone());

        BakedOpState::try_bake(arena, &snapshot, &op, OpRef::Resolved(handle)).expect("bakes")
    }

    #[test]
    fn same_kind_ops_share_a_batch() {
        let mut arena = FrameArena::new();
        let mut layer = LayerBuilder::primary(100, 100, Rect::new(0.0, 0.0, 100.0, 100.0));

        let a = bake(&mut arena, Rect::new(0.0, 0.0, 50.0, 50.0));
        let b = bake(&mut arena, Rect::new(25.0, 25.0, 75.0, 75.0));
        layer.defer_unmergeable_op(&mut arena, a, OpBatchType::Vertices);
        layer.defer_unmergeable_op(&mut arena, b, OpBatchType::Vertices);

        assert!(layer.batches().len() == 1);
        assert!(layer.batches()[0].ops.len() == 2);
    }

    #[test]
    fn overlapping_different_kind_starts_a_new_batch() {
        let mut arena = FrameArena::new();
        let mut layer = LayerBuilder::primary(100, 100, Rect::new(0.0, 0.0, 100.0, 100.0));

        let a = bake(&mut arena, Rect::new(0.0, 0.0, 50.0, 50.0));
        let b = bake(&mut arena, Rect::new(25.0, 25.0, 75.0, 75.0));
        let c = bake(&mut arena, Rect::new(30.0, 30.0, 60.0, 60.0));
        layer.defer_unmergeable_op(&mut arena, a, OpBatchType::Vertices);
        layer.defer_unmergeable_op(&mut arena, b, OpBatchType::AlphaVertices);
        layer.defer_unmergeable_op(&mut arena, c, OpBatchType::Vertices);

        // c overlaps the alpha batch, so it can't rejoin the first batch
        assert!(layer.batches().len() == 3);
        assert!(layer.batches()[0].batch_id == OpBatchType::Vertices);
        assert!(layer.batches()[1].batch_id == OpBatchType::AlphaVertices);
        assert!(layer.batches()[2].batch_id == OpBatchType::Vertices);
    }

    #[test]
    fn non_overlapping_op_rejoins_earlier_batch() {
        let mut arena = FrameArena::new();
        let mut layer = LayerBuilder::primary(100, 100, Rect::new(0.0, 0.0, 100.0, 100.0));

        let a = bake(&mut arena, Rect::new(0.0, 0.0, 20.0, 20.0));
        let b = bake(&mut arena, Rect::new(40.0, 40.0, 60.0, 60.0));
        let c = bake(&mut arena, Rect::new(70.0, 70.0, 90.0, 90.0));
        layer.defer_unmergeable_op(&mut arena, a, OpBatchType::Vertices);
        layer.defer_unmergeable_op(&mut arena, b, OpBatchType::AlphaVertices);
        layer.defer_unmergeable_op(&mut arena, c, OpBatchType::Vertices);

        // c doesn't overlap the alpha batch so it coalesces backwards
        assert!(layer.batches().len() == 2);
        assert!(layer.batches()[0].ops.len() == 2);
    }

    #[test]
    fn merge_ids_coalesce_ops() {
        let mut arena = FrameArena::new();
        let mut layer = LayerBuilder::primary(100, 100, Rect::new(0.0, 0.0, 100.0, 100.0));

        let a = bake(&mut arena, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = bake(&mut arena, Rect::new(20.0, 0.0, 30.0, 10.0));
        let c = bake(&mut arena, Rect::new(40.0, 0.0, 50.0, 10.0));
        layer.defer_mergeable_op(&mut arena, a, OpBatchType::Bitmap, 7);
        layer.defer_mergeable_op(&mut arena, b, OpBatchType::Bitmap, 7);
        layer.defer_mergeable_op(&mut arena, c, OpBatchType::Bitmap, 9);

        assert!(layer.batches().len() == 2);
        assert!(layer.batches()[0].ops.len() == 2);
        assert!(layer.batches()[0].merge_id == Some(7));
        assert!(layer.batches()[1].ops.len() == 1);
        assert!(layer.batches()[1].merge_id == Some(9));
    }

    #[test]
    fn deferred_clears_flush_before_the_next_draw() {
        let mut arena = FrameArena::new();
        let mut layer = LayerBuilder::primary(100, 100, Rect::new(0.0, 0.0, 100.0, 100.0));

        layer.defer_layer_clear(Rect::new(10.0, 10.0, 20.0, 20.0));
        layer.defer_layer_clear(Rect::new(30.0, 10.0, 40.0, 20.0));

        let a = bake(&mut arena, Rect::new(12.0, 12.0, 18.0, 18.0));
        layer.defer_unmergeable_op(&mut arena, a, OpBatchType::Vertices);

        let batches = layer.batches();
        assert!(batches.len() == 1);
        assert!(batches[0].ops.len() == 2);

        // First op is the flushed clear covering both rects
        let clear = arena.baked(batches[0].ops[0]);
        let clear_op = arena.op(clear.op);
        assert!(matches!(clear_op.kind, OpKind::SimpleRects { ref rects } if rects.len() == 2));
        assert!(clear_op.paint.blend_mode == BlendMode::Clear);
    }

    #[test]
    fn clear_empties_the_builder() {
        let mut arena = FrameArena::new();
        let mut layer = LayerBuilder::primary(100, 100, Rect::new(0.0, 0.0, 100.0, 100.0));

        let a = bake(&mut arena, Rect::new(0.0, 0.0, 10.0, 10.0));
        layer.defer_unmergeable_op(&mut arena, a, OpBatchType::Vertices);
        layer.clear();

        assert!(layer.is_empty());
    }
}
