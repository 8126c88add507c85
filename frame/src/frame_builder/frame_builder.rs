use crate::arena::*;
use crate::baked_state::*;
use crate::canvas_state::*;
use crate::clip::*;
use crate::layer_builder::*;
use crate::snapshot::*;

use ember_canvas::{
    Chunk, ClippingFlags, DisplayList, LayerSource, LayerType, LayerUpdateQueue, Matrix4, NodeId,
    NodeStore, OpKind, Paint, RecordedOp, Rect, Vector3,
};

use log::{trace, warn};
use smallvec::SmallVec;

use std::cmp::Ordering;

///
/// Which half of the z-sorted child list a traversal pass draws
///
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(super) enum ChildrenSelectMode {
    Negative,
    Positive,
}

///
/// Transforms a forest of recorded nodes into per-layer batched op lists
///
/// One instance builds one frame: construction runs the entire deferral pass,
/// after which the layer builders hold everything the renderer needs. The
/// renderer walks `layers_in_render_order`, so off-screen layers come out
/// before the primary framebuffer, in the order their updates were queued.
///
pub struct FrameBuilder<'a> {
    pub(super) arena: FrameArena<'a>,
    pub(super) canvas_state: CanvasState,
    pub(super) nodes: &'a NodeStore,
    pub(super) layer_builders: Vec<LayerBuilder<'a>>,
    pub(super) layer_stack: Vec<usize>,
}

impl<'a> FrameBuilder<'a> {
    ///
    /// Runs the deferral pass over the queued layer updates and root nodes
    ///
    pub fn new(layer_updates: &LayerUpdateQueue, clip: Rect,
        viewport_width: u32, viewport_height: u32,
        nodes: &'a NodeStore, roots: &[NodeId], light_center: Vector3) -> FrameBuilder<'a>
    {
        trace!("deferring frame: {}x{} viewport, {} layer updates, {} roots",
            viewport_width, viewport_height, layer_updates.entries().len(), roots.len());

        let mut frame = FrameBuilder {
            arena:          FrameArena::new(),
            canvas_state:   CanvasState::new(),
            nodes,
            layer_builders: Vec::with_capacity(layer_updates.entries().len() + 1),
            layer_stack:    Vec::with_capacity(layer_updates.entries().len() + 1),
        };

        // Prepare to defer the primary framebuffer
        frame.layer_builders.push(LayerBuilder::primary(viewport_width, viewport_height, clip));
        frame.layer_stack.push(0);
        frame.canvas_state.initialize_save_stack(viewport_width, viewport_height,
            clip.left, clip.top, clip.right, clip.bottom, light_center);

        // Defer the layer updates in reverse, so that they render in queue
        // order when the layer builders are read out in reverse
        for entry in layer_updates.entries().iter().rev() {
            let layer_node = nodes.node(entry.node);
            let node_layer = match &layer_node.layer {
                Some(layer) => layer,
                None        => {
                    warn!("layer update queued for a node with no layer; skipping");
                    continue;
                }
            };

            // Move the light into the layer's coordinate space
            let light = frame.canvas_state.current_snapshot().relative_light_center;
            let light = node_layer.inverse_transform_in_window.map_point3d(light);

            let width  = layer_node.properties.width as u32;
            let height = layer_node.properties.height as u32;
            frame.save_for_layer(width, height, 0.0, 0.0, entry.damage, light,
                None, Some(entry.node));

            if layer_node.display_list.is_some() {
                frame.defer_node_ops(entry.node);
            }
            frame.restore_for_layer();
        }

        // Defer the primary framebuffer's content
        for &root in roots {
            if nodes.node(root).nothing_to_draw() {
                continue;
            }

            let count = frame.canvas_state.save(SaveFlags::MATRIX | SaveFlags::CLIP);
            frame.defer_node_props_and_ops(root);
            frame.canvas_state.restore_to_count(count);
        }

        frame
    }

    ///
    /// The layer builders in construction order (index 0 is the primary
    /// framebuffer)
    ///
    #[inline]
    pub fn layer_builders(&self) -> &[LayerBuilder<'a>] {
        &self.layer_builders
    }

    ///
    /// The layer builders in the order the renderer must process them
    ///
    pub fn layers_in_render_order(&self) -> impl Iterator<Item = &LayerBuilder<'a>> {
        self.layer_builders.iter().rev()
    }

    #[inline]
    pub fn arena(&self) -> &FrameArena<'a> {
        &self.arena
    }

    ///
    /// Depth of the save stack (1 once construction completes)
    ///
    pub fn save_stack_depth(&self) -> usize {
        self.canvas_state.save_count()
    }

    ///
    /// Index of the layer currently receiving ops (0 once construction
    /// completes)
    ///
    pub fn current_layer_index(&self) -> usize {
        *self.layer_stack.last().expect("layer stack never empty")
    }

    pub(super) fn current_layer(&self) -> &LayerBuilder<'a> {
        let index = *self.layer_stack.last().expect("layer stack never empty");
        &self.layer_builders[index]
    }

    pub(super) fn current_layer_mut(&mut self) -> &mut LayerBuilder<'a> {
        let index = *self.layer_stack.last().expect("layer stack never empty");
        &mut self.layer_builders[index]
    }

    ///
    /// Defers a baked op into the current layer without merging
    ///
    pub(super) fn defer_unmergeable(&mut self, state: BakedHandle, batch_id: OpBatchType) {
        let index = *self.layer_stack.last().expect("layer stack never empty");
        self.layer_builders[index].defer_unmergeable_op(&mut self.arena, state, batch_id);
    }

    ///
    /// Defers a baked op into the current layer with a merge key
    ///
    pub(super) fn defer_mergeable(&mut self, state: BakedHandle, batch_id: OpBatchType,
        merge_id: MergeId)
    {
        let index = *self.layer_stack.last().expect("layer stack never empty");
        self.layer_builders[index].defer_mergeable_op(&mut self.arena, state, batch_id, merge_id);
    }

    ///
    /// Pushes a fresh snapshot and layer builder for an off-screen target
    ///
    #[allow(clippy::too_many_arguments)]
    pub(super) fn save_for_layer(&mut self, layer_width: u32, layer_height: u32,
        content_translate_x: f32, content_translate_y: f32,
        repaint_rect: Rect, light_center: Vector3,
        begin_layer_op: Option<OpRef<'a>>, render_node: Option<NodeId>)
    {
        self.canvas_state.save(SaveFlags::MATRIX | SaveFlags::CLIP);

        let snapshot                    = self.canvas_state.writable_snapshot();
        snapshot.initialize_viewport(layer_width, layer_height);
        snapshot.round_rect_clip        = None;
        snapshot.relative_light_center  = light_center;
        snapshot.transform.load_translate(content_translate_x, content_translate_y, 0.0);
        snapshot.clip.set_rect(repaint_rect);

        // The new builder becomes the current target
        self.layer_stack.push(self.layer_builders.len());
        self.layer_builders.push(LayerBuilder::new(layer_width, layer_height,
            repaint_rect, begin_layer_op, render_node));
    }

    ///
    /// Pops the snapshot and layer pushed by `save_for_layer`
    ///
    pub(super) fn restore_for_layer(&mut self) {
        self.canvas_state.restore();
        self.layer_stack.pop();
        assert!(!self.layer_stack.is_empty(), "restored past the primary framebuffer");
    }

    ///
    /// Applies a node's properties to the canvas state, then defers its
    /// content as a persistent layer, a temporary save-layer, or directly
    ///
    pub(super) fn defer_node_props_and_ops(&mut self, node_id: NodeId) {
        let nodes      = self.nodes;
        let node       = nodes.node(node_id);
        let properties = &node.properties;
        let outline    = &properties.outline;

        if properties.alpha <= 0.0
            || (outline.should_clip && outline.is_empty())
            || properties.scale_x == 0.0
            || properties.scale_y == 0.0
        {
            return; // rejected
        }

        if properties.left != 0.0 || properties.top != 0.0 {
            self.canvas_state.translate(properties.left, properties.top);
        }
        if let Some(static_matrix) = &properties.static_matrix {
            self.canvas_state.concat_matrix(static_matrix);
        } else if let Some(animation_matrix) = &properties.animation_matrix {
            self.canvas_state.concat_matrix(animation_matrix);
        }
        if let Some(transform_matrix) = &properties.transform_matrix {
            if properties.is_transform_translate_only() {
                // Translating the state directly keeps the clip rectangular
                self.canvas_state.translate(properties.translation_x, properties.translation_y);
            } else {
                self.canvas_state.concat_matrix(transform_matrix);
            }
        }

        let width  = properties.width;
        let height = properties.height;

        // Set non-empty when the node's content needs a temporary save-layer
        let mut save_layer_bounds = Rect::empty();
        let is_layer   = properties.effective_layer_type() != LayerType::None;
        let mut clip_flags = properties.clipping_flags;
        if properties.alpha < 1.0 {
            if is_layer {
                // Bounds clipping is done by the layer itself
                clip_flags.remove(ClippingFlags::CLIP_TO_BOUNDS);
            }
            if is_layer || !properties.has_overlapping_rendering {
                self.canvas_state.scale_alpha(properties.alpha);
            } else {
                save_layer_bounds = Rect::from_size(width, height);
                if !clip_flags.is_empty() {
                    // The save-layer absorbs all remaining clipping
                    save_layer_bounds = properties.clipping_rect_for_flags(clip_flags);
                    clip_flags = ClippingFlags::empty();
                }
            }
        }

        if !clip_flags.is_empty() {
            let clip_rect = properties.clipping_rect_for_flags(clip_flags);
            self.canvas_state.clip_rect(clip_rect.left, clip_rect.top,
                clip_rect.right, clip_rect.bottom, ClipOp::Intersect);
        }

        if properties.reveal_clip.will_clip() {
            let bounds = properties.reveal_clip.bounds();
            self.canvas_state.set_clipping_round_rect(bounds, properties.reveal_clip.radius);
        } else if outline.will_clip() {
            self.canvas_state.set_clipping_outline(outline);
        }

        if self.canvas_state.quick_reject_conservative(0.0, 0.0, width, height) {
            return;
        }

        if let Some(node_layer) = &node.layer {
            // Content already deferred into the persistent layer; draw it
            // into the parent target
            let layer_op = RecordedOp::new(Rect::from_size(width, height), Paint::default(),
                OpKind::Layer { source: LayerSource::NodeBuffer(node_layer.buffer) });
            let op_ref = OpRef::Resolved(self.arena.create_resolved_op(layer_op.clone()));

            if let Some(state) = BakedOpState::try_bake(&mut self.arena,
                self.canvas_state.current_snapshot(), &layer_op, op_ref)
            {
                self.defer_unmergeable(state, OpBatchType::Bitmap);
            }
        } else if !save_layer_bounds.is_empty() {
            // Draw the content within a temporary layer carrying the alpha
            let begin_op = RecordedOp::new(save_layer_bounds,
                Paint::with_alpha(properties.alpha), OpKind::BeginLayer);
            let begin_ref = OpRef::Resolved(self.arena.create_resolved_op(begin_op.clone()));

            self.defer_begin_layer_op(&begin_op, begin_ref);
            self.defer_node_ops(node_id);
            self.defer_end_layer_op();
        } else {
            self.defer_node_ops(node_id);
        }
    }

    ///
    /// Walks a node's display list chunk by chunk, interleaving z-reordered
    /// children and projected descendants with the recorded ops
    ///
    pub(super) fn defer_node_ops(&mut self, node_id: NodeId) {
        let nodes        = self.nodes;
        let node         = nodes.node(node_id);
        let display_list = match &node.display_list {
            Some(display_list) => display_list,
            None               => return,
        };

        for chunk in &display_list.chunks {
            let (z_children, skip_in_order) = self.build_z_sorted_child_list(display_list, chunk);

            self.defer_3d_children(ChildrenSelectMode::Negative, &z_children, display_list);

            for op_index in chunk.begin_op..chunk.end_op {
                let op = &display_list.ops[op_index];
                self.defer_op(op, op_index, &skip_in_order);

                if display_list.projection_receive_index == Some(op_index)
                    && !node.projected_nodes.is_empty()
                {
                    self.defer_projected_children(node_id);
                }
            }

            self.defer_3d_children(ChildrenSelectMode::Positive, &z_children, display_list);
        }
    }

    ///
    /// Collects the chunk's z-reordered children, sorted ascending by z, plus
    /// the op indices the in-order pass must skip
    ///
    /// The sort is stable so children at equal z keep declaration order.
    ///
    fn build_z_sorted_child_list(&self, display_list: &'a DisplayList, chunk: &Chunk)
        -> (SmallVec<[(f32, usize); 16]>, SmallVec<[usize; 16]>)
    {
        let mut z_children: SmallVec<[(f32, usize); 16]> = SmallVec::new();
        let mut skip_in_order: SmallVec<[usize; 16]>     = SmallVec::new();

        for child_position in chunk.begin_child..chunk.end_child {
            let op_index = display_list.children[child_position];
            let child = match &display_list.ops[op_index].kind {
                OpKind::RenderNode { node } => *node,
                _                           => continue,
            };

            let child_z = self.nodes.node(child).properties.z;
            if child_z != 0.0 && chunk.reorder_children {
                z_children.push((child_z, op_index));
                skip_in_order.push(op_index);
            } else if self.nodes.node(child).properties.project_backwards {
                // Drawn through the projection receiver instead
                skip_in_order.push(op_index);
            }
        }

        z_children.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        (z_children, skip_in_order)
    }

    ///
    /// Draws one half of the z-sorted children, interleaving shadows so that
    /// casters at nearly the same height share a shadow plane underneath
    ///
    pub(super) fn defer_3d_children(&mut self, mode: ChildrenSelectMode,
        z_children: &[(f32, usize)], display_list: &'a DisplayList)
    {
        let size = z_children.len();
        if size == 0
            || (mode == ChildrenSelectMode::Negative && z_children[0].0 > 0.0)
            || (mode == ChildrenSelectMode::Positive && z_children[size - 1].0 < 0.0)
        {
            // no 3d children to draw
            return;
        }

        let non_negative_index = z_children.iter()
            .position(|(z, _)| *z >= 0.0)
            .unwrap_or(size);

        let (mut draw_index, mut shadow_index, end_index) = match mode {
            ChildrenSelectMode::Negative => (0, non_negative_index, non_negative_index),
            ChildrenSelectMode::Positive => (non_negative_index, non_negative_index, size),
        };

        let mut last_caster_z = 0.0;
        while shadow_index < end_index || draw_index < end_index {
            if shadow_index < end_index {
                let (caster_z, caster_op_index) = z_children[shadow_index];

                // Emit the shadow if its caster is about to be drawn, or if
                // the caster sits within 0.1 of the previous caster's height
                if shadow_index == draw_index || caster_z - last_caster_z < 0.1 {
                    self.defer_shadow(display_list, caster_op_index);

                    last_caster_z = caster_z;
                    shadow_index += 1;
                    continue;
                }
            }

            let (_, child_op_index) = z_children[draw_index];
            let op = &display_list.ops[child_op_index];
            if let OpKind::RenderNode { node } = &op.kind {
                self.defer_render_node_op_impl(*node, &op.local_matrix, op.local_clip.as_ref());
            }
            draw_index += 1;
        }
    }

    ///
    /// Defers descendants projected onto this node's background
    ///
    pub(super) fn defer_projected_children(&mut self, node_id: NodeId) {
        let nodes = self.nodes;
        let node  = nodes.node(node_id);

        let count = self.canvas_state.save(SaveFlags::MATRIX | SaveFlags::CLIP);

        // Nodes without display lists were rejected before this point
        let display_list  = node.display_list.as_ref().unwrap();
        let receive_index = display_list.projection_receive_index.unwrap();

        // Match the background being projected onto: only its translation
        // properties participate
        if let OpKind::RenderNode { node: background } = &display_list.ops[receive_index].kind {
            let background_properties = &nodes.node(*background).properties;
            self.canvas_state.translate(background_properties.translation_x,
                background_properties.translation_y);
        }

        // Projected content is masked to the receiver's outline
        self.canvas_state.set_projection_path_mask(node.properties.outline.path.clone());

        for projected in &node.projected_nodes {
            let restore_to = self.canvas_state.save(SaveFlags::MATRIX);
            self.canvas_state.concat_matrix(&projected.transform_from_compositing_ancestor);
            self.defer_render_node_op_impl(projected.node, &projected.local_matrix,
                projected.local_clip.as_ref());
            self.canvas_state.restore_to_count(restore_to);
        }

        self.canvas_state.restore_to_count(count);
    }

    ///
    /// Recurses into a child node under the recorded op's clip and matrix
    ///
    pub(super) fn defer_render_node_op_impl(&mut self, node_id: NodeId,
        local_matrix: &Matrix4, local_clip: Option<&Rect>)
    {
        if self.nodes.node(node_id).nothing_to_draw() {
            return;
        }

        let count = self.canvas_state.save(SaveFlags::MATRIX | SaveFlags::CLIP);

        // The op's clip applies first, transformed by the current matrix
        {
            let snapshot  = self.canvas_state.writable_snapshot();
            let transform = snapshot.transform;
            snapshot.clip.apply_clip(local_clip, &transform);
        }
        self.canvas_state.concat_matrix(local_matrix);

        self.defer_node_props_and_ops(node_id);

        self.canvas_state.restore_to_count(count);
    }

    ///
    /// Dispatches a recorded op to its defer handler
    ///
    pub(super) fn defer_op(&mut self, op: &'a RecordedOp, op_index: usize,
        skip_in_order: &[usize])
    {
        let op_ref = OpRef::Recorded(op);

        match &op.kind {
            OpKind::Rect | OpKind::Oval | OpKind::RoundRect { .. } | OpKind::Arc { .. } => {
                self.defer_strokeable_op(op, op_ref, tess_batch_id(&op.paint),
                    StrokeBehavior::Styled);
            }

            // Paths render through a texture, sharing the bitmap shader
            OpKind::Path { .. } => {
                self.defer_strokeable_op(op, op_ref, OpBatchType::Bitmap,
                    StrokeBehavior::Styled);
            }

            OpKind::Lines { .. } | OpKind::Points { .. } => {
                let batch_id = if op.paint.antialias {
                    OpBatchType::AlphaVertices
                } else {
                    OpBatchType::Vertices
                };
                self.defer_strokeable_op(op, op_ref, batch_id, StrokeBehavior::Forced);
            }

            OpKind::Bitmap { .. }       => self.defer_bitmap_op(op, op_ref),
            OpKind::BitmapMesh { .. }   => self.defer_simple_op(op, op_ref, OpBatchType::Bitmap),
            OpKind::BitmapRect { .. }   => self.defer_simple_op(op, op_ref, OpBatchType::Bitmap),
            OpKind::Patch { .. }        => self.defer_patch_op(op, op_ref),
            OpKind::SimpleRects { .. }  => self.defer_simple_op(op, op_ref, OpBatchType::Vertices),
            OpKind::Text { .. }         => self.defer_text_op(op, op_ref),
            OpKind::TextOnPath { .. }   => {
                self.defer_simple_op(op, op_ref, text_batch_id(&op.paint));
            }
            OpKind::Functor { .. }      => self.defer_simple_op(op, op_ref, OpBatchType::Functor),
            OpKind::TextureLayer { .. } => {
                self.defer_simple_op(op, op_ref, OpBatchType::TextureLayer);
            }

            OpKind::RenderNode { node } => {
                if !skip_in_order.contains(&op_index) {
                    self.defer_render_node_op_impl(*node, &op.local_matrix,
                        op.local_clip.as_ref());
                }
            }

            OpKind::BeginLayer            => self.defer_begin_layer_op(op, op_ref),
            OpKind::EndLayer              => self.defer_end_layer_op(),
            OpKind::BeginUnclippedLayer   => self.defer_begin_unclipped_layer_op(op),
            OpKind::EndUnclippedLayer     => self.defer_end_unclipped_layer_op(),

            OpKind::CircleProps { .. }    => self.defer_circle_props_op(op),
            OpKind::RoundRectProps { .. } => self.defer_round_rect_props_op(op),

            OpKind::Shadow { .. } | OpKind::Layer { .. }
            | OpKind::CopyToLayer { .. } | OpKind::CopyFromLayer { .. } => {
                panic!("engine-resolved op recorded in a display list");
            }
        }
    }
}
