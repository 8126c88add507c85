use super::frame_builder::*;

use crate::arena::*;
use crate::baked_state::*;
use crate::layer_builder::*;

use ember_canvas::{LayerSource, Matrix4, OpKind, Paint, RecordedOp, Rect};

use log::trace;

impl<'a> FrameBuilder<'a> {
    ///
    /// Opens a clipped save-layer: a fresh snapshot and layer builder sized
    /// to the visible part of the requested bounds
    ///
    pub(super) fn defer_begin_layer_op(&mut self, op: &RecordedOp, op_ref: OpRef<'a>) {
        let mut layer_width  = op.unmapped_bounds.width() as u32;
        let mut layer_height = op.unmapped_bounds.height() as u32;

        let previous         = self.canvas_state.current_snapshot();
        let mut light_center = previous.relative_light_center;

        // All transforms used to present the layer's content:
        // parent transform * op matrix * bounds offset
        let mut content_transform = previous.transform;
        content_transform.multiply(&op.local_matrix);
        content_transform.translate(op.unmapped_bounds.left, op.unmapped_bounds.top);

        let inverse_content_transform = content_transform.invert()
            .unwrap_or_else(Matrix4::identity);

        // Move the light into layer-relative space
        light_center = inverse_content_transform.map_point3d(light_center);

        // Trim the layer to the parent's clip: transform into parent space,
        // intersect, and transform back
        let mut save_layer_bounds = Rect::from_size(layer_width as f32, layer_height as f32);
        save_layer_bounds = content_transform.map_rect(&save_layer_bounds);
        save_layer_bounds.intersect(&previous.render_target_clip());
        save_layer_bounds = inverse_content_transform.map_rect(&save_layer_bounds);
        save_layer_bounds.intersect(&Rect::from_size(layer_width as f32, layer_height as f32));
        save_layer_bounds.round_out();

        // A reduced layer shifts its content so drawing still lands at the
        // top-left of the buffer
        layer_width  = f32::max(save_layer_bounds.width(), 0.0) as u32;
        layer_height = f32::max(save_layer_bounds.height(), 0.0) as u32;
        let content_translate_x = -save_layer_bounds.left;
        let content_translate_y = -save_layer_bounds.top;

        self.save_for_layer(layer_width, layer_height,
            content_translate_x, content_translate_y,
            Rect::from_size(layer_width as f32, layer_height as f32),
            light_center, Some(op_ref), None);
    }

    ///
    /// Closes a clipped save-layer and defers drawing it into the target that
    /// is now current again
    ///
    pub(super) fn defer_end_layer_op(&mut self) {
        assert!(self.layer_stack.len() > 1, "end layer with no open layer");

        let finished_index = *self.layer_stack.last().unwrap();
        let begin_layer_op = self.layer_builders[finished_index].begin_layer_op
            .expect("save layer missing its begin op");

        self.restore_for_layer();

        // The begin op carries all the state needed to draw the layer back
        let begin_op = self.arena.op(begin_layer_op).clone();
        let layer_op = RecordedOp {
            unmapped_bounds: begin_op.unmapped_bounds,
            local_matrix:    begin_op.local_matrix,
            local_clip:      begin_op.local_clip,
            paint:           begin_op.paint.clone(),
            kind:            OpKind::Layer {
                source: LayerSource::FinishedLayer(finished_index),
            },
        };
        let op_ref = OpRef::Resolved(self.arena.create_resolved_op(layer_op.clone()));

        let baked = BakedOpState::try_bake(&mut self.arena,
            self.canvas_state.current_snapshot(), &layer_op, op_ref);

        match baked {
            Some(state) => self.defer_unmergeable(state, OpBatchType::Bitmap),
            None        => {
                // The layer will never be drawn; drop its batches so the
                // renderer doesn't waste work filling it
                trace!("save layer quick rejected; clearing builder {}", finished_index);
                self.layer_builders[finished_index].clear();
            }
        }
    }

    ///
    /// Opens an unclipped save-layer: copy the covered pixels out, clear the
    /// region, and stash the copy-back until the balancing end op
    ///
    pub(super) fn defer_begin_unclipped_layer_op(&mut self, op: &RecordedOp) {
        let snapshot = self.canvas_state.current_snapshot();

        let mut bounds_transform = snapshot.transform;
        bounds_transform.multiply(&op.local_matrix);

        let mut dst_rect = bounds_transform.map_rect(&op.unmapped_bounds);
        dst_rect.intersect(&snapshot.render_target_clip());

        // Holding position for the layer buffer: the copy-to op produces it,
        // the copy-from op consumes it
        let cell = self.arena.create_layer_cell();

        let copy_to = RecordedOp::new(dst_rect, Paint::default(),
            OpKind::CopyToLayer { cell: cell.0 as usize });
        let copy_to_ref   = OpRef::Resolved(self.arena.create_resolved_op(copy_to));
        let viewport_clip = self.current_layer().viewport_clip;
        let copy_to_state = BakedOpState::direct_construct(&mut self.arena,
            &viewport_clip, dst_rect, copy_to_ref);
        self.defer_unmergeable(copy_to_state, OpBatchType::CopyToLayer);

        // Clears accumulate so they flush together, as late after the
        // copy-out as possible
        self.current_layer_mut().defer_layer_clear(dst_rect);

        let copy_from = RecordedOp::new(dst_rect, Paint::default(),
            OpKind::CopyFromLayer { cell: cell.0 as usize });
        let copy_from_ref   = OpRef::Resolved(self.arena.create_resolved_op(copy_from));
        let copy_from_state = BakedOpState::direct_construct(&mut self.arena,
            &viewport_clip, dst_rect, copy_from_ref);
        self.current_layer_mut().active_unclipped_save_layers.push(copy_from_state);
    }

    ///
    /// Closes an unclipped save-layer, emitting the stashed copy-back
    ///
    pub(super) fn defer_end_unclipped_layer_op(&mut self) {
        let copy_from = {
            let layer = self.current_layer_mut();
            assert!(!layer.active_unclipped_save_layers.is_empty(), "no layer to end");
            layer.active_unclipped_save_layers.pop().unwrap()
        };

        self.defer_unmergeable(copy_from, OpBatchType::CopyFromLayer);
    }
}
