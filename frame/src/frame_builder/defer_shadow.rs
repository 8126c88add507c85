use super::frame_builder::*;

use crate::arena::*;
use crate::baked_state::*;
use crate::layer_builder::*;

use ember_canvas::{
    ClippingFlags, DisplayList, OpKind, Paint, Path, RecordedOp, Rect, Vector3,
};

use std::sync::Arc;

impl<'a> FrameBuilder<'a> {
    ///
    /// Defers the shadow cast by a z-reordered child, if it casts one
    ///
    /// The caster's silhouette is its outline, cut down by the reveal clip
    /// and the clip bounds when those are active.
    ///
    pub(super) fn defer_shadow(&mut self, display_list: &'a DisplayList, caster_op_index: usize) {
        let caster_op = &display_list.ops[caster_op_index];
        let caster    = match &caster_op.kind {
            OpKind::RenderNode { node } => *node,
            _                           => return,
        };

        let properties = &self.nodes.node(caster).properties;

        if properties.alpha <= 0.0
            || properties.outline.alpha <= 0.0
            || properties.outline.path.is_none()
            || properties.scale_x == 0.0
            || properties.scale_y == 0.0
        {
            // no shadow to draw
            return;
        }

        let caster_outline = properties.outline.path.as_ref().unwrap();
        let reveal_path    = properties.reveal_clip.path();
        if let Some(reveal) = &reveal_path {
            if reveal.is_empty() {
                return;
            }
        }

        let caster_alpha = properties.alpha * properties.outline.alpha;

        // Intersect the casting silhouette with the reveal and the clip
        // bounds; the results live in the frame arena's resolved op
        let mut caster_path = (**caster_outline).clone();
        if let Some(reveal) = reveal_path {
            caster_path = Path::intersection(&caster_path, &reveal);
        }
        if properties.clipping_flags.contains(ClippingFlags::CLIP_TO_CLIP_BOUNDS) {
            let clip_bounds = properties
                .clipping_rect_for_flags(ClippingFlags::CLIP_TO_CLIP_BOUNDS);
            caster_path = Path::intersection(&caster_path, &Path::from_rect(clip_bounds));
        }

        let light_center = self.canvas_state.current_snapshot().relative_light_center;
        let caster_z     = properties.z;

        // Place the shadow under the caster's position in the parent
        let mut local_matrix = caster_op.local_matrix;
        local_matrix.translate(properties.left + properties.translation_x,
            properties.top + properties.translation_y);

        let shadow_op = RecordedOp {
            unmapped_bounds: shadow_bounds(caster_path.bounds(), caster_z, light_center),
            local_matrix,
            local_clip:      None,
            paint:           Paint::default(),
            kind:            OpKind::Shadow {
                caster_path: Arc::new(caster_path),
                caster_alpha,
                caster_z,
                light_center,
            },
        };
        let op_ref = OpRef::Resolved(self.arena.create_resolved_op(shadow_op.clone()));

        let baked = BakedOpState::try_bake_shadow(&mut self.arena,
            self.canvas_state.current_snapshot(), &shadow_op, op_ref);

        if let Some(state) = baked {
            self.defer_unmergeable(state, OpBatchType::Shadow);
        }
    }
}

///
/// Conservative bounds of the ambient and spot shadows a silhouette casts
///
/// The ambient shadow spreads with elevation; the spot shadow is the
/// silhouette projected onto the ground plane away from the light.
///
fn shadow_bounds(silhouette: Rect, caster_z: f32, light: Vector3) -> Rect {
    let mut bounds = silhouette;
    bounds.outset(1.0 + caster_z * 0.5);

    if caster_z > 0.0 && light.z > caster_z {
        let scale   = light.z / (light.z - caster_z);
        let project = |x: f32, y: f32| {
            (light.x + (x - light.x) * scale, light.y + (y - light.y) * scale)
        };

        let (x1, y1) = project(silhouette.left, silhouette.top);
        let (x2, y2) = project(silhouette.right, silhouette.bottom);

        bounds.unite(&Rect::new(
            f32::min(x1, x2), f32::min(y1, y2),
            f32::max(x1, x2), f32::max(y1, y2)));
    }

    bounds
}
