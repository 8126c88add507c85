use super::bitmap::*;
use super::display_list::*;
use super::geometry::*;
use super::layer_queue::*;
use super::matrix::*;
use super::paint::*;
use super::path::*;
use super::render_node::*;

use std::sync::Arc;

///
/// Builds a display list one op at a time
///
/// Every recorded op is stamped with the recorder's current local matrix and
/// clip; reorder barriers open a fresh chunk, which is what makes z-reordering
/// of children possible within the barrier's span. Defer-time state (the
/// ancestors' transforms and clips) is resolved later by the frame builder,
/// not here.
///
pub struct DisplayListRecorder {
    display_list: DisplayList,
    deferred_barrier: Option<bool>,
    local_matrix: Matrix4,
    local_clip: Option<Rect>,
    layer_stack: Vec<(Matrix4, Option<Rect>)>,
}

impl Default for DisplayListRecorder {
    fn default() -> DisplayListRecorder {
        DisplayListRecorder::new()
    }
}

impl DisplayListRecorder {
    pub fn new() -> DisplayListRecorder {
        DisplayListRecorder {
            display_list:       DisplayList::default(),
            deferred_barrier:   Some(false),
            local_matrix:       Matrix4::identity(),
            local_clip:         None,
            layer_stack:        vec![],
        }
    }

    ///
    /// Starts a new chunk at the next recorded op
    ///
    /// `reorder` permits the chunk's children to draw in z order.
    ///
    pub fn insert_reorder_barrier(&mut self, reorder: bool) {
        self.deferred_barrier = Some(reorder);
    }

    ///
    /// Sets the matrix stamped onto ops recorded from here on
    ///
    pub fn set_local_matrix(&mut self, matrix: Matrix4) {
        self.local_matrix = matrix;
    }

    ///
    /// Sets the record-time clip stamped onto ops recorded from here on
    ///
    pub fn set_local_clip(&mut self, clip: Option<Rect>) {
        self.local_clip = clip;
    }

    ///
    /// Appends an op, opening a new chunk first if a barrier is pending
    ///
    pub fn record(&mut self, mut op: RecordedOp) -> usize {
        op.local_matrix = self.local_matrix;
        op.local_clip   = self.local_clip;

        let insert_index = self.display_list.ops.len();
        self.display_list.ops.push(op);

        if let Some(reorder) = self.deferred_barrier.take() {
            // op is first in a new chunk
            let next_child = self.display_list.children.len();
            self.display_list.chunks.push(Chunk {
                begin_op:           insert_index,
                end_op:             insert_index + 1,
                begin_child:        next_child,
                end_child:          next_child,
                reorder_children:   reorder,
            });
        } else {
            self.display_list.chunks.last_mut().unwrap().end_op = insert_index + 1;
        }

        insert_index
    }

    pub fn draw_rect(&mut self, left: f32, top: f32, right: f32, bottom: f32, paint: &Paint) {
        self.record(RecordedOp::new(
            Rect::new(left, top, right, bottom), paint.clone(), OpKind::Rect));
    }

    pub fn draw_oval(&mut self, bounds: Rect, paint: &Paint) {
        self.record(RecordedOp::new(bounds, paint.clone(), OpKind::Oval));
    }

    pub fn draw_round_rect(&mut self, bounds: Rect, rx: f32, ry: f32, paint: &Paint) {
        self.record(RecordedOp::new(bounds, paint.clone(), OpKind::RoundRect { rx, ry }));
    }

    pub fn draw_arc(&mut self, bounds: Rect, start_angle: f32, sweep_angle: f32,
        use_center: bool, paint: &Paint)
    {
        self.record(RecordedOp::new(bounds, paint.clone(),
            OpKind::Arc { start_angle, sweep_angle, use_center }));
    }

    pub fn draw_path(&mut self, path: Arc<Path>, paint: &Paint) {
        self.record(RecordedOp::new(path.bounds(), paint.clone(), OpKind::Path { path }));
    }

    pub fn draw_lines(&mut self, points: Vec<(f32, f32)>, paint: &Paint) {
        let bounds = point_bounds(&points);
        self.record(RecordedOp::new(bounds, paint.clone(),
            OpKind::Lines { points: Arc::new(points) }));
    }

    pub fn draw_points(&mut self, points: Vec<(f32, f32)>, paint: &Paint) {
        let bounds = point_bounds(&points);
        self.record(RecordedOp::new(bounds, paint.clone(),
            OpKind::Points { points: Arc::new(points) }));
    }

    pub fn draw_bitmap(&mut self, bitmap: Arc<Bitmap>, left: f32, top: f32, paint: &Paint) {
        let bounds = Rect::new(left, top,
            left + bitmap.width as f32, top + bitmap.height as f32);
        self.record(RecordedOp::new(bounds, paint.clone(), OpKind::Bitmap { bitmap }));
    }

    pub fn draw_bitmap_rect(&mut self, bitmap: Arc<Bitmap>, src: Rect, dst: Rect, paint: &Paint) {
        self.record(RecordedOp::new(dst, paint.clone(), OpKind::BitmapRect { bitmap, src }));
    }

    pub fn draw_bitmap_mesh(&mut self, bitmap: Arc<Bitmap>, mesh_width: u32, mesh_height: u32,
        bounds: Rect, paint: &Paint)
    {
        self.record(RecordedOp::new(bounds, paint.clone(),
            OpKind::BitmapMesh { bitmap, mesh_width, mesh_height }));
    }

    pub fn draw_patch(&mut self, bitmap: Arc<Bitmap>, patch: Arc<Patch>, dst: Rect, paint: &Paint) {
        self.record(RecordedOp::new(dst, paint.clone(), OpKind::Patch { bitmap, patch }));
    }

    pub fn draw_simple_rects(&mut self, rects: Vec<Rect>, paint: &Paint) {
        let mut bounds = Rect::empty();
        for rect in &rects {
            bounds.unite(rect);
        }
        self.record(RecordedOp::new(bounds, paint.clone(), OpKind::SimpleRects { rects }));
    }

    pub fn draw_text(&mut self, text: Arc<TextRun>, bounds: Rect, paint: &Paint) {
        self.record(RecordedOp::new(bounds, paint.clone(), OpKind::Text { text }));
    }

    pub fn draw_text_on_path(&mut self, text: Arc<TextRun>, path: Arc<Path>, paint: &Paint) {
        self.record(RecordedOp::new(path.bounds(), paint.clone(),
            OpKind::TextOnPath { text, path }));
    }

    pub fn draw_functor(&mut self, functor: u64, bounds: Rect) {
        self.record(RecordedOp::new(bounds, Paint::default(), OpKind::Functor { functor }));
    }

    pub fn draw_texture_layer(&mut self, buffer: OffscreenBufferId, bounds: Rect) {
        self.record(RecordedOp::new(bounds, Paint::default(), OpKind::TextureLayer { buffer }));
    }

    pub fn draw_circle_props(&mut self, x: Arc<PropertyCell>, y: Arc<PropertyCell>,
        radius: Arc<PropertyCell>, paint: &Paint)
    {
        // Bounds resolve at defer time from the cells, so none are recorded
        self.record(RecordedOp::new(Rect::empty(), paint.clone(),
            OpKind::CircleProps { x, y, radius }));
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_round_rect_props(&mut self, left: Arc<PropertyCell>, top: Arc<PropertyCell>,
        right: Arc<PropertyCell>, bottom: Arc<PropertyCell>,
        rx: Arc<PropertyCell>, ry: Arc<PropertyCell>, paint: &Paint)
    {
        self.record(RecordedOp::new(Rect::empty(), paint.clone(),
            OpKind::RoundRectProps { left, top, right, bottom, rx, ry }));
    }

    ///
    /// Records a child node draw, registering it in the current chunk's child
    /// range and, for projection receivers, as the list's receive point
    ///
    pub fn draw_render_node(&mut self, store: &NodeStore, node: NodeId) {
        let properties = &store.node(node).properties;
        let bounds = Rect::from_size(properties.width, properties.height);
        let is_receiver = properties.projection_receiver;

        let op_index = self.record(RecordedOp::new(bounds, Paint::default(),
            OpKind::RenderNode { node }));

        let child_index = self.display_list.children.len();
        self.display_list.children.push(op_index);
        self.display_list.chunks.last_mut().unwrap().end_child = child_index + 1;

        if is_receiver {
            self.display_list.projection_receive_index = Some(op_index);
        }
    }

    ///
    /// Opens a clipped save-layer; must be balanced by `end_layer`
    ///
    /// Until the balancing `end_layer`, recorded coordinates shift into the
    /// layer's space, with (0, 0) at the layer bounds' top-left.
    ///
    pub fn begin_layer(&mut self, bounds: Rect, paint: &Paint) {
        self.record(RecordedOp::new(bounds, paint.clone(), OpKind::BeginLayer));

        // The begin op's stamp carries the outer transform, so inside the
        // layer only the bounds offset applies
        self.layer_stack.push((self.local_matrix, self.local_clip));
        self.local_matrix = Matrix4::translation(-bounds.left, -bounds.top, 0.0);
        self.local_clip   = None;
    }

    pub fn end_layer(&mut self) {
        self.record(RecordedOp::new(Rect::empty(), Paint::default(), OpKind::EndLayer));

        if let Some((matrix, clip)) = self.layer_stack.pop() {
            self.local_matrix = matrix;
            self.local_clip   = clip;
        }
    }

    ///
    /// Opens an in-place (copy-out/copy-back) save-layer; must be balanced by
    /// `end_unclipped_layer`
    ///
    pub fn begin_unclipped_layer(&mut self, bounds: Rect) {
        self.record(RecordedOp::new(bounds, Paint::default(), OpKind::BeginUnclippedLayer));
    }

    pub fn end_unclipped_layer(&mut self) {
        self.record(RecordedOp::new(Rect::empty(), Paint::default(), OpKind::EndUnclippedLayer));
    }

    ///
    /// Completes the recording
    ///
    pub fn finish(self) -> DisplayList {
        self.display_list
    }
}

fn point_bounds(points: &[(f32, f32)]) -> Rect {
    if points.is_empty() {
        return Rect::empty();
    }

    let mut left   = f32::MAX;
    let mut top    = f32::MAX;
    let mut right  = f32::MIN;
    let mut bottom = f32::MIN;
    for &(x, y) in points {
        left   = f32::min(left, x);
        top    = f32::min(top, y);
        right  = f32::max(right, x);
        bottom = f32::max(bottom, y);
    }

    Rect::new(left, top, right, bottom)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ops_share_a_chunk_until_a_barrier() {
        let mut recorder = DisplayListRecorder::new();
        recorder.draw_rect(0.0, 0.0, 10.0, 10.0, &Paint::default());
        recorder.draw_rect(10.0, 0.0, 20.0, 10.0, &Paint::default());
        recorder.insert_reorder_barrier(true);
        recorder.draw_rect(20.0, 0.0, 30.0, 10.0, &Paint::default());

        let list = recorder.finish();
        assert!(list.chunks.len() == 2);
        assert!(list.chunks[0].begin_op == 0 && list.chunks[0].end_op == 2);
        assert!(!list.chunks[0].reorder_children);
        assert!(list.chunks[1].begin_op == 2 && list.chunks[1].end_op == 3);
        assert!(list.chunks[1].reorder_children);
    }

    #[test]
    fn render_node_updates_child_range() {
        let mut store = NodeStore::new();
        let child = store.add(RenderNode::new(RenderProperties {
            width: 50.0, height: 50.0, ..RenderProperties::default()
        }, None));

        let mut recorder = DisplayListRecorder::new();
        recorder.draw_rect(0.0, 0.0, 10.0, 10.0, &Paint::default());
        recorder.draw_render_node(&store, child);

        let list = recorder.finish();
        assert!(list.children == vec![1]);
        assert!(list.chunks[0].begin_child == 0 && list.chunks[0].end_child == 1);
        assert!(matches!(list.ops[1].kind, OpKind::RenderNode { .. }));
        assert!(list.ops[1].unmapped_bounds == Rect::new(0.0, 0.0, 50.0, 50.0));
    }

    #[test]
    fn line_bounds_cover_the_points() {
        let mut recorder = DisplayListRecorder::new();
        recorder.draw_lines(vec![(10.0, 40.0), (90.0, 35.0)], &Paint::default());

        let list = recorder.finish();
        assert!(list.ops[0].unmapped_bounds == Rect::new(10.0, 35.0, 90.0, 40.0));
    }

    #[test]
    fn projection_receiver_is_marked() {
        let mut store = NodeStore::new();
        let background = store.add(RenderNode::new(RenderProperties {
            width: 100.0, height: 100.0, projection_receiver: true,
            ..RenderProperties::default()
        }, None));

        let mut recorder = DisplayListRecorder::new();
        recorder.draw_render_node(&store, background);

        let list = recorder.finish();
        assert!(list.projection_receive_index == Some(0));
    }

    #[test]
    fn save_layer_shifts_recording_into_layer_space() {
        let mut recorder = DisplayListRecorder::new();
        recorder.begin_layer(Rect::new(20.0, 20.0, 60.0, 60.0), &Paint::default());
        recorder.draw_rect(20.0, 20.0, 60.0, 60.0, &Paint::default());
        recorder.end_layer();
        recorder.draw_rect(0.0, 0.0, 10.0, 10.0, &Paint::default());

        let list = recorder.finish();

        // Inside the layer, ops carry the bounds offset; outside they don't
        assert!(list.ops[0].local_matrix == Matrix4::identity());
        assert!(list.ops[1].local_matrix == Matrix4::translation(-20.0, -20.0, 0.0));
        assert!(list.ops[3].local_matrix == Matrix4::identity());
    }

    #[test]
    fn local_state_is_stamped_onto_ops() {
        let mut recorder = DisplayListRecorder::new();
        let mut matrix = Matrix4::identity();
        matrix.translate(5.0, 5.0);

        recorder.set_local_matrix(matrix);
        recorder.set_local_clip(Some(Rect::new(0.0, 0.0, 40.0, 40.0)));
        recorder.draw_rect(0.0, 0.0, 10.0, 10.0, &Paint::default());

        let list = recorder.finish();
        assert!(list.ops[0].local_matrix == matrix);
        assert!(list.ops[0].local_clip == Some(Rect::new(0.0, 0.0, 40.0, 40.0)));
    }
}
