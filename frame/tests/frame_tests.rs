use ember_canvas::*;
use ember_frame::*;

use std::sync::Arc;

const VIEWPORT: u32 = 100;

fn viewport_clip() -> Rect {
    Rect::new(0.0, 0.0, VIEWPORT as f32, VIEWPORT as f32)
}

fn light() -> Vector3 {
    Vector3::new(50.0, 0.0, 600.0)
}

fn full_screen_node(store: &mut NodeStore, display_list: DisplayList) -> NodeId {
    store.add(RenderNode::new(RenderProperties {
        width:  VIEWPORT as f32,
        height: VIEWPORT as f32,
        ..RenderProperties::default()
    }, Some(display_list)))
}

fn build<'a>(store: &'a NodeStore, roots: &[NodeId]) -> FrameBuilder<'a> {
    FrameBuilder::new(&LayerUpdateQueue::new(), viewport_clip(), VIEWPORT, VIEWPORT,
        store, roots, light())
}

///
/// Every op in a layer, flattened in batch order
///
fn flattened_ops<'a>(frame: &'a FrameBuilder<'a>, layer_index: usize)
    -> Vec<(&'a BakedOpState<'a>, &'a RecordedOp)>
{
    frame.layer_builders()[layer_index].batches().iter()
        .flat_map(|batch| batch.ops.iter())
        .map(|&handle| {
            let baked = frame.arena().baked(handle);
            (baked, frame.arena().op(baked.op))
        })
        .collect()
}

#[test]
fn empty_frame_has_one_empty_primary_layer() {
    let store = NodeStore::new();
    let frame = build(&store, &[]);

    assert!(frame.layer_builders().len() == 1);
    assert!(frame.layer_builders()[0].is_empty());
    assert!(frame.save_stack_depth() == 1);
    assert!(frame.current_layer_index() == 0);
}

#[test]
fn rejected_node_contributes_nothing() {
    let mut store = NodeStore::new();

    let mut recorder = DisplayListRecorder::new();
    recorder.draw_rect(0.0, 0.0, 50.0, 50.0, &Paint::default());

    let node = store.add(RenderNode::new(RenderProperties {
        width:  VIEWPORT as f32,
        height: VIEWPORT as f32,
        alpha:  0.0,
        ..RenderProperties::default()
    }, Some(recorder.finish())));

    let frame = build(&store, &[node]);
    assert!(frame.layer_builders()[0].is_empty());
}

#[test]
fn rejected_child_contributes_nothing_at_depth() {
    let mut store = NodeStore::new();

    let mut child_recorder = DisplayListRecorder::new();
    child_recorder.draw_rect(0.0, 0.0, 50.0, 50.0, &Paint::default());
    let child = store.add(RenderNode::new(RenderProperties {
        width: 50.0, height: 50.0, alpha: 0.0,
        ..RenderProperties::default()
    }, Some(child_recorder.finish())));

    let mut recorder = DisplayListRecorder::new();
    recorder.draw_render_node(&store, child);
    let root = full_screen_node(&mut store, recorder.finish());

    let frame = build(&store, &[root]);
    assert!(frame.layer_builders()[0].is_empty());
}

// Scenario S1: two overlapping same-paint rects share one batch, in order
#[test]
fn overlapping_rects_share_a_batch_in_declaration_order() {
    let mut store = NodeStore::new();

    let mut recorder = DisplayListRecorder::new();
    recorder.draw_rect(0.0, 0.0, 50.0, 50.0, &Paint::default());
    recorder.draw_rect(25.0, 25.0, 75.0, 75.0, &Paint::default());
    let root = full_screen_node(&mut store, recorder.finish());

    let frame = build(&store, &[root]);

    let batches = frame.layer_builders()[0].batches();
    assert!(batches.len() == 1);
    assert!(batches[0].batch_id == OpBatchType::Vertices);
    assert!(batches[0].ops.len() == 2);

    let ops = flattened_ops(&frame, 0);
    assert!(ops[0].1.unmapped_bounds == Rect::new(0.0, 0.0, 50.0, 50.0));
    assert!(ops[1].1.unmapped_bounds == Rect::new(25.0, 25.0, 75.0, 75.0));
}

// Scenario S2: an antialiased second op overlaps, so a new batch starts
#[test]
fn differing_batch_kind_with_overlap_preserves_order() {
    let mut store = NodeStore::new();

    let aa_paint = Paint { antialias: true, ..Paint::default() };

    let mut recorder = DisplayListRecorder::new();
    recorder.draw_rect(0.0, 0.0, 50.0, 50.0, &Paint::default());
    recorder.draw_rect(25.0, 25.0, 75.0, 75.0, &aa_paint);
    let root = full_screen_node(&mut store, recorder.finish());

    let frame = build(&store, &[root]);

    let batches = frame.layer_builders()[0].batches();
    assert!(batches.len() == 2);
    assert!(batches[0].batch_id == OpBatchType::Vertices);
    assert!(batches[1].batch_id == OpBatchType::AlphaVertices);
}

// Scenario S3: bitmaps with generation ids A, A, B coalesce the two A draws
#[test]
fn bitmaps_merge_by_generation_id() {
    let mut store = NodeStore::new();

    let bitmap_a = Arc::new(Bitmap::new(10, 10, ColorType::Rgba8888));
    let bitmap_b = Arc::new(Bitmap::new(10, 10, ColorType::Rgba8888));

    let mut recorder = DisplayListRecorder::new();
    recorder.draw_bitmap(Arc::clone(&bitmap_a), 0.0, 0.0, &Paint::default());
    recorder.draw_bitmap(Arc::clone(&bitmap_a), 20.0, 0.0, &Paint::default());
    recorder.draw_bitmap(Arc::clone(&bitmap_b), 40.0, 0.0, &Paint::default());
    let root = full_screen_node(&mut store, recorder.finish());

    let frame = build(&store, &[root]);

    let batches = frame.layer_builders()[0].batches();
    assert!(batches.len() == 2);
    assert!(batches[0].batch_id == OpBatchType::Bitmap);
    assert!(batches[0].ops.len() == 2);
    assert!(batches[0].merge_id == Some(bitmap_a.generation_id()));
    assert!(batches[0].bounds == Rect::new(0.0, 0.0, 30.0, 10.0));
    assert!(batches[1].ops.len() == 1);
    assert!(batches[1].merge_id == Some(bitmap_b.generation_id()));
}

#[test]
fn a8_bitmaps_do_not_merge() {
    let mut store = NodeStore::new();

    let mask = Arc::new(Bitmap::new(10, 10, ColorType::Alpha8));

    let mut recorder = DisplayListRecorder::new();
    recorder.draw_bitmap(Arc::clone(&mask), 0.0, 0.0, &Paint::default());
    recorder.draw_bitmap(Arc::clone(&mask), 20.0, 0.0, &Paint::default());
    let root = full_screen_node(&mut store, recorder.finish());

    let frame = build(&store, &[root]);

    // Unmergeable ops of the same kind still coalesce into one batch, but
    // with no merge id
    let batches = frame.layer_builders()[0].batches();
    assert!(batches.len() == 1);
    assert!(batches[0].merge_id.is_none());
}

fn child_with_rect(store: &mut NodeStore, left: f32, top: f32, size: f32, z: f32,
    with_outline: bool) -> NodeId
{
    let mut recorder = DisplayListRecorder::new();
    recorder.draw_rect(0.0, 0.0, size, size, &Paint::default());

    let outline = if with_outline {
        Outline::rounded(Rect::from_size(size, size), 0.0, 1.0)
    } else {
        Outline::default()
    };

    store.add(RenderNode::new(RenderProperties {
        left,
        top,
        width: size,
        height: size,
        z,
        outline,
        ..RenderProperties::default()
    }, Some(recorder.finish())))
}

// Scenario S4: negative-z children draw before the ops, without shadows;
// positive-z children draw after, each under its shadow
#[test]
fn z_children_reorder_with_shadows() {
    let mut store = NodeStore::new();

    let below = child_with_rect(&mut store, 10.0, 10.0, 50.0, -3.0, true);
    let above = child_with_rect(&mut store, 20.0, 20.0, 50.0, 5.0, true);

    let mut recorder = DisplayListRecorder::new();
    recorder.insert_reorder_barrier(true);
    recorder.draw_render_node(&store, above);
    recorder.draw_render_node(&store, below);
    let root = full_screen_node(&mut store, recorder.finish());

    let frame = build(&store, &[root]);

    // The below child draws first despite being declared second; the above
    // child's shadow lands between the two bodies
    let batches = frame.layer_builders()[0].batches();
    let kinds: Vec<OpBatchType> = batches.iter().map(|batch| batch.batch_id).collect();
    assert!(kinds == vec![OpBatchType::Vertices, OpBatchType::Shadow, OpBatchType::Vertices]);

    let ops = flattened_ops(&frame, 0);
    assert!(ops[0].0.computed.clipped_bounds == Rect::new(10.0, 10.0, 60.0, 60.0));
    assert!(matches!(ops[1].1.kind, OpKind::Shadow { .. }));
    assert!(ops[2].0.computed.clipped_bounds == Rect::new(20.0, 20.0, 70.0, 70.0));
}

// Scenario S5: casters within 0.1 in z share a shadow plane beneath both
#[test]
fn near_coplanar_casters_share_a_shadow_plane() {
    let mut store = NodeStore::new();

    let first  = child_with_rect(&mut store, 10.0, 10.0, 40.0, 2.0, true);
    let second = child_with_rect(&mut store, 30.0, 30.0, 40.0, 2.05, true);

    let mut recorder = DisplayListRecorder::new();
    recorder.insert_reorder_barrier(true);
    recorder.draw_render_node(&store, first);
    recorder.draw_render_node(&store, second);
    let root = full_screen_node(&mut store, recorder.finish());

    let frame = build(&store, &[root]);

    let ops = flattened_ops(&frame, 0);
    assert!(ops.len() == 4);
    assert!(matches!(ops[0].1.kind, OpKind::Shadow { .. }));
    assert!(matches!(ops[1].1.kind, OpKind::Shadow { .. }));
    assert!(matches!(ops[2].1.kind, OpKind::Rect));
    assert!(matches!(ops[3].1.kind, OpKind::Rect));

    // Both shadows sit in one Shadow batch ahead of the bodies
    let batches = frame.layer_builders()[0].batches();
    assert!(batches[0].batch_id == OpBatchType::Shadow);
    assert!(batches[0].ops.len() == 2);
}

// Invariant: children at equal z keep declaration order
#[test]
fn equal_z_children_draw_in_declaration_order() {
    let mut store = NodeStore::new();

    let first  = child_with_rect(&mut store, 0.0, 0.0, 20.0, 1.0, false);
    let second = child_with_rect(&mut store, 40.0, 0.0, 20.0, 1.0, false);

    let mut recorder = DisplayListRecorder::new();
    recorder.insert_reorder_barrier(true);
    recorder.draw_render_node(&store, first);
    recorder.draw_render_node(&store, second);
    let root = full_screen_node(&mut store, recorder.finish());

    let frame = build(&store, &[root]);

    let ops = flattened_ops(&frame, 0);
    assert!(ops.len() == 2);
    assert!(ops[0].0.computed.clipped_bounds == Rect::new(0.0, 0.0, 20.0, 20.0));
    assert!(ops[1].0.computed.clipped_bounds == Rect::new(40.0, 0.0, 60.0, 20.0));
}

#[test]
fn z_children_stay_in_order_without_a_reorder_barrier() {
    let mut store = NodeStore::new();

    let raised = child_with_rect(&mut store, 0.0, 0.0, 20.0, 5.0, false);
    let flat   = child_with_rect(&mut store, 40.0, 0.0, 20.0, 0.0, false);

    let mut recorder = DisplayListRecorder::new();
    recorder.draw_render_node(&store, raised);
    recorder.draw_render_node(&store, flat);
    let root = full_screen_node(&mut store, recorder.finish());

    let frame = build(&store, &[root]);

    // No reorder barrier, so the raised child draws in declaration order
    let ops = flattened_ops(&frame, 0);
    assert!(ops.len() == 2);
    assert!(ops[0].0.computed.clipped_bounds == Rect::new(0.0, 0.0, 20.0, 20.0));
}

// Scenario S6: unclipped save-layer emits copy-out, clear, content, copy-back
#[test]
fn unclipped_save_layer_copies_clears_and_restores() {
    let mut store = NodeStore::new();

    let mut recorder = DisplayListRecorder::new();
    recorder.begin_unclipped_layer(Rect::new(10.0, 10.0, 20.0, 20.0));
    recorder.draw_rect(12.0, 12.0, 18.0, 18.0, &Paint::default());
    recorder.end_unclipped_layer();
    let root = full_screen_node(&mut store, recorder.finish());

    let frame = build(&store, &[root]);

    assert!(frame.layer_builders().len() == 1);

    let ops = flattened_ops(&frame, 0);
    assert!(ops.len() == 4);

    let expected = Rect::new(10.0, 10.0, 20.0, 20.0);
    assert!(matches!(ops[0].1.kind, OpKind::CopyToLayer { .. }));
    assert!(ops[0].0.computed.clipped_bounds == expected);

    match &ops[1].1.kind {
        OpKind::SimpleRects { rects } => {
            assert!(rects.len() == 1);
            assert!(rects[0] == expected);
            assert!(ops[1].1.paint.blend_mode == BlendMode::Clear);
        }
        other => panic!("expected the flushed clear, found {:?}", other),
    }

    assert!(matches!(ops[2].1.kind, OpKind::Rect));
    assert!(matches!(ops[3].1.kind, OpKind::CopyFromLayer { .. }));

    let batches = frame.layer_builders()[0].batches();
    assert!(batches[0].batch_id == OpBatchType::CopyToLayer);
    assert!(batches[1].batch_id == OpBatchType::Vertices);
    assert!(batches[2].batch_id == OpBatchType::CopyFromLayer);
}

#[test]
#[should_panic]
fn unbalanced_end_unclipped_layer_is_fatal() {
    let mut store = NodeStore::new();

    let mut recorder = DisplayListRecorder::new();
    recorder.end_unclipped_layer();
    let root = full_screen_node(&mut store, recorder.finish());

    build(&store, &[root]);
}

// Mid-tree clipped save-layer: content builds off screen, then draws back
#[test]
fn clipped_save_layer_builds_off_screen() {
    let mut store = NodeStore::new();

    let mut recorder = DisplayListRecorder::new();
    recorder.begin_layer(Rect::new(20.0, 20.0, 60.0, 60.0), &Paint::with_alpha(0.5));
    recorder.draw_rect(20.0, 20.0, 60.0, 60.0, &Paint::default());
    recorder.end_layer();
    let root = full_screen_node(&mut store, recorder.finish());

    let frame = build(&store, &[root]);

    assert!(frame.layer_builders().len() == 2);
    assert!(frame.save_stack_depth() == 1);
    assert!(frame.current_layer_index() == 0);

    // The content landed in the save-layer's builder, shifted to its origin
    let layer_ops = flattened_ops(&frame, 1);
    assert!(layer_ops.len() == 1);
    assert!(layer_ops[0].0.computed.clipped_bounds == Rect::new(0.0, 0.0, 40.0, 40.0));

    // The primary layer draws the finished layer like a bitmap
    let primary_ops = flattened_ops(&frame, 0);
    assert!(primary_ops.len() == 1);
    match &primary_ops[0].1.kind {
        OpKind::Layer { source } => {
            assert!(*source == LayerSource::FinishedLayer(1));
        }
        other => panic!("expected a layer draw, found {:?}", other),
    }
    assert!(frame.layer_builders()[0].batches()[0].batch_id == OpBatchType::Bitmap);
}

// A node with alpha and overlapping rendering gets a temporary save-layer
#[test]
fn translucent_overlapping_node_uses_a_save_layer() {
    let mut store = NodeStore::new();

    let mut recorder = DisplayListRecorder::new();
    recorder.draw_rect(0.0, 0.0, 50.0, 50.0, &Paint::default());
    let node = store.add(RenderNode::new(RenderProperties {
        width:  50.0,
        height: 50.0,
        alpha:  0.5,
        ..RenderProperties::default()
    }, Some(recorder.finish())));

    let frame = build(&store, &[node]);

    assert!(frame.layer_builders().len() == 2);

    let primary_ops = flattened_ops(&frame, 0);
    assert!(primary_ops.len() == 1);
    assert!(matches!(primary_ops[0].1.kind, OpKind::Layer { .. }));
    assert!((primary_ops[0].1.paint.alpha() - 0.5).abs() < 0.01);
}

// Invariant: baked alpha is the product of ancestor alphas and the paint's
#[test]
fn alpha_chains_multiplicatively() {
    let mut store = NodeStore::new();

    let translucent_paint = Paint::fill(Rgba8([255, 0, 0, 128]));

    let mut recorder = DisplayListRecorder::new();
    recorder.draw_rect(0.0, 0.0, 50.0, 50.0, &translucent_paint);
    let node = store.add(RenderNode::new(RenderProperties {
        width:  50.0,
        height: 50.0,
        alpha:  0.5,
        has_overlapping_rendering: false,
        ..RenderProperties::default()
    }, Some(recorder.finish())));

    let frame = build(&store, &[node]);

    let ops = flattened_ops(&frame, 0);
    assert!(ops.len() == 1);
    assert!((ops[0].0.alpha - 0.5 * (128.0 / 255.0)).abs() < 0.001);
}

// Invariant: clipped bounds contract to every ancestor clip
#[test]
fn child_content_clips_to_node_bounds() {
    let mut store = NodeStore::new();

    let mut child_recorder = DisplayListRecorder::new();
    child_recorder.draw_rect(0.0, 0.0, 100.0, 100.0, &Paint::default());
    let child = store.add(RenderNode::new(RenderProperties {
        left:  10.0,
        top:   10.0,
        width: 20.0,
        height: 20.0,
        ..RenderProperties::default()
    }, Some(child_recorder.finish())));

    let mut recorder = DisplayListRecorder::new();
    recorder.draw_render_node(&store, child);
    let root = full_screen_node(&mut store, recorder.finish());

    let frame = build(&store, &[root]);

    let ops = flattened_ops(&frame, 0);
    assert!(ops.len() == 1);
    assert!(ops[0].0.computed.clipped_bounds == Rect::new(10.0, 10.0, 30.0, 30.0));
}

#[test]
fn nan_geometry_quick_rejects() {
    let mut store = NodeStore::new();

    let mut recorder = DisplayListRecorder::new();
    recorder.draw_rect(f32::NAN, 0.0, 50.0, 50.0, &Paint::default());
    let root = full_screen_node(&mut store, recorder.finish());

    let frame = build(&store, &[root]);
    assert!(frame.layer_builders()[0].is_empty());
}

// Invariant: N queued layer updates emit as builders N..1 in reverse
#[test]
fn layer_updates_defer_in_reverse_queue_order() {
    let mut store = NodeStore::new();

    let mut layer_nodes = vec![];
    for i in 0..2 {
        let mut recorder = DisplayListRecorder::new();
        recorder.draw_rect(0.0, 0.0, 40.0, 40.0, &Paint::default());

        let node = store.add(RenderNode::new(RenderProperties {
            width:  40.0,
            height: 40.0,
            layer_type: LayerType::RenderLayer,
            ..RenderProperties::default()
        }, Some(recorder.finish())));
        store.node_mut(node).layer = Some(NodeLayer {
            buffer: OffscreenBufferId(i as u64 + 1),
            inverse_transform_in_window: Matrix4::identity(),
        });
        layer_nodes.push(node);
    }

    let mut queue = LayerUpdateQueue::new();
    queue.enqueue(layer_nodes[0], Rect::new(0.0, 0.0, 40.0, 40.0));
    queue.enqueue(layer_nodes[1], Rect::new(0.0, 0.0, 40.0, 40.0));

    let frame = FrameBuilder::new(&queue, viewport_clip(), VIEWPORT, VIEWPORT,
        &store, &[], light());

    // Builder index j corresponds to entry N - j, so reading the builders in
    // reverse executes the updates in queue order
    assert!(frame.layer_builders().len() == 3);
    assert!(frame.layer_builders()[1].render_node == Some(layer_nodes[1]));
    assert!(frame.layer_builders()[2].render_node == Some(layer_nodes[0]));

    let render_order: Vec<Option<NodeId>> = frame.layers_in_render_order()
        .map(|layer| layer.render_node)
        .collect();
    assert!(render_order == vec![Some(layer_nodes[0]), Some(layer_nodes[1]), None]);

    // Both layers actually hold their content
    assert!(!frame.layer_builders()[1].is_empty());
    assert!(!frame.layer_builders()[2].is_empty());
    assert!(frame.layer_builders()[0].is_empty());
}

// A node holding a persistent layer draws through its buffer
#[test]
fn hw_layer_node_draws_its_buffer() {
    let mut store = NodeStore::new();

    let mut recorder = DisplayListRecorder::new();
    recorder.draw_rect(0.0, 0.0, 40.0, 40.0, &Paint::default());
    let layer_node = store.add(RenderNode::new(RenderProperties {
        width:  40.0,
        height: 40.0,
        layer_type: LayerType::RenderLayer,
        ..RenderProperties::default()
    }, Some(recorder.finish())));
    store.node_mut(layer_node).layer = Some(NodeLayer {
        buffer: OffscreenBufferId(7),
        inverse_transform_in_window: Matrix4::identity(),
    });

    let frame = build(&store, &[layer_node]);

    let ops = flattened_ops(&frame, 0);
    assert!(ops.len() == 1);
    match &ops[0].1.kind {
        OpKind::Layer { source } => {
            assert!(*source == LayerSource::NodeBuffer(OffscreenBufferId(7)));
        }
        other => panic!("expected a layer draw, found {:?}", other),
    }
}

// Projected children draw at the receiver under its translation, masked to
// the receiver's outline
#[test]
fn projected_children_follow_the_background() {
    let mut store = NodeStore::new();

    let mut background_recorder = DisplayListRecorder::new();
    background_recorder.draw_rect(0.0, 0.0, 40.0, 40.0, &Paint::default());
    let background = store.add(RenderNode::new(RenderProperties {
        width:  40.0,
        height: 40.0,
        translation_x: 5.0,
        transform_matrix: Some(Matrix4::translation(5.0, 0.0, 0.0)),
        projection_receiver: true,
        ..RenderProperties::default()
    }, Some(background_recorder.finish())));

    let mut ripple_recorder = DisplayListRecorder::new();
    ripple_recorder.draw_rect(0.0, 0.0, 10.0, 10.0, &Paint::default());
    let ripple = store.add(RenderNode::new(RenderProperties {
        width:  10.0,
        height: 10.0,
        project_backwards: true,
        ..RenderProperties::default()
    }, Some(ripple_recorder.finish())));

    let mut recorder = DisplayListRecorder::new();
    recorder.draw_render_node(&store, background);
    recorder.draw_render_node(&store, ripple);
    let root = full_screen_node(&mut store, recorder.finish());
    store.node_mut(root).projected_nodes.push(ProjectedChild {
        node: ripple,
        local_matrix: Matrix4::identity(),
        local_clip: None,
        transform_from_compositing_ancestor: Matrix4::identity(),
    });

    let frame = build(&store, &[root]);

    let ops = flattened_ops(&frame, 0);
    assert!(ops.len() == 2);

    // The background itself, shifted by its translation
    assert!(ops[0].0.computed.clipped_bounds == Rect::new(5.0, 0.0, 45.0, 40.0));

    // The projected ripple draws once, under the background's translation,
    // not at its in-order position
    assert!(ops[1].0.computed.clipped_bounds == Rect::new(5.0, 0.0, 15.0, 10.0));
}

// Stacks balance after every construction, whatever the content
#[test]
fn stacks_balance_after_construction() {
    let mut store = NodeStore::new();

    let child = child_with_rect(&mut store, 10.0, 10.0, 30.0, 2.0, true);

    let mut recorder = DisplayListRecorder::new();
    recorder.insert_reorder_barrier(true);
    recorder.begin_layer(Rect::new(0.0, 0.0, 50.0, 50.0), &Paint::with_alpha(0.8));
    recorder.draw_rect(0.0, 0.0, 50.0, 50.0, &Paint::default());
    recorder.end_layer();
    recorder.draw_render_node(&store, child);
    let root = full_screen_node(&mut store, recorder.finish());

    let frame = build(&store, &[root]);

    assert!(frame.save_stack_depth() == 1);
    assert!(frame.current_layer_index() == 0);
    assert!(!frame.layer_builders()[0].is_empty());
}
