use super::bitmap::*;
use super::geometry::*;
use super::layer_queue::*;
use super::matrix::*;
use super::paint::*;
use super::path::*;
use super::render_node::*;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

///
/// A mutable float cell shared between an animator and a recorded op
///
/// Property-indirect ops read these at defer time, so a display list can be
/// recorded once and animated without re-recording.
///
#[derive(Debug, Default)]
pub struct PropertyCell {
    bits: AtomicU32,
}

impl PropertyCell {
    pub fn new(value: f32) -> PropertyCell {
        PropertyCell { bits: AtomicU32::new(value.to_bits()) }
    }

    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

///
/// A positioned glyph run
///
#[derive(Clone, Debug)]
pub struct TextRun {
    pub glyphs: Vec<u16>,
    pub positions: Vec<(f32, f32)>,
}

///
/// Where a layer-draw op sources its pixels from
///
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LayerSource {
    /// A render node's persistent off-screen buffer
    NodeBuffer(OffscreenBufferId),

    /// A layer builder finished earlier in this frame, by builder index
    FinishedLayer(usize),
}

///
/// The concrete kind of a recorded op
///
/// The first group can appear in recorded display lists; the variants at the
/// end are only ever allocated by the deferral engine while a frame is built
/// (resolved property ops, shadows, layer draws and unclipped-layer copies).
///
#[derive(Clone, Debug)]
pub enum OpKind {
    Rect,
    Oval,
    RoundRect { rx: f32, ry: f32 },
    Arc { start_angle: f32, sweep_angle: f32, use_center: bool },
    Path { path: Arc<Path> },
    Lines { points: Arc<Vec<(f32, f32)>> },
    Points { points: Arc<Vec<(f32, f32)>> },
    Bitmap { bitmap: Arc<Bitmap> },
    BitmapMesh { bitmap: Arc<Bitmap>, mesh_width: u32, mesh_height: u32 },
    BitmapRect { bitmap: Arc<Bitmap>, src: Rect },
    Patch { bitmap: Arc<Bitmap>, patch: Arc<Patch> },
    SimpleRects { rects: Vec<Rect> },
    Text { text: Arc<TextRun> },
    TextOnPath { text: Arc<TextRun>, path: Arc<Path> },
    Functor { functor: u64 },
    TextureLayer { buffer: OffscreenBufferId },
    RenderNode { node: NodeId },
    BeginLayer,
    EndLayer,
    BeginUnclippedLayer,
    EndUnclippedLayer,
    CircleProps { x: Arc<PropertyCell>, y: Arc<PropertyCell>, radius: Arc<PropertyCell> },
    RoundRectProps {
        left: Arc<PropertyCell>,
        top: Arc<PropertyCell>,
        right: Arc<PropertyCell>,
        bottom: Arc<PropertyCell>,
        rx: Arc<PropertyCell>,
        ry: Arc<PropertyCell>,
    },

    // Engine-resolved kinds (never recorded directly)
    Shadow { caster_path: Arc<Path>, caster_alpha: f32, caster_z: f32, light_center: Vector3 },
    Layer { source: LayerSource },
    CopyToLayer { cell: usize },
    CopyFromLayer { cell: usize },
}

///
/// A single recorded drawing operation
///
/// Bounds are in record space ("unmapped"); the local matrix and clip move
/// them into the recording canvas's space when the op is baked.
///
#[derive(Clone, Debug)]
pub struct RecordedOp {
    pub unmapped_bounds: Rect,
    pub local_matrix: Matrix4,
    pub local_clip: Option<Rect>,
    pub paint: Paint,
    pub kind: OpKind,
}

impl RecordedOp {
    pub fn new(unmapped_bounds: Rect, paint: Paint, kind: OpKind) -> RecordedOp {
        RecordedOp {
            unmapped_bounds,
            local_matrix: Matrix4::identity(),
            local_clip: None,
            paint,
            kind,
        }
    }
}

///
/// A run of ops and child references recorded between two reorder barriers
///
#[derive(Clone, Copy, Debug)]
pub struct Chunk {
    pub begin_op: usize,
    pub end_op: usize,
    pub begin_child: usize,
    pub end_child: usize,

    /// True if children in this chunk may be drawn in z order rather than
    /// declaration order
    pub reorder_children: bool,
}

///
/// An ordered recording of drawing operations, partitioned into chunks
///
#[derive(Clone, Debug, Default)]
pub struct DisplayList {
    pub ops: Vec<RecordedOp>,

    /// Indices into `ops` of the render-node ops, in declaration order
    pub children: Vec<usize>,

    pub chunks: Vec<Chunk>,

    /// Index into `ops` of the op that receives projected descendants
    pub projection_receive_index: Option<usize>,
}

impl DisplayList {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
