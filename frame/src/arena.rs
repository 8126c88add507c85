use super::baked_state::*;

use ember_canvas as canvas;
use ember_canvas::{OffscreenBufferId, RecordedOp};

///
/// Handle referencing a baked op state in a frame arena
///
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BakedHandle(pub u32);

///
/// Handle referencing an engine-resolved op in a frame arena
///
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ResolvedOpHandle(pub u32);

///
/// Handle referencing an unclipped save-layer's buffer cell
///
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LayerCellHandle(pub u32);

///
/// Refers to the recorded op behind a baked state: either borrowed from a
/// display list or resolved into the arena during the build
///
#[derive(Clone, Copy, Debug)]
pub enum OpRef<'a> {
    Recorded(&'a RecordedOp),
    Resolved(ResolvedOpHandle),
}

///
/// Frame-scoped storage for everything the deferral pass allocates
///
/// Allocation is monotonic: handles stay valid until the arena is dropped
/// with the rest of the frame, which is what lets baked states, resolved ops
/// and layer cells outlive the traversal scope that created them. Single
/// threaded, like the build itself.
///
#[derive(Default)]
pub struct FrameArena<'a> {
    baked_states: Vec<BakedOpState<'a>>,
    resolved_ops: Vec<RecordedOp>,
    layer_cells: Vec<Option<OffscreenBufferId>>,
}

impl<'a> FrameArena<'a> {
    pub fn new() -> FrameArena<'a> {
        FrameArena {
            baked_states: vec![],
            resolved_ops: vec![],
            layer_cells:  vec![],
        }
    }

    ///
    /// Stores a baked state, returning its handle
    ///
    pub fn create_baked(&mut self, state: BakedOpState<'a>) -> BakedHandle {
        let handle = BakedHandle(self.baked_states.len() as u32);
        self.baked_states.push(state);
        handle
    }

    #[inline]
    pub fn baked(&self, BakedHandle(handle): BakedHandle) -> &BakedOpState<'a> {
        &self.baked_states[handle as usize]
    }

    ///
    /// Stores an op the engine resolved during the build (property-indirect
    /// resolutions, shadows, layer draws, copies, clears)
    ///
    pub fn create_resolved_op(&mut self, op: RecordedOp) -> ResolvedOpHandle {
        let handle = ResolvedOpHandle(self.resolved_ops.len() as u32);
        self.resolved_ops.push(op);
        handle
    }

    #[inline]
    pub fn resolved_op(&self, ResolvedOpHandle(handle): ResolvedOpHandle) -> &RecordedOp {
        &self.resolved_ops[handle as usize]
    }

    ///
    /// Resolves an op reference to the recorded op it names
    ///
    pub fn op<'s>(&'s self, op_ref: OpRef<'a>) -> &'s RecordedOp
    where
        'a: 's,
    {
        match op_ref {
            OpRef::Recorded(op)     => op,
            OpRef::Resolved(handle) => self.resolved_op(handle),
        }
    }

    ///
    /// Allocates an empty buffer cell for an unclipped save-layer; the
    /// renderer fills it when the copy-to-layer op executes
    ///
    pub fn create_layer_cell(&mut self) -> LayerCellHandle {
        let handle = LayerCellHandle(self.layer_cells.len() as u32);
        self.layer_cells.push(None);
        handle
    }

    pub fn layer_cell(&self, LayerCellHandle(handle): LayerCellHandle) -> Option<OffscreenBufferId> {
        self.layer_cells[handle as usize]
    }

    pub fn set_layer_cell(&mut self, LayerCellHandle(handle): LayerCellHandle,
        buffer: OffscreenBufferId)
    {
        self.layer_cells[handle as usize] = Some(buffer);
    }

    ///
    /// The paint of the op behind a baked state
    ///
    pub fn paint_for(&self, handle: BakedHandle) -> &canvas::Paint {
        let op_ref = self.baked(handle).op;
        &self.op(op_ref).paint
    }
}
