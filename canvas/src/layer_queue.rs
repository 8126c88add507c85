use super::geometry::*;
use super::render_node::*;

///
/// Handle referencing an off-screen pixel buffer owned by the renderer
///
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct OffscreenBufferId(pub u64);

///
/// A render-layer node whose content must be re-rendered this frame
///
#[derive(Clone, Copy, Debug)]
pub struct LayerUpdateEntry {
    pub node: NodeId,

    /// The region of the layer that needs repainting
    pub damage: Rect,
}

///
/// Ordered set of off-screen layers to bring up to date before the frame draws
///
#[derive(Clone, Debug, Default)]
pub struct LayerUpdateQueue {
    entries: Vec<LayerUpdateEntry>,
}

impl LayerUpdateQueue {
    pub fn new() -> LayerUpdateQueue {
        LayerUpdateQueue::default()
    }

    ///
    /// Queues a damaged layer node (later entries render later)
    ///
    pub fn enqueue(&mut self, node: NodeId, damage: Rect) {
        self.entries.push(LayerUpdateEntry { node, damage });
    }

    #[inline]
    pub fn entries(&self) -> &[LayerUpdateEntry] {
        &self.entries
    }
}
