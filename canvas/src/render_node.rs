use super::display_list::*;
use super::geometry::*;
use super::layer_queue::*;
use super::matrix::*;
use super::path::*;

use bitflags::bitflags;

use std::sync::Arc;

bitflags! {
    ///
    /// Which clips a node's properties request
    ///
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct ClippingFlags: u32 {
        /// Clip content to the node's own (0, 0, width, height) bounds
        const CLIP_TO_BOUNDS = 1 << 0;

        /// Clip content to an explicitly set clip rect
        const CLIP_TO_CLIP_BOUNDS = 1 << 1;
    }
}

///
/// How a node's content is composited
///
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LayerType {
    /// Drawn directly into the parent's render target
    #[default]
    None,

    /// Rasterized by the host framework before recording; no engine impact
    Software,

    /// Drawn through a persistent off-screen buffer
    RenderLayer,
}

///
/// The silhouette a node presents for clipping and shadow casting
///
#[derive(Clone, Debug, Default)]
pub struct Outline {
    pub path: Option<Arc<Path>>,
    pub bounds: Rect,
    pub radius: f32,
    pub alpha: f32,
    pub should_clip: bool,
}

impl Outline {
    pub fn rounded(bounds: Rect, radius: f32, alpha: f32) -> Outline {
        Outline {
            path:        Some(Arc::new(Path::from_rect(bounds))),
            bounds,
            radius,
            alpha,
            should_clip: false,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        match &self.path {
            Some(path)  => path.is_empty(),
            None        => true,
        }
    }

    ///
    /// True if the node's content should be masked to this outline
    ///
    #[inline]
    pub fn will_clip(&self) -> bool {
        self.should_clip && !self.is_empty()
    }
}

///
/// A circular reveal animation's clip
///
#[derive(Clone, Copy, Debug, Default)]
pub struct RevealClip {
    pub enabled: bool,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl RevealClip {
    #[inline]
    pub fn will_clip(&self) -> bool {
        self.enabled
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x - self.radius, self.y - self.radius,
            self.x + self.radius, self.y + self.radius)
    }

    pub fn path(&self) -> Option<Path> {
        if self.enabled {
            Some(Path::circle(self.x, self.y, self.radius))
        } else {
            None
        }
    }
}

///
/// The animatable properties of a render node
///
/// These are set by the host framework and are stable for the duration of one
/// frame build.
///
#[derive(Clone, Debug)]
pub struct RenderProperties {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,

    pub translation_x: f32,
    pub translation_y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub alpha: f32,
    pub has_overlapping_rendering: bool,

    /// Fixed placement transform (wins over the animation matrix)
    pub static_matrix: Option<Matrix4>,

    /// Transform driven by a running animation
    pub animation_matrix: Option<Matrix4>,

    /// Transform derived from the translation/rotation/scale properties
    pub transform_matrix: Option<Matrix4>,

    pub clipping_flags: ClippingFlags,

    /// The explicit clip rect used with CLIP_TO_CLIP_BOUNDS
    pub clip_bounds: Rect,

    pub outline: Outline,
    pub reveal_clip: RevealClip,
    pub layer_type: LayerType,

    /// Elevation above the parent's plane; non-zero values reorder children
    pub z: f32,

    /// True if this node draws under its compositing ancestor's background
    pub project_backwards: bool,

    /// True if projected descendants land on this node
    pub projection_receiver: bool,
}

impl Default for RenderProperties {
    fn default() -> RenderProperties {
        RenderProperties {
            left:                       0.0,
            top:                        0.0,
            width:                      0.0,
            height:                     0.0,
            translation_x:              0.0,
            translation_y:              0.0,
            scale_x:                    1.0,
            scale_y:                    1.0,
            alpha:                      1.0,
            has_overlapping_rendering:  true,
            static_matrix:              None,
            animation_matrix:           None,
            transform_matrix:           None,
            clipping_flags:             ClippingFlags::CLIP_TO_BOUNDS,
            clip_bounds:                Rect::empty(),
            outline:                    Outline::default(),
            reveal_clip:                RevealClip::default(),
            layer_type:                 LayerType::None,
            z:                          0.0,
            project_backwards:          false,
            projection_receiver:        false,
        }
    }
}

impl RenderProperties {
    ///
    /// The layer type once the "software" indirection is accounted for
    ///
    pub fn effective_layer_type(&self) -> LayerType {
        match self.layer_type {
            LayerType::Software => LayerType::None,
            other               => other,
        }
    }

    ///
    /// True if the transform matrix is a translation only, in which case the
    /// translation properties apply directly for clip accuracy
    ///
    pub fn is_transform_translate_only(&self) -> bool {
        match &self.transform_matrix {
            Some(matrix)    => matrix.is_pure_translate(),
            None            => true,
        }
    }

    ///
    /// The single clip rect produced by the requested clipping flags
    ///
    pub fn clipping_rect_for_flags(&self, flags: ClippingFlags) -> Rect {
        let mut clip = Rect::new(f32::MIN, f32::MIN, f32::MAX, f32::MAX);

        if flags.contains(ClippingFlags::CLIP_TO_BOUNDS) {
            clip.intersect(&Rect::from_size(self.width, self.height));
        }
        if flags.contains(ClippingFlags::CLIP_TO_CLIP_BOUNDS) {
            clip.intersect(&self.clip_bounds);
        }

        clip
    }
}

///
/// Handle referencing a render node in a `NodeStore`
///
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(pub u32);

///
/// A node promoted to a persistent off-screen layer
///
#[derive(Clone, Copy, Debug)]
pub struct NodeLayer {
    pub buffer: OffscreenBufferId,

    /// Maps window space back into the layer's space (used to position the
    /// light for shadows rendered inside the layer)
    pub inverse_transform_in_window: Matrix4,
}

///
/// A descendant drawn under an ancestor's background rather than its parent
///
#[derive(Clone, Debug)]
pub struct ProjectedChild {
    pub node: NodeId,
    pub local_matrix: Matrix4,
    pub local_clip: Option<Rect>,

    /// Accumulated transform from the projected node's parent down to the
    /// compositing ancestor that receives it
    pub transform_from_compositing_ancestor: Matrix4,
}

///
/// A node in the tree of recorded drawing content
///
#[derive(Clone, Debug)]
pub struct RenderNode {
    pub properties: RenderProperties,
    pub display_list: Option<DisplayList>,
    pub layer: Option<NodeLayer>,
    pub projected_nodes: Vec<ProjectedChild>,
}

impl RenderNode {
    pub fn new(properties: RenderProperties, display_list: Option<DisplayList>) -> RenderNode {
        RenderNode {
            properties,
            display_list,
            layer:           None,
            projected_nodes: vec![],
        }
    }

    ///
    /// True if deferring this node can't produce any drawing at all
    ///
    pub fn nothing_to_draw(&self) -> bool {
        (self.display_list.is_none() && self.layer.is_none())
            || self.properties.alpha <= 0.0
    }
}

///
/// Owns the render nodes for a window; the engine borrows it read-only for
/// the duration of one frame build and refers to nodes by handle
///
#[derive(Clone, Debug, Default)]
pub struct NodeStore {
    nodes: Vec<RenderNode>,
}

impl NodeStore {
    pub fn new() -> NodeStore {
        NodeStore::default()
    }

    ///
    /// Adds a node to the store, returning its handle
    ///
    pub fn add(&mut self, node: RenderNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    #[inline]
    pub fn node(&self, NodeId(id): NodeId) -> &RenderNode {
        &self.nodes[id as usize]
    }

    #[inline]
    pub fn node_mut(&mut self, NodeId(id): NodeId) -> &mut RenderNode {
        &mut self.nodes[id as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
