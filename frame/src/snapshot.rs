use super::clip::*;

use ember_canvas::{Matrix4, Path, Rect, Vector3};

use bitflags::bitflags;

use std::sync::Arc;

bitflags! {
    ///
    /// Which sub-state a save call captures
    ///
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct SaveFlags: u32 {
        const MATRIX = 1 << 0;
        const CLIP   = 1 << 1;
    }
}

///
/// A round-rect mask attached to the clip (reveal animations, outline clips)
///
#[derive(Clone, Copy, Debug)]
pub struct RoundRectClip {
    pub bounds: Rect,
    pub radius: f32,
}

///
/// One level of the save/restore stack
///
/// Immutable once a deeper save is pushed on top of it. The transform is the
/// composition of every ancestor transform; the clip is the intersection of
/// every ancestor clip, held in render-target space; alpha is the product of
/// every ancestor alpha.
///
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// What the save that created this snapshot captured (sub-state that was
    /// not captured writes through to the parent on restore)
    pub flags: SaveFlags,

    pub transform: Matrix4,
    pub clip: ClipArea,
    pub alpha: f32,
    pub relative_light_center: Vector3,
    pub round_rect_clip: Option<RoundRectClip>,
    pub projection_path_mask: Option<Arc<Path>>,
    pub viewport: (u32, u32),
}

impl Snapshot {
    ///
    /// The root snapshot for a render target
    ///
    pub fn root(viewport_width: u32, viewport_height: u32, clip: Rect,
        light_center: Vector3) -> Snapshot
    {
        Snapshot {
            flags:                  SaveFlags::MATRIX | SaveFlags::CLIP,
            transform:              Matrix4::identity(),
            clip:                   ClipArea::new(clip),
            alpha:                  1.0,
            relative_light_center:  light_center,
            round_rect_clip:        None,
            projection_path_mask:   None,
            viewport:               (viewport_width, viewport_height),
        }
    }

    ///
    /// Resets this snapshot's viewport (entering an off-screen layer)
    ///
    pub fn initialize_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    ///
    /// Bounding rect of the current clip, in render-target space
    ///
    pub fn render_target_clip(&self) -> Rect {
        self.clip.bounds()
    }
}
