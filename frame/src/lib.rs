//!
//! Frame deferral engine: walks a tree of recorded render nodes, resolves
//! transform/clip/alpha state for every surviving op, and groups the results
//! into layer-aware batches for a GPU renderer to issue
//!

mod arena;
mod clip;
mod snapshot;
mod canvas_state;
mod baked_state;
mod layer_builder;
mod frame_builder;

pub use self::arena::*;
pub use self::baked_state::*;
pub use self::canvas_state::*;
pub use self::clip::*;
pub use self::frame_builder::*;
pub use self::layer_builder::*;
pub use self::snapshot::*;

pub use ember_canvas as canvas;
