mod frame_builder;
mod defer_draw;
mod defer_layers;
mod defer_shadow;

pub use self::frame_builder::*;
