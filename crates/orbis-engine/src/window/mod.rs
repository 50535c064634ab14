//! winit event loop and the window it drives.

mod runtime;

pub use runtime::{RedrawMode, Runtime, RuntimeConfig, RuntimeCtx};
pub use winit::window::CursorIcon;
