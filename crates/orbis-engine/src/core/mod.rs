//! Contract between the window runtime and an application.
//!
//! The runtime owns the event loop, window and GPU surface; an [`App`] sees
//! window events and one [`FrameCtx`] per redraw.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
