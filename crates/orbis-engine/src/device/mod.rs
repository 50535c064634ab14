//! wgpu device and window surface.
//!
//! Creates the instance, adapter, device and queue for a window, keeps the
//! surface configured across resizes, and hands out one surface texture per
//! frame. Drawing into it is the renderer's job; this module only acquires
//! and presents.

mod context;
mod error;
mod frame;
mod init;
mod surface;

pub use context::Gpu;
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use init::GpuInit;
