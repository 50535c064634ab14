//! Orbis engine crate.
//!
//! A retained scene graph drawn by a renderer that caches shader programs
//! and GPU state between frames, plus the window and device runtime it runs
//! in. The renderer talks to the GPU through [`backend::GraphicsBackend`];
//! [`backend::WgpuBackend`] is the real one and
//! [`backend::RecordingBackend`] records calls for tests.

pub mod arena;
pub mod error;
pub mod math;

pub mod geometry;
pub mod material;
pub mod scene;

pub mod backend;
pub mod program;
pub mod render;
pub mod renderer;
pub mod state;

pub mod core;
pub mod device;
pub mod logging;
pub mod time;
pub mod window;

pub use error::{EngineError, EngineResult};
pub use renderer::{Renderer, RendererConfig};
pub use scene::{NodeId, Scene};
