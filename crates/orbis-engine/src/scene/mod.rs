//! Scene graph.
//!
//! Nodes live in a generational arena owned by [`SceneGraph`]; parent links
//! are plain [`NodeId`] handles. A [`Scene`] adds the asset stores that
//! drawables point into, plus fog, background and the disposal queue.

mod camera;
mod graph;
mod light;
mod node;
#[allow(clippy::module_inception)]
mod scene;

pub use camera::{Camera, Projection};
pub use graph::{Ancestors, ChildPolicy, SceneGraph};
pub use light::{Light, LightKind};
pub use node::{DirtyState, Drawable, Node, NodeId, NodeKind, DEFAULT_LAYERS};
pub use scene::{Disposal, Fog, FogMode, Scene};
