//! Redundant-call elimination in front of the graphics backend.

mod blend;
mod tracker;

pub use blend::blend_config;
pub use tracker::StateTracker;
