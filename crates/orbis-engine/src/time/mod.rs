//! Frame timing.
//!
//! [`FrameClock`] measures clamped frame deltas; [`AnimationLoop`] turns
//! them into animation time that can be paused and resumed.

mod animation;
mod frame_clock;

pub use animation::{AnimationLoop, AnimationTick};
pub use frame_clock::{FrameClock, FrameTime};
