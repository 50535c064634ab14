//! Geometry store.
//!
//! CPU-side vertex data only. GPU buffers are created by the renderer's
//! upload cache, keyed by [`GeometryId`] and refreshed when
//! [`Geometry::version`] moves.

mod attribute;
#[allow(clippy::module_inception)]
mod geometry;
pub mod shapes;

pub use attribute::{Attribute, AttributeData};
pub use geometry::{
    DrawRange, Geometry, GeometryGroup, GeometryId, PrimitiveTopology, COLOR, NORMAL, POSITION,
    SKIN_INDEX, SKIN_WEIGHT, UV,
};
