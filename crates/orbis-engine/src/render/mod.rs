//! Scene-to-draw-list projection: visibility, culling, bucketing and sort.

mod builder;
mod list;

pub use builder::{BuildStats, RenderListBuilder};
pub use list::{Bucket, LightEntry, RenderItem, RenderList};
