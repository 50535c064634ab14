//! Shader program variants: key derivation, WGSL assembly and a
//! reference-counted compile cache.

mod cache;
mod parameters;
pub mod source;

pub use cache::{ProgramCache, ProgramId};
pub use parameters::{
    FogKind, GeometryFeatures, LightSignature, ProgramEnvironment, ProgramParameters, ShaderKind,
    VertexColors,
};
