//! Material descriptors and textures.

#[allow(clippy::module_inception)]
mod material;
mod texture;

pub use material::{
    params, BlendComponent, BlendEquation, BlendFactor, Blending, CompareFunc, CustomBlending,
    CustomShader, Material, MaterialId, MaterialKind, ParamValue, Side, Stencil, StencilOp,
};
pub use texture::{Texture, TextureFormat, TextureId, TextureTarget};
