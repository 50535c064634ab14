//! The seam between the renderer and a graphics API.
//!
//! The renderer only ever talks to a [`GraphicsBackend`]; every state setter
//! it reaches has already been filtered through the
//! [`StateTracker`](crate::state::StateTracker), so implementations may apply
//! each call unconditionally.

mod error;
mod recording;
mod types;
pub mod uniforms;
mod wgpu_backend;

pub use error::BackendError;
pub use recording::{BackendCall, RecordingBackend};
pub use types::{
    BlendConfig, Capabilities, CullFace, DrawCall, FrontFace, GeometryUpload, Precision,
    ProgramSource, RawGeometry, RawProgram, RawTarget, RawTexture, RenderTargetDesc,
    TextureUpload, Vertex, Viewport,
};
pub use uniforms::{FrameUniforms, LightUniform, ObjectUniforms};
pub use wgpu_backend::WgpuBackend;

use crate::material::{CompareFunc, Stencil, TextureTarget};
use crate::math::Color;

pub trait GraphicsBackend {
    /// Queried once by the renderer and cached.
    fn capabilities(&self) -> Capabilities;

    fn begin_frame(&mut self) -> Result<(), BackendError>;
    fn end_frame(&mut self) -> Result<(), BackendError>;

    fn compile_program(&mut self, source: &ProgramSource<'_>) -> Result<RawProgram, BackendError>;
    fn destroy_program(&mut self, program: RawProgram);

    fn upload_geometry(&mut self, upload: &GeometryUpload<'_>) -> Result<RawGeometry, BackendError>;
    fn destroy_geometry(&mut self, geometry: RawGeometry);

    fn upload_texture(&mut self, upload: &TextureUpload<'_>) -> Result<RawTexture, BackendError>;
    fn destroy_texture(&mut self, texture: RawTexture);

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<RawTarget, BackendError>;
    fn destroy_render_target(&mut self, target: RawTarget);
    /// Color attachment of `target`, sampleable by later draws.
    fn render_target_texture(&self, target: RawTarget) -> Option<RawTexture>;

    /// `None` selects the default framebuffer.
    fn set_render_target(&mut self, target: Option<RawTarget>);
    fn set_viewport(&mut self, viewport: Viewport);
    /// `None` disables blending.
    fn set_blend(&mut self, blend: Option<BlendConfig>);
    fn set_depth_test(&mut self, enabled: bool);
    fn set_depth_write(&mut self, enabled: bool);
    fn set_depth_func(&mut self, func: CompareFunc);
    fn set_cull_face(&mut self, cull: CullFace);
    fn set_front_face(&mut self, face: FrontFace);
    fn set_color_write(&mut self, enabled: bool);
    /// `None` disables the stencil test.
    fn set_stencil(&mut self, stencil: Option<Stencil>);

    /// `None` unbinds the unit; backends substitute a neutral texture.
    fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: Option<RawTexture>);
    fn use_program(&mut self, program: Option<RawProgram>);
    fn bind_geometry(&mut self, geometry: Option<RawGeometry>);

    /// Clears the current target. `None` leaves that buffer untouched.
    fn clear(&mut self, color: Option<Color>, depth: Option<f32>);

    fn set_frame_uniforms(&mut self, uniforms: &FrameUniforms);
    fn set_object_uniforms(&mut self, uniforms: &ObjectUniforms);
    fn draw(&mut self, call: DrawCall);
}
