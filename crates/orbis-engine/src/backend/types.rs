use bytemuck::{Pod, Zeroable};

use crate::geometry::PrimitiveTopology;
use crate::material::{BlendComponent, TextureFormat, TextureTarget};
use crate::math::ColorSpace;

/// Backend-owned program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RawProgram(pub u64);

/// Backend-owned vertex/index buffers.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RawGeometry(pub u64);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RawTexture(pub u64);

/// Offscreen color + depth attachment pair.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RawTarget(pub u64);

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Precision {
    #[default]
    High,
    Medium,
    Low,
}

/// Device limits and optional features, queried once per renderer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Capabilities {
    pub max_texture_units: u32,
    pub max_texture_size: u32,
    pub precision: Precision,
    pub float_textures: bool,
    pub bc_compression: bool,
    pub etc2_compression: bool,
    /// The default framebuffer encodes linear values to sRGB on store.
    pub srgb_output: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            max_texture_units: 4,
            max_texture_size: 8192,
            precision: Precision::High,
            float_textures: true,
            bc_compression: false,
            etc2_compression: false,
            srgb_output: false,
        }
    }
}

impl Capabilities {
    pub fn supports_format(&self, format: TextureFormat) -> bool {
        match format {
            TextureFormat::Rgba8 | TextureFormat::R8 => true,
            TextureFormat::Rgba16Float => self.float_textures,
            TextureFormat::Bc1Rgba => self.bc_compression,
            TextureFormat::Etc2Rgb8 => self.etc2_compression,
        }
    }
}

/// Interleaved vertex consumed by every built-in program.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

pub struct ProgramSource<'a> {
    pub label: &'a str,
    /// WGSL module defining `vs_main` and `fs_main`.
    pub wgsl: &'a str,
}

pub struct GeometryUpload<'a> {
    pub label: &'a str,
    pub vertices: &'a [Vertex],
    pub indices: Option<&'a [u32]>,
}

pub struct TextureUpload<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub target: TextureTarget,
    pub color_space: ColorSpace,
    pub data: &'a [u8],
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RenderTargetDesc {
    pub width: u32,
    pub height: u32,
}

/// Resolved blend equation/factors. `None` at the call site disables blending.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BlendConfig {
    pub color: BlendComponent,
    pub alpha: BlendComponent,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum CullFace {
    None,
    #[default]
    Back,
    Front,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum FrontFace {
    #[default]
    Ccw,
    Cw,
}

/// Pixel rectangle of the current target.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn sized(width: u32, height: u32) -> Self {
        Self { x: 0.0, y: 0.0, width: width as f32, height: height as f32 }
    }
}

/// Element range of the currently bound geometry.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DrawCall {
    pub topology: PrimitiveTopology,
    pub start: u32,
    pub count: u32,
    pub indexed: bool,
}
