//! Uniform blocks shared by every built-in program.
//!
//! Layouts mirror the structs declared in `program/chunks/common.wgsl`; field
//! order and padding must stay in sync with it.

use bytemuck::{Pod, Zeroable};

pub const MAX_LIGHTS: usize = 8;
pub const MAX_CLIPPING_PLANES: usize = 4;

pub const IDENTITY: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// One analytic light. Lights are packed by category (directional, point,
/// spot, hemisphere); `FrameUniforms::light_counts` gives the range sizes.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    /// World position, `w` unused.
    pub position: [f32; 4],
    /// Normalized direction the light travels (directional, spot), or the sky
    /// direction for hemisphere lights.
    pub direction: [f32; 4],
    /// Linear rgb premultiplied by intensity.
    pub color: [f32; 4],
    /// Hemisphere ground color, premultiplied by intensity.
    pub ground: [f32; 4],
    /// `distance, decay, cos(outer cone), cos(inner cone)`.
    pub params: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// Summed ambient light, linear rgb.
    pub ambient: [f32; 4],
    /// `directional, point, spot, hemisphere`.
    pub light_counts: [u32; 4],
    pub fog_color: [f32; 4],
    /// `mode (0 none, 1 linear, 2 exp2), near, far, density`.
    pub fog_params: [f32; 4],
    /// `tone mapping exposure, unused, drawing buffer width, height`.
    pub output: [f32; 4],
    pub clipping_planes: [[f32; 4]; MAX_CLIPPING_PLANES],
    pub lights: [LightUniform; MAX_LIGHTS],
}

impl Default for FrameUniforms {
    fn default() -> Self {
        Self {
            view: IDENTITY,
            projection: IDENTITY,
            camera_position: [0.0; 4],
            ambient: [0.0; 4],
            light_counts: [0; 4],
            fog_color: [0.0; 4],
            fog_params: [0.0; 4],
            output: [1.0, 0.0, 1.0, 1.0],
            clipping_planes: [[0.0; 4]; MAX_CLIPPING_PLANES],
            lights: [LightUniform::default(); MAX_LIGHTS],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub model: [[f32; 4]; 4],
    /// Inverse-transpose of the model matrix's upper 3x3, padded to 4x4.
    pub normal: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub emissive: [f32; 4],
    /// `opacity, alpha test cutoff, roughness, metalness`.
    pub params: [f32; 4],
    /// `transmission, unused, unused, unused`.
    pub extra: [f32; 4],
}

impl Default for ObjectUniforms {
    fn default() -> Self {
        Self {
            model: IDENTITY,
            normal: IDENTITY,
            color: [1.0; 4],
            emissive: [0.0, 0.0, 0.0, 1.0],
            params: [1.0, 0.0, 1.0, 0.0],
            extra: [0.0; 4],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_sixteen_byte_aligned() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 80);
        assert_eq!(std::mem::size_of::<FrameUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 192);
    }
}
