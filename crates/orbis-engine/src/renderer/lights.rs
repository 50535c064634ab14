use cgmath::{InnerSpace, Matrix4, Point3, Vector3};

use crate::backend::uniforms::{MAX_CLIPPING_PLANES, MAX_LIGHTS};
use crate::backend::{FrameUniforms, LightUniform};
use crate::math::{Color, Plane};
use crate::program::LightSignature;
use crate::render::LightEntry;
use crate::scene::{Fog, FogMode, LightKind};

/// Everything computed once per frame for the per-frame uniform block.
pub struct FrameInputs<'a> {
    pub view: Matrix4<f32>,
    /// Already in wgpu clip convention.
    pub projection: Matrix4<f32>,
    pub camera_world: Matrix4<f32>,
    pub lights: &'a [LightEntry],
    pub fog: Option<Fog>,
    pub clipping_planes: &'a [Plane],
    pub exposure: f32,
    pub drawing_buffer: (u32, u32),
    /// Count shadow-casting lights into the signature.
    pub shadows: bool,
}

/// Packed frame uniforms plus the light counts they encode.
pub struct FrameSetup {
    pub uniforms: FrameUniforms,
    pub signature: LightSignature,
    /// Lights beyond the uniform capacity that were left out.
    pub dropped_lights: usize,
}

fn origin(world: &Matrix4<f32>) -> Point3<f32> {
    Point3::new(world.w.x, world.w.y, world.w.z)
}

fn radiance(color: Color, intensity: f32) -> [f32; 4] {
    [color.r * intensity, color.g * intensity, color.b * intensity, 1.0]
}

fn aim(from: Point3<f32>, to: Point3<f32>) -> [f32; 4] {
    let d = to - from;
    let d = if d.magnitude2() > f32::EPSILON { d.normalize() } else { Vector3::new(0.0, 0.0, -1.0) };
    [d.x, d.y, d.z, 0.0]
}

fn category(kind: &LightKind) -> Option<usize> {
    match kind {
        LightKind::Directional { .. } => Some(0),
        LightKind::Point { .. } => Some(1),
        LightKind::Spot { .. } => Some(2),
        LightKind::Hemisphere { .. } => Some(3),
        LightKind::Ambient => None,
    }
}

fn pack(entry: &LightEntry) -> LightUniform {
    let light = &entry.light;
    let position = origin(&entry.world);
    let mut u = LightUniform {
        position: [position.x, position.y, position.z, 1.0],
        color: radiance(light.color, light.intensity),
        ..LightUniform::default()
    };
    match light.kind {
        LightKind::Directional { target } => {
            u.direction = aim(position, target);
        }
        LightKind::Point { distance, decay } => {
            u.params = [distance, decay, 0.0, 0.0];
        }
        LightKind::Spot { target, distance, angle, penumbra, decay } => {
            u.direction = aim(position, target);
            u.params = [distance, decay, angle.cos(), (angle * (1.0 - penumbra)).cos()];
        }
        LightKind::Hemisphere { ground_color } => {
            // Sky direction follows the node position, up by default.
            u.direction = aim(Point3::new(0.0, 0.0, 0.0), position);
            if position == Point3::new(0.0, 0.0, 0.0) {
                u.direction = [0.0, 1.0, 0.0, 0.0];
            }
            u.ground = radiance(ground_color, light.intensity);
        }
        LightKind::Ambient => {}
    }
    u
}

/// Aggregates the frame's lights, camera, fog and clipping planes.
///
/// Lights are packed by category: directional, point, spot, hemisphere.
/// When there are more than [`MAX_LIGHTS`], later ones in that order are
/// dropped. Ambient lights sum into a single color.
pub fn setup_frame(inputs: &FrameInputs<'_>) -> FrameSetup {
    let mut uniforms = FrameUniforms {
        view: inputs.view.into(),
        projection: inputs.projection.into(),
        ..FrameUniforms::default()
    };
    let eye = origin(&inputs.camera_world);
    uniforms.camera_position = [eye.x, eye.y, eye.z, 1.0];

    let mut by_category: [Vec<&LightEntry>; 4] = Default::default();
    let mut ambient = [0.0f32; 3];
    for entry in inputs.lights {
        match category(&entry.light.kind) {
            Some(c) => by_category[c].push(entry),
            None => {
                let [r, g, b, _] = radiance(entry.light.color, entry.light.intensity);
                ambient[0] += r;
                ambient[1] += g;
                ambient[2] += b;
            }
        }
    }
    uniforms.ambient = [ambient[0], ambient[1], ambient[2], 1.0];

    let mut signature = LightSignature::default();
    let mut packed = 0usize;
    let mut dropped = 0usize;
    for (c, entries) in by_category.iter().enumerate() {
        let mut count = 0u32;
        let mut shadows = 0u32;
        for entry in entries {
            if packed == MAX_LIGHTS {
                dropped += 1;
                continue;
            }
            uniforms.lights[packed] = pack(entry);
            packed += 1;
            count += 1;
            if inputs.shadows && entry.light.cast_shadow && entry.light.shadow_capable() {
                shadows += 1;
            }
        }
        uniforms.light_counts[c] = count;
        match c {
            0 => (signature.directional, signature.directional_shadows) = (count, shadows),
            1 => (signature.point, signature.point_shadows) = (count, shadows),
            2 => (signature.spot, signature.spot_shadows) = (count, shadows),
            _ => signature.hemisphere = count,
        }
    }

    if let Some(fog) = inputs.fog {
        uniforms.fog_color = fog.color.to_array();
        uniforms.fog_params = match fog.mode {
            FogMode::Linear { near, far } => [1.0, near, far, 0.0],
            FogMode::Exp2 { density } => [2.0, 0.0, 0.0, density],
        };
    }

    for (slot, plane) in uniforms.clipping_planes.iter_mut().zip(inputs.clipping_planes) {
        *slot = [plane.normal.x, plane.normal.y, plane.normal.z, plane.constant];
    }

    let (w, h) = inputs.drawing_buffer;
    uniforms.output = [inputs.exposure, 0.0, w as f32, h as f32];

    FrameSetup { uniforms, signature, dropped_lights: dropped }
}

/// Clipping planes the shaders actually see.
#[inline]
pub fn clipping_plane_count(planes: &[Plane]) -> u32 {
    planes.len().min(MAX_CLIPPING_PLANES) as u32
}
