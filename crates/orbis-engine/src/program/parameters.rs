use std::fmt::Write as _;

use crate::backend::{Capabilities, Precision};
use crate::geometry::{self, Geometry};
use crate::material::{params, Material, MaterialKind, Side};
use crate::math::ColorSpace;
use crate::renderer::{ShadowMapType, ToneMapping};
use crate::scene::FogMode;

/// Which fragment program a variant is built from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderKind {
    Basic,
    Lambert,
    Standard,
    /// Identity of the custom WGSL source.
    Custom(u64),
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum VertexColors {
    #[default]
    None,
    Rgb,
    Rgba,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FogKind {
    Linear,
    Exp2,
}

/// Per-category light counts for the current frame.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct LightSignature {
    pub directional: u32,
    pub point: u32,
    pub spot: u32,
    pub hemisphere: u32,
    pub directional_shadows: u32,
    pub point_shadows: u32,
    pub spot_shadows: u32,
}

impl LightSignature {
    pub fn direct(&self) -> u32 {
        self.directional + self.point + self.spot
    }

    pub fn shadows(&self) -> u32 {
        self.directional_shadows + self.point_shadows + self.spot_shadows
    }
}

/// Geometry-side inputs to variant selection.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct GeometryFeatures {
    /// Item size of the `color` attribute, if any.
    pub color_size: Option<usize>,
    pub skinning: bool,
    pub morph_targets: u32,
}

impl GeometryFeatures {
    pub fn of(geometry: &Geometry) -> Self {
        Self {
            color_size: geometry.attribute(geometry::COLOR).map(|a| a.item_size),
            skinning: geometry.has_skinning(),
            morph_targets: geometry.morph_target_count() as u32,
        }
    }
}

/// Frame- and renderer-wide inputs to variant selection.
#[derive(Debug, Copy, Clone)]
pub struct ProgramEnvironment<'a> {
    pub lights: &'a LightSignature,
    pub fog: Option<FogMode>,
    pub tone_mapping: ToneMapping,
    pub output_color_space: ColorSpace,
    /// `None` when shadow maps are disabled.
    pub shadow_map: Option<ShadowMapType>,
    pub clipping_planes: u32,
    pub receive_shadow: bool,
    pub capabilities: &'a Capabilities,
}

/// The full set of flags a program variant is keyed on.
///
/// Derived only from typed fields, never from map iteration order, so equal
/// inputs always produce equal keys.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ProgramParameters {
    pub shader: ShaderKind,
    pub precision: Precision,
    pub map: bool,
    pub normal_map: bool,
    pub emissive_map: bool,
    pub alpha_test: bool,
    pub premultiplied_alpha: bool,
    pub vertex_colors: VertexColors,
    pub side: Side,
    pub fog: Option<FogKind>,
    pub skinning: bool,
    pub morph_targets: u32,
    pub transmission: bool,
    pub lights: LightSignature,
    pub shadow_map: Option<ShadowMapType>,
    pub tone_mapping: ToneMapping,
    pub output_color_space: ColorSpace,
    /// The output encodes sRGB in the shader rather than on store.
    pub encode_srgb: bool,
    pub clipping_planes: u32,
}

impl ProgramParameters {
    pub fn derive(material: &Material, geometry: &GeometryFeatures, env: &ProgramEnvironment<'_>) -> Self {
        let shader = match material.kind() {
            MaterialKind::Basic => ShaderKind::Basic,
            MaterialKind::Lambert => ShaderKind::Lambert,
            MaterialKind::Standard => ShaderKind::Standard,
            MaterialKind::Shader(custom) => ShaderKind::Custom(custom.id()),
        };

        // Unlit programs ignore lights and shadows entirely.
        let lit = !matches!(shader, ShaderKind::Basic);
        let lights = if lit { *env.lights } else { LightSignature::default() };
        let shadow_map = env
            .shadow_map
            .filter(|_| lit && env.receive_shadow && lights.shadows() > 0);

        let vertex_colors = match (material.vertex_colors(), geometry.color_size) {
            (true, Some(4)) => VertexColors::Rgba,
            (true, Some(_)) => VertexColors::Rgb,
            _ => VertexColors::None,
        };

        let fog = env.fog.filter(|_| material.fog()).map(|mode| match mode {
            FogMode::Linear { .. } => FogKind::Linear,
            FogMode::Exp2 { .. } => FogKind::Exp2,
        });

        Self {
            shader,
            precision: env.capabilities.precision,
            map: material.texture(params::MAP).is_some(),
            normal_map: lit && material.texture(params::NORMAL_MAP).is_some(),
            emissive_map: material.texture(params::EMISSIVE_MAP).is_some(),
            alpha_test: material.alpha_test() > 0.0,
            premultiplied_alpha: material.premultiplied_alpha(),
            vertex_colors,
            side: material.side(),
            fog,
            skinning: geometry.skinning,
            morph_targets: geometry.morph_targets,
            transmission: material.is_transmissive(),
            lights,
            shadow_map,
            tone_mapping: env.tone_mapping,
            output_color_space: env.output_color_space,
            encode_srgb: env.output_color_space == ColorSpace::Srgb && !env.capabilities.srgb_output,
            clipping_planes: env.clipping_planes,
        }
    }

    /// Human-readable key, used as the program label.
    pub fn cache_key(&self) -> String {
        let mut key = match self.shader {
            ShaderKind::Basic => "basic".to_string(),
            ShaderKind::Lambert => "lambert".to_string(),
            ShaderKind::Standard => "standard".to_string(),
            ShaderKind::Custom(id) => format!("custom-{id:016x}"),
        };
        let flags = [
            (self.map, "map"),
            (self.normal_map, "normalmap"),
            (self.emissive_map, "emissivemap"),
            (self.alpha_test, "alphatest"),
            (self.premultiplied_alpha, "premul"),
            (self.skinning, "skin"),
            (self.transmission, "transmission"),
            (self.encode_srgb, "srgb"),
        ];
        for (on, name) in flags {
            if on {
                key.push(',');
                key.push_str(name);
            }
        }
        let l = &self.lights;
        let _ = write!(
            key,
            ",{:?},{:?},{:?},{:?},{:?},{:?},{:?},m{},c{},l{}.{}.{}.{}/{}.{}.{}",
            self.precision,
            self.vertex_colors,
            self.side,
            self.fog,
            self.shadow_map,
            self.tone_mapping,
            self.output_color_space,
            self.morph_targets,
            self.clipping_planes,
            l.directional,
            l.point,
            l.spot,
            l.hemisphere,
            l.directional_shadows,
            l.point_shadows,
            l.spot_shadows,
        );
        key
    }
}
