//! WGSL assembly: a generated constant prelude followed by fixed chunks.
//!
//! WGSL has no preprocessor, so variant flags become module-scope constants
//! and the chunks branch on them; the shader compiler folds the dead paths.

use std::fmt::Write as _;

use crate::backend::Precision;
use crate::material::Side;
use crate::renderer::{ShadowMapType, ToneMapping};

use super::parameters::{FogKind, ProgramParameters, ShaderKind, VertexColors};

const COMMON: &str = include_str!("chunks/common.wgsl");
const SURFACE: &str = include_str!("chunks/surface.wgsl");
const LIGHTS: &str = include_str!("chunks/lights.wgsl");
const OUTPUT: &str = include_str!("chunks/output.wgsl");
const VERTEX: &str = include_str!("chunks/vertex.wgsl");
const BASIC: &str = include_str!("chunks/basic.wgsl");
const LAMBERT: &str = include_str!("chunks/lambert.wgsl");
const STANDARD: &str = include_str!("chunks/standard.wgsl");

pub fn prelude(p: &ProgramParameters) -> String {
    let mut out = String::with_capacity(1024);
    let mut flag = |name: &str, on: bool| {
        let _ = writeln!(out, "const {name}: bool = {on};");
    };
    flag("USE_MAP", p.map);
    flag("USE_NORMAL_MAP", p.normal_map);
    flag("USE_EMISSIVE_MAP", p.emissive_map);
    flag("USE_ALPHA_TEST", p.alpha_test);
    flag("USE_TRANSMISSION", p.transmission);
    flag("USE_SKINNING", p.skinning);
    flag("DOUBLE_SIDED", p.side == Side::Double);
    flag("BACK_SIDED", p.side == Side::Back);
    flag("PREMULTIPLIED_ALPHA", p.premultiplied_alpha);
    flag("ENCODE_SRGB", p.encode_srgb);
    flag("HIGH_PRECISION", p.precision == Precision::High);

    let vertex_colors = match p.vertex_colors {
        VertexColors::None => 0,
        VertexColors::Rgb => 1,
        VertexColors::Rgba => 2,
    };
    let fog = match p.fog {
        None => 0,
        Some(FogKind::Linear) => 1,
        Some(FogKind::Exp2) => 2,
    };
    let tone_mapping = match p.tone_mapping {
        ToneMapping::None => 0,
        ToneMapping::Linear => 1,
        ToneMapping::Reinhard => 2,
        ToneMapping::AcesFilmic => 3,
    };
    let shadow_map = match p.shadow_map {
        None => 0,
        Some(ShadowMapType::Basic) => 1,
        Some(ShadowMapType::Pcf) => 2,
        Some(ShadowMapType::PcfSoft) => 3,
    };
    let l = &p.lights;
    let counts = [
        ("VERTEX_COLORS", vertex_colors),
        ("FOG_MODE", fog),
        ("TONE_MAPPING", tone_mapping),
        ("SHADOW_MAP_TYPE", shadow_map),
        ("NUM_MORPH_TARGETS", p.morph_targets),
        ("NUM_CLIPPING_PLANES", p.clipping_planes),
        ("NUM_DIR_LIGHTS", l.directional),
        ("NUM_POINT_LIGHTS", l.point),
        ("NUM_SPOT_LIGHTS", l.spot),
        ("NUM_HEMI_LIGHTS", l.hemisphere),
        ("NUM_DIR_SHADOWS", l.directional_shadows),
        ("NUM_POINT_SHADOWS", l.point_shadows),
        ("NUM_SPOT_SHADOWS", l.spot_shadows),
    ];
    for (name, value) in counts {
        let _ = writeln!(out, "const {name}: u32 = {value}u;");
    }
    out
}

/// Full module for a variant. `custom` supplies the entry points of
/// [`ShaderKind::Custom`] programs.
pub fn assemble(p: &ProgramParameters, custom: Option<&str>) -> String {
    let body: &[&str] = match (p.shader, custom) {
        (ShaderKind::Basic, _) => &[VERTEX, BASIC],
        (ShaderKind::Lambert, _) => &[VERTEX, LAMBERT],
        (ShaderKind::Standard, _) => &[VERTEX, STANDARD],
        (ShaderKind::Custom(_), Some(src)) => &[src],
        (ShaderKind::Custom(_), None) => &[],
    };

    let mut out = prelude(p);
    for chunk in [COMMON, SURFACE, LIGHTS, OUTPUT].iter().chain(body) {
        out.push('\n');
        out.push_str(chunk);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ColorSpace;
    use crate::program::LightSignature;

    fn params(shader: ShaderKind) -> ProgramParameters {
        ProgramParameters {
            shader,
            precision: Precision::High,
            map: true,
            normal_map: false,
            emissive_map: false,
            alpha_test: false,
            premultiplied_alpha: false,
            vertex_colors: VertexColors::None,
            side: Side::Double,
            fog: Some(FogKind::Exp2),
            skinning: false,
            morph_targets: 0,
            transmission: false,
            lights: LightSignature { directional: 2, ..Default::default() },
            shadow_map: None,
            tone_mapping: ToneMapping::AcesFilmic,
            output_color_space: ColorSpace::Srgb,
            encode_srgb: true,
            clipping_planes: 1,
        }
    }

    #[test]
    fn prelude_carries_flags_and_counts() {
        let src = prelude(&params(ShaderKind::Standard));
        assert!(src.contains("const USE_MAP: bool = true;"));
        assert!(src.contains("const DOUBLE_SIDED: bool = true;"));
        assert!(src.contains("const NUM_DIR_LIGHTS: u32 = 2u;"));
        assert!(src.contains("const FOG_MODE: u32 = 2u;"));
        assert!(src.contains("const TONE_MAPPING: u32 = 3u;"));
        assert!(src.contains("const NUM_CLIPPING_PLANES: u32 = 1u;"));
    }

    #[test]
    fn builtins_get_entry_points() {
        for kind in [ShaderKind::Basic, ShaderKind::Lambert, ShaderKind::Standard] {
            let src = assemble(&params(kind), None);
            assert!(src.contains("fn vs_main"));
            assert!(src.contains("fn fs_main"));
        }
    }

    #[test]
    fn custom_source_is_appended_after_chunks() {
        let user = "@vertex fn vs_main() {} @fragment fn fs_main() {}";
        let src = assemble(&params(ShaderKind::Custom(7)), Some(user));
        assert!(src.ends_with(user));
        assert!(src.contains("var<uniform> u_frame"));
    }
}
