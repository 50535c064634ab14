//! Engine enums to wgpu enums.

use crate::geometry::PrimitiveTopology;
use crate::material::{BlendComponent, BlendEquation, BlendFactor, CompareFunc, Stencil, StencilOp, TextureFormat};
use crate::math::ColorSpace;

use super::super::{BlendConfig, CullFace, FrontFace};

pub(super) fn topology(t: PrimitiveTopology) -> wgpu::PrimitiveTopology {
    match t {
        PrimitiveTopology::Triangles => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveTopology::Lines => wgpu::PrimitiveTopology::LineList,
        PrimitiveTopology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        PrimitiveTopology::Points => wgpu::PrimitiveTopology::PointList,
    }
}

pub(super) fn strip_index_format(t: PrimitiveTopology) -> Option<wgpu::IndexFormat> {
    match t {
        PrimitiveTopology::LineStrip => Some(wgpu::IndexFormat::Uint32),
        _ => None,
    }
}

pub(super) fn cull_mode(c: CullFace) -> Option<wgpu::Face> {
    match c {
        CullFace::None => None,
        CullFace::Back => Some(wgpu::Face::Back),
        CullFace::Front => Some(wgpu::Face::Front),
    }
}

pub(super) fn front_face(f: FrontFace) -> wgpu::FrontFace {
    match f {
        FrontFace::Ccw => wgpu::FrontFace::Ccw,
        FrontFace::Cw => wgpu::FrontFace::Cw,
    }
}

pub(super) fn compare(f: CompareFunc) -> wgpu::CompareFunction {
    match f {
        CompareFunc::Never => wgpu::CompareFunction::Never,
        CompareFunc::Less => wgpu::CompareFunction::Less,
        CompareFunc::Equal => wgpu::CompareFunction::Equal,
        CompareFunc::LessEqual => wgpu::CompareFunction::LessEqual,
        CompareFunc::Greater => wgpu::CompareFunction::Greater,
        CompareFunc::NotEqual => wgpu::CompareFunction::NotEqual,
        CompareFunc::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
        CompareFunc::Always => wgpu::CompareFunction::Always,
    }
}

fn stencil_op(op: StencilOp) -> wgpu::StencilOperation {
    match op {
        StencilOp::Keep => wgpu::StencilOperation::Keep,
        StencilOp::Zero => wgpu::StencilOperation::Zero,
        StencilOp::Replace => wgpu::StencilOperation::Replace,
        StencilOp::IncrementClamp => wgpu::StencilOperation::IncrementClamp,
        StencilOp::DecrementClamp => wgpu::StencilOperation::DecrementClamp,
        StencilOp::Invert => wgpu::StencilOperation::Invert,
        StencilOp::IncrementWrap => wgpu::StencilOperation::IncrementWrap,
        StencilOp::DecrementWrap => wgpu::StencilOperation::DecrementWrap,
    }
}

pub(super) fn stencil_state(stencil: Option<Stencil>) -> wgpu::StencilState {
    let Some(s) = stencil else { return wgpu::StencilState::default() };
    let face = wgpu::StencilFaceState {
        compare: compare(s.func),
        fail_op: stencil_op(s.fail),
        depth_fail_op: stencil_op(s.depth_fail),
        pass_op: stencil_op(s.pass),
    };
    wgpu::StencilState {
        front: face,
        back: face,
        read_mask: s.read_mask,
        write_mask: s.write_mask,
    }
}

fn blend_factor(f: BlendFactor) -> wgpu::BlendFactor {
    match f {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::Src => wgpu::BlendFactor::Src,
        BlendFactor::OneMinusSrc => wgpu::BlendFactor::OneMinusSrc,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::Dst => wgpu::BlendFactor::Dst,
        BlendFactor::OneMinusDst => wgpu::BlendFactor::OneMinusDst,
        BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
        BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
        BlendFactor::SrcAlphaSaturated => wgpu::BlendFactor::SrcAlphaSaturated,
    }
}

fn blend_component(c: BlendComponent) -> wgpu::BlendComponent {
    let operation = match c.equation {
        BlendEquation::Add => wgpu::BlendOperation::Add,
        BlendEquation::Subtract => wgpu::BlendOperation::Subtract,
        BlendEquation::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
        BlendEquation::Min => wgpu::BlendOperation::Min,
        BlendEquation::Max => wgpu::BlendOperation::Max,
    };
    // Min/Max ignore factors and wgpu requires them to be One.
    if matches!(c.equation, BlendEquation::Min | BlendEquation::Max) {
        return wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation,
        };
    }
    wgpu::BlendComponent {
        src_factor: blend_factor(c.src),
        dst_factor: blend_factor(c.dst),
        operation,
    }
}

pub(super) fn blend_state(blend: Option<BlendConfig>) -> Option<wgpu::BlendState> {
    blend.map(|b| wgpu::BlendState {
        color: blend_component(b.color),
        alpha: blend_component(b.alpha),
    })
}

pub(super) fn texture_format(format: TextureFormat, color_space: ColorSpace) -> wgpu::TextureFormat {
    let srgb = color_space == ColorSpace::Srgb;
    match (format, srgb) {
        (TextureFormat::Rgba8, true) => wgpu::TextureFormat::Rgba8UnormSrgb,
        (TextureFormat::Rgba8, false) => wgpu::TextureFormat::Rgba8Unorm,
        (TextureFormat::R8, _) => wgpu::TextureFormat::R8Unorm,
        (TextureFormat::Rgba16Float, _) => wgpu::TextureFormat::Rgba16Float,
        (TextureFormat::Bc1Rgba, true) => wgpu::TextureFormat::Bc1RgbaUnormSrgb,
        (TextureFormat::Bc1Rgba, false) => wgpu::TextureFormat::Bc1RgbaUnorm,
        (TextureFormat::Etc2Rgb8, true) => wgpu::TextureFormat::Etc2Rgb8UnormSrgb,
        (TextureFormat::Etc2Rgb8, false) => wgpu::TextureFormat::Etc2Rgb8Unorm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_max_force_unit_factors() {
        let c = blend_component(BlendComponent {
            equation: BlendEquation::Max,
            src: BlendFactor::SrcAlpha,
            dst: BlendFactor::Zero,
        });
        assert_eq!(c.src_factor, wgpu::BlendFactor::One);
        assert_eq!(c.dst_factor, wgpu::BlendFactor::One);
    }

    #[test]
    fn srgb_textures_pick_srgb_formats() {
        assert_eq!(
            texture_format(TextureFormat::Rgba8, ColorSpace::Srgb),
            wgpu::TextureFormat::Rgba8UnormSrgb
        );
        assert_eq!(
            texture_format(TextureFormat::Rgba8, ColorSpace::Linear),
            wgpu::TextureFormat::Rgba8Unorm
        );
    }

    #[test]
    fn only_strips_carry_index_format() {
        assert!(strip_index_format(PrimitiveTopology::Triangles).is_none());
        assert!(strip_index_format(PrimitiveTopology::LineStrip).is_some());
    }
}
