use std::num::NonZeroU64;

use crate::geometry::PrimitiveTopology;
use crate::material::{CompareFunc, Stencil};

use super::super::{BlendConfig, CullFace, FrameUniforms, FrontFace, ObjectUniforms, RawProgram, Vertex};
use super::convert;

/// Texture slots in bind group 2. The sampler sits at binding `TEXTURE_SLOTS`.
pub(crate) const TEXTURE_SLOTS: usize = 4;

pub(super) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Every piece of fixed-function state baked into a `wgpu::RenderPipeline`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(super) struct PipelineKey {
    pub program: RawProgram,
    pub blend: Option<BlendConfig>,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: CompareFunc,
    pub cull: CullFace,
    pub front_face: FrontFace,
    pub color_write: bool,
    pub stencil: Option<Stencil>,
    pub topology: PrimitiveTopology,
    pub color_format: wgpu::TextureFormat,
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3, // normal
        2 => Float32x2, // uv
        3 => Float32x4  // color
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Bind group layouts shared by every program.
pub(super) struct Layouts {
    pub frame: wgpu::BindGroupLayout,
    pub object: wgpu::BindGroupLayout,
    pub textures: wgpu::BindGroupLayout,
    pub pipeline: wgpu::PipelineLayout,
    pub sampler: wgpu::Sampler,
}

fn uniform_entry(size: usize, dynamic: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let frame = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("orbis frame bgl"),
            entries: &[uniform_entry(std::mem::size_of::<FrameUniforms>(), false)],
        });
        let object = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("orbis object bgl"),
            entries: &[uniform_entry(std::mem::size_of::<ObjectUniforms>(), true)],
        });

        let mut entries: Vec<wgpu::BindGroupLayoutEntry> = (0..TEXTURE_SLOTS as u32)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            })
            .collect();
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: TEXTURE_SLOTS as u32,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        let textures = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("orbis texture bgl"),
            entries: &entries,
        });

        let pipeline = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("orbis pipeline layout"),
            bind_group_layouts: &[&frame, &object, &textures],
            immediate_size: 0,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("orbis sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Self { frame, object, textures, pipeline, sampler }
    }
}

pub(super) fn create_pipeline(
    device: &wgpu::Device,
    layouts: &Layouts,
    module: &wgpu::ShaderModule,
    key: &PipelineKey,
) -> wgpu::RenderPipeline {
    let write_mask = if key.color_write { wgpu::ColorWrites::ALL } else { wgpu::ColorWrites::empty() };
    let depth_compare = if key.depth_test { convert::compare(key.depth_func) } else { wgpu::CompareFunction::Always };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("orbis pipeline"),
        layout: Some(&layouts.pipeline),

        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[Vertex::layout()],
        },

        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: key.color_format,
                blend: convert::blend_state(key.blend),
                write_mask,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: convert::topology(key.topology),
            strip_index_format: convert::strip_index_format(key.topology),
            front_face: convert::front_face(key.front_face),
            cull_mode: convert::cull_mode(key.cull),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: key.depth_write,
            depth_compare,
            stencil: convert::stencil_state(key.stencil),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),

        multiview_mask: None,
        cache: None,
    })
}
