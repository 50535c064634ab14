use wgpu::util::DeviceExt;

use crate::material::TextureTarget;

use super::super::{BackendError, GeometryUpload, TextureUpload};
use super::convert;
use super::pipeline::DEPTH_FORMAT;

pub(super) struct GpuGeometry {
    pub vertices: wgpu::Buffer,
    pub indices: Option<wgpu::Buffer>,
}

impl GpuGeometry {
    pub fn upload(device: &wgpu::Device, upload: &GeometryUpload<'_>) -> Result<Self, BackendError> {
        if upload.vertices.is_empty() {
            return Err(BackendError::Upload(format!("'{}' has no vertices", upload.label)));
        }
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(upload.label),
            contents: bytemuck::cast_slice(upload.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = upload.indices.filter(|i| !i.is_empty()).map(|indices| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(upload.label),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            })
        });
        Ok(Self { vertices, indices })
    }
}

/// Sampled texture; `view` is always a 2D view (layer 0 for cube maps).
pub(super) struct GpuTexture {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        upload: &TextureUpload<'_>,
    ) -> Result<Self, BackendError> {
        let layers = match upload.target {
            TextureTarget::D2 => 1,
            TextureTarget::Cube => 6,
        };
        let layer_size = upload.format.layer_size(upload.width, upload.height);
        if upload.width == 0 || upload.height == 0 || upload.data.len() != layer_size * layers as usize {
            return Err(BackendError::Upload(format!(
                "'{}' data length {} does not match {}x{}x{}",
                upload.label,
                upload.data.len(),
                upload.width,
                upload.height,
                layers
            )));
        }

        let size = wgpu::Extent3d {
            width: upload.width,
            height: upload.height,
            depth_or_array_layers: layers,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(upload.label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: convert::texture_format(upload.format, upload.color_space),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let (block, block_bytes) = upload.format.block_size();
        let blocks_x = upload.width.div_ceil(block);
        let blocks_y = upload.height.div_ceil(block);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            upload.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(blocks_x * block_bytes),
                rows_per_image: Some(blocks_y),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(upload.label),
            dimension: Some(wgpu::TextureViewDimension::D2),
            base_array_layer: 0,
            array_layer_count: Some(1),
            ..Default::default()
        });
        Ok(Self { _texture: texture, view })
    }

    /// 1x1 white, bound to empty slots.
    pub fn white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("orbis white texture"),
                size: wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &[255, 255, 255, 255],
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { _texture: texture, view }
    }
}

pub(super) struct DepthBuffer {
    pub size: (u32, u32),
    pub view: wgpu::TextureView,
}

impl DepthBuffer {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("orbis depth"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { size: (width, height), view }
    }
}

/// Offscreen color attachment plus its own depth buffer.
pub(super) struct GpuTarget {
    pub color: wgpu::TextureView,
    pub depth: DepthBuffer,
}

impl GpuTarget {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("orbis render target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let color = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { color, depth: DepthBuffer::new(device, width, height) }
    }
}
