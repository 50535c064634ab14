//! [`GraphicsBackend`] over wgpu.
//!
//! wgpu bakes blend/depth/cull/stencil state into pipelines and records work
//! into passes, so the immediate-style calls made by the renderer are
//! buffered: setters update a current [`PipelineKey`], draws snapshot it,
//! and `end_frame` builds missing pipelines, writes uniforms and encodes one
//! render pass per target switch or clear.

mod convert;
mod pipeline;
mod resources;

use std::collections::HashMap;

use crate::material::{CompareFunc, Stencil, TextureTarget};
use crate::math::Color;

use super::{
    BackendError, BlendConfig, Capabilities, CullFace, DrawCall, FrameUniforms, FrontFace,
    GeometryUpload, GraphicsBackend, ObjectUniforms, Precision, ProgramSource, RawGeometry,
    RawProgram, RawTarget, RawTexture, RenderTargetDesc, TextureUpload, Viewport,
};
use pipeline::{Layouts, PipelineKey, TEXTURE_SLOTS};
use resources::{DepthBuffer, GpuGeometry, GpuTarget, GpuTexture};

struct DrawRecord {
    key: PipelineKey,
    geometry: RawGeometry,
    textures: [Option<RawTexture>; TEXTURE_SLOTS],
    object: u32,
    viewport: Option<Viewport>,
    stencil_reference: u32,
    call: DrawCall,
}

struct PassRecord {
    target: Option<RawTarget>,
    clear_color: Option<Color>,
    clear_depth: Option<f32>,
    draws: Vec<DrawRecord>,
}

impl PassRecord {
    fn new(target: Option<RawTarget>) -> Self {
        Self { target, clear_color: None, clear_depth: None, draws: Vec::new() }
    }
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_format: wgpu::TextureFormat,

    output: Option<(wgpu::TextureView, u32, u32)>,
    output_depth: Option<DepthBuffer>,

    layouts: Option<Layouts>,
    white: Option<GpuTexture>,
    frame_ubo: Option<wgpu::Buffer>,
    frame_bind_group: Option<wgpu::BindGroup>,
    object_ubo: Option<wgpu::Buffer>,
    object_bind_group: Option<wgpu::BindGroup>,
    object_capacity: usize,
    object_stride: u64,

    next_id: u64,
    programs: HashMap<RawProgram, wgpu::ShaderModule>,
    geometries: HashMap<RawGeometry, GpuGeometry>,
    textures: HashMap<RawTexture, GpuTexture>,
    targets: HashMap<RawTarget, (GpuTarget, RawTexture)>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    texture_groups: HashMap<[Option<RawTexture>; TEXTURE_SLOTS], wgpu::BindGroup>,

    // Current state, snapshotted into each draw.
    target: Option<RawTarget>,
    key: PipelineKey,
    geometry: Option<RawGeometry>,
    bound_textures: [Option<RawTexture>; TEXTURE_SLOTS],
    viewport: Option<Viewport>,

    passes: Vec<PassRecord>,
    frame_uniforms: FrameUniforms,
    object_uniforms: Vec<ObjectUniforms>,

    warned_no_output: bool,
    warned_cube_unit: bool,
}

impl WgpuBackend {
    /// `color_format` is the format of the views later passed to
    /// [`set_output`](Self::set_output).
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, color_format: wgpu::TextureFormat) -> Self {
        let align = device.limits().min_uniform_buffer_offset_alignment as u64;
        let size = std::mem::size_of::<ObjectUniforms>() as u64;
        let object_stride = size.div_ceil(align) * align;

        Self {
            device,
            queue,
            color_format,
            output: None,
            output_depth: None,
            layouts: None,
            white: None,
            frame_ubo: None,
            frame_bind_group: None,
            object_ubo: None,
            object_bind_group: None,
            object_capacity: 0,
            object_stride,
            next_id: 0,
            programs: HashMap::new(),
            geometries: HashMap::new(),
            textures: HashMap::new(),
            targets: HashMap::new(),
            pipelines: HashMap::new(),
            texture_groups: HashMap::new(),
            key: PipelineKey {
                program: RawProgram(0),
                blend: None,
                depth_test: true,
                depth_write: true,
                depth_func: CompareFunc::LessEqual,
                cull: CullFace::Back,
                front_face: FrontFace::Ccw,
                color_write: true,
                stencil: None,
                topology: Default::default(),
                color_format,
            },
            target: None,
            geometry: None,
            bound_textures: [None; TEXTURE_SLOTS],
            viewport: None,
            passes: Vec::new(),
            frame_uniforms: FrameUniforms::default(),
            object_uniforms: Vec::new(),
            warned_no_output: false,
            warned_cube_unit: false,
        }
    }

    /// Sets the view the default framebuffer resolves to for this frame.
    pub fn set_output(&mut self, view: wgpu::TextureView, width: u32, height: u32) {
        self.output = Some((view, width, height));
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn current_pass(&mut self) -> &mut PassRecord {
        if self.passes.is_empty() {
            self.passes.push(PassRecord::new(self.target));
        }
        let last = self.passes.len() - 1;
        &mut self.passes[last]
    }

    fn ensure_layouts(&mut self) {
        if self.layouts.is_some() {
            return;
        }
        let layouts = Layouts::new(&self.device);

        let frame_ubo = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("orbis frame ubo"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.frame_bind_group = Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("orbis frame bind group"),
            layout: &layouts.frame,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: frame_ubo.as_entire_binding() }],
        }));
        self.frame_ubo = Some(frame_ubo);
        self.white = Some(GpuTexture::white(&self.device, &self.queue));
        self.layouts = Some(layouts);
    }

    fn ensure_object_capacity(&mut self, required: usize) {
        if required <= self.object_capacity && self.object_ubo.is_some() {
            return;
        }
        let Some(layouts) = self.layouts.as_ref() else { return };

        let new_cap = required.next_power_of_two().max(64);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("orbis object ubo"),
            size: new_cap as u64 * self.object_stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.object_bind_group = Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("orbis object bind group"),
            layout: &layouts.object,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ObjectUniforms>() as u64),
                }),
            }],
        }));
        self.object_ubo = Some(buffer);
        self.object_capacity = new_cap;
    }

    fn ensure_output_depth(&mut self, width: u32, height: u32) {
        if self.output_depth.as_ref().is_some_and(|d| d.size == (width, height)) {
            return;
        }
        self.output_depth = Some(DepthBuffer::new(&self.device, width, height));
    }

    fn ensure_pipeline(&mut self, key: &PipelineKey) -> bool {
        if self.pipelines.contains_key(key) {
            return true;
        }
        let (Some(layouts), Some(module)) = (self.layouts.as_ref(), self.programs.get(&key.program)) else {
            return false;
        };
        let pipeline = pipeline::create_pipeline(&self.device, layouts, module, key);
        self.pipelines.insert(*key, pipeline);
        true
    }

    fn ensure_texture_group(&mut self, slots: &[Option<RawTexture>; TEXTURE_SLOTS]) {
        if self.texture_groups.contains_key(slots) {
            return;
        }
        let (Some(layouts), Some(white)) = (self.layouts.as_ref(), self.white.as_ref()) else { return };

        let view_of = |slot: Option<RawTexture>| -> &wgpu::TextureView {
            slot.and_then(|t| {
                self.textures
                    .get(&t)
                    .map(|g| &g.view)
                    .or_else(|| self.targets.values().find(|(_, c)| *c == t).map(|(g, _)| &g.color))
            })
            .unwrap_or(&white.view)
        };

        let mut entries: Vec<wgpu::BindGroupEntry> = slots
            .iter()
            .enumerate()
            .map(|(i, slot)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: wgpu::BindingResource::TextureView(view_of(*slot)),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: TEXTURE_SLOTS as u32,
            resource: wgpu::BindingResource::Sampler(&layouts.sampler),
        });

        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("orbis texture bind group"),
            layout: &layouts.textures,
            entries: &entries,
        });
        self.texture_groups.insert(*slots, group);
    }

    fn encode(&mut self, passes: &[PassRecord]) -> Result<(), BackendError> {
        self.ensure_layouts();

        // Uniforms.
        self.ensure_object_capacity(self.object_uniforms.len().max(1));
        if let Some(ubo) = self.frame_ubo.as_ref() {
            self.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&self.frame_uniforms));
        }
        if let Some(ubo) = self.object_ubo.as_ref() {
            let stride = self.object_stride as usize;
            let mut bytes = vec![0u8; self.object_uniforms.len() * stride];
            for (i, u) in self.object_uniforms.iter().enumerate() {
                let src = bytemuck::bytes_of(u);
                bytes[i * stride..i * stride + src.len()].copy_from_slice(src);
            }
            if !bytes.is_empty() {
                self.queue.write_buffer(ubo, 0, &bytes);
            }
        }

        // Pipelines and texture groups.
        for pass in passes {
            for draw in &pass.draws {
                self.ensure_pipeline(&draw.key);
                self.ensure_texture_group(&draw.textures);
            }
        }

        let Some((output_view, width, height)) = self.output.take() else {
            if !self.warned_no_output {
                log::warn!("WgpuBackend: frame ended without an output view; dropped");
                self.warned_no_output = true;
            }
            return Ok(());
        };
        self.ensure_output_depth(width, height);

        let (Some(frame_group), Some(object_group), Some(output_depth)) = (
            self.frame_bind_group.as_ref(),
            self.object_bind_group.as_ref(),
            self.output_depth.as_ref(),
        ) else {
            return Err(BackendError::OutOfMemory);
        };

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("orbis frame encoder"),
        });

        for pass in passes {
            let (color_view, depth_view) = match pass.target {
                None => (&output_view, &output_depth.view),
                Some(target) => match self.targets.get(&target) {
                    Some((t, _)) => (&t.color, &t.depth.view),
                    None => continue,
                },
            };

            let load = match pass.clear_color {
                Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
                    r: c.r as f64,
                    g: c.g as f64,
                    b: c.b as f64,
                    a: c.a as f64,
                }),
                None => wgpu::LoadOp::Load,
            };
            let depth_load = match pass.clear_depth {
                Some(d) => wgpu::LoadOp::Clear(d),
                None => wgpu::LoadOp::Load,
            };
            let stencil_load = if pass.clear_depth.is_some() { wgpu::LoadOp::Clear(0) } else { wgpu::LoadOp::Load };

            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("orbis pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations { load: depth_load, store: wgpu::StoreOp::Store }),
                    stencil_ops: Some(wgpu::Operations { load: stencil_load, store: wgpu::StoreOp::Store }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_bind_group(0, frame_group, &[]);

            for draw in &pass.draws {
                let Some(pipeline) = self.pipelines.get(&draw.key) else { continue };
                let Some(geometry) = self.geometries.get(&draw.geometry) else { continue };
                let Some(textures) = self.texture_groups.get(&draw.textures) else { continue };

                rpass.set_pipeline(pipeline);
                let offset = (draw.object as u64 * self.object_stride) as u32;
                rpass.set_bind_group(1, object_group, &[offset]);
                rpass.set_bind_group(2, textures, &[]);
                if let Some(v) = draw.viewport {
                    rpass.set_viewport(v.x, v.y, v.width.max(1.0), v.height.max(1.0), 0.0, 1.0);
                }
                rpass.set_stencil_reference(draw.stencil_reference);
                rpass.set_vertex_buffer(0, geometry.vertices.slice(..));

                let range = draw.call.start..draw.call.start + draw.call.count;
                match (&geometry.indices, draw.call.indexed) {
                    (Some(indices), true) => {
                        rpass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                        rpass.draw_indexed(range, 0, 0..1);
                    }
                    _ => rpass.draw(range, 0..1),
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

impl GraphicsBackend for WgpuBackend {
    fn capabilities(&self) -> Capabilities {
        let features = self.device.features();
        let limits = self.device.limits();
        Capabilities {
            max_texture_units: TEXTURE_SLOTS as u32,
            max_texture_size: limits.max_texture_dimension_2d,
            precision: Precision::High,
            float_textures: true,
            bc_compression: features.contains(wgpu::Features::TEXTURE_COMPRESSION_BC),
            etc2_compression: features.contains(wgpu::Features::TEXTURE_COMPRESSION_ETC2),
            srgb_output: self.color_format.is_srgb(),
        }
    }

    fn begin_frame(&mut self) -> Result<(), BackendError> {
        self.passes.clear();
        self.object_uniforms.clear();
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), BackendError> {
        let passes = std::mem::take(&mut self.passes);
        self.encode(&passes)
    }

    fn compile_program(&mut self, source: &ProgramSource<'_>) -> Result<RawProgram, BackendError> {
        for entry in ["fn vs_main", "fn fs_main"] {
            if !source.wgsl.contains(entry) {
                return Err(BackendError::Compile {
                    label: source.label.to_string(),
                    message: format!("missing entry point `{entry}`"),
                });
            }
        }
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(source.label),
            source: wgpu::ShaderSource::Wgsl(source.wgsl.into()),
        });
        let program = RawProgram(self.next());
        self.programs.insert(program, module);
        Ok(program)
    }

    fn destroy_program(&mut self, program: RawProgram) {
        self.programs.remove(&program);
        self.pipelines.retain(|k, _| k.program != program);
    }

    fn upload_geometry(&mut self, upload: &GeometryUpload<'_>) -> Result<RawGeometry, BackendError> {
        let geometry = GpuGeometry::upload(&self.device, upload)?;
        let id = RawGeometry(self.next());
        self.geometries.insert(id, geometry);
        Ok(id)
    }

    fn destroy_geometry(&mut self, geometry: RawGeometry) {
        self.geometries.remove(&geometry);
    }

    fn upload_texture(&mut self, upload: &TextureUpload<'_>) -> Result<RawTexture, BackendError> {
        if !self.capabilities().supports_format(upload.format) {
            return Err(BackendError::UnsupportedFormat(upload.format));
        }
        let texture = GpuTexture::upload(&self.device, &self.queue, upload)?;
        let id = RawTexture(self.next());
        self.textures.insert(id, texture);
        Ok(id)
    }

    fn destroy_texture(&mut self, texture: RawTexture) {
        self.textures.remove(&texture);
        self.texture_groups.retain(|slots, _| !slots.contains(&Some(texture)));
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<RawTarget, BackendError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width > max || desc.height > max {
            return Err(BackendError::OutOfMemory);
        }
        let target = GpuTarget::new(&self.device, self.color_format, desc.width, desc.height);
        let id = RawTarget(self.next());
        let color = RawTexture(self.next());
        self.targets.insert(id, (target, color));
        Ok(id)
    }

    fn destroy_render_target(&mut self, target: RawTarget) {
        if self.target == Some(target) {
            self.target = None;
        }
        if let Some((_, color)) = self.targets.remove(&target) {
            self.texture_groups.retain(|slots, _| !slots.contains(&Some(color)));
        }
    }

    fn render_target_texture(&self, target: RawTarget) -> Option<RawTexture> {
        self.targets.get(&target).map(|(_, color)| *color)
    }

    fn set_render_target(&mut self, target: Option<RawTarget>) {
        self.target = target;
        self.passes.push(PassRecord::new(target));
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    fn set_blend(&mut self, blend: Option<BlendConfig>) {
        self.key.blend = blend;
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.key.depth_test = enabled;
    }

    fn set_depth_write(&mut self, enabled: bool) {
        self.key.depth_write = enabled;
    }

    fn set_depth_func(&mut self, func: CompareFunc) {
        self.key.depth_func = func;
    }

    fn set_cull_face(&mut self, cull: CullFace) {
        self.key.cull = cull;
    }

    fn set_front_face(&mut self, face: FrontFace) {
        self.key.front_face = face;
    }

    fn set_color_write(&mut self, enabled: bool) {
        self.key.color_write = enabled;
    }

    fn set_stencil(&mut self, stencil: Option<Stencil>) {
        self.key.stencil = stencil;
    }

    fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: Option<RawTexture>) {
        let Some(slot) = self.bound_textures.get_mut(unit as usize) else { return };
        if target == TextureTarget::Cube && !self.warned_cube_unit {
            log::debug!("WgpuBackend: cube texture on unit {unit} is sampled as its first face");
            self.warned_cube_unit = true;
        }
        *slot = texture;
    }

    fn use_program(&mut self, program: Option<RawProgram>) {
        self.key.program = program.unwrap_or(RawProgram(0));
    }

    fn bind_geometry(&mut self, geometry: Option<RawGeometry>) {
        self.geometry = geometry;
    }

    fn clear(&mut self, color: Option<Color>, depth: Option<f32>) {
        let pass = self.current_pass();
        if pass.draws.is_empty() {
            pass.clear_color = color.or(pass.clear_color);
            pass.clear_depth = depth.or(pass.clear_depth);
            return;
        }
        let target = pass.target;
        let mut next = PassRecord::new(target);
        next.clear_color = color;
        next.clear_depth = depth;
        self.passes.push(next);
    }

    fn set_frame_uniforms(&mut self, uniforms: &FrameUniforms) {
        self.frame_uniforms = *uniforms;
    }

    fn set_object_uniforms(&mut self, uniforms: &ObjectUniforms) {
        self.object_uniforms.push(*uniforms);
    }

    fn draw(&mut self, call: DrawCall) {
        let Some(geometry) = self.geometry else { return };
        if call.count == 0 || self.object_uniforms.is_empty() {
            return;
        }
        let record = DrawRecord {
            key: PipelineKey { topology: call.topology, ..self.key },
            geometry,
            textures: self.bound_textures,
            object: (self.object_uniforms.len() - 1) as u32,
            viewport: self.viewport,
            stencil_reference: self.key.stencil.map_or(0, |s| s.reference),
            call,
        };
        self.current_pass().draws.push(record);
    }
}
