use std::collections::{HashMap, HashSet};

use crate::material::{CompareFunc, Stencil, TextureTarget};
use crate::math::Color;

use super::{
    BackendError, BlendConfig, Capabilities, CullFace, DrawCall, FrameUniforms, FrontFace,
    GeometryUpload, GraphicsBackend, ObjectUniforms, ProgramSource, RawGeometry, RawProgram,
    RawTarget, RawTexture, RenderTargetDesc, TextureUpload, Viewport,
};

/// One call received by a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    BeginFrame,
    EndFrame,
    CompileProgram { program: RawProgram, label: String },
    DestroyProgram(RawProgram),
    UploadGeometry(RawGeometry),
    DestroyGeometry(RawGeometry),
    UploadTexture(RawTexture),
    DestroyTexture(RawTexture),
    CreateRenderTarget { target: RawTarget, width: u32, height: u32 },
    DestroyRenderTarget(RawTarget),
    SetRenderTarget(Option<RawTarget>),
    SetViewport(Viewport),
    SetBlend(Option<BlendConfig>),
    SetDepthTest(bool),
    SetDepthWrite(bool),
    SetDepthFunc(CompareFunc),
    SetCullFace(CullFace),
    SetFrontFace(FrontFace),
    SetColorWrite(bool),
    SetStencil(Option<Stencil>),
    BindTexture { unit: u32, target: TextureTarget, texture: Option<RawTexture> },
    UseProgram(Option<RawProgram>),
    BindGeometry(Option<RawGeometry>),
    Clear { color: Option<Color>, depth: Option<f32> },
    FrameUniforms,
    ObjectUniforms,
    /// Draw with the program, geometry and target bound at the time.
    Draw {
        call: DrawCall,
        program: Option<RawProgram>,
        geometry: Option<RawGeometry>,
        target: Option<RawTarget>,
    },
}

impl BackendCall {
    /// Whether the call changes fixed-function or binding state.
    pub fn is_state_change(&self) -> bool {
        matches!(
            self,
            Self::SetRenderTarget(_)
                | Self::SetViewport(_)
                | Self::SetBlend(_)
                | Self::SetDepthTest(_)
                | Self::SetDepthWrite(_)
                | Self::SetDepthFunc(_)
                | Self::SetCullFace(_)
                | Self::SetFrontFace(_)
                | Self::SetColorWrite(_)
                | Self::SetStencil(_)
                | Self::BindTexture { .. }
                | Self::UseProgram(_)
                | Self::BindGeometry(_)
        )
    }
}

/// Headless backend that logs every call.
///
/// Used by the engine's tests and usable for dry runs: resources are plain
/// counters, compiles can be made to fail by substring match.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    capabilities: Capabilities,
    next_id: u64,
    compile_count: usize,
    fail_patterns: Vec<String>,
    programs: HashSet<RawProgram>,
    geometries: HashSet<RawGeometry>,
    textures: HashSet<RawTexture>,
    targets: HashMap<RawTarget, (RawTexture, RenderTargetDesc)>,
    bound_program: Option<RawProgram>,
    bound_geometry: Option<RawGeometry>,
    bound_target: Option<RawTarget>,
    last_frame_uniforms: Option<FrameUniforms>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self { capabilities, ..Self::default() }
    }

    /// Programs whose source contains `pattern` fail to compile.
    pub fn fail_compiles_containing(&mut self, pattern: impl Into<String>) {
        self.fail_patterns.push(pattern.into());
    }

    #[inline]
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Compile attempts, failed ones included.
    #[inline]
    pub fn compile_count(&self) -> usize {
        self.compile_count
    }

    pub fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn draws(&self) -> impl Iterator<Item = &BackendCall> {
        self.calls.iter().filter(|c| matches!(c, BackendCall::Draw { .. }))
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_geometries(&self) -> usize {
        self.geometries.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn target_size(&self, target: RawTarget) -> Option<(u32, u32)> {
        self.targets.get(&target).map(|(_, d)| (d.width, d.height))
    }

    pub fn last_frame_uniforms(&self) -> Option<&FrameUniforms> {
        self.last_frame_uniforms.as_ref()
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl GraphicsBackend for RecordingBackend {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn begin_frame(&mut self) -> Result<(), BackendError> {
        self.calls.push(BackendCall::BeginFrame);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), BackendError> {
        self.calls.push(BackendCall::EndFrame);
        Ok(())
    }

    fn compile_program(&mut self, source: &ProgramSource<'_>) -> Result<RawProgram, BackendError> {
        self.compile_count += 1;
        if let Some(pattern) = self.fail_patterns.iter().find(|p| source.wgsl.contains(p.as_str())) {
            return Err(BackendError::Compile {
                label: source.label.to_string(),
                message: format!("rejected source containing '{pattern}'"),
            });
        }
        let program = RawProgram(self.next());
        self.programs.insert(program);
        self.calls.push(BackendCall::CompileProgram { program, label: source.label.to_string() });
        Ok(program)
    }

    fn destroy_program(&mut self, program: RawProgram) {
        self.programs.remove(&program);
        self.calls.push(BackendCall::DestroyProgram(program));
    }

    fn upload_geometry(&mut self, upload: &GeometryUpload<'_>) -> Result<RawGeometry, BackendError> {
        if upload.vertices.is_empty() {
            return Err(BackendError::Upload(format!("'{}' has no vertices", upload.label)));
        }
        let geometry = RawGeometry(self.next());
        self.geometries.insert(geometry);
        self.calls.push(BackendCall::UploadGeometry(geometry));
        Ok(geometry)
    }

    fn destroy_geometry(&mut self, geometry: RawGeometry) {
        self.geometries.remove(&geometry);
        self.calls.push(BackendCall::DestroyGeometry(geometry));
    }

    fn upload_texture(&mut self, upload: &TextureUpload<'_>) -> Result<RawTexture, BackendError> {
        if !self.capabilities.supports_format(upload.format) {
            return Err(BackendError::UnsupportedFormat(upload.format));
        }
        let texture = RawTexture(self.next());
        self.textures.insert(texture);
        self.calls.push(BackendCall::UploadTexture(texture));
        Ok(texture)
    }

    fn destroy_texture(&mut self, texture: RawTexture) {
        self.textures.remove(&texture);
        self.calls.push(BackendCall::DestroyTexture(texture));
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<RawTarget, BackendError> {
        let target = RawTarget(self.next());
        let color = RawTexture(self.next());
        self.targets.insert(target, (color, *desc));
        self.calls.push(BackendCall::CreateRenderTarget {
            target,
            width: desc.width,
            height: desc.height,
        });
        Ok(target)
    }

    fn destroy_render_target(&mut self, target: RawTarget) {
        self.targets.remove(&target);
        self.calls.push(BackendCall::DestroyRenderTarget(target));
    }

    fn render_target_texture(&self, target: RawTarget) -> Option<RawTexture> {
        self.targets.get(&target).map(|(color, _)| *color)
    }

    fn set_render_target(&mut self, target: Option<RawTarget>) {
        self.bound_target = target;
        self.calls.push(BackendCall::SetRenderTarget(target));
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.calls.push(BackendCall::SetViewport(viewport));
    }

    fn set_blend(&mut self, blend: Option<BlendConfig>) {
        self.calls.push(BackendCall::SetBlend(blend));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.calls.push(BackendCall::SetDepthTest(enabled));
    }

    fn set_depth_write(&mut self, enabled: bool) {
        self.calls.push(BackendCall::SetDepthWrite(enabled));
    }

    fn set_depth_func(&mut self, func: CompareFunc) {
        self.calls.push(BackendCall::SetDepthFunc(func));
    }

    fn set_cull_face(&mut self, cull: CullFace) {
        self.calls.push(BackendCall::SetCullFace(cull));
    }

    fn set_front_face(&mut self, face: FrontFace) {
        self.calls.push(BackendCall::SetFrontFace(face));
    }

    fn set_color_write(&mut self, enabled: bool) {
        self.calls.push(BackendCall::SetColorWrite(enabled));
    }

    fn set_stencil(&mut self, stencil: Option<Stencil>) {
        self.calls.push(BackendCall::SetStencil(stencil));
    }

    fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: Option<RawTexture>) {
        self.calls.push(BackendCall::BindTexture { unit, target, texture });
    }

    fn use_program(&mut self, program: Option<RawProgram>) {
        self.bound_program = program;
        self.calls.push(BackendCall::UseProgram(program));
    }

    fn bind_geometry(&mut self, geometry: Option<RawGeometry>) {
        self.bound_geometry = geometry;
        self.calls.push(BackendCall::BindGeometry(geometry));
    }

    fn clear(&mut self, color: Option<Color>, depth: Option<f32>) {
        self.calls.push(BackendCall::Clear { color, depth });
    }

    fn set_frame_uniforms(&mut self, uniforms: &FrameUniforms) {
        self.last_frame_uniforms = Some(*uniforms);
        self.calls.push(BackendCall::FrameUniforms);
    }

    fn set_object_uniforms(&mut self, _uniforms: &ObjectUniforms) {
        self.calls.push(BackendCall::ObjectUniforms);
    }

    fn draw(&mut self, call: DrawCall) {
        self.calls.push(BackendCall::Draw {
            call,
            program: self.bound_program,
            geometry: self.bound_geometry,
            target: self.bound_target,
        });
    }
}
