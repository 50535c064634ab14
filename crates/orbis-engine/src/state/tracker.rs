use crate::backend::{
    BlendConfig, CullFace, FrontFace, GraphicsBackend, RawGeometry, RawProgram, RawTarget,
    RawTexture, Viewport,
};
use crate::error::{EngineError, EngineResult};
use crate::material::{Blending, CompareFunc, Material, Side, Stencil, TextureTarget};

use super::blend::blend_config;

/// Applies `value` through `apply` unless it equals the last applied value.
fn diff<T: PartialEq + Copy>(slot: &mut Option<T>, value: T, apply: impl FnOnce(T)) -> bool {
    if *slot == Some(value) {
        return false;
    }
    *slot = Some(value);
    apply(value);
    true
}

/// Shadow copy of the backend's fixed-function and binding state.
///
/// Every channel starts unknown (`None`), so the first setter call always
/// reaches the backend. Setters return whether a backend call was issued.
pub struct StateTracker {
    blend: Option<Option<BlendConfig>>,
    depth_test: Option<bool>,
    depth_write: Option<bool>,
    depth_func: Option<CompareFunc>,
    cull_face: Option<CullFace>,
    front_face: Option<FrontFace>,
    color_write: Option<bool>,
    stencil: Option<Option<Stencil>>,
    program: Option<Option<RawProgram>>,
    geometry: Option<Option<RawGeometry>>,
    render_target: Option<Option<RawTarget>>,
    viewport: Option<Viewport>,
    textures: Vec<Option<(TextureTarget, Option<RawTexture>)>>,
    max_texture_units: u32,
    issued: u64,
}

impl StateTracker {
    pub fn new(max_texture_units: u32) -> Self {
        Self {
            blend: None,
            depth_test: None,
            depth_write: None,
            depth_func: None,
            cull_face: None,
            front_face: None,
            color_write: None,
            stencil: None,
            program: None,
            geometry: None,
            render_target: None,
            viewport: None,
            textures: vec![None; max_texture_units as usize],
            max_texture_units,
            issued: 0,
        }
    }

    /// Backend calls issued since construction.
    #[inline]
    pub fn issued(&self) -> u64 {
        self.issued
    }

    #[inline]
    fn count(&mut self, changed: bool) -> bool {
        if changed {
            self.issued += 1;
        }
        changed
    }

    pub fn set_blending<B: GraphicsBackend>(&mut self, backend: &mut B, blending: Blending, premultiplied_alpha: bool) -> bool {
        let config = blend_config(blending, premultiplied_alpha);
        let changed = diff(&mut self.blend, config, |v| backend.set_blend(v));
        self.count(changed)
    }

    pub fn set_depth_test<B: GraphicsBackend>(&mut self, backend: &mut B, enabled: bool) -> bool {
        let changed = diff(&mut self.depth_test, enabled, |v| backend.set_depth_test(v));
        self.count(changed)
    }

    pub fn set_depth_write<B: GraphicsBackend>(&mut self, backend: &mut B, enabled: bool) -> bool {
        let changed = diff(&mut self.depth_write, enabled, |v| backend.set_depth_write(v));
        self.count(changed)
    }

    pub fn set_depth_func<B: GraphicsBackend>(&mut self, backend: &mut B, func: CompareFunc) -> bool {
        let changed = diff(&mut self.depth_func, func, |v| backend.set_depth_func(v));
        self.count(changed)
    }

    pub fn set_cull_face<B: GraphicsBackend>(&mut self, backend: &mut B, cull: CullFace) -> bool {
        let changed = diff(&mut self.cull_face, cull, |v| backend.set_cull_face(v));
        self.count(changed)
    }

    pub fn set_front_face<B: GraphicsBackend>(&mut self, backend: &mut B, face: FrontFace) -> bool {
        let changed = diff(&mut self.front_face, face, |v| backend.set_front_face(v));
        self.count(changed)
    }

    pub fn set_color_write<B: GraphicsBackend>(&mut self, backend: &mut B, enabled: bool) -> bool {
        let changed = diff(&mut self.color_write, enabled, |v| backend.set_color_write(v));
        self.count(changed)
    }

    pub fn set_stencil<B: GraphicsBackend>(&mut self, backend: &mut B, stencil: Option<Stencil>) -> bool {
        let changed = diff(&mut self.stencil, stencil, |v| backend.set_stencil(v));
        self.count(changed)
    }

    pub fn use_program<B: GraphicsBackend>(&mut self, backend: &mut B, program: Option<RawProgram>) -> bool {
        let changed = diff(&mut self.program, program, |v| backend.use_program(v));
        self.count(changed)
    }

    pub fn bind_geometry<B: GraphicsBackend>(&mut self, backend: &mut B, geometry: Option<RawGeometry>) -> bool {
        let changed = diff(&mut self.geometry, geometry, |v| backend.bind_geometry(v));
        self.count(changed)
    }

    pub fn set_render_target<B: GraphicsBackend>(&mut self, backend: &mut B, target: Option<RawTarget>) -> bool {
        let changed = diff(&mut self.render_target, target, |v| backend.set_render_target(v));
        self.count(changed)
    }

    pub fn set_viewport<B: GraphicsBackend>(&mut self, backend: &mut B, viewport: Viewport) -> bool {
        let changed = diff(&mut self.viewport, viewport, |v| backend.set_viewport(v));
        self.count(changed)
    }

    /// Binds `texture` to `unit`. Rebinding the same `(target, texture)` pair
    /// is free.
    pub fn bind_texture<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        unit: u32,
        target: TextureTarget,
        texture: Option<RawTexture>,
    ) -> EngineResult<bool> {
        let max = self.max_texture_units;
        let Some(slot) = self.textures.get_mut(unit as usize) else {
            return Err(EngineError::TextureUnitOutOfRange { unit, max });
        };
        let changed = diff(slot, (target, texture), |(t, tex)| backend.bind_texture(unit, t, tex));
        Ok(self.count(changed))
    }

    /// Applies every render-state channel a material controls.
    ///
    /// `flip_sided` mirrors the winding for objects whose world matrix has a
    /// negative determinant.
    pub fn set_material<B: GraphicsBackend>(&mut self, backend: &mut B, material: &Material, flip_sided: bool) {
        let cull = match material.side() {
            Side::Front => CullFace::Back,
            Side::Back => CullFace::Front,
            Side::Double => CullFace::None,
        };
        let front = if flip_sided { FrontFace::Cw } else { FrontFace::Ccw };
        let blending = if material.transparent { material.blending } else { Blending::None };

        self.set_blending(backend, blending, material.premultiplied_alpha());
        self.set_depth_test(backend, material.depth_test);
        self.set_depth_write(backend, material.depth_write);
        self.set_depth_func(backend, material.depth_func);
        self.set_cull_face(backend, cull);
        self.set_front_face(backend, front);
        self.set_color_write(backend, material.color_write);
        self.set_stencil(backend, material.stencil);
    }

    /// Forgets every channel so the next call of each setter re-applies.
    pub fn reset(&mut self) {
        let max = self.max_texture_units;
        let issued = self.issued;
        *self = Self::new(max);
        self.issued = issued;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, Capabilities, RecordingBackend};
    use crate::math::Color;

    fn setup() -> (StateTracker, RecordingBackend) {
        (StateTracker::new(4), RecordingBackend::new())
    }

    // ── dedupe ──────────────────────────────────────────────────────────

    #[test]
    fn repeated_setter_issues_one_call() {
        let (mut state, mut backend) = setup();
        assert!(state.set_depth_test(&mut backend, true));
        assert!(!state.set_depth_test(&mut backend, true));
        assert!(!state.set_depth_test(&mut backend, true));
        assert_eq!(backend.calls(), &[BackendCall::SetDepthTest(true)]);
        assert!(state.set_depth_test(&mut backend, false));
        assert_eq!(backend.calls().len(), 2);
    }

    #[test]
    fn channels_are_independent() {
        let (mut state, mut backend) = setup();
        state.set_depth_write(&mut backend, true);
        state.set_color_write(&mut backend, true);
        state.set_depth_test(&mut backend, true);
        assert!(!state.set_depth_write(&mut backend, true));
        assert!(state.set_color_write(&mut backend, false));
        assert_eq!(backend.calls().len(), 4);
    }

    #[test]
    fn blending_compares_resolved_config() {
        let (mut state, mut backend) = setup();
        assert!(state.set_blending(&mut backend, Blending::Normal, false));
        assert!(!state.set_blending(&mut backend, Blending::Normal, false));
        assert!(state.set_blending(&mut backend, Blending::Normal, true));
        assert!(state.set_blending(&mut backend, Blending::None, true));
        assert!(!state.set_blending(&mut backend, Blending::None, false));
    }

    #[test]
    fn unbinding_is_tracked_like_binding() {
        let (mut state, mut backend) = setup();
        assert!(state.use_program(&mut backend, None));
        assert!(!state.use_program(&mut backend, None));
        assert!(state.use_program(&mut backend, Some(RawProgram(3))));
        assert!(state.set_render_target(&mut backend, None));
        assert!(!state.set_render_target(&mut backend, None));
    }

    // ── textures ────────────────────────────────────────────────────────

    #[test]
    fn each_unit_holds_one_target_binding() {
        let (mut state, mut backend) = setup();
        let tex = Some(RawTexture(9));
        assert!(state.bind_texture(&mut backend, 0, TextureTarget::D2, tex).unwrap());
        assert!(!state.bind_texture(&mut backend, 0, TextureTarget::D2, tex).unwrap());
        assert!(state.bind_texture(&mut backend, 1, TextureTarget::D2, tex).unwrap());
        assert!(state.bind_texture(&mut backend, 0, TextureTarget::Cube, Some(RawTexture(4))).unwrap());
        // The cube replaced the 2D binding on unit 0.
        assert!(state.bind_texture(&mut backend, 0, TextureTarget::D2, tex).unwrap());
        assert_eq!(backend.count(|c| matches!(c, BackendCall::BindTexture { unit: 0, .. })), 3);
    }

    #[test]
    fn unit_past_limit_is_an_error() {
        let caps = Capabilities { max_texture_units: 2, ..Capabilities::default() };
        let mut state = StateTracker::new(caps.max_texture_units);
        let mut backend = RecordingBackend::with_capabilities(caps);
        let err = state.bind_texture(&mut backend, 2, TextureTarget::D2, None).unwrap_err();
        assert_eq!(err, EngineError::TextureUnitOutOfRange { unit: 2, max: 2 });
        assert!(backend.calls().is_empty());
    }

    // ── reset ───────────────────────────────────────────────────────────

    #[test]
    fn reset_forces_reapply() {
        let (mut state, mut backend) = setup();
        state.set_viewport(&mut backend, Viewport::sized(10, 10));
        state.bind_texture(&mut backend, 0, TextureTarget::D2, None).unwrap();
        state.reset();
        assert!(state.set_viewport(&mut backend, Viewport::sized(10, 10)));
        assert!(state.bind_texture(&mut backend, 0, TextureTarget::D2, None).unwrap());
        assert_eq!(state.issued(), 4);
    }

    // ── materials ───────────────────────────────────────────────────────

    #[test]
    fn same_material_twice_costs_nothing() {
        let (mut state, mut backend) = setup();
        let m = Material::basic(Color::white());
        state.set_material(&mut backend, &m, false);
        let first = backend.calls().len();
        state.set_material(&mut backend, &m, false);
        assert_eq!(backend.calls().len(), first);

        state.set_material(&mut backend, &m, true);
        assert_eq!(backend.calls().last(), Some(&BackendCall::SetFrontFace(FrontFace::Cw)));
    }

    #[test]
    fn opaque_materials_never_blend() {
        let (mut state, mut backend) = setup();
        let m = Material::basic(Color::white());
        assert!(!m.transparent);
        state.set_material(&mut backend, &m, false);
        assert!(backend.calls().contains(&BackendCall::SetBlend(None)));
    }
}
