//! Per-frame orchestration.
//!
//! One [`Renderer::render`] call runs: drain the scene's disposal queue,
//! bring world transforms up to date, build the render list, set up the
//! per-frame uniforms, then for each item resolve its program, diff state,
//! bind buffers and draw. Transmissive items get an offscreen pre-pass of the
//! opaque bucket first.

mod config;
mod context;
mod info;
mod lights;
mod resources;

pub use config::{RendererConfig, ShadowMapType, ToneMapping};
pub use context::{RenderContext, TextureUnits};
pub use info::{FrameInfo, RendererInfo};
pub use resources::interleave;

use std::collections::{HashMap, HashSet};

use cgmath::{Matrix, Matrix3, Matrix4, SquareMatrix};

use crate::backend::{
    DrawCall, GraphicsBackend, ObjectUniforms, RawTarget, RawTexture, RenderTargetDesc, Viewport,
};
use crate::error::{EngineError, EngineResult};
use crate::geometry::{Geometry, GeometryGroup, PrimitiveTopology};
use crate::material::{params, Material, MaterialId, MaterialKind, TextureTarget};
use crate::math::{is_mirrored, Color, OPENGL_TO_WGPU_MATRIX};
use crate::program::{
    FogKind, GeometryFeatures, LightSignature, ProgramCache, ProgramEnvironment, ProgramId,
    ProgramParameters,
};
use crate::render::{RenderItem, RenderListBuilder};
use crate::scene::{Camera, Disposal, FogMode, NodeId, NodeKind, Scene};
use crate::state::StateTracker;

use lights::{clipping_plane_count, setup_frame, FrameInputs};
use resources::{GeometryCache, TextureCache};

/// Material texture slots, in unit order. The transmission target takes the
/// unit after them.
const MATERIAL_TEXTURES: [&str; 3] = [params::MAP, params::NORMAL_MAP, params::EMISSIVE_MAP];
const TEXTURE_SLOTS: usize = MATERIAL_TEXTURES.len() + 1;

/// Last program a material resolved to, with the inputs it was derived from.
struct Resolved {
    version: u32,
    env_generation: u64,
    features: GeometryFeatures,
    receive_shadow: bool,
    program: ProgramId,
}

#[derive(Default)]
struct MaterialBinding {
    current: Option<Resolved>,
    /// Every program this material acquired, one usage each.
    programs: HashMap<ProgramParameters, ProgramId>,
}

struct TransmissionTarget {
    raw: RawTarget,
    generation: u64,
    width: u32,
    height: u32,
}

/// Frame inputs that select program variants.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct EnvKey {
    lights: LightSignature,
    fog: Option<FogKind>,
}

pub struct Renderer<B: GraphicsBackend> {
    backend: B,
    config: RendererConfig,
    context: RenderContext,
    state: StateTracker,
    programs: ProgramCache,
    geometries: GeometryCache,
    textures: TextureCache,
    builder: RenderListBuilder,
    bindings: HashMap<MaterialId, MaterialBinding>,
    disposals: Vec<Disposal>,

    size: (u32, u32),
    size_generation: u64,
    transmission: Option<TransmissionTarget>,

    env: Option<EnvKey>,
    env_generation: u64,

    frame: u64,
    last_frame: FrameInfo,
    warned_items: HashSet<(NodeId, MaterialId)>,
    warned_lights: bool,
}

impl<B: GraphicsBackend> Renderer<B> {
    pub fn new(backend: B, config: RendererConfig) -> Self {
        let capabilities = backend.capabilities();
        let context = RenderContext::new(capabilities, config.output_color_space);
        log::info!(
            "renderer: {} texture units, max texture size {}, {:?} precision, sRGB encoded {}",
            capabilities.max_texture_units,
            capabilities.max_texture_size,
            capabilities.precision,
            if context.encodes_srgb_in_shader() { "in shader" } else { "on store" },
        );
        Self {
            backend,
            config,
            context,
            state: StateTracker::new(capabilities.max_texture_units),
            programs: ProgramCache::new(),
            geometries: GeometryCache::default(),
            textures: TextureCache::default(),
            builder: RenderListBuilder::new(),
            bindings: HashMap::new(),
            disposals: Vec::new(),
            size: (1, 1),
            size_generation: 0,
            transmission: None,
            env: None,
            env_generation: 0,
            frame: 0,
            last_frame: FrameInfo::default(),
            warned_items: HashSet::new(),
            warned_lights: false,
        }
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Mutable settings. Programs are re-resolved on the next frame.
    pub fn config_mut(&mut self) -> &mut RendererConfig {
        self.env_generation += 1;
        &mut self.config
    }

    #[inline]
    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Logical output size. Attachments are reallocated on the next render.
    pub fn set_size(&mut self, width: u32, height: u32) {
        let size = (width.max(1), height.max(1));
        if size != self.size {
            self.size = size;
            self.size_generation += 1;
        }
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn set_pixel_ratio(&mut self, ratio: f32) {
        if !(ratio.is_finite() && ratio > 0.0) {
            log::warn!("ignoring pixel ratio {ratio}");
            return;
        }
        if ratio != self.config.pixel_ratio {
            self.config.pixel_ratio = ratio;
            self.size_generation += 1;
        }
    }

    /// Output size in physical pixels.
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.config.pixel_ratio).round() as u32).max(1);
        (scale(self.size.0), scale(self.size.1))
    }

    pub fn info(&self) -> RendererInfo {
        RendererInfo {
            frames: self.frame,
            programs: self.programs.len(),
            compiles: self.programs.compile_count(),
            geometries: self.geometries.len(),
            textures: self.textures.len(),
            state_changes: self.state.issued(),
            last_frame: self.last_frame,
        }
    }

    /// Forgets every GPU object and all tracked state after the backend
    /// lost its context. Nothing is destroyed through the backend.
    pub fn reset_state(&mut self) {
        log::warn!("graphics context reset; dropping cached GPU state");
        self.state.reset();
        self.programs.invalidate_all();
        self.geometries.invalidate_all();
        self.textures.invalidate_all();
        self.bindings.clear();
        self.transmission = None;
        self.env = None;
        self.context = RenderContext::new(self.backend.capabilities(), self.config.output_color_space);
    }

    /// Releases every GPU object this renderer created.
    pub fn dispose(&mut self) {
        for (_, binding) in self.bindings.drain() {
            for (_, program) in binding.programs {
                self.programs.release(&mut self.backend, program);
            }
        }
        self.programs.clear(&mut self.backend);
        self.geometries.clear(&mut self.backend);
        self.textures.clear(&mut self.backend);
        if let Some(target) = self.transmission.take() {
            self.backend.destroy_render_target(target.raw);
        }
        self.state.reset();
        log::debug!("renderer disposed");
    }

    /// Renders one frame of `scene` as seen from `camera`.
    ///
    /// Only a stale camera handle or a backend frame failure is an error;
    /// problems with individual objects are logged and the object skipped.
    pub fn render(&mut self, scene: &mut Scene, camera: NodeId) -> EngineResult<FrameInfo> {
        self.drain_disposals(scene);

        let root = scene.root();
        scene.graph.update_world_transforms(root, false)?;
        match scene.graph.node(camera)?.as_camera() {
            None => return Err(EngineError::InvalidNode(camera)),
            Some(cam) if !cam.is_valid() => {
                log::warn!("camera {camera:?} has an unusable projection: {:?}", cam.projection);
                return Err(EngineError::InvalidProjection(camera));
            }
            Some(_) => {}
        }
        // Cameras outside the scene aren't reached by the root update.
        if scene.graph.root_of(camera) != root {
            scene.graph.update_world_transform(camera, true, false)?;
        }
        let scene: &Scene = scene;

        self.frame += 1;
        self.context.output_color_space = self.config.output_color_space;
        let drawing_buffer = self.drawing_buffer_size();

        let cam_node = scene.graph.node(camera)?;
        let camera_world = *cam_node.world_matrix();
        let projection = match cam_node.as_camera() {
            Some(cam) => OPENGL_TO_WGPU_MATRIX * cam.projection_matrix(),
            None => return Err(EngineError::InvalidNode(camera)),
        };

        self.builder.build(scene, camera, self.config.sort_objects)?;
        let stats = self.builder.stats();
        let list = self.builder.list();

        let setup = setup_frame(&FrameInputs {
            view: Camera::view_matrix(&camera_world),
            projection,
            camera_world,
            lights: list.lights(),
            fog: scene.fog,
            clipping_planes: &self.config.clipping_planes,
            exposure: self.config.tone_mapping_exposure,
            drawing_buffer,
            shadows: self.config.shadow_map.is_some(),
        });
        if setup.dropped_lights > 0 && !self.warned_lights {
            log::warn!("{} lights exceed the per-frame limit and are ignored", setup.dropped_lights);
            self.warned_lights = true;
        }
        self.backend.begin_frame().map_err(EngineError::Backend)?;
        self.backend.set_frame_uniforms(&setup.uniforms);

        let env = EnvKey {
            lights: setup.signature,
            fog: scene.fog.map(|f| match f.mode {
                FogMode::Linear { .. } => FogKind::Linear,
                FogMode::Exp2 { .. } => FogKind::Exp2,
            }),
        };
        if self.env != Some(env) {
            self.env = Some(env);
            self.env_generation += 1;
        }

        let transmission_target = if list.transmissive().next().is_some() {
            Self::ensure_transmission_target(
                &mut self.backend,
                &mut self.transmission,
                self.size_generation,
                drawing_buffer,
                self.config.transmission_resolution_scale,
            )
        } else {
            None
        };

        let mut info = FrameInfo { frame: self.frame, items: list.len(), culled: stats.culled, ..FrameInfo::default() };
        let clear_color = scene.background.unwrap_or(self.config.clear_color);

        let mut drawer = FrameDrawer {
            backend: &mut self.backend,
            state: &mut self.state,
            programs: &mut self.programs,
            geometries: &mut self.geometries,
            textures: &mut self.textures,
            bindings: &mut self.bindings,
            context: &mut self.context,
            warned: &mut self.warned_items,
            config: &self.config,
            scene,
            signature: setup.signature,
            env_generation: self.env_generation,
            transmission: None,
            in_transmission_pass: false,
            info: &mut info,
        };

        if let Some((target, width, height)) = transmission_target {
            drawer.in_transmission_pass = true;
            drawer.begin_pass(Some(target), Viewport::sized(width, height), clear_color);
            drawer.draw_all(list.opaque());
            drawer.in_transmission_pass = false;
            drawer.transmission = drawer.backend.render_target_texture(target);
            drawer.info.transmission_pass = true;
        }

        let (width, height) = drawing_buffer;
        drawer.begin_pass(None, Viewport::sized(width, height), clear_color);
        drawer.draw_all(list.opaque());
        drawer.draw_all(list.transmissive());
        drawer.draw_all(list.transparent());

        info.skipped += stats.skipped;
        self.backend.end_frame().map_err(EngineError::Backend)?;

        log::trace!(
            "frame {}: {} draws, {} items, {} culled, {} skipped",
            info.frame,
            info.draw_calls,
            info.items,
            info.culled,
            info.skipped
        );
        self.last_frame = info;
        Ok(info)
    }

    fn drain_disposals(&mut self, scene: &mut Scene) {
        scene.collect_disposed(&mut self.disposals);
        for disposal in self.disposals.drain(..) {
            match disposal {
                Disposal::Geometry(id) => {
                    self.geometries.release(&mut self.backend, id);
                }
                Disposal::Texture(id) => {
                    self.textures.release(&mut self.backend, id);
                }
                Disposal::Material(id) => {
                    let Some(binding) = self.bindings.remove(&id) else { continue };
                    for (_, program) in binding.programs {
                        self.programs.release(&mut self.backend, program);
                    }
                }
            }
        }
        self.builder.forget_stale(scene);
        self.warned_items
            .retain(|&(node, material)| scene.graph.contains(node) && scene.materials.contains(material));
    }

    /// Returns the transmission target, (re)creating it when the output size
    /// changed since it was allocated. Failures disable the pre-pass.
    fn ensure_transmission_target(
        backend: &mut B,
        slot: &mut Option<TransmissionTarget>,
        generation: u64,
        drawing_buffer: (u32, u32),
        scale: f32,
    ) -> Option<(RawTarget, u32, u32)> {
        if let Some(t) = slot.as_ref().filter(|t| t.generation == generation) {
            return Some((t.raw, t.width, t.height));
        }
        if let Some(stale) = slot.take() {
            backend.destroy_render_target(stale.raw);
        }

        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        let width = ((drawing_buffer.0 as f32 * scale).round() as u32).max(1);
        let height = ((drawing_buffer.1 as f32 * scale).round() as u32).max(1);
        match backend.create_render_target(&RenderTargetDesc { width, height }) {
            Ok(raw) => {
                log::debug!("transmission target allocated at {width}x{height}");
                *slot = Some(TransmissionTarget { raw, generation, width, height });
                Some((raw, width, height))
            }
            Err(err) => {
                log::warn!("transmission target ({width}x{height}) unavailable: {err}");
                None
            }
        }
    }
}

/// Disjoint borrows of the renderer for the duration of one frame's draws.
struct FrameDrawer<'a, B: GraphicsBackend> {
    backend: &'a mut B,
    state: &'a mut StateTracker,
    programs: &'a mut ProgramCache,
    geometries: &'a mut GeometryCache,
    textures: &'a mut TextureCache,
    bindings: &'a mut HashMap<MaterialId, MaterialBinding>,
    context: &'a mut RenderContext,
    warned: &'a mut HashSet<(NodeId, MaterialId)>,
    config: &'a RendererConfig,
    scene: &'a Scene,
    signature: LightSignature,
    env_generation: u64,
    /// Sampled by transmissive materials; `None` during the pre-pass.
    transmission: Option<RawTexture>,
    in_transmission_pass: bool,
    info: &'a mut FrameInfo,
}

impl<B: GraphicsBackend> FrameDrawer<'_, B> {
    fn begin_pass(&mut self, target: Option<RawTarget>, viewport: Viewport, clear: Color) {
        self.state.set_render_target(&mut *self.backend, target);
        self.state.set_viewport(&mut *self.backend, viewport);
        self.backend.clear(Some(clear), Some(1.0));
    }

    fn draw_all<'l>(&mut self, items: impl Iterator<Item = &'l RenderItem>) {
        for item in items {
            if let Err(err) = self.draw_item(item) {
                self.info.skipped += 1;
                if self.warned.insert((item.node, item.material)) {
                    log::warn!("skipping node {:?} with material {:?}: {err}", item.node, item.material);
                }
            }
        }
    }

    /// Everything fallible happens before the first state change, so a
    /// skipped item leaves the backend untouched.
    fn draw_item(&mut self, item: &RenderItem) -> EngineResult<()> {
        let scene = self.scene;
        let node = scene.graph.node(item.node)?;
        let NodeKind::Mesh(drawable) = &node.kind else {
            return Err(EngineError::InvalidNode(item.node));
        };
        let geometry = scene.geometry(item.geometry)?;
        let material = scene.material(item.material)?;
        if self.in_transmission_pass && material.is_transmissive() {
            return Ok(());
        }

        let (start, count) = element_range(geometry, item.group);
        if count == 0 {
            return Ok(());
        }

        let features = GeometryFeatures::of(geometry);
        let program_id = self.resolve_program(item.material, material, &features, drawable.receive_shadow)?;
        let program = self.programs.program(program_id).ok_or(EngineError::Disposed("program"))?;
        let raw_geometry = self.geometries.get_or_upload(&mut *self.backend, item.geometry, geometry)?;

        self.context.texture_units.reset();
        let mut textures = [(0u32, TextureTarget::D2, None::<RawTexture>); TEXTURE_SLOTS];
        for (slot, name) in textures.iter_mut().zip(MATERIAL_TEXTURES) {
            let unit = self.context.texture_units.allocate()?;
            *slot = match material.texture(name) {
                Some(id) => {
                    let texture = scene.texture(id)?;
                    let raw = self.textures.get_or_upload(&mut *self.backend, id, texture)?;
                    (unit, texture.target(), Some(raw))
                }
                None => (unit, TextureTarget::D2, None),
            };
        }
        let unit = self.context.texture_units.allocate()?;
        textures[MATERIAL_TEXTURES.len()] = (unit, TextureTarget::D2, self.transmission);

        let world = node.world_matrix();
        self.state.set_material(&mut *self.backend, material, is_mirrored(world));
        self.state.use_program(&mut *self.backend, Some(program));
        self.state.bind_geometry(&mut *self.backend, Some(raw_geometry));
        for (unit, target, texture) in textures {
            self.state.bind_texture(&mut *self.backend, unit, target, texture)?;
        }
        self.backend.set_object_uniforms(&object_uniforms(world, material));
        self.backend.draw(DrawCall {
            topology: drawable.topology,
            start,
            count,
            indexed: geometry.index().is_some(),
        });

        let info = &mut *self.info;
        info.draw_calls += 1;
        let count = count as u64;
        match drawable.topology {
            PrimitiveTopology::Triangles => info.triangles += count / 3,
            PrimitiveTopology::Lines => info.lines += count / 2,
            PrimitiveTopology::LineStrip => info.lines += count.saturating_sub(1),
            PrimitiveTopology::Points => info.points += count,
        }
        Ok(())
    }

    /// Reuses the material's last program while nothing it depends on moved;
    /// otherwise derives the variant and acquires it once per material.
    fn resolve_program(
        &mut self,
        id: MaterialId,
        material: &Material,
        features: &GeometryFeatures,
        receive_shadow: bool,
    ) -> EngineResult<ProgramId> {
        let binding = self.bindings.entry(id).or_default();
        if let Some(r) = &binding.current {
            if r.version == material.version()
                && r.env_generation == self.env_generation
                && r.features == *features
                && r.receive_shadow == receive_shadow
            {
                return Ok(r.program);
            }
        }

        let env = ProgramEnvironment {
            lights: &self.signature,
            fog: self.scene.fog.map(|f| f.mode),
            tone_mapping: self.config.tone_mapping,
            output_color_space: self.context.output_color_space,
            shadow_map: self.config.shadow_map,
            clipping_planes: clipping_plane_count(&self.config.clipping_planes),
            receive_shadow,
            capabilities: &self.context.capabilities,
        };
        let parameters = ProgramParameters::derive(material, features, &env);
        let program = match binding.programs.get(&parameters) {
            Some(&program) => program,
            None => {
                let custom = match material.kind() {
                    MaterialKind::Shader(shader) => Some(shader.source()),
                    _ => None,
                };
                let program = self.programs.acquire(&mut *self.backend, &parameters, custom)?;
                binding.programs.insert(parameters, program);
                program
            }
        };
        binding.current = Some(Resolved {
            version: material.version(),
            env_generation: self.env_generation,
            features: *features,
            receive_shadow,
            program,
        });
        Ok(program)
    }
}

/// `(start, count)` of the elements to draw: the draw range clipped to the
/// geometry, then to the group.
fn element_range(geometry: &Geometry, group: Option<GeometryGroup>) -> (u32, u32) {
    let total = geometry.element_count() as u32;
    let range = geometry.draw_range();
    let mut start = range.start.min(total);
    let mut end = range.count.map_or(total, |c| start.saturating_add(c)).min(total);
    if let Some(g) = group {
        start = start.max(g.start);
        end = end.min(g.start.saturating_add(g.count));
    }
    (start, end.saturating_sub(start))
}

fn object_uniforms(world: &Matrix4<f32>, material: &Material) -> ObjectUniforms {
    let basis = Matrix3::from_cols(world.x.truncate(), world.y.truncate(), world.z.truncate());
    let normal = basis.invert().map_or(basis, |m| m.transpose());
    let color = material.color(params::COLOR).unwrap_or(Color::white());
    let emissive = material.color(params::EMISSIVE).unwrap_or(Color::black());
    ObjectUniforms {
        model: (*world).into(),
        normal: Matrix4::from(normal).into(),
        color: color.to_array(),
        emissive: emissive.to_array(),
        params: [
            material.opacity,
            material.alpha_test(),
            material.float(params::ROUGHNESS).unwrap_or(1.0),
            material.float(params::METALNESS).unwrap_or(0.0),
        ],
        extra: [material.transmission(), 0.0, 0.0, 0.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, RecordingBackend};
    use crate::geometry::shapes;
    use crate::material::{ParamValue, Texture, TextureFormat};
    use crate::math::Vector3;
    use crate::geometry::{Attribute, COLOR};
    use crate::material::Side;
    use crate::scene::{Drawable, Fog, Light, Node};

    fn setup() -> (Renderer<RecordingBackend>, Scene, NodeId) {
        let mut renderer = Renderer::new(RecordingBackend::new(), RendererConfig::default());
        renderer.set_size(200, 100);
        let mut scene = Scene::new();
        let camera = scene.add(
            Node::camera(Camera::perspective(60.0, 2.0, 0.1, 100.0)).at(Vector3::new(0.0, 0.0, 10.0)),
        );
        (renderer, scene, camera)
    }

    fn mesh(scene: &mut Scene, material: Material, x: f32) -> (NodeId, MaterialId) {
        let geometry = scene.add_geometry(shapes::cuboid(1.0, 1.0, 1.0));
        let material = scene.add_material(material);
        let node = scene.add(Node::mesh(Drawable::new(geometry, material)).at(Vector3::new(x, 0.0, 0.0)));
        (node, material)
    }

    fn glass() -> Material {
        let mut m = Material::standard(Color::white(), 0.1, 0.0);
        m.set_transmission(1.0);
        m
    }

    fn draw_targets(backend: &RecordingBackend) -> Vec<Option<RawTarget>> {
        backend
            .draws()
            .filter_map(|c| match c {
                BackendCall::Draw { target, .. } => Some(*target),
                _ => None,
            })
            .collect()
    }

    // ── programs ────────────────────────────────────────────────────────

    #[test]
    fn meshes_with_equal_variants_share_a_program() {
        let (mut renderer, mut scene, camera) = setup();
        mesh(&mut scene, Material::basic(Color::white()), -1.0);
        mesh(&mut scene, Material::basic(Color::rgb(1.0, 0.0, 0.0)), 1.0);

        let info = renderer.render(&mut scene, camera).unwrap();
        assert_eq!(info.draw_calls, 2);
        assert_eq!(info.triangles, 24);
        assert_eq!(renderer.backend().compile_count(), 1);
        assert_eq!(renderer.info().programs, 1);
    }

    #[test]
    fn failed_compile_skips_only_that_item() {
        let (mut renderer, mut scene, camera) = setup();
        renderer.backend_mut().fail_compiles_containing("const USE_MAP: bool = true;");
        let texture = scene.add_texture(Texture::solid([255; 4]));
        mesh(&mut scene, Material::basic(Color::white()).with_param(params::MAP, ParamValue::Texture(texture)), -1.0);
        mesh(&mut scene, Material::basic(Color::white()), 1.0);

        let info = renderer.render(&mut scene, camera).unwrap();
        assert_eq!(info.draw_calls, 1);
        assert_eq!(info.skipped, 1);

        renderer.render(&mut scene, camera).unwrap();
        assert_eq!(renderer.backend().compile_count(), 2);
    }

    #[test]
    fn skip_warnings_are_dropped_with_their_node() {
        let (mut renderer, mut scene, camera) = setup();
        renderer.backend_mut().fail_compiles_containing("const USE_MAP: bool = true;");
        let texture = scene.add_texture(Texture::solid([255; 4]));
        let (node, _) =
            mesh(&mut scene, Material::basic(Color::white()).with_param(params::MAP, ParamValue::Texture(texture)), 0.0);

        renderer.render(&mut scene, camera).unwrap();
        assert_eq!(renderer.warned_items.len(), 1);

        scene.remove(node, crate::scene::ChildPolicy::Destroy).unwrap();
        renderer.render(&mut scene, camera).unwrap();
        assert!(renderer.warned_items.is_empty());
    }

    #[test]
    fn material_change_re_resolves_only_that_material() {
        let (mut renderer, mut scene, camera) = setup();
        let (_, a) = mesh(&mut scene, Material::basic(Color::white()), -1.0);
        mesh(&mut scene, Material::basic(Color::white()), 1.0);
        renderer.render(&mut scene, camera).unwrap();

        scene.material_mut(a).unwrap().set_kind(MaterialKind::Lambert);
        renderer.render(&mut scene, camera).unwrap();
        assert_eq!(renderer.backend().compile_count(), 2);
        assert_eq!(renderer.backend().live_programs(), 2);

        renderer.render(&mut scene, camera).unwrap();
        assert_eq!(renderer.backend().compile_count(), 2);
    }

    /// Two identical materials under fog, on geometry with vertex colors.
    /// `mutate` changes the first; only it may move to a new program.
    fn assert_only_mutated_recompiles(mutate: impl FnOnce(&mut Scene, MaterialId)) {
        let (mut renderer, mut scene, camera) = setup();
        scene.fog = Some(Fog { color: Color::white(), mode: FogMode::Linear { near: 1.0, far: 50.0 } });
        let cuboid = shapes::cuboid(1.0, 1.0, 1.0);
        let colors = vec![1.0; cuboid.vertex_count() * 4];
        let geometry = scene.add_geometry(cuboid.with_attribute(COLOR, Attribute::f32(colors, 4)));
        let a = scene.add_material(Material::lambert(Color::white()));
        let b = scene.add_material(Material::lambert(Color::white()));
        scene.add(Node::mesh(Drawable::new(geometry, a)).at(Vector3::new(-1.0, 0.0, 0.0)));
        scene.add(Node::mesh(Drawable::new(geometry, b)).at(Vector3::new(1.0, 0.0, 0.0)));

        renderer.render(&mut scene, camera).unwrap();
        assert_eq!(renderer.backend().compile_count(), 1);
        let shared = renderer.backend().live_programs();

        mutate(&mut scene, a);
        let info = renderer.render(&mut scene, camera).unwrap();
        assert_eq!(info.skipped, 0);
        assert_eq!(renderer.backend().compile_count(), 2);
        // `b` still holds the original program.
        assert_eq!(renderer.backend().live_programs(), shared + 1);

        renderer.render(&mut scene, camera).unwrap();
        assert_eq!(renderer.backend().compile_count(), 2);
    }

    #[test]
    fn assigning_a_map_re_resolves() {
        assert_only_mutated_recompiles(|scene, m| {
            let texture = scene.add_texture(Texture::solid([255; 4]));
            scene.material_mut(m).unwrap().set_param(params::MAP, ParamValue::Texture(texture));
        });
    }

    #[test]
    fn changing_side_re_resolves() {
        assert_only_mutated_recompiles(|scene, m| scene.material_mut(m).unwrap().set_side(Side::Double));
    }

    #[test]
    fn enabling_vertex_colors_re_resolves() {
        assert_only_mutated_recompiles(|scene, m| scene.material_mut(m).unwrap().set_vertex_colors(true));
    }

    #[test]
    fn disabling_fog_re_resolves() {
        assert_only_mutated_recompiles(|scene, m| scene.material_mut(m).unwrap().set_fog(false));
    }

    #[test]
    fn premultiplied_alpha_re_resolves() {
        assert_only_mutated_recompiles(|scene, m| scene.material_mut(m).unwrap().set_premultiplied_alpha(true));
    }

    #[test]
    fn adding_a_light_re_resolves_lit_materials() {
        let (mut renderer, mut scene, camera) = setup();
        mesh(&mut scene, Material::lambert(Color::white()), 0.0);
        renderer.render(&mut scene, camera).unwrap();
        scene.add(Node::light(Light::directional(Color::white(), 1.0)).at(Vector3::new(0.0, 5.0, 0.0)));
        renderer.render(&mut scene, camera).unwrap();
        assert_eq!(renderer.backend().compile_count(), 2);
        assert_eq!(renderer.backend().last_frame_uniforms().unwrap().light_counts, [1, 0, 0, 0]);
    }

    // ── frame structure ─────────────────────────────────────────────────

    #[test]
    fn frame_uniforms_are_set_once_per_frame() {
        let (mut renderer, mut scene, camera) = setup();
        for x in [-2.0, 0.0, 2.0] {
            mesh(&mut scene, Material::lambert(Color::white()), x);
        }
        renderer.render(&mut scene, camera).unwrap();
        assert_eq!(renderer.backend().count(|c| matches!(c, BackendCall::FrameUniforms)), 1);
        assert_eq!(renderer.backend().count(|c| matches!(c, BackendCall::ObjectUniforms)), 3);

        renderer.render(&mut scene, camera).unwrap();
        assert_eq!(renderer.backend().count(|c| matches!(c, BackendCall::FrameUniforms)), 2);
    }

    #[test]
    fn steady_frames_issue_no_state_changes() {
        let (mut renderer, mut scene, camera) = setup();
        mesh(&mut scene, Material::basic(Color::white()), 0.0);
        renderer.render(&mut scene, camera).unwrap();
        renderer.backend_mut().clear_calls();

        renderer.render(&mut scene, camera).unwrap();
        assert_eq!(renderer.backend().count(BackendCall::is_state_change), 0);
        assert_eq!(renderer.backend().draws().count(), 1);
    }

    #[test]
    fn mirrored_objects_flip_front_face() {
        let (mut renderer, mut scene, camera) = setup();
        let (node, _) = mesh(&mut scene, Material::basic(Color::white()), 0.0);
        scene.graph.set_scale(node, Vector3::new(-1.0, 1.0, 1.0)).unwrap();
        renderer.render(&mut scene, camera).unwrap();
        assert!(renderer.backend().calls().contains(&BackendCall::SetFrontFace(crate::backend::FrontFace::Cw)));
    }

    #[test]
    fn groups_draw_their_own_ranges() {
        let (mut renderer, mut scene, camera) = setup();
        let mut cuboid = shapes::cuboid(1.0, 1.0, 1.0);
        cuboid.clear_groups();
        cuboid.add_group(0, 6, 0);
        cuboid.add_group(6, 6, 1);
        let geometry = scene.add_geometry(cuboid);
        let a = scene.add_material(Material::basic(Color::white()));
        let b = scene.add_material(Material::basic(Color::black()));
        scene.add(Node::mesh(Drawable::multi(geometry, vec![a, b])));

        renderer.render(&mut scene, camera).unwrap();
        let ranges: Vec<(u32, u32)> = renderer
            .backend()
            .draws()
            .filter_map(|c| match c {
                BackendCall::Draw { call, .. } => Some((call.start, call.count)),
                _ => None,
            })
            .collect();
        assert_eq!(ranges, vec![(0, 6), (6, 6)]);
    }

    #[test]
    fn degenerate_camera_is_an_error() {
        let (mut renderer, mut scene, _) = setup();
        mesh(&mut scene, Material::basic(Color::white()), 0.0);
        let camera = scene.add(Node::camera(Camera::perspective(60.0, 2.0, 0.0, 100.0)));

        let err = renderer.render(&mut scene, camera).unwrap_err();
        assert_eq!(err, EngineError::InvalidProjection(camera));
        assert!(renderer.backend().draws().next().is_none());
        assert_eq!(renderer.info().frames, 0);
    }

    #[test]
    fn non_camera_is_rejected() {
        let (mut renderer, mut scene, _) = setup();
        let root = scene.root();
        assert_eq!(renderer.render(&mut scene, root).unwrap_err(), EngineError::InvalidNode(root));
    }

    // ── transmission ────────────────────────────────────────────────────

    #[test]
    fn transmission_prepass_draws_opaque_into_target_first() {
        let (mut renderer, mut scene, camera) = setup();
        mesh(&mut scene, Material::basic(Color::white()), -1.0);
        mesh(&mut scene, glass(), 1.0);

        let info = renderer.render(&mut scene, camera).unwrap();
        assert!(info.transmission_pass);

        let backend = renderer.backend();
        let target = backend
            .calls()
            .iter()
            .find_map(|c| match c {
                BackendCall::CreateRenderTarget { target, .. } => Some(*target),
                _ => None,
            })
            .unwrap();
        assert_eq!(draw_targets(backend), vec![Some(target), None, None]);

        let sampled = backend.render_target_texture(target);
        assert!(backend.calls().contains(&BackendCall::BindTexture {
            unit: 3,
            target: TextureTarget::D2,
            texture: sampled,
        }));
    }

    #[test]
    fn no_transmissive_items_no_prepass() {
        let (mut renderer, mut scene, camera) = setup();
        mesh(&mut scene, Material::basic(Color::white()), 0.0);
        let info = renderer.render(&mut scene, camera).unwrap();
        assert!(!info.transmission_pass);
        assert_eq!(renderer.backend().live_targets(), 0);
    }

    #[test]
    fn resize_reallocates_transmission_target_lazily() {
        let (mut renderer, mut scene, camera) = setup();
        mesh(&mut scene, glass(), 0.0);
        renderer.render(&mut scene, camera).unwrap();
        renderer.render(&mut scene, camera).unwrap();
        let creates = |b: &RecordingBackend| b.count(|c| matches!(c, BackendCall::CreateRenderTarget { .. }));
        assert_eq!(creates(renderer.backend()), 1);

        renderer.backend_mut().clear_calls();
        renderer.set_size(400, 300);
        assert!(renderer.backend().calls().is_empty());

        renderer.render(&mut scene, camera).unwrap();
        let backend = renderer.backend();
        assert_eq!(backend.count(|c| matches!(c, BackendCall::DestroyRenderTarget(_))), 1);
        assert!(backend.calls().iter().any(|c| matches!(
            c,
            BackendCall::CreateRenderTarget { width: 400, height: 300, .. }
        )));
        assert_eq!(backend.live_targets(), 1);
    }

    // ── disposal ────────────────────────────────────────────────────────

    #[test]
    fn disposing_a_material_releases_its_programs_next_frame() {
        let (mut renderer, mut scene, camera) = setup();
        let (node, material) = mesh(&mut scene, Material::basic(Color::white()), 0.0);
        renderer.render(&mut scene, camera).unwrap();
        assert_eq!(renderer.backend().live_programs(), 1);

        scene.graph.node_mut(node).unwrap().visible = false;
        scene.dispose_material(material).unwrap();
        assert_eq!(renderer.backend().live_programs(), 1);

        renderer.render(&mut scene, camera).unwrap();
        assert_eq!(renderer.backend().live_programs(), 0);
        assert_eq!(renderer.info().programs, 0);
    }

    #[test]
    fn disposed_geometry_is_freed_at_next_frame() {
        let (mut renderer, mut scene, camera) = setup();
        mesh(&mut scene, Material::basic(Color::white()), 0.0);
        renderer.render(&mut scene, camera).unwrap();
        let geometry = scene.geometries.iter().map(|(id, _)| id).next().unwrap();

        scene.dispose_geometry(geometry).unwrap();
        assert_eq!(renderer.backend().live_geometries(), 1);

        let info = renderer.render(&mut scene, camera).unwrap();
        assert_eq!(renderer.backend().live_geometries(), 0);
        assert_eq!(info.draw_calls, 0);
        assert_eq!(info.skipped, 1);
    }

    #[test]
    fn unsupported_texture_skips_item_and_frame_completes() {
        let (mut renderer, mut scene, camera) = setup();
        let texture = scene.add_texture(Texture::new_2d(4, 4, TextureFormat::Bc1Rgba, vec![0; 8]));
        mesh(&mut scene, Material::basic(Color::white()).with_param(params::MAP, ParamValue::Texture(texture)), 0.0);
        let info = renderer.render(&mut scene, camera).unwrap();
        assert_eq!(info.draw_calls, 0);
        assert_eq!(info.skipped, 1);
        assert_eq!(renderer.backend().calls().last(), Some(&BackendCall::EndFrame));
    }

    #[test]
    fn context_reset_recompiles_and_reuploads() {
        let (mut renderer, mut scene, camera) = setup();
        mesh(&mut scene, Material::basic(Color::white()), 0.0);
        renderer.render(&mut scene, camera).unwrap();
        renderer.reset_state();
        renderer.render(&mut scene, camera).unwrap();
        assert_eq!(renderer.backend().compile_count(), 2);
        assert_eq!(renderer.backend().count(|c| matches!(c, BackendCall::UploadGeometry(_))), 2);
    }

    #[test]
    fn dispose_frees_everything() {
        let (mut renderer, mut scene, camera) = setup();
        let texture = scene.add_texture(Texture::solid([255; 4]));
        mesh(&mut scene, Material::basic(Color::white()).with_param(params::MAP, ParamValue::Texture(texture)), 0.0);
        mesh(&mut scene, glass(), 1.0);
        renderer.render(&mut scene, camera).unwrap();

        renderer.dispose();
        let backend = renderer.backend();
        assert_eq!(backend.live_programs(), 0);
        assert_eq!(backend.live_geometries(), 0);
        assert_eq!(backend.live_textures(), 0);
        assert_eq!(backend.live_targets(), 0);
    }

    // ── helpers ─────────────────────────────────────────────────────────

    #[test]
    fn element_range_clips_to_group_and_draw_range() {
        let mut g = shapes::cuboid(1.0, 1.0, 1.0);
        assert_eq!(element_range(&g, None), (0, 36));
        g.set_draw_range(30, None);
        assert_eq!(element_range(&g, None), (30, 6));
        let group = GeometryGroup { start: 24, count: 12, material_index: 0 };
        assert_eq!(element_range(&g, Some(group)), (30, 6));
        g.set_draw_range(0, Some(10));
        assert_eq!(element_range(&g, Some(group)), (24, 0));
    }
}
