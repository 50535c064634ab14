use std::collections::HashMap;

use crate::backend::{BackendError, GraphicsBackend, ProgramSource, RawProgram};
use crate::error::{EngineError, EngineResult};
use crate::material::{Material, MaterialKind};

use super::parameters::{GeometryFeatures, ProgramEnvironment, ProgramParameters};
use super::source;

/// Cache-issued program handle. Monotonic; never reused after release.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ProgramId(u64);

impl ProgramId {
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

struct ProgramEntry {
    parameters: ProgramParameters,
    program: RawProgram,
    usage: u32,
}

/// Compiled program variants keyed by [`ProgramParameters`], reference
/// counted per acquisition.
#[derive(Default)]
pub struct ProgramCache {
    by_key: HashMap<ProgramParameters, ProgramId>,
    entries: HashMap<ProgramId, ProgramEntry>,
    failed: HashMap<ProgramParameters, BackendError>,
    next_id: u64,
    compiles: usize,
}

impl ProgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives the variant for `material` and acquires it.
    pub fn resolve<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        material: &Material,
        geometry: &GeometryFeatures,
        env: &ProgramEnvironment<'_>,
    ) -> EngineResult<ProgramId> {
        let parameters = ProgramParameters::derive(material, geometry, env);
        let custom = match material.kind() {
            MaterialKind::Shader(shader) => Some(shader.source()),
            _ => None,
        };
        self.acquire(backend, &parameters, custom)
    }

    /// Returns the program for `parameters`, compiling it on first request.
    ///
    /// Every successful call adds one usage that must be paired with a
    /// [`release`](Self::release). A failed compile is remembered and returned
    /// again without another compile until [`invalidate_all`](Self::invalidate_all).
    pub fn acquire<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        parameters: &ProgramParameters,
        custom_source: Option<&str>,
    ) -> EngineResult<ProgramId> {
        if let Some(&id) = self.by_key.get(parameters) {
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.usage += 1;
                return Ok(id);
            }
        }
        if let Some(err) = self.failed.get(parameters) {
            return Err(EngineError::Backend(err.clone()));
        }

        let label = parameters.cache_key();
        let wgsl = source::assemble(parameters, custom_source);
        self.compiles += 1;
        let program = match backend.compile_program(&ProgramSource { label: &label, wgsl: &wgsl }) {
            Ok(program) => program,
            Err(err) => {
                log::error!("program '{label}' failed to compile: {err}");
                self.failed.insert(parameters.clone(), err.clone());
                return Err(EngineError::Backend(err));
            }
        };
        log::debug!("compiled program '{label}'");

        self.next_id += 1;
        let id = ProgramId(self.next_id);
        self.by_key.insert(parameters.clone(), id);
        self.entries.insert(id, ProgramEntry { parameters: parameters.clone(), program, usage: 1 });
        Ok(id)
    }

    /// Drops one usage. Returns `true` when that destroyed the program.
    pub fn release<B: GraphicsBackend>(&mut self, backend: &mut B, id: ProgramId) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else { return false };
        entry.usage = entry.usage.saturating_sub(1);
        if entry.usage > 0 {
            return false;
        }
        if let Some(entry) = self.entries.remove(&id) {
            self.by_key.remove(&entry.parameters);
            backend.destroy_program(entry.program);
        }
        true
    }

    #[inline]
    pub fn program(&self, id: ProgramId) -> Option<RawProgram> {
        self.entries.get(&id).map(|e| e.program)
    }

    pub fn usage(&self, id: ProgramId) -> u32 {
        self.entries.get(&id).map_or(0, |e| e.usage)
    }

    pub fn parameters(&self, id: ProgramId) -> Option<&ProgramParameters> {
        self.entries.get(&id).map(|e| &e.parameters)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compile attempts over the cache's lifetime, failures included.
    #[inline]
    pub fn compile_count(&self) -> usize {
        self.compiles
    }

    /// Forgets every program without touching the backend; used after the
    /// backend lost its context and its programs with it. Failed keys become
    /// retryable. Issued handles stay dead.
    pub fn invalidate_all(&mut self) {
        self.by_key.clear();
        self.entries.clear();
        self.failed.clear();
    }

    /// Destroys every live program.
    pub fn clear<B: GraphicsBackend>(&mut self, backend: &mut B) {
        for (_, entry) in self.entries.drain() {
            backend.destroy_program(entry.program);
        }
        self.by_key.clear();
        self.failed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Capabilities, RecordingBackend};
    use crate::math::{Color, ColorSpace};
    use crate::program::LightSignature;
    use crate::renderer::ToneMapping;

    fn env<'a>(lights: &'a LightSignature, caps: &'a Capabilities) -> ProgramEnvironment<'a> {
        ProgramEnvironment {
            lights,
            fog: None,
            tone_mapping: ToneMapping::None,
            output_color_space: ColorSpace::Srgb,
            shadow_map: None,
            clipping_planes: 0,
            receive_shadow: false,
            capabilities: caps,
        }
    }

    fn resolve(cache: &mut ProgramCache, backend: &mut RecordingBackend, m: &Material) -> EngineResult<ProgramId> {
        let lights = LightSignature::default();
        let caps = Capabilities::default();
        cache.resolve(backend, m, &GeometryFeatures::default(), &env(&lights, &caps))
    }

    // ── sharing ─────────────────────────────────────────────────────────

    #[test]
    fn identical_materials_share_one_program() {
        let mut backend = RecordingBackend::new();
        let mut cache = ProgramCache::new();
        let a = resolve(&mut cache, &mut backend, &Material::basic(Color::white())).unwrap();
        let b = resolve(&mut cache, &mut backend, &Material::basic(Color::rgb(1.0, 0.0, 0.0))).unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.usage(a), 2);
        assert_eq!(cache.compile_count(), 1);
        assert_eq!(backend.compile_count(), 1);
    }

    #[test]
    fn compile_count_matches_distinct_keys() {
        let mut backend = RecordingBackend::new();
        let mut cache = ProgramCache::new();
        let materials = [
            Material::basic(Color::white()),
            Material::lambert(Color::white()),
            Material::standard(Color::white(), 0.5, 0.5),
            Material::basic(Color::black()),
            Material::lambert(Color::black()),
        ];
        for m in &materials {
            resolve(&mut cache, &mut backend, m).unwrap();
        }
        assert_eq!(cache.compile_count(), 3);
        assert_eq!(cache.len(), 3);
    }

    // ── release ─────────────────────────────────────────────────────────

    #[test]
    fn release_to_zero_destroys_and_next_acquire_recompiles_with_new_handle() {
        let mut backend = RecordingBackend::new();
        let mut cache = ProgramCache::new();
        let m = Material::basic(Color::white());

        let first = resolve(&mut cache, &mut backend, &m).unwrap();
        resolve(&mut cache, &mut backend, &m).unwrap();
        assert!(!cache.release(&mut backend, first));
        assert!(cache.release(&mut backend, first));
        assert!(cache.is_empty());
        assert_eq!(backend.live_programs(), 0);

        let second = resolve(&mut cache, &mut backend, &m).unwrap();
        assert_ne!(first, second);
        assert_eq!(cache.compile_count(), 2);
    }

    #[test]
    fn release_of_unknown_handle_is_noop() {
        let mut backend = RecordingBackend::new();
        let mut cache = ProgramCache::new();
        let id = resolve(&mut cache, &mut backend, &Material::basic(Color::white())).unwrap();
        assert!(cache.release(&mut backend, id));
        assert!(!cache.release(&mut backend, id));
    }

    // ── failures ────────────────────────────────────────────────────────

    #[test]
    fn failed_compile_is_not_retried() {
        let mut backend = RecordingBackend::new();
        backend.fail_compiles_containing("broken_entry");
        let mut cache = ProgramCache::new();
        let m = Material::shader("fn broken_entry() {}");

        let err = resolve(&mut cache, &mut backend, &m).unwrap_err();
        assert!(matches!(err, EngineError::Backend(BackendError::Compile { .. })));
        assert!(resolve(&mut cache, &mut backend, &m).is_err());
        assert_eq!(backend.compile_count(), 1);

        // Unrelated materials still compile.
        assert!(resolve(&mut cache, &mut backend, &Material::basic(Color::white())).is_ok());
    }

    #[test]
    fn invalidation_makes_failures_retryable() {
        let mut backend = RecordingBackend::new();
        backend.fail_compiles_containing("broken_entry");
        let mut cache = ProgramCache::new();
        let m = Material::shader("fn broken_entry() {}");
        assert!(resolve(&mut cache, &mut backend, &m).is_err());
        cache.invalidate_all();
        assert!(resolve(&mut cache, &mut backend, &m).is_err());
        assert_eq!(backend.compile_count(), 2);
    }

    #[test]
    fn clear_destroys_all_programs() {
        let mut backend = RecordingBackend::new();
        let mut cache = ProgramCache::new();
        resolve(&mut cache, &mut backend, &Material::basic(Color::white())).unwrap();
        resolve(&mut cache, &mut backend, &Material::lambert(Color::white())).unwrap();
        cache.clear(&mut backend);
        assert_eq!(backend.live_programs(), 0);
        assert!(cache.is_empty());
    }
}
