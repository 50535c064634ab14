use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use crate::backend::{
    BackendError, GeometryUpload, GraphicsBackend, RawGeometry, RawTexture, TextureUpload, Vertex,
};
use crate::error::{EngineError, EngineResult};
use crate::geometry::{Geometry, GeometryId, COLOR, NORMAL, POSITION, UV};
use crate::material::{Texture, TextureId};

type Stream<'a> = Option<(Cow<'a, [f32]>, usize)>;

fn stream<'a>(geometry: &'a Geometry, name: &str) -> Stream<'a> {
    geometry.attribute(name).map(|a| (a.data.to_f32(a.normalized), a.item_size))
}

fn fetch<const N: usize>(stream: &Stream<'_>, i: usize, defaults: [f32; N]) -> [f32; N] {
    let Some((data, size)) = stream else { return defaults };
    let mut out = defaults;
    for (c, slot) in out.iter_mut().enumerate().take(*size) {
        if let Some(&v) = data.get(i * size + c) {
            *slot = v;
        }
    }
    out
}

/// Interleaves a geometry's attributes into the vertex layout the built-in
/// programs read. Missing streams get neutral defaults.
pub fn interleave(geometry: &Geometry, out: &mut Vec<Vertex>) {
    out.clear();
    let count = geometry.vertex_count();
    let positions = stream(geometry, POSITION);
    let normals = stream(geometry, NORMAL);
    let uvs = stream(geometry, UV);
    let colors = stream(geometry, COLOR);

    out.reserve(count);
    for i in 0..count {
        out.push(Vertex {
            position: fetch(&positions, i, [0.0; 3]),
            normal: fetch(&normals, i, [0.0, 0.0, 1.0]),
            uv: fetch(&uvs, i, [0.0; 2]),
            color: fetch(&colors, i, [1.0; 4]),
        });
    }
}

struct Uploaded<R> {
    raw: R,
    version: u32,
}

/// Geometry buffers keyed by id, re-uploaded when the geometry version moves.
#[derive(Default)]
pub struct GeometryCache {
    entries: HashMap<GeometryId, Uploaded<RawGeometry>>,
    /// Version whose upload failed; not retried until the version changes.
    failed: HashMap<GeometryId, (u32, BackendError)>,
    scratch: Vec<Vertex>,
}

impl GeometryCache {
    pub fn get_or_upload<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        id: GeometryId,
        geometry: &Geometry,
    ) -> EngineResult<RawGeometry> {
        let version = geometry.version();
        if let Some(entry) = self.entries.get(&id) {
            if entry.version == version {
                return Ok(entry.raw);
            }
        }
        if let Some((failed, err)) = self.failed.get(&id) {
            if *failed == version {
                return Err(EngineError::Backend(err.clone()));
            }
        }
        if let Some(stale) = self.entries.remove(&id) {
            backend.destroy_geometry(stale.raw);
        }

        interleave(geometry, &mut self.scratch);
        let label = format!("geometry {id:?}");
        let upload = GeometryUpload { label: &label, vertices: &self.scratch, indices: geometry.index() };
        match backend.upload_geometry(&upload) {
            Ok(raw) => {
                log::debug!("uploaded {label} ({} vertices, version {version})", self.scratch.len());
                self.failed.remove(&id);
                self.entries.insert(id, Uploaded { raw, version });
                Ok(raw)
            }
            Err(err) => {
                log::warn!("{label} upload failed: {err}");
                self.failed.insert(id, (version, err.clone()));
                Err(EngineError::Backend(err))
            }
        }
    }

    pub fn release<B: GraphicsBackend>(&mut self, backend: &mut B, id: GeometryId) -> bool {
        self.failed.remove(&id);
        match self.entries.remove(&id) {
            Some(entry) => {
                backend.destroy_geometry(entry.raw);
                true
            }
            None => false,
        }
    }

    pub fn clear<B: GraphicsBackend>(&mut self, backend: &mut B) {
        for (_, entry) in self.entries.drain() {
            backend.destroy_geometry(entry.raw);
        }
        self.failed.clear();
    }

    /// Forgets every upload without touching the backend.
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
        self.failed.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Texture uploads keyed by id, re-uploaded when the texture version moves.
#[derive(Default)]
pub struct TextureCache {
    entries: HashMap<TextureId, Uploaded<RawTexture>>,
    failed: HashMap<TextureId, (u32, BackendError)>,
    warned: HashSet<TextureId>,
}

impl TextureCache {
    pub fn get_or_upload<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        id: TextureId,
        texture: &Texture,
    ) -> EngineResult<RawTexture> {
        let version = texture.version();
        if let Some(entry) = self.entries.get(&id) {
            if entry.version == version {
                return Ok(entry.raw);
            }
        }
        if let Some((failed, err)) = self.failed.get(&id) {
            if *failed == version {
                return Err(EngineError::Backend(err.clone()));
            }
        }
        if let Some(stale) = self.entries.remove(&id) {
            backend.destroy_texture(stale.raw);
        }

        if !texture.is_complete() {
            if self.warned.insert(id) {
                log::warn!(
                    "texture {id:?} ({}x{} {:?}) has {} bytes of data; not uploaded",
                    texture.width(),
                    texture.height(),
                    texture.format(),
                    texture.data().len()
                );
            }
            let err = BackendError::Upload(format!("texture {id:?} is incomplete"));
            self.failed.insert(id, (version, err.clone()));
            return Err(EngineError::Backend(err));
        }

        let label = if texture.name.is_empty() { format!("texture {id:?}") } else { texture.name.clone() };
        let upload = TextureUpload {
            label: &label,
            width: texture.width(),
            height: texture.height(),
            format: texture.format(),
            target: texture.target(),
            color_space: texture.color_space(),
            data: texture.data(),
        };
        match backend.upload_texture(&upload) {
            Ok(raw) => {
                log::debug!("uploaded texture '{label}' (version {version})");
                self.failed.remove(&id);
                self.entries.insert(id, Uploaded { raw, version });
                Ok(raw)
            }
            Err(err) => {
                if self.warned.insert(id) {
                    log::warn!("texture '{label}' upload failed: {err}");
                }
                self.failed.insert(id, (version, err.clone()));
                Err(EngineError::Backend(err))
            }
        }
    }

    pub fn release<B: GraphicsBackend>(&mut self, backend: &mut B, id: TextureId) -> bool {
        self.failed.remove(&id);
        self.warned.remove(&id);
        match self.entries.remove(&id) {
            Some(entry) => {
                backend.destroy_texture(entry.raw);
                true
            }
            None => false,
        }
    }

    pub fn clear<B: GraphicsBackend>(&mut self, backend: &mut B) {
        for (_, entry) in self.entries.drain() {
            backend.destroy_texture(entry.raw);
        }
        self.failed.clear();
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
        self.failed.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
