use crate::arena::Arena;
use crate::error::{EngineError, EngineResult};
use crate::geometry::{Geometry, GeometryId};
use crate::material::{Material, MaterialId, Texture, TextureId};
use crate::math::Color;

use super::graph::{ChildPolicy, SceneGraph};
use super::node::{Node, NodeId};

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum FogMode {
    Linear { near: f32, far: f32 },
    Exp2 { density: f32 },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Fog {
    pub color: Color,
    pub mode: FogMode,
}

/// Asset released through [`Scene::dispose_geometry`] and friends, waiting
/// for the renderer's next frame to free its GPU side.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Disposal {
    Geometry(GeometryId),
    Material(MaterialId),
    Texture(TextureId),
}

/// Graph plus the assets its drawables reference.
pub struct Scene {
    pub graph: SceneGraph,
    pub geometries: Arena<Geometry>,
    pub materials: Arena<Material>,
    pub textures: Arena<Texture>,
    pub fog: Option<Fog>,
    /// Clear color; `None` keeps the renderer's configured clear color.
    pub background: Option<Color>,
    root: NodeId,
    disposals: Vec<Disposal>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        let mut graph = SceneGraph::new();
        let root = graph.create(Node::group().named("scene"));
        Self {
            graph,
            geometries: Arena::new(),
            materials: Arena::new(),
            textures: Arena::new(),
            fog: None,
            background: None,
            root,
            disposals: Vec::new(),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Creates `node` and attaches it under the scene root.
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = self.graph.create(node);
        // Fresh handles can't fail validation or form cycles.
        if let Err(err) = self.graph.attach(self.root, id) {
            log::error!("Scene::add: {err}");
        }
        id
    }

    /// Creates `node` under an existing parent.
    pub fn add_to(&mut self, parent: NodeId, node: Node) -> EngineResult<NodeId> {
        self.graph.node(parent)?;
        let id = self.graph.create(node);
        self.graph.attach(parent, id)?;
        Ok(id)
    }

    pub fn remove(&mut self, id: NodeId, policy: ChildPolicy) -> EngineResult<usize> {
        self.graph.remove(id, policy)
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.insert(geometry)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.insert(material)
    }

    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        self.textures.insert(texture)
    }

    pub fn geometry(&self, id: GeometryId) -> EngineResult<&Geometry> {
        self.geometries.get(id).ok_or(EngineError::InvalidGeometry(id))
    }

    pub fn geometry_mut(&mut self, id: GeometryId) -> EngineResult<&mut Geometry> {
        self.geometries.get_mut(id).ok_or(EngineError::InvalidGeometry(id))
    }

    pub fn material(&self, id: MaterialId) -> EngineResult<&Material> {
        self.materials.get(id).ok_or(EngineError::InvalidMaterial(id))
    }

    pub fn material_mut(&mut self, id: MaterialId) -> EngineResult<&mut Material> {
        self.materials.get_mut(id).ok_or(EngineError::InvalidMaterial(id))
    }

    pub fn texture(&self, id: TextureId) -> EngineResult<&Texture> {
        self.textures.get(id).ok_or(EngineError::InvalidTexture(id))
    }

    pub fn texture_mut(&mut self, id: TextureId) -> EngineResult<&mut Texture> {
        self.textures.get_mut(id).ok_or(EngineError::InvalidTexture(id))
    }

    // ── disposal ────────────────────────────────────────────────────────

    /// Queues the geometry for release at the start of the next frame.
    pub fn dispose_geometry(&mut self, id: GeometryId) -> EngineResult<()> {
        self.geometry(id)?;
        self.enqueue(Disposal::Geometry(id));
        Ok(())
    }

    pub fn dispose_material(&mut self, id: MaterialId) -> EngineResult<()> {
        self.material(id)?;
        self.enqueue(Disposal::Material(id));
        Ok(())
    }

    pub fn dispose_texture(&mut self, id: TextureId) -> EngineResult<()> {
        self.texture(id)?;
        self.enqueue(Disposal::Texture(id));
        Ok(())
    }

    fn enqueue(&mut self, d: Disposal) {
        if !self.disposals.contains(&d) {
            self.disposals.push(d);
        }
    }

    #[inline]
    pub fn pending_disposals(&self) -> &[Disposal] {
        &self.disposals
    }

    /// Removes queued assets from their stores and moves the queue into `out`.
    pub fn collect_disposed(&mut self, out: &mut Vec<Disposal>) {
        for d in self.disposals.drain(..) {
            let removed = match d {
                Disposal::Geometry(id) => self.geometries.remove(id).is_some(),
                Disposal::Material(id) => self.materials.remove(id).is_some(),
                Disposal::Texture(id) => self.textures.remove(id).is_some(),
            };
            if removed {
                out.push(d);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::shapes;
    use crate::material::Material;

    #[test]
    fn add_attaches_under_root() {
        let mut scene = Scene::new();
        let n = scene.add(Node::group());
        assert_eq!(scene.graph.node(n).unwrap().parent(), Some(scene.root()));
    }

    #[test]
    fn disposal_is_deferred_until_collected() {
        let mut scene = Scene::new();
        let g = scene.add_geometry(shapes::plane(1.0, 1.0));
        let m = scene.add_material(Material::basic(Color::white()));

        scene.dispose_geometry(g).unwrap();
        scene.dispose_material(m).unwrap();
        scene.dispose_material(m).unwrap();
        assert!(scene.geometry(g).is_ok());
        assert_eq!(scene.pending_disposals().len(), 2);

        let mut out = Vec::new();
        scene.collect_disposed(&mut out);
        assert_eq!(out, vec![Disposal::Geometry(g), Disposal::Material(m)]);
        assert_eq!(scene.geometry(g).err(), Some(EngineError::InvalidGeometry(g)));
        assert!(scene.dispose_material(m).is_err());
    }
}
