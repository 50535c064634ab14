use cgmath::{Matrix4, One, Quaternion, SquareMatrix, Vector3};

use crate::arena::Handle;
use crate::geometry::{GeometryId, PrimitiveTopology};
use crate::material::MaterialId;

use super::{Camera, Light};

pub type NodeId = Handle<Node>;

/// Default layer mask: layer 0 only.
pub const DEFAULT_LAYERS: u32 = 1;

/// Transform propagation state of a node.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DirtyState {
    /// Local and world matrices are up to date.
    Clean,
    /// Position/rotation/scale changed; local matrix must be rebuilt.
    LocalDirty,
    /// Local matrix is valid but the world matrix is stale (re-parenting).
    WorldDirty,
}

/// Geometry + material binding carried by mesh nodes.
///
/// Owns no GPU resources; uploads live in the renderer's caches keyed by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    pub geometry: GeometryId,
    /// One material per geometry group. A single entry draws the whole range.
    pub materials: Vec<MaterialId>,
    pub topology: PrimitiveTopology,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Drawable {
    pub fn new(geometry: GeometryId, material: MaterialId) -> Self {
        Self::multi(geometry, vec![material])
    }

    pub fn multi(geometry: GeometryId, materials: Vec<MaterialId>) -> Self {
        Self {
            geometry,
            materials,
            topology: PrimitiveTopology::Triangles,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    #[inline]
    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    #[inline]
    pub fn material(&self) -> Option<MaterialId> {
        self.materials.first().copied()
    }
}

/// Closed set of node payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh(Drawable),
    Camera(Camera),
    Light(Light),
}

/// Scene-graph node: hierarchy links, local TRS and cached matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,

    /// Invisible nodes prune their whole subtree from rendering.
    pub visible: bool,
    /// Render priority. On group nodes a non-zero value also becomes the
    /// group order of every drawable below.
    pub render_order: i32,
    pub frustum_culled: bool,
    pub layers: u32,
    /// When false the per-frame update leaves the local matrix alone.
    pub matrix_auto_update: bool,

    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,

    pub(super) position: Vector3<f32>,
    pub(super) rotation: Quaternion<f32>,
    pub(super) scale: Vector3<f32>,

    pub(super) local: Matrix4<f32>,
    pub(super) world: Matrix4<f32>,
    pub(super) dirty: DirtyState,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: String::new(),
            kind,
            visible: true,
            render_order: 0,
            frustum_culled: true,
            layers: DEFAULT_LAYERS,
            matrix_auto_update: true,
            parent: None,
            children: Vec::new(),
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            local: Matrix4::identity(),
            world: Matrix4::identity(),
            dirty: DirtyState::Clean,
        }
    }

    #[inline]
    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    #[inline]
    pub fn mesh(drawable: Drawable) -> Self {
        Self::new(NodeKind::Mesh(drawable))
    }

    #[inline]
    pub fn camera(camera: Camera) -> Self {
        Self::new(NodeKind::Camera(camera))
    }

    #[inline]
    pub fn light(light: Light) -> Self {
        Self::new(NodeKind::Light(light))
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn at(mut self, position: Vector3<f32>) -> Self {
        self.position = position;
        self.dirty = DirtyState::LocalDirty;
        self
    }

    // ── capability queries ──────────────────────────────────────────────

    #[inline]
    pub fn is_drawable(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh(_))
    }

    /// Whether culling can test this node against a bounding volume.
    #[inline]
    pub fn has_bounding_volume(&self) -> bool {
        self.is_drawable()
    }

    pub fn casts_shadow(&self) -> bool {
        match &self.kind {
            NodeKind::Mesh(d) => d.cast_shadow,
            NodeKind::Light(l) => l.cast_shadow,
            NodeKind::Group | NodeKind::Camera(_) => false,
        }
    }

    // ── accessors ───────────────────────────────────────────────────────

    #[inline]
    pub fn drawable(&self) -> Option<&Drawable> {
        match &self.kind {
            NodeKind::Mesh(d) => Some(d),
            _ => None,
        }
    }

    #[inline]
    pub fn drawable_mut(&mut self) -> Option<&mut Drawable> {
        match &mut self.kind {
            NodeKind::Mesh(d) => Some(d),
            _ => None,
        }
    }

    #[inline]
    pub fn as_camera(&self) -> Option<&Camera> {
        match &self.kind {
            NodeKind::Camera(c) => Some(c),
            _ => None,
        }
    }

    #[inline]
    pub fn as_camera_mut(&mut self) -> Option<&mut Camera> {
        match &mut self.kind {
            NodeKind::Camera(c) => Some(c),
            _ => None,
        }
    }

    #[inline]
    pub fn as_light(&self) -> Option<&Light> {
        match &self.kind {
            NodeKind::Light(l) => Some(l),
            _ => None,
        }
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    #[inline]
    pub fn rotation(&self) -> Quaternion<f32> {
        self.rotation
    }

    #[inline]
    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    #[inline]
    pub fn local_matrix(&self) -> &Matrix4<f32> {
        &self.local
    }

    /// Cached world matrix. Valid after the graph's world update.
    #[inline]
    pub fn world_matrix(&self) -> &Matrix4<f32> {
        &self.world
    }

    #[inline]
    pub fn dirty_state(&self) -> DirtyState {
        self.dirty
    }

    pub(super) fn compose_local(&mut self) {
        self.local = Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z);
    }
}
