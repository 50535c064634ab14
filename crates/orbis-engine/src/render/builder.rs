use std::collections::HashSet;

use cgmath::{EuclideanSpace, Matrix4, Point3, Transform};

use crate::error::{EngineError, EngineResult};
use crate::geometry::{GeometryGroup, GeometryId, POSITION};
use crate::material::MaterialId;
use crate::math::Frustum;
use crate::scene::{Camera, Drawable, Node, NodeId, NodeKind, Scene};

use super::list::{Bucket, LightEntry, RenderItem, RenderList};

/// Counters from the last [`RenderListBuilder::build`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct BuildStats {
    pub visited: u32,
    pub culled: u32,
    pub skipped: u32,
}

/// Turns a scene graph into a sorted [`RenderList`] for one camera.
///
/// Walks visible nodes depth-first, keeps drawables sharing a layer with the
/// camera, drops those entirely outside its frustum and splits multi-material
/// drawables per geometry group. Problems with individual nodes are logged
/// once and the node is skipped.
#[derive(Default)]
pub struct RenderListBuilder {
    list: RenderList,
    stack: Vec<(NodeId, i32)>,
    stats: BuildStats,
    warned_nodes: HashSet<NodeId>,
    warned_geometries: HashSet<GeometryId>,
}

/// Per-build view data.
struct View {
    view: Matrix4<f32>,
    frustum: Frustum,
    layers: u32,
}

impl RenderListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last built list.
    #[inline]
    pub fn list(&self) -> &RenderList {
        &self.list
    }

    #[inline]
    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    /// Rebuilds the list for `camera`. World matrices must be current.
    ///
    /// With `sort` off, buckets keep traversal order.
    pub fn build(&mut self, scene: &Scene, camera: NodeId, sort: bool) -> EngineResult<&RenderList> {
        let cam_node = scene.graph.node(camera)?;
        let Some(cam) = cam_node.as_camera() else {
            return Err(EngineError::InvalidNode(camera));
        };
        if !cam.is_valid() {
            return Err(EngineError::InvalidProjection(camera));
        }
        let view = Self::view_for(cam, cam_node.world_matrix());

        self.list.clear();
        self.stats = BuildStats::default();

        let mut stack = std::mem::take(&mut self.stack);
        stack.clear();
        stack.push((scene.root(), 0));

        let mut order = 0u32;
        while let Some((id, group_order)) = stack.pop() {
            let Some(node) = scene.graph.get(id) else { continue };
            if !node.visible {
                continue;
            }
            self.stats.visited += 1;

            let child_order = match node.kind {
                NodeKind::Group if node.render_order != 0 => node.render_order,
                _ => group_order,
            };

            match &node.kind {
                NodeKind::Light(light) if node.layers & view.layers != 0 => {
                    self.list.push_light(LightEntry { node: id, light: *light, world: *node.world_matrix() });
                }
                NodeKind::Mesh(drawable) if node.layers & view.layers != 0 => {
                    self.project(scene, &view, id, node, drawable, group_order, &mut order);
                }
                _ => {}
            }

            // Reverse push keeps siblings in insertion order.
            stack.extend(node.children().iter().rev().map(|&c| (c, child_order)));
        }
        self.stack = stack;

        if sort {
            self.list.sort();
        }
        log::trace!(
            "render list: {} items, {} lights ({} visited, {} culled, {} skipped)",
            self.list.len(),
            self.list.lights().len(),
            self.stats.visited,
            self.stats.culled,
            self.stats.skipped
        );
        Ok(&self.list)
    }

    fn view_for(camera: &Camera, world: &Matrix4<f32>) -> View {
        let view = Camera::view_matrix(world);
        let frustum = Frustum::from_matrix(&(camera.projection_matrix() * view));
        View { view, frustum, layers: camera.layers }
    }

    #[allow(clippy::too_many_arguments)]
    fn project(
        &mut self,
        scene: &Scene,
        view: &View,
        id: NodeId,
        node: &Node,
        drawable: &Drawable,
        group_order: i32,
        order: &mut u32,
    ) {
        let Ok(geometry) = scene.geometry(drawable.geometry) else {
            self.skip_node(id, "references a missing geometry");
            return;
        };
        if !geometry.has_attribute(POSITION) {
            if self.warned_geometries.insert(drawable.geometry) {
                log::warn!("geometry {:?} has no position attribute; not drawn", drawable.geometry);
            }
            self.stats.skipped += 1;
            return;
        }

        let world = node.world_matrix();
        let bounds = geometry.bounding_sphere().map(|s| s.transformed(world));
        let outside = match bounds {
            Some(sphere) if node.frustum_culled && !sphere.is_degenerate() => {
                !view.frustum.intersects_sphere(&sphere)
            }
            _ => false,
        };
        if outside {
            self.stats.culled += 1;
            return;
        }

        let center = match bounds {
            Some(s) if !s.is_degenerate() => s.center,
            _ => Point3::from_vec(world.w.truncate()),
        };
        let z = -view.view.transform_point(center).z;

        let groups = geometry.groups();
        if drawable.materials.len() > 1 && !groups.is_empty() {
            for group in groups {
                let Some(&material) = drawable.materials.get(group.material_index) else {
                    self.skip_node(id, "has a geometry group past its material list");
                    continue;
                };
                self.emit(scene, id, node, drawable.geometry, material, Some(*group), group_order, z, order);
            }
        } else if let Some(material) = drawable.material() {
            self.emit(scene, id, node, drawable.geometry, material, None, group_order, z, order);
        } else {
            self.skip_node(id, "has no material");
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &mut self,
        scene: &Scene,
        id: NodeId,
        node: &Node,
        geometry: GeometryId,
        material_id: MaterialId,
        group: Option<GeometryGroup>,
        group_order: i32,
        z: f32,
        order: &mut u32,
    ) {
        let Ok(material) = scene.material(material_id) else {
            self.skip_node(id, "references a missing material");
            return;
        };
        if !material.visible {
            return;
        }

        let bucket = if material.is_transmissive() {
            Bucket::Transmissive
        } else if material.transparent {
            Bucket::Transparent
        } else {
            Bucket::Opaque
        };

        self.list.push(
            bucket,
            RenderItem {
                node: id,
                geometry,
                material: material_id,
                group,
                group_order,
                render_order: node.render_order,
                material_sort: material_id.index(),
                z,
                order: *order,
            },
        );
        *order += 1;
    }

    /// Forgets one-time warnings for nodes and geometries that no longer
    /// exist in `scene`.
    pub fn forget_stale(&mut self, scene: &Scene) {
        self.warned_nodes.retain(|&id| scene.graph.contains(id));
        self.warned_geometries.retain(|&id| scene.geometries.contains(id));
    }

    fn skip_node(&mut self, id: NodeId, reason: &str) {
        if self.warned_nodes.insert(id) {
            log::warn!("node {id:?} {reason}; skipped");
        }
        self.stats.skipped += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{shapes, Geometry};
    use crate::material::Material;
    use crate::math::{Color, Vector3};
    use crate::scene::{ChildPolicy, Light};

    struct Fixture {
        scene: Scene,
        camera: NodeId,
        geometry: GeometryId,
        opaque: MaterialId,
    }

    /// Camera at +10 z looking down -z.
    fn fixture() -> Fixture {
        let mut scene = Scene::new();
        let camera = scene.add(
            Node::camera(Camera::perspective(60.0, 1.0, 0.1, 100.0)).at(Vector3::new(0.0, 0.0, 10.0)),
        );
        let geometry = scene.add_geometry(shapes::cuboid(1.0, 1.0, 1.0));
        let opaque = scene.add_material(Material::basic(Color::white()));
        Fixture { scene, camera, geometry, opaque }
    }

    fn mesh_at(f: &mut Fixture, material: MaterialId, z: f32) -> NodeId {
        let node = Node::mesh(Drawable::new(f.geometry, material)).at(Vector3::new(0.0, 0.0, z));
        f.scene.add(node)
    }

    fn build(f: &mut Fixture) -> RenderListBuilder {
        let root = f.scene.root();
        f.scene.graph.update_world_transforms(root, false).unwrap();
        let mut builder = RenderListBuilder::new();
        builder.build(&f.scene, f.camera, true).unwrap();
        builder
    }

    // ── culling ─────────────────────────────────────────────────────────

    #[test]
    fn object_in_front_is_listed_behind_is_culled() {
        let mut f = fixture();
        let opaque = f.opaque;
        let front = mesh_at(&mut f, opaque, 0.0);
        mesh_at(&mut f, opaque, 20.0);

        let builder = build(&mut f);
        let nodes: Vec<NodeId> = builder.list().opaque().map(|i| i.node).collect();
        assert_eq!(nodes, vec![front]);
        assert_eq!(builder.stats().culled, 1);
    }

    #[test]
    fn frustum_culling_can_be_disabled_per_node() {
        let mut f = fixture();
        let opaque = f.opaque;
        let behind = mesh_at(&mut f, opaque, 20.0);
        f.scene.graph.node_mut(behind).unwrap().frustum_culled = false;

        let builder = build(&mut f);
        assert_eq!(builder.list().len(), 1);
    }

    #[test]
    fn degenerate_bounds_are_never_culled() {
        let mut f = fixture();
        let point = f.scene.add_geometry(shapes::polyline(&[Point3::new(0.0, 0.0, 50.0)], false));
        let node = Node::mesh(Drawable::new(point, f.opaque)).at(Vector3::new(0.0, 0.0, 20.0));
        f.scene.add(node);

        let builder = build(&mut f);
        assert_eq!(builder.list().len(), 1);
    }

    // ── buckets and ordering ────────────────────────────────────────────

    #[test]
    fn transparent_lands_in_its_own_bucket() {
        let mut f = fixture();
        let glass = f.scene.add_material(Material::basic(Color::white()).translucent(0.5));
        let opaque = f.opaque;
        mesh_at(&mut f, glass, 0.0);
        mesh_at(&mut f, opaque, 0.0);

        let builder = build(&mut f);
        let list = builder.list();
        assert_eq!(list.bucket_len(Bucket::Opaque), 1);
        assert_eq!(list.bucket_len(Bucket::Transparent), 1);
    }

    #[test]
    fn transmission_beats_transparency() {
        let mut f = fixture();
        let mut m = Material::standard(Color::white(), 0.5, 0.0).translucent(0.5);
        m.set_transmission(1.0);
        let glass = f.scene.add_material(m);
        mesh_at(&mut f, glass, 0.0);

        let builder = build(&mut f);
        assert_eq!(builder.list().bucket_len(Bucket::Transmissive), 1);
        assert_eq!(builder.list().bucket_len(Bucket::Transparent), 0);
    }

    #[test]
    fn opaque_front_to_back_transparent_back_to_front() {
        let mut f = fixture();
        let opaque = f.opaque;
        let glass = f.scene.add_material(Material::basic(Color::white()).translucent(0.5));
        let far_o = mesh_at(&mut f, opaque, -5.0);
        let near_o = mesh_at(&mut f, opaque, 2.0);
        let far_t = mesh_at(&mut f, glass, -5.0);
        let near_t = mesh_at(&mut f, glass, 2.0);

        let builder = build(&mut f);
        let list = builder.list();
        assert_eq!(list.opaque().map(|i| i.node).collect::<Vec<_>>(), vec![near_o, far_o]);
        assert_eq!(list.transparent().map(|i| i.node).collect::<Vec<_>>(), vec![far_t, near_t]);
    }

    #[test]
    fn ordered_group_sorts_its_subtree_last() {
        let mut f = fixture();
        let opaque = f.opaque;
        let mut group = Node::group();
        group.render_order = 1;
        let group = f.scene.add(group);
        let inside = f
            .scene
            .add_to(group, Node::mesh(Drawable::new(f.geometry, opaque)).at(Vector3::new(0.0, 0.0, 5.0)))
            .unwrap();
        let outside = mesh_at(&mut f, opaque, -5.0);

        let builder = build(&mut f);
        let nodes: Vec<NodeId> = builder.list().opaque().map(|i| i.node).collect();
        assert_eq!(nodes, vec![outside, inside]);
        assert_eq!(builder.list().items().iter().find(|i| i.node == inside).unwrap().group_order, 1);
    }

    #[test]
    fn unsorted_build_keeps_traversal_order() {
        let mut f = fixture();
        let opaque = f.opaque;
        let a = mesh_at(&mut f, opaque, -5.0);
        let b = mesh_at(&mut f, opaque, 2.0);
        let root = f.scene.root();
        f.scene.graph.update_world_transforms(root, false).unwrap();
        let mut builder = RenderListBuilder::new();
        let list = builder.build(&f.scene, f.camera, false).unwrap();
        assert_eq!(list.opaque().map(|i| i.node).collect::<Vec<_>>(), vec![a, b]);
    }

    // ── filtering ───────────────────────────────────────────────────────

    #[test]
    fn invisible_subtree_is_pruned() {
        let mut f = fixture();
        let mut hidden = Node::group();
        hidden.visible = false;
        let hidden = f.scene.add(hidden);
        f.scene.add_to(hidden, Node::mesh(Drawable::new(f.geometry, f.opaque))).unwrap();

        let builder = build(&mut f);
        assert!(builder.list().is_empty());
    }

    #[test]
    fn layers_must_intersect_camera() {
        let mut f = fixture();
        let opaque = f.opaque;
        let node = mesh_at(&mut f, opaque, 0.0);
        f.scene.graph.node_mut(node).unwrap().layers = 0b10;
        assert!(build(&mut f).list().is_empty());

        f.scene.graph.node_mut(f.camera).unwrap().as_camera_mut().unwrap().layers = 0b11;
        assert_eq!(build(&mut f).list().len(), 1);
    }

    #[test]
    fn geometry_without_positions_is_skipped() {
        let mut f = fixture();
        let empty = f.scene.add_geometry(Geometry::new());
        f.scene.add(Node::mesh(Drawable::new(empty, f.opaque)));

        let builder = build(&mut f);
        assert!(builder.list().is_empty());
        assert_eq!(builder.stats().skipped, 1);
    }

    #[test]
    fn warnings_are_forgotten_once_their_subject_is_gone() {
        let mut f = fixture();
        let empty = f.scene.add_geometry(Geometry::new());
        let shapeless = f.scene.add(Node::mesh(Drawable::new(empty, f.opaque)));
        let gone = f.scene.add_material(Material::basic(Color::white()));
        f.scene.materials.remove(gone);
        let orphan = mesh_at(&mut f, gone, 0.0);

        let mut builder = build(&mut f);
        assert_eq!(builder.stats().skipped, 2);
        assert_eq!(builder.warned_nodes.len(), 1);
        assert_eq!(builder.warned_geometries.len(), 1);

        builder.forget_stale(&f.scene);
        assert_eq!(builder.warned_nodes.len(), 1);

        f.scene.remove(orphan, ChildPolicy::Destroy).unwrap();
        f.scene.remove(shapeless, ChildPolicy::Destroy).unwrap();
        f.scene.geometries.remove(empty);
        builder.forget_stale(&f.scene);
        assert!(builder.warned_nodes.is_empty());
        assert!(builder.warned_geometries.is_empty());
    }

    #[test]
    fn invisible_material_is_skipped() {
        let mut f = fixture();
        let mut m = Material::basic(Color::white());
        m.visible = false;
        let hidden = f.scene.add_material(m);
        mesh_at(&mut f, hidden, 0.0);
        assert!(build(&mut f).list().is_empty());
    }

    #[test]
    fn multi_material_emits_one_item_per_group() {
        let mut f = fixture();
        let red = f.scene.add_material(Material::basic(Color::rgb(1.0, 0.0, 0.0)));
        let mut geometry = shapes::cuboid(1.0, 1.0, 1.0);
        geometry.clear_groups();
        geometry.add_group(0, 18, 0);
        geometry.add_group(18, 18, 1);
        geometry.add_group(36, 6, 7);
        let geometry = f.scene.add_geometry(geometry);
        f.scene.add(Node::mesh(Drawable::multi(geometry, vec![f.opaque, red])));

        let builder = build(&mut f);
        let items = builder.list().items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].group.unwrap().start, 0);
        assert_eq!(items[1].material, red);
        assert_eq!(builder.stats().skipped, 1);
    }

    #[test]
    fn lights_are_collected() {
        let mut f = fixture();
        f.scene.add(Node::light(Light::directional(Color::white(), 1.0)));
        f.scene.add(Node::light(Light::ambient(Color::white(), 0.2)));
        assert_eq!(build(&mut f).list().lights().len(), 2);
    }

    #[test]
    fn non_camera_node_is_rejected() {
        let mut f = fixture();
        let root = f.scene.root();
        let mut builder = RenderListBuilder::new();
        assert_eq!(builder.build(&f.scene, root, true).unwrap_err(), EngineError::InvalidNode(root));
    }
}
