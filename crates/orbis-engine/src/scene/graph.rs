use cgmath::{InnerSpace, Matrix3, Matrix4, Point3, Quaternion, Rad, Rotation3, SquareMatrix, Vector3};

use crate::arena::Arena;
use crate::error::{EngineError, EngineResult};

use super::node::{DirtyState, Node, NodeId};

/// What happens to a removed node's children.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ChildPolicy {
    /// Remove the whole subtree.
    Destroy,
    /// Keep the children alive as detached roots.
    Orphan,
}

#[derive(Debug, Copy, Clone)]
struct PendingUpdate {
    id: NodeId,
    parent_world: Matrix4<f32>,
    parent_changed: bool,
}

/// Node storage plus parent/child links.
///
/// Children are owned through the forward `children` list; the `parent` link
/// is a plain handle and never keeps anything alive.
#[derive(Default)]
pub struct SceneGraph {
    nodes: Arena<Node>,
    // Reused traversal stacks.
    update_stack: Vec<PendingUpdate>,
    visit_stack: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a detached node.
    pub fn create(&mut self, node: Node) -> NodeId {
        let mut node = node;
        node.parent = None;
        node.children.clear();
        if node.dirty == DirtyState::Clean {
            node.dirty = DirtyState::LocalDirty;
        }
        self.nodes.insert(node)
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Like [`get`](Self::get) but stale handles are an error.
    pub fn node(&self, id: NodeId) -> EngineResult<&Node> {
        self.nodes.get(id).ok_or(EngineError::InvalidNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> EngineResult<&mut Node> {
        self.nodes.get_mut(id).ok_or(EngineError::InvalidNode(id))
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    // ── hierarchy edits ─────────────────────────────────────────────────

    /// Appends `child` to `parent`'s children, detaching it from any previous
    /// parent first. Self-attachment and cycles are rejected and logged.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> EngineResult<()> {
        self.node(parent)?;
        self.node(child)?;

        if parent == child {
            let err = EngineError::SelfAttach(child);
            log::error!("SceneGraph::attach: {err}");
            return Err(err);
        }
        if self.is_ancestor(child, parent) {
            let err = EngineError::CycleAttach { parent, child };
            log::error!("SceneGraph::attach: {err}");
            return Err(err);
        }

        if let Some(previous) = self.nodes.get(child).and_then(|n| n.parent) {
            self.unlink(previous, child);
        }

        self.node_mut(parent)?.children.push(child);
        let node = self.node_mut(child)?;
        node.parent = Some(parent);
        mark_world_dirty(node);
        Ok(())
    }

    /// Detaches `child` from `parent`. Returns `false` if it wasn't a child.
    pub fn detach(&mut self, parent: NodeId, child: NodeId) -> EngineResult<bool> {
        self.node(parent)?;
        if self.node(child)?.parent != Some(parent) {
            return Ok(false);
        }
        self.unlink(parent, child);
        let node = self.node_mut(child)?;
        node.parent = None;
        mark_world_dirty(node);
        Ok(true)
    }

    /// Removes `id` from the graph. Returns the number of nodes freed.
    pub fn remove(&mut self, id: NodeId, policy: ChildPolicy) -> EngineResult<usize> {
        let parent = self.node(id)?.parent;
        if let Some(p) = parent {
            self.unlink(p, id);
        }

        match policy {
            ChildPolicy::Destroy => {
                let mut doomed = Vec::new();
                self.collect_subtree(id, &mut doomed);
                for &n in &doomed {
                    self.nodes.remove(n);
                }
                Ok(doomed.len())
            }
            ChildPolicy::Orphan => {
                let children = std::mem::take(&mut self.node_mut(id)?.children);
                for c in children {
                    if let Some(child) = self.nodes.get_mut(c) {
                        child.parent = None;
                        mark_world_dirty(child);
                    }
                }
                self.nodes.remove(id);
                Ok(1)
            }
        }
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|&c| c != child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = None;
        }
    }

    /// Iterates from `id`'s parent up to its root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            nodes: &self.nodes,
            next: self.nodes.get(id).and_then(|n| n.parent),
        }
    }

    /// Whether `ancestor` lies on the parent chain of `id` (or is `id`).
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor == id || self.ancestors(id).any(|a| a == ancestor)
    }

    /// Root of the tree containing `id`.
    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    // ── local transform ─────────────────────────────────────────────────

    pub fn set_position(&mut self, id: NodeId, position: Vector3<f32>) -> EngineResult<()> {
        let node = self.node_mut(id)?;
        node.position = position;
        node.dirty = DirtyState::LocalDirty;
        Ok(())
    }

    pub fn set_rotation(&mut self, id: NodeId, rotation: Quaternion<f32>) -> EngineResult<()> {
        let node = self.node_mut(id)?;
        node.rotation = rotation;
        node.dirty = DirtyState::LocalDirty;
        Ok(())
    }

    pub fn set_scale(&mut self, id: NodeId, scale: Vector3<f32>) -> EngineResult<()> {
        let node = self.node_mut(id)?;
        node.scale = scale;
        node.dirty = DirtyState::LocalDirty;
        Ok(())
    }

    pub fn set_local_transform(
        &mut self,
        id: NodeId,
        position: Vector3<f32>,
        rotation: Quaternion<f32>,
        scale: Vector3<f32>,
    ) -> EngineResult<()> {
        let node = self.node_mut(id)?;
        node.position = position;
        node.rotation = rotation;
        node.scale = scale;
        node.dirty = DirtyState::LocalDirty;
        Ok(())
    }

    /// Post-multiplies the rotation by `angle` about the local `axis`.
    pub fn rotate_on_axis(&mut self, id: NodeId, axis: Vector3<f32>, angle: Rad<f32>) -> EngineResult<()> {
        let node = self.node_mut(id)?;
        node.rotation = node.rotation * Quaternion::from_axis_angle(axis.normalize(), angle);
        node.dirty = DirtyState::LocalDirty;
        Ok(())
    }

    /// Rebuilds the local matrix from TRS now, for nodes that opted out of
    /// the automatic per-frame rebuild.
    pub fn update_local_matrix(&mut self, id: NodeId) -> EngineResult<()> {
        let node = self.node_mut(id)?;
        node.compose_local();
        node.dirty = DirtyState::WorldDirty;
        Ok(())
    }

    /// Rotates the node so its local -Z axis points at `target` (world space).
    pub fn look_at(&mut self, id: NodeId, target: Point3<f32>) -> EngineResult<()> {
        self.update_world_transform(id, true, false)?;

        let eye = self.world_position(id)?;
        let forward = eye - target;
        if forward.magnitude2() <= f32::EPSILON {
            return Ok(());
        }
        let z = forward.normalize();
        let up = if z.y.abs() > 0.9999 { Vector3::unit_z() } else { Vector3::unit_y() };
        let x = up.cross(z).normalize();
        let y = z.cross(x);
        let world_rotation = Quaternion::from(Matrix3::from_cols(x, y, z));

        let parent_rotation = match self.node(id)?.parent {
            Some(p) => rotation_of(self.node(p)?.world_matrix()),
            None => Quaternion::new(1.0, 0.0, 0.0, 0.0),
        };

        let node = self.node_mut(id)?;
        node.rotation = (parent_rotation.conjugate() * world_rotation).normalize();
        node.dirty = DirtyState::LocalDirty;
        Ok(())
    }

    // ── world transform ─────────────────────────────────────────────────

    /// Brings every world matrix under `root` up to date.
    ///
    /// Local matrices are rebuilt only for nodes whose TRS changed; world
    /// matrices only when the node or an ancestor changed, or with `force`.
    /// Returns the number of world matrices recomputed.
    pub fn update_world_transforms(&mut self, root: NodeId, force: bool) -> EngineResult<usize> {
        let parent_world = match self.node(root)?.parent {
            Some(p) => *self.node(p)?.world_matrix(),
            None => Matrix4::identity(),
        };

        let mut stack = std::mem::take(&mut self.update_stack);
        stack.clear();
        stack.push(PendingUpdate { id: root, parent_world, parent_changed: force });

        let mut recomputed = 0;
        while let Some(PendingUpdate { id, parent_world, parent_changed }) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id) else { continue };
            let changed = refresh(node, &parent_world, parent_changed);
            if changed {
                recomputed += 1;
            }
            // Reverse push keeps siblings in insertion order.
            for &child in node.children.iter().rev() {
                stack.push(PendingUpdate {
                    id: child,
                    parent_world: node.world,
                    parent_changed: changed,
                });
            }
        }

        self.update_stack = stack;
        Ok(recomputed)
    }

    /// Updates a single node's world matrix, optionally refreshing its
    /// ancestor chain first and its subtree afterwards.
    pub fn update_world_transform(
        &mut self,
        id: NodeId,
        update_parents: bool,
        update_children: bool,
    ) -> EngineResult<()> {
        self.node(id)?;

        if update_parents {
            let chain: Vec<NodeId> = self.ancestors(id).collect();
            for &a in chain.iter().rev() {
                self.refresh_single(a);
            }
        }

        if update_children {
            self.update_world_transforms(id, true)?;
        } else {
            self.refresh_single(id);
        }
        Ok(())
    }

    fn refresh_single(&mut self, id: NodeId) {
        let parent_world = self
            .nodes
            .get(id)
            .and_then(|n| n.parent)
            .and_then(|p| self.nodes.get(p))
            .map_or_else(Matrix4::identity, |p| p.world);

        let Some(node) = self.nodes.get_mut(id) else { return };
        refresh(node, &parent_world, true);

        // Descendants weren't visited; make the next full pass pick them up.
        let children = node.children.clone();
        for c in children {
            if let Some(child) = self.nodes.get_mut(c) {
                mark_world_dirty(child);
            }
        }
    }

    pub fn world_position(&self, id: NodeId) -> EngineResult<Point3<f32>> {
        let w = self.node(id)?.world_matrix();
        Ok(Point3::new(w.w.x, w.w.y, w.w.z))
    }

    // ── traversal ───────────────────────────────────────────────────────

    /// Depth-first, parent before children, siblings in insertion order.
    pub fn traverse<F>(&mut self, root: NodeId, visitor: F) -> EngineResult<()>
    where
        F: FnMut(NodeId, &Node),
    {
        self.walk(root, false, visitor)
    }

    /// Like [`traverse`](Self::traverse) but invisible nodes prune their subtree.
    pub fn traverse_visible<F>(&mut self, root: NodeId, visitor: F) -> EngineResult<()>
    where
        F: FnMut(NodeId, &Node),
    {
        self.walk(root, true, visitor)
    }

    fn walk<F>(&mut self, root: NodeId, visible_only: bool, mut visitor: F) -> EngineResult<()>
    where
        F: FnMut(NodeId, &Node),
    {
        self.node(root)?;

        let mut stack = std::mem::take(&mut self.visit_stack);
        stack.clear();
        stack.push(root);

        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else { continue };
            if visible_only && !node.visible {
                continue;
            }
            visitor(id, node);
            stack.extend(node.children.iter().rev().copied());
        }

        self.visit_stack = stack;
        Ok(())
    }

    fn collect_subtree(&self, root: NodeId, out: &mut Vec<NodeId>) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else { continue };
            out.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
    }
}

/// Parent chain iterator returned by [`SceneGraph::ancestors`].
pub struct Ancestors<'a> {
    nodes: &'a Arena<Node>,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.nodes.get(id).and_then(|n| n.parent);
        Some(id)
    }
}

/// Recomputes matrices as needed; returns whether the world matrix changed.
fn refresh(node: &mut Node, parent_world: &Matrix4<f32>, parent_changed: bool) -> bool {
    if node.dirty == DirtyState::LocalDirty && node.matrix_auto_update {
        node.compose_local();
    }
    let changed = parent_changed || node.dirty != DirtyState::Clean;
    if changed {
        node.world = parent_world * node.local;
    }
    node.dirty = DirtyState::Clean;
    changed
}

fn mark_world_dirty(node: &mut Node) {
    if node.dirty == DirtyState::Clean {
        node.dirty = DirtyState::WorldDirty;
    }
}

/// Rotation part of an affine matrix with scale removed.
fn rotation_of(m: &Matrix4<f32>) -> Quaternion<f32> {
    let axis = |v: cgmath::Vector4<f32>| {
        let v = v.truncate();
        let len = v.magnitude();
        if len > f32::EPSILON { v / len } else { v }
    };
    Quaternion::from(Matrix3::from_cols(axis(m.x), axis(m.y), axis(m.z)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Transform};

    fn approx_eq(a: &Matrix4<f32>, b: &Matrix4<f32>) -> bool {
        let a: &[f32; 16] = a.as_ref();
        let b: &[f32; 16] = b.as_ref();
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-4)
    }

    fn chain(g: &mut SceneGraph) -> (NodeId, NodeId, NodeId) {
        let root = g.create(Node::group().named("root"));
        let group = g.create(Node::group().named("group"));
        let mesh = g.create(Node::group().named("mesh"));
        g.attach(root, group).unwrap();
        g.attach(group, mesh).unwrap();
        (root, group, mesh)
    }

    // ── attach / detach ─────────────────────────────────────────────────

    #[test]
    fn attach_sets_parent_and_child_list() {
        let mut g = SceneGraph::new();
        let p = g.create(Node::group());
        let c = g.create(Node::group());
        g.attach(p, c).unwrap();
        assert_eq!(g.node(c).unwrap().parent(), Some(p));
        assert_eq!(g.node(p).unwrap().children(), &[c]);
    }

    #[test]
    fn self_attach_is_rejected() {
        let mut g = SceneGraph::new();
        let a = g.create(Node::group());
        assert_eq!(g.attach(a, a), Err(EngineError::SelfAttach(a)));
        assert!(g.node(a).unwrap().children().is_empty());
    }

    #[test]
    fn cycles_are_rejected() {
        let mut g = SceneGraph::new();
        let (root, _, mesh) = chain(&mut g);
        assert_eq!(
            g.attach(mesh, root),
            Err(EngineError::CycleAttach { parent: mesh, child: root })
        );
        assert_eq!(g.node(root).unwrap().parent(), None);
    }

    #[test]
    fn reattach_leaves_previous_parent() {
        let mut g = SceneGraph::new();
        let a = g.create(Node::group());
        let b = g.create(Node::group());
        let c = g.create(Node::group());
        g.attach(a, c).unwrap();
        g.attach(b, c).unwrap();
        assert!(g.node(a).unwrap().children().is_empty());
        assert_eq!(g.node(b).unwrap().children(), &[c]);
        assert_eq!(g.node(c).unwrap().dirty_state(), DirtyState::LocalDirty);
    }

    #[test]
    fn detach_non_child_is_noop() {
        let mut g = SceneGraph::new();
        let a = g.create(Node::group());
        let b = g.create(Node::group());
        assert_eq!(g.detach(a, b), Ok(false));
    }

    #[test]
    fn stale_handle_is_an_error() {
        let mut g = SceneGraph::new();
        let a = g.create(Node::group());
        g.remove(a, ChildPolicy::Destroy).unwrap();
        assert_eq!(g.set_position(a, Vector3::unit_x()), Err(EngineError::InvalidNode(a)));
    }

    // ── removal ─────────────────────────────────────────────────────────

    #[test]
    fn destroy_removes_descendants() {
        let mut g = SceneGraph::new();
        let (root, group, mesh) = chain(&mut g);
        assert_eq!(g.remove(group, ChildPolicy::Destroy), Ok(2));
        assert!(!g.contains(group));
        assert!(!g.contains(mesh));
        assert!(g.node(root).unwrap().children().is_empty());
    }

    #[test]
    fn orphan_keeps_children_as_roots() {
        let mut g = SceneGraph::new();
        let (_, group, mesh) = chain(&mut g);
        assert_eq!(g.remove(group, ChildPolicy::Orphan), Ok(1));
        assert_eq!(g.node(mesh).unwrap().parent(), None);
    }

    // ── world transforms ────────────────────────────────────────────────

    #[test]
    fn world_is_parent_world_times_local() {
        let mut g = SceneGraph::new();
        let (root, group, mesh) = chain(&mut g);
        g.set_position(root, Vector3::new(1.0, 2.0, 3.0)).unwrap();
        g.set_rotation(group, Quaternion::from_angle_y(Deg(30.0))).unwrap();
        g.set_scale(group, Vector3::new(2.0, 2.0, 2.0)).unwrap();
        g.set_position(mesh, Vector3::new(0.0, 0.0, -4.0)).unwrap();
        g.update_world_transforms(root, false).unwrap();

        for (_, node) in g.iter() {
            let parent_world = node
                .parent()
                .map_or_else(Matrix4::identity, |p| *g.node(p).unwrap().world_matrix());
            assert!(approx_eq(node.world_matrix(), &(parent_world * node.local_matrix())));
        }
    }

    #[test]
    fn translating_root_moves_mesh_by_same_amount() {
        let mut g = SceneGraph::new();
        let (root, _, mesh) = chain(&mut g);
        g.set_position(mesh, Vector3::new(1.0, 1.0, 1.0)).unwrap();
        g.update_world_transforms(root, false).unwrap();
        let before = g.world_position(mesh).unwrap();

        g.set_position(root, Vector3::new(5.0, -2.0, 0.5)).unwrap();
        g.update_world_transforms(root, false).unwrap();
        let after = g.world_position(mesh).unwrap();

        assert!(((after - before) - Vector3::new(5.0, -2.0, 0.5)).magnitude() < 1e-5);
    }

    #[test]
    fn clean_nodes_are_not_recomputed() {
        let mut g = SceneGraph::new();
        let (root, group, _) = chain(&mut g);
        let sibling = g.create(Node::group());
        g.attach(root, sibling).unwrap();

        assert_eq!(g.update_world_transforms(root, false), Ok(4));
        assert_eq!(g.update_world_transforms(root, false), Ok(0));

        // Only the dirty node and its subtree.
        g.set_position(group, Vector3::unit_x()).unwrap();
        assert_eq!(g.update_world_transforms(root, false), Ok(2));

        assert_eq!(g.update_world_transforms(root, true), Ok(4));
    }

    #[test]
    fn single_node_update_pulls_ancestors() {
        let mut g = SceneGraph::new();
        let (root, _, mesh) = chain(&mut g);
        g.set_position(root, Vector3::new(0.0, 3.0, 0.0)).unwrap();
        g.update_world_transform(mesh, true, false).unwrap();
        assert_eq!(g.world_position(mesh).unwrap(), Point3::new(0.0, 3.0, 0.0));
    }

    #[test]
    fn look_at_points_negative_z_at_target() {
        let mut g = SceneGraph::new();
        let cam = g.create(Node::group().at(Vector3::new(0.0, 0.0, 10.0)));
        g.look_at(cam, Point3::new(10.0, 0.0, 10.0)).unwrap();
        g.update_world_transforms(cam, false).unwrap();

        let forward = g.node(cam).unwrap().world_matrix().transform_vector(-Vector3::unit_z());
        assert!((forward - Vector3::unit_x()).magnitude() < 1e-5);
    }

    // ── traversal ───────────────────────────────────────────────────────

    #[test]
    fn traversal_is_preorder_in_insertion_order() {
        let mut g = SceneGraph::new();
        let root = g.create(Node::group().named("r"));
        let a = g.create(Node::group().named("a"));
        let b = g.create(Node::group().named("b"));
        let a1 = g.create(Node::group().named("a1"));
        g.attach(root, a).unwrap();
        g.attach(root, b).unwrap();
        g.attach(a, a1).unwrap();

        let mut names = Vec::new();
        g.traverse(root, |_, n| names.push(n.name.clone())).unwrap();
        assert_eq!(names, ["r", "a", "a1", "b"]);
    }

    #[test]
    fn invisible_nodes_prune_subtree() {
        let mut g = SceneGraph::new();
        let (root, group, _) = chain(&mut g);
        g.node_mut(group).unwrap().visible = false;

        let mut count = 0;
        g.traverse_visible(root, |_, _| count += 1).unwrap();
        assert_eq!(count, 1);
    }
}
