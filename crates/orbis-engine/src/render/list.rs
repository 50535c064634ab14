use std::cmp::Ordering;

use cgmath::Matrix4;

use crate::geometry::{GeometryGroup, GeometryId};
use crate::material::MaterialId;
use crate::scene::{Light, NodeId};

/// One draw for one frame: a drawable node paired with one of its materials.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderItem {
    pub node: NodeId,
    pub geometry: GeometryId,
    pub material: MaterialId,
    /// Sub-range drawn with `material`; `None` draws the whole geometry.
    pub group: Option<GeometryGroup>,
    /// Render order of the nearest ordered ancestor group.
    pub group_order: i32,
    pub render_order: i32,
    pub material_sort: u32,
    /// View-space distance along the camera's forward axis.
    pub z: f32,
    /// Emission order during traversal.
    pub order: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Bucket {
    Opaque,
    Transmissive,
    Transparent,
}

/// Light met during traversal, with its node's world matrix.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LightEntry {
    pub node: NodeId,
    pub light: Light,
    pub world: Matrix4<f32>,
}

fn opaque_order(a: &RenderItem, b: &RenderItem) -> Ordering {
    a.group_order
        .cmp(&b.group_order)
        .then(a.render_order.cmp(&b.render_order))
        .then(a.material_sort.cmp(&b.material_sort))
        .then(a.z.total_cmp(&b.z))
        .then(a.order.cmp(&b.order))
}

fn transparent_order(a: &RenderItem, b: &RenderItem) -> Ordering {
    a.group_order
        .cmp(&b.group_order)
        .then(a.render_order.cmp(&b.render_order))
        .then(b.z.total_cmp(&a.z))
        .then(a.order.cmp(&b.order))
}

/// Per-frame draw list.
///
/// Items live in one pooled vector; buckets hold indices into it. All
/// storage is reused across frames.
#[derive(Debug, Default)]
pub struct RenderList {
    items: Vec<RenderItem>,
    opaque: Vec<u32>,
    transmissive: Vec<u32>,
    transparent: Vec<u32>,
    lights: Vec<LightEntry>,
}

impl RenderList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties the list, keeping allocations.
    pub fn clear(&mut self) {
        self.items.clear();
        self.opaque.clear();
        self.transmissive.clear();
        self.transparent.clear();
        self.lights.clear();
    }

    pub fn push(&mut self, bucket: Bucket, item: RenderItem) {
        let index = self.items.len() as u32;
        self.items.push(item);
        match bucket {
            Bucket::Opaque => self.opaque.push(index),
            Bucket::Transmissive => self.transmissive.push(index),
            Bucket::Transparent => self.transparent.push(index),
        }
    }

    pub fn push_light(&mut self, entry: LightEntry) {
        self.lights.push(entry);
    }

    /// Opaque front-to-back by material; blended buckets back-to-front.
    pub fn sort(&mut self) {
        let items = &self.items;
        self.opaque.sort_by(|&a, &b| opaque_order(&items[a as usize], &items[b as usize]));
        self.transmissive.sort_by(|&a, &b| transparent_order(&items[a as usize], &items[b as usize]));
        self.transparent.sort_by(|&a, &b| transparent_order(&items[a as usize], &items[b as usize]));
    }

    pub fn bucket(&self, bucket: Bucket) -> impl Iterator<Item = &RenderItem> + '_ {
        let indices = match bucket {
            Bucket::Opaque => &self.opaque,
            Bucket::Transmissive => &self.transmissive,
            Bucket::Transparent => &self.transparent,
        };
        indices.iter().map(|&i| &self.items[i as usize])
    }

    pub fn opaque(&self) -> impl Iterator<Item = &RenderItem> + '_ {
        self.bucket(Bucket::Opaque)
    }

    pub fn transmissive(&self) -> impl Iterator<Item = &RenderItem> + '_ {
        self.bucket(Bucket::Transmissive)
    }

    pub fn transparent(&self) -> impl Iterator<Item = &RenderItem> + '_ {
        self.bucket(Bucket::Transparent)
    }

    pub fn bucket_len(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::Opaque => self.opaque.len(),
            Bucket::Transmissive => self.transmissive.len(),
            Bucket::Transparent => self.transparent.len(),
        }
    }

    #[inline]
    pub fn lights(&self) -> &[LightEntry] {
        &self.lights
    }

    /// All items in emission order.
    #[inline]
    pub fn items(&self) -> &[RenderItem] {
        &self.items
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::geometry::Geometry;
    use crate::material::{Material, MaterialId};
    use crate::math::Color;
    use crate::scene::Node;

    struct Ids {
        nodes: Arena<Node>,
        geometry: GeometryId,
        materials: Vec<MaterialId>,
    }

    fn ids() -> Ids {
        let mut geometries = Arena::new();
        let mut materials = Arena::new();
        Ids {
            nodes: Arena::new(),
            geometry: geometries.insert(Geometry::new()),
            materials: (0..3).map(|_| materials.insert(Material::basic(Color::white()))).collect(),
        }
    }

    fn item(ids: &mut Ids, material: usize, z: f32, order: u32) -> RenderItem {
        RenderItem {
            node: ids.nodes.insert(Node::group()),
            geometry: ids.geometry,
            material: ids.materials[material],
            group: None,
            group_order: 0,
            render_order: 0,
            material_sort: ids.materials[material].index(),
            z,
            order,
        }
    }

    #[test]
    fn opaque_sorts_by_material_then_depth() {
        let mut ids = ids();
        let mut list = RenderList::new();
        list.push(Bucket::Opaque, item(&mut ids, 1, 1.0, 0));
        list.push(Bucket::Opaque, item(&mut ids, 0, 5.0, 1));
        list.push(Bucket::Opaque, item(&mut ids, 0, 2.0, 2));
        list.sort();
        let order: Vec<u32> = list.opaque().map(|i| i.order).collect();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn transparent_sorts_back_to_front() {
        let mut ids = ids();
        let mut list = RenderList::new();
        list.push(Bucket::Transparent, item(&mut ids, 0, 1.0, 0));
        list.push(Bucket::Transparent, item(&mut ids, 2, 9.0, 1));
        list.push(Bucket::Transparent, item(&mut ids, 1, 4.0, 2));
        list.sort();
        let z: Vec<f32> = list.transparent().map(|i| i.z).collect();
        assert_eq!(z, vec![9.0, 4.0, 1.0]);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut ids = ids();
        let mut list = RenderList::new();
        for order in 0..4 {
            list.push(Bucket::Transparent, item(&mut ids, 0, 3.0, order));
        }
        list.sort();
        let order: Vec<u32> = list.transparent().map(|i| i.order).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn render_order_beats_depth() {
        let mut ids = ids();
        let mut list = RenderList::new();
        let mut late = item(&mut ids, 0, 1.0, 0);
        late.render_order = 1;
        list.push(Bucket::Transparent, late);
        list.push(Bucket::Transparent, item(&mut ids, 0, 0.5, 1));
        list.sort();
        let order: Vec<u32> = list.transparent().map(|i| i.order).collect();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn clear_keeps_nothing() {
        let mut ids = ids();
        let mut list = RenderList::new();
        list.push(Bucket::Opaque, item(&mut ids, 0, 1.0, 0));
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.bucket_len(Bucket::Opaque), 0);
    }
}
