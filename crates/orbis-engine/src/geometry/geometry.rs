use std::cell::OnceCell;
use std::collections::BTreeMap;

use crate::arena::Handle;
use crate::math::{Aabb, Sphere};

use super::Attribute;

pub type GeometryId = Handle<Geometry>;

/// Conventional attribute names.
pub const POSITION: &str = "position";
pub const NORMAL: &str = "normal";
pub const UV: &str = "uv";
pub const COLOR: &str = "color";
pub const SKIN_INDEX: &str = "skin_index";
pub const SKIN_WEIGHT: &str = "skin_weight";

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum PrimitiveTopology {
    #[default]
    Triangles,
    Lines,
    LineStrip,
    Points,
}

/// Sub-range drawn with its own material.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GeometryGroup {
    pub start: u32,
    pub count: u32,
    pub material_index: usize,
}

/// Element range to draw; `count = None` means "to the end".
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DrawRange {
    pub start: u32,
    pub count: Option<u32>,
}

/// Vertex data and the metadata needed to draw it.
///
/// Bounds are computed on first request and dropped whenever position data
/// changes. The geometry-level `version` bumps on every data change so GPU
/// caches know to re-upload.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    attributes: BTreeMap<String, Attribute>,
    index: Option<Vec<u32>>,
    groups: Vec<GeometryGroup>,
    draw_range: DrawRange,
    morph_attributes: BTreeMap<String, Vec<Attribute>>,
    bounds: OnceCell<(Aabb, Sphere)>,
    version: u32,
}

impl Geometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.set_attribute(name, attribute);
        self
    }

    pub fn with_index(mut self, index: Vec<u32>) -> Self {
        self.set_index(Some(index));
        self
    }

    pub fn set_attribute(&mut self, name: &str, attribute: Attribute) {
        self.attributes.insert(name.to_string(), attribute);
        self.touch(name);
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute> {
        let removed = self.attributes.remove(name);
        if removed.is_some() {
            self.touch(name);
        }
        removed
    }

    #[inline]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Mutable access to attribute data. Call [`mark_modified`](Self::mark_modified)
    /// afterwards so bounds and uploads are refreshed.
    #[inline]
    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.get_mut(name)
    }

    #[inline]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Flags attribute `name` as changed.
    pub fn mark_modified(&mut self, name: &str) {
        if let Some(a) = self.attributes.get_mut(name) {
            a.bump_version();
        }
        self.touch(name);
    }

    fn touch(&mut self, name: &str) {
        if name == POSITION {
            self.bounds.take();
        }
        self.version = self.version.wrapping_add(1);
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    // ── index / groups / range ──────────────────────────────────────────

    pub fn set_index(&mut self, index: Option<Vec<u32>>) {
        self.index = index;
        self.version = self.version.wrapping_add(1);
    }

    #[inline]
    pub fn index(&self) -> Option<&[u32]> {
        self.index.as_deref()
    }

    pub fn add_group(&mut self, start: u32, count: u32, material_index: usize) {
        self.groups.push(GeometryGroup { start, count, material_index });
    }

    pub fn clear_groups(&mut self) {
        self.groups.clear();
    }

    #[inline]
    pub fn groups(&self) -> &[GeometryGroup] {
        &self.groups
    }

    pub fn set_draw_range(&mut self, start: u32, count: Option<u32>) {
        self.draw_range = DrawRange { start, count };
    }

    #[inline]
    pub fn draw_range(&self) -> DrawRange {
        self.draw_range
    }

    // ── morph targets ───────────────────────────────────────────────────

    pub fn add_morph_target(&mut self, name: &str, target: Attribute) {
        self.morph_attributes.entry(name.to_string()).or_default().push(target);
        self.version = self.version.wrapping_add(1);
    }

    /// Morph target count, taken from the attribute with the most targets.
    pub fn morph_target_count(&self) -> usize {
        self.morph_attributes.values().map(Vec::len).max().unwrap_or(0)
    }

    // ── counts ──────────────────────────────────────────────────────────

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.attributes.get(POSITION).map_or(0, Attribute::count)
    }

    /// Elements addressed by draw calls: indices if indexed, else vertices.
    #[inline]
    pub fn element_count(&self) -> usize {
        self.index.as_ref().map_or_else(|| self.vertex_count(), Vec::len)
    }

    /// Skinning requires both joint index and weight streams.
    #[inline]
    pub fn has_skinning(&self) -> bool {
        self.has_attribute(SKIN_INDEX) && self.has_attribute(SKIN_WEIGHT)
    }

    // ── bounds ──────────────────────────────────────────────────────────

    /// Local-space bounding box, or `None` without positions.
    pub fn bounding_box(&self) -> Option<Aabb> {
        self.bounds().map(|(b, _)| b)
    }

    pub fn bounding_sphere(&self) -> Option<Sphere> {
        self.bounds().map(|(_, s)| s)
    }

    fn bounds(&self) -> Option<(Aabb, Sphere)> {
        let pos = self.attributes.get(POSITION)?;
        let computed = self.bounds.get_or_init(|| {
            let data = pos.data.to_f32(pos.normalized);
            let bbox = Aabb::from_positions(&data, pos.item_size);
            let sphere = Sphere::from_positions(&data, pos.item_size, &bbox);
            (bbox, sphere)
        });
        Some(*computed)
    }
}
