use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Transform, Vector3};

/// Axis-aligned bounding box.
///
/// An empty box has `min > max` on every axis; expanding it by any point
/// yields a zero-volume box at that point.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    #[inline]
    pub const fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    #[inline]
    pub fn expand_by_point(&mut self, p: Point3<f32>) {
        self.min = Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    /// Builds a box from a flat position array with `item_size` components per
    /// vertex. Components past the third are ignored; missing ones read as 0.
    pub fn from_positions(data: &[f32], item_size: usize) -> Self {
        let mut b = Self::empty();
        if item_size == 0 {
            return b;
        }
        for chunk in data.chunks_exact(item_size) {
            b.expand_by_point(point_from_chunk(chunk));
        }
        b
    }

    #[inline]
    pub fn center(&self) -> Point3<f32> {
        if self.is_empty() {
            return Point3::origin();
        }
        self.min.midpoint(self.max)
    }

    #[inline]
    pub fn size(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::new(0.0, 0.0, 0.0);
        }
        self.max - self.min
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

/// Bounding sphere. A negative radius marks an empty sphere.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sphere {
    pub center: Point3<f32>,
    pub radius: f32,
}

impl Sphere {
    #[inline]
    pub const fn new(center: Point3<f32>, radius: f32) -> Self {
        Self { center, radius }
    }

    #[inline]
    pub const fn empty() -> Self {
        Self { center: Point3::new(0.0, 0.0, 0.0), radius: -1.0 }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.radius < 0.0
    }

    /// Zero, negative or non-finite radius; such volumes can't be culled safely.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !(self.radius > 0.0) || !self.radius.is_finite() || !self.center.x.is_finite()
            || !self.center.y.is_finite() || !self.center.z.is_finite()
    }

    /// Sphere centered on the box center, sized to the farthest position.
    pub fn from_positions(data: &[f32], item_size: usize, bbox: &Aabb) -> Self {
        if bbox.is_empty() || item_size == 0 {
            return Self::empty();
        }
        let center = bbox.center();
        let max_sq = data
            .chunks_exact(item_size)
            .map(|c| (point_from_chunk(c) - center).magnitude2())
            .fold(0.0f32, f32::max);
        Self::new(center, max_sq.sqrt())
    }

    /// Conservative world-space sphere: center transformed, radius scaled by
    /// the largest axis scale.
    pub fn transformed(&self, m: &Matrix4<f32>) -> Self {
        Self {
            center: m.transform_point(self.center),
            radius: self.radius * super::max_scale_on_axis(m),
        }
    }
}

fn point_from_chunk(chunk: &[f32]) -> Point3<f32> {
    let at = |i: usize| chunk.get(i).copied().unwrap_or(0.0);
    Point3::new(at(0), at(1), at(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_box_grows_to_point() {
        let mut b = Aabb::empty();
        assert!(b.is_empty());
        b.expand_by_point(Point3::new(1.0, 2.0, 3.0));
        assert!(!b.is_empty());
        assert_eq!(b.size(), Vector3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn sphere_encloses_all_positions() {
        let data = [-1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0];
        let b = Aabb::from_positions(&data, 3);
        let s = Sphere::from_positions(&data, 3, &b);
        for c in data.chunks_exact(3) {
            let d = (Point3::new(c[0], c[1], c[2]) - s.center).magnitude();
            assert!(d <= s.radius + 1e-5);
        }
    }

    #[test]
    fn transformed_sphere_uses_max_scale() {
        let s = Sphere::new(Point3::new(0.0, 0.0, 0.0), 1.0);
        let m = Matrix4::from_translation(Vector3::new(5.0, 0.0, 0.0))
            * Matrix4::from_nonuniform_scale(1.0, 3.0, 2.0);
        let t = s.transformed(&m);
        assert_eq!(t.center, Point3::new(5.0, 0.0, 0.0));
        assert!((t.radius - 3.0).abs() < 1e-5);
    }

    #[test]
    fn single_point_sphere_is_degenerate() {
        let data = [4.0, 4.0, 4.0];
        let b = Aabb::from_positions(&data, 3);
        assert!(Sphere::from_positions(&data, 3, &b).is_degenerate());
    }
}
