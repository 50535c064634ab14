use cgmath::{InnerSpace, Matrix4, Point3, Vector3, Vector4};

use super::Sphere;

/// Plane in Hessian normal form: points `p` with `normal · p + constant == 0`.
/// The positive half-space is "inside".
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f32>,
    pub constant: f32,
}

impl Plane {
    /// Builds a normalized plane from raw `(a, b, c, d)` coefficients.
    fn from_coefficients(v: Vector4<f32>) -> Self {
        let n = Vector3::new(v.x, v.y, v.z);
        let len = n.magnitude();
        if len <= f32::EPSILON {
            return Self { normal: n, constant: v.w };
        }
        Self { normal: n / len, constant: v.w / len }
    }

    #[inline]
    pub fn distance_to_point(&self, p: Point3<f32>) -> f32 {
        self.normal.dot(Vector3::new(p.x, p.y, p.z)) + self.constant
    }
}

/// Six-plane view frustum (left, right, bottom, top, near, far).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extracts planes from a GL-convention clip matrix (`projection * view`,
    /// clip z in `-w..w`).
    pub fn from_matrix(m: &Matrix4<f32>) -> Self {
        // cgmath is column-major; rows are gathered across the columns.
        let row = |i: usize| Vector4::new(m.x[i], m.y[i], m.z[i], m.w[i]);
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                Plane::from_coefficients(r3 + r2),
                Plane::from_coefficients(r3 - r2),
            ],
        }
    }

    /// Conservative sphere test: false only when the sphere is entirely on the
    /// outside of some plane.
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        let neg_radius = -sphere.radius;
        self.planes
            .iter()
            .all(|p| p.distance_to_point(sphere.center) >= neg_radius)
    }

    pub fn contains_point(&self, p: Point3<f32>) -> bool {
        self.planes.iter().all(|pl| pl.distance_to_point(p) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{perspective, Deg};

    fn camera_frustum() -> Frustum {
        // Camera at +10 z looking down -z.
        let proj = perspective(Deg(60.0), 1.0, 0.1, 100.0);
        let view = Matrix4::look_at_rh(
            Point3::new(0.0, 0.0, 10.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::unit_y(),
        );
        Frustum::from_matrix(&(proj * view))
    }

    #[test]
    fn sphere_in_front_intersects() {
        let f = camera_frustum();
        assert!(f.intersects_sphere(&Sphere::new(Point3::new(0.0, 0.0, 0.0), 1.0)));
        assert!(f.contains_point(Point3::new(0.0, 0.0, 0.0)));
    }

    #[test]
    fn sphere_behind_camera_is_outside() {
        let f = camera_frustum();
        assert!(!f.intersects_sphere(&Sphere::new(Point3::new(0.0, 0.0, 20.0), 1.0)));
    }

    #[test]
    fn sphere_straddling_plane_is_kept() {
        let f = camera_frustum();
        // Just beyond the far plane but radius reaches back inside.
        assert!(f.intersects_sphere(&Sphere::new(Point3::new(0.0, 0.0, -91.0), 2.0)));
        assert!(!f.intersects_sphere(&Sphere::new(Point3::new(0.0, 0.0, -95.0), 2.0)));
    }
}
