//! Spatial helpers layered on `cgmath`.
//!
//! Vector/matrix/quaternion arithmetic itself comes from `cgmath`; this module
//! only adds what the render core needs on top: bounding volumes, frustum
//! planes, and linear colors with sRGB conversion.

mod bounds;
mod color;
mod frustum;

pub use bounds::{Aabb, Sphere};
pub use color::{Color, ColorSpace};
pub use frustum::{Frustum, Plane};

pub use cgmath::{Deg, Matrix3, Matrix4, Point3, Quaternion, Rad, Vector2, Vector3, Vector4};

/// Converts cgmath's OpenGL clip space (z in `-1..1`) to wgpu's (`0..1`).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Largest axis scale encoded in an affine matrix.
pub fn max_scale_on_axis(m: &Matrix4<f32>) -> f32 {
    use cgmath::InnerSpace;
    let sx = m.x.truncate().magnitude2();
    let sy = m.y.truncate().magnitude2();
    let sz = m.z.truncate().magnitude2();
    sx.max(sy).max(sz).sqrt()
}

/// Determinant sign of the upper 3x3, used for front-face flips.
pub fn is_mirrored(m: &Matrix4<f32>) -> bool {
    use cgmath::SquareMatrix;
    let basis = Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate());
    basis.determinant() < 0.0
}
