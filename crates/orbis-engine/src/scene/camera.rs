use cgmath::{ortho, perspective, Deg, Matrix4, SquareMatrix};

/// Projection model of a camera node.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in degrees.
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

/// Camera payload. The view transform comes from the owning node's world
/// matrix; this type only holds projection parameters and a layer mask.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub projection: Projection,
    /// Zoom factor applied to the projection (1 = none).
    pub zoom: f32,
    /// Only drawables whose layer mask intersects this one are rendered.
    pub layers: u32,
}

impl Camera {
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Perspective { fov_y, aspect, near, far },
            zoom: 1.0,
            layers: super::node::DEFAULT_LAYERS,
        }
    }

    pub fn orthographic(half_width: f32, half_height: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Orthographic {
                left: -half_width,
                right: half_width,
                bottom: -half_height,
                top: half_height,
                near,
                far,
            },
            zoom: 1.0,
            layers: super::node::DEFAULT_LAYERS,
        }
    }

    /// Updates the aspect ratio of a perspective camera; orthographic cameras
    /// keep their height and widen or narrow horizontally.
    pub fn set_aspect(&mut self, aspect: f32) {
        if !(aspect.is_finite() && aspect > 0.0) {
            return;
        }
        match &mut self.projection {
            Projection::Perspective { aspect: a, .. } => *a = aspect,
            Projection::Orthographic { left, right, bottom, top, .. } => {
                let half_h = (*top - *bottom) * 0.5;
                let cx = (*left + *right) * 0.5;
                *left = cx - half_h * aspect;
                *right = cx + half_h * aspect;
            }
        }
    }

    /// Whether the parameters form a usable projection: finite values, a
    /// positive perspective near plane in front of far, non-empty extents.
    pub fn is_valid(&self) -> bool {
        match self.projection {
            Projection::Perspective { fov_y, aspect, near, far } => {
                [fov_y, aspect, near, far].iter().all(|v| v.is_finite())
                    && fov_y > 0.0
                    && aspect > 0.0
                    && near > 0.0
                    && far > near
            }
            Projection::Orthographic { left, right, bottom, top, near, far } => {
                [left, right, bottom, top, near, far].iter().all(|v| v.is_finite())
                    && left != right
                    && bottom != top
                    && far > near
            }
        }
    }

    #[inline]
    pub fn near_far(&self) -> (f32, f32) {
        match self.projection {
            Projection::Perspective { near, far, .. } => (near, far),
            Projection::Orthographic { near, far, .. } => (near, far),
        }
    }

    /// GL-convention projection (clip z in `-w..w`). Identity when
    /// [`is_valid`](Self::is_valid) is false.
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        if !self.is_valid() {
            return Matrix4::identity();
        }
        let zoom = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        match self.projection {
            Projection::Perspective { fov_y, aspect, near, far } => {
                let fov = (fov_y / zoom).clamp(0.01, 179.0);
                perspective(Deg(fov), aspect.max(1e-6), near, far)
            }
            Projection::Orthographic { left, right, bottom, top, near, far } => {
                ortho(left / zoom, right / zoom, bottom / zoom, top / zoom, near, far)
            }
        }
    }

    /// View matrix for a camera node with the given world matrix.
    pub fn view_matrix(world: &Matrix4<f32>) -> Matrix4<f32> {
        world.invert().unwrap_or_else(Matrix4::identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Transform, Point3, Vector3};

    #[test]
    fn view_is_inverse_of_world() {
        let world = Matrix4::from_translation(Vector3::new(0.0, 0.0, 5.0));
        let view = Camera::view_matrix(&world);
        let p = view.transform_point(Point3::new(0.0, 0.0, 0.0));
        assert!((p.z + 5.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_planes_are_invalid_and_do_not_panic() {
        assert!(Camera::perspective(45.0, 1.0, 0.1, 10.0).is_valid());
        assert!(Camera::orthographic(1.0, 1.0, -1.0, 1.0).is_valid());

        for cam in [
            Camera::perspective(45.0, 1.0, 0.0, 10.0),
            Camera::perspective(45.0, 1.0, 1.0, 1.0),
            Camera::perspective(45.0, 1.0, 0.1, f32::INFINITY),
            Camera::perspective(0.0, 1.0, 0.1, 10.0),
            Camera::orthographic(0.0, 1.0, 0.0, 1.0),
        ] {
            assert!(!cam.is_valid(), "{cam:?}");
            assert_eq!(cam.projection_matrix(), Matrix4::identity());
        }
    }

    #[test]
    fn set_aspect_rejects_garbage() {
        let mut cam = Camera::perspective(45.0, 1.5, 0.1, 10.0);
        cam.set_aspect(0.0);
        cam.set_aspect(f32::NAN);
        assert_eq!(
            cam.projection,
            Projection::Perspective { fov_y: 45.0, aspect: 1.5, near: 0.1, far: 10.0 }
        );
    }
}
