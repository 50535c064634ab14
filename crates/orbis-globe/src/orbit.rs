//! Drag-to-rotate, scroll-to-zoom camera around the globe.

use std::f32::consts::FRAC_PI_2;

use cgmath::{Point3, Vector3};
use winit::event::MouseScrollDelta;

use orbis_engine::scene::NodeId;
use orbis_engine::{EngineError, EngineResult, Scene};

/// Keeps the camera off the poles so `look_at` stays well defined.
const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.017;
/// Pixel deltas per wheel "line" on touchpads.
const PIXELS_PER_LINE: f32 = 50.0;

#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Radians per pixel dragged.
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub target: Point3<f32>,
    dragging: bool,
    last_pointer: Option<(f64, f64)>,
}

impl OrbitControls {
    pub fn new(radius: f32) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.3,
            distance: radius * 3.0,
            min_distance: radius * 1.3,
            max_distance: radius * 8.0,
            rotate_speed: 0.005,
            zoom_speed: 0.15,
            target: Point3::new(0.0, 0.0, 0.0),
            dragging: false,
            last_pointer: None,
        }
    }

    pub fn eye(&self) -> Point3<f32> {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        self.target + Vector3::new(cp * sy, sp, cp * cy) * self.distance
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn begin_drag(&mut self) {
        self.dragging = true;
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
    }

    /// Tracks the pointer; rotates by the delta while a drag is active.
    pub fn pointer_moved(&mut self, x: f64, y: f64) {
        if let Some((lx, ly)) = self.last_pointer.replace((x, y)) {
            if self.dragging {
                self.rotate((x - lx) as f32, (y - ly) as f32);
            }
        }
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * self.rotate_speed;
        self.pitch = (self.pitch + dy * self.rotate_speed).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Positive steps move closer.
    pub fn zoom(&mut self, steps: f32) {
        self.distance = (self.distance * (-steps * self.zoom_speed).exp()).clamp(self.min_distance, self.max_distance);
    }

    pub fn scroll(&mut self, delta: MouseScrollDelta) {
        match delta {
            MouseScrollDelta::LineDelta(_, y) => self.zoom(y),
            MouseScrollDelta::PixelDelta(p) => self.zoom(p.y as f32 / PIXELS_PER_LINE),
        }
    }

    /// Moves `camera` to the orbit position and refreshes its aspect.
    pub fn apply(&self, scene: &mut Scene, camera: NodeId, aspect: f32) -> EngineResult<()> {
        let eye = self.eye();
        scene.graph.set_position(camera, Vector3::new(eye.x, eye.y, eye.z))?;
        scene.graph.look_at(camera, self.target)?;
        scene
            .graph
            .node_mut(camera)?
            .as_camera_mut()
            .ok_or(EngineError::InvalidNode(camera))?
            .set_aspect(aspect);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{EuclideanSpace, InnerSpace};
    use winit::dpi::PhysicalPosition;

    #[test]
    fn eye_sits_at_distance_from_target() {
        let mut orbit = OrbitControls::new(1.0);
        orbit.rotate(123.0, -45.0);
        assert!(((orbit.eye() - orbit.target).magnitude() - orbit.distance).abs() < 1e-5);

        let front = OrbitControls { pitch: 0.0, ..OrbitControls::new(1.0) };
        assert!((front.eye().to_vec() - Vector3::new(0.0, 0.0, 3.0)).magnitude() < 1e-5);
    }

    #[test]
    fn pitch_is_clamped_short_of_the_poles() {
        let mut orbit = OrbitControls::new(1.0);
        orbit.rotate(0.0, 10_000.0);
        assert_eq!(orbit.pitch, PITCH_LIMIT);
        orbit.rotate(0.0, -100_000.0);
        assert_eq!(orbit.pitch, -PITCH_LIMIT);
    }

    #[test]
    fn zoom_stays_within_limits() {
        let mut orbit = OrbitControls::new(1.0);
        orbit.scroll(MouseScrollDelta::LineDelta(0.0, 100.0));
        assert_eq!(orbit.distance, orbit.min_distance);
        orbit.scroll(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -50_000.0)));
        assert_eq!(orbit.distance, orbit.max_distance);
    }

    #[test]
    fn pointer_rotates_only_while_dragging() {
        let mut orbit = OrbitControls::new(1.0);
        orbit.pointer_moved(10.0, 10.0);
        orbit.pointer_moved(60.0, 10.0);
        assert_eq!(orbit.yaw, 0.0);

        orbit.begin_drag();
        orbit.pointer_moved(110.0, 10.0);
        assert!((orbit.yaw + 50.0 * orbit.rotate_speed).abs() < 1e-6);

        orbit.end_drag();
        orbit.pointer_moved(500.0, 10.0);
        assert!((orbit.yaw + 50.0 * orbit.rotate_speed).abs() < 1e-6);
    }

    #[test]
    fn apply_moves_camera() {
        let config = crate::config::GlobeConfig::default();
        let mut globe = crate::scene::GlobeScene::build(&config, 1.0).unwrap();
        let orbit = OrbitControls { yaw: 1.0, ..OrbitControls::new(config.radius) };
        orbit.apply(&mut globe.scene, globe.camera, 2.0).unwrap();

        let root = globe.scene.root();
        globe.scene.graph.update_world_transforms(root, false).unwrap();
        let at = globe.scene.graph.world_position(globe.camera).unwrap();
        assert!((at - orbit.eye()).magnitude() < 1e-4);
        assert!(orbit.apply(&mut globe.scene, globe.earth, 2.0).is_err());
    }
}
