//! The globe scene: textured earth, graticule, atmosphere shell, a glass
//! marker, sun and ambient light.

use cgmath::{Point3, Rad, Vector3};

use orbis_engine::geometry::{shapes, PrimitiveTopology};
use orbis_engine::material::{params, Material, ParamValue, Side};
use orbis_engine::math::{Color, ColorSpace};
use orbis_engine::scene::{Camera, Drawable, Light, Node, NodeId, Scene};
use orbis_engine::EngineResult;

use crate::config::GlobeConfig;
use crate::texture;

/// Graticule spacing in degrees.
const GRATICULE_STEP: i32 = 30;

pub struct GlobeScene {
    pub scene: Scene,
    pub camera: NodeId,
    /// Group carrying the globe, graticule and marker; spun by the animation.
    pub earth: NodeId,
    pub marker: NodeId,
}

/// Point on a sphere of `radius` at `lat`/`lon` degrees, matching the UV
/// layout of [`shapes::uv_sphere`].
pub fn lat_lon_to_point(lat: f32, lon: f32, radius: f32) -> Point3<f32> {
    let polar = (90.0 - lat).to_radians();
    let azimuth = (lon + 180.0).to_radians();
    Point3::new(
        -radius * azimuth.cos() * polar.sin(),
        radius * polar.cos(),
        radius * azimuth.sin() * polar.sin(),
    )
}

fn graticule(radius: f32) -> Vec<Vec<Point3<f32>>> {
    let mut lines = Vec::new();
    let mut lat = -90 + GRATICULE_STEP;
    while lat < 90 {
        lines.push((0..=72).map(|i| lat_lon_to_point(lat as f32, i as f32 * 5.0 - 180.0, radius)).collect());
        lat += GRATICULE_STEP;
    }
    let mut lon = -180;
    while lon < 180 {
        lines.push((0..=36).map(|i| lat_lon_to_point(90.0 - i as f32 * 5.0, lon as f32, radius)).collect());
        lon += GRATICULE_STEP;
    }
    lines
}

impl GlobeScene {
    pub fn build(config: &GlobeConfig, aspect: f32) -> EngineResult<Self> {
        let r = config.radius;
        let mut scene = Scene::new();
        scene.background = Some(config.background);

        let camera = scene.add(
            Node::camera(Camera::perspective(45.0, aspect, r * 0.05, r * 50.0))
                .named("camera")
                .at(Vector3::new(0.0, 0.0, r * 3.0)),
        );
        let earth = scene.add(Node::group().named("earth"));

        // Globe.
        let (w, h) = config.texture_size;
        let map = scene.add_texture(texture::earth(w, h).with_color_space(ColorSpace::Srgb));
        let surface = scene.add_material(
            Material::standard(Color::white(), 0.85, 0.0).with_param(params::MAP, ParamValue::Texture(map)),
        );
        let sphere = scene.add_geometry(shapes::uv_sphere(r, config.segments, config.segments / 2));
        scene.add_to(earth, Node::mesh(Drawable::new(sphere, surface)).named("globe"))?;

        // Graticule, slightly above the surface.
        let lines = scene.add_geometry(shapes::line_segments(&graticule(r * 1.003)));
        let ink = scene.add_material(Material::basic(Color::rgb(0.75, 0.82, 0.9)).translucent(0.35));
        scene.add_to(
            earth,
            Node::mesh(Drawable::new(lines, ink).with_topology(PrimitiveTopology::Lines)).named("graticule"),
        )?;

        // Marker.
        let (lat, lon) = config.marker;
        let mut glass = Material::standard(Color::rgb(0.9, 0.95, 1.0), 0.05, 0.0);
        glass.set_transmission(1.0);
        let glass = scene.add_material(glass);
        let bead = scene.add_geometry(shapes::uv_sphere(r * 0.04, 16, 8));
        let p = lat_lon_to_point(lat, lon, r);
        let marker = scene.add_to(
            earth,
            Node::mesh(Drawable::new(bead, glass)).named("marker").at(Vector3::new(p.x, p.y, p.z)),
        )?;

        // Atmosphere; stays put while the earth turns.
        let mut haze = Material::lambert(Color::rgb(0.35, 0.6, 1.0)).translucent(0.18);
        haze.set_side(Side::Back);
        let haze = scene.add_material(haze);
        let shell = scene.add_geometry(shapes::uv_sphere(r * 1.06, 48, 24));
        scene.add(Node::mesh(Drawable::new(shell, haze)).named("atmosphere"));

        scene.add(Node::light(Light::directional(Color::white(), 2.2)).named("sun").at(Vector3::new(5.0, 2.0, 4.0)));
        scene.add(Node::light(Light::ambient(Color::rgb(0.6, 0.7, 1.0), 0.15)).named("ambient"));

        scene.graph.look_at(camera, Point3::new(0.0, 0.0, 0.0))?;
        log::info!(
            "globe scene: {} nodes, {} geometries, {} materials",
            scene.graph.len(),
            scene.geometries.len(),
            scene.materials.len()
        );
        Ok(Self { scene, camera, earth, marker })
    }

    /// Turns the earth group about its polar axis.
    pub fn spin(&mut self, degrees: f32) -> EngineResult<()> {
        self.scene.graph.rotate_on_axis(self.earth, Vector3::unit_y(), Rad(degrees.to_radians()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{EuclideanSpace, InnerSpace};
    use orbis_engine::backend::RecordingBackend;
    use orbis_engine::{Renderer, RendererConfig};

    fn close(a: Point3<f32>, b: Point3<f32>) -> bool {
        (a - b).magnitude() < 1e-5
    }

    #[test]
    fn lat_lon_matches_sphere_layout() {
        assert!(close(lat_lon_to_point(0.0, 0.0, 2.0), Point3::new(2.0, 0.0, 0.0)));
        assert!(close(lat_lon_to_point(90.0, 45.0, 2.0), Point3::new(0.0, 2.0, 0.0)));
        assert!(close(lat_lon_to_point(0.0, -180.0, 1.0), Point3::new(-1.0, 0.0, 0.0)));
        assert!((lat_lon_to_point(48.85, 2.35, 3.0).to_vec().magnitude() - 3.0).abs() < 1e-5);
    }

    #[test]
    fn graticule_has_parallels_and_meridians() {
        // Five parallels between the poles, twelve meridians.
        assert_eq!(graticule(1.0).len(), 5 + 12);
    }

    #[test]
    fn globe_renders_with_transmission_prepass() {
        let mut globe = GlobeScene::build(&GlobeConfig { segments: 16, texture_size: (16, 8), ..GlobeConfig::default() }, 1.5)
            .unwrap();
        let mut renderer = Renderer::new(RecordingBackend::new(), RendererConfig::default());
        renderer.set_size(300, 200);

        let info = renderer.render(&mut globe.scene, globe.camera).unwrap();
        assert!(info.transmission_pass);
        assert_eq!(info.skipped, 0);
        // Globe twice (pre-pass and main), then graticule, atmosphere, marker.
        assert_eq!(info.draw_calls, 5);
        assert!(info.lines > 0);
        assert!(info.triangles > 0);
    }

    #[test]
    fn spin_moves_the_marker_but_not_the_atmosphere() {
        let mut globe = GlobeScene::build(&GlobeConfig::default(), 1.0).unwrap();
        let root = globe.scene.root();
        globe.scene.graph.update_world_transforms(root, false).unwrap();
        let before = globe.scene.graph.world_position(globe.marker).unwrap();

        globe.spin(90.0).unwrap();
        globe.scene.graph.update_world_transforms(root, false).unwrap();
        let after = globe.scene.graph.world_position(globe.marker).unwrap();
        assert!(!close(before, after));
        assert!((before.y - after.y).abs() < 1e-5);
    }
}
