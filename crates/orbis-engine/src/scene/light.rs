use cgmath::Point3;

use crate::math::Color;

/// Light category with its category-specific parameters.
///
/// Directional and spot lights aim from their node's world position towards
/// `target` (world space).
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LightKind {
    Ambient,
    Directional { target: Point3<f32> },
    Point { distance: f32, decay: f32 },
    Spot { target: Point3<f32>, distance: f32, angle: f32, penumbra: f32, decay: f32 },
    Hemisphere { ground_color: Color },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f32,
    pub cast_shadow: bool,
}

impl Light {
    fn with_kind(kind: LightKind, color: Color, intensity: f32) -> Self {
        Self { kind, color, intensity, cast_shadow: false }
    }

    pub fn ambient(color: Color, intensity: f32) -> Self {
        Self::with_kind(LightKind::Ambient, color, intensity)
    }

    pub fn directional(color: Color, intensity: f32) -> Self {
        Self::with_kind(
            LightKind::Directional { target: Point3::new(0.0, 0.0, 0.0) },
            color,
            intensity,
        )
    }

    pub fn point(color: Color, intensity: f32, distance: f32) -> Self {
        Self::with_kind(LightKind::Point { distance, decay: 2.0 }, color, intensity)
    }

    /// `angle` is the cone half-angle in radians.
    pub fn spot(color: Color, intensity: f32, distance: f32, angle: f32) -> Self {
        Self::with_kind(
            LightKind::Spot {
                target: Point3::new(0.0, 0.0, 0.0),
                distance,
                angle,
                penumbra: 0.0,
                decay: 2.0,
            },
            color,
            intensity,
        )
    }

    pub fn hemisphere(sky: Color, ground: Color, intensity: f32) -> Self {
        Self::with_kind(LightKind::Hemisphere { ground_color: ground }, sky, intensity)
    }

    /// Ambient and hemisphere lights never cast shadows.
    pub fn shadow_capable(&self) -> bool {
        matches!(
            self.kind,
            LightKind::Directional { .. } | LightKind::Point { .. } | LightKind::Spot { .. }
        )
    }
}
