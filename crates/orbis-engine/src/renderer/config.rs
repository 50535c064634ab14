use crate::math::{Color, ColorSpace, Plane};

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum ToneMapping {
    #[default]
    None,
    Linear,
    Reinhard,
    AcesFilmic,
}

/// Shadow-map filtering. Carried into program variants; shadow passes
/// themselves are not rendered.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum ShadowMapType {
    Basic,
    #[default]
    Pcf,
    PcfSoft,
}

/// Renderer-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Used when the scene has no background.
    pub clear_color: Color,
    /// Off keeps traversal order inside each bucket.
    pub sort_objects: bool,
    pub tone_mapping: ToneMapping,
    pub tone_mapping_exposure: f32,
    pub output_color_space: ColorSpace,
    /// `None` disables shadow maps.
    pub shadow_map: Option<ShadowMapType>,
    /// World-space planes; fragments on the negative side are discarded.
    pub clipping_planes: Vec<Plane>,
    /// Transmission target size relative to the drawing buffer.
    pub transmission_resolution_scale: f32,
    pub pixel_ratio: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: Color::black(),
            sort_objects: true,
            tone_mapping: ToneMapping::None,
            tone_mapping_exposure: 1.0,
            output_color_space: ColorSpace::Srgb,
            shadow_map: None,
            clipping_planes: Vec::new(),
            transmission_resolution_scale: 1.0,
            pixel_ratio: 1.0,
        }
    }
}
