use crate::backend::Capabilities;
use crate::error::{EngineError, EngineResult};
use crate::math::ColorSpace;

/// Hands out texture units for one draw. Reset before every item.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureUnits {
    next: u32,
    max: u32,
}

impl TextureUnits {
    pub fn new(max: u32) -> Self {
        Self { next: 0, max }
    }

    pub fn allocate(&mut self) -> EngineResult<u32> {
        if self.next >= self.max {
            return Err(EngineError::TextureUnitOutOfRange { unit: self.next, max: self.max });
        }
        let unit = self.next;
        self.next += 1;
        Ok(unit)
    }

    #[inline]
    pub fn reset(&mut self) {
        self.next = 0;
    }

    #[inline]
    pub fn allocated(&self) -> u32 {
        self.next
    }
}

/// Renderer-owned state shared by the subsystems of one renderer:
/// capabilities queried once from the backend, color management and
/// texture-unit allocation.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub capabilities: Capabilities,
    pub output_color_space: ColorSpace,
    pub texture_units: TextureUnits,
}

impl RenderContext {
    pub fn new(capabilities: Capabilities, output_color_space: ColorSpace) -> Self {
        Self {
            texture_units: TextureUnits::new(capabilities.max_texture_units),
            capabilities,
            output_color_space,
        }
    }

    /// Whether shaders must encode sRGB themselves.
    #[inline]
    pub fn encodes_srgb_in_shader(&self) -> bool {
        self.output_color_space == ColorSpace::Srgb && !self.capabilities.srgb_output
    }
}
