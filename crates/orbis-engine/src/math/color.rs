/// Linear straight-alpha RGBA color.
///
/// Values are expected in linear space. Inputs authored in sRGB (hex literals,
/// color pickers) go through [`Color::from_srgb_u8`] or [`Color::from_hex`].
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Color space of texture data or of the final framebuffer encoding.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ColorSpace {
    #[default]
    Srgb,
    Linear,
}

impl Color {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    #[inline]
    pub const fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    #[inline]
    pub const fn white() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }

    #[inline]
    pub const fn transparent() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Opaque color from a `0xRRGGBB` sRGB literal.
    #[inline]
    pub fn from_hex(hex: u32) -> Self {
        Self::from_srgb_u8((hex >> 16) as u8, (hex >> 8) as u8, hex as u8, 255)
    }

    /// Linear color from straight sRGB bytes. Alpha is not gamma encoded.
    #[inline]
    pub fn from_srgb_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: srgb_to_linear(r as f32 / 255.0),
            g: srgb_to_linear(g as f32 / 255.0),
            b: srgb_to_linear(b as f32 / 255.0),
            a: a as f32 / 255.0,
        }
    }

    /// sRGB-encoded bytes, used when baking procedural textures.
    #[inline]
    pub fn to_srgb_u8(self) -> [u8; 4] {
        let enc = |c: f32| (linear_to_srgb(c.clamp(0.0, 1.0)) * 255.0 + 0.5) as u8;
        [enc(self.r), enc(self.g), enc(self.b), (self.a.clamp(0.0, 1.0) * 255.0 + 0.5) as u8]
    }

    #[inline]
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    #[inline]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[inline]
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
}

#[inline]
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 { c * 12.92 } else { 1.055 * c.powf(1.0 / 2.4) - 0.055 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_white_is_linear_one() {
        let c = Color::from_hex(0xffffff);
        assert!((c.r - 1.0).abs() < 1e-6 && (c.g - 1.0).abs() < 1e-6 && (c.b - 1.0).abs() < 1e-6);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn srgb_mid_gray_round_trips_through_bytes() {
        let c = Color::from_srgb_u8(128, 64, 200, 255);
        assert_eq!(c.to_srgb_u8(), [128, 64, 200, 255]);
        assert!(c.r < 128.0 / 255.0);
    }
}
