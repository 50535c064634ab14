use crate::arena::Handle;
use crate::math::ColorSpace;

pub type TextureId = Handle<Texture>;

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum TextureTarget {
    #[default]
    D2,
    Cube,
}

/// Pixel layout of texture data.
///
/// Compressed formats are accepted as data but only uploaded when the backend
/// reports support for them.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum TextureFormat {
    #[default]
    Rgba8,
    R8,
    Rgba16Float,
    Bc1Rgba,
    Etc2Rgb8,
}

impl TextureFormat {
    /// Bytes per 4x4 block for compressed formats, per pixel otherwise.
    pub fn block_size(self) -> (u32, u32) {
        match self {
            Self::Rgba8 => (1, 4),
            Self::R8 => (1, 1),
            Self::Rgba16Float => (1, 8),
            Self::Bc1Rgba | Self::Etc2Rgb8 => (4, 8),
        }
    }

    #[inline]
    pub fn is_compressed(self) -> bool {
        matches!(self, Self::Bc1Rgba | Self::Etc2Rgb8)
    }

    /// Expected byte length of one layer.
    pub fn layer_size(self, width: u32, height: u32) -> usize {
        let (block, bytes) = self.block_size();
        let bw = width.div_ceil(block);
        let bh = height.div_ceil(block);
        (bw * bh * bytes) as usize
    }
}

/// CPU-side image plus sampling metadata. Uploaded on first use; a version
/// bump triggers a re-upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub name: String,
    width: u32,
    height: u32,
    format: TextureFormat,
    target: TextureTarget,
    color_space: ColorSpace,
    data: Vec<u8>,
    version: u32,
}

impl Texture {
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, data: Vec<u8>) -> Self {
        Self {
            name: String::new(),
            width,
            height,
            format,
            target: TextureTarget::D2,
            color_space: ColorSpace::Srgb,
            data,
            version: 0,
        }
    }

    /// Six faces, `+X -X +Y -Y +Z -Z`, concatenated.
    pub fn new_cube(size: u32, format: TextureFormat, faces: Vec<u8>) -> Self {
        Self {
            target: TextureTarget::Cube,
            ..Self::new_2d(size, size, format, faces)
        }
    }

    /// Single RGBA8 pixel, used as a stand-in for unbound slots.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self::new_2d(1, 1, TextureFormat::Rgba8, rgba.to_vec())
    }

    pub fn with_color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    #[inline]
    pub fn target(&self) -> TextureTarget {
        self.target
    }

    #[inline]
    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn layers(&self) -> u32 {
        match self.target {
            TextureTarget::D2 => 1,
            TextureTarget::Cube => 6,
        }
    }

    /// Whether `data` holds exactly the bytes the dimensions call for.
    pub fn is_complete(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() == self.format.layer_size(self.width, self.height) * self.layers() as usize
    }

    /// Replaces pixel data (same dimensions) and schedules a re-upload.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
        self.version = self.version.wrapping_add(1);
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completeness_accounts_for_layers_and_blocks() {
        assert!(Texture::solid([255, 0, 0, 255]).is_complete());
        assert!(!Texture::new_2d(2, 2, TextureFormat::Rgba8, vec![0; 4]).is_complete());
        assert!(Texture::new_cube(1, TextureFormat::Rgba8, vec![0; 24]).is_complete());
        // 5x5 BC1 rounds up to 2x2 blocks.
        assert!(Texture::new_2d(5, 5, TextureFormat::Bc1Rgba, vec![0; 32]).is_complete());
    }
}
