//! Procedural equirectangular earth-like texture.

use orbis_engine::material::{Texture, TextureFormat};

const OCEAN: [f32; 3] = [18.0, 52.0, 112.0];
const SHALLOW: [f32; 3] = [34.0, 96.0, 150.0];
const LOWLAND: [f32; 3] = [72.0, 118.0, 58.0];
const HIGHLAND: [f32; 3] = [138.0, 120.0, 84.0];
const ICE: [u8; 4] = [236, 240, 246, 255];

/// Polar caps start at this latitude.
pub const ICE_LATITUDE: f32 = 72.0;

/// Smooth pseudo-terrain height in roughly `-1.5..1.5`; land above 0.3.
fn elevation(lat: f32, lon: f32) -> f32 {
    let (la, lo) = (lat.to_radians(), lon.to_radians());
    (3.0 * lo).sin() * (2.0 * la).cos()
        + 0.5 * (5.0 * lo + 1.3).sin() * (3.0 * la + 0.7).sin()
        + 0.3 * (7.0 * lo - 2.0 * la).cos()
}

fn mix(a: [f32; 3], b: [f32; 3], t: f32) -> [u8; 4] {
    let t = t.clamp(0.0, 1.0);
    let c = |i: usize| (a[i] + (b[i] - a[i]) * t).round() as u8;
    [c(0), c(1), c(2), 255]
}

/// Texel color at a latitude/longitude, degrees.
pub fn texel(lat: f32, lon: f32) -> [u8; 4] {
    if lat.abs() >= ICE_LATITUDE {
        return ICE;
    }
    let h = elevation(lat, lon);
    if h < 0.3 {
        mix(OCEAN, SHALLOW, (h + 0.5) / 0.8)
    } else {
        mix(LOWLAND, HIGHLAND, (h - 0.3) / 1.0)
    }
}

/// `width` x `height` RGBA8 sRGB texture; `u` follows longitude from -180,
/// `v` latitude from the north pole.
pub fn earth(width: u32, height: u32) -> Texture {
    let (w, h) = (width.max(2), height.max(2));
    let mut data = Vec::with_capacity((w * h * 4) as usize);
    for y in 0..h {
        let lat = 90.0 - (y as f32 + 0.5) / h as f32 * 180.0;
        for x in 0..w {
            let lon = (x as f32 + 0.5) / w as f32 * 360.0 - 180.0;
            data.extend_from_slice(&texel(lat, lon));
        }
    }
    let mut texture = Texture::new_2d(w, h, TextureFormat::Rgba8, data);
    texture.name = "earth".to_string();
    texture
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_is_complete_with_polar_ice() {
        let t = earth(64, 32);
        assert!(t.is_complete());
        assert_eq!(t.data().len(), 64 * 32 * 4);
        assert_eq!(&t.data()[..4], &ICE);
        let last = t.data().len() - 4;
        assert_eq!(&t.data()[last..], &ICE);
    }

    #[test]
    fn has_both_land_and_sea() {
        let t = earth(128, 64);
        let greenish = t.data().chunks(4).filter(|p| p[1] > p[2]).count();
        let bluish = t.data().chunks(4).filter(|p| p[2] > p[1] && p[0] < 100).count();
        assert!(greenish > 0);
        assert!(bluish > 0);
    }
}
