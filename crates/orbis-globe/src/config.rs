use orbis_engine::math::Color;

/// Front-end settings. Every field can be overridden from the environment,
/// see [`GlobeConfig::from_lookup`].
#[derive(Debug, Clone, PartialEq)]
pub struct GlobeConfig {
    pub radius: f32,
    /// Longitude segments of the globe sphere; latitude uses half.
    pub segments: u32,
    /// Auto-rotation in degrees per second.
    pub rotation_speed: f32,
    /// `(latitude, longitude)` of the glass marker, degrees.
    pub marker: (f32, f32),
    pub texture_size: (u32, u32),
    pub background: Color,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            radius: 1.0,
            segments: 64,
            rotation_speed: 6.0,
            marker: (48.85, 2.35),
            texture_size: (512, 256),
            background: Color::rgb(0.005, 0.008, 0.02),
        }
    }
}

pub const RADIUS: &str = "ORBIS_GLOBE_RADIUS";
pub const SEGMENTS: &str = "ORBIS_GLOBE_SEGMENTS";
pub const ROTATION_SPEED: &str = "ORBIS_GLOBE_ROTATION_SPEED";
pub const MARKER: &str = "ORBIS_GLOBE_MARKER";

impl GlobeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns. Values that don't
    /// parse or are out of range are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(radius) = parse(&lookup, RADIUS, |v: f32| v.is_finite() && v > 0.0) {
            config.radius = radius;
        }
        if let Some(segments) = parse(&lookup, SEGMENTS, |v: u32| (8..=512).contains(&v)) {
            config.segments = segments;
        }
        if let Some(speed) = parse(&lookup, ROTATION_SPEED, |v: f32| v.is_finite()) {
            config.rotation_speed = speed;
        }
        if let Some(raw) = lookup(MARKER) {
            match parse_lat_lon(&raw) {
                Some(marker) => config.marker = marker,
                None => log::warn!("ignoring {MARKER}={raw:?}; expected \"lat,lon\" in degrees"),
            }
        }
        config
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    valid: impl Fn(T) -> bool,
) -> Option<T>
where
    T: Copy,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) if valid(v) => Some(v),
        _ => {
            log::warn!("ignoring {key}={raw:?}");
            None
        }
    }
}

fn parse_lat_lon(raw: &str) -> Option<(f32, f32)> {
    let (lat, lon) = raw.split_once(',')?;
    let lat: f32 = lat.trim().parse().ok()?;
    let lon: f32 = lon.trim().parse().ok()?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)).then_some((lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(GlobeConfig::from_lookup(|_| None), GlobeConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = GlobeConfig::from_lookup(lookup(&[
            (RADIUS, "2.5"),
            (SEGMENTS, " 96 "),
            (ROTATION_SPEED, "-10"),
            (MARKER, "-33.9, 151.2"),
        ]));
        assert_eq!(config.radius, 2.5);
        assert_eq!(config.segments, 96);
        assert_eq!(config.rotation_speed, -10.0);
        assert_eq!(config.marker, (-33.9, 151.2));
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = GlobeConfig::from_lookup(lookup(&[
            (RADIUS, "-1"),
            (SEGMENTS, "4"),
            (ROTATION_SPEED, "fast"),
            (MARKER, "95,0"),
        ]));
        assert_eq!(config, GlobeConfig::default());
    }
}
