use crate::backend::BlendConfig;
use crate::material::{BlendComponent, BlendEquation, BlendFactor, Blending};

const fn add(src: BlendFactor, dst: BlendFactor) -> BlendComponent {
    BlendComponent { equation: BlendEquation::Add, src, dst }
}

/// Resolves a material blending mode to concrete equations and factors.
/// `None` means blending is disabled.
pub fn blend_config(blending: Blending, premultiplied_alpha: bool) -> Option<BlendConfig> {
    use BlendFactor::*;

    let (color, alpha) = match (blending, premultiplied_alpha) {
        (Blending::None, _) => return None,
        (Blending::Custom(custom), _) => (custom.color, custom.alpha),

        (Blending::Normal, false) => (add(SrcAlpha, OneMinusSrcAlpha), add(One, OneMinusSrcAlpha)),
        (Blending::Normal, true) => (add(One, OneMinusSrcAlpha), add(One, OneMinusSrcAlpha)),

        (Blending::Additive, false) => (add(SrcAlpha, One), add(One, One)),
        (Blending::Additive, true) => (add(One, One), add(One, One)),

        (Blending::Subtractive, false) => (add(Zero, OneMinusSrc), add(Zero, One)),
        (Blending::Subtractive, true) => (add(Zero, OneMinusSrc), add(Zero, OneMinusSrcAlpha)),

        (Blending::Multiply, false) => (add(Zero, Src), add(Zero, SrcAlpha)),
        (Blending::Multiply, true) => (add(Zero, Src), add(Zero, SrcAlpha)),
    };
    Some(BlendConfig { color, alpha })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::CustomBlending;

    #[test]
    fn none_disables() {
        assert_eq!(blend_config(Blending::None, false), None);
        assert_eq!(blend_config(Blending::None, true), None);
    }

    #[test]
    fn premultiplied_normal_uses_one_for_source() {
        let straight = blend_config(Blending::Normal, false).unwrap();
        let premul = blend_config(Blending::Normal, true).unwrap();
        assert_eq!(straight.color.src, BlendFactor::SrcAlpha);
        assert_eq!(premul.color.src, BlendFactor::One);
        assert_eq!(premul.color.dst, BlendFactor::OneMinusSrcAlpha);
    }

    #[test]
    fn custom_passes_through_with_separate_alpha() {
        let custom = CustomBlending {
            color: BlendComponent {
                equation: BlendEquation::ReverseSubtract,
                src: BlendFactor::Dst,
                dst: BlendFactor::One,
            },
            alpha: BlendComponent { equation: BlendEquation::Max, src: BlendFactor::One, dst: BlendFactor::One },
        };
        let cfg = blend_config(Blending::Custom(custom), true).unwrap();
        assert_eq!(cfg.color, custom.color);
        assert_eq!(cfg.alpha, custom.alpha);
    }
}
