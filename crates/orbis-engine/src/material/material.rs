use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::arena::Handle;
use crate::math::Color;

use super::TextureId;

pub type MaterialId = Handle<Material>;

/// Conventional parameter names read by the built-in shaders.
pub mod params {
    pub const COLOR: &str = "color";
    pub const EMISSIVE: &str = "emissive";
    pub const ROUGHNESS: &str = "roughness";
    pub const METALNESS: &str = "metalness";
    pub const MAP: &str = "map";
    pub const NORMAL_MAP: &str = "normal_map";
    pub const EMISSIVE_MAP: &str = "emissive_map";
}

/// Faces that get rasterized.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum CompareFunc {
    Never,
    Less,
    Equal,
    #[default]
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendEquation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    Src,
    OneMinusSrc,
    SrcAlpha,
    OneMinusSrcAlpha,
    Dst,
    OneMinusDst,
    DstAlpha,
    OneMinusDstAlpha,
    SrcAlphaSaturated,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BlendComponent {
    pub equation: BlendEquation,
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

/// Blend setup with separate alpha.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct CustomBlending {
    pub color: BlendComponent,
    pub alpha: BlendComponent,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Blending {
    None,
    #[default]
    Normal,
    Additive,
    Subtractive,
    Multiply,
    Custom(CustomBlending),
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum StencilOp {
    #[default]
    Keep,
    Zero,
    Replace,
    IncrementClamp,
    DecrementClamp,
    Invert,
    IncrementWrap,
    DecrementWrap,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Stencil {
    pub func: CompareFunc,
    pub reference: u32,
    pub read_mask: u32,
    pub write_mask: u32,
    pub fail: StencilOp,
    pub depth_fail: StencilOp,
    pub pass: StencilOp,
}

impl Default for Stencil {
    fn default() -> Self {
        Self {
            func: CompareFunc::Always,
            reference: 0,
            read_mask: 0xff,
            write_mask: 0xff,
            fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            pass: StencilOp::Keep,
        }
    }
}

/// User-supplied WGSL. Must define `vs_main` and `fs_main` against the
/// engine's bind group layout.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomShader {
    source: String,
    id: u64,
}

impl CustomShader {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let mut h = DefaultHasher::new();
        source.hash(&mut h);
        Self { id: h.finish(), source }
    }

    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Identity derived from the source text.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKind {
    /// Unlit.
    Basic,
    Lambert,
    Standard,
    Shader(CustomShader),
}

/// Named material parameter.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Color(Color),
    Int(i32),
    Bool(bool),
    Texture(TextureId),
    Mat4([[f32; 4]; 4]),
}

/// Render-state flags, shader kind and parameters.
///
/// Flags that only change fixed-function state are plain fields. Anything
/// that changes which shader variant is needed goes through a setter that
/// bumps [`version`](Self::version); the renderer re-resolves the program when
/// the version it remembered no longer matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub visible: bool,
    pub transparent: bool,
    pub opacity: f32,
    pub blending: Blending,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: CompareFunc,
    pub color_write: bool,
    pub stencil: Option<Stencil>,

    kind: MaterialKind,
    side: Side,
    premultiplied_alpha: bool,
    transmission: f32,
    vertex_colors: bool,
    fog: bool,
    alpha_test: f32,
    params: BTreeMap<String, ParamValue>,
    version: u32,
}

impl Material {
    pub fn new(kind: MaterialKind) -> Self {
        Self {
            name: String::new(),
            visible: true,
            transparent: false,
            opacity: 1.0,
            blending: Blending::Normal,
            premultiplied_alpha: false,
            depth_test: true,
            depth_write: true,
            depth_func: CompareFunc::LessEqual,
            color_write: true,
            stencil: None,
            kind,
            side: Side::Front,
            transmission: 0.0,
            vertex_colors: false,
            fog: true,
            alpha_test: 0.0,
            params: BTreeMap::new(),
            version: 0,
        }
    }

    pub fn basic(color: Color) -> Self {
        Self::new(MaterialKind::Basic).with_param(params::COLOR, ParamValue::Color(color))
    }

    pub fn lambert(color: Color) -> Self {
        Self::new(MaterialKind::Lambert).with_param(params::COLOR, ParamValue::Color(color))
    }

    pub fn standard(color: Color, roughness: f32, metalness: f32) -> Self {
        Self::new(MaterialKind::Standard)
            .with_param(params::COLOR, ParamValue::Color(color))
            .with_param(params::ROUGHNESS, ParamValue::Float(roughness))
            .with_param(params::METALNESS, ParamValue::Float(metalness))
    }

    pub fn shader(source: impl Into<String>) -> Self {
        Self::new(MaterialKind::Shader(CustomShader::new(source)))
    }

    pub fn with_param(mut self, name: &str, value: ParamValue) -> Self {
        self.set_param(name, value);
        self
    }

    /// Marks the material transparent with the given opacity; transparent
    /// materials don't write depth by default.
    pub fn translucent(mut self, opacity: f32) -> Self {
        self.transparent = true;
        self.opacity = opacity;
        self.depth_write = false;
        self
    }

    // ── variant-affecting state ─────────────────────────────────────────

    #[inline]
    pub fn kind(&self) -> &MaterialKind {
        &self.kind
    }

    pub fn set_kind(&mut self, kind: MaterialKind) {
        if self.kind != kind {
            self.kind = kind;
            self.bump();
        }
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    pub fn set_side(&mut self, side: Side) {
        if self.side != side {
            self.side = side;
            self.bump();
        }
    }

    #[inline]
    pub fn premultiplied_alpha(&self) -> bool {
        self.premultiplied_alpha
    }

    /// Also selects the premultiplied blend factors.
    pub fn set_premultiplied_alpha(&mut self, enabled: bool) {
        if self.premultiplied_alpha != enabled {
            self.premultiplied_alpha = enabled;
            self.bump();
        }
    }

    #[inline]
    pub fn transmission(&self) -> f32 {
        self.transmission
    }

    /// Only crossing zero changes the variant.
    pub fn set_transmission(&mut self, transmission: f32) {
        let was = self.transmission > 0.0;
        self.transmission = transmission.max(0.0);
        if was != (self.transmission > 0.0) {
            self.bump();
        }
    }

    #[inline]
    pub fn is_transmissive(&self) -> bool {
        self.transmission > 0.0
    }

    #[inline]
    pub fn vertex_colors(&self) -> bool {
        self.vertex_colors
    }

    pub fn set_vertex_colors(&mut self, enabled: bool) {
        if self.vertex_colors != enabled {
            self.vertex_colors = enabled;
            self.bump();
        }
    }

    #[inline]
    pub fn fog(&self) -> bool {
        self.fog
    }

    pub fn set_fog(&mut self, enabled: bool) {
        if self.fog != enabled {
            self.fog = enabled;
            self.bump();
        }
    }

    #[inline]
    pub fn alpha_test(&self) -> f32 {
        self.alpha_test
    }

    pub fn set_alpha_test(&mut self, cutoff: f32) {
        let was = self.alpha_test > 0.0;
        self.alpha_test = cutoff.clamp(0.0, 1.0);
        if was != (self.alpha_test > 0.0) {
            self.bump();
        }
    }

    // ── parameters ──────────────────────────────────────────────────────

    /// Sets a parameter. Adding, removing or changing the value type (e.g.
    /// assigning a texture) bumps the version; updating a value in place
    /// does not.
    pub fn set_param(&mut self, name: &str, value: ParamValue) {
        let reshaped = match self.params.get(name) {
            Some(old) => std::mem::discriminant(old) != std::mem::discriminant(&value),
            None => true,
        };
        self.params.insert(name.to_string(), value);
        if reshaped {
            self.bump();
        }
    }

    pub fn remove_param(&mut self, name: &str) -> Option<ParamValue> {
        let removed = self.params.remove(name);
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    #[inline]
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    pub fn params(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn texture(&self, name: &str) -> Option<TextureId> {
        match self.params.get(name) {
            Some(ParamValue::Texture(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn color(&self, name: &str) -> Option<Color> {
        match self.params.get(name) {
            Some(ParamValue::Color(c)) => Some(*c),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.params.get(name) {
            Some(ParamValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    // ── versioning ──────────────────────────────────────────────────────

    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Forces re-resolution of the program on next use.
    pub fn needs_update(&mut self) {
        self.bump();
    }

    fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}
