use std::borrow::Cow;

/// Typed backing store of a vertex attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeData {
    F32(Vec<f32>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl AttributeData {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Float view of the data. With `normalized`, integer values are mapped
    /// to `0..1` by their type's maximum.
    pub fn to_f32(&self, normalized: bool) -> Cow<'_, [f32]> {
        fn conv<T: Copy + Into<f64>>(v: &[T], max: f64, normalized: bool) -> Vec<f32> {
            v.iter()
                .map(|&x| {
                    let x: f64 = x.into();
                    (if normalized { x / max } else { x }) as f32
                })
                .collect()
        }
        match self {
            Self::F32(v) => Cow::Borrowed(v.as_slice()),
            Self::U8(v) => Cow::Owned(conv(v, u8::MAX as f64, normalized)),
            Self::U16(v) => Cow::Owned(conv(v, u16::MAX as f64, normalized)),
            Self::U32(v) => Cow::Owned(conv(v, u32::MAX as f64, normalized)),
        }
    }
}

/// Named per-vertex array with fixed arity.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub data: AttributeData,
    /// Components per vertex (1..=4).
    pub item_size: usize,
    pub normalized: bool,
    version: u32,
}

impl Attribute {
    pub fn new(data: AttributeData, item_size: usize) -> Self {
        debug_assert!((1..=4).contains(&item_size), "item_size must be in 1..=4");
        Self { data, item_size, normalized: false, version: 0 }
    }

    #[inline]
    pub fn f32(data: Vec<f32>, item_size: usize) -> Self {
        Self::new(AttributeData::F32(data), item_size)
    }

    /// Normalized byte colors and similar.
    #[inline]
    pub fn u8_normalized(data: Vec<u8>, item_size: usize) -> Self {
        Self { normalized: true, ..Self::new(AttributeData::U8(data), item_size) }
    }

    /// Number of complete items.
    #[inline]
    pub fn count(&self) -> usize {
        if self.item_size == 0 { 0 } else { self.data.len() / self.item_size }
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[inline]
    pub(super) fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}
