use std::fmt;

use crate::backend::BackendError;
use crate::geometry::GeometryId;
use crate::material::{MaterialId, TextureId};
use crate::scene::NodeId;

/// Hard failures reported at the call site.
///
/// These indicate a logic bug in the caller (stale handle, impossible graph
/// edit, out-of-range unit) or a backend failure the caller asked about
/// directly. Per-object problems met while rendering a frame are logged and
/// skipped instead and never surface as `EngineError`.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The node handle is stale or was never issued by this graph.
    InvalidNode(NodeId),
    InvalidGeometry(GeometryId),
    InvalidMaterial(MaterialId),
    InvalidTexture(TextureId),
    /// `attach(n, n)`.
    SelfAttach(NodeId),
    /// Attaching `child` under `parent` would make `child` its own ancestor.
    CycleAttach { parent: NodeId, child: NodeId },
    /// Texture unit index exceeds the backend's reported limit.
    TextureUnitOutOfRange { unit: u32, max: u32 },
    /// The camera's clip planes or extents can't form a projection.
    InvalidProjection(NodeId),
    /// Operation on a resource that has already been disposed.
    Disposed(&'static str),
    Backend(BackendError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNode(id) => write!(f, "invalid node handle {id:?}"),
            Self::InvalidGeometry(id) => write!(f, "invalid geometry handle {id:?}"),
            Self::InvalidMaterial(id) => write!(f, "invalid material handle {id:?}"),
            Self::InvalidTexture(id) => write!(f, "invalid texture handle {id:?}"),
            Self::SelfAttach(id) => write!(f, "node {id:?} can't be added as a child of itself"),
            Self::CycleAttach { parent, child } => {
                write!(f, "attaching {child:?} under {parent:?} would create a cycle")
            }
            Self::TextureUnitOutOfRange { unit, max } => {
                write!(f, "texture unit {unit} is out of range (backend supports {max})")
            }
            Self::InvalidProjection(id) => write!(f, "camera {id:?} has a degenerate projection"),
            Self::Disposed(what) => write!(f, "{what} has been disposed"),
            Self::Backend(err) => write!(f, "backend error: {err}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BackendError> for EngineError {
    fn from(err: BackendError) -> Self {
        Self::Backend(err)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
