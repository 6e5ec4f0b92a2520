use thiserror::Error;

use crate::xr::ReferenceSpaceKind;

/// User-facing failures of the AR session lifecycle. The `Display` text is
/// what the page shows.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArError {
    #[error("{0}")]
    Unsupported(String),
    #[error("AR session could not start: {0}")]
    SessionDenied(String),
    #[error("Could not get the {} reference space: {reason}", kind.as_str())]
    ReferenceSpace {
        kind: ReferenceSpaceKind,
        reason: String,
    },
    #[error("Surface detection is unavailable: {0}")]
    HitTest(String),
    #[error("AR view could not be displayed: {0}")]
    RenderSurface(String),
}

pub type ArResult<T> = Result<T, ArError>;
