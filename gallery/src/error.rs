use thiserror::Error;

use crate::provider::ProviderError;

/// Errors returned by gallery operations.
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("gallery: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("gallery: invalid name: {0}")]
    InvalidName(String),

    #[error("gallery: persistence: {0}")]
    Persistence(String),

    #[error("gallery: corrupt state: {0}")]
    CorruptState(String),

    #[error("gallery: provider: {0}")]
    Provider(#[from] ProviderError),
}

impl GalleryError {
    /// Reports whether the error came from the storage layer
    /// (save or load), as opposed to caller input or the provider.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::CorruptState(_))
    }
}
