use std::fmt;

use thiserror::Error;

/// Errors returned by embedding providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("empty image")]
    EmptyImage,

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("model error: {0}")]
    Model(String),
}

/// A cropped face as packed RGB8 pixels, row-major.
///
/// Only [`FaceImage::new`] builds one, so the buffer always holds
/// `width * height * 3` bytes.
#[derive(Clone)]
pub struct FaceImage {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl FaceImage {
    /// Wraps packed RGB8 pixels, checking the buffer size.
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self, ProviderError> {
        if width == 0 || height == 0 {
            return Err(ProviderError::EmptyImage);
        }
        let want = width * height * 3;
        if pixels.len() != want {
            return Err(ProviderError::InvalidImage(format!(
                "{width}x{height} RGB needs {want} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Packed RGB8 bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the RGB triple at `(x, y)`. Panics if the point is outside
    /// the image.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }
}

impl fmt::Debug for FaceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaceImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Turns a cropped face into a raw (not normalized) embedding.
///
/// The gallery normalizes whatever the provider returns. The output
/// dimensionality is reported by [`FaceEmbedder::dimension`] (192 for
/// MobileFaceNet).
///
/// # Thread Safety
///
/// Implementations must be safe for concurrent use; recognition typically
/// runs on a camera worker while enrollment runs on the UI thread.
pub trait FaceEmbedder: Send + Sync {
    /// Computes the embedding of a single face crop.
    fn embed(&self, face: &FaceImage) -> Result<Vec<f32>, ProviderError>;

    /// Returns the dimensionality of the embedding vectors.
    fn dimension(&self) -> usize;
}
