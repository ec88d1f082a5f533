use crate::cosine::DEFAULT_THRESHOLD;

/// Embedding dimension of MobileFaceNet.
pub const DEFAULT_DIM: usize = 192;

/// Controls gallery behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GalleryConfig {
    /// Embedding dimension every stored record must have.
    /// Default: 192.
    pub dim: usize,

    /// Similarity a record must strictly exceed for recognition to report
    /// it. Higher = stricter (more unknowns). Tunable per deployment.
    /// Default: 0.65.
    pub threshold: f32,
}

impl GalleryConfig {
    /// Fills a zero dimension with the default. The threshold is always
    /// taken as given; 0.0 is a valid (permissive) setting.
    pub fn with_defaults(mut self) -> Self {
        if self.dim == 0 {
            self.dim = DEFAULT_DIM;
        }
        self
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            dim: DEFAULT_DIM,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = GalleryConfig::default();
        assert_eq!(cfg.dim, 192);
        assert_eq!(cfg.threshold, 0.65);

        let cfg = GalleryConfig {
            dim: 0,
            ..GalleryConfig::default()
        }
        .with_defaults();
        assert_eq!(cfg, GalleryConfig::default());
    }

    #[test]
    fn zero_threshold_kept() {
        let cfg = GalleryConfig {
            dim: 0,
            threshold: 0.0,
        }
        .with_defaults();
        assert_eq!(cfg.dim, 192);
        assert_eq!(cfg.threshold, 0.0);
    }

    #[test]
    fn explicit_values_kept() {
        let cfg = GalleryConfig {
            dim: 4,
            threshold: 0.9,
        }
        .with_defaults();
        assert_eq!(cfg.dim, 4);
        assert_eq!(cfg.threshold, 0.9);
    }
}
