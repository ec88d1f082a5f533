//! Face embedding gallery: named face embeddings with nearest-match lookup
//! and durable, atomically replaced storage.
//!
//! # Usage
//!
//! ```
//! use opensight_gallery::{Gallery, GalleryConfig, MemoryStorage, UNKNOWN};
//!
//! let cfg = GalleryConfig { dim: 3, ..GalleryConfig::default() };
//! let (gallery, err) = Gallery::open(cfg, Box::new(MemoryStorage::new(3)));
//! assert!(err.is_none());
//!
//! gallery.enroll("alice", &[0.9, 0.1, 0.0]).unwrap();
//! assert_eq!(gallery.recognize(&[1.0, 0.1, 0.0]).unwrap(), "alice");
//! assert_eq!(gallery.recognize(&[0.0, 0.0, 1.0]).unwrap(), UNKNOWN);
//! ```
//!
//! # Pipeline
//!
//! ```text
//! face crop -> FaceEmbedder (external model) -> raw vector
//!           -> normalize -> Gallery::enroll / Gallery::recognize
//!           -> GalleryStorage::save (mutations only)
//! ```
//!
//! # Concurrency
//!
//! [`Gallery`] is a cloneable handle. Recognition works on an immutable
//! snapshot and never blocks behind a save; enrollment and removal are
//! serialized.

pub mod codec;
mod config;
mod cosine;
mod error;
pub mod framing;
mod gallery;
mod normalize;
pub mod preprocess;
mod provider;
mod record;
mod storage;

pub use config::{GalleryConfig, DEFAULT_DIM};
pub use cosine::{best_match, cosine_similarity, DEFAULT_THRESHOLD};
pub use error::GalleryError;
pub use gallery::Gallery;
pub use normalize::{l2_norm, l2_normalize, normalize};
pub use provider::{FaceEmbedder, FaceImage, ProviderError};
pub use record::{FaceRecord, Match, Records, Snapshot, UNKNOWN};
pub use storage::{FileStorage, GalleryStorage, MemoryStorage, DEFAULT_FILE_NAME};
