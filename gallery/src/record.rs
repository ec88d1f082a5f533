use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Sentinel returned by recognition when no record clears the threshold.
pub const UNKNOWN: &str = "Unknown";

/// A named face embedding.
///
/// Records are never mutated after creation; re-enrolling a name replaces
/// the record wholesale.
#[derive(Clone, PartialEq)]
pub struct FaceRecord {
    /// Unique key, compared byte-for-byte.
    pub name: String,

    /// L2-normalized embedding (or all zeros for a degenerate input).
    pub embedding: Vec<f32>,
}

impl FaceRecord {
    pub fn new(name: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            embedding,
        }
    }
}

impl fmt::Debug for FaceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaceRecord")
            .field("name", &self.name)
            .field("embedding_len", &self.embedding.len())
            .finish()
    }
}

/// Result of a successful best-match search.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Name of the matched record.
    pub name: String,

    /// Cosine similarity between the query and the matched record.
    pub score: f32,
}

/// Name-ordered mapping of records.
///
/// Ordering by name makes iteration, listing and tie-breaking
/// deterministic.
pub type Records = BTreeMap<String, Arc<FaceRecord>>;

/// Immutable view of the gallery at one instant.
pub type Snapshot = Arc<Records>;
