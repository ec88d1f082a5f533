use crate::error::GalleryError;
use crate::record::{FaceRecord, Match};

/// Default minimum similarity a record must strictly exceed to match.
pub const DEFAULT_THRESHOLD: f32 = 0.65;

/// Compute the cosine similarity between two vectors.
///
/// Uses f64 intermediate precision and clamps the result to `[-1, 1]`.
/// Returns 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, GalleryError> {
    if a.len() != b.len() {
        return Err(GalleryError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }

    let mut dot: f64 = 0.0;
    let mut norm_a: f64 = 0.0;
    let mut norm_b: f64 = 0.0;

    for (&ai, &bi) in a.iter().zip(b.iter()) {
        let ai = ai as f64;
        let bi = bi as f64;
        dot += ai * bi;
        norm_a += ai * ai;
        norm_b += bi * bi;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    Ok(similarity.clamp(-1.0, 1.0) as f32)
}

/// Scan `records` for the one most similar to `query`.
///
/// Returns the best record only if its score strictly exceeds `threshold`.
/// When several records share the maximum score, the first one in
/// iteration order wins; callers that need reproducible ties must pass
/// records in a stable order.
pub fn best_match<'a, I>(
    query: &[f32],
    records: I,
    threshold: f32,
) -> Result<Option<Match>, GalleryError>
where
    I: IntoIterator<Item = &'a FaceRecord>,
{
    let mut best: Option<(&'a FaceRecord, f32)> = None;
    for record in records {
        let score = cosine_similarity(query, &record.embedding)?;
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((record, score)),
        }
    }

    Ok(best.and_then(|(record, score)| {
        (score > threshold).then(|| Match {
            name: record.name.clone(),
            score,
        })
    }))
}
