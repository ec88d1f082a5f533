/// L2-normalizes a vector in place.
///
/// The norm is accumulated in f64. A zero vector is left untouched, so the
/// result is either unit length or all zeros.
pub fn l2_normalize(v: &mut [f32]) {
    let mut norm: f64 = 0.0;
    for &x in v.iter() {
        norm += (x as f64) * (x as f64);
    }
    norm = norm.sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x = ((*x as f64) / norm) as f32;
        }
    }
}

/// Returns an L2-normalized copy of `v`.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    l2_normalize(&mut out);
    out
}

/// Euclidean norm of `v`, accumulated in f64.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter()
        .map(|&x| (x as f64) * (x as f64))
        .sum::<f64>()
        .sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lcg_vec(dim: usize, seed: u64) -> Vec<f32> {
        let mut state = seed;
        (0..dim)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                ((state >> 33) as f32) / (u32::MAX as f32) - 0.25
            })
            .collect()
    }

    #[test]
    fn unit_length() {
        for seed in 1..50 {
            let v = normalize(&lcg_vec(192, seed));
            let n = l2_norm(&v);
            assert!((n - 1.0).abs() < 1e-6, "seed {seed}: norm {n}");
        }
    }

    #[test]
    fn simple_vector() {
        let v = normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_unchanged() {
        let v = normalize(&[0.0; 8]);
        assert_eq!(v, vec![0.0; 8]);
    }

    #[test]
    fn empty_vector() {
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn idempotent() {
        for seed in 1..20 {
            let once = normalize(&lcg_vec(192, seed));
            let twice = normalize(&once);
            for (a, b) in once.iter().zip(twice.iter()) {
                assert!((a - b).abs() < 1e-6, "seed {seed}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn in_place_matches_copy() {
        let raw = lcg_vec(16, 7);
        let mut v = raw.clone();
        l2_normalize(&mut v);
        assert_eq!(v, normalize(&raw));
    }
}
