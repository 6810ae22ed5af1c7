//! Vector Math
//!
//! Dot products and L2 normalization. Inputs are `f32`, accumulation is `f64`.

/// Compute the dot product of two vectors with `f64` accumulation
///
/// Uses unrolled loop for better CPU performance. For unit vectors this is
/// the cosine similarity.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let len = a.len().min(b.len());
    let mut sum = 0.0f64;

    // Process 4 elements at a time (manual unrolling)
    let chunks = len / 4;
    let remainder = len % 4;

    for i in 0..chunks {
        let idx = i * 4;
        sum += a[idx] as f64 * b[idx] as f64;
        sum += a[idx + 1] as f64 * b[idx + 1] as f64;
        sum += a[idx + 2] as f64 * b[idx + 2] as f64;
        sum += a[idx + 3] as f64 * b[idx + 3] as f64;
    }

    for i in (len - remainder)..len {
        sum += a[i] as f64 * b[i] as f64;
    }

    sum
}

/// Euclidean length of a vector
#[inline]
pub fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| x as f64 * x as f64).sum::<f64>().sqrt()
}

/// Write `src / ‖src‖₂` into `dst`
///
/// Returns `false` and leaves `dst` untouched when the norm is zero or not
/// finite, since no unit vector exists for it.
pub fn normalize_into(src: &[f32], dst: &mut [f32]) -> bool {
    debug_assert_eq!(src.len(), dst.len(), "Vector dimensions must match");

    let norm = l2_norm(src);
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }
    for (out, &x) in dst.iter_mut().zip(src) {
        *out = (x as f64 / norm) as f32;
    }
    true
}

/// Normalize and return a new vector, or `None` for a zero vector
pub fn normalized(v: &[f32]) -> Option<Vec<f32>> {
    let mut result = vec![0.0f32; v.len()];
    normalize_into(v, &mut result).then_some(result)
}

/// Check that a vector is unit length within `tolerance`
#[inline]
pub fn is_unit(v: &[f32], tolerance: f64) -> bool {
    (l2_norm(v) - 1.0).abs() < tolerance
}
