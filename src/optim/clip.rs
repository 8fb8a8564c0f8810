//! Gradient clipping utilities

use ndarray::Array1;

/// Global L2 norm over all gradients, accumulated in f64
pub fn global_norm(grads: &[Array1<f32>]) -> f32 {
    let total_norm_sq: f64 = grads
        .iter()
        .flat_map(|g| g.iter())
        .map(|&g| f64::from(g) * f64::from(g))
        .sum();
    total_norm_sq.sqrt() as f32
}

/// Clip gradients by global norm
///
/// If the global norm exceeds `max_norm` every gradient is scaled by
/// `max_norm / global_norm`, preserving relative magnitudes.
///
/// Returns the global norm before clipping.
pub fn clip_grad_norm(grads: &mut [Array1<f32>], max_norm: f32) -> f32 {
    let norm = global_norm(grads);

    if norm > max_norm {
        let clip_coef = max_norm / norm;
        for grad in grads.iter_mut() {
            grad.mapv_inplace(|g| g * clip_coef);
        }
    }

    norm
}

/// Clamp every gradient element into `[-clip_value, clip_value]`
///
/// Returns the global norm before clipping.
pub fn clip_grad_value(grads: &mut [Array1<f32>], clip_value: f32) -> f32 {
    let norm = global_norm(grads);
    for grad in grads.iter_mut() {
        grad.mapv_inplace(|g| g.clamp(-clip_value, clip_value));
    }
    norm
}
