//! Shared helpers for the integration tests in `tests/`, grounded in the
//! scenarios of spec.md §8.

use gravity_core::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generates `n` points uniformly distributed within a ball of `radius`, plus
/// a uniform per-particle mass such that the ball's total mass is
/// `density * volume`. Deterministic across runs (fixed seed) so the
/// agreement thresholds in §8's scenarios 2/3/6 are reproducible.
pub fn uniform_ball(n: usize, radius: f64, density: f64, seed: u64) -> (Vec<Vec3>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut positions = Vec::with_capacity(n);
    while positions.len() < n {
        let p = Vec3::new(
            rng.gen_range(-radius..radius),
            rng.gen_range(-radius..radius),
            rng.gen_range(-radius..radius),
        );
        if p.length_squared() <= radius * radius {
            positions.push(p);
        }
    }
    let volume = 4.0 / 3.0 * std::f64::consts::PI * radius.powi(3);
    let total_mass = density * volume;
    let masses = vec![total_mass / n as f64; n];
    (positions, masses)
}

/// Relative error between two accelerations, falling back to absolute error
/// when `expected` is (near) zero.
pub fn relative_error(actual: Vec3, expected: Vec3) -> f64 {
    let scale = expected.length().max(1e-300);
    (actual - expected).length() / scale
}

/// Like [`uniform_ball`], but specifies the total mass directly instead of a
/// density, for scenarios where only the aggregate mass is given.
pub fn ball_with_total_mass(n: usize, radius: f64, total_mass: f64, seed: u64) -> (Vec<Vec3>, Vec<f64>) {
    let volume = 4.0 / 3.0 * std::f64::consts::PI * radius.powi(3);
    uniform_ball(n, radius, total_mass / volume, seed)
}

/// L2 norm of the per-particle relative error between two acceleration sets.
pub fn l2_relative_error(actual: &[Vec3], expected: &[Vec3]) -> f64 {
    let sum_sq: f64 = actual
        .iter()
        .zip(expected)
        .map(|(a, e)| {
            let err = (*a - *e).length();
            err * err
        })
        .sum();
    let norm_sq: f64 = expected.iter().map(|e| e.length_squared()).sum();
    (sum_sq / norm_sq.max(1e-300)).sqrt()
}
