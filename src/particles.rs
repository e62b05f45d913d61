//! Borrowed particle data passed into a [`crate::gravity::GravityEval`]
//! (component C8), grounded on the teacher's `BodyModel` trait generalized
//! from a single accessor trait to borrowed parallel arrays per spec.md §3/§6
//! (this crate doesn't own a particle storage container; see SPEC_FULL.md
//! Non-goals).

use crate::error::{GravityError, Result};
use crate::vec3::Vec3;

/// One timestep's worth of particle state, borrowed from the caller's own
/// storage. `scaled_masses` is `G * masses`, computed once here so every
/// evaluator shares the same G-convention (see DESIGN.md's Open Question
/// resolution) instead of re-deriving it per call.
pub struct ParticleSet<'a> {
    positions: &'a [Vec3],
    smoothing_lengths: &'a [f64],
    masses: &'a [f64],
    scaled_masses: Vec<f64>,
}

impl<'a> ParticleSet<'a> {
    pub fn new(positions: &'a [Vec3], smoothing_lengths: &'a [f64], masses: &'a [f64], g: f64) -> Result<Self> {
        if positions.len() != masses.len() || positions.len() != smoothing_lengths.len() {
            return Err(GravityError::MismatchedArrayLengths {
                positions: positions.len(),
                masses: masses.len(),
                smoothing_lengths: smoothing_lengths.len(),
            });
        }
        let scaled_masses = masses.iter().map(|m| m * g).collect();
        Ok(Self { positions, smoothing_lengths, masses, scaled_masses })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        self.positions
    }

    pub fn smoothing_lengths(&self) -> &[f64] {
        self.smoothing_lengths
    }

    pub fn masses(&self) -> &[f64] {
        self.masses
    }

    pub fn scaled_masses(&self) -> &[f64] {
        &self.scaled_masses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_lengths_are_rejected() {
        let positions = vec![Vec3::ZERO; 3];
        let h = vec![0.1; 3];
        let masses = vec![1.0; 2];
        let result = ParticleSet::new(&positions, &h, &masses, 1.0);
        assert!(matches!(result, Err(GravityError::MismatchedArrayLengths { .. })));
    }

    #[test]
    fn scaled_masses_apply_g() {
        let positions = vec![Vec3::ZERO; 2];
        let h = vec![0.1; 2];
        let masses = vec![2.0, 3.0];
        let set = ParticleSet::new(&positions, &h, &masses, 10.0).unwrap();
        assert_eq!(set.scaled_masses(), &[20.0, 30.0]);
    }
}
