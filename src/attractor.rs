//! Heavy point-mass attractors distinct from the particle set proper.
//!
//! Grounded on `core/quantities/Attractor.h`'s field set and the identical
//! attractor-handling loops duplicated in `BruteForceGravity::evalAttractors`
//! and `BarnesHut::evalAttractors` — neither evaluator accelerates attractor
//! interactions with its tree, so that logic lives here once instead of once
//! per [`crate::gravity`] variant.

use crate::kernel::{GravityKernel, Symmetrized};
use crate::scheduler::Scheduler;
use crate::vec3::Vec3;
use crate::walk::OutputSlice;

/// A heavy point mass (a star, a planet) that interacts gravitationally but
/// isn't part of the SPH/N-body particle set. The original additionally
/// carries a `ParticleInteractionEnum` (absorb/repel) governing what happens
/// when a particle enters the attractor's radius; that crosses into particle
/// storage/removal, which is out of scope here (see SPEC_FULL.md Non-goals),
/// so only the gravitational fields are kept.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Attractor {
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub radius: f64,
    pub mass: f64,
}

impl Attractor {
    pub fn new(position: Vec3, mass: f64, radius: f64) -> Self {
        Self { position, velocity: Vec3::ZERO, acceleration: Vec3::ZERO, radius, mass }
    }
}

/// Mutable view over an attractor array, passed to every
/// [`crate::gravity::GravityEval::eval_attractors`] implementation.
pub struct Attractors<'a> {
    attractors: &'a mut [Attractor],
}

impl<'a> Attractors<'a> {
    pub fn new(attractors: &'a mut [Attractor]) -> Self {
        Self { attractors }
    }

    pub fn len(&self) -> usize {
        self.attractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attractors.is_empty()
    }

    pub fn as_slice(&self) -> &[Attractor] {
        self.attractors
    }

    pub fn as_mut_slice(&mut self) -> &mut [Attractor] {
        self.attractors
    }
}

/// Effective smoothing length of an attractor, so it interacts through the
/// same softening kernel as a particle (`setH(position, radius)` in the
/// original — the attractor's radius stands in for a smoothing length).
#[inline]
fn attractor_h(a: &Attractor) -> f64 {
    a.radius
}

/// Attractor-particle interactions: every attractor pulls on every particle
/// and vice versa, via the symmetrized kernel (no tree acceleration, matching
/// both original evaluators). `scaled_masses[i]` must already include `G`;
/// `g` is applied to the attractor's side of the force since attractor mass
/// is not pre-scaled.
pub fn eval_attractor_particle_interactions<S: Scheduler, K: GravityKernel + ?Sized>(
    scheduler: &S,
    positions: &[Vec3],
    smoothing_lengths: &[f64],
    scaled_masses: &[f64],
    kernel: &K,
    g: f64,
    attractors: &mut Attractors,
    out: &mut [Vec3],
) {
    let sym = Symmetrized::new(kernel);
    let out_view = OutputSlice::new(out);
    for attractor in attractors.as_mut_slice() {
        let h_a = attractor_h(attractor);
        let pos_a = attractor.position;
        let mass_a = attractor.mass;
        scheduler.parallel_for(positions.len(), |i| {
            let f = sym.grad(positions[i], smoothing_lengths[i], pos_a, h_a);
            out_view.add(i, f * -(g * mass_a));
        });

        let accel: Vec3 = (0..positions.len())
            .map(|i| sym.grad(positions[i], smoothing_lengths[i], pos_a, h_a) * scaled_masses[i])
            .fold(Vec3::ZERO, |a, b| a + b);
        attractor.acceleration += accel;
    }
}

/// Attractor-attractor interactions: a plain O(A²) loop, since the number of
/// attractors is expected to be tiny compared to the particle count.
pub fn eval_attractor_attractor_interactions<K: GravityKernel + ?Sized>(
    kernel: &K,
    g: f64,
    attractors: &mut Attractors,
) {
    let sym = Symmetrized::new(kernel);
    let slice = attractors.as_mut_slice();
    for i in 0..slice.len() {
        for j in (i + 1)..slice.len() {
            let (lo, hi) = slice.split_at_mut(j);
            let a1 = &mut lo[i];
            let a2 = &mut hi[0];
            let f = sym.grad(a1.position, attractor_h(a1), a2.position, attractor_h(a2)) * g;
            a1.acceleration -= f * a2.mass;
            a2.acceleration += f * a1.mass;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::ZeroKernel;

    #[test]
    fn attractor_attractor_interaction_is_newtons_third_law() {
        let mut attractors = vec![
            Attractor::new(Vec3::new(0.0, 0.0, 0.0), 10.0, 0.1),
            Attractor::new(Vec3::new(5.0, 0.0, 0.0), 20.0, 0.1),
        ];
        let kernel = ZeroKernel;
        {
            let mut view = Attractors::new(&mut attractors);
            eval_attractor_attractor_interactions(&kernel, 1.0, &mut view);
        }
        let total = attractors[0].acceleration * 10.0 + attractors[1].acceleration * 20.0;
        assert!(total.length() < 1e-10);
    }
}
