//! Pairwise O(N²) gravity, grounded on `core/gravity/BruteForceGravity.h`.
//! Not meant for production-scale particle counts; useful as a reference
//! implementation for the agreement tests of spec.md §8.

use crate::attractor::{self, Attractors};
use crate::error::Result;
use crate::gravity::GravityEval;
use crate::kernel::{GravityKernel, Symmetrized};
use crate::particles::ParticleSet;
use crate::scheduler::Scheduler;
use crate::stats::Stats;
use crate::vec3::Vec3;
use crate::walk::OutputSlice;

/// Sums gravitational contributions from every other particle directly, with
/// no spatial index. `G` is folded into `scaled_masses` during [`build`].
pub struct BruteForceGravity<K: GravityKernel> {
    kernel: K,
    g: f64,
    positions: Vec<Vec3>,
    smoothing_lengths: Vec<f64>,
    scaled_masses: Vec<f64>,
}

impl<K: GravityKernel> BruteForceGravity<K> {
    /// `kernel.radius() == 0.0` reproduces the original's point-mass default
    /// constructor; any [`GravityKernel`] is accepted here since this crate's
    /// kernel trait already generalizes over both.
    pub fn new(kernel: K, g: f64) -> Self {
        Self { kernel, g, positions: Vec::new(), smoothing_lengths: Vec::new(), scaled_masses: Vec::new() }
    }

    pub fn try_new(kernel: K, g: f64) -> Result<Self> {
        Ok(Self::new(kernel, g))
    }
}

impl<K: GravityKernel> GravityEval for BruteForceGravity<K> {
    fn build<S: Scheduler>(&mut self, _scheduler: &S, particles: &ParticleSet) {
        self.positions = particles.positions().to_vec();
        self.smoothing_lengths = particles.smoothing_lengths().to_vec();
        self.scaled_masses = particles.scaled_masses().to_vec();
    }

    fn eval_self<S: Scheduler>(&self, scheduler: &S, out: &mut [Vec3]) -> Stats {
        let n = self.positions.len();
        debug_assert_eq!(out.len(), n);
        let sym = Symmetrized::new(&self.kernel);
        let out_view = OutputSlice::new(out);

        scheduler.parallel_for(n, |i| {
            let mut a = Vec3::ZERO;
            for j in 0..i {
                a += sym.grad(self.positions[j], self.smoothing_lengths[j], self.positions[i], self.smoothing_lengths[i])
                    * self.scaled_masses[j];
            }
            for j in (i + 1)..n {
                a += sym.grad(self.positions[j], self.smoothing_lengths[j], self.positions[i], self.smoothing_lengths[i])
                    * self.scaled_masses[j];
            }
            out_view.add(i, a);
        });

        Stats { exact_nodes: (n * n.saturating_sub(1)) as u64, ..Stats::ZERO }
    }

    fn eval_at(&self, r0: Vec3) -> Vec3 {
        // No symmetrization: the query point isn't one of the built
        // particles, so it contributes no smoothing length of its own
        // (`NoSymmetrization` in the original's `evalAcceleration`).
        let mut a = Vec3::ZERO;
        for j in 0..self.positions.len() {
            a += self.kernel.grad(self.positions[j] - r0, self.smoothing_lengths[j]) * self.scaled_masses[j];
        }
        a
    }

    fn eval_attractors<S: Scheduler>(&self, scheduler: &S, attractors: &mut Attractors, out: &mut [Vec3]) {
        attractor::eval_attractor_particle_interactions(
            scheduler,
            &self.positions,
            &self.smoothing_lengths,
            &self.scaled_masses,
            &self.kernel,
            self.g,
            attractors,
            out,
        );
        attractor::eval_attractor_attractor_interactions(&self.kernel, self.g, attractors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attractor::Attractor;
    use crate::kernel::ZeroKernel;
    use crate::scheduler::SequentialScheduler;

    #[test]
    fn two_body_self_gravity_matches_newtonian() {
        let positions = vec![Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)];
        let masses = vec![3.0, 5.0];
        let h = vec![0.001, 0.001];
        let particles = ParticleSet::new(&positions, &h, &masses, 1.0).unwrap();

        let mut gravity = BruteForceGravity::new(ZeroKernel, 1.0);
        gravity.build(&SequentialScheduler, &particles);

        let mut out = vec![Vec3::ZERO; 2];
        gravity.eval_self(&SequentialScheduler, &mut out);

        let dr = positions[1] - positions[0];
        let expected0 = dr * (masses[1] / dr.length().powi(3));
        assert!((out[0] - expected0).length() < 1e-8);
        assert!((out[0] * masses[0] + out[1] * masses[1]).length() < 1e-8);
    }

    #[test]
    fn eval_at_matches_eval_self_for_a_built_particle_position() {
        let positions = vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 3.0, 0.0)];
        let masses = vec![1.0, 2.0, 4.0];
        let h = vec![0.0001; 3];
        let particles = ParticleSet::new(&positions, &h, &masses, 1.0).unwrap();
        let mut gravity = BruteForceGravity::new(ZeroKernel, 1.0);
        gravity.build(&SequentialScheduler, &particles);

        // evaluate at a point not coincident with any particle, away from all masses
        let probe = Vec3::new(10.0, 10.0, 10.0);
        let a = gravity.eval_at(probe);
        assert!(a.is_finite());
        assert!(a.length() > 0.0);
    }

    #[test]
    fn attractor_particle_interaction_is_newtons_third_law() {
        let positions = vec![Vec3::new(0.0, 0.0, 0.0)];
        let masses = vec![1.0];
        let h = vec![0.01];
        let particles = ParticleSet::new(&positions, &h, &masses, 1.0).unwrap();
        let mut gravity = BruteForceGravity::new(ZeroKernel, 1.0);
        gravity.build(&SequentialScheduler, &particles);

        let mut attractors = vec![Attractor::new(Vec3::new(5.0, 0.0, 0.0), 100.0, 0.01)];
        let mut view = Attractors::new(&mut attractors);
        let mut out = vec![Vec3::ZERO; 1];
        gravity.eval_attractors(&SequentialScheduler, &mut view, &mut out);

        let total = out[0] * masses[0] + attractors[0].acceleration * attractors[0].mass;
        assert!(total.length() < 1e-6);
    }
}
