//! Wrapper for simulations with a symmetry plane `z = 0`, grounded on
//! `core/gravity/SymmetricGravity.h`. Only particles with `z > 0` are real;
//! every real particle is paired with a same-mass mirror image across the
//! plane before being handed to the wrapped evaluator, so the wrapped
//! evaluator's self-gravity pass sees the full (doubled) mass distribution
//! without the plane itself needing any special-cased geometry.

use crate::attractor::{self, Attractors};
use crate::gravity::GravityEval;
use crate::kdtree::KdTree;
use crate::kernel::GravityKernel;
use crate::particles::ParticleSet;
use crate::scheduler::Scheduler;
use crate::stats::Stats;
use crate::vec3::Vec3;

/// Mirrors `r` across the `z = 0` plane.
#[inline]
fn mirror(r: Vec3) -> Vec3 {
    Vec3::new(r.x, r.y, -r.z)
}

/// Wraps a [`GravityEval`] so its self-gravity pass runs over a ghost-doubled
/// particle set (every real particle plus its mirror image) while attractor
/// interactions and `eval_at` still see only the real configuration.
///
/// Attractor interactions are handled independently of the wrapped
/// evaluator's own (doubled) internal state: the original's `evalExternal`
/// forwards straight to the wrapped gravity, which works there because its
/// `dv`/`r` arrays are both sized to the doubled set throughout the call
/// chain. Here the public contract's `out` buffer is sized to the *real*
/// particle count (matching every other [`GravityEval`] implementation), so
/// forwarding directly would read past the wrapped evaluator's own doubled
/// `positions` against an undersized buffer. Instead this wrapper keeps its
/// own copy of the real particle arrays and a kernel, and evaluates attractor
/// interactions the same way [`crate::gravity::BruteForceGravity`] and
/// [`crate::gravity::BarnesHutGravity`] do, via the shared
/// [`crate::attractor`] helpers.
pub struct SymmetricGravity<G: GravityEval, K: GravityKernel> {
    gravity: G,
    kernel: K,
    g: f64,
    real_positions: Vec<Vec3>,
    real_smoothing_lengths: Vec<f64>,
    real_scaled_masses: Vec<f64>,
    doubled_positions: Vec<Vec3>,
    doubled_smoothing_lengths: Vec<f64>,
    doubled_masses: Vec<f64>,
}

impl<G: GravityEval, K: GravityKernel> SymmetricGravity<G, K> {
    pub fn new(gravity: G, kernel: K, g: f64) -> Self {
        Self {
            gravity,
            kernel,
            g,
            real_positions: Vec::new(),
            real_smoothing_lengths: Vec::new(),
            real_scaled_masses: Vec::new(),
            doubled_positions: Vec::new(),
            doubled_smoothing_lengths: Vec::new(),
            doubled_masses: Vec::new(),
        }
    }

    fn rebuild_doubled_arrays(&mut self, particles: &ParticleSet) {
        self.real_positions.clear();
        self.real_smoothing_lengths.clear();
        self.real_scaled_masses.clear();
        self.doubled_positions.clear();
        self.doubled_smoothing_lengths.clear();
        self.doubled_masses.clear();

        for i in 0..particles.len() {
            let r = particles.positions()[i];
            debug_assert!(r.z > 0.0, "symmetric gravity requires every real particle to satisfy z > 0");
            let h = particles.smoothing_lengths()[i];
            let m = particles.masses()[i];

            self.real_positions.push(r);
            self.real_smoothing_lengths.push(h);
            self.real_scaled_masses.push(m * self.g);

            self.doubled_positions.push(r);
            self.doubled_positions.push(mirror(r));
            self.doubled_smoothing_lengths.push(h);
            self.doubled_smoothing_lengths.push(h);
            self.doubled_masses.push(m);
            self.doubled_masses.push(m);
        }
    }
}

impl<G: GravityEval, K: GravityKernel> GravityEval for SymmetricGravity<G, K> {
    fn build<S: Scheduler>(&mut self, scheduler: &S, particles: &ParticleSet) {
        self.rebuild_doubled_arrays(particles);

        // The wrapped evaluator never sees real masses directly: it is
        // rebuilt from the ghost-doubled arrays every call, same as the
        // original's lazy-initialized `all` storage refreshed each `build`.
        let doubled = ParticleSet::new(
            &self.doubled_positions,
            &self.doubled_smoothing_lengths,
            &self.doubled_masses,
            self.g,
        )
        .expect("doubled arrays are constructed with matching lengths");
        self.gravity.build(scheduler, &doubled);
    }

    fn eval_self<S: Scheduler>(&self, scheduler: &S, out: &mut [Vec3]) -> Stats {
        debug_assert_eq!(out.len(), self.real_positions.len());

        let mut doubled_out = vec![Vec3::ZERO; self.doubled_positions.len()];
        let stats = self.gravity.eval_self(scheduler, &mut doubled_out);

        // Every real particle occupies the even-indexed slot of the doubled
        // set (see `rebuild_doubled_arrays`); its mirror image's contribution
        // is already folded into that slot's acceleration by the wrapped
        // walk, so the ghost's own output slot is simply discarded.
        for i in 0..out.len() {
            out[i] += doubled_out[2 * i];
        }
        stats
    }

    fn eval_at(&self, r0: Vec3) -> Vec3 {
        self.gravity.eval_at(r0)
    }

    fn eval_attractors<S: Scheduler>(&self, scheduler: &S, attractors: &mut Attractors, out: &mut [Vec3]) {
        attractor::eval_attractor_particle_interactions(
            scheduler,
            &self.real_positions,
            &self.real_smoothing_lengths,
            &self.real_scaled_masses,
            &self.kernel,
            self.g,
            attractors,
            out,
        );
        attractor::eval_attractor_attractor_interactions(&self.kernel, self.g, attractors);
    }

    /// The wrapped tree refers to ghost-doubled indices unrelated to the
    /// caller's real particle numbering, so (per spec.md §4.7) no finder is
    /// exposed here.
    fn finder(&self) -> Option<&KdTree> {
        None
    }
}
