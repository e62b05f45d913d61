//! Caches accelerations across several timesteps, grounded on
//! `lib/gravity/CachedGravity.h`.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use crate::attractor::Attractors;
use crate::error::{GravityError, Result};
use crate::gravity::GravityEval;
use crate::kdtree::KdTree;
use crate::particles::ParticleSet;
use crate::scheduler::Scheduler;
use crate::stats::Stats;
use crate::vec3::Vec3;

/// Wraps another [`GravityEval`] and reuses its last computed accelerations
/// across timesteps that fall within `period` of each other, skipping the
/// (expensive) recomputation entirely. Particle count changes always force a
/// recomputation.
///
/// `cached_dv`/`t_last` are the original's `mutable` fields, expressed with
/// `RefCell`/`Cell` so [`GravityEval::eval_self`] can keep its `&self`
/// signature while still caching: the cache is a pure implementation detail,
/// not observable state a caller should need `&mut self` to touch.
pub struct CachedGravity<G: GravityEval> {
    gravity: G,
    period: f64,
    cached_dv: RefCell<Vec<Vec3>>,
    t_last: Cell<f64>,
    /// Current simulation time, advanced by the caller via [`Self::advance_time`]
    /// before each [`GravityEval::eval_self`] call. The trait's `eval_self` has
    /// no time parameter of its own (no other evaluator needs one), so the
    /// clock lives here instead of being threaded through the shared contract.
    t_now: Cell<f64>,
}

impl<G: GravityEval> CachedGravity<G> {
    /// `recomputation_period` is in simulation time units; must be positive.
    pub fn new(recomputation_period: f64, gravity: G) -> Self {
        debug_assert!(recomputation_period > 0.0, "recomputation period must be positive");
        Self {
            gravity,
            period: recomputation_period,
            cached_dv: RefCell::new(Vec::new()),
            t_last: Cell::new(f64::NEG_INFINITY),
            t_now: Cell::new(0.0),
        }
    }

    pub fn try_new(recomputation_period: f64, gravity: G) -> Result<Self> {
        if recomputation_period <= 0.0 {
            return Err(GravityError::NonPositiveRecomputationPeriod { period: recomputation_period });
        }
        Ok(Self::new(recomputation_period, gravity))
    }

    /// Advances the clock this evaluator uses to decide whether a cached
    /// acceleration is still fresh, matching `stats.get<Float>(RUN_TIME)` in
    /// the original. Call once per timestep before `eval_self`.
    pub fn advance_time(&self, t: f64) {
        self.t_now.set(t);
    }
}

impl<G: GravityEval> GravityEval for CachedGravity<G> {
    fn build<S: Scheduler>(&mut self, scheduler: &S, particles: &ParticleSet) {
        // Building is cheap relative to evaluation for most evaluators, so
        // the wrapped gravity is rebuilt every timestep regardless of the
        // cache period; only the expensive `eval_self` pass is skipped.
        self.gravity.build(scheduler, particles);
    }

    fn eval_self<S: Scheduler>(&self, scheduler: &S, out: &mut [Vec3]) -> Stats {
        let t = self.t_now.get();
        let mut cached = self.cached_dv.borrow_mut();

        let stats = if cached.len() == out.len() && t - self.t_last.get() < self.period {
            log::debug!("cached gravity: reusing accelerations from t={}", self.t_last.get());
            Stats { eval_time: Some(Duration::ZERO), ..Stats::ZERO }
        } else {
            log::debug!("cached gravity: recomputing at t={t}");
            cached.clear();
            cached.resize(out.len(), Vec3::ZERO);
            let stats = self.gravity.eval_self(scheduler, &mut cached);
            self.t_last.set(t);
            stats
        };

        for i in 0..out.len() {
            out[i] += cached[i];
        }
        stats
    }

    fn eval_at(&self, r0: Vec3) -> Vec3 {
        // Mirrors the original's comment: this path is mainly used for
        // testing/utilities where performance doesn't matter, so it isn't
        // cached.
        self.gravity.eval_at(r0)
    }

    fn eval_attractors<S: Scheduler>(&self, scheduler: &S, attractors: &mut Attractors, out: &mut [Vec3]) {
        self.gravity.eval_attractors(scheduler, attractors, out);
    }

    fn finder(&self) -> Option<&KdTree> {
        self.gravity.finder()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gravity::BruteForceGravity;
    use crate::kernel::ZeroKernel;
    use crate::scheduler::SequentialScheduler;

    fn two_body() -> (Vec<Vec3>, Vec<f64>, Vec<f64>) {
        (vec![Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)], vec![3.0, 5.0], vec![0.001, 0.001])
    }

    #[test]
    fn within_period_reuses_cached_acceleration() {
        let (positions, masses, h) = two_body();
        let particles = ParticleSet::new(&positions, &h, &masses, 1.0).unwrap();
        let inner = BruteForceGravity::new(ZeroKernel, 1.0);
        let mut cached = CachedGravity::new(10.0, inner);
        cached.build(&SequentialScheduler, &particles);

        cached.advance_time(0.0);
        let mut out1 = vec![Vec3::ZERO; 2];
        let s1 = cached.eval_self(&SequentialScheduler, &mut out1);
        assert_eq!(s1.eval_time, None);

        cached.advance_time(1.0);
        let mut out2 = vec![Vec3::ZERO; 2];
        let s2 = cached.eval_self(&SequentialScheduler, &mut out2);
        assert_eq!(s2.eval_time, Some(Duration::ZERO));
        assert_eq!(out1, out2);
    }

    #[test]
    fn beyond_period_recomputes() {
        let (positions, masses, h) = two_body();
        let particles = ParticleSet::new(&positions, &h, &masses, 1.0).unwrap();
        let inner = BruteForceGravity::new(ZeroKernel, 1.0);
        let mut cached = CachedGravity::new(0.5, inner);
        cached.build(&SequentialScheduler, &particles);

        cached.advance_time(0.0);
        let mut out1 = vec![Vec3::ZERO; 2];
        let s1 = cached.eval_self(&SequentialScheduler, &mut out1);
        assert_eq!(s1.eval_time, None);

        cached.advance_time(10.0);
        let mut out2 = vec![Vec3::ZERO; 2];
        let s2 = cached.eval_self(&SequentialScheduler, &mut out2);
        assert_eq!(s2.eval_time, None); // recomputed, not reused
    }
}
