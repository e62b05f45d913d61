//! Gravity evaluator contract and its implementations (component C7),
//! grounded on `gravity/IGravity.h`'s four-method interface
//! (`build`/`evalSelfGravity`/`evalAcceleration`/`evalAttractors`).
//!
//! `IGravity` also carries `evalEnergy`, deliberately not part of
//! [`GravityEval`] — see SPEC_FULL.md's Non-goals.

mod barnes_hut;
mod brute_force;
mod cached;
mod symmetric;

pub use barnes_hut::{BarnesHutConfig, BarnesHutGravity};
pub use brute_force::BruteForceGravity;
pub use cached::CachedGravity;
pub use symmetric::SymmetricGravity;

use crate::attractor::Attractors;
use crate::kdtree::KdTree;
use crate::particles::ParticleSet;
use crate::scheduler::Scheduler;
use crate::stats::Stats;
use crate::vec3::Vec3;

/// Common contract every gravity evaluator satisfies: rebuild internal state
/// from a fresh particle snapshot, evaluate self-gravity for the whole set,
/// evaluate the acceleration at an arbitrary point, and evaluate
/// attractor interactions. Matches `IGravity` one-for-one, minus `evalEnergy`.
pub trait GravityEval {
    /// Rebuilds whatever internal index (or plain copy) the evaluator needs
    /// from `particles`. Called once per timestep before the eval methods,
    /// matching `IGravity::build`.
    fn build<S: Scheduler>(&mut self, scheduler: &S, particles: &ParticleSet);

    /// Evaluates self-gravity for every particle, accumulating into `out`
    /// (`out[i] += ...`, never overwritten — matches `evalSelfGravity`'s
    /// "dv might already contain accelerations" contract).
    fn eval_self<S: Scheduler>(&self, scheduler: &S, out: &mut [Vec3]) -> Stats;

    /// Evaluates the acceleration at an arbitrary point `r0`, not necessarily
    /// one of the built particles (`evalAcceleration`).
    fn eval_at(&self, r0: Vec3) -> Vec3;

    /// Evaluates attractor-particle and attractor-attractor interactions,
    /// accumulating into `out` and into each attractor's own `acceleration`.
    fn eval_attractors<S: Scheduler>(&self, scheduler: &S, attractors: &mut Attractors, out: &mut [Vec3]);

    /// The k-d tree backing this evaluator, if it has one. `None` for
    /// evaluators with no spatial index (`BruteForceGravity`) or whose tree
    /// indexes a transformed particle set unsuitable for external queries
    /// (`SymmetricGravity`, which indexes ghost-doubled positions).
    fn finder(&self) -> Option<&KdTree> {
        None
    }
}
