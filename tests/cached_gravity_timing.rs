//! Scenario 5 of spec.md §8: a cached evaluator reuses the last computed
//! acceleration until its recomputation period elapses.

use std::cell::Cell;
use std::rc::Rc;

use gravity_core::{Attractors, CachedGravity, GravityEval, KdTree, ParticleSet, Scheduler, Stats, Vec3};

/// A test fixture evaluator whose self-gravity output switches discontinuously
/// at `t = 5`. The clock is a shared `Rc<Cell<f64>>` so the test can drive it
/// independently of [`CachedGravity`]'s own clock (which only decides whether
/// to call this evaluator at all, never how it should behave).
struct TimeSwitchedGravity {
    t: Rc<Cell<f64>>,
}

impl GravityEval for TimeSwitchedGravity {
    fn build<S: Scheduler>(&mut self, _scheduler: &S, _particles: &ParticleSet) {}

    fn eval_self<S: Scheduler>(&self, _scheduler: &S, out: &mut [Vec3]) -> Stats {
        let value = if self.t.get() < 5.0 { Vec3::new(1.0, 0.0, 0.0) } else { Vec3::new(0.0, 0.0, 1.0) };
        for v in out.iter_mut() {
            *v += value;
        }
        Stats::ZERO
    }

    fn eval_at(&self, _r0: Vec3) -> Vec3 {
        Vec3::ZERO
    }

    fn eval_attractors<S: Scheduler>(&self, _scheduler: &S, _attractors: &mut Attractors, _out: &mut [Vec3]) {}

    fn finder(&self) -> Option<&KdTree> {
        None
    }
}

#[test]
fn cached_gravity_reuses_until_period_elapses_then_recomputes() {
    use gravity_core::SequentialScheduler;

    let positions = vec![Vec3::ZERO];
    let masses = vec![1.0];
    let h = vec![0.1];
    let particles = ParticleSet::new(&positions, &h, &masses, 1.0).unwrap();

    let clock = Rc::new(Cell::new(0.0));
    let inner = TimeSwitchedGravity { t: clock.clone() };
    let mut cached = CachedGravity::new(2.0, inner);
    cached.build(&SequentialScheduler, &particles);

    // t = 1: before the switch, and the very first evaluation, so it always
    // recomputes regardless of the period.
    clock.set(1.0);
    cached.advance_time(1.0);
    let mut out = vec![Vec3::ZERO; 1];
    cached.eval_self(&SequentialScheduler, &mut out);
    assert_eq!(out[0], Vec3::new(1.0, 0.0, 0.0));

    // t = 2: within 2s of t_last = 1, so the cached (1,0,0) is reused even
    // though we advance the fixture's own clock past the switch point — if
    // this weren't cached, the output would incorrectly show (0,0,1).
    clock.set(6.0);
    cached.advance_time(2.0);
    let mut out2 = vec![Vec3::ZERO; 1];
    cached.eval_self(&SequentialScheduler, &mut out2);
    assert_eq!(out2[0], Vec3::new(1.0, 0.0, 0.0));

    // t = 6: now 6 - 1 = 5 >= 2, forcing a recompute that observes the
    // post-switch fixture value.
    cached.advance_time(6.0);
    let mut out3 = vec![Vec3::ZERO; 1];
    cached.eval_self(&SequentialScheduler, &mut out3);
    assert_eq!(out3[0], Vec3::new(0.0, 0.0, 1.0));
}
