//! Task scheduling abstraction (component C8).
//!
//! The tree builder and the dual-recursion walk both need to fork work at a
//! node and run both halves, joining before moving on to the parent. The
//! original expresses this as `IScheduler::submit(...)` returning a handle to
//! `wait()` on; we mirror that shape with [`Scheduler::join`], implemented
//! once in terms of `submit`/`wait` so callers never touch a thread pool
//! directly. [`RayonScheduler`] spreads work across rayon's global pool (or a
//! caller-supplied [`rayon::ThreadPool`]); [`SequentialScheduler`] runs both
//! sides inline, which the brute-force determinism tests (spec.md §8) rely on
//! for bit-identical output across runs.

use rayon::prelude::*;

/// A handle to a task submitted via [`Scheduler::submit`].
pub trait Handle {
    /// Blocks until the task completes.
    fn wait(self);
}

/// Abstracts over "run this closure, possibly on another thread".
pub trait Scheduler: Sync {
    type Handle: Handle;

    /// Submits `f` for execution, returning a handle to wait on.
    fn submit<F>(&self, f: F) -> Self::Handle
    where
        F: FnOnce() + Send;

    /// Runs `a` and `b`, returning both results once finished. Implementations
    /// are free to run them concurrently or in sequence.
    fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send;

    /// Runs `f` over every index in `0..len`, parallelizing when the
    /// scheduler supports it.
    fn parallel_for<F>(&self, len: usize, f: F)
    where
        F: Fn(usize) + Sync,
    {
        for i in 0..len {
            f(i);
        }
    }
}

/// No-op handle for schedulers that run work eagerly before returning it.
pub struct ImmediateHandle;

impl Handle for ImmediateHandle {
    #[inline]
    fn wait(self) {}
}

/// Runs every task immediately on the calling thread. Used in tests and
/// anywhere deterministic, single-threaded evaluation order matters.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialScheduler;

impl Scheduler for SequentialScheduler {
    type Handle = ImmediateHandle;

    #[inline]
    fn submit<F>(&self, f: F) -> Self::Handle
    where
        F: FnOnce() + Send,
    {
        f();
        ImmediateHandle
    }

    #[inline]
    fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        let ra = a();
        let rb = b();
        (ra, rb)
    }

    fn parallel_for<F>(&self, len: usize, f: F)
    where
        F: Fn(usize) + Sync,
    {
        for i in 0..len {
            f(i);
        }
    }
}

/// A handle backed by a rayon scope's implicit join; `wait` is a no-op since
/// [`RayonScheduler::submit`] only returns after the closure has run to
/// completion on rayon's pool (rayon has no free-standing "fire and forget
/// then wait later" primitive, so we fold submit+wait into one rayon call).
pub struct RayonHandle;

impl Handle for RayonHandle {
    #[inline]
    fn wait(self) {}
}

/// Backs [`Scheduler`] with rayon's global thread pool, or a caller-supplied
/// pool for callers who want to bound concurrency (e.g. to leave cores free
/// for an enclosing simulation loop).
#[derive(Default)]
pub struct RayonScheduler {
    pool: Option<rayon::ThreadPool>,
}

impl RayonScheduler {
    /// Uses rayon's global pool.
    pub fn new() -> Self {
        Self { pool: None }
    }

    /// Uses a dedicated pool, e.g. built with [`rayon::ThreadPoolBuilder`].
    pub fn with_pool(pool: rayon::ThreadPool) -> Self {
        Self { pool: Some(pool) }
    }

    fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}

impl Scheduler for RayonScheduler {
    type Handle = RayonHandle;

    fn submit<F>(&self, f: F) -> Self::Handle
    where
        F: FnOnce() + Send,
    {
        self.install(f);
        RayonHandle
    }

    fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        self.install(|| rayon::join(a, b))
    }

    fn parallel_for<F>(&self, len: usize, f: F)
    where
        F: Fn(usize) + Sync,
    {
        self.install(|| (0..len).into_par_iter().for_each(|i| f(i)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn sequential_scheduler_runs_both_sides_in_order() {
        let order = std::sync::Mutex::new(Vec::new());
        let sched = SequentialScheduler;
        sched.join(
            || order.lock().unwrap().push(1),
            || order.lock().unwrap().push(2),
        );
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn rayon_scheduler_parallel_for_visits_every_index() {
        let sched = RayonScheduler::new();
        let count = AtomicUsize::new(0);
        sched.parallel_for(1000, |_| {
            count.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(count.load(Ordering::Relaxed), 1000);
    }

    #[test]
    fn rayon_scheduler_join_runs_both_closures() {
        let sched = RayonScheduler::new();
        let (a, b) = sched.join(|| 1 + 1, || 2 + 2);
        assert_eq!((a, b), (2, 4));
    }
}
