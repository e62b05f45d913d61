//! Gravity evaluation statistics sink (ambient), grounded on
//! `system/Statistics`'s `stats.set(GRAVITY_NODES_APPROXIMATED, ...)` usage in
//! `BarnesHut.cpp`. Generalized into a small typed struct (instead of a
//! `HashMap<StatisticsId, Value>` soup) plus a [`StatsSink`] trait so a caller
//! can redirect the numbers into their own telemetry instead of only getting
//! a plain struct back.

use std::time::Duration;

/// Node-visit counters and timing for one [`crate::gravity::GravityEval::eval_self`]
/// call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Stats {
    /// Particle pairs evaluated exactly (leaf-to-leaf interactions).
    pub exact_nodes: u64,
    /// Tree nodes approximated via their multipole expansion.
    pub approximated_nodes: u64,
    /// Total node count in the tree built for this evaluation, `0` for
    /// evaluators that don't build a tree (`BruteForceGravity`).
    pub node_count: u64,
    /// Wall-clock time of the evaluation, populated only when the evaluator's
    /// config opts into timing (`measure_time`); `None` by default so the
    /// core doesn't pull in a timing dependency beyond `std::time::Instant`.
    /// [`crate::gravity::cached::CachedGravity`] sets this to `Some(Duration::ZERO)`
    /// on a cache hit, matching `CachedGravity::evalAll` setting
    /// `GRAVITY_EVAL_TIME` to zero when it skips recomputation.
    pub eval_time: Option<Duration>,
}

impl Stats {
    pub const ZERO: Self = Self { exact_nodes: 0, approximated_nodes: 0, node_count: 0, eval_time: None };
}

/// A destination for [`Stats`], so callers can forward evaluation counters
/// into their own telemetry system instead of only reading the returned
/// struct. The default no-op sink costs nothing when unused.
pub trait StatsSink {
    fn record(&mut self, stats: Stats);
}

/// Discards every [`Stats`] it's handed.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl StatsSink for NullSink {
    #[inline]
    fn record(&mut self, _stats: Stats) {}
}
