//! K-d spatial index over particle positions (component C4).
//!
//! Grounded on `lib/objects/finders/KdTree.h` and
//! `core/objects/finders/KdTree.inl.h`. The original stores `InnerNode` and
//! `LeafNode` as two structs reinterpreted through a common base, protected by
//! a `static_assert(sizeof(InnerNode) == sizeof(LeafNode))` so both fit in one
//! flat, uniformly-indexable array. A Rust enum already gives that property
//! safely, so [`NodeKind`] replaces the reinterpret-cast trick outright rather
//! than reproducing it.

mod build;
mod query;

use crate::error::SanityCheckError;
use crate::scheduler::Scheduler;
use crate::vec3::{Box3, Vec3};

pub use query::StackEntry;

/// Split axis plus leaf-range bookkeeping for one node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeKind {
    Inner {
        split_axis: u8,
        split_position: f64,
        left: u32,
        right: u32,
    },
    Leaf {
        from: u32,
        to: u32,
    },
}

/// One node of the tree: a bounding box plus either an inner split or a leaf
/// range into [`KdTree::indices`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
    pub bbox: Box3,
    pub kind: NodeKind,
}

impl Node {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }
}

/// Tuning knobs for tree construction, mirroring `KdTree`'s constructor
/// parameters in the original.
#[derive(Clone, Copy, Debug)]
pub struct KdTreeConfig {
    /// Stop splitting once a node holds this many points or fewer.
    pub leaf_size: usize,
    /// Below this recursion depth, left/right children build in parallel via
    /// [`Scheduler::join`]; at or beyond it, both sides build inline to avoid
    /// spawning more tasks than there is work to justify.
    pub max_parallel_depth: u32,
    /// Hard recursion ceiling, guarding against runaway splitting on
    /// degenerate point clouds (coincident particles).
    pub max_tree_depth: u32,
}

impl Default for KdTreeConfig {
    fn default() -> Self {
        Self {
            leaf_size: 1,
            max_parallel_depth: 5,
            max_tree_depth: 50,
        }
    }
}

/// A static k-d tree over a borrowed point set, built fresh every time
/// positions change (spec.md §4.1: no incremental update).
#[derive(Clone, Debug)]
pub struct KdTree {
    pub(crate) nodes: Vec<Node>,
    /// Permutation of `0..positions.len()`, grouped so that every leaf's
    /// points occupy a contiguous run `[from, to)`.
    pub(crate) indices: Vec<u32>,
    pub(crate) root: u32,
}

impl KdTree {
    /// Builds a tree over `positions`. Empty input produces a tree with a
    /// single empty-box leaf spanning no points.
    pub fn build<S: Scheduler>(scheduler: &S, positions: &[Vec3], config: &KdTreeConfig) -> Self {
        build::build(scheduler, positions, config)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn root(&self) -> u32 {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Finds every point index whose squared distance to `query` is at most
    /// `radius_sqr`, appending to `out`. `rank_filter` additionally restricts
    /// results to indices for which it returns `true` (the original uses this
    /// to exclude a particle from its own neighbour list).
    pub fn find_neighbors(
        &self,
        positions: &[Vec3],
        query: Vec3,
        radius_sqr: f64,
        rank_filter: impl Fn(u32) -> bool,
        out: &mut Vec<u32>,
    ) {
        query::find_neighbors(self, positions, query, radius_sqr, rank_filter, out);
    }

    /// Runs the four structural invariants from spec.md §4.1:
    /// 1. every point lies inside the root bounding box,
    /// 2. every inner node's children are valid indices into `nodes`,
    /// 3. every leaf's index range is valid and its bounding box contains
    ///    every point in that range,
    /// 4. the number of reachable nodes matches `nodes.len()`.
    pub fn sanity_check(&self, positions: &[Vec3]) -> Result<(), SanityCheckError> {
        query::sanity_check(self, positions)
    }
}
