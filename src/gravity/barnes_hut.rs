//! Multipole-approximated gravity over a k-d tree, grounded on
//! `lib/gravity/BarnesHut.h`/`core/gravity/BarnesHut.cpp`.

use std::time::Instant;

use crate::attractor::{self, Attractors};
use crate::gravity::GravityEval;
use crate::kdtree::{KdTree, KdTreeConfig};
use crate::kernel::GravityKernel;
use crate::moments::{self, GravityNode};
use crate::multipole::{MultipoleExpansion, MultipoleOrder};
use crate::particles::ParticleSet;
use crate::scheduler::Scheduler;
use crate::stats::Stats;
use crate::vec3::Vec3;
use crate::walk::{self, OutputSlice, TreeWalkResult, TreeWalkState, WalkContext};

/// Tuning knobs, mirroring `BarnesHut`'s constructor parameters plus the k-d
/// tree's own (`theta`, `order`, `leaf_size`, and the tree's depth/size
/// limits all live in one config struct rather than scattered constructor
/// arguments, per SPEC_FULL.md's "ambient config" rule).
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct BarnesHutConfig {
    /// Opening angle; lower means higher precision, slower computation.
    pub theta: f64,
    /// Order of multipole approximation used by the tree walk.
    pub order: MultipoleOrder,
    /// Maximum number of particles in a leaf.
    pub leaf_size: usize,
    /// Depth below which the tree build and the tree walk both fork via
    /// [`Scheduler::join`] instead of running inline.
    pub max_parallel_depth: u32,
    pub max_tree_depth: u32,
    /// Gravitational constant, folded into stored masses.
    pub g: f64,
    /// When set, [`BarnesHutGravity::build`] logs wall-clock build time.
    pub measure_time: bool,
}

impl Default for BarnesHutConfig {
    fn default() -> Self {
        Self {
            theta: 0.5,
            order: MultipoleOrder::Octupole,
            leaf_size: 20,
            max_parallel_depth: 5,
            max_tree_depth: 50,
            g: 1.0,
            measure_time: false,
        }
    }
}

/// Multipole-approximated gravity: builds a k-d tree over the particle set
/// each [`GravityEval::build`] call and evaluates it with the dual-recursion
/// walk (`walk::eval_node`) for self-gravity, or the per-point walk
/// (`walk::eval_at`) for an arbitrary query point.
pub struct BarnesHutGravity<K: GravityKernel> {
    config: BarnesHutConfig,
    kernel: K,
    positions: Vec<Vec3>,
    smoothing_lengths: Vec<f64>,
    scaled_masses: Vec<f64>,
    tree: Option<KdTree>,
    nodes: Vec<GravityNode>,
}

impl<K: GravityKernel> BarnesHutGravity<K> {
    pub fn new(config: BarnesHutConfig, kernel: K) -> Self {
        debug_assert!(config.theta > 0.0, "opening angle must be positive");
        Self {
            config,
            kernel,
            positions: Vec::new(),
            smoothing_lengths: Vec::new(),
            scaled_masses: Vec::new(),
            tree: None,
            nodes: Vec::new(),
        }
    }

    /// The multipole expansion of the whole particle set, as seen from the
    /// root node, with `G` divided back out (`BarnesHut::getMoments`).
    pub fn root_moments(&self) -> MultipoleExpansion {
        let Some(tree) = &self.tree else {
            return MultipoleExpansion::ZERO;
        };
        self.nodes[tree.root() as usize].moments.scale_mass(1.0 / self.config.g)
    }
}

impl<K: GravityKernel> GravityEval for BarnesHutGravity<K> {
    fn build<S: Scheduler>(&mut self, scheduler: &S, particles: &ParticleSet) {
        let start = self.config.measure_time.then(Instant::now);

        self.positions = particles.positions().to_vec();
        self.smoothing_lengths = particles.smoothing_lengths().to_vec();
        self.scaled_masses = particles.scaled_masses().to_vec();

        let tree_config = KdTreeConfig {
            leaf_size: self.config.leaf_size,
            max_parallel_depth: self.config.max_parallel_depth,
            max_tree_depth: self.config.max_tree_depth,
        };
        let tree = KdTree::build(scheduler, &self.positions, &tree_config);
        self.nodes = moments::aggregate(&tree, &self.positions, &self.scaled_masses, 1.0 / self.config.theta);

        if let Some(start) = start {
            log::debug!("barnes-hut build: {} nodes in {:?}", tree.nodes().len(), start.elapsed());
        }
        self.tree = Some(tree);
    }

    fn eval_self<S: Scheduler>(&self, scheduler: &S, out: &mut [Vec3]) -> Stats {
        let Some(tree) = &self.tree else {
            debug_assert!(false, "eval_self called before build");
            return Stats::ZERO;
        };
        debug_assert_eq!(out.len(), self.positions.len());

        let ctx = WalkContext {
            tree,
            nodes: &self.nodes,
            positions: &self.positions,
            smoothing_lengths: &self.smoothing_lengths,
            scaled_masses: &self.scaled_masses,
            kernel: &self.kernel,
            order: self.config.order,
            max_depth: self.config.max_parallel_depth,
        };
        let result = TreeWalkResult::default();
        if !tree.is_empty() {
            let out_view = OutputSlice::new(out);
            walk::eval_node(scheduler, &ctx, tree.root(), TreeWalkState::default(), out_view, &result);
        }

        Stats {
            exact_nodes: result.exact_nodes.load(std::sync::atomic::Ordering::Relaxed),
            approximated_nodes: result.approximated_nodes.load(std::sync::atomic::Ordering::Relaxed),
            node_count: tree.nodes().len() as u64,
            eval_time: None,
        }
    }

    fn eval_at(&self, r0: Vec3) -> Vec3 {
        let Some(tree) = &self.tree else {
            debug_assert!(false, "eval_at called before build");
            return Vec3::ZERO;
        };
        walk::eval_at(
            tree,
            &self.nodes,
            &self.positions,
            &self.smoothing_lengths,
            &self.scaled_masses,
            &self.kernel,
            self.config.order,
            self.config.theta,
            r0,
            None,
        )
    }

    fn eval_attractors<S: Scheduler>(&self, scheduler: &S, attractors: &mut Attractors, out: &mut [Vec3]) {
        attractor::eval_attractor_particle_interactions(
            scheduler,
            &self.positions,
            &self.smoothing_lengths,
            &self.scaled_masses,
            &self.kernel,
            self.config.g,
            attractors,
            out,
        );
        attractor::eval_attractor_attractor_interactions(&self.kernel, self.config.g, attractors);
    }

    fn finder(&self) -> Option<&KdTree> {
        self.tree.as_ref()
    }
}
