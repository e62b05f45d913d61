//! Dual-recursion Barnes-Hut tree walk (component C6), grounded line-for-line
//! on `core/gravity/BarnesHut.cpp::evalNode`/`evalImpl`.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::kdtree::{KdTree, NodeKind};
use crate::kernel::{GravityKernel, Symmetrized};
use crate::moments::GravityNode;
use crate::multipole::{evaluate_gravity, MultipoleOrder};
use crate::scheduler::Scheduler;
use crate::vec3::{Intersection, Sphere, Vec3};

/// Small epsilon added to squared box-distance before dividing, matching the
/// original's `+ EPS` guard against a query point exactly at a box's center.
const EPS: f64 = 1e-12;

/// The three work lists threaded through one call to [`eval_node`], matching
/// `BarnesHut::TreeWalkState`. `check_list` holds nodes not yet classified
/// against the evaluated node's opening ball; `particle_list` holds nodes
/// whose particles interact exactly; `node_list` holds nodes approximated via
/// their multipole expansion.
#[derive(Clone, Debug, Default)]
pub struct TreeWalkState {
    pub check_list: Vec<u32>,
    pub particle_list: Vec<u32>,
    pub node_list: Vec<u32>,
    pub depth: u32,
}

/// Running totals from one [`eval_node`] walk, matching `TreeWalkResult`.
#[derive(Debug, Default)]
pub struct TreeWalkResult {
    pub approximated_nodes: AtomicU64,
    pub exact_nodes: AtomicU64,
}

/// An aliased mutable view over the acceleration output array.
///
/// Every write during the dual-recursion walk targets the particles owned by
/// whichever leaf is the *currently evaluated node* — and leaves partition
/// particles disjointly, so two concurrently-running branches of the walk
/// never touch the same index. That invariant (not the borrow checker) is
/// what makes splitting `&mut [Vec3]` across `scheduler.join`'s two closures
/// sound; this type documents and contains the one unsafe assumption instead
/// of threading `unsafe` through every call site.
#[derive(Clone, Copy)]
pub(crate) struct OutputSlice<'a> {
    ptr: *mut Vec3,
    len: usize,
    _marker: PhantomData<&'a ()>,
}

unsafe impl<'a> Send for OutputSlice<'a> {}
unsafe impl<'a> Sync for OutputSlice<'a> {}

impl<'a> OutputSlice<'a> {
    pub fn new(out: &'a mut [Vec3]) -> Self {
        Self { ptr: out.as_mut_ptr(), len: out.len(), _marker: PhantomData }
    }

    #[inline]
    pub(crate) fn add(&self, i: usize, v: Vec3) {
        debug_assert!(i < self.len);
        // SAFETY: see the invariant documented on the type: each index is
        // only ever written while evaluating the one leaf that owns it.
        unsafe {
            *self.ptr.add(i) += v;
        }
    }
}

/// Arguments bundled so `eval_node`'s recursive calls don't balloon into a
/// dozen positional parameters.
pub struct WalkContext<'a, K: GravityKernel + ?Sized> {
    pub tree: &'a KdTree,
    pub nodes: &'a [GravityNode],
    pub positions: &'a [Vec3],
    pub smoothing_lengths: &'a [f64],
    pub scaled_masses: &'a [f64],
    pub kernel: &'a K,
    pub order: MultipoleOrder,
    pub max_depth: u32,
}

/// Evaluates self-gravity for one node of the dual-recursion walk, writing
/// contributions into `out` and recursing into children via `scheduler`.
/// Matches `BarnesHut::evalNode` exactly, including the "one side always
/// runs inline" task-splitting rule gated on `max_depth`. Called at the root
/// with `node_idx = tree.root()` and `state = TreeWalkState::default()` (an
/// empty checklist — the root has nothing to check against yet; real
/// classification begins once a node's sibling is pushed onto its child's
/// checklist one level down).
pub fn eval_node<S: Scheduler, K: GravityKernel + ?Sized>(
    scheduler: &S,
    ctx: &WalkContext<K>,
    node_idx: u32,
    mut state: TreeWalkState,
    out: OutputSlice,
    result: &TreeWalkResult,
) {
    let evaluated = &ctx.tree.nodes()[node_idx as usize];
    if evaluated.bbox.is_empty() {
        return;
    }
    let evaluated_is_leaf = evaluated.is_leaf();

    // `work` is drained live: opening an inner node requeues its children onto
    // the same list so they're reclassified against `evaluated` immediately,
    // instead of surviving into a stale snapshot. Matches the original's
    // `for (auto iter = checkList.begin(); iter != checkList.end();)` with
    // `erase`/`pushBack` on the same list. Only the final "not yet decidable"
    // case below (only reachable when `evaluated` is an inner node) escapes
    // this loop, via `state.check_list`, to be resolved one level down.
    let mut work = std::mem::take(&mut state.check_list);
    while let Some(idx) = work.pop() {
        let gnode = ctx.nodes[idx as usize];
        if gnode.r_open == 0.0 {
            // empty node or a single particle: exact interaction only.
            state.particle_list.push(idx);
            continue;
        }

        let ball = Sphere::new(gnode.com, gnode.r_open);
        let intersect = ball.intersects_box(&evaluated.bbox);

        let should_open = intersect == Intersection::Contains
            || (evaluated_is_leaf && intersect != Intersection::Disjoint);

        if should_open {
            match ctx.tree.nodes()[idx as usize].kind {
                NodeKind::Leaf { .. } => state.particle_list.push(idx),
                NodeKind::Inner { left, right, .. } => {
                    work.push(left);
                    work.push(right);
                }
            }
        } else if intersect == Intersection::Disjoint {
            state.node_list.push(idx);
        } else {
            // Overlaps, and the evaluated node is an inner node: not yet
            // decidable, carry it forward to the children's checklists.
            state.check_list.push(idx);
        }
    }

    if evaluated_is_leaf {
        debug_assert!(state.check_list.is_empty(), "a leaf must fully resolve its checklist, matching BarnesHut.cpp's evalNode assertion");
        let NodeKind::Leaf { from, to } = evaluated.kind else { unreachable!() };
        eval_particle_list(ctx, from, to, &state.particle_list, out);
        result.exact_nodes.fetch_add(state.particle_list.len() as u64, Ordering::Relaxed);
        eval_node_list(ctx, from, to, &state.node_list, out);
        result.approximated_nodes.fetch_add(state.node_list.len() as u64, Ordering::Relaxed);
    } else {
        let NodeKind::Inner { left, right, .. } = evaluated.kind else { unreachable!() };
        let depth = state.depth + 1;

        let mut left_state = state.clone();
        left_state.depth = depth;
        left_state.check_list.push(right);

        let mut right_state = state;
        right_state.depth = depth;
        right_state.check_list.push(left);

        let run_left = || eval_node(scheduler, ctx, left, left_state, out, result);
        let run_right = || eval_node(scheduler, ctx, right, right_state, out, result);

        if depth < ctx.max_depth {
            scheduler.join(run_left, run_right);
        } else {
            run_left();
            run_right();
        }
    }
}

fn eval_particle_list<K: GravityKernel + ?Sized>(
    ctx: &WalkContext<K>,
    leaf_from: u32,
    leaf_to: u32,
    particle_list: &[u32],
    out: OutputSlice,
) {
    let seq1 = &ctx.tree.indices()[leaf_from as usize..leaf_to as usize];
    let sym = Symmetrized::new(ctx.kernel);

    for &idx in particle_list {
        let NodeKind::Leaf { from, to } = ctx.tree.nodes()[idx as usize].kind else {
            continue; // only leaves end up in particle_list
        };
        let seq2 = &ctx.tree.indices()[from as usize..to as usize];
        for &i in seq1 {
            let (i, hi) = (i as usize, ctx.smoothing_lengths[i as usize]);
            for &j in seq2 {
                let j = j as usize;
                let grad = sym.grad(ctx.positions[j], ctx.smoothing_lengths[j], ctx.positions[i], hi);
                out.add(i, grad * ctx.scaled_masses[j]);
            }
        }
    }

    // Intra-leaf interactions: the leaf's own members aren't listed in
    // `particle_list`, so every pair within `seq1` is handled here once.
    for a in 0..seq1.len() {
        let i = seq1[a] as usize;
        for b in (a + 1)..seq1.len() {
            let j = seq1[b] as usize;
            let grad = sym.grad(
                ctx.positions[j],
                ctx.smoothing_lengths[j],
                ctx.positions[i],
                ctx.smoothing_lengths[i],
            );
            out.add(i, grad * ctx.scaled_masses[j]);
            out.add(j, grad * -ctx.scaled_masses[i]);
        }
    }
}

fn eval_node_list<K: GravityKernel + ?Sized>(
    ctx: &WalkContext<K>,
    leaf_from: u32,
    leaf_to: u32,
    node_list: &[u32],
    out: OutputSlice,
) {
    let seq1 = &ctx.tree.indices()[leaf_from as usize..leaf_to as usize];
    for &idx in node_list {
        let gnode = ctx.nodes[idx as usize];
        for &i in seq1 {
            let i = i as usize;
            let a = evaluate_gravity(ctx.positions[i] - gnode.com, &gnode.moments, ctx.order);
            out.add(i, a);
        }
    }
}

/// Exact pairwise sum over a leaf's members, used both by [`eval_at`] and by
/// brute-force-style fallbacks. `exclude` skips a particle's self-interaction
/// (`idx == i` in the original's `evalExact`).
fn eval_exact<K: GravityKernel + ?Sized>(
    positions: &[Vec3],
    smoothing_lengths: &[f64],
    scaled_masses: &[f64],
    kernel: &K,
    indices: &[u32],
    r0: Vec3,
    exclude: Option<u32>,
) -> Vec3 {
    let mut f = Vec3::ZERO;
    for &i in indices {
        if Some(i) == exclude {
            continue;
        }
        let i = i as usize;
        f += kernel.grad(positions[i] - r0, smoothing_lengths[i]) * scaled_masses[i];
    }
    f
}

/// Acceleration at an arbitrary point `r0`, per-point top-down walk matching
/// `BarnesHut::evalImpl`. Uses a distinct, simpler geometric opening test
/// (`boxSize² / boxDist² < theta²`) rather than the dual-recursion walk's
/// open-sphere-vs-box test — the two criteria are kept deliberately separate
/// (see DESIGN.md's Open Question resolution), each serving its own entry
/// point. `exclude` optionally skips one particle's self-contribution, used
/// when evaluating the acceleration *at* a particle already in the tree.
pub fn eval_at<K: GravityKernel + ?Sized>(
    tree: &KdTree,
    nodes: &[GravityNode],
    positions: &[Vec3],
    smoothing_lengths: &[f64],
    scaled_masses: &[f64],
    kernel: &K,
    order: MultipoleOrder,
    theta: f64,
    r0: Vec3,
    exclude: Option<u32>,
) -> Vec3 {
    if tree.is_empty() {
        return Vec3::ZERO;
    }

    let mut f = Vec3::ZERO;
    let mut stack = vec![tree.root()];
    let theta_sqr = theta * theta;

    while let Some(idx) = stack.pop() {
        let node = &tree.nodes()[idx as usize];
        if node.bbox.is_empty() {
            continue;
        }

        let box_size_sqr = node.bbox.size().length_squared();
        let box_dist_sqr = (node.bbox.center() - r0).length_squared();

        let can_approximate =
            !node.bbox.contains(r0) && box_size_sqr > 0.0 && box_size_sqr / (box_dist_sqr + EPS) < theta_sqr;

        if can_approximate {
            let gnode = nodes[idx as usize];
            f += evaluate_gravity(r0 - gnode.com, &gnode.moments, order);
            continue;
        }

        match node.kind {
            NodeKind::Leaf { from, to } => {
                let indices = &tree.indices()[from as usize..to as usize];
                f += eval_exact(positions, smoothing_lengths, scaled_masses, kernel, indices, r0, exclude);
            }
            NodeKind::Inner { left, right, .. } => {
                stack.push(left);
                stack.push(right);
            }
        }
    }

    f
}
