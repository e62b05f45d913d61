//! Tree construction: sliding-midpoint partition with median-split and
//! singular-box fallbacks, grounded on
//! `KdTree.inl.h::buildTree`/`addLeaf`/`addInner`.

use parking_lot::RwLock;

use super::{KdTreeConfig, Node, NodeKind};
use crate::scheduler::Scheduler;
use crate::vec3::{Box3, Vec3};

/// Shared, growable node storage used while building in parallel. The
/// original reserves a slot with an atomic counter, then grows `nodes` under
/// a write lock before writing into the reserved slot; `parking_lot::RwLock`
/// here plays the role of its `shared_timed_mutex`, with a coarser but
/// equivalent "lock for the push" strategy, since a single push per node is
/// not hot enough to need lock-free tricks.
struct Arena {
    nodes: RwLock<Vec<Node>>,
}

impl Arena {
    fn new() -> Self {
        Self { nodes: RwLock::new(Vec::new()) }
    }

    fn push(&self, node: Node) -> u32 {
        let mut nodes = self.nodes.write();
        let index = nodes.len() as u32;
        nodes.push(node);
        index
    }

    fn into_nodes(self) -> Vec<Node> {
        self.nodes.into_inner()
    }
}

fn bbox_of(indices: &[u32], positions: &[Vec3]) -> Box3 {
    let mut bbox = Box3::EMPTY;
    for &i in indices {
        bbox.extend(positions[i as usize]);
    }
    bbox
}

/// Partitions `indices` so that every index for which `is_left` holds (when
/// applied to that point's coordinate on `axis`) comes before every index for
/// which it doesn't. Returns the split point (count on the left).
fn partition_by(indices: &mut [u32], positions: &[Vec3], axis: usize, is_left: impl Fn(f64) -> bool) -> usize {
    let mut lo = 0usize;
    let mut hi = indices.len();
    while lo < hi {
        let v = positions[indices[lo] as usize].axis(axis);
        if is_left(v) {
            lo += 1;
        } else {
            hi -= 1;
            indices.swap(lo, hi);
        }
    }
    lo
}

fn is_singular(indices: &[u32], positions: &[Vec3], axis: usize) -> bool {
    if indices.is_empty() {
        return true;
    }
    let first = positions[indices[0] as usize].axis(axis);
    indices.iter().all(|&i| positions[i as usize].axis(axis) == first)
}

pub(super) fn build<S: Scheduler>(scheduler: &S, positions: &[Vec3], config: &KdTreeConfig) -> super::KdTree {
    let mut indices: Vec<u32> = (0..positions.len() as u32).collect();

    if positions.is_empty() {
        let node = Node { bbox: Box3::EMPTY, kind: NodeKind::Leaf { from: 0, to: 0 } };
        return super::KdTree { nodes: vec![node], indices, root: 0 };
    }

    let arena = Arena::new();
    let root_bbox = bbox_of(&indices, positions);
    let ctx = BuildCtx { positions, config, arena: &arena, scheduler };
    let (root, _) = ctx.build(&mut indices, 0, 0, 0, root_bbox);

    super::KdTree { nodes: arena.into_nodes(), indices, root }
}

struct BuildCtx<'a, S: Scheduler> {
    positions: &'a [Vec3],
    config: &'a KdTreeConfig,
    arena: &'a Arena,
    scheduler: &'a S,
}

impl<'a, S: Scheduler> BuildCtx<'a, S> {
    /// Builds one subtree over `indices` (a mutable slice of the shared
    /// permutation array; disjoint ranges are built in disjoint slices, so no
    /// synchronization is needed on `indices` itself — only the node array is
    /// shared). Returns the node index and the subtree's tight bounding box.
    fn build(&self, indices: &mut [u32], offset: u32, depth: u32, sliding_count: u32, bbox: Box3) -> (u32, Box3) {
        if indices.len() <= self.config.leaf_size || depth >= self.config.max_tree_depth {
            let node = Node {
                bbox,
                kind: NodeKind::Leaf { from: offset, to: offset + indices.len() as u32 },
            };
            return (self.arena.push(node), bbox);
        }

        let axis = self.pick_axis(indices, bbox);
        let (split, slid) = self.partition(indices, axis, bbox, sliding_count);
        if slid {
            log::trace!("kd-tree build: sliding midpoint on axis {axis} at depth {depth}");
        }
        let next_sliding_count = if slid { sliding_count + 1 } else { 0 };

        let split_position = if split == 0 || split == indices.len() {
            bbox.center().axis(axis)
        } else {
            self.positions[indices[split] as usize].axis(axis)
        };
        let (box_lo, box_hi) = bbox.split(axis, split_position);
        let (left_part, right_part) = indices.split_at_mut(split);
        let right_offset = offset + split as u32;

        let run_left = || self.build(left_part, offset, depth + 1, next_sliding_count, box_lo);
        let run_right = || self.build(right_part, right_offset, depth + 1, next_sliding_count, box_hi);

        // "one side always runs inline" (BarnesHut.cpp::evalNode): below
        // `max_parallel_depth` we fork through the scheduler, beyond it both
        // sides run on the calling thread.
        let ((left_idx, left_bbox), (right_idx, right_bbox)) = if depth < self.config.max_parallel_depth {
            self.scheduler.join(run_left, run_right)
        } else {
            (run_left(), run_right())
        };

        let mut combined = left_bbox;
        combined.extend_box(&right_bbox);
        let node = Node {
            bbox: combined,
            kind: NodeKind::Inner {
                split_axis: axis as u8,
                split_position,
                left: left_idx,
                right: right_idx,
            },
        };
        (self.arena.push(node), combined)
    }

    /// Prefers the box's widest axis; falls back to any non-degenerate axis
    /// if every point is coincident along it (`KdTree.inl.h`'s
    /// `isSingular`/degenerate-box handling).
    fn pick_axis(&self, indices: &[u32], bbox: Box3) -> usize {
        let preferred = bbox.size().arg_max();
        if !is_singular(indices, self.positions, preferred) {
            return preferred;
        }
        (0..3)
            .find(|&a| !is_singular(indices, self.positions, a))
            .unwrap_or(preferred)
    }

    /// Maximum consecutive sliding-midpoint splits before falling back to a
    /// median split (spec.md §4.1: "if the counter exceeds 5, switch to
    /// median split").
    const MAX_SLIDES: u32 = 5;

    /// Returns `(split_point, slid)`. Tries a plain box-centre split first;
    /// if that leaves one side empty, slides the plane to the extreme point
    /// on that side (unless `sliding_count` has already run past
    /// [`Self::MAX_SLIDES`], in which case it falls straight to an exact
    /// median split); falls back to the median split too if sliding still
    /// can't separate the points (a long run of coincident extrema).
    fn partition(&self, indices: &mut [u32], axis: usize, bbox: Box3, sliding_count: u32) -> (usize, bool) {
        let midpoint = bbox.center().axis(axis);
        let mut split = partition_by(indices, self.positions, axis, |v| v < midpoint);
        let mut slid = false;

        if split == 0 || split == indices.len() {
            if sliding_count > Self::MAX_SLIDES {
                log::trace!(
                    "kd-tree build: sliding-midpoint count exceeded {} on axis {axis}, falling to median split",
                    Self::MAX_SLIDES
                );
            } else if split == 0 {
                let min_v = indices
                    .iter()
                    .map(|&i| self.positions[i as usize].axis(axis))
                    .fold(f64::INFINITY, f64::min);
                split = partition_by(indices, self.positions, axis, |v| v <= min_v);
                slid = true;
            } else {
                let max_v = indices
                    .iter()
                    .map(|&i| self.positions[i as usize].axis(axis))
                    .fold(f64::NEG_INFINITY, f64::max);
                split = partition_by(indices, self.positions, axis, |v| v < max_v);
                slid = true;
            }
        }

        if split == 0 || split == indices.len() {
            if slid {
                log::warn!("kd-tree build: degenerate range on axis {axis}, falling back to raw median split");
            }
            let mid = indices.len() / 2;
            indices.select_nth_unstable_by(mid, |&a, &b| {
                let va = self.positions[a as usize].axis(axis);
                let vb = self.positions[b as usize].axis(axis);
                va.partial_cmp(&vb).expect("non-finite coordinate in kd-tree build")
            });
            split = mid;
            slid = false;
        }

        (split, slid)
    }
}
