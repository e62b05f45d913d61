//! Neighbour search and structural validation, grounded on
//! `KdTree.inl.h::find`/`sanityCheck`.

use std::cell::RefCell;

use super::{KdTree, NodeKind};
use crate::error::SanityCheckError;
use crate::vec3::Vec3;

/// One frame of the cached traversal stack: a node index plus its
/// componentwise squared distance and L¹-summed distance to the query point,
/// computed once when the entry is pushed so a node already known to be
/// disjoint from the search ball is pruned without touching its box again.
/// Reused across calls via a thread-local so repeated neighbour queries (one
/// per particle, every timestep) don't reallocate
/// (`thread_local Array<ProcessedNode> nodeStack` in the original).
#[derive(Clone, Copy, Debug)]
pub struct StackEntry {
    node: u32,
    dist_sqr: f64,
    l1: f64,
}

thread_local! {
    static STACK: RefCell<Vec<StackEntry>> = RefCell::new(Vec::new());
}

fn push_entry(stack: &mut Vec<StackEntry>, tree: &KdTree, node: u32, query: Vec3) {
    let offset = tree.nodes[node as usize].bbox.clamp_offset(query);
    stack.push(StackEntry { node, dist_sqr: offset.length_squared(), l1: offset.l1_norm() });
}

pub(super) fn find_neighbors(
    tree: &KdTree,
    positions: &[Vec3],
    query: Vec3,
    radius_sqr: f64,
    rank_filter: impl Fn(u32) -> bool,
    out: &mut Vec<u32>,
) {
    if tree.is_empty() {
        return;
    }

    STACK.with(|cell| {
        let mut stack = cell.borrow_mut();
        stack.clear();
        push_entry(&mut stack, tree, tree.root, query);

        while let Some(entry) = stack.pop() {
            if entry.dist_sqr > radius_sqr {
                continue;
            }
            // sum of squares never exceeds the square of a sum of the same
            // non-negative terms, so the L1 bound always dominates.
            debug_assert!(entry.l1 * entry.l1 >= entry.dist_sqr - 1e-9);
            let node = &tree.nodes[entry.node as usize];

            match node.kind {
                NodeKind::Leaf { from, to } => {
                    for &idx in &tree.indices[from as usize..to as usize] {
                        if !rank_filter(idx) {
                            continue;
                        }
                        let d2 = (positions[idx as usize] - query).length_squared();
                        if d2 <= radius_sqr {
                            out.push(idx);
                        }
                    }
                }
                NodeKind::Inner { left, right, split_axis, split_position } => {
                    // Descend the near child first so that, for queries that
                    // terminate early (a caller that only wants the first
                    // match), the cache stays hot on the locally relevant
                    // subtree; here we visit both regardless; order doesn't
                    // change the final result set.
                    let near_first = query.axis(split_axis as usize) < split_position;
                    let (first, second) = if near_first { (left, right) } else { (right, left) };
                    push_entry(&mut stack, tree, second, query);
                    push_entry(&mut stack, tree, first, query);
                }
            }
        }
    });
}

pub(super) fn sanity_check(tree: &KdTree, positions: &[Vec3]) -> Result<(), SanityCheckError> {
    if tree.is_empty() {
        return Ok(());
    }

    let root_bbox = tree.nodes[tree.root as usize].bbox;
    for (i, &idx) in tree.indices.iter().enumerate() {
        let p = positions[idx as usize];
        if !root_bbox.contains(p) {
            return Err(SanityCheckError::PointOutsideRootBox {
                index: i,
                point: [p.x, p.y, p.z],
                bbox: format!("{root_bbox:?}"),
            });
        }
    }

    let mut reachable = 0usize;
    let mut stack = vec![tree.root];
    while let Some(idx) = stack.pop() {
        reachable += 1;
        let node = tree
            .nodes
            .get(idx as usize)
            .ok_or(SanityCheckError::InvalidChildIndex { node: idx, child: idx })?;

        match node.kind {
            NodeKind::Inner { left, right, .. } => {
                for child in [left, right] {
                    if tree.nodes.get(child as usize).is_none() {
                        return Err(SanityCheckError::InvalidChildIndex { node: idx, child });
                    }
                }
                stack.push(left);
                stack.push(right);
            }
            NodeKind::Leaf { from, to } => {
                if from > to || to as usize > tree.indices.len() {
                    return Err(SanityCheckError::InvalidLeafRange { node: idx, from, to });
                }
                for &point_idx in &tree.indices[from as usize..to as usize] {
                    if !node.bbox.contains(positions[point_idx as usize]) {
                        return Err(SanityCheckError::LeafBoxDoesNotContainPoints { node: idx });
                    }
                }
            }
        }
    }

    if reachable != tree.nodes.len() {
        return Err(SanityCheckError::NodeCountMismatch { expected: tree.nodes.len(), actual: reachable });
    }

    Ok(())
}
