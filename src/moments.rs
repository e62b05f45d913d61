//! Bottom-up aggregation of multipole moments over a built [`KdTree`]
//! (component C5), grounded on
//! `core/gravity/BarnesHut.cpp::buildLeaf`/`buildInner`.

use crate::kdtree::{KdTree, NodeKind};
use crate::multipole::{MultipoleExpansion, Sym2, Sym3};
use crate::vec3::Vec3;

/// Per-node gravity data, stored index-aligned with [`KdTree::nodes`] (a
/// parallel array standing in for the original's `BarnesHutNode : KdNode`
/// inheritance, per the "tagged variants over inheritance" choice in spec.md §9).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GravityNode {
    pub com: Vec3,
    pub moments: MultipoleExpansion,
    /// Opening radius (Stadel PhD thesis Eq. 2.36): a field point within this
    /// distance of `com` requires the node to open rather than be approximated.
    pub r_open: f64,
}

impl GravityNode {
    const EMPTY: Self = Self { com: Vec3::ZERO, moments: MultipoleExpansion::ZERO, r_open: 0.0 };
}

enum Frame {
    Enter(u32),
    Exit(u32),
}

/// Computes one [`GravityNode`] per tree node, in a single bottom-up pass.
/// `scaled_masses[i]` is `G * mass[i]` (spec.md §9's G-convention:
/// gravitational constant folded into masses internally; see
/// [`crate::gravity`]'s `root_moments` for where it's divided back out).
/// `theta_inv` is `1 / theta`, the inverse Barnes-Hut opening angle.
///
/// Implemented iteratively (an explicit stack rather than recursion) so
/// aggregation doesn't risk a stack overflow on deep or degenerate trees —
/// the original's recursive `iterateTree<BOTTOM_UP>` assumes a scheduler that
/// can bound call depth; we don't make that assumption here.
pub fn aggregate(tree: &KdTree, positions: &[Vec3], scaled_masses: &[f64], theta_inv: f64) -> Vec<GravityNode> {
    let mut out = vec![GravityNode::EMPTY; tree.nodes().len()];
    if tree.is_empty() {
        return out;
    }

    let mut stack = vec![Frame::Enter(tree.root())];
    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(idx) => match tree.nodes()[idx as usize].kind {
                NodeKind::Leaf { from, to } => {
                    let bbox = tree.nodes()[idx as usize].bbox;
                    out[idx as usize] = build_leaf(tree, positions, scaled_masses, from, to, bbox, theta_inv);
                }
                NodeKind::Inner { left, right, .. } => {
                    stack.push(Frame::Exit(idx));
                    stack.push(Frame::Enter(right));
                    stack.push(Frame::Enter(left));
                }
            },
            Frame::Exit(idx) => {
                let bbox = tree.nodes()[idx as usize].bbox;
                let NodeKind::Inner { left, right, .. } = tree.nodes()[idx as usize].kind else {
                    unreachable!("Exit frame only pushed for inner nodes");
                };
                out[idx as usize] = build_inner(out[left as usize], out[right as usize], bbox, theta_inv);
            }
        }
    }

    out
}

fn opening_radius(com: Vec3, bbox: crate::vec3::Box3, theta_inv: f64) -> f64 {
    let r_max = (com - bbox.lower).max(bbox.upper - com);
    2.0 / 3.0f64.sqrt() * theta_inv * r_max.length()
}

fn build_leaf(
    tree: &KdTree,
    positions: &[Vec3],
    scaled_masses: &[f64],
    from: u32,
    to: u32,
    bbox: crate::vec3::Box3,
    theta_inv: f64,
) -> GravityNode {
    let indices = &tree.indices()[from as usize..to as usize];

    match indices.len() {
        0 => GravityNode::EMPTY,
        1 => {
            let i = indices[0] as usize;
            GravityNode {
                com: positions[i],
                moments: MultipoleExpansion::monopole(scaled_masses[i]),
                r_open: 0.0,
            }
        }
        _ => {
            let mut com = Vec3::ZERO;
            let mut mass = 0.0;
            for &i in indices {
                let i = i as usize;
                com += positions[i] * scaled_masses[i];
                mass += scaled_masses[i];
            }
            com /= mass;

            let mut q2 = Sym2::ZERO;
            let mut q3 = Sym3::ZERO;
            for &i in indices {
                let i = i as usize;
                let d = positions[i] - com;
                q2 = q2.add(Sym2::from_outer(d).scale(scaled_masses[i]));
                q3 = q3.add(Sym3::from_outer(d).scale(scaled_masses[i]));
            }

            GravityNode {
                com,
                moments: MultipoleExpansion { mass, q2: q2.reduce(), q3: q3.reduce() },
                r_open: opening_radius(com, bbox, theta_inv),
            }
        }
    }
}

fn build_inner(left: GravityNode, right: GravityNode, bbox: crate::vec3::Box3, theta_inv: f64) -> GravityNode {
    let total_mass = left.moments.mass + right.moments.mass;
    if total_mass == 0.0 {
        return GravityNode::EMPTY;
    }

    let com = (left.com * left.moments.mass + right.com * right.moments.mass) / total_mass;

    let d_left = left.com - com;
    let q2 = left.moments.q2.parallel_axis_theorem(left.moments.mass, d_left).add(
        right.moments.q2.parallel_axis_theorem(right.moments.mass, right.com - com),
    );
    let q3 = left
        .moments
        .q3
        .parallel_axis_theorem(left.moments.q2, left.moments.mass, d_left)
        .add(right.moments.q3.parallel_axis_theorem(right.moments.q2, right.moments.mass, right.com - com));

    GravityNode {
        com,
        moments: MultipoleExpansion { mass: total_mass, q2, q3 },
        r_open: opening_radius(com, bbox, theta_inv),
    }
}
