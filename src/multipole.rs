//! Multipole moment algebra (component C2).
//!
//! Tensors are hand-specialized through octupole order (rank 3) rather than
//! implemented as a fully generic compile-time tensor, matching spec.md §4.2:
//! "Implementations may unroll this through octupole order (n=2; dipole is
//! zero)." Each rank stores only its distinct symmetric components. Formulas
//! are transcribed from `lib/gravity/Moments.h` (`computeReducedMultipole`,
//! `parallelAxisTheorem` overloads, `greenGamma`, `evaluateGravity`).

use crate::vec3::Vec3;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Order of multipole approximation used by a Barnes-Hut evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum MultipoleOrder {
    Monopole,
    Quadrupole,
    Octupole,
}

/// Rank-2 symmetric tensor, 6 distinct components (xx, xy, xz, yy, yz, zz).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sym2 {
    pub xx: f64,
    pub xy: f64,
    pub xz: f64,
    pub yy: f64,
    pub yz: f64,
    pub zz: f64,
}

impl Sym2 {
    pub const ZERO: Self = Self { xx: 0., xy: 0., xz: 0., yy: 0., yz: 0., zz: 0. };

    /// Outer product `r ⊗ r` as a rank-2 multipole.
    #[inline]
    pub fn from_outer(r: Vec3) -> Self {
        Self {
            xx: r.x * r.x,
            xy: r.x * r.y,
            xz: r.x * r.z,
            yy: r.y * r.y,
            yz: r.y * r.z,
            zz: r.z * r.z,
        }
    }

    #[inline]
    pub fn scale(self, s: f64) -> Self {
        Self {
            xx: self.xx * s,
            xy: self.xy * s,
            xz: self.xz * s,
            yy: self.yy * s,
            yz: self.yz * s,
            zz: self.zz * s,
        }
    }

    #[inline]
    pub fn add(self, other: Self) -> Self {
        Self {
            xx: self.xx + other.xx,
            xy: self.xy + other.xy,
            xz: self.xz + other.xz,
            yy: self.yy + other.yy,
            yz: self.yz + other.yz,
            zz: self.zz + other.zz,
        }
    }

    /// Single contraction (trace): `M_ii`.
    #[inline]
    pub fn trace(&self) -> f64 {
        self.xx + self.yy + self.zz
    }

    /// Traceless reduction `Q2 = reduce(M2)`: `f0 = 1`, `f1 = -1/3` in Stadel's
    /// recursion (`computeReducedMultipole<2>` in Moments.h).
    #[inline]
    pub fn reduce(self) -> Self {
        let t = self.trace();
        let f1 = -1.0 / 3.0;
        Self {
            xx: self.xx + f1 * t,
            xy: self.xy,
            xz: self.xz,
            yy: self.yy + f1 * t,
            yz: self.yz,
            zz: self.zz + f1 * t,
        }
    }

    /// Parallel-axis shift of a traceless quadrupole by mass `mass` and
    /// displacement `d`: `Q2' = Q2 + reduce(d⊗d)·mass`.
    #[inline]
    pub fn parallel_axis_theorem(self, mass: f64, d: Vec3) -> Self {
        let d2 = Sym2::from_outer(d).reduce();
        self.add(d2.scale(mass))
    }

    /// First positional contraction `Q_ij r_j` (a vector).
    #[inline]
    fn contract_with(&self, r: Vec3) -> Vec3 {
        Vec3::new(
            self.xx * r.x + self.xy * r.y + self.xz * r.z,
            self.xy * r.x + self.yy * r.y + self.yz * r.z,
            self.xz * r.x + self.yz * r.y + self.zz * r.z,
        )
    }

    /// Double contraction `Q_ij r_i r_j` (a scalar).
    #[inline]
    fn double_contract_with(&self, r: Vec3) -> f64 {
        self.contract_with(r).dot(r)
    }
}

/// Rank-3 symmetric tensor, 10 distinct components.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sym3 {
    pub xxx: f64,
    pub xxy: f64,
    pub xxz: f64,
    pub xyy: f64,
    pub xyz: f64,
    pub xzz: f64,
    pub yyy: f64,
    pub yyz: f64,
    pub yzz: f64,
    pub zzz: f64,
}

impl Sym3 {
    pub const ZERO: Self = Self {
        xxx: 0., xxy: 0., xxz: 0., xyy: 0., xyz: 0., xzz: 0., yyy: 0., yyz: 0., yzz: 0., zzz: 0.,
    };

    /// Outer product `r ⊗ r ⊗ r` as a rank-3 multipole.
    #[inline]
    pub fn from_outer(r: Vec3) -> Self {
        let (x, y, z) = (r.x, r.y, r.z);
        Self {
            xxx: x * x * x,
            xxy: x * x * y,
            xxz: x * x * z,
            xyy: x * y * y,
            xyz: x * y * z,
            xzz: x * z * z,
            yyy: y * y * y,
            yyz: y * y * z,
            yzz: y * z * z,
            zzz: z * z * z,
        }
    }

    #[inline]
    pub fn scale(self, s: f64) -> Self {
        Self {
            xxx: self.xxx * s,
            xxy: self.xxy * s,
            xxz: self.xxz * s,
            xyy: self.xyy * s,
            xyz: self.xyz * s,
            xzz: self.xzz * s,
            yyy: self.yyy * s,
            yyz: self.yyz * s,
            yzz: self.yzz * s,
            zzz: self.zzz * s,
        }
    }

    #[inline]
    pub fn add(self, other: Self) -> Self {
        Self {
            xxx: self.xxx + other.xxx,
            xxy: self.xxy + other.xxy,
            xxz: self.xxz + other.xxz,
            xyy: self.xyy + other.xyy,
            xyz: self.xyz + other.xyz,
            xzz: self.xzz + other.xzz,
            yyy: self.yyy + other.yyy,
            yyz: self.yyz + other.yyz,
            yzz: self.yzz + other.yzz,
            zzz: self.zzz + other.zzz,
        }
    }

    /// Single contraction, yielding a rank-1 tensor (a vector): `M_iij`.
    #[inline]
    fn trace_vec(&self) -> Vec3 {
        Vec3::new(self.xxx + self.xyy + self.xzz, self.xxy + self.yyy + self.yzz, self.xxz + self.yyz + self.zzz)
    }

    /// Symmetrized permutation `sym(δ ⊗ T1)` used in `computeReducedMultipole<3>`:
    /// `makePermutations(Delta<2>{}, T1)`, i.e. the sum over the three ways of
    /// picking one free index to carry `T1` and pairing the other two with δ.
    #[inline]
    fn delta_sym_vec(t: Vec3) -> Self {
        Self {
            xxx: 3.0 * t.x,
            xxy: t.y,
            xxz: t.z,
            xyy: t.x,
            xyz: 0.0,
            xzz: t.x,
            yyy: 3.0 * t.y,
            yyz: t.z,
            yzz: t.y,
            zzz: 3.0 * t.z,
        }
    }

    /// Traceless reduction `Q3 = reduce(M3)` (`computeReducedMultipole<3>`):
    /// `f0 = 1`, `f1 = -1/5`.
    #[inline]
    pub fn reduce(self) -> Self {
        let t1 = self.trace_vec();
        let f1 = -1.0 / 5.0;
        self.add(Self::delta_sym_vec(t1).scale(f1))
    }

    /// Parallel-axis shift of a traceless octupole (`parallelAxisTheorem` for
    /// rank 3): `Qijk' = Qijk + reduce(d⊗d⊗d)·mass + sym(Qij ⊗ d) + Term2(Qij, d)`.
    pub fn parallel_axis_theorem(self, q2: Sym2, mass: f64, d: Vec3) -> Self {
        let d3 = Sym3::from_outer(d).reduce().scale(mass);
        let sym_q2_d = sym_outer_rank2_vec(q2, d);
        let term2 = term2(q2, d);
        self.add(d3).add(sym_q2_d).add(term2)
    }

    /// First positional contraction `Q_ijk r_k r_j` (a vector), used to evaluate
    /// the octupole contribution to acceleration.
    #[inline]
    fn double_contract_with(&self, r: Vec3) -> Vec3 {
        let (x, y, z) = (r.x, r.y, r.z);
        Vec3::new(
            self.xxx * x * x + self.xyy * y * y + self.xzz * z * z
                + 2.0 * (self.xxy * x * y + self.xxz * x * z + self.xyz * y * z),
            self.xxy * x * x + self.yyy * y * y + self.yzz * z * z
                + 2.0 * (self.xyy * x * y + self.xyz * x * z + self.yyz * y * z),
            self.xxz * x * x + self.yyz * y * y + self.zzz * z * z
                + 2.0 * (self.xyz * x * y + self.xzz * x * z + self.yzz * y * z),
        )
    }

    /// Second positional contraction `Q_ijk r_i r_j r_k` (a scalar).
    #[inline]
    fn triple_contract_with(&self, r: Vec3) -> f64 {
        self.double_contract_with(r).dot(r)
    }
}

/// `sym(Q_ij d_k)`: symmetrized outer product of a rank-2 tensor with a vector,
/// i.e. `makePermutations(Qij, d1)` in Moments.h — sum over the three distinct
/// placements of the free index `k` among `{i, j, k}`.
#[inline]
fn sym_outer_rank2_vec(q: Sym2, d: Vec3) -> Sym3 {
    let third = 1.0 / 3.0;
    Sym3 {
        xxx: q.xx * d.x,
        xxy: third * (2.0 * q.xy * d.x + q.xx * d.y),
        xxz: third * (2.0 * q.xz * d.x + q.xx * d.z),
        xyy: third * (2.0 * q.xy * d.y + q.yy * d.x),
        xyz: third * (q.xy * d.z + q.xz * d.y + q.yz * d.x),
        xzz: third * (2.0 * q.xz * d.z + q.zz * d.x),
        yyy: q.yy * d.y,
        yyz: third * (2.0 * q.yz * d.y + q.yy * d.z),
        yzz: third * (2.0 * q.yz * d.z + q.zz * d.y),
        zzz: q.zz * d.z,
    }
}

/// `Term2{Q, d}` from Moments.h: the permutation correction needed so that
/// the rank-3 parallel-axis shift stays traceless after the `sym(Q2⊗d)` term
/// above. `-2/5 * sum_perm(delta_ij Q_kl + delta_ik Q_jl + delta_jk Q_il) d_l`.
fn term2(q: Sym2, d: Vec3) -> Sym3 {
    // perm<i,j,k,l>() = delta_ij*Q_kl + delta_ik*Q_jl + delta_jk*Q_il, contracted with d_l.
    let q_dot_d = q.contract_with(d);
    let factor = -2.0 / 5.0;
    let delta = |a: usize, b: usize| if a == b { 1.0 } else { 0.0 };
    let qd = |a: usize| q_dot_d.axis(a);
    // delta_ij * (Q_kl d_l) + delta_ik * (Q_jl d_l) + delta_jk * (Q_il d_l)
    let perm = |i: usize, j: usize, k: usize| -> f64 {
        delta(i, j) * qd(k) + delta(i, k) * qd(j) + delta(j, k) * qd(i)
    };
    Sym3 {
        xxx: factor * perm(0, 0, 0),
        xxy: factor * perm(0, 0, 1),
        xxz: factor * perm(0, 0, 2),
        xyy: factor * perm(0, 1, 1),
        xyz: factor * perm(0, 1, 2),
        xzz: factor * perm(0, 2, 2),
        yyy: factor * perm(1, 1, 1),
        yyz: factor * perm(1, 1, 2),
        yzz: factor * perm(1, 2, 2),
        zzz: factor * perm(2, 2, 2),
    }
}

/// The full multipole expansion of a node, up to the configured order. The
/// dipole is always zero by construction (moments are taken about the node's
/// own centre of mass), per spec.md §3.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MultipoleExpansion {
    pub mass: f64,
    pub q2: Sym2,
    pub q3: Sym3,
}

impl MultipoleExpansion {
    pub const ZERO: Self = Self { mass: 0.0, q2: Sym2::ZERO, q3: Sym3::ZERO };

    #[inline]
    pub fn monopole(mass: f64) -> Self {
        Self { mass, q2: Sym2::ZERO, q3: Sym3::ZERO }
    }

    /// Combines the moments of two children already shifted to the parent's
    /// centre of mass (the shifting itself is the caller's job via
    /// [`Sym2::parallel_axis_theorem`] / [`Sym3::parallel_axis_theorem`]).
    #[inline]
    pub fn add(self, other: Self) -> Self {
        Self {
            mass: self.mass + other.mass,
            q2: self.q2.add(other.q2),
            q3: self.q3.add(other.q3),
        }
    }

    /// Scales the monopole term only; used by `root_moments()` to undo the
    /// internal `G` pre-multiplication (the open question resolved in
    /// DESIGN.md: moments carry `G`-scaled mass internally).
    #[inline]
    pub fn scale_mass(self, s: f64) -> Self {
        Self { mass: self.mass * s, q2: self.q2, q3: self.q3 }
    }
}

/// `greenGamma(M, invDistSqr)`: the recursive Green's function factor used to
/// evaluate successive positional derivatives of the `1/r` potential.
/// `γ_0 = -sqrt(invDistSqr)`, `γ_n = -(2n-1) invDistSqr γ_{n-1}`.
fn green_gamma(m: usize, inv_dist_sqr: f64) -> f64 {
    let mut gamma = -inv_dist_sqr.sqrt();
    for n in 1..=m {
        gamma = -(2.0 * n as f64 - 1.0) * inv_dist_sqr * gamma;
    }
    gamma
}

/// Evaluates the acceleration contribution of a node's multipole expansion at
/// displacement `dr = r_field - r_com`, through the given order.
///
/// This is `evaluateGravity` in Moments.h, unrolled through octupole order:
/// `a = Σ_n -γ_{n+1}·dr·Q_n^{(0)}(dr) - γ_n·Q_n^{(1)}(dr)`, dipole omitted
/// (always zero).
pub fn evaluate_gravity(dr: Vec3, moments: &MultipoleExpansion, order: MultipoleOrder) -> Vec3 {
    let inv_dist_sqr = 1.0 / dr.length_squared();
    let gamma: [f64; 4] = std::array::from_fn(|i| green_gamma(i, inv_dist_sqr));

    // monopole: Q0 has no free index to contract, so only the gamma_1 term
    // survives (Q_0^(1) is not defined for a rank-0 tensor).
    let q00 = moments.mass;
    let mut a = dr * (-gamma[1] * q00);

    if order == MultipoleOrder::Monopole {
        return a;
    }

    // quadrupole: Q0 = (1/2) Q_ij dr_i dr_j, Q1 = Q_ij dr_j (see computeMultipolePotential<0/1>)
    let q20 = 0.5 * moments.q2.double_contract_with(dr);
    let q21 = moments.q2.contract_with(dr);
    a += dr * (-gamma[2] * q20) - q21 * gamma[1];

    if order == MultipoleOrder::Quadrupole {
        return a;
    }

    // octupole: Q0 = (1/6) Q_ijk dr_i dr_j dr_k, Q1 = (1/2) Q_ijk dr_j dr_k
    let q30 = moments.q3.triple_contract_with(dr) / 6.0;
    let q31 = moments.q3.double_contract_with(dr) * 0.5;
    a += dr * (-gamma[3] * q30) - q31 * gamma[2];

    a
}
