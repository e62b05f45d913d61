//! Gravity core for SPH/N-body astrophysical simulation.
//!
//! Computes gravitational accelerations on a set of mass-bearing particles via
//! a k-d spatial index with multipole moments and a parallel Barnes–Hut tree
//! walk. Three evaluators share one contract ([`gravity::GravityEval`]):
//! [`gravity::BruteForceGravity`] (exact, O(N²)), [`gravity::BarnesHutGravity`]
//! (approximate, O(N log N)), and [`gravity::CachedGravity`] (wraps either,
//! reusing accelerations within a recomputation window).
//!
//! The core does no I/O and holds no global state: the gravitational constant,
//! opening angle, softening kernel, and scheduler are all supplied by the
//! caller. Particle storage, SPH physics, and time integration live outside
//! this crate.

pub mod attractor;
pub mod error;
pub mod gravity;
pub mod kdtree;
pub mod kernel;
pub mod moments;
pub mod multipole;
pub mod particles;
pub mod scheduler;
pub mod stats;
pub mod vec3;
mod walk;

pub use attractor::{Attractor, Attractors};
pub use error::{GravityError, Result, SanityCheckError};
pub use gravity::{BarnesHutConfig, BarnesHutGravity, BruteForceGravity, CachedGravity, GravityEval, SymmetricGravity};
pub use kdtree::{KdTree, KdTreeConfig};
pub use kernel::{GravityKernel, LutKernel, Symmetrized, ZeroKernel};
pub use multipole::{MultipoleExpansion, MultipoleOrder};
pub use particles::ParticleSet;
pub use scheduler::{RayonScheduler, Scheduler, SequentialScheduler};
pub use stats::{NullSink, Stats, StatsSink};
pub use vec3::{Box3, Intersection, Sphere, Vec3};
