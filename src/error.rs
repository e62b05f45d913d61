//! Error types (ambient infrastructure, not mirrored in the original, which
//! reports invariant violations via `ASSERT`/exceptions; spec.md §7 asks for
//! `Result`-based reporting instead, so failures surface as values).

use thiserror::Error;

/// A violation found by [`crate::kdtree::KdTree::sanity_check`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SanityCheckError {
    #[error("point {index} at {point:?} lies outside the tree's root bounding box {bbox:?}")]
    PointOutsideRootBox { index: usize, point: [f64; 3], bbox: String },

    #[error("inner node {node} references out-of-range child index {child}")]
    InvalidChildIndex { node: u32, child: u32 },

    #[error("leaf node {node} has invalid index range [{from}, {to})")]
    InvalidLeafRange { node: u32, from: u32, to: u32 },

    #[error("leaf node {node}'s bounding box does not contain all of its points")]
    LeafBoxDoesNotContainPoints { node: u32 },

    #[error("node count mismatch: expected {expected} nodes but found {actual}")]
    NodeCountMismatch { expected: usize, actual: usize },
}

/// Errors surfaced by the gravity evaluators (spec.md §7).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GravityError {
    #[error("particle arrays have mismatched lengths: positions={positions}, masses={masses}, smoothing_lengths={smoothing_lengths}")]
    MismatchedArrayLengths {
        positions: usize,
        masses: usize,
        smoothing_lengths: usize,
    },

    #[error("eval_self called before build: the tree has not been constructed yet")]
    NotBuilt,

    #[error("tree sanity check failed: {0}")]
    SanityCheck(#[from] SanityCheckError),

    #[error("opening angle theta must be positive and finite, got {theta}")]
    NonPositiveOpeningAngle { theta: f64 },

    #[error("smoothing length must be positive and finite, got {h}")]
    NonPositiveSmoothingLength { h: f64 },

    #[error("softening kernel radius must be positive, got {radius}")]
    NonPositiveSoftening { radius: f64 },

    #[error("cached-gravity recomputation period must be positive, got {period}")]
    NonPositiveRecomputationPeriod { period: f64 },

    #[error("buffer length mismatch: expected {expected}, got {got}")]
    BufferLengthMismatch { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, GravityError>;
