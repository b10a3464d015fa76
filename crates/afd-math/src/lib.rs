//! # afd-math
//!
//! Mathematical utilities for the finite-difference engine: 1D interpolation
//! on irregular node sets and the tridiagonal operator with its direct
//! (Thomas) solver.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// 1D interpolation schemes.
pub mod interpolations;

/// Tridiagonal operators and the Thomas algorithm.
pub mod tridiagonal;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use interpolations::{
    resample_linear, HermiteCubic, Interpolation1D, LinearInterpolation, SlopeMethod,
};
pub use tridiagonal::{ThomasWorkspace, TridiagonalOperator};
