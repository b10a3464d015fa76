//! # afd-methods
//!
//! Finite-difference pricing of European options under Black-Scholes on
//! uniform or curvature-refined price grids.
//!
//! # Modules
//!
//! * [`finite_differences`] — grids, refinement, discretisation, time
//!   integration and the solver that ties them together

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Finite difference methods: adaptive grids, θ-schemes, solver.
pub mod finite_differences;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use afd_core::{Error, OptionType, Result};
pub use finite_differences::{
    solve, FdmScheme, Grid, GridMode, PriceInterpolation, PriceSurface, RefinementConfig,
    RefinementStatus, Solution, Solver, SolverConfig, TimeStepping,
};
