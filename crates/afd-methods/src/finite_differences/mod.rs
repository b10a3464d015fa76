//! Finite difference methods for the Black-Scholes PDE on adaptive grids.
//!
//! European calls and puts are priced by integrating
//! `∂V/∂t + ½σ²S²·∂²V/∂S² + rS·∂V/∂S − rV = 0` backward from the payoff on a
//! price grid `[0, S_max]` that may be refined around the strike.
//!
//! # Overview
//!
//! * [`Grid`] / [`GridBuilder`] — immutable node sets and the uniform seed grid
//! * [`RefinementEngine`] — curvature-driven midpoint insertion
//! * [`BlackScholesOperator`] — non-uniform three-point discretisation
//! * [`BoundaryConditions`] — Dirichlet edge values per option type
//! * [`TimeIntegrator`] — explicit, implicit or Crank-Nicolson θ-steps
//! * [`Solver`] — orchestration, returning a [`Solution`] with its
//!   [`PriceSurface`]

use afd_core::Real;

mod boundary;
mod config;
mod field;
mod grid;
mod integrator;
mod operator;
mod refinement;
mod solver;
mod surface;

pub use boundary::BoundaryConditions;
pub use config::{GridMode, RefinementConfig, SolverConfig, TimeStepping};
pub use field::{PriceField, PriceInterpolation};
pub use grid::{Grid, GridBuilder};
pub use integrator::{StepAttempt, TimeIntegrator};
pub use operator::{first_derivative_weights, second_derivative_weights, BlackScholesOperator};
pub use refinement::{RefinementEngine, RefinementReference, RefinementStatus};
pub use solver::{solve, AdaptiveGrid, GridStrategy, Solution, Solver, UniformGrid};
pub use surface::{PriceSurface, TimeSlice};

// ─── FDM scheme selection ─────────────────────────────────────────────────────

/// Finite difference time-stepping scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FdmScheme {
    /// Explicit: `V_new = (I + Δt·L)·V_old`; conditionally stable.
    Explicit,
    /// Fully implicit: `(I − Δt·L)·V_new = V_old`; unconditionally stable.
    #[default]
    Implicit,
    /// Crank-Nicolson: θ = ½ average of explicit and implicit.
    CrankNicolson,
}

impl FdmScheme {
    /// Implicitness weight θ of the scheme.
    pub fn theta(self) -> Real {
        match self {
            FdmScheme::Explicit => 0.0,
            FdmScheme::Implicit => 1.0,
            FdmScheme::CrankNicolson => 0.5,
        }
    }
}
