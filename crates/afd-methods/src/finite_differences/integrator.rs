//! Backward time integration of the discretised Black-Scholes PDE.
//!
//! In time-to-maturity `τ = T − t` the semi-discrete system reads
//! `dV/dτ = L·V`. One θ-step from `τ` to `τ + Δt` solves
//!
//! ```text
//! (I − θΔt·L)·V_new = (I + (1−θ)Δt·L)·V_old
//! ```
//!
//! with θ = 0 (explicit), 1 (implicit) or ½ (Crank-Nicolson). The boundary
//! rows of the left-hand side are identity rows carrying the new edge values,
//! and the edges are overwritten again after every update.

use afd_core::{errors::Error, errors::Result, Rate, Real, Time, Volatility};
use afd_math::{ThomasWorkspace, TridiagonalOperator};
use tracing::debug;

use super::boundary::BoundaryConditions;
use super::config::SolverConfig;
use super::field::PriceField;
use super::grid::Grid;
use super::operator::BlackScholesOperator;
use super::FdmScheme;

/// Step sizes are compared against bounds with this relative slack.
const BOUND_SLACK: Real = 1e-12;

/// Result of one error-controlled step attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct StepAttempt {
    /// Two-half-step solution, already carrying the new boundary values.
    pub values: Vec<Real>,
    /// Max-norm difference between one full step and two half steps.
    pub error: Real,
}

/// Advances a [`PriceField`] backward in time.
///
/// Owns the operator and all scratch buffers of one solve. The operator is
/// rebuilt lazily whenever the field arrives on a different grid.
#[derive(Debug)]
pub struct TimeIntegrator {
    scheme: FdmScheme,
    boundary: BoundaryConditions,
    volatility: Volatility,
    rate: Rate,
    stability_constant: Real,
    damping_steps: usize,
    operator: Option<BlackScholesOperator>,
    lhs: TridiagonalOperator,
    lhs_factor: Option<Real>,
    lv: Vec<Real>,
    rhs: Vec<Real>,
    work: ThomasWorkspace,
}

impl TimeIntegrator {
    /// Integrator for `scheme` with the given boundary conditions.
    pub fn new(
        scheme: FdmScheme,
        boundary: BoundaryConditions,
        volatility: Volatility,
        rate: Rate,
    ) -> Self {
        Self {
            scheme,
            boundary,
            volatility,
            rate,
            stability_constant: 0.5,
            damping_steps: 0,
            operator: None,
            lhs: TridiagonalOperator::new(0),
            lhs_factor: None,
            lv: Vec::new(),
            rhs: Vec::new(),
            work: ThomasWorkspace::default(),
        }
    }

    /// Integrator configured from a solver request.
    pub fn from_config(config: &SolverConfig) -> Self {
        Self::new(
            config.scheme,
            BoundaryConditions::from_config(config),
            config.volatility,
            config.rate,
        )
        .with_stability_constant(config.stability_constant)
        .with_damping_steps(config.damping_steps)
    }

    /// Explicit-scheme stability constant `C`.
    pub fn with_stability_constant(mut self, c: Real) -> Self {
        self.stability_constant = c;
        self
    }

    /// Number of leading Crank-Nicolson steps replaced by two implicit half
    /// steps.
    pub fn with_damping_steps(mut self, steps: usize) -> Self {
        self.damping_steps = steps;
        self
    }

    /// The time-stepping scheme.
    pub fn scheme(&self) -> FdmScheme {
        self.scheme
    }

    /// The boundary conditions applied after every update.
    pub fn boundary(&self) -> &BoundaryConditions {
        &self.boundary
    }

    /// Make sure the operator matches `grid`, rebuilding it if not.
    pub fn prepare(&mut self, grid: &Grid) -> &BlackScholesOperator {
        self.drop_stale_operator(grid);
        let (volatility, rate) = (self.volatility, self.rate);
        self.operator
            .get_or_insert_with(|| BlackScholesOperator::build(grid, volatility, rate))
    }

    fn drop_stale_operator(&mut self, grid: &Grid) {
        let fresh = matches!(
            &self.operator,
            Some(op) if op.is_built_for(grid, self.volatility, self.rate)
        );
        if !fresh {
            debug!(nodes = grid.len(), "rebuilding operator");
            self.operator = None;
            self.lhs_factor = None;
        }
    }

    /// Largest admissible explicit step on `grid`.
    pub fn stability_bound(&mut self, grid: &Grid) -> Real {
        let c = self.stability_constant;
        self.prepare(grid).explicit_stability_bound(c)
    }

    /// Advance `field` from `tau` to `tau + dt`.
    ///
    /// `step` is the index of this step counted from maturity; it selects
    /// damping steps and is reported in errors.
    ///
    /// # Errors
    /// [`Error::NumericalInstability`] if the explicit scheme is asked for a
    /// step above its stability bound (checked before anything is touched),
    /// [`Error::SingularSystem`] if the linear solve breaks down.
    pub fn step(&mut self, field: &mut PriceField, tau: Time, dt: Time, step: usize) -> Result<()> {
        let grid = field.grid().clone();
        if self.scheme == FdmScheme::Explicit {
            let bound = self.stability_bound(&grid);
            if dt > bound * (1.0 + BOUND_SLACK) {
                return Err(Error::NumericalInstability { step, dt, bound });
            }
        }
        self.advance(&grid, field.values_mut(), tau, dt, step)
    }

    /// One full step and two half steps from the same state.
    ///
    /// `field` is left untouched; the caller decides whether to accept
    /// [`StepAttempt::values`].
    pub fn attempt(
        &mut self,
        field: &PriceField,
        tau: Time,
        dt: Time,
        step: usize,
    ) -> Result<StepAttempt> {
        let grid = field.grid().clone();
        if self.scheme == FdmScheme::Explicit {
            let bound = self.stability_bound(&grid);
            if dt > bound * (1.0 + BOUND_SLACK) {
                return Err(Error::NumericalInstability { step, dt, bound });
            }
        }

        let mut full = field.values().to_vec();
        self.advance(&grid, &mut full, tau, dt, step)?;

        let half_dt = 0.5 * dt;
        let mut half = field.values().to_vec();
        self.advance(&grid, &mut half, tau, half_dt, step)?;
        self.advance(&grid, &mut half, tau + half_dt, half_dt, step)?;

        let error = full
            .iter()
            .zip(&half)
            .fold(0.0, |m: Real, (a, b)| m.max((a - b).abs()));
        Ok(StepAttempt {
            values: half,
            error,
        })
    }

    fn advance(
        &mut self,
        grid: &Grid,
        values: &mut [Real],
        tau: Time,
        dt: Time,
        step: usize,
    ) -> Result<()> {
        match self.scheme {
            FdmScheme::CrankNicolson if step < self.damping_steps => {
                let half_dt = 0.5 * dt;
                self.theta_step(grid, values, tau, half_dt, 1.0, step)?;
                self.theta_step(grid, values, tau + half_dt, half_dt, 1.0, step)
            }
            scheme => self.theta_step(grid, values, tau, dt, scheme.theta(), step),
        }
    }

    fn theta_step(
        &mut self,
        grid: &Grid,
        values: &mut [Real],
        tau: Time,
        dt: Time,
        theta: Real,
        step: usize,
    ) -> Result<()> {
        self.drop_stale_operator(grid);
        let n = values.len();
        let tau_next = tau + dt;
        let Self {
            boundary,
            volatility,
            rate,
            operator,
            lhs,
            lhs_factor,
            lv,
            rhs,
            work,
            ..
        } = self;
        let operator =
            operator.get_or_insert_with(|| BlackScholesOperator::build(grid, *volatility, *rate));

        // rhs = V + (1−θ)Δt·L·V
        rhs.resize(n, 0.0);
        let explicit_weight = (1.0 - theta) * dt;
        if explicit_weight != 0.0 {
            lv.resize(n, 0.0);
            operator.apply_into(values, lv);
            for i in 0..n {
                rhs[i] = values[i] + explicit_weight * lv[i];
            }
        } else {
            rhs.copy_from_slice(values);
        }

        if theta == 0.0 {
            values.copy_from_slice(rhs);
        } else {
            // lhs = I − θΔt·L, reused while θΔt and the grid stay put
            let factor = theta * dt;
            if *lhs_factor != Some(factor) {
                *lhs = operator.tridiagonal().clone();
                lhs.scale(-factor);
                lhs.add_identity(1.0);
                lhs.set_identity_row(0);
                lhs.set_identity_row(n - 1);
                *lhs_factor = Some(factor);
            }
            let (lo, hi) = boundary.values(tau_next);
            rhs[0] = lo;
            rhs[n - 1] = hi;
            lhs.solve_into(rhs, values, work)
                .map_err(|e| e.at_step(step))?;
        }

        boundary.apply(values, tau_next);
        Ok(())
    }
}
