//! Solve orchestration.
//!
//! A [`Solver`] owns one validated [`SolverConfig`] and a [`GridStrategy`].
//! Each call to [`Solver::solve`] builds its own grid, operator and buffers,
//! so independent solves share nothing and may run on separate threads.

use std::sync::atomic::{AtomicBool, Ordering};

use afd_core::{errors::Error, errors::Result, Real, Time};
use tracing::{debug, instrument, trace};

use super::config::{GridMode, SolverConfig, TimeStepping};
use super::field::{PriceField, PriceInterpolation};
use super::grid::{Grid, GridBuilder};
use super::integrator::TimeIntegrator;
use super::refinement::{RefinementEngine, RefinementReference, RefinementStatus};
use super::surface::{PriceSurface, TimeSlice};
use super::FdmScheme;

/// Adaptive time steps below `maturity × MIN_STEP_FRACTION` are an underflow.
const MIN_STEP_FRACTION: Real = 1e-12;

/// Remaining times below `maturity × TIME_EPSILON` count as zero.
const TIME_EPSILON: Real = 1e-12;

// ─── Grid strategies ─────────────────────────────────────────────────────────

/// How the spatial grid is chosen and revised during a solve.
pub trait GridStrategy: Send + Sync + std::fmt::Debug {
    /// Grid the backward sweep starts on, derived from the uniform `seed`.
    fn initial_grid(&self, seed: &Grid, config: &SolverConfig) -> Result<(Grid, RefinementStatus)>;

    /// Number of evenly spaced regrid points inside `(0, T)`.
    fn checkpoints(&self, config: &SolverConfig) -> usize;

    /// Revised grid for the in-progress `field`, or `None` to keep it.
    fn regrid(
        &self,
        field: &PriceField,
        config: &SolverConfig,
    ) -> Result<Option<(Grid, RefinementStatus)>>;
}

/// Fixed equally spaced nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformGrid;

impl GridStrategy for UniformGrid {
    fn initial_grid(&self, seed: &Grid, _config: &SolverConfig) -> Result<(Grid, RefinementStatus)> {
        let status = RefinementStatus {
            converged: true,
            ..RefinementStatus::default()
        };
        Ok((seed.clone(), status))
    }

    fn checkpoints(&self, _config: &SolverConfig) -> usize {
        0
    }

    fn regrid(&self, _field: &PriceField, _config: &SolverConfig) -> Result<Option<(Grid, RefinementStatus)>> {
        Ok(None)
    }
}

/// Curvature refinement: against the payoff up front, then against the
/// current price field at each checkpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveGrid;

impl GridStrategy for AdaptiveGrid {
    fn initial_grid(&self, seed: &Grid, config: &SolverConfig) -> Result<(Grid, RefinementStatus)> {
        let reference = RefinementReference::Payoff {
            option_type: config.option_type,
            strike: config.strike,
        };
        RefinementEngine::from_config(config).refine(seed, reference)
    }

    fn checkpoints(&self, config: &SolverConfig) -> usize {
        config.refinement.checkpoints
    }

    fn regrid(
        &self,
        field: &PriceField,
        config: &SolverConfig,
    ) -> Result<Option<(Grid, RefinementStatus)>> {
        let reference = RefinementReference::Field(field.values());
        let (grid, status) = RefinementEngine::from_config(config).refine(field.grid(), reference)?;
        Ok(Some((grid, status)))
    }
}

// ─── Solution ────────────────────────────────────────────────────────────────

/// Output of one solve.
#[derive(Debug, Clone)]
pub struct Solution {
    field: PriceField,
    surface: PriceSurface,
    refinement: RefinementStatus,
    completed: bool,
    steps: usize,
}

impl Solution {
    /// Grid of the last computed slice.
    pub fn grid(&self) -> &Grid {
        self.field.grid()
    }

    /// Prices on [`grid`](Self::grid) at the last computed time.
    pub fn values(&self) -> &[Real] {
        self.field.values()
    }

    /// The last computed price field.
    pub fn field(&self) -> &PriceField {
        &self.field
    }

    /// Every stored slice from valuation to maturity.
    pub fn surface(&self) -> &PriceSurface {
        &self.surface
    }

    /// Accumulated refinement outcome over the whole solve.
    pub fn refinement_status(&self) -> RefinementStatus {
        self.refinement
    }

    /// `false` if the solve was cancelled before reaching `t = 0`.
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Number of accepted time steps.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Linearly interpolated price at `spot`.
    pub fn price_at(&self, spot: Real) -> Result<Real> {
        self.field.value_at(spot, PriceInterpolation::Linear)
    }

    /// Price at `spot` with the chosen interpolation.
    pub fn price_at_with(&self, spot: Real, method: PriceInterpolation) -> Result<Real> {
        self.field.value_at(spot, method)
    }

    /// Root-mean-square difference between the solved prices and
    /// `reference` over the final grid nodes.
    pub fn l2_error<F>(&self, reference: F) -> Real
    where
        F: Fn(Real) -> Real,
    {
        let nodes = self.grid().nodes();
        let sum_sq: Real = nodes
            .iter()
            .zip(self.values())
            .map(|(&s, &v)| {
                let d = v - reference(s);
                d * d
            })
            .sum();
        (sum_sq / nodes.len() as Real).sqrt()
    }
}

// ─── Solver ──────────────────────────────────────────────────────────────────

/// Prices one European option by backward finite differences.
///
/// # Example
///
/// ```
/// use afd_methods::{OptionType, Solver, SolverConfig};
///
/// let config = SolverConfig::new(OptionType::Call, 100.0, 1.0).with_time_steps(100);
/// let solution = Solver::new(config).unwrap().solve().unwrap();
/// let price = solution.price_at(100.0).unwrap();
/// assert!((price - 10.45).abs() < 0.2);
/// ```
#[derive(Debug)]
pub struct Solver {
    config: SolverConfig,
    strategy: Box<dyn GridStrategy>,
}

impl Solver {
    /// Validate `config` and pick the grid strategy from its grid mode.
    ///
    /// # Errors
    /// [`Error::InvalidConfig`] for any out-of-range parameter.
    pub fn new(config: SolverConfig) -> Result<Self> {
        config.validate()?;
        let strategy: Box<dyn GridStrategy> = match config.grid_mode {
            GridMode::Uniform => Box::new(UniformGrid),
            GridMode::Adaptive => Box::new(AdaptiveGrid),
        };
        Ok(Self { config, strategy })
    }

    /// Replace the grid strategy.
    pub fn with_strategy<S: GridStrategy + 'static>(mut self, strategy: S) -> Self {
        self.strategy = Box::new(strategy);
        self
    }

    /// The validated configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Run the solve to `t = 0`.
    pub fn solve(&self) -> Result<Solution> {
        self.run(None)
    }

    /// Run the solve, stopping between steps once `cancel` is set.
    ///
    /// A cancelled solve is not an error: the returned solution ends at the
    /// last completed step and [`Solution::is_complete`] is `false`.
    pub fn solve_cancellable(&self, cancel: &AtomicBool) -> Result<Solution> {
        self.run(Some(cancel))
    }

    #[instrument(
        name = "solve",
        skip_all,
        fields(
            option = %self.config.option_type,
            strike = self.config.strike,
            scheme = ?self.config.scheme,
            grid_mode = ?self.config.grid_mode,
        )
    )]
    fn run(&self, cancel: Option<&AtomicBool>) -> Result<Solution> {
        let cfg = &self.config;
        let seed = GridBuilder::build(cfg)?;
        let (grid, status) = self.strategy.initial_grid(&seed, cfg)?;
        debug!(
            nodes = grid.len(),
            passes = status.passes_run,
            capped = status.capped,
            "initial grid"
        );

        let mut sweep = Sweep {
            config: cfg,
            strategy: self.strategy.as_ref(),
            cancel,
            integrator: TimeIntegrator::from_config(cfg),
            field: PriceField::from_payoff(grid, cfg.option_type, cfg.strike),
            checkpoints: checkpoint_times(cfg.maturity, self.strategy.checkpoints(cfg)),
            next_checkpoint: 0,
            slices: Vec::new(),
            status,
            tau: 0.0,
            steps: 0,
        };
        sweep.record();

        let completed = match cfg.time_stepping {
            TimeStepping::Fixed { steps } => sweep.run_fixed(steps)?,
            TimeStepping::Adaptive {
                initial_steps,
                tolerance,
                max_dt,
            } => sweep.run_adaptive(initial_steps, tolerance, max_dt)?,
        };

        let Sweep {
            field,
            mut slices,
            status,
            steps,
            tau,
            ..
        } = sweep;
        slices.reverse();
        debug!(
            steps,
            nodes = field.grid().len(),
            completed,
            remaining = cfg.maturity - tau,
            "solve finished"
        );
        Ok(Solution {
            field,
            surface: PriceSurface::from_slices(slices),
            refinement: status,
            completed,
            steps,
        })
    }
}

/// Price one option with a fresh [`Solver`].
pub fn solve(config: &SolverConfig) -> Result<Solution> {
    Solver::new(config.clone())?.solve()
}

/// Times to maturity `k·T/(m+1)` for `k = 1..=m`.
fn checkpoint_times(maturity: Time, count: usize) -> Vec<Time> {
    let denom = (count + 1) as Real;
    (1..=count).map(|k| k as Real * maturity / denom).collect()
}

/// Mutable state of one backward sweep, in time to maturity `τ`.
struct Sweep<'a> {
    config: &'a SolverConfig,
    strategy: &'a dyn GridStrategy,
    cancel: Option<&'a AtomicBool>,
    integrator: TimeIntegrator,
    field: PriceField,
    checkpoints: Vec<Time>,
    next_checkpoint: usize,
    slices: Vec<TimeSlice>,
    status: RefinementStatus,
    tau: Time,
    steps: usize,
}

impl Sweep<'_> {
    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|c| c.load(Ordering::Relaxed))
    }

    fn record(&mut self) {
        self.slices.push(TimeSlice {
            time: (self.config.maturity - self.tau).max(0.0),
            grid: self.field.grid().clone(),
            values: self.field.values().to_vec(),
        });
    }

    fn finished(&self) -> bool {
        self.config.maturity - self.tau <= self.config.maturity * TIME_EPSILON
    }

    /// Bookkeeping after an accepted step: advance `τ`, store the slice,
    /// regrid at any checkpoint just reached.
    fn accept(&mut self, tau_next: Time) -> Result<()> {
        self.tau = tau_next;
        self.steps += 1;
        self.record();

        let eps = self.config.maturity * TIME_EPSILON;
        while self.next_checkpoint < self.checkpoints.len()
            && self.tau >= self.checkpoints[self.next_checkpoint] - eps
        {
            self.next_checkpoint += 1;
            if self.finished() {
                continue;
            }
            if let Some((grid, status)) = self.strategy.regrid(&self.field, self.config)? {
                self.status = self.status.merge(status);
                if !grid.is_same(self.field.grid()) {
                    debug!(
                        tau = self.tau,
                        from = self.field.grid().len(),
                        to = grid.len(),
                        "regrid at checkpoint"
                    );
                    self.field = self.field.reinterpolate(&grid)?;
                }
            }
        }
        Ok(())
    }

    fn run_fixed(&mut self, steps: usize) -> Result<bool> {
        let maturity = self.config.maturity;
        let dt = maturity / steps as Real;
        for k in 0..steps {
            if self.cancelled() {
                debug!(step = k, "solve cancelled");
                return Ok(false);
            }
            self.integrator.step(&mut self.field, self.tau, dt, k)?;
            let tau_next = if k + 1 == steps {
                maturity
            } else {
                (k + 1) as Real * dt
            };
            trace!(step = k, tau = tau_next, dt, "step accepted");
            self.accept(tau_next)?;
        }
        Ok(true)
    }

    fn run_adaptive(
        &mut self,
        initial_steps: usize,
        tolerance: Real,
        max_dt: Option<Time>,
    ) -> Result<bool> {
        let maturity = self.config.maturity;
        let max_dt = max_dt.map_or(maturity, |m| m.min(maturity));
        let min_dt = maturity * MIN_STEP_FRACTION;
        let mut dt = (maturity / initial_steps as Real).min(max_dt);

        while !self.finished() {
            if self.cancelled() {
                debug!(step = self.steps, "solve cancelled");
                return Ok(false);
            }

            let remaining = maturity - self.tau;
            let mut trial = dt.min(remaining);
            if let Some(&cp) = self.checkpoints.get(self.next_checkpoint) {
                if cp > self.tau {
                    trial = trial.min(cp - self.tau);
                }
            }
            if self.config.scheme == FdmScheme::Explicit {
                let bound = self.integrator.stability_bound(self.field.grid());
                trial = trial.min(bound);
            }

            let attempt = self
                .integrator
                .attempt(&self.field, self.tau, trial, self.steps)?;
            if attempt.error > tolerance {
                debug!(
                    step = self.steps,
                    dt = trial,
                    error = attempt.error,
                    "step rejected"
                );
                dt = 0.5 * trial;
                if dt < min_dt {
                    return Err(Error::StepSizeUnderflow {
                        time: remaining,
                        dt: trial,
                    });
                }
                continue;
            }

            self.field.values_mut().copy_from_slice(&attempt.values);
            let tau_next = if remaining - trial <= maturity * TIME_EPSILON {
                maturity
            } else {
                self.tau + trial
            };
            trace!(
                step = self.steps,
                tau = tau_next,
                dt = trial,
                error = attempt.error,
                "step accepted"
            );
            self.accept(tau_next)?;

            if trial >= dt && attempt.error < 0.25 * tolerance {
                dt = (2.0 * dt).min(max_dt);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finite_differences::RefinementConfig;
    use afd_core::OptionType;
    use approx::assert_abs_diff_eq;

    #[test]
    fn checkpoint_times_are_evenly_spaced() {
        let cps = checkpoint_times(1.0, 3);
        assert_eq!(cps.len(), 3);
        assert_abs_diff_eq!(cps[0], 0.25, epsilon = 1e-15);
        assert_abs_diff_eq!(cps[2], 0.75, epsilon = 1e-15);
        assert!(checkpoint_times(1.0, 0).is_empty());
    }

    #[test]
    fn invalid_config_is_rejected_before_solving() {
        let cfg = SolverConfig::default().with_market(0.05, -0.2);
        assert!(matches!(Solver::new(cfg), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn adaptive_strategy_rejects_unvalidated_threshold() {
        let mut cfg = SolverConfig::default().with_time_steps(5);
        cfg.refinement.threshold = -0.1;
        let solver = Solver::new(cfg).unwrap().with_strategy(AdaptiveGrid);
        assert!(matches!(solver.solve(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn uniform_solve_stores_every_step() {
        let cfg = SolverConfig::default().with_domain(200.0, 50).with_time_steps(20);
        let solution = solve(&cfg).unwrap();
        assert!(solution.is_complete());
        assert_eq!(solution.steps(), 20);
        assert_eq!(solution.surface().len(), 21);
        assert_eq!(solution.surface().final_slice().map(|s| s.time), Some(0.0));
        assert_eq!(solution.surface().terminal_slice().map(|s| s.time), Some(1.0));
        assert_eq!(solution.grid().len(), 51);
        assert!(solution.refinement_status().converged);
    }

    #[test]
    fn cancelled_before_start_keeps_only_the_payoff() {
        let solver = Solver::new(SolverConfig::default()).unwrap();
        let cancel = AtomicBool::new(true);
        let solution = solver.solve_cancellable(&cancel).unwrap();
        assert!(!solution.is_complete());
        assert_eq!(solution.steps(), 0);
        assert_eq!(solution.surface().len(), 1);
        let terminal = solution.surface().terminal_slice().unwrap();
        assert_eq!(terminal.time, 1.0);
        assert_eq!(solution.values(), terminal.values.as_slice());
    }

    #[test]
    fn checkpoints_regrid_mid_sweep() {
        let cfg = SolverConfig::default()
            .with_domain(200.0, 40)
            .with_time_steps(40)
            .with_refinement(RefinementConfig {
                checkpoints: 3,
                max_passes: 2,
                ..RefinementConfig::default()
            });
        let solution = solve(&cfg).unwrap();
        assert!(solution.is_complete());
        // first checkpoint at τ = 0.25 is step 10
        let before = &solution.surface().slices()[40 - 9];
        let after = &solution.surface().slices()[40 - 11];
        assert!(before.grid.len() >= 41);
        assert!(after.grid.len() >= before.grid.len());
        for slice in solution.surface().slices() {
            assert_eq!(slice.values.len(), slice.grid.len());
        }
    }

    #[test]
    fn adaptive_steps_reach_valuation_date() {
        let cfg = SolverConfig::new(OptionType::Put, 100.0, 0.5)
            .with_domain(200.0, 80)
            .with_adaptive_steps(10, 1e-3);
        let solution = solve(&cfg).unwrap();
        assert!(solution.is_complete());
        assert_eq!(solution.surface().final_slice().map(|s| s.time), Some(0.0));
        let times: Vec<Time> = solution.surface().slices().iter().map(|s| s.time).collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn custom_strategy_is_used() {
        #[derive(Debug)]
        struct Coarse;
        impl GridStrategy for Coarse {
            fn initial_grid(
                &self,
                _seed: &Grid,
                _config: &SolverConfig,
            ) -> Result<(Grid, RefinementStatus)> {
                Ok((Grid::uniform(200.0, 8)?, RefinementStatus::default()))
            }
            fn checkpoints(&self, _config: &SolverConfig) -> usize {
                0
            }
            fn regrid(
                &self,
                _field: &PriceField,
                _config: &SolverConfig,
            ) -> Result<Option<(Grid, RefinementStatus)>> {
                Ok(None)
            }
        }

        let solver = Solver::new(SolverConfig::default().with_time_steps(5))
            .unwrap()
            .with_strategy(Coarse);
        let solution = solver.solve().unwrap();
        assert_eq!(solution.grid().len(), 9);
    }

    #[test]
    fn l2_error_against_itself_is_zero() {
        let cfg = SolverConfig::default().with_domain(200.0, 20).with_time_steps(4);
        let solution = solve(&cfg).unwrap();
        let nodes = solution.grid().nodes().to_vec();
        let values = solution.values().to_vec();
        let err = solution.l2_error(|s| {
            let i = nodes.iter().position(|&x| x == s).unwrap();
            values[i]
        });
        assert_eq!(err, 0.0);
        assert!(solution.l2_error(|_| 0.0) > 0.0);
    }
}
