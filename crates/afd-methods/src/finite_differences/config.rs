//! Solver configuration.
//!
//! [`SolverConfig`] is an immutable value handed to the solver; nothing is
//! read from process-wide state. `Default` gives the reference case
//! `K = 100, r = 5%, σ = 20%, T = 1, S_max = 200` on a 100-interval uniform
//! grid with 200 implicit steps.

use afd_core::{ensure_config, errors::Result, OptionType, Rate, Real, Time, Volatility};

use super::grid::GridBuilder;
use super::FdmScheme;

/// Whether the spatial grid is refined around the strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GridMode {
    /// Fixed, equally spaced nodes.
    #[default]
    Uniform,
    /// Uniform seed grid refined by curvature.
    Adaptive,
}

/// Time-step selection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeStepping {
    /// `steps` equal steps from maturity to valuation.
    Fixed {
        /// Number of time steps.
        steps: usize,
    },
    /// Step-doubling error control.
    ///
    /// Each step is compared against two half steps; steps whose
    /// discrepancy exceeds `tolerance` are retried at half the size.
    Adaptive {
        /// The first trial step is `maturity / initial_steps`.
        initial_steps: usize,
        /// Maximum accepted absolute discrepancy per step.
        tolerance: Real,
        /// Upper bound on the step size; `None` means the maturity.
        max_dt: Option<Time>,
    },
}

impl Default for TimeStepping {
    fn default() -> Self {
        TimeStepping::Fixed { steps: 200 }
    }
}

/// Parameters of the curvature-driven refinement.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RefinementConfig {
    /// Nodes whose curvature exceeds this fraction of the grid maximum
    /// are flagged.
    pub threshold: Real,
    /// Maximum insertion passes per refinement call.
    pub max_passes: usize,
    /// Hard cap on the node count.
    pub max_nodes: usize,
    /// Edges shorter than twice this value are never split.
    /// `None` means `S_max × 1e-3`.
    pub min_spacing: Option<Real>,
    /// Number of evenly spaced times during the backward sweep at which the
    /// grid is re-refined against the current price field.
    pub checkpoints: usize,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            max_passes: 5,
            max_nodes: 2000,
            min_spacing: None,
            checkpoints: 0,
        }
    }
}

/// Full description of one pricing request.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig {
    /// Call or put.
    pub option_type: OptionType,
    /// Strike `K`.
    pub strike: Real,
    /// Risk-free rate `r` (continuous compounding).
    pub rate: Rate,
    /// Volatility `σ`.
    pub volatility: Volatility,
    /// Time to maturity `T` in years.
    pub maturity: Time,
    /// Upper edge of the price domain `S_max`.
    pub s_max: Real,
    /// Number of intervals of the initial uniform grid.
    pub initial_nodes: usize,
    /// Uniform or adaptive spatial grid.
    pub grid_mode: GridMode,
    /// Refinement parameters (ignored for [`GridMode::Uniform`]).
    pub refinement: RefinementConfig,
    /// Fixed or error-controlled time steps.
    pub time_stepping: TimeStepping,
    /// Time-stepping scheme.
    pub scheme: FdmScheme,
    /// Explicit scheme requires `dt ≤ C·min(h)²/(σ²·S_max²)`; this is `C`.
    pub stability_constant: Real,
    /// Crank-Nicolson only: number of initial steps replaced by two implicit
    /// half steps.
    pub damping_steps: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            option_type: OptionType::Call,
            strike: 100.0,
            rate: 0.05,
            volatility: 0.20,
            maturity: 1.0,
            s_max: 200.0,
            initial_nodes: 100,
            grid_mode: GridMode::Uniform,
            refinement: RefinementConfig::default(),
            time_stepping: TimeStepping::default(),
            scheme: FdmScheme::Implicit,
            stability_constant: 0.5,
            damping_steps: 0,
        }
    }
}

impl SolverConfig {
    /// Start from the defaults with the given contract terms.
    pub fn new(option_type: OptionType, strike: Real, maturity: Time) -> Self {
        Self {
            option_type,
            strike,
            maturity,
            ..Self::default()
        }
    }

    /// Set rate and volatility.
    pub fn with_market(mut self, rate: Rate, volatility: Volatility) -> Self {
        self.rate = rate;
        self.volatility = volatility;
        self
    }

    /// Set the price domain `[0, s_max]` and the initial interval count.
    pub fn with_domain(mut self, s_max: Real, initial_nodes: usize) -> Self {
        self.s_max = s_max;
        self.initial_nodes = initial_nodes;
        self
    }

    /// Set the time-stepping scheme.
    pub fn with_scheme(mut self, scheme: FdmScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Use `steps` fixed time steps.
    pub fn with_time_steps(mut self, steps: usize) -> Self {
        self.time_stepping = TimeStepping::Fixed { steps };
        self
    }

    /// Use error-controlled time steps.
    pub fn with_adaptive_steps(mut self, initial_steps: usize, tolerance: Real) -> Self {
        self.time_stepping = TimeStepping::Adaptive {
            initial_steps,
            tolerance,
            max_dt: None,
        };
        self
    }

    /// Switch to an adaptive grid with the given refinement parameters.
    pub fn with_refinement(mut self, refinement: RefinementConfig) -> Self {
        self.grid_mode = GridMode::Adaptive;
        self.refinement = refinement;
        self
    }

    /// Set the explicit-scheme stability constant `C`.
    pub fn with_stability_constant(mut self, c: Real) -> Self {
        self.stability_constant = c;
        self
    }

    /// Set the number of Crank-Nicolson damping steps.
    pub fn with_damping_steps(mut self, steps: usize) -> Self {
        self.damping_steps = steps;
        self
    }

    /// Effective refinement floor on edge length.
    pub fn min_spacing(&self) -> Real {
        self.refinement.min_spacing.unwrap_or(self.s_max * 1e-3)
    }

    /// Check every parameter before any computation starts.
    ///
    /// # Errors
    /// [`afd_core::Error::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        GridBuilder::check(self)?;
        ensure_config!(
            self.volatility.is_finite() && self.volatility > 0.0,
            "volatility must be positive, got {}",
            self.volatility
        );
        ensure_config!(
            self.maturity.is_finite() && self.maturity > 0.0,
            "maturity must be positive, got {}",
            self.maturity
        );
        ensure_config!(self.rate.is_finite(), "rate must be finite, got {}", self.rate);
        ensure_config!(
            self.stability_constant > 0.0 && self.stability_constant < 1.0,
            "stability constant must lie in (0, 1), got {}",
            self.stability_constant
        );

        match self.time_stepping {
            TimeStepping::Fixed { steps } => {
                ensure_config!(steps >= 1, "at least one time step is required");
            }
            TimeStepping::Adaptive {
                initial_steps,
                tolerance,
                max_dt,
            } => {
                ensure_config!(initial_steps >= 1, "initial_steps must be at least 1");
                ensure_config!(
                    tolerance.is_finite() && tolerance > 0.0,
                    "step tolerance must be positive, got {tolerance}"
                );
                if let Some(max_dt) = max_dt {
                    ensure_config!(
                        max_dt.is_finite() && max_dt > 0.0,
                        "max_dt must be positive, got {max_dt}"
                    );
                }
            }
        }

        ensure_config!(
            self.initial_nodes < self.refinement.max_nodes,
            "initial grid has {} nodes, above max_nodes ({})",
            self.initial_nodes + 1,
            self.refinement.max_nodes
        );

        if self.grid_mode == GridMode::Adaptive {
            let r = &self.refinement;
            ensure_config!(
                r.threshold > 0.0 && r.threshold < 1.0,
                "refinement threshold must lie in (0, 1), got {}",
                r.threshold
            );
            let min_spacing = self.min_spacing();
            ensure_config!(
                min_spacing.is_finite() && min_spacing > 0.0,
                "min_spacing must be positive, got {min_spacing}"
            );
        }
        Ok(())
    }
}
