//! Dirichlet boundary values for European options.
//!
//! With `τ = T − t` the remaining time to maturity:
//!
//! | option | `V(0, τ)`     | `V(S_max, τ)`       |
//! |--------|---------------|---------------------|
//! | call   | `0`           | `S_max − K e^{−rτ}` |
//! | put    | `K e^{−rτ}`   | `0`                 |

use afd_core::{OptionType, Rate, Real, Time};

use super::config::SolverConfig;

/// Edge values of the price field as functions of `τ`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryConditions {
    option_type: OptionType,
    strike: Real,
    rate: Rate,
    s_max: Real,
}

impl BoundaryConditions {
    /// Boundary conditions for a European option on `[0, s_max]`.
    pub fn new(option_type: OptionType, strike: Real, rate: Rate, s_max: Real) -> Self {
        Self {
            option_type,
            strike,
            rate,
            s_max,
        }
    }

    /// Boundary conditions for the contract described by `config`.
    pub fn from_config(config: &SolverConfig) -> Self {
        Self::new(config.option_type, config.strike, config.rate, config.s_max)
    }

    /// Value at `S = 0`.
    pub fn lower(&self, tau: Time) -> Real {
        match self.option_type {
            OptionType::Call => 0.0,
            OptionType::Put => self.strike * (-self.rate * tau).exp(),
        }
    }

    /// Value at `S = S_max`.
    pub fn upper(&self, tau: Time) -> Real {
        match self.option_type {
            OptionType::Call => self.s_max - self.strike * (-self.rate * tau).exp(),
            OptionType::Put => 0.0,
        }
    }

    /// `(lower, upper)` at `τ`.
    pub fn values(&self, tau: Time) -> (Real, Real) {
        (self.lower(tau), self.upper(tau))
    }

    /// Overwrite the two edge entries of `values`.
    pub fn apply(&self, values: &mut [Real], tau: Time) {
        let (lo, hi) = self.values(tau);
        let n = values.len();
        values[0] = lo;
        values[n - 1] = hi;
    }
}
