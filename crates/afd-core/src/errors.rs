//! Error types for adaptive-fd.
//!
//! Every fallible operation in the workspace returns [`Result`], built on a
//! single `thiserror`-derived enum.  Validation failures map to the
//! [`ensure!`](crate::ensure) and [`ensure_config!`](crate::ensure_config)
//! convenience macros defined here.

use thiserror::Error;

use crate::Real;

/// The top-level error type used throughout adaptive-fd.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A solver configuration was rejected before any computation started.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid argument passed to a numerical routine.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Precondition violated.
    #[error("precondition not satisfied: {0}")]
    Precondition(String),

    /// An explicit time step would exceed the scheme's stability limit.
    #[error("explicit step {step} with dt = {dt:e} exceeds the stability bound {bound:e}")]
    NumericalInstability {
        /// Index of the offending step, counted backward from maturity.
        step: usize,
        /// Requested step size.
        dt: Real,
        /// Largest admissible step size on the current grid.
        bound: Real,
    },

    /// The tridiagonal system has a (near-)zero pivot.
    #[error("singular tridiagonal system at node {node} (time step {step})")]
    SingularSystem {
        /// Row at which elimination broke down.
        node: usize,
        /// Time step during which the solve was attempted.
        step: usize,
    },

    /// Adaptive step control kept rejecting steps down to the minimum size.
    #[error("step size underflow at t = {time}: dt = {dt:e} still above tolerance")]
    StepSizeUnderflow {
        /// Calendar time at which the step was attempted.
        time: Real,
        /// Last rejected step size.
        dt: Real,
    },
}

impl Error {
    /// Attach the time-step index to a [`Error::SingularSystem`].
    ///
    /// Other variants pass through unchanged.
    pub fn at_step(self, step: usize) -> Self {
        match self {
            Error::SingularSystem { node, .. } => Error::SingularSystem { node, step },
            other => other,
        }
    }

    /// Return `true` if the error was raised by configuration validation.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::InvalidConfig(_))
    }
}

/// Shorthand `Result` type used throughout adaptive-fd.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Returns `Err(Error::Precondition(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use afd_core::{ensure, errors::Error};
/// fn positive(x: f64) -> afd_core::errors::Result<f64> {
///     ensure!(x > 0.0, "x must be positive, got {x}");
///     Ok(x)
/// }
/// assert!(positive(1.0).is_ok());
/// assert!(matches!(positive(-1.0), Err(Error::Precondition(_))));
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::Precondition(
                format!($($msg)*)
            ));
        }
    };
}

/// Returns `Err(Error::InvalidConfig(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use afd_core::{ensure_config, errors::Error};
/// fn domain(s_max: f64) -> afd_core::errors::Result<f64> {
///     ensure_config!(s_max > 0.0, "s_max must be positive, got {s_max}");
///     Ok(s_max)
/// }
/// assert!(domain(200.0).is_ok());
/// assert!(matches!(domain(0.0), Err(Error::InvalidConfig(_))));
/// ```
#[macro_export]
macro_rules! ensure_config {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::InvalidConfig(
                format!($($msg)*)
            ));
        }
    };
}

/// Returns `Err(Error::InvalidArgument(...))` immediately.
///
/// # Example
/// ```
/// use afd_core::{fail, errors::Error};
/// fn always_err() -> afd_core::errors::Result<()> {
///     fail!("spot {} outside the grid", 250.0);
/// }
/// assert!(matches!(always_err(), Err(Error::InvalidArgument(_))));
/// ```
#[macro_export]
macro_rules! fail {
    ($($msg:tt)*) => {
        return Err($crate::errors::Error::InvalidArgument(format!($($msg)*)))
    };
}
