//! # adaptive-fd
//!
//! Adaptive finite-difference solver for the Black-Scholes PDE.
//!
//! This crate is a **façade** that re-exports all public items from the
//! underlying workspace crates. Application code should depend on this
//! crate rather than the individual `afd-*` crates.
//!
//! ## Quick start
//!
//! ```toml
//! [dependencies]
//! adaptive-fd = "0.1"
//! ```
//!
//! ```rust
//! use adaptive_fd::methods::{OptionType, RefinementConfig, SolverConfig};
//!
//! let config = SolverConfig::new(OptionType::Put, 100.0, 1.0)
//!     .with_domain(200.0, 50)
//!     .with_refinement(RefinementConfig::default());
//! let solution = adaptive_fd::methods::solve(&config).unwrap();
//!
//! let price = solution.price_at(100.0).unwrap();
//! assert!(price > 5.0 && price < 6.5);
//! assert!(solution.grid().density(98.0, 102.0) > solution.grid().density(0.0, 50.0));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Core types, aliases, and error definitions.
pub use afd_core as core;

/// Mathematical utilities: interpolation, tridiagonal systems.
pub use afd_math as math;

/// Finite-difference grids, schemes and the solver.
pub use afd_methods as methods;
