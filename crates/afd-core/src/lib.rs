//! # afd-core
//!
//! Core types and error definitions for adaptive-fd.
//!
//! This crate provides the foundational building blocks shared across the
//! other crates in the workspace – numeric type aliases, the error
//! hierarchy with its validation macros, and the European option type.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Public modules ───────────────────────────────────────────────────────────

/// Error types and the `ensure!` / `ensure_config!` / `fail!` macros.
pub mod errors;

/// Call/put option type and terminal payoff.
pub mod option;

// ── Primitive type aliases ────────────────────────────────────────────────────

/// Floating-point type used throughout the library.
pub type Real = f64;

/// Alias used for array sizes / indices.
pub type Size = usize;

/// A rate expressed as a decimal (e.g. 0.05 = 5 %).
pub type Rate = Real;

/// A volatility level expressed as a decimal.
pub type Volatility = Real;

/// A time measurement in years.
pub type Time = Real;

// ── Re-exports for convenience ────────────────────────────────────────────────

pub use errors::{Error, Result};
pub use option::OptionType;
