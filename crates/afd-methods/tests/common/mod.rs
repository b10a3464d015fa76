//! Shared helpers for the integration tests.

#![allow(dead_code)]

use afd_methods::OptionType;
use statrs::distribution::{ContinuousCDF, Normal};

/// Closed-form Black-Scholes price of a European option.
pub fn black_scholes(
    option_type: OptionType,
    spot: f64,
    strike: f64,
    rate: f64,
    vol: f64,
    maturity: f64,
) -> f64 {
    let discount = (-rate * maturity).exp();
    if spot <= 0.0 {
        return match option_type {
            OptionType::Call => 0.0,
            OptionType::Put => strike * discount,
        };
    }
    let n = Normal::new(0.0, 1.0).unwrap();
    let sd = vol * maturity.sqrt();
    let d1 = ((spot / strike).ln() + (rate + 0.5 * vol * vol) * maturity) / sd;
    let d2 = d1 - sd;
    match option_type {
        OptionType::Call => spot * n.cdf(d1) - strike * discount * n.cdf(d2),
        OptionType::Put => strike * discount * n.cdf(-d2) - spot * n.cdf(-d1),
    }
}

/// Install a `RUST_LOG`-driven subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
