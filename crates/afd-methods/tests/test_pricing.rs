//! Accuracy of the solver against closed-form Black-Scholes prices.

mod common;

use afd_methods::{
    solve, FdmScheme, OptionType, PriceInterpolation, RefinementConfig, SolverConfig,
};
use common::{black_scholes, init_tracing};

const K: f64 = 100.0;
const R: f64 = 0.05;
const SIGMA: f64 = 0.20;
const T: f64 = 1.0;

fn reference(option_type: OptionType) -> SolverConfig {
    SolverConfig::new(option_type, K, T)
        .with_market(R, SIGMA)
        .with_domain(200.0, 200)
}

fn assert_close(label: &str, price: f64, expected: f64, tol: f64) {
    assert!(
        (price - expected).abs() < tol,
        "{label}: fdm = {price:.6}, bs = {expected:.6}, tol = {tol}"
    );
}

#[test]
fn implicit_call_converges_to_black_scholes() {
    init_tracing();
    let cfg = reference(OptionType::Call).with_time_steps(1000);
    let solution = solve(&cfg).unwrap();
    let price = solution.price_at(100.0).unwrap();
    assert_close("implicit call", price, 10.4506, 0.05);
    let bs = black_scholes(OptionType::Call, 100.0, K, R, SIGMA, T);
    assert_close("implicit call vs statrs", price, bs, 0.05);
}

#[test]
fn crank_nicolson_with_damping() {
    let cfg = reference(OptionType::Put)
        .with_scheme(FdmScheme::CrankNicolson)
        .with_time_steps(200)
        .with_damping_steps(2);
    let solution = solve(&cfg).unwrap();
    for spot in [80.0, 100.0, 120.0] {
        let bs = black_scholes(OptionType::Put, spot, K, R, SIGMA, T);
        assert_close("cn put", solution.price_at(spot).unwrap(), bs, 0.05);
    }
}

#[test]
fn explicit_call_within_stability_bound() {
    // h = 2: bound = 0.5·4/(0.04·40000) = 1.25e-3
    let cfg = reference(OptionType::Call)
        .with_domain(200.0, 100)
        .with_scheme(FdmScheme::Explicit)
        .with_time_steps(1000);
    let solution = solve(&cfg).unwrap();
    let bs = black_scholes(OptionType::Call, 100.0, K, R, SIGMA, T);
    assert_close("explicit call", solution.price_at(100.0).unwrap(), bs, 0.1);
}

#[test]
fn adaptive_grid_call_is_accurate() {
    let cfg = reference(OptionType::Call)
        .with_domain(200.0, 100)
        .with_time_steps(1000)
        .with_refinement(RefinementConfig::default());
    let solution = solve(&cfg).unwrap();
    assert!(solution.grid().len() > 101);
    let bs = black_scholes(OptionType::Call, 100.0, K, R, SIGMA, T);
    assert_close("adaptive call", solution.price_at(100.0).unwrap(), bs, 0.1);
}

#[test]
fn adaptive_time_steps_are_accurate() {
    let cfg = reference(OptionType::Call).with_adaptive_steps(20, 1e-4);
    let solution = solve(&cfg).unwrap();
    assert!(solution.is_complete());
    let bs = black_scholes(OptionType::Call, 100.0, K, R, SIGMA, T);
    assert_close("adaptive dt call", solution.price_at(100.0).unwrap(), bs, 0.05);
}

#[test]
fn cubic_readout_between_nodes() {
    let cfg = reference(OptionType::Call).with_time_steps(500);
    let solution = solve(&cfg).unwrap();
    let spot = 101.3;
    let bs = black_scholes(OptionType::Call, spot, K, R, SIGMA, T);
    let cubic = solution.price_at_with(spot, PriceInterpolation::Cubic).unwrap();
    let linear = solution.price_at_with(spot, PriceInterpolation::Linear).unwrap();
    assert_close("cubic", cubic, bs, 0.05);
    assert_close("linear", linear, bs, 0.05);
    assert!(solution.price_at(250.0).is_err());
}

#[test]
fn put_call_parity_on_shared_grid() {
    let call = solve(&reference(OptionType::Call).with_time_steps(1000)).unwrap();
    let put = solve(&reference(OptionType::Put).with_time_steps(1000)).unwrap();
    assert_eq!(call.grid(), put.grid());
    let discount = K * (-R * T).exp();
    for ((&s, &c), &p) in call.grid().nodes().iter().zip(call.values()).zip(put.values()) {
        let parity = c - p - (s - discount);
        assert!(parity.abs() < 1e-3, "parity gap {parity:e} at S = {s}");
    }
}

#[test]
fn l2_error_against_closed_form() {
    let cfg = reference(OptionType::Put).with_time_steps(500);
    let solution = solve(&cfg).unwrap();
    let err = solution.l2_error(|s| black_scholes(OptionType::Put, s, K, R, SIGMA, T));
    assert!(err < 0.05, "l2 error {err}");
}
