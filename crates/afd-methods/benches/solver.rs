use afd_methods::{FdmScheme, OptionType, RefinementConfig, Solver, SolverConfig};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

fn reference_call() -> SolverConfig {
    SolverConfig::new(OptionType::Call, 100.0, 1.0).with_market(0.05, 0.20)
}

fn bench_uniform_schemes(c: &mut Criterion) {
    let mut group = c.benchmark_group("uniform_200x200");
    for scheme in [FdmScheme::Implicit, FdmScheme::CrankNicolson] {
        let config = reference_call()
            .with_domain(200.0, 200)
            .with_time_steps(200)
            .with_scheme(scheme);
        let solver = Solver::new(config).expect("benchmark config should be valid");
        group.bench_function(BenchmarkId::from_parameter(format!("{scheme:?}")), |b| {
            b.iter(|| {
                let solution = solver.solve().expect("solve should succeed");
                black_box(solution.price_at(100.0))
            })
        });
    }
    group.finish();
}

fn bench_adaptive_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("adaptive_grid");
    for checkpoints in [0usize, 4] {
        let config = reference_call()
            .with_domain(200.0, 50)
            .with_time_steps(200)
            .with_refinement(RefinementConfig {
                checkpoints,
                ..RefinementConfig::default()
            });
        let solver = Solver::new(config).expect("benchmark config should be valid");
        group.bench_with_input(
            BenchmarkId::new("checkpoints", checkpoints),
            &solver,
            |b, solver| b.iter(|| black_box(solver.solve().expect("solve should succeed").steps())),
        );
    }
    group.finish();
}

fn bench_adaptive_time_steps(c: &mut Criterion) {
    let config = reference_call()
        .with_domain(200.0, 100)
        .with_adaptive_steps(20, 1e-4);
    let solver = Solver::new(config).expect("benchmark config should be valid");
    c.bench_function("adaptive_time_steps", |b| {
        b.iter(|| black_box(solver.solve().expect("solve should succeed").steps()))
    });
}

criterion_group!(
    solver_benches,
    bench_uniform_schemes,
    bench_adaptive_grid,
    bench_adaptive_time_steps
);
criterion_main!(solver_benches);
