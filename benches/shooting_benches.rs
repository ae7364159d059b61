use SchrodingerShooting::Examples::schrodinger_examples::schrodinger_examples;
use SchrodingerShooting::numerical::NonStiff_api::{IVPOptions, IntegrationMethod};
use SchrodingerShooting::numerical::ShootingBVP::Shooting_eigen::{
    BoundaryValueProblem, ShootingMethodSolver,
};
use SchrodingerShooting::numerical::Schrodinger::potential::PotentialParams;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_fixed_energy(c: &mut Criterion) {
    c.bench_function("fixed energy example", |b| {
        b.iter(|| schrodinger_examples(black_box(0), None))
    });
}

fn bench_residual(c: &mut Criterion) {
    let mut group = c.benchmark_group("shooting residual");
    for method in [IntegrationMethod::DOPRI5, IntegrationMethod::RK4] {
        let mut solver =
            ShootingMethodSolver::new(PotentialParams::default(), BoundaryValueProblem::default());
        solver.ivp_options = IVPOptions::with_method(method);
        group.bench_function(format!("{:?}", method), |b| {
            b.iter(|| solver.residual(black_box(1.5)))
        });
    }
    group.finish();
}

fn bench_shooting_short_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("shooting search");
    group.sample_size(10);
    group.bench_function("50 iterations", |b| {
        b.iter(|| {
            let mut solver = ShootingMethodSolver::new(
                PotentialParams::default(),
                BoundaryValueProblem::default(),
            );
            solver.config.max_iterations = 50;
            solver.solve()
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_fixed_energy,
    bench_residual,
    bench_shooting_short_search
);
criterion_main!(benches);
