use criterion::{AxisScale, BenchmarkId, Criterion, PlotConfiguration};
use rand::prelude::*;

use gravity_core::{
    BarnesHutConfig, BarnesHutGravity, BruteForceGravity, GravityEval, MultipoleOrder, ParticleSet,
    RayonScheduler, Vec3, ZeroKernel,
};

fn random_bodies(seed: u64, n: usize) -> (Vec<Vec3>, Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let positions = (0..n)
        .map(|_| Vec3::new(rng.gen_range(-5000.0..5000.0), rng.gen_range(-5000.0..5000.0), rng.gen_range(-5000.0..5000.0)))
        .collect();
    let masses = (0..n).map(|_| rng.gen_range(0.1..100.0)).collect();
    let h = vec![1.0; n];
    (positions, h, masses)
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut g = c.benchmark_group("gravity_core");
    g.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic))
        .warm_up_time(std::time::Duration::from_secs(2))
        .measurement_time(std::time::Duration::from_secs(4))
        .sample_size(30);

    let scheduler = RayonScheduler::new();
    let thetas = [0.3, 0.7];

    for i in (8..17).map(|p| 2usize.pow(p)) {
        let (positions, h, masses) = random_bodies(1808, i);
        let particles = ParticleSet::new(&positions, &h, &masses, 1.0).unwrap();

        g.bench_function(BenchmarkId::new("brute_force", i), |b| {
            b.iter(|| {
                let mut gravity = BruteForceGravity::new(ZeroKernel, 1.0);
                gravity.build(&scheduler, &particles);
                let mut out = vec![Vec3::ZERO; i];
                gravity.eval_self(&scheduler, &mut out);
                out
            })
        });

        for theta in thetas {
            let suffix = format!("barnes_hut::{theta}");
            let config = BarnesHutConfig { theta, order: MultipoleOrder::Octupole, ..BarnesHutConfig::default() };
            g.bench_function(BenchmarkId::new(suffix, i), |b| {
                b.iter(|| {
                    let mut gravity = BarnesHutGravity::new(config, ZeroKernel);
                    gravity.build(&scheduler, &particles);
                    let mut out = vec![Vec3::ZERO; i];
                    gravity.eval_self(&scheduler, &mut out);
                    out
                })
            });
        }
    }

    g.finish();
}

criterion::criterion_group!(benches, criterion_benchmark);
criterion::criterion_main!(benches);
