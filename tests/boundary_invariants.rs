//! Covers spec.md §8 "Invariants" that aren't already exercised by one of the
//! six named concrete scenarios: boundary particle counts, build idempotence,
//! and self-exclusion at a particle's own position.

mod common;

use gravity_core::{
    BarnesHutConfig, BarnesHutGravity, BruteForceGravity, GravityEval, KdTree, KdTreeConfig, LutKernel, ParticleSet,
    SequentialScheduler, Vec3, ZeroKernel,
};

#[test]
fn brute_force_on_empty_particle_set_evaluates_to_nothing() {
    let positions: Vec<Vec3> = Vec::new();
    let masses: Vec<f64> = Vec::new();
    let h: Vec<f64> = Vec::new();
    let particles = ParticleSet::new(&positions, &h, &masses, 1.0).unwrap();

    let mut gravity = BruteForceGravity::new(ZeroKernel, 1.0);
    gravity.build(&SequentialScheduler, &particles);

    let mut out: Vec<Vec3> = Vec::new();
    let stats = gravity.eval_self(&SequentialScheduler, &mut out);
    assert!(out.is_empty());
    assert_eq!(stats.exact_nodes, 0);
}

#[test]
fn barnes_hut_on_empty_particle_set_evaluates_to_nothing() {
    let positions: Vec<Vec3> = Vec::new();
    let masses: Vec<f64> = Vec::new();
    let h: Vec<f64> = Vec::new();
    let particles = ParticleSet::new(&positions, &h, &masses, 1.0).unwrap();

    let config = BarnesHutConfig { theta: 0.5, leaf_size: 1, ..BarnesHutConfig::default() };
    let mut gravity = BarnesHutGravity::new(config, ZeroKernel);
    gravity.build(&SequentialScheduler, &particles);

    let mut out: Vec<Vec3> = Vec::new();
    let stats = gravity.eval_self(&SequentialScheduler, &mut out);
    assert!(out.is_empty());
    assert_eq!(stats.exact_nodes, 0);
    assert_eq!(stats.approximated_nodes, 0);
}

#[test]
fn brute_force_single_particle_has_zero_self_acceleration() {
    let positions = vec![Vec3::new(1.0, 2.0, 3.0)];
    let masses = vec![7.0];
    let h = vec![0.1];
    let particles = ParticleSet::new(&positions, &h, &masses, 1.0).unwrap();

    let mut gravity = BruteForceGravity::new(ZeroKernel, 1.0);
    gravity.build(&SequentialScheduler, &particles);

    let mut out = vec![Vec3::ZERO; 1];
    gravity.eval_self(&SequentialScheduler, &mut out);
    assert_eq!(out[0], Vec3::ZERO);
}

#[test]
fn barnes_hut_single_particle_has_zero_self_acceleration() {
    let positions = vec![Vec3::new(-4.0, 5.0, 6.0)];
    let masses = vec![3.0];
    let h = vec![0.1];
    let particles = ParticleSet::new(&positions, &h, &masses, 1.0).unwrap();

    let config = BarnesHutConfig { theta: 0.5, leaf_size: 1, ..BarnesHutConfig::default() };
    let mut gravity = BarnesHutGravity::new(config, ZeroKernel);
    gravity.build(&SequentialScheduler, &particles);

    let mut out = vec![Vec3::ZERO; 1];
    gravity.eval_self(&SequentialScheduler, &mut out);
    assert_eq!(out[0], Vec3::ZERO);
}

#[test]
fn kdtree_build_is_idempotent() {
    let (positions, _masses) = common::ball_with_total_mass(200, 1.0, 1.0, 7);
    let config = KdTreeConfig { leaf_size: 4, ..KdTreeConfig::default() };

    let first = KdTree::build(&SequentialScheduler, &positions, &config);
    let second = KdTree::build(&SequentialScheduler, &positions, &config);

    assert_eq!(first.nodes().len(), second.nodes().len());
    assert_eq!(first.indices(), second.indices());
    assert_eq!(first.root(), second.root());
    for (a, b) in first.nodes().iter().zip(second.nodes()) {
        assert_eq!(a, b);
    }
}

#[test]
fn barnes_hut_eval_self_is_idempotent_across_rebuilds() {
    let (positions, masses) = common::ball_with_total_mass(150, 1.0, 42.0, 13);
    let h = vec![1e-4; positions.len()];
    let particles = ParticleSet::new(&positions, &h, &masses, 1.0).unwrap();

    let config = BarnesHutConfig { theta: 0.5, leaf_size: 4, ..BarnesHutConfig::default() };

    let mut first = BarnesHutGravity::new(config, ZeroKernel);
    first.build(&SequentialScheduler, &particles);
    let mut first_out = vec![Vec3::ZERO; positions.len()];
    first.eval_self(&SequentialScheduler, &mut first_out);

    let mut second = BarnesHutGravity::new(config, ZeroKernel);
    second.build(&SequentialScheduler, &particles);
    let mut second_out = vec![Vec3::ZERO; positions.len()];
    second.eval_self(&SequentialScheduler, &mut second_out);

    for i in 0..positions.len() {
        assert_eq!(first_out[i], second_out[i]);
    }
}

/// Querying `eval_at` at a single particle's own exact position must not blow
/// up or include the particle's own (undefined) self-contribution. With the
/// default softened [`LutKernel`], `grad` at zero separation is exactly zero
/// (see `kernel.rs`'s `lut_kernel_finite_at_zero_separation`), so a lone
/// particle evaluated at its own position feels nothing.
#[test]
fn eval_at_own_position_excludes_self_with_softened_kernel() {
    let positions = vec![Vec3::new(2.0, -1.0, 0.5)];
    let masses = vec![9.0];
    let h = vec![1.0];
    let particles = ParticleSet::new(&positions, &h, &masses, 1.0).unwrap();

    let mut brute = BruteForceGravity::new(LutKernel::default_table(), 1.0);
    brute.build(&SequentialScheduler, &particles);
    assert_eq!(brute.eval_at(positions[0]), Vec3::ZERO);

    let config = BarnesHutConfig { theta: 0.5, leaf_size: 1, ..BarnesHutConfig::default() };
    let mut bh = BarnesHutGravity::new(config, LutKernel::default_table());
    bh.build(&SequentialScheduler, &particles);
    assert_eq!(bh.eval_at(positions[0]), Vec3::ZERO);
}

/// With several particles, evaluating at one particle's own position via the
/// public point-query interface must match summing contributions from every
/// *other* particle only, not the exact self-inclusive brute-force sum.
#[test]
fn eval_at_own_position_matches_sum_over_other_particles() {
    let positions = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(3.0, 0.0, 0.0),
        Vec3::new(0.0, 4.0, 0.0),
        Vec3::new(-2.0, -2.0, 1.0),
    ];
    let masses = vec![1.0, 2.0, 3.0, 4.0];
    let h = vec![1e-6; positions.len()];
    let particles = ParticleSet::new(&positions, &h, &masses, 1.0).unwrap();

    let kernel = LutKernel::default_table();
    let mut brute = BruteForceGravity::new(kernel, 1.0);
    brute.build(&SequentialScheduler, &particles);

    for i in 0..positions.len() {
        let mut expected = Vec3::ZERO;
        let probe_kernel = LutKernel::default_table();
        for j in 0..positions.len() {
            if i == j {
                continue;
            }
            expected += probe_kernel.grad(positions[j] - positions[i], h[j]) * masses[j];
        }
        let actual = brute.eval_at(positions[i]);
        assert!((actual - expected).length() < 1e-9, "particle {i}: actual={actual:?} expected={expected:?}");
    }
}
