//! Scenario 4 of spec.md §8: a body treated as an attractor against a
//! separate particle set must pull exactly as hard as it would if it were
//! folded into the same particle set and evaluated as plain self-gravity.

mod common;

use gravity_core::{
    Attractor, Attractors, BarnesHutConfig, BarnesHutGravity, GravityEval, MultipoleOrder, ParticleSet,
    SequentialScheduler, Vec3, ZeroKernel,
};

const THETA: f64 = 1e-9;

fn offset(positions: &[Vec3], by: Vec3) -> Vec<Vec3> {
    positions.iter().map(|p| *p + by).collect()
}

#[test]
fn attractor_interaction_matches_combined_particle_self_gravity() {
    let (positions_a, masses_a) = common::ball_with_total_mass(100, 1.0, 3e12, 11);
    let (positions_b_local, masses_b) = common::ball_with_total_mass(20, 0.2, 3e11, 22);
    let positions_b = offset(&positions_b_local, Vec3::new(50.0, 0.0, 0.0));

    let h_a = vec![1e-4; positions_a.len()];
    let h_b = vec![1e-4; positions_b.len()];

    // Mixed run: A is the particle set, B is a set of attractors.
    let particles_a = ParticleSet::new(&positions_a, &h_a, &masses_a, 1.0).unwrap();
    let config = BarnesHutConfig { theta: THETA, order: MultipoleOrder::Octupole, leaf_size: 1, ..BarnesHutConfig::default() };
    let mut gravity_a = BarnesHutGravity::new(config, ZeroKernel);
    gravity_a.build(&SequentialScheduler, &particles_a);

    let mut mixed_out = vec![Vec3::ZERO; positions_a.len()];
    gravity_a.eval_self(&SequentialScheduler, &mut mixed_out);

    let mut attractors: Vec<Attractor> = positions_b
        .iter()
        .zip(&masses_b)
        .map(|(&p, &m)| Attractor::new(p, m, 1e-4))
        .collect();
    let mut attractor_view = Attractors::new(&mut attractors);
    gravity_a.eval_attractors(&SequentialScheduler, &mut attractor_view, &mut mixed_out);

    // Combined run: all 120 bodies as one plain particle set (A first, then B).
    let mut combined_positions = positions_a.clone();
    combined_positions.extend_from_slice(&positions_b);
    let mut combined_masses = masses_a.clone();
    combined_masses.extend_from_slice(&masses_b);
    let combined_h = vec![1e-4; combined_positions.len()];

    let particles_combined = ParticleSet::new(&combined_positions, &combined_h, &combined_masses, 1.0).unwrap();
    let mut gravity_combined = BarnesHutGravity::new(config, ZeroKernel);
    gravity_combined.build(&SequentialScheduler, &particles_combined);
    let mut combined_out = vec![Vec3::ZERO; combined_positions.len()];
    gravity_combined.eval_self(&SequentialScheduler, &mut combined_out);

    for i in 0..positions_a.len() {
        let diff = (mixed_out[i] - combined_out[i]).length();
        let scale = combined_out[i].length().max(1e-300);
        assert!(diff / scale < 1e-6, "particle {i}: mixed={:?} combined={:?}", mixed_out[i], combined_out[i]);
    }
}
