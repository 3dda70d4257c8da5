//! Integration tests for deform-solver.

use std::collections::BTreeMap;

use approx::assert_relative_eq;
use glam::Vec3;

use deform_contact::{Floor, Sphere};
use deform_math::{AccelerationOrder, LinearSolverKind};
use deform_mesh::generators::{quad_grid, tet_box};
use deform_mesh::DeformableMesh;
use deform_solver::assembly::{inertia_rhs, layout_blocks};
use deform_solver::{ExternalForces, Solver, SolverConfig, SolverState, StaleReason};
use deform_telemetry::{EventBus, EventKind, VecSink};
use deform_types::constants::{COLLISION_EPSILON, DEFAULT_DT, GRAVITY};
use deform_types::{ColliderId, DeformError, ObjectId};

fn gravity() -> Vec3 {
    Vec3::new(0.0, -GRAVITY, 0.0)
}

fn triangle(id: i32, lift: f32) -> DeformableMesh {
    DeformableMesh::from_triangles(
        vec![
            Vec3::new(0.0, lift, 0.0),
            Vec3::new(1.0, lift, 0.0),
            Vec3::new(0.0, lift, 1.0),
        ],
        vec![[0, 1, 2]],
        ObjectId(id),
    )
    .unwrap()
}

/// 4×4 vertex cloth with edge strain, pinned at the two top corners.
fn hanging_cloth(id: i32) -> DeformableMesh {
    let mut cloth = quad_grid(3, 3, 1.0, 1.0).into_mesh(ObjectId(id)).unwrap();
    cloth.set_edge_strain_constraints(100.0).unwrap();
    cloth.toggle_vertices_fixed([0, 3], 1.0e5).unwrap();
    cloth
}

fn solver_with(kind: LinearSolverKind, mesh: DeformableMesh) -> Solver {
    let config = SolverConfig {
        linear_solver: kind,
        ..Default::default()
    };
    let mut solver = Solver::new(config).unwrap();
    solver.add_model(mesh);
    solver
}

// ─── SolverConfig Tests ───────────────────────────────────────

#[test]
fn config_default() {
    let config = SolverConfig::default();
    assert_eq!(config.dt, DEFAULT_DT);
    assert_eq!(config.iterations, 10);
    assert_eq!(config.inner_iterations, 10);
    assert_eq!(config.linear_solver, LinearSolverKind::CholeskyDirect);
    assert!(!config.use_gpu_for_local_step);
    assert!(config.validate().is_ok());
}

#[test]
fn config_presets() {
    let debug = SolverConfig::debug();
    assert_eq!(debug.iterations, 3);
    assert_eq!(debug.linear_solver, LinearSolverKind::ParallelJacobi);

    let hq = SolverConfig::high_quality();
    assert!(hq.iterations > SolverConfig::default().iterations);
    assert_eq!(
        hq.linear_solver,
        LinearSolverKind::AJacobi(AccelerationOrder::Three)
    );
    assert!(hq.validate().is_ok());
}

#[test]
fn config_validation() {
    for dt in [0.0, -0.01, f32::NAN, f32::INFINITY] {
        let config = SolverConfig {
            dt,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DeformError::InvalidConfig(_))));
    }

    let no_sweeps = SolverConfig {
        linear_solver: LinearSolverKind::ParallelJacobi,
        inner_iterations: 0,
        ..Default::default()
    };
    assert!(matches!(
        Solver::new(no_sweeps),
        Err(DeformError::InvalidConfig(_))
    ));

    // The direct solver ignores the sweep budget.
    let direct = SolverConfig {
        inner_iterations: 0,
        ..Default::default()
    };
    assert!(direct.validate().is_ok());
}

#[test]
fn config_serialization() {
    let config = SolverConfig::high_quality();
    let json = serde_json::to_string(&config).unwrap();
    let back: SolverConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

// ─── Assembly Tests ───────────────────────────────────────────

#[test]
fn blocks_follow_id_order() {
    let mut models = BTreeMap::new();
    models.insert(ObjectId(7), triangle(7, 0.0));
    models.insert(ObjectId(-2), hanging_cloth(-2));

    let (blocks, total) = layout_blocks(&models);
    assert_eq!(total, 16 + 3);
    assert_eq!(blocks[0].id, ObjectId(-2));
    assert_eq!(blocks[0].range(), 0..16);
    assert_eq!(blocks[1].id, ObjectId(7));
    assert_eq!(blocks[1].range(), 16..19);
}

#[test]
fn system_matrix_entries() {
    let dt = 0.1;
    let mut mesh = triangle(0, 0.0);
    mesh.set_edge_strain_constraints(4.0).unwrap();
    mesh.toggle_vertices_fixed([2], 10.0).unwrap();
    mesh.apply_mass_per_vertex(2.0).unwrap();

    let mut solver = Solver::new(SolverConfig {
        dt,
        ..Default::default()
    })
    .unwrap();
    solver.add_model(mesh);
    solver.precompute_a().unwrap();
    assert_eq!(solver.state(), SolverState::MatrixAssembled);

    let a = solver.system_matrix().unwrap();
    assert_eq!((a.rows, a.cols), (3, 3));
    let mass_term = 2.0 / (dt * dt);
    // Every vertex touches two edges; vertex 2 is also pinned.
    assert_relative_eq!(a.get(0, 0), mass_term + 8.0, epsilon = 1e-3);
    assert_relative_eq!(a.get(2, 2), mass_term + 8.0 + 10.0, epsilon = 1e-3);
    assert_relative_eq!(a.get(0, 1), -4.0);
    assert_relative_eq!(a.get(1, 0), -4.0);
}

#[test]
fn inertia_term_scales_with_mass() {
    let rhs = inertia_rhs(&[1.0, 2.0], &[Vec3::X, Vec3::Y], 0.5);
    assert_eq!(rhs, vec![Vec3::new(4.0, 0.0, 0.0), Vec3::new(0.0, 8.0, 0.0)]);
}

// ─── Lifecycle Tests ──────────────────────────────────────────

#[test]
fn precompute_without_models_fails() {
    let mut solver = Solver::new(SolverConfig::default()).unwrap();
    assert_eq!(solver.state(), SolverState::Uninitialized);
    assert!(matches!(solver.precompute(), Err(DeformError::InvalidConfig(_))));
    assert!(matches!(
        solver.step(&ExternalForces::new(), 1, 1),
        Err(DeformError::InvalidConfig(_))
    ));
}

#[test]
fn precompute_reaches_ready_state() {
    let mut solver = solver_with(LinearSolverKind::CholeskyDirect, hanging_cloth(0));
    solver.precompute().unwrap();
    assert_eq!(solver.state(), SolverState::Precomputed);
    assert!(solver.last_precomputation_time() >= 0.0);
    assert_eq!(solver.local_step_executor(), "cpu_rayon");
}

#[test]
fn switching_solver_marks_stale_then_step_reprecomputes() {
    let mut solver = solver_with(LinearSolverKind::CholeskyDirect, hanging_cloth(0));
    solver.precompute().unwrap();

    solver.set_solver(LinearSolverKind::ParallelJacobi);
    assert_eq!(solver.linear_solver_kind(), LinearSolverKind::ParallelJacobi);
    assert_eq!(
        solver.state(),
        SolverState::Stale(StaleReason::AlgorithmChanged)
    );

    let report = solver.step(&ExternalForces::new(), 2, 5).unwrap();
    assert!(report.reprecomputed);
    assert_eq!(solver.state(), SolverState::Precomputed);

    // Ready now: the next step does not precompute.
    let report = solver.step(&ExternalForces::new(), 2, 5).unwrap();
    assert!(!report.reprecomputed);
}

#[test]
fn selecting_same_solver_keeps_state() {
    let mut solver = solver_with(LinearSolverKind::CholeskyDirect, hanging_cloth(0));
    solver.precompute().unwrap();
    solver.set_solver(LinearSolverKind::CholeskyDirect);
    assert_eq!(solver.state(), SolverState::Precomputed);
}

#[test]
fn mesh_mutation_marks_stale() {
    let mut solver = solver_with(LinearSolverKind::CholeskyDirect, hanging_cloth(0));
    solver.precompute().unwrap();

    // Moving vertices does not change A.
    let moved: Vec<Vec3> = solver
        .model(ObjectId(0))
        .unwrap()
        .positions()
        .iter()
        .map(|p| *p + Vec3::Z)
        .collect();
    solver.model_mut(ObjectId(0)).unwrap().set_positions(moved).unwrap();
    assert_eq!(solver.state(), SolverState::Precomputed);

    solver.toggle_vertices_fixed(ObjectId(0), [15], 50.0).unwrap();
    assert_eq!(solver.state(), SolverState::Stale(StaleReason::ModelsChanged));

    solver.precompute().unwrap();
    solver.apply_mass_per_vertex(ObjectId(0), 3.0).unwrap();
    assert_eq!(solver.state(), SolverState::Stale(StaleReason::ModelsChanged));
}

#[test]
fn adding_and_removing_models_marks_stale() {
    let mut solver = solver_with(LinearSolverKind::CholeskyDirect, hanging_cloth(0));
    solver.precompute().unwrap();

    assert!(solver.add_model(triangle(1, 2.0)).is_none());
    assert_eq!(solver.state(), SolverState::Stale(StaleReason::ModelsChanged));

    solver.precompute().unwrap();
    let removed = solver.remove_model(ObjectId(1)).unwrap();
    assert_eq!(removed.id(), ObjectId(1));
    assert_eq!(solver.state(), SolverState::Stale(StaleReason::ModelsChanged));

    assert!(matches!(
        solver.remove_model(ObjectId(1)),
        Err(DeformError::UnknownObject(ObjectId(1)))
    ));
}

#[test]
fn timestep_change_marks_stale() {
    let mut solver = solver_with(LinearSolverKind::CholeskyDirect, triangle(0, 0.0));
    solver.precompute().unwrap();

    solver.set_dt(DEFAULT_DT).unwrap();
    assert_eq!(solver.state(), SolverState::Precomputed);

    solver.set_dt(0.005).unwrap();
    assert_eq!(solver.dt(), 0.005);
    assert_eq!(solver.state(), SolverState::Stale(StaleReason::TimestepChanged));

    assert!(matches!(solver.set_dt(0.0), Err(DeformError::InvalidConfig(_))));
    assert_eq!(solver.dt(), 0.005);
}

#[test]
fn clear_solver_returns_to_uninitialized() {
    let mut solver = solver_with(LinearSolverKind::ParallelJacobi, hanging_cloth(0));
    solver.precompute().unwrap();
    solver.clear_solver();
    assert_eq!(solver.state(), SolverState::Uninitialized);
    assert!(solver.system_matrix().is_none());

    let report = solver.step(&ExternalForces::new(), 1, 5).unwrap();
    assert!(report.reprecomputed);
}

#[test]
fn state_display() {
    assert_eq!(SolverState::Precomputed.to_string(), "precomputed");
    assert_eq!(
        SolverState::Stale(StaleReason::TimestepChanged).to_string(),
        "stale (TimestepChanged)"
    );
}

// ─── Step Tests ───────────────────────────────────────────────

#[test]
fn free_fall_matches_explicit_prediction() {
    let mut solver = solver_with(LinearSolverKind::CholeskyDirect, triangle(0, 5.0));
    let dt = solver.dt();
    let forces = solver.gravity_forces(gravity());

    let report = solver.step(&forces, 5, 1).unwrap();
    assert_eq!(report.iterations, 5);
    assert_eq!(report.collisions, 0);
    assert_eq!(solver.step_count(), 1);

    let mesh = solver.model(ObjectId(0)).unwrap();
    for (p, p0) in mesh.positions().iter().zip(mesh.rest_positions()) {
        assert_relative_eq!(p.y, p0.y - GRAVITY * dt * dt, epsilon = 1e-4);
        assert_relative_eq!(p.x, p0.x, epsilon = 1e-5);
    }
    for v in mesh.velocities() {
        assert_relative_eq!(v.y, -GRAVITY * dt, epsilon = 1e-3);
    }
}

fn solver_with_dt(kind: LinearSolverKind, dt: f32, mesh: DeformableMesh) -> Solver {
    let mut solver = solver_with(kind, mesh);
    solver.set_dt(dt).unwrap();
    solver
}

#[test]
fn free_fall_every_strategy() {
    let dt = 0.01;
    for kind in LinearSolverKind::ALL {
        let mut mesh = triangle(0, 5.0);
        mesh.apply_mass_per_vertex(0.37).unwrap();
        let mut solver = solver_with_dt(kind, dt, mesh);
        let forces = solver.gravity_forces(gravity());

        solver
            .step(&forces, 5, 10)
            .unwrap_or_else(|e| panic!("{}: {e}", kind.name()));

        let mesh = solver.model(ObjectId(0)).unwrap();
        for (p, p0) in mesh.positions().iter().zip(mesh.rest_positions()) {
            assert_relative_eq!(p.y, p0.y - GRAVITY * dt * dt, epsilon = 1e-4);
        }
        for v in mesh.velocities() {
            assert_relative_eq!(v.y, -GRAVITY * dt, epsilon = 1e-2);
        }
    }
}

#[test]
fn resting_body_without_forces_every_strategy() {
    for kind in LinearSolverKind::ALL {
        for k in 0..12 {
            let mass = 0.37 + 0.05 * k as f32;
            let mut mesh = triangle(0, 1.0);
            mesh.apply_mass_per_vertex(mass).unwrap();
            let mut solver = solver_with_dt(kind, 0.01, mesh);

            for _ in 0..3 {
                solver
                    .step(&ExternalForces::new(), 5, 10)
                    .unwrap_or_else(|e| panic!("{} mass={mass}: {e}", kind.name()));
            }

            let mesh = solver.model(ObjectId(0)).unwrap();
            for (p, p0) in mesh.positions().iter().zip(mesh.rest_positions()) {
                assert!(p.distance(*p0) < 1e-5, "{} drifted to {p:?}", kind.name());
            }
            assert!(mesh.velocities().iter().all(|v| v.length() < 1e-3));
        }
    }
}

#[test]
fn constrained_cloth_at_rest_stays_put_every_strategy() {
    for kind in LinearSolverKind::ALL {
        let mut cloth = hanging_cloth(0);
        cloth.apply_mass_per_vertex(0.6).unwrap();
        let mut solver = solver_with_dt(kind, 0.01, cloth);

        for _ in 0..3 {
            solver
                .step(&ExternalForces::new(), 4, 10)
                .unwrap_or_else(|e| panic!("{}: {e}", kind.name()));
        }

        let mesh = solver.model(ObjectId(0)).unwrap();
        for (p, p0) in mesh.positions().iter().zip(mesh.rest_positions()) {
            assert!(p.distance(*p0) < 1e-4, "{} drifted to {p:?}", kind.name());
        }
    }
}

#[test]
fn zero_iterations_keep_prediction() {
    let mut solver = solver_with(LinearSolverKind::CholeskyDirect, hanging_cloth(0));
    let dt = solver.dt();
    solver
        .model_mut(ObjectId(0))
        .unwrap()
        .set_velocities(vec![Vec3::X; 16])
        .unwrap();
    let before = solver.model(ObjectId(0)).unwrap().positions().to_vec();

    solver.step(&ExternalForces::new(), 0, 0).unwrap();

    let mesh = solver.model(ObjectId(0)).unwrap();
    for (p, b) in mesh.positions().iter().zip(&before) {
        assert_relative_eq!(p.x, b.x + dt, epsilon = 1e-5);
    }
}

#[test]
fn pinned_cloth_hangs() {
    let mut solver = solver_with(LinearSolverKind::CholeskyDirect, hanging_cloth(0));
    let forces = solver.gravity_forces(gravity());
    for _ in 0..30 {
        solver.advance(&forces).unwrap();
    }

    let mesh = solver.model(ObjectId(0)).unwrap();
    for &pinned in &[0usize, 3] {
        let drift = mesh.positions()[pinned].distance(mesh.rest_positions()[pinned]);
        assert!(drift < 0.05, "pinned vertex {pinned} drifted {drift}");
    }
    for free in 12..16 {
        assert!(mesh.positions()[free].y < mesh.rest_positions()[free].y);
    }
    assert!(mesh.positions().iter().all(|p| p.is_finite()));
}

#[test]
fn floor_correction_after_step() {
    let mut solver = solver_with(LinearSolverKind::CholeskyDirect, triangle(0, 0.005));
    let dt = solver.dt();
    solver.add_collider(ColliderId(0), Box::new(Floor::new(0.0)));

    let forces = solver.gravity_forces(gravity());
    let report = solver.step(&forces, 3, 1).unwrap();
    assert_eq!(report.collisions, 3);

    let mesh = solver.model(ObjectId(0)).unwrap();
    for (p, v) in mesh.positions().iter().zip(mesh.velocities()) {
        assert_relative_eq!(p.y, COLLISION_EPSILON, epsilon = 1e-6);
        // Velocity is derived from the corrected position.
        assert_relative_eq!(v.y, (COLLISION_EPSILON - 0.005) / dt, epsilon = 1e-3);
    }
}

#[test]
fn solid_rests_on_floor() {
    let solid = {
        let mut m = tet_box(1, 1, 1, Vec3::new(0.0, 0.5, 0.0), Vec3::ONE)
            .into_mesh(ObjectId(0))
            .unwrap();
        m.set_edge_strain_constraints(500.0).unwrap();
        m
    };
    let mut solver = solver_with(LinearSolverKind::CholeskyDirect, solid);
    solver.add_collider(ColliderId(0), Box::new(Floor::new(0.0)));

    let forces = solver.gravity_forces(gravity());
    for _ in 0..120 {
        solver.advance(&forces).unwrap();
    }

    let mesh = solver.model(ObjectId(0)).unwrap();
    assert!(mesh.positions().iter().all(|p| p.y >= COLLISION_EPSILON - 1e-5));
    let lowest = mesh.positions().iter().map(|p| p.y).fold(f32::MAX, f32::min);
    assert!(lowest < 0.1, "solid never reached the floor: {lowest}");
}

#[test]
fn colliders_compose_in_registration_order() {
    let mut solver = solver_with(LinearSolverKind::CholeskyDirect, triangle(0, 0.0));
    solver.add_collider(ColliderId(1), Box::new(Floor::new(0.0)));
    solver.add_collider(ColliderId(2), Box::new(Sphere::new(Vec3::ZERO, 0.5)));
    assert_eq!(solver.colliders().len(), 2);

    solver.step(&ExternalForces::new(), 1, 1).unwrap();
    // Vertex 0 sits at the sphere center; the floor lifts it first, then
    // the sphere pushes it out along +Y.
    let p = solver.model(ObjectId(0)).unwrap().positions()[0];
    assert_relative_eq!(p.y, 0.5 + COLLISION_EPSILON, epsilon = 1e-4);

    assert!(solver.remove_collider(ColliderId(2)).is_some());
    assert!(solver.remove_collider(ColliderId(2)).is_none());
    assert_eq!(solver.colliders().len(), 1);
}

#[test]
fn all_strategies_agree() {
    let forces = {
        let solver = solver_with(LinearSolverKind::CholeskyDirect, hanging_cloth(0));
        solver.gravity_forces(gravity())
    };

    let run = |kind: LinearSolverKind| {
        let mut solver = solver_with(kind, hanging_cloth(0));
        for _ in 0..3 {
            solver.step(&forces, 5, 200).unwrap();
        }
        solver.model(ObjectId(0)).unwrap().positions().to_vec()
    };

    let reference = run(LinearSolverKind::CholeskyDirect);
    for kind in LinearSolverKind::ALL.into_iter().skip(1) {
        let positions = run(kind);
        for (p, r) in positions.iter().zip(&reference) {
            assert!(
                p.distance(*r) < 1e-3,
                "{} disagrees: {p:?} vs {r:?}",
                kind.name()
            );
        }
    }
}

#[test]
fn models_step_independently() {
    let mut solver = Solver::new(SolverConfig::default()).unwrap();
    solver.add_model(triangle(5, 1.0));
    solver.add_model(triangle(2, 1.0));

    let ids: Vec<ObjectId> = solver.models().map(|m| m.id()).collect();
    assert_eq!(ids, vec![ObjectId(2), ObjectId(5)]);

    // Only object 5 gets a force; object 2 stays at rest.
    let mut forces = ExternalForces::new();
    forces.insert(ObjectId(5), vec![Vec3::new(0.0, 0.0, 6.0); 3]);
    solver.step(&forces, 2, 1).unwrap();

    let still = solver.model(ObjectId(2)).unwrap();
    for (p, p0) in still.positions().iter().zip(still.rest_positions()) {
        assert!(p.distance(*p0) < 1e-5);
    }
    let pushed = solver.model(ObjectId(5)).unwrap();
    assert!(pushed.positions().iter().all(|p| p.z > 0.0));
}

// ─── Step Error Tests ─────────────────────────────────────────

#[test]
fn forces_for_unknown_object_fail() {
    let mut solver = solver_with(LinearSolverKind::CholeskyDirect, triangle(0, 1.0));
    let mut forces = ExternalForces::new();
    forces.insert(ObjectId(9), vec![Vec3::ZERO; 3]);
    assert!(matches!(
        solver.step(&forces, 1, 1),
        Err(DeformError::UnknownObject(ObjectId(9)))
    ));
    assert!(matches!(
        solver.model(ObjectId(9)),
        Err(DeformError::UnknownObject(_))
    ));
    assert!(matches!(
        solver.set_edge_strain_constraints(ObjectId(9), 1.0),
        Err(DeformError::UnknownObject(_))
    ));
}

#[test]
fn wrong_force_length_fails() {
    let mut solver = solver_with(LinearSolverKind::CholeskyDirect, triangle(0, 1.0));
    let mut forces = ExternalForces::new();
    forces.insert(ObjectId(0), vec![Vec3::ZERO; 2]);
    assert!(matches!(
        solver.step(&forces, 1, 1),
        Err(DeformError::InvalidInput(_))
    ));
    assert_eq!(solver.step_count(), 0);
}

#[test]
fn non_finite_force_leaves_meshes_untouched() {
    let mut solver = solver_with(LinearSolverKind::CholeskyDirect, hanging_cloth(0));
    let before = solver.model(ObjectId(0)).unwrap().clone();

    let mut forces = solver.gravity_forces(gravity());
    if let Some(f) = forces.get_mut(&ObjectId(0)) {
        f[5] = Vec3::new(f32::NAN, 0.0, 0.0);
    }

    let err = solver.step(&forces, 3, 1).unwrap_err();
    assert!(matches!(err, DeformError::NonFinite { stage: "prediction" }));

    let after = solver.model(ObjectId(0)).unwrap();
    assert_eq!(after.positions(), before.positions());
    assert_eq!(after.velocities(), before.velocities());
    assert_eq!(solver.step_count(), 0);
}

// ─── Local Step Executor Tests ────────────────────────────────

#[test]
fn gpu_request_falls_back_or_runs() {
    let mut solver = solver_with(LinearSolverKind::CholeskyDirect, hanging_cloth(0));
    solver.precompute().unwrap();

    solver.set_use_gpu_for_local_step(true);
    assert!(solver.config().use_gpu_for_local_step);
    assert_eq!(solver.state(), SolverState::Stale(StaleReason::LocalStepChanged));

    let forces = solver.gravity_forces(gravity());
    solver.step(&forces, 3, 1).unwrap();
    assert!(["wgpu", "cpu_rayon"].contains(&solver.local_step_executor()));

    solver.set_use_gpu_for_local_step(false);
    solver.step(&forces, 3, 1).unwrap();
    assert_eq!(solver.local_step_executor(), "cpu_rayon");
}

// ─── Telemetry Tests ──────────────────────────────────────────

#[test]
fn events_reach_sinks() {
    let sink = VecSink::new();
    let mut bus = EventBus::new();
    bus.add_sink(Box::new(sink.clone()));

    let mut solver = solver_with(LinearSolverKind::CholeskyDirect, hanging_cloth(0));
    solver.set_event_bus(Some(bus));
    assert!(solver.event_bus_mut().is_some());

    solver.step(&ExternalForces::new(), 2, 1).unwrap();
    solver.set_solver(LinearSolverKind::ParallelJacobi);
    solver.step(&ExternalForces::new(), 2, 4).unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 5);
    assert!(matches!(
        events[0].kind,
        EventKind::Precompute { unknowns: 16, .. }
    ));
    assert!(matches!(
        events[1].kind,
        EventKind::Step {
            iterations: 2,
            reprecomputed: true,
            ..
        }
    ));
    match &events[2].kind {
        EventKind::SolverSwitched { from, to } => {
            assert_eq!(from, "cholesky_direct");
            assert_eq!(to, "parallel_jacobi");
        }
        other => panic!("expected SolverSwitched, got {other:?}"),
    }
    assert!(matches!(events[3].kind, EventKind::Precompute { .. }));
    assert_eq!(events[4].step, 2);
}
