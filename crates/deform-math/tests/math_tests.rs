//! Integration tests for deform-math.

use approx::assert_relative_eq;

use deform_math::sparse::CsrMatrix;
use deform_math::{
    AJacobi, AccelerationOrder, CholeskyDirect, LinearSolverKind, LinearSystemSolver,
    ParallelJacobi,
};
use deform_types::DeformError;

/// Two edge constraints (w = 1) on a 3-vertex chain with unit masses and dt = 1:
///
/// ```text
///     A = I + [ 1 -1  0 ]   [ 2 -1  0 ]
///             [-1  2 -1 ] = [-1  3 -1 ]
///             [ 0 -1  1 ]   [ 0 -1  2 ]
/// ```
///
/// With `b = [0, 2, 4]` the exact solution is `x = [1, 2, 3]`.
fn chain_system() -> (CsrMatrix, [f32; 3], [f32; 3]) {
    let triplets = vec![
        (0, 0, 1.0),
        (1, 1, 1.0),
        (2, 2, 1.0),
        // edge (0, 1)
        (0, 0, 1.0),
        (0, 1, -1.0),
        (1, 0, -1.0),
        (1, 1, 1.0),
        // edge (1, 2)
        (1, 1, 1.0),
        (1, 2, -1.0),
        (2, 1, -1.0),
        (2, 2, 1.0),
    ];
    (
        CsrMatrix::from_triplets(3, 3, &triplets),
        [0.0, 2.0, 4.0],
        [1.0, 2.0, 3.0],
    )
}

// ─── Sparse Matrix Tests ─────────────────────────────────────

#[test]
fn empty_csr() {
    let m = CsrMatrix::new(3, 3);
    assert_eq!(m.nnz(), 0);
    assert_eq!(m.rows, 3);
    assert_eq!(m.cols, 3);
    assert_eq!(m.row_ptr.len(), 4);
}

#[test]
fn csr_from_triplets() {
    let triplets = vec![(0, 0, 1.0), (1, 1, 1.0), (2, 2, 1.0)];
    let m = CsrMatrix::from_triplets(3, 3, &triplets);
    assert_eq!(m.nnz(), 3);
    assert_eq!(m.row_ptr, vec![0, 1, 2, 3]);
    assert_eq!(m.col_idx, vec![0, 1, 2]);
    assert_eq!(m.values, vec![1.0, 1.0, 1.0]);
}

#[test]
fn csr_from_triplets_unordered() {
    let triplets = vec![(0, 2, 3.0), (0, 0, 1.0), (0, 1, 2.0)];
    let m = CsrMatrix::from_triplets(1, 3, &triplets);
    assert_eq!(m.col_idx, vec![0, 1, 2]);
    assert_eq!(m.values, vec![1.0, 2.0, 3.0]);
}

#[test]
fn csr_duplicates_are_summed() {
    let (a, _, _) = chain_system();
    assert_eq!(a.nnz(), 7);
    assert_eq!(a.diagonal(), vec![2.0, 3.0, 2.0]);
    assert_eq!(a.get(0, 1), -1.0);
    assert_eq!(a.get(0, 2), 0.0);
}

#[test]
fn csr_mul_vec_serial_and_parallel_agree() {
    let (a, b, x) = chain_system();
    let mut serial = [0.0f32; 3];
    let mut parallel = [0.0f32; 3];
    a.mul_vec(&x, &mut serial);
    a.mul_vec_par(&x, &mut parallel);
    assert_eq!(serial, b);
    assert_eq!(parallel, b);
    assert!(a.residual_norm(&x, &b) < 1e-6);
}

#[test]
fn csr_sparse_product() {
    // [1 2] [0 1]   [2 1]
    // [0 3] [1 0] = [3 0]
    let lhs = CsrMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (0, 1, 2.0), (1, 1, 3.0)]);
    let rhs = CsrMatrix::from_triplets(2, 2, &[(0, 1, 1.0), (1, 0, 1.0)]);
    let p = lhs.mul(&rhs);
    assert_eq!(p.get(0, 0), 2.0);
    assert_eq!(p.get(0, 1), 1.0);
    assert_eq!(p.get(1, 0), 3.0);
    assert_eq!(p.get(1, 1), 0.0);
    assert_eq!(p.row_ptr, vec![0, 2, 3]);
}

#[test]
fn csr_serialization() {
    let (a, _, _) = chain_system();
    let json = serde_json::to_string(&a).unwrap();
    let recovered: CsrMatrix = serde_json::from_str(&json).unwrap();
    assert_eq!(recovered, a);
}

// ─── CholeskyDirect Tests ────────────────────────────────────

#[test]
fn cholesky_identity_solve() {
    // Solve I * x = b → expect x = b
    let triplets = vec![(0, 0, 1.0), (1, 1, 1.0), (2, 2, 1.0)];
    let matrix = CsrMatrix::from_triplets(3, 3, &triplets);

    let mut solver = CholeskyDirect::new();
    assert!(!solver.is_precomputed());

    solver.precompute(&matrix).unwrap();
    assert!(solver.is_precomputed());

    let rhs = [3.0_f32, 7.0, -2.0];
    let mut sol = [0.0_f32; 3];
    solver.solve(&rhs, 0, &mut sol).unwrap();

    for i in 0..3 {
        assert_relative_eq!(sol[i], rhs[i], epsilon = 1e-5);
    }
}

#[test]
fn cholesky_factorize_then_multi_solve() {
    // Factorize once, solve with two different RHS
    let triplets = vec![(0, 0, 2.0), (1, 1, 3.0), (2, 2, 5.0)];
    let matrix = CsrMatrix::from_triplets(3, 3, &triplets);

    let mut solver = CholeskyDirect::new();
    solver.precompute(&matrix).unwrap();

    let rhs1 = [4.0_f32, 9.0, 25.0];
    let mut sol1 = [0.0_f32; 3];
    solver.solve(&rhs1, 0, &mut sol1).unwrap();
    assert_relative_eq!(sol1[0], 2.0, epsilon = 1e-5);
    assert_relative_eq!(sol1[1], 3.0, epsilon = 1e-5);
    assert_relative_eq!(sol1[2], 5.0, epsilon = 1e-5);

    // Second solve with different RHS (same factorization)
    let rhs2 = [1.0_f32, 1.0, 1.0];
    let mut sol2 = [0.0_f32; 3];
    solver.solve(&rhs2, 0, &mut sol2).unwrap();
    assert_relative_eq!(sol2[0], 0.5, epsilon = 1e-5);
    assert_relative_eq!(sol2[1], 1.0 / 3.0, epsilon = 1e-5);
    assert_relative_eq!(sol2[2], 0.2, epsilon = 1e-5);
}

#[test]
fn cholesky_large_laplacian() {
    // 100×100 tridiagonal Laplacian with a diagonal shift for strict SPD.
    let n = 100;
    let mut triplets = Vec::new();
    for i in 0..n {
        triplets.push((i, i, 2.1_f32));
        if i > 0 {
            triplets.push((i, i - 1, -1.0));
        }
        if i < n - 1 {
            triplets.push((i, i + 1, -1.0));
        }
    }

    let matrix = CsrMatrix::from_triplets(n, n, &triplets);
    let mut solver = CholeskyDirect::new();
    solver.precompute(&matrix).unwrap();

    let rhs = vec![1.0_f32; n];
    let mut sol = vec![0.0_f32; n];
    solver.solve(&rhs, 0, &mut sol).unwrap();

    let residual = matrix.residual_norm(&sol, &rhs);
    assert!(residual < 1e-3, "residual = {residual}, expected < 1e-3");
}

#[test]
fn cholesky_rejects_indefinite_matrix() {
    let matrix = CsrMatrix::from_triplets(
        2,
        2,
        &[(0, 0, 1.0), (0, 1, 2.0), (1, 0, 2.0), (1, 1, 1.0)],
    );
    let mut solver = CholeskyDirect::new();
    let err = solver.precompute(&matrix).unwrap_err();
    assert!(matches!(err, DeformError::Factorization(_)));
    assert!(!solver.is_precomputed());
}

#[test]
fn cholesky_rejects_empty_matrix() {
    let mut solver = CholeskyDirect::new();
    assert!(solver.precompute(&CsrMatrix::new(0, 0)).is_err());
}

#[test]
fn solve_before_precompute_fails_for_every_strategy() {
    for kind in LinearSolverKind::ALL {
        let mut solver = kind.build();
        let rhs = [1.0_f32; 3];
        let mut sol = [0.0_f32; 3];
        let err = solver.solve(&rhs, 5, &mut sol).unwrap_err();
        assert!(
            matches!(err, DeformError::NotPrecomputed(_)),
            "{} accepted a solve without precompute",
            solver.name()
        );
    }
}

#[test]
fn solve_rejects_mismatched_rhs() {
    let (a, _, _) = chain_system();
    let mut solver = ParallelJacobi::new();
    solver.precompute(&a).unwrap();
    let mut sol = [0.0f32; 3];
    assert!(matches!(
        solver.solve(&[1.0, 2.0], 10, &mut sol),
        Err(DeformError::InvalidInput(_))
    ));
}

// ─── Strategy family ─────────────────────────────────────────

#[test]
fn all_strategies_agree_on_chain_system() {
    let (a, b, expected) = chain_system();

    for kind in LinearSolverKind::ALL {
        let mut solver = kind.build();
        solver.precompute(&a).unwrap();
        assert_eq!(solver.kind(), kind);

        let mut x = [0.0f32; 3];
        solver.solve(&b, 200, &mut x).unwrap();
        for i in 0..3 {
            assert_relative_eq!(x[i], expected[i], epsilon = 1e-4);
        }
    }
}

#[test]
fn jacobi_warm_start_at_solution_stays_put() {
    let (a, b, expected) = chain_system();
    let mut solver = ParallelJacobi::new();
    solver.precompute(&a).unwrap();

    let mut x = expected;
    solver.solve(&b, 3, &mut x).unwrap();
    for i in 0..3 {
        assert_relative_eq!(x[i], expected[i], epsilon = 1e-5);
    }
}

#[test]
fn exact_warm_start_is_not_divergence() {
    // b = a·x0 rounded to f32: the warm start already solves the system, so
    // any residual left after a sweep is pure rounding noise.
    let iterative = LinearSolverKind::ALL.into_iter().filter(|k| k.is_iterative());
    for kind in iterative {
        for step in 1..40 {
            let a = 1_000.0 + 277.3 * step as f32;
            let x0 = -3.7 + 0.61 * step as f32;
            let matrix = CsrMatrix::from_triplets(1, 1, &[(0, 0, a)]);
            let mut solver = kind.build();
            solver.precompute(&matrix).unwrap();

            let mut x = [x0];
            solver
                .solve(&[a * x0], 3, &mut x)
                .unwrap_or_else(|e| panic!("{} a={a} x0={x0}: {e}", kind.name()));
            assert_relative_eq!(x[0], x0, max_relative = 1e-5);
        }
    }
}

#[test]
fn exact_warm_start_on_mass_dominated_system() {
    // Shape of a PD system matrix: heavy mass diagonal (m/dt² with m = 0.37,
    // dt = 0.01) plus a weak edge chain.
    let n = 12;
    let (mass_term, w) = (0.37 / (0.01 * 0.01), 25.0);
    let mut triplets = Vec::new();
    for i in 0..n {
        triplets.push((i, i, mass_term));
        if i + 1 < n {
            triplets.extend([(i, i, w), (i + 1, i + 1, w), (i, i + 1, -w), (i + 1, i, -w)]);
        }
    }
    let matrix = CsrMatrix::from_triplets(n, n, &triplets);
    let x0: Vec<f32> = (0..n).map(|i| 1.5 + 0.173 * i as f32).collect();
    let mut b = vec![0.0f32; n];
    matrix.mul_vec(&x0, &mut b);

    for kind in LinearSolverKind::ALL {
        let mut solver = kind.build();
        solver.precompute(&matrix).unwrap();
        let mut x = x0.clone();
        solver
            .solve(&b, 10, &mut x)
            .unwrap_or_else(|e| panic!("{}: {e}", kind.name()));
        for (got, want) in x.iter().zip(&x0) {
            assert_relative_eq!(*got, *want, max_relative = 1e-4);
        }
    }
}

#[test]
fn jacobi_zero_sweeps_returns_guess() {
    let (a, b, _) = chain_system();
    let mut solver = ParallelJacobi::new();
    solver.precompute(&a).unwrap();

    let mut x = [0.5f32, 0.5, 0.5];
    solver.solve(&b, 0, &mut x).unwrap();
    assert_eq!(x, [0.5, 0.5, 0.5]);
}

#[test]
fn jacobi_one_sweep_uses_only_previous_iterate() {
    // One Gauss–Jacobi sweep from zero is D⁻¹ b exactly; a Gauss–Seidel
    // sweep would already mix in the updated row 0 when computing row 1.
    let (a, b, _) = chain_system();
    let mut solver = ParallelJacobi::new();
    solver.precompute(&a).unwrap();

    let mut x = [0.0f32; 3];
    solver.solve(&b, 1, &mut x).unwrap();
    assert_relative_eq!(x[0], 0.0);
    assert_relative_eq!(x[1], 2.0 / 3.0);
    assert_relative_eq!(x[2], 2.0);
}

#[test]
fn jacobi_rejects_zero_diagonal() {
    let matrix = CsrMatrix::from_triplets(2, 2, &[(0, 1, 1.0), (1, 0, 1.0), (1, 1, 1.0)]);
    let mut solver = ParallelJacobi::new();
    assert!(matches!(
        solver.precompute(&matrix),
        Err(DeformError::Factorization(_))
    ));
}

#[test]
fn jacobi_divergence_is_reported() {
    // SPD but not diagonally dominant: Jacobi's iteration matrix has ρ = 1.8.
    let mut triplets = Vec::new();
    for i in 0..3 {
        for j in 0..3 {
            triplets.push((i, j, if i == j { 1.0 } else { 0.9 }));
        }
    }
    let matrix = CsrMatrix::from_triplets(3, 3, &triplets);

    let mut solver = ParallelJacobi::new();
    solver.precompute(&matrix).unwrap();
    let mut x = [0.0f32; 3];
    let err = solver.solve(&[1.0, 1.0, 1.0], 50, &mut x).unwrap_err();
    assert!(matches!(err, DeformError::SolverDivergence { iterations: 50, .. }));
}

#[test]
fn a_jacobi_coefficients_follow_chebyshev_recurrence() {
    let (a, _, _) = chain_system();
    let mut solver = AJacobi::new(AccelerationOrder::One);
    solver.precompute(&a).unwrap();

    // Gershgorin bound of B for the chain system is 2/3 (row 1).
    let rho = solver.spectral_radius().unwrap();
    assert_relative_eq!(rho, 2.0 / 3.0, epsilon = 1e-6);

    let omega = solver.coefficients();
    let rho2 = (rho * rho) as f32;
    assert_relative_eq!(omega[0], 1.0);
    assert_relative_eq!(omega[1], 2.0 / (2.0 - rho2), epsilon = 1e-6);
    assert_relative_eq!(omega[2], 4.0 / (4.0 - rho2 * omega[1]), epsilon = 1e-6);
    assert!(omega.iter().all(|&w| (1.0..2.0).contains(&w)));
}

#[test]
fn a_jacobi_first_iteration_equals_fused_jacobi_sweeps() {
    // With ω₁ = 1, one order-m iteration must equal m plain Jacobi sweeps.
    let (a, b, _) = chain_system();
    for (order, sweeps) in [
        (AccelerationOrder::One, 1),
        (AccelerationOrder::Two, 2),
        (AccelerationOrder::Three, 3),
    ] {
        let mut accelerated = AJacobi::new(order);
        accelerated.precompute(&a).unwrap();
        let mut x_acc = [0.25f32, -1.0, 0.5];
        accelerated.solve(&b, 1, &mut x_acc).unwrap();

        let mut plain = ParallelJacobi::new();
        plain.precompute(&a).unwrap();
        let mut x_plain = [0.25f32, -1.0, 0.5];
        plain.solve(&b, sweeps, &mut x_plain).unwrap();

        for i in 0..3 {
            assert_relative_eq!(x_acc[i], x_plain[i], epsilon = 1e-5);
        }
    }
}

#[test]
fn a_jacobi_converges_faster_than_plain_jacobi() {
    // 1D Laplacian with a weak mass term: slow for plain Jacobi.
    let n = 50;
    let mut triplets = Vec::new();
    for i in 0..n {
        triplets.push((i, i, 2.05_f32));
        if i > 0 {
            triplets.push((i, i - 1, -1.0));
        }
        if i < n - 1 {
            triplets.push((i, i + 1, -1.0));
        }
    }
    let matrix = CsrMatrix::from_triplets(n, n, &triplets);
    let rhs = vec![1.0f32; n];

    let mut plain = ParallelJacobi::new();
    plain.precompute(&matrix).unwrap();
    let mut x_plain = vec![0.0f32; n];
    plain.solve(&rhs, 30, &mut x_plain).unwrap();

    let mut accelerated = AJacobi::new(AccelerationOrder::Three);
    accelerated.precompute(&matrix).unwrap();
    let mut x_acc = vec![0.0f32; n];
    accelerated.solve(&rhs, 10, &mut x_acc).unwrap();

    let r_plain = matrix.residual_norm(&x_plain, &rhs);
    let r_acc = matrix.residual_norm(&x_acc, &rhs);
    assert!(
        r_acc < r_plain,
        "A-Jacobi residual {r_acc} should beat Jacobi residual {r_plain} at equal sweep count"
    );
}

#[test]
fn clear_discards_derived_state() {
    let (a, _, _) = chain_system();
    for kind in LinearSolverKind::ALL {
        let mut solver = kind.build();
        solver.precompute(&a).unwrap();
        assert!(solver.is_precomputed());
        solver.clear();
        assert!(!solver.is_precomputed());
    }
}

// ─── Strategy selector ───────────────────────────────────────

#[test]
fn kind_names_are_distinct() {
    let names: std::collections::HashSet<_> =
        LinearSolverKind::ALL.iter().map(|k| k.name()).collect();
    assert_eq!(names.len(), LinearSolverKind::ALL.len());
    assert!(!LinearSolverKind::CholeskyDirect.is_iterative());
    assert!(LinearSolverKind::AJacobi(AccelerationOrder::Two).is_iterative());
}

#[test]
fn acceleration_order_from_number() {
    assert_eq!(AccelerationOrder::try_from(2).unwrap(), AccelerationOrder::Two);
    assert!(AccelerationOrder::try_from(4).is_err());
    assert_eq!(AccelerationOrder::Three.get(), 3);
}

#[test]
fn kind_serialization() {
    let kind = LinearSolverKind::AJacobi(AccelerationOrder::Two);
    let json = serde_json::to_string(&kind).unwrap();
    let recovered: LinearSolverKind = serde_json::from_str(&json).unwrap();
    assert_eq!(recovered, kind);
}
