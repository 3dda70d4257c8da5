//! Accelerated ("A-") Jacobi.
//!
//! Jacobi on `A = D - R` iterates `x ← B x + D⁻¹ b` with `B = D⁻¹ R`.
//! An order-`m` A-Jacobi solver fuses `m` of those sweeps into one pass
//! through the precomputed product `Bᵐ`:
//!
//! ```text
//! c       = Σ_{j<m} Bʲ D⁻¹ b                  (once per solve)
//! y       = Bᵐ x_k + c                        (m sweeps in one mat-vec)
//! x_{k+1} = ω_{k+1} (y - x_{k-1}) + x_{k-1}   (Chebyshev blend)
//! ```
//!
//! The Chebyshev weights depend only on a bound `ρ` of the spectral radius
//! of `B`, so they are precomputed alongside `Bᵐ`. `ρ` is taken from the
//! Gershgorin row bound of `B`, which never underestimates and therefore
//! keeps the semi-iterative scheme convergent.

use rayon::prelude::*;
use tracing::{debug, warn};

use deform_types::{DeformError, DeformResult};

use crate::linear_solver::{
    check_dimensions, check_iterate, inverse_diagonal, AccelerationOrder, LinearSolverKind,
    LinearSystemSolver,
};
use crate::sparse::CsrMatrix;

/// Number of distinct Chebyshev weights stored; later iterations reuse the last one.
const MAX_COEFFICIENTS: usize = 64;

/// Precomputed splitting, matrix power and acceleration weights.
struct Precomputed {
    a: CsrMatrix,
    inv_diag: Vec<f32>,
    /// `B = D⁻¹ R`.
    b: CsrMatrix,
    /// `Bᵐ`.
    b_pow: CsrMatrix,
    /// `ω_1, ω_2, ...`.
    coefficients: Vec<f32>,
    spectral_radius: f64,
}

/// Jacobi solver with fused sweeps and Chebyshev semi-iterative acceleration.
pub struct AJacobi {
    order: AccelerationOrder,
    state: Option<Precomputed>,
}

impl AJacobi {
    /// Creates a new solver of the given order (not precomputed).
    pub fn new(order: AccelerationOrder) -> Self {
        Self { order, state: None }
    }

    /// Fusion order of this instance.
    pub fn order(&self) -> AccelerationOrder {
        self.order
    }

    /// Spectral radius bound used for the weights, once precomputed.
    pub fn spectral_radius(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.spectral_radius)
    }

    /// Chebyshev weights `ω_1..` derived in `precompute`.
    pub fn coefficients(&self) -> &[f32] {
        self.state
            .as_ref()
            .map(|s| s.coefficients.as_slice())
            .unwrap_or(&[])
    }
}

/// Builds the Jacobi iteration matrix `B = D⁻¹ (D - A)`.
fn iteration_matrix(a: &CsrMatrix, inv_diag: &[f32]) -> CsrMatrix {
    let mut triplets = Vec::with_capacity(a.nnz());
    for row in 0..a.rows {
        for k in a.row_ptr[row]..a.row_ptr[row + 1] {
            let col = a.col_idx[k];
            if col != row {
                triplets.push((row, col, -a.values[k] * inv_diag[row]));
            }
        }
    }
    CsrMatrix::from_triplets(a.rows, a.cols, &triplets)
}

/// Gershgorin bound on the spectral radius: max absolute row sum.
fn gershgorin_bound(b: &CsrMatrix) -> f64 {
    (0..b.rows)
        .map(|row| {
            b.values[b.row_ptr[row]..b.row_ptr[row + 1]]
                .iter()
                .map(|v| v.abs() as f64)
                .sum::<f64>()
        })
        .fold(0.0, f64::max)
}

/// Chebyshev weights for an iteration matrix with spectral radius `rho_m`.
fn chebyshev_coefficients(rho_m: f64) -> Vec<f32> {
    let rho2 = rho_m * rho_m;
    let mut omega = Vec::with_capacity(MAX_COEFFICIENTS);
    omega.push(1.0f64);
    omega.push(2.0 / (2.0 - rho2));
    while omega.len() < MAX_COEFFICIENTS {
        let prev = omega[omega.len() - 1];
        omega.push(4.0 / (4.0 - rho2 * prev));
    }
    omega.into_iter().map(|w| w as f32).collect()
}

impl LinearSystemSolver for AJacobi {
    fn precompute(&mut self, a: &CsrMatrix) -> DeformResult<()> {
        self.clear();

        let inv_diag = inverse_diagonal(a)?;
        let b = iteration_matrix(a, &inv_diag);

        let mut b_pow = b.clone();
        for _ in 1..self.order.get() {
            b_pow = b_pow.mul(&b);
        }

        let spectral_radius = gershgorin_bound(&b);
        let coefficients = if spectral_radius < 1.0 {
            chebyshev_coefficients(spectral_radius.powi(self.order.get() as i32))
        } else {
            warn!(
                spectral_radius,
                "Jacobi iteration matrix is not a contraction by Gershgorin; disabling Chebyshev weights"
            );
            vec![1.0; MAX_COEFFICIENTS]
        };

        debug!(
            order = self.order.get(),
            spectral_radius,
            nnz_power = b_pow.nnz(),
            "A-Jacobi precomputed"
        );

        self.state = Some(Precomputed {
            a: a.clone(),
            inv_diag,
            b,
            b_pow,
            coefficients,
            spectral_radius,
        });
        Ok(())
    }

    fn solve(&mut self, rhs: &[f32], n_itr: u32, solution: &mut [f32]) -> DeformResult<()> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| DeformError::NotPrecomputed("A-Jacobi products missing".into()))?;
        let n = state.a.rows;
        check_dimensions(n, rhs, solution)?;

        let initial_residual = state.a.residual_norm(solution, rhs);

        // c = Σ_{j<m} Bʲ D⁻¹ b, by Horner: c ← B c + D⁻¹ b
        let d_inv_b: Vec<f32> = rhs
            .iter()
            .zip(&state.inv_diag)
            .map(|(&r, &d)| r * d)
            .collect();
        let mut c = d_inv_b.clone();
        let mut tmp = vec![0.0f32; n];
        for _ in 1..self.order.get() {
            state.b.mul_vec_par(&c, &mut tmp);
            c.par_iter_mut()
                .zip(tmp.par_iter())
                .zip(d_inv_b.par_iter())
                .for_each(|((ci, &bi), &di)| *ci = bi + di);
        }

        let mut prev = solution.to_vec();
        let mut current = solution.to_vec();
        let mut next = vec![0.0f32; n];

        for k in 0..n_itr as usize {
            let omega = state.coefficients[k.min(state.coefficients.len() - 1)];
            state.b_pow.mul_vec_par(&current, &mut next);
            next.par_iter_mut()
                .zip(c.par_iter())
                .zip(prev.par_iter())
                .for_each(|((y, &ci), &p)| {
                    *y = omega * (*y + ci - p) + p;
                });

            // prev ← current, current ← next
            std::mem::swap(&mut prev, &mut current);
            std::mem::swap(&mut current, &mut next);
        }

        solution.copy_from_slice(&current);
        check_iterate(&state.a, rhs, solution, initial_residual, n_itr)
    }

    fn is_precomputed(&self) -> bool {
        self.state.is_some()
    }

    fn clear(&mut self) {
        self.state = None;
    }

    fn kind(&self) -> LinearSolverKind {
        LinearSolverKind::AJacobi(self.order)
    }
}
