//! Sparse Cholesky solver backed by `faer`.
//!
//! Implements [`LinearSystemSolver`] using faer's supernodal LLᵀ
//! factorization. The solver works in f64 internally for numerical
//! robustness but accepts and returns f32 at the interface boundary.
//!
//! ## Workflow
//! 1. `precompute(matrix)` — converts CSR→CSC, computes symbolic + numeric LLᵀ
//! 2. `solve(rhs, _, solution)` — forward/backward substitution (cached factorization)
//! 3. Repeat `solve()` with different RHS without re-factorizing

use faer::Side;
use faer::linalg::solvers::Solve;
use faer::sparse::SparseColMat;
use faer::sparse::Triplet;
use faer::sparse::linalg::solvers::{Llt, SymbolicLlt};
use tracing::debug;

use deform_types::{DeformError, DeformResult};

use crate::linear_solver::{check_dimensions, LinearSolverKind, LinearSystemSolver};
use crate::sparse::CsrMatrix;

/// Sparse Cholesky (LLᵀ) solver using `faer`.
///
/// Stores the factorization for reuse across multiple solves.
/// The Projective Dynamics system matrix is constant between
/// topology/weight changes, so one factorization serves many steps.
pub struct CholeskyDirect {
    /// Cached LLᵀ factorization.
    factorization: Option<Llt<usize, f64>>,
    /// Matrix dimension (N×N).
    dimension: usize,
}

impl CholeskyDirect {
    /// Creates a new solver (unfactorized).
    pub fn new() -> Self {
        Self {
            factorization: None,
            dimension: 0,
        }
    }

    /// Convert our CSR matrix (f32) to faer's CSC matrix (f64).
    ///
    /// Builds from faer `Triplet`s, which faer assembles into CSC format.
    fn csr_to_csc_f64(matrix: &CsrMatrix) -> DeformResult<SparseColMat<usize, f64>> {
        let mut triplets: Vec<Triplet<usize, usize, f64>> = Vec::with_capacity(matrix.nnz());
        for row in 0..matrix.rows {
            for idx in matrix.row_ptr[row]..matrix.row_ptr[row + 1] {
                let col = matrix.col_idx[idx];
                let val = matrix.values[idx] as f64;
                triplets.push(Triplet { row, col, val });
            }
        }

        SparseColMat::try_new_from_triplets(matrix.rows, matrix.cols, &triplets).map_err(|e| {
            DeformError::Factorization(format!("Failed to construct faer CSC matrix: {e:?}"))
        })
    }
}

impl Default for CholeskyDirect {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearSystemSolver for CholeskyDirect {
    fn precompute(&mut self, matrix: &CsrMatrix) -> DeformResult<()> {
        self.clear();

        if !matrix.is_square() {
            return Err(DeformError::Factorization(format!(
                "Matrix must be square, got {}×{}",
                matrix.rows, matrix.cols
            )));
        }
        if matrix.rows == 0 {
            return Err(DeformError::Factorization(
                "Cannot factorize empty matrix".into(),
            ));
        }

        // Convert CSR → faer CSC
        let csc = Self::csr_to_csc_f64(matrix)?;

        // Step 1: Symbolic analysis (ordering, fill-in prediction)
        let symbolic = SymbolicLlt::try_new(csc.symbolic().as_ref(), Side::Upper)
            .map_err(|e| DeformError::Factorization(format!("Symbolic analysis failed: {e:?}")))?;

        // Step 2: Numeric factorization (using the symbolic structure)
        let llt = Llt::try_new_with_symbolic(symbolic, csc.as_ref(), Side::Upper).map_err(|e| {
            DeformError::Factorization(format!("Cholesky factorization failed: {e:?}"))
        })?;

        debug!(dimension = matrix.rows, nnz = matrix.nnz(), "Cholesky factorization ready");

        self.dimension = matrix.rows;
        self.factorization = Some(llt);
        Ok(())
    }

    fn solve(&mut self, rhs: &[f32], _n_itr: u32, solution: &mut [f32]) -> DeformResult<()> {
        let llt = self.factorization.as_ref().ok_or_else(|| {
            DeformError::NotPrecomputed("Cholesky solver not factorized".into())
        })?;
        check_dimensions(self.dimension, rhs, solution)?;

        // Convert RHS f32 → f64 dense column vector
        let rhs_f64: faer::Mat<f64> = faer::Mat::from_fn(self.dimension, 1, |i, _| rhs[i] as f64);

        // Solve using cached factorization: L L^T x = b
        let sol = llt.solve(&rhs_f64);

        // Copy result f64 → f32
        for (i, s) in solution.iter_mut().enumerate() {
            let value = sol[(i, 0)];
            if !value.is_finite() {
                return Err(DeformError::NonFinite {
                    stage: "cholesky back-substitution",
                });
            }
            *s = value as f32;
        }

        Ok(())
    }

    fn is_precomputed(&self) -> bool {
        self.factorization.is_some()
    }

    fn clear(&mut self) {
        self.factorization = None;
        self.dimension = 0;
    }

    fn kind(&self) -> LinearSolverKind {
        LinearSolverKind::CholeskyDirect
    }
}
