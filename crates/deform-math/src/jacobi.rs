//! Parallel (Gauss–)Jacobi relaxation.
//!
//! Each sweep computes `x_{k+1}[i] = (b[i] - Σ_{j≠i} a_ij x_k[j]) / a_ii`
//! for every row in parallel. Rows only read the previous sweep's vector
//! and write into a separate buffer; the buffers are swapped after the
//! sweep, so there is never a read-after-write inside one sweep.

use rayon::prelude::*;

use deform_types::{DeformError, DeformResult};

use crate::linear_solver::{
    check_dimensions, check_iterate, inverse_diagonal, LinearSolverKind, LinearSystemSolver,
};
use crate::sparse::CsrMatrix;

/// Plain Jacobi solver with rayon-parallel sweeps.
pub struct ParallelJacobi {
    /// System matrix (kept for the off-diagonal products and residuals).
    a: Option<CsrMatrix>,
    /// `1 / a_ii`.
    inv_diag: Vec<f32>,
    /// Second iterate buffer.
    scratch: Vec<f32>,
}

impl ParallelJacobi {
    /// Creates a new solver (not precomputed).
    pub fn new() -> Self {
        Self {
            a: None,
            inv_diag: Vec::new(),
            scratch: Vec::new(),
        }
    }
}

impl Default for ParallelJacobi {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearSystemSolver for ParallelJacobi {
    fn precompute(&mut self, a: &CsrMatrix) -> DeformResult<()> {
        self.clear();
        self.inv_diag = inverse_diagonal(a)?;
        self.scratch = vec![0.0; a.rows];
        self.a = Some(a.clone());
        Ok(())
    }

    fn solve(&mut self, rhs: &[f32], n_itr: u32, solution: &mut [f32]) -> DeformResult<()> {
        let a = self
            .a
            .as_ref()
            .ok_or_else(|| DeformError::NotPrecomputed("Jacobi splitting missing".into()))?;
        check_dimensions(a.rows, rhs, solution)?;

        let initial_residual = a.residual_norm(solution, rhs);
        let inv_diag = &self.inv_diag;

        let mut current = solution.to_vec();
        for _ in 0..n_itr {
            let previous = &current;
            self.scratch
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, next)| {
                    *next = inv_diag[i] * (rhs[i] - a.row_dot_off_diagonal(i, previous));
                });
            std::mem::swap(&mut current, &mut self.scratch);
        }

        solution.copy_from_slice(&current);
        check_iterate(a, rhs, solution, initial_residual, n_itr)
    }

    fn is_precomputed(&self) -> bool {
        self.a.is_some()
    }

    fn clear(&mut self) {
        self.a = None;
        self.inv_diag.clear();
        self.scratch.clear();
    }

    fn kind(&self) -> LinearSolverKind {
        LinearSolverKind::ParallelJacobi
    }
}
