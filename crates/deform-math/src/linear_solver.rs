//! Linear system solver trait — the strategy abstraction for the global step.
//!
//! The global step of Projective Dynamics solves `A x = b` once per axis
//! per local/global iteration. `A` only changes with topology, weights,
//! masses, or the timestep, so every strategy splits its work into an
//! expensive `precompute` and a cheap, repeatable `solve`.

use serde::{Deserialize, Serialize};

use deform_types::{DeformError, DeformResult};

use crate::a_jacobi::AJacobi;
use crate::cholesky::CholeskyDirect;
use crate::jacobi::ParallelJacobi;
use crate::sparse::CsrMatrix;

/// Trait for global-step linear solvers.
///
/// ```text
/// solver.precompute(&a)?;          // once per matrix change
/// loop {
///     solver.solve(&b, n_itr, &mut x)?;   // many times
/// }
/// ```
///
/// # Implementations
///
/// - [`CholeskyDirect`] — sparse LLᵀ, exact
/// - [`ParallelJacobi`] — Gauss–Jacobi sweeps, rayon parallel
/// - [`AJacobi`] — Jacobi with fused sweeps and Chebyshev acceleration
pub trait LinearSystemSolver: Send {
    /// Derive factorization / splitting state from the system matrix.
    fn precompute(&mut self, a: &CsrMatrix) -> DeformResult<()>;

    /// Solve `A x = rhs`.
    ///
    /// On entry `solution` holds the initial guess (iterative strategies
    /// warm-start from it); on exit it holds the result. `n_itr` is the
    /// sweep budget for iterative strategies and is ignored by direct ones.
    fn solve(&mut self, rhs: &[f32], n_itr: u32, solution: &mut [f32]) -> DeformResult<()>;

    /// Returns true if `precompute` succeeded and `clear` has not been called since.
    fn is_precomputed(&self) -> bool;

    /// Drop all derived state.
    fn clear(&mut self);

    /// Which enumerated strategy this instance implements.
    fn kind(&self) -> LinearSolverKind;

    /// Returns the strategy name.
    fn name(&self) -> &'static str {
        self.kind().name()
    }
}

/// Number of Jacobi sweeps fused into one accelerated iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AccelerationOrder {
    #[default]
    One,
    Two,
    Three,
}

impl AccelerationOrder {
    /// Numeric order (1, 2 or 3).
    pub fn get(self) -> u32 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }
}

impl TryFrom<u32> for AccelerationOrder {
    type Error = DeformError;

    fn try_from(order: u32) -> DeformResult<Self> {
        match order {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            other => Err(DeformError::InvalidConfig(format!(
                "A-Jacobi order must be 1, 2 or 3, got {other}"
            ))),
        }
    }
}

/// Runtime selector for the active global-step strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LinearSolverKind {
    #[default]
    CholeskyDirect,
    ParallelJacobi,
    AJacobi(AccelerationOrder),
}

impl LinearSolverKind {
    /// Every selectable strategy, in menu order.
    pub const ALL: [Self; 5] = [
        Self::CholeskyDirect,
        Self::ParallelJacobi,
        Self::AJacobi(AccelerationOrder::One),
        Self::AJacobi(AccelerationOrder::Two),
        Self::AJacobi(AccelerationOrder::Three),
    ];

    /// Construct a fresh, un-precomputed instance of this strategy.
    pub fn build(self) -> Box<dyn LinearSystemSolver> {
        match self {
            Self::CholeskyDirect => Box::new(CholeskyDirect::new()),
            Self::ParallelJacobi => Box::new(ParallelJacobi::new()),
            Self::AJacobi(order) => Box::new(AJacobi::new(order)),
        }
    }

    /// Human-readable strategy name.
    pub fn name(self) -> &'static str {
        match self {
            Self::CholeskyDirect => "cholesky_direct",
            Self::ParallelJacobi => "parallel_jacobi",
            Self::AJacobi(AccelerationOrder::One) => "a_jacobi_1",
            Self::AJacobi(AccelerationOrder::Two) => "a_jacobi_2",
            Self::AJacobi(AccelerationOrder::Three) => "a_jacobi_3",
        }
    }

    /// True for strategies that consume a sweep budget.
    pub fn is_iterative(self) -> bool {
        !matches!(self, Self::CholeskyDirect)
    }
}

/// Shared argument checks for `solve`.
pub(crate) fn check_dimensions(dimension: usize, rhs: &[f32], solution: &[f32]) -> DeformResult<()> {
    if rhs.len() != dimension {
        return Err(DeformError::InvalidInput(format!(
            "RHS length ({}) != matrix dimension ({})",
            rhs.len(),
            dimension
        )));
    }
    if solution.len() != dimension {
        return Err(DeformError::InvalidInput(format!(
            "Solution length ({}) != matrix dimension ({})",
            solution.len(),
            dimension
        )));
    }
    Ok(())
}

/// Inverse diagonal of a square SPD candidate, rejecting zero or non-finite pivots.
pub(crate) fn inverse_diagonal(a: &CsrMatrix) -> DeformResult<Vec<f32>> {
    if !a.is_square() {
        return Err(DeformError::Factorization(format!(
            "Matrix must be square, got {}×{}",
            a.rows, a.cols
        )));
    }
    if a.rows == 0 {
        return Err(DeformError::Factorization("Cannot split empty matrix".into()));
    }

    a.diagonal()
        .into_iter()
        .enumerate()
        .map(|(i, d)| {
            if d.is_finite() && d > 0.0 {
                Ok(1.0 / d)
            } else {
                Err(DeformError::Factorization(format!(
                    "Jacobi splitting needs a positive diagonal, row {i} has {d}"
                )))
            }
        })
        .collect()
}

/// Post-solve health check shared by the iterative strategies.
///
/// `initial_residual` is the residual of the warm-start guess; a final
/// residual more than [`DIVERGENCE_GROWTH_LIMIT`] times larger (or any
/// non-finite value) is reported as a failure. The baseline never drops
/// below f32 rounding of `rhs`, so an exact warm start is not compared
/// against zero.
///
/// [`DIVERGENCE_GROWTH_LIMIT`]: deform_types::constants::DIVERGENCE_GROWTH_LIMIT
pub(crate) fn check_iterate(
    a: &CsrMatrix,
    rhs: &[f32],
    solution: &[f32],
    initial_residual: f64,
    iterations: u32,
) -> DeformResult<()> {
    if solution.iter().any(|v| !v.is_finite()) {
        return Err(DeformError::NonFinite {
            stage: "iterative linear solve",
        });
    }

    let residual = a.residual_norm(solution, rhs);
    let precision_floor = f64::from(f32::EPSILON) * crate::sparse::norm(rhs).max(1.0);
    let baseline = initial_residual.max(precision_floor);
    if !residual.is_finite()
        || residual > deform_types::constants::DIVERGENCE_GROWTH_LIMIT * baseline
    {
        return Err(DeformError::SolverDivergence {
            iterations,
            residual,
        });
    }
    Ok(())
}
