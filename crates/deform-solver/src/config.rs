//! Solver configuration.
//!
//! Parameters that control the step loop: timestep, iteration counts,
//! the global-step strategy and where the local step runs.

use serde::{Deserialize, Serialize};

use deform_math::{AccelerationOrder, LinearSolverKind};
use deform_types::constants::{DEFAULT_DT, DEFAULT_INNER_ITERATIONS, DEFAULT_PD_ITERATIONS};
use deform_types::{DeformError, DeformResult};

/// Configuration for the Projective Dynamics solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Timestep (seconds).
    pub dt: f32,

    /// Local/global iterations per timestep.
    pub iterations: u32,

    /// Sweeps per global solve for iterative linear solvers.
    /// Ignored by the direct solver.
    pub inner_iterations: u32,

    /// Global-step strategy.
    pub linear_solver: LinearSolverKind,

    /// Run the local step on the GPU when one is available.
    pub use_gpu_for_local_step: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            dt: DEFAULT_DT,
            iterations: DEFAULT_PD_ITERATIONS,
            inner_iterations: DEFAULT_INNER_ITERATIONS,
            linear_solver: LinearSolverKind::CholeskyDirect,
            use_gpu_for_local_step: false,
        }
    }
}

impl SolverConfig {
    /// Creates a config for debugging (few iterations, plain Jacobi).
    pub fn debug() -> Self {
        Self {
            iterations: 3,
            inner_iterations: 5,
            linear_solver: LinearSolverKind::ParallelJacobi,
            ..Default::default()
        }
    }

    /// Creates a high-quality config (more iterations, accelerated Jacobi).
    pub fn high_quality() -> Self {
        Self {
            iterations: 30,
            inner_iterations: 20,
            linear_solver: LinearSolverKind::AJacobi(AccelerationOrder::Three),
            ..Default::default()
        }
    }

    /// Checks that the config describes a runnable solver.
    pub fn validate(&self) -> DeformResult<()> {
        validate_dt(self.dt)?;
        if self.linear_solver.is_iterative() && self.inner_iterations == 0 {
            return Err(DeformError::InvalidConfig(format!(
                "{} needs at least one inner iteration",
                self.linear_solver.name()
            )));
        }
        Ok(())
    }
}

pub(crate) fn validate_dt(dt: f32) -> DeformResult<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(DeformError::InvalidConfig(format!(
            "timestep must be positive and finite, got {dt}"
        )))
    }
}
