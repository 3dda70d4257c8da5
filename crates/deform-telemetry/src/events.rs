//! Simulation event types.
//!
//! Structured events emitted by the solver. Events are lightweight value
//! types that carry just enough data to be useful for monitoring and
//! debugging.

use serde::{Deserialize, Serialize};

/// A simulation event emitted by the solver.
///
/// Events are tagged with the number of steps completed when they were emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    pub step: u64,
    pub kind: EventKind,
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// System matrix assembled and handed to the linear solver.
    Precompute {
        /// Total unknowns per axis.
        unknowns: u32,
        /// Non-zeros of the assembled matrix.
        nnz: u32,
        /// Active linear solver.
        solver: String,
        /// Wall-clock time (seconds).
        wall_time: f64,
    },

    /// Timestep completed.
    Step {
        /// Local/global iterations run.
        iterations: u32,
        /// Time spent in local steps (seconds).
        local_time: f64,
        /// Time spent in global steps (seconds).
        global_time: f64,
        /// Vertices moved by the collision pass.
        collisions: u32,
        /// Whether the step had to precompute first.
        reprecomputed: bool,
    },

    /// Active linear solver changed.
    SolverSwitched { from: String, to: String },

    /// Active local-step executor changed.
    LocalStepSwitched { executor: String },
}

impl SimulationEvent {
    pub fn new(step: u64, kind: EventKind) -> Self {
        Self { step, kind }
    }
}
