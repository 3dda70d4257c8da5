//! Solver lifecycle state.
//!
//! ```text
//! Uninitialized ──precompute_a──▶ MatrixAssembled ──precompute──▶ Precomputed
//!                                        ▲                             │
//!                                        └──────── Stale(reason) ◀─────┘
//! ```
//!
//! `step` only runs in `Precomputed`; from any other state it precomputes first.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why previously derived solver state can no longer be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StaleReason {
    /// A model was added, removed, or had its constraints or masses changed.
    ModelsChanged,
    /// The active linear solver was switched.
    AlgorithmChanged,
    /// The timestep changed.
    TimestepChanged,
    /// The local step moved between CPU and GPU.
    LocalStepChanged,
}

/// Where the solver is in its precompute lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolverState {
    /// No system matrix.
    Uninitialized,
    /// System matrix assembled; linear solver not yet precomputed.
    MatrixAssembled,
    /// Ready to step.
    Precomputed,
    /// Derived state exists but is out of date.
    Stale(StaleReason),
}

impl SolverState {
    /// True if `step` can run without precomputing first.
    pub fn is_ready(self) -> bool {
        self == Self::Precomputed
    }
}

impl fmt::Display for SolverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::MatrixAssembled => f.write_str("matrix assembled"),
            Self::Precomputed => f.write_str("precomputed"),
            Self::Stale(reason) => write!(f, "stale ({reason:?})"),
        }
    }
}
