//! Error types for the deform simulator.
//!
//! All crates return `DeformResult<T>` from fallible operations.

use thiserror::Error;

use crate::ids::ObjectId;

/// Unified error type for the simulator.
#[derive(Debug, Error)]
pub enum DeformError {
    /// Mesh data is malformed or inconsistent.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// A caller-supplied argument is out of range (mass, weight, vertex index...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No model is registered under this id.
    #[error("Unknown object id {0}")]
    UnknownObject(ObjectId),

    /// The system matrix could not be factorized or split (singular, not SPD, zero diagonal).
    #[error("Factorization failed: {0}")]
    Factorization(String),

    /// A NaN or infinity showed up in solver output.
    #[error("Non-finite values produced during {stage}")]
    NonFinite {
        /// Which stage of the step produced them.
        stage: &'static str,
    },

    /// Iterative solver residual blew up.
    #[error("Solver did not converge after {iterations} iterations (residual: {residual:.2e})")]
    SolverDivergence {
        iterations: u32,
        residual: f64,
    },

    /// A solve was requested before `precompute`.
    #[error("Linear solver used before precompute: {0}")]
    NotPrecomputed(String),

    /// GPU backend error.
    #[error("GPU error: {0}")]
    Gpu(String),
}

/// Convenience alias for `Result<T, DeformError>`.
pub type DeformResult<T> = Result<T, DeformError>;
