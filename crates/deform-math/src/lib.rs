//! # deform-math
//!
//! Linear algebra for the deform simulator.
//!
//! Provides:
//! - Re-exports of `glam` types (`Vec3`, ...)
//! - Sparse matrix representation (CSR) with serial and rayon mat-vec
//! - The [`LinearSystemSolver`] strategy family used by the global step:
//!   direct sparse Cholesky, parallel Jacobi, and accelerated Jacobi

pub mod a_jacobi;
pub mod cholesky;
pub mod jacobi;
pub mod linear_solver;
pub mod sparse;

pub use a_jacobi::AJacobi;
pub use cholesky::CholeskyDirect;
pub use jacobi::ParallelJacobi;
pub use linear_solver::{AccelerationOrder, LinearSolverKind, LinearSystemSolver};
pub use sparse::CsrMatrix;

// Re-export glam types as the canonical math types.
pub use glam::{Vec2, Vec3, Vec4};
