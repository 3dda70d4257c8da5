//! # deform-solver
//!
//! Projective Dynamics time stepping over a collection of deformable meshes.
//!
//! ## Key Types
//!
//! - [`Solver`] — Model collection, precompute lifecycle and the step loop
//! - [`SolverConfig`] — Timestep, iteration counts and strategy selection
//! - [`SolverState`] — Precompute lifecycle (`Uninitialized` → `Precomputed`)
//! - [`StepReport`] — What a single step did

pub mod assembly;
pub mod config;
pub mod solver;
pub mod state;

pub use config::SolverConfig;
pub use solver::{ExternalForces, Solver, StepReport};
pub use state::{SolverState, StaleReason};
