//! # deform-gpu
//!
//! Local-step executors for the deform Projective Dynamics solver.
//!
//! The local step projects every constraint and accumulates
//! `Σ wc · Sᵗ p_c` per vertex. It is embarrassingly parallel, so it is
//! offered behind one [`LocalSolver`] trait with two implementations:
//! - [`CpuLocalSolver`] — rayon gather over vertices (always available)
//! - [`WgpuLocalSolver`] — the same gather as a wgpu compute shader
//!
//! Both consume a [`ProjectionLayout`], the per-vertex incidence list
//! flattened from all meshes' constraints, and must agree numerically.

pub mod backend;
pub mod context;
pub mod layout;
pub mod wgpu_local;

pub use backend::{CpuLocalSolver, LocalSolver};
pub use context::GpuContext;
pub use layout::{GpuIncidence, ProjectionLayout};
pub use wgpu_local::WgpuLocalSolver;
