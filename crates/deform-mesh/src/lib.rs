//! # deform-mesh
//!
//! Deformable meshes for Projective Dynamics.
//!
//! ## Key Types
//!
//! - [`DeformableMesh`] — rest/current geometry, masses, velocities,
//!   the constraint set and the fixed-vertex set of one simulated object.
//! - [`Constraint`] — tagged constraint variant (positional pin or edge
//!   strain) with its local projection and its `wc·SᵗS` system-matrix term.
//! - [`Elements`] — tetrahedral or triangular connectivity, plus edge and
//!   boundary queries in [`topology`].
//! - Procedural generators for tests and demos (quad grid, tetrahedral box).

pub mod constraint;
pub mod generators;
pub mod mesh;
pub mod topology;

pub use constraint::{Constraint, EdgeStrainConstraint, PositionalConstraint};
pub use mesh::DeformableMesh;
pub use topology::Elements;
