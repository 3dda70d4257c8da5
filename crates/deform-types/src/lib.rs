//! # deform-types
//!
//! Shared identifiers, error types, and simulation constants
//! for the deform Projective Dynamics simulator.
//!
//! This crate has no domain logic. It defines the vocabulary
//! every other deform crate speaks.

pub mod constants;
pub mod error;
pub mod ids;

pub use error::{DeformError, DeformResult};
pub use ids::{ColliderId, ObjectId};
