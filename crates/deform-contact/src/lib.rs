//! # deform-contact
//!
//! Static rigid collision primitives for the deform simulator.
//!
//! A collider is anything implementing [`Primitive`]: a pure geometric
//! query that, given a candidate vertex position, either leaves it alone
//! or returns a corrected position outside the collider. Colliders are
//! kept in a [`ColliderRegistry`] and applied after the local/global
//! iterations of every step.

pub mod floor;
pub mod primitive;
pub mod registry;
pub mod sphere;

pub use floor::Floor;
pub use primitive::Primitive;
pub use registry::ColliderRegistry;
pub use sphere::Sphere;
