//! Strongly-typed identifiers for simulation entities.
//!
//! Newtype wrappers keep deformable-object ids and collider ids
//! from being mixed up at call sites.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a deformable mesh inside a solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub i32);

/// Identifier of a rigid collider in a collider registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColliderId(pub i32);

impl From<i32> for ObjectId {
    fn from(val: i32) -> Self {
        Self(val)
    }
}

impl From<i32> for ColliderId {
    fn from(val: i32) -> Self {
        Self(val)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ColliderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
