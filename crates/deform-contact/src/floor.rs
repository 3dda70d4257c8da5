//! Floor collision.
//!
//! An infinite horizontal half-space below `y = center.y`. Vertices
//! closer than [`COLLISION_EPSILON`] to the plane (or below it) are
//! lifted onto `y = center.y + COLLISION_EPSILON`.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use deform_types::constants::COLLISION_EPSILON;

use crate::primitive::Primitive;

/// Floor half-space at a fixed Y height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    center: Vec3,
}

impl Floor {
    /// Creates a floor at the given height.
    pub fn new(height: f32) -> Self {
        Self {
            center: Vec3::new(0.0, height, 0.0),
        }
    }

    /// Plane height (Y coordinate).
    pub fn height(&self) -> f32 {
        self.center.y
    }
}

impl Default for Floor {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Primitive for Floor {
    fn collision_handle(&self, pos: Vec3) -> Option<Vec3> {
        let limit = self.center.y + COLLISION_EPSILON;
        (pos.y < limit).then(|| Vec3::new(pos.x, limit, pos.z))
    }

    fn center(&self) -> Vec3 {
        self.center
    }

    /// Only the height is taken from `center`; the floor is unbounded in X and Z.
    fn set_center(&mut self, center: Vec3) {
        self.center.y = center.y;
    }

    fn name(&self) -> &str {
        "floor"
    }
}
