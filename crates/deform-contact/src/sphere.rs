//! Analytical sphere collision.
//!
//! Vertices strictly inside the sphere (grown by [`COLLISION_EPSILON`])
//! are pushed radially onto its surface.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use deform_types::constants::COLLISION_EPSILON;

use crate::primitive::Primitive;

/// Squared distance below which a point counts as sitting on the centre.
const CENTER_TOLERANCE_SQ: f32 = 1e-12;

/// Analytical sphere collider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    /// Center of the sphere.
    pub center: Vec3,
    /// Radius of the sphere.
    pub radius: f32,
}

impl Sphere {
    /// Creates a new sphere collider.
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

impl Primitive for Sphere {
    fn collision_handle(&self, pos: Vec3) -> Option<Vec3> {
        let surface = self.radius + COLLISION_EPSILON;
        let offset = pos - self.center;
        let dist2 = offset.length_squared();

        if dist2 >= surface * surface {
            return None;
        }
        if dist2 <= CENTER_TOLERANCE_SQ {
            // No usable normal at the centre: push up.
            return Some(self.center + Vec3::Y * surface);
        }
        Some(self.center + offset / dist2.sqrt() * surface)
    }

    fn center(&self) -> Vec3 {
        self.center
    }

    fn set_center(&mut self, center: Vec3) {
        self.center = center;
    }

    fn name(&self) -> &str {
        "sphere"
    }
}
