//! Projective Dynamics constraints.
//!
//! Every constraint `c` has a selection matrix `S_c` and a weight `wc`.
//! It contributes the constant term `wc · S_cᵗ S_c` to the system matrix
//! and, every local step, the term `wc · S_cᵗ p_c` to the right-hand side,
//! where `p_c` is the projection of the current positions onto the
//! constraint's admissible set.
//!
//! | Variant | `SᵗS` | `p_c` |
//! |---|---|---|
//! | Positional | `1` on `(v, v)` | pin target |
//! | EdgeStrain | `[[1, -1], [-1, 1]]` on `(v0, v1)` | `L · normalize(q[v1] - q[v0])` |

use glam::Vec3;
use serde::{Deserialize, Serialize};

use deform_types::constants::DEGENERATE_LENGTH_THRESHOLD;

/// Pins one vertex to a target position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionalConstraint {
    pub vertex: u32,
    pub target: Vec3,
    pub wc: f32,
}

/// Keeps the length of edge `(v0, v1)` at `rest_length`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeStrainConstraint {
    pub v0: u32,
    pub v1: u32,
    pub rest_length: f32,
    pub wc: f32,
}

impl EdgeStrainConstraint {
    /// Target edge vector `L · normalize(q[v1] - q[v0])`.
    ///
    /// A collapsed edge has no direction and projects to zero.
    #[inline]
    pub fn projection(&self, q: &[Vec3]) -> Vec3 {
        edge_projection(q[self.v0 as usize], q[self.v1 as usize], self.rest_length)
    }
}

/// `L · normalize(to - from)`, or zero if the edge is degenerate.
#[inline]
pub fn edge_projection(from: Vec3, to: Vec3, rest_length: f32) -> Vec3 {
    let d = to - from;
    let len = d.length();
    if len > DEGENERATE_LENGTH_THRESHOLD {
        d * (rest_length / len)
    } else {
        Vec3::ZERO
    }
}

/// A constraint on one deformable mesh. Vertex indices are mesh-local.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    Positional(PositionalConstraint),
    EdgeStrain(EdgeStrainConstraint),
}

impl Constraint {
    pub fn positional(vertex: u32, target: Vec3, wc: f32) -> Self {
        Self::Positional(PositionalConstraint { vertex, target, wc })
    }

    pub fn edge_strain(v0: u32, v1: u32, rest_length: f32, wc: f32) -> Self {
        Self::EdgeStrain(EdgeStrainConstraint {
            v0,
            v1,
            rest_length,
            wc,
        })
    }

    /// Constraint weight `wc`.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Positional(c) => c.wc,
            Self::EdgeStrain(c) => c.wc,
        }
    }

    /// Vertices this constraint couples.
    pub fn vertices(&self) -> Vec<u32> {
        match self {
            Self::Positional(c) => vec![c.vertex],
            Self::EdgeStrain(c) => vec![c.v0, c.v1],
        }
    }

    /// Returns true if `vertex` is one of the constrained vertices.
    pub fn involves(&self, vertex: u32) -> bool {
        match self {
            Self::Positional(c) => c.vertex == vertex,
            Self::EdgeStrain(c) => c.v0 == vertex || c.v1 == vertex,
        }
    }

    /// Pushes the `wc · SᵗS` entries as `(row, col, value)` triplets,
    /// shifting vertex indices by `offset`.
    pub fn contribute_lhs(&self, offset: usize, triplets: &mut Vec<(usize, usize, f32)>) {
        match self {
            Self::Positional(c) => {
                let i = offset + c.vertex as usize;
                triplets.push((i, i, c.wc));
            }
            Self::EdgeStrain(c) => {
                let i = offset + c.v0 as usize;
                let j = offset + c.v1 as usize;
                triplets.push((i, i, c.wc));
                triplets.push((i, j, -c.wc));
                triplets.push((j, i, -c.wc));
                triplets.push((j, j, c.wc));
            }
        }
    }

    /// Local projection `p_c` of the current positions `q`.
    pub fn project(&self, q: &[Vec3]) -> Vec3 {
        match self {
            Self::Positional(c) => c.target,
            Self::EdgeStrain(c) => c.projection(q),
        }
    }

    /// Scatters `wc · Sᵗ p_c` into `b` (indexed like `q`).
    pub fn contribute(&self, q: &[Vec3], b: &mut [Vec3]) {
        let p = self.project(q);
        match self {
            Self::Positional(c) => {
                b[c.vertex as usize] += c.wc * p;
            }
            Self::EdgeStrain(c) => {
                b[c.v0 as usize] -= c.wc * p;
                b[c.v1 as usize] += c.wc * p;
            }
        }
    }
}
