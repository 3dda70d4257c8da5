//! System assembly for Projective Dynamics.
//!
//! Builds the constant system matrix `A = M/dt² + Σ wc · SᵗS` over every
//! mesh. Meshes are laid out in id order, each occupying a contiguous
//! block of unknowns:
//!
//! ```text
//! | mesh 0 (n0) | mesh 1 (n1) | ... |
//! ```
//!
//! The matrix is N×N (one unknown per vertex) and is shared by the three
//! coordinate axes, so the linear solver is precomputed once and solves
//! three right-hand sides per global step.

use std::collections::BTreeMap;

use glam::Vec3;
use rayon::prelude::*;

use deform_gpu::ProjectionLayout;
use deform_math::sparse::CsrMatrix;
use deform_mesh::DeformableMesh;
use deform_types::ObjectId;

/// Contiguous range of unknowns owned by one mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub id: ObjectId,
    pub offset: usize,
    pub len: usize,
}

impl Block {
    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Lays meshes out in id order. Returns the blocks and the total unknown count.
pub fn layout_blocks(models: &BTreeMap<ObjectId, DeformableMesh>) -> (Vec<Block>, usize) {
    let mut offset = 0;
    let blocks = models
        .iter()
        .map(|(&id, mesh)| {
            let block = Block {
                id,
                offset,
                len: mesh.vertex_count(),
            };
            offset += block.len;
            block
        })
        .collect();
    (blocks, offset)
}

/// Assemble `A = M/dt² + Σ wc · SᵗS`.
///
/// `A` depends only on masses, weights, connectivity and `dt`, never on
/// positions.
pub fn assemble_system_matrix(
    models: &BTreeMap<ObjectId, DeformableMesh>,
    blocks: &[Block],
    total: usize,
    dt: f32,
) -> CsrMatrix {
    let inv_dt2 = 1.0 / (dt * dt);

    let constraint_count: usize = models.values().map(|m| m.constraints().len()).sum();
    let mut triplets: Vec<(usize, usize, f32)> = Vec::with_capacity(total + constraint_count * 4);

    for block in blocks {
        let Some(mesh) = models.get(&block.id) else {
            continue;
        };

        // Mass term: M/dt² → diagonal entries
        for (i, &m) in mesh.masses().iter().enumerate() {
            let row = block.offset + i;
            triplets.push((row, row, m * inv_dt2));
        }

        // Constraint term: Σ wc · SᵗS
        for constraint in mesh.constraints() {
            constraint.contribute_lhs(block.offset, &mut triplets);
        }
    }

    CsrMatrix::from_triplets(total, total, &triplets)
}

/// Flatten every mesh's constraints into the local-step incidence layout.
pub fn projection_layout(
    models: &BTreeMap<ObjectId, DeformableMesh>,
    blocks: &[Block],
    total: usize,
) -> ProjectionLayout {
    ProjectionLayout::build(
        total,
        blocks.iter().filter_map(|block| {
            models
                .get(&block.id)
                .map(|mesh| (block.offset, mesh.constraints()))
        }),
    )
}

/// Inertia term `M/dt² · q_explicit` of the right-hand side.
pub fn inertia_rhs(masses: &[f32], q_explicit: &[Vec3], dt: f32) -> Vec<Vec3> {
    let inv_dt2 = 1.0 / (dt * dt);
    masses
        .par_iter()
        .zip(q_explicit.par_iter())
        .map(|(&m, &q)| (m * inv_dt2) * q)
        .collect()
}
