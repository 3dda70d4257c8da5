//! Per-vertex incidence layout for the local step.
//!
//! The reference local step scatters each constraint into the vertices it
//! touches. Scattering races when run in parallel, so the layout inverts
//! it: every vertex stores the list of constraint terms that land on it,
//! and the local step becomes a race-free gather.
//!
//! Both edge endpoints gather the same expression. For vertex `v` and the
//! opposite endpoint `o` of an edge with rest length `L`:
//!
//! ```text
//! b[v] += wc · L · normalize(q[v] - q[o])
//! ```
//!
//! which equals `+wc·p` at `v1` and `-wc·p` at `v0` for
//! `p = L · normalize(q[v1] - q[v0])`.
//!
//! Offsets are CSR-style: the incidences of vertex `i` are
//! `incidences[offsets[i]..offsets[i + 1]]`.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use deform_mesh::constraint::edge_projection;
use deform_mesh::Constraint;

/// Incidence kind: pin towards `target`.
pub const KIND_POSITIONAL: u32 = 0;
/// Incidence kind: edge strain towards the opposite endpoint `other`.
pub const KIND_EDGE: u32 = 1;

/// One constraint term gathered by one vertex.
///
/// Must exactly match the WGSL `Incidence` struct layout:
/// ```text
/// struct Incidence { tx: f32, ty: f32, tz: f32, weight: f32,
///                    other: u32, kind: u32, rest_length: f32, _pad: u32 }
/// ```
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuIncidence {
    pub tx: f32,
    pub ty: f32,
    pub tz: f32,
    pub weight: f32,
    /// Global index of the opposite edge endpoint (edges only).
    pub other: u32,
    pub kind: u32,
    pub rest_length: f32,
    _pad: u32,
}

impl GpuIncidence {
    fn positional(target: Vec3, weight: f32) -> Self {
        Self {
            tx: target.x,
            ty: target.y,
            tz: target.z,
            weight,
            other: 0,
            kind: KIND_POSITIONAL,
            rest_length: 0.0,
            _pad: 0,
        }
    }

    fn edge(other: u32, rest_length: f32, weight: f32) -> Self {
        Self {
            tx: 0.0,
            ty: 0.0,
            tz: 0.0,
            weight,
            other,
            kind: KIND_EDGE,
            rest_length,
            _pad: 0,
        }
    }

    #[inline]
    fn target(&self) -> Vec3 {
        Vec3::new(self.tx, self.ty, self.tz)
    }
}

/// Flattened constraint incidences of every simulated vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectionLayout {
    offsets: Vec<u32>,
    incidences: Vec<GpuIncidence>,
}

impl ProjectionLayout {
    /// Builds the layout for `vertex_count` global unknowns.
    ///
    /// Each block is `(offset, constraints)`: the mesh occupying unknowns
    /// `offset..` and its mesh-local constraints. Incidences of a vertex
    /// keep constraint order, so the result is deterministic.
    pub fn build<'a, I>(vertex_count: usize, blocks: I) -> Self
    where
        I: IntoIterator<Item = (usize, &'a [Constraint])>,
    {
        let mut per_vertex: Vec<Vec<GpuIncidence>> = vec![Vec::new(); vertex_count];
        for (offset, constraints) in blocks {
            let global = |v: u32| offset + v as usize;
            for constraint in constraints {
                match constraint {
                    Constraint::Positional(c) => {
                        per_vertex[global(c.vertex)].push(GpuIncidence::positional(c.target, c.wc));
                    }
                    Constraint::EdgeStrain(c) => {
                        let (i, j) = (global(c.v0), global(c.v1));
                        per_vertex[i].push(GpuIncidence::edge(j as u32, c.rest_length, c.wc));
                        per_vertex[j].push(GpuIncidence::edge(i as u32, c.rest_length, c.wc));
                    }
                }
            }
        }

        let mut offsets = Vec::with_capacity(vertex_count + 1);
        let mut incidences = Vec::with_capacity(per_vertex.iter().map(Vec::len).sum());
        offsets.push(0);
        for list in per_vertex {
            incidences.extend(list);
            offsets.push(incidences.len() as u32);
        }

        Self { offsets, incidences }
    }

    /// Number of vertices covered.
    pub fn vertex_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    pub fn incidences(&self) -> &[GpuIncidence] {
        &self.incidences
    }

    /// Local-step contribution `Σ wc · Sᵗ p_c` landing on `vertex`.
    #[inline]
    pub fn gather(&self, vertex: usize, q: &[Vec3]) -> Vec3 {
        let range = self.offsets[vertex] as usize..self.offsets[vertex + 1] as usize;
        let qv = q[vertex];
        self.incidences[range]
            .iter()
            .map(|inc| match inc.kind {
                KIND_POSITIONAL => inc.weight * inc.target(),
                _ => inc.weight * edge_projection(q[inc.other as usize], qv, inc.rest_length),
            })
            .sum()
    }
}
