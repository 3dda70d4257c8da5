//! Deformable mesh: geometry, per-vertex state and constraints of one object.
//!
//! Positions, velocities and masses are stored per vertex (`Vec3` / `f32`).
//! The mesh owns its constraint set; the solver only reads it when it
//! assembles the system matrix and runs the local step.
//!
//! Every mutation that changes the system matrix (constraints, fixed set,
//! masses) bumps [`DeformableMesh::revision`], which the solver compares
//! against the revision it last precomputed with.

use std::collections::BTreeSet;

use glam::Vec3;
use rayon::prelude::*;
use tracing::debug;

use deform_contact::ColliderRegistry;
use deform_types::constants::DEFAULT_VERTEX_MASS;
use deform_types::{DeformError, DeformResult, ObjectId};

use crate::constraint::Constraint;
use crate::topology::{self, Elements};

/// One simulated deformable object.
#[derive(Debug, Clone)]
pub struct DeformableMesh {
    id: ObjectId,
    /// Rest positions.
    p0: Vec<Vec3>,
    /// Current positions.
    p: Vec<Vec3>,
    /// Per-vertex velocity.
    v: Vec<Vec3>,
    /// Per-vertex mass.
    m: Vec<f32>,
    elements: Elements,
    /// Surface triangles, for rendering only.
    boundary_facets: Vec<[u32; 3]>,
    constraints: Vec<Constraint>,
    fixed_vertices: BTreeSet<u32>,
    n_edges: usize,
    revision: u64,
}

impl DeformableMesh {
    /// Builds a mesh from tetrahedral elements.
    ///
    /// `boundary_facets` are kept for display only; pass
    /// [`topology::boundary_facets`] of `tets` to derive them.
    pub fn from_tetrahedra(
        positions: Vec<Vec3>,
        tets: Vec<[u32; 4]>,
        boundary_facets: Vec<[u32; 3]>,
        id: ObjectId,
    ) -> DeformResult<Self> {
        Self::new(positions, Elements::Tetrahedra(tets), boundary_facets, id)
    }

    /// Builds a mesh from triangle elements; the triangles double as the
    /// boundary facets.
    pub fn from_triangles(
        positions: Vec<Vec3>,
        faces: Vec<[u32; 3]>,
        id: ObjectId,
    ) -> DeformResult<Self> {
        let facets = faces.clone();
        Self::new(positions, Elements::Triangles(faces), facets, id)
    }

    fn new(
        positions: Vec<Vec3>,
        elements: Elements,
        boundary_facets: Vec<[u32; 3]>,
        id: ObjectId,
    ) -> DeformResult<Self> {
        validate(&positions, &elements, &boundary_facets)?;

        let n = positions.len();
        debug!(
            %id,
            vertices = n,
            elements = elements.len(),
            "deformable mesh created"
        );

        Ok(Self {
            id,
            p0: positions.clone(),
            p: positions,
            v: vec![Vec3::ZERO; n],
            m: vec![DEFAULT_VERTEX_MASS; n],
            elements,
            boundary_facets,
            constraints: Vec::new(),
            fixed_vertices: BTreeSet::new(),
            n_edges: 0,
            revision: 0,
        })
    }

    // --- Queries ---

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.p.is_empty()
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.p.len()
    }

    /// Current positions.
    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.p
    }

    #[inline]
    pub fn rest_positions(&self) -> &[Vec3] {
        &self.p0
    }

    #[inline]
    pub fn velocities(&self) -> &[Vec3] {
        &self.v
    }

    #[inline]
    pub fn masses(&self) -> &[f32] {
        &self.m
    }

    #[inline]
    pub fn elements(&self) -> &Elements {
        &self.elements
    }

    /// Boundary facets (display only).
    #[inline]
    pub fn faces(&self) -> &[[u32; 3]] {
        &self.boundary_facets
    }

    /// Full constraint list in insertion order.
    #[inline]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn is_vertex_fixed(&self, vertex: u32) -> bool {
        self.fixed_vertices.contains(&vertex)
    }

    pub fn fixed_vertices(&self) -> &BTreeSet<u32> {
        &self.fixed_vertices
    }

    /// Undirected edges derived from the elements, `[min, max]`, ascending.
    pub fn edges(&self) -> Vec<[u32; 2]> {
        self.elements.edges()
    }

    /// Edge count recorded by the last [`Self::set_edge_strain_constraints`].
    pub fn n_edges(&self) -> usize {
        self.n_edges
    }

    /// Counter bumped by every mutation that changes the system matrix.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Vertices on border edges of the boundary facets.
    pub fn border_vertices(&self) -> Vec<u32> {
        topology::border_vertices(&self.boundary_facets)
    }

    /// Debug-only invariant check.
    pub fn dimension_check(&self) {
        debug_assert_eq!(self.m.len(), self.p.len(), "mass/position count mismatch");
        debug_assert_eq!(self.v.len(), self.p.len(), "velocity/position count mismatch");
        debug_assert_eq!(self.p0.len(), self.p.len(), "rest/current count mismatch");
    }

    // --- State updates ---

    pub fn set_positions(&mut self, positions: Vec<Vec3>) -> DeformResult<()> {
        self.check_len("positions", positions.len())?;
        self.p = positions;
        Ok(())
    }

    pub fn set_velocities(&mut self, velocities: Vec<Vec3>) -> DeformResult<()> {
        self.check_len("velocities", velocities.len())?;
        self.v = velocities;
        Ok(())
    }

    /// Commits a simulated step.
    pub fn update_positions_and_velocities(
        &mut self,
        positions: Vec<Vec3>,
        velocities: Vec<Vec3>,
    ) -> DeformResult<()> {
        self.check_len("positions", positions.len())?;
        self.check_len("velocities", velocities.len())?;
        self.p = positions;
        self.v = velocities;
        Ok(())
    }

    // --- Constraint commands ---

    /// Zeroes velocities and drops every constraint and fixed vertex.
    pub fn reset_constraints(&mut self) {
        self.v.fill(Vec3::ZERO);
        self.constraints.clear();
        self.fixed_vertices.clear();
        self.n_edges = 0;
        self.revision += 1;
    }

    /// Flips the fixed state of each listed vertex.
    ///
    /// A vertex that was free gets pinned at its current position with
    /// weight `wc`; a vertex that was fixed is released and its positional
    /// constraint removed. Duplicated indices are toggled once.
    pub fn toggle_vertices_fixed<I>(&mut self, vertices: I, wc: f32) -> DeformResult<()>
    where
        I: IntoIterator<Item = u32>,
    {
        check_weight(wc)?;
        let vertices: BTreeSet<u32> = vertices.into_iter().collect();
        if let Some(&bad) = vertices.iter().find(|&&v| v as usize >= self.p.len()) {
            return Err(DeformError::InvalidInput(format!(
                "vertex {bad} is out of range (vertex count: {})",
                self.p.len()
            )));
        }
        if vertices.is_empty() {
            return Ok(());
        }

        for vertex in vertices {
            if self.fixed_vertices.remove(&vertex) {
                self.constraints
                    .retain(|c| !matches!(c, Constraint::Positional(pc) if pc.vertex == vertex));
            } else {
                self.fixed_vertices.insert(vertex);
                self.constraints
                    .push(Constraint::positional(vertex, self.p[vertex as usize], wc));
            }
        }
        self.revision += 1;
        Ok(())
    }

    /// Replaces all edge strain constraints with one per element edge,
    /// each holding the edge at its rest length.
    pub fn set_edge_strain_constraints(&mut self, wc: f32) -> DeformResult<()> {
        check_weight(wc)?;
        let edges = self.edges();

        self.constraints
            .retain(|c| !matches!(c, Constraint::EdgeStrain(_)));
        self.constraints.reserve(edges.len());
        for &[v0, v1] in &edges {
            let rest_length = self.p0[v0 as usize].distance(self.p0[v1 as usize]);
            self.constraints
                .push(Constraint::edge_strain(v0, v1, rest_length, wc));
        }

        self.n_edges = edges.len();
        self.revision += 1;
        debug!(id = %self.id, edges = self.n_edges, wc, "edge strain constraints set");
        Ok(())
    }

    /// Assigns the same mass to every vertex.
    ///
    /// Fails with masses unchanged if `mass` is not a positive finite
    /// number or the mesh has no vertices.
    pub fn apply_mass_per_vertex(&mut self, mass: f32) -> DeformResult<()> {
        if !(mass.is_finite() && mass > 0.0) {
            return Err(DeformError::InvalidInput(format!(
                "mass per vertex must be positive and finite, got {mass}"
            )));
        }
        if self.is_empty() {
            return Err(DeformError::InvalidInput(
                "cannot assign mass to an empty mesh".into(),
            ));
        }
        self.m.fill(mass);
        self.revision += 1;
        self.dimension_check();
        Ok(())
    }

    // --- Per-step operations ---

    /// Scatters every constraint's `wc · Sᵗ p_c` into `b` (same indexing
    /// as `q`). Reference form of the local step.
    pub fn local_step_contribution(&self, q: &[Vec3], b: &mut [Vec3]) {
        for constraint in &self.constraints {
            constraint.contribute(q, b);
        }
    }

    /// Moves every candidate position out of the colliders.
    ///
    /// Colliders are applied in registration order; each sees the output of
    /// the previous one. Returns the number of corrected vertices.
    pub fn resolve_collision(&self, colliders: &ColliderRegistry, positions: &mut [Vec3]) -> usize {
        if colliders.is_empty() {
            return 0;
        }
        positions
            .par_iter_mut()
            .map(|pos| match colliders.resolve(*pos) {
                Some(corrected) => {
                    *pos = corrected;
                    1
                }
                None => 0,
            })
            .sum()
    }

    fn check_len(&self, what: &str, len: usize) -> DeformResult<()> {
        if len != self.p.len() {
            return Err(DeformError::InvalidInput(format!(
                "{what} length ({len}) != vertex count ({})",
                self.p.len()
            )));
        }
        Ok(())
    }
}

fn check_weight(wc: f32) -> DeformResult<()> {
    if wc.is_finite() && wc >= 0.0 {
        Ok(())
    } else {
        Err(DeformError::InvalidInput(format!(
            "constraint weight must be non-negative and finite, got {wc}"
        )))
    }
}

/// Validates mesh integrity.
///
/// Checks:
/// - All positions are finite
/// - Element and facet indices are within bounds
/// - No degenerate elements (repeated vertex indices)
fn validate(
    positions: &[Vec3],
    elements: &Elements,
    boundary_facets: &[[u32; 3]],
) -> DeformResult<()> {
    let n = positions.len();

    if let Some(i) = positions.iter().position(|p| !p.is_finite()) {
        return Err(DeformError::InvalidMesh(format!(
            "vertex {i} has a non-finite position"
        )));
    }

    for (e, element) in elements.iter().enumerate() {
        if let Some(&idx) = element.iter().find(|&&idx| idx as usize >= n) {
            return Err(DeformError::InvalidMesh(format!(
                "element {e} references vertex {idx} (vertex count: {n})"
            )));
        }
        for (k, a) in element.iter().enumerate() {
            if element[k + 1..].contains(a) {
                return Err(DeformError::InvalidMesh(format!(
                    "element {e} has repeated vertex indices: {element:?}"
                )));
            }
        }
    }

    for (f, facet) in boundary_facets.iter().enumerate() {
        if let Some(&idx) = facet.iter().find(|&&idx| idx as usize >= n) {
            return Err(DeformError::InvalidMesh(format!(
                "boundary facet {f} references vertex {idx} (vertex count: {n})"
            )));
        }
    }

    Ok(())
}
