//! Mesh connectivity and topology queries.
//!
//! Edges are canonicalised as `[min, max]` and returned in ascending
//! order, so the constraint set derived from them is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Element connectivity of a deformable mesh.
///
/// The two variants may have different element arity; edges are
/// recovered from whichever one the mesh was built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Elements {
    Tetrahedra(Vec<[u32; 4]>),
    Triangles(Vec<[u32; 3]>),
}

impl Elements {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Tetrahedra(t) => t.len(),
            Self::Triangles(f) => f.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vertices per element (4 or 3).
    pub fn arity(&self) -> usize {
        match self {
            Self::Tetrahedra(_) => 4,
            Self::Triangles(_) => 3,
        }
    }

    /// Every element as a slice of vertex indices.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &[u32]> + '_> {
        match self {
            Self::Tetrahedra(t) => Box::new(t.iter().map(|e| e.as_slice())),
            Self::Triangles(f) => Box::new(f.iter().map(|e| e.as_slice())),
        }
    }

    /// Deduplicated undirected edges, each `[min, max]`, ascending.
    ///
    /// Every pair of vertices in an element is an edge: 6 per
    /// tetrahedron, 3 per triangle.
    pub fn edges(&self) -> Vec<[u32; 2]> {
        let mut edges = BTreeSet::new();
        for element in self.iter() {
            for (k, &a) in element.iter().enumerate() {
                for &b in &element[k + 1..] {
                    edges.insert(canonical_edge(a, b));
                }
            }
        }
        edges.into_iter().collect()
    }
}

#[inline]
fn canonical_edge(a: u32, b: u32) -> [u32; 2] {
    if a < b { [a, b] } else { [b, a] }
}

/// Surface triangles of a tetrahedral mesh.
///
/// A face belongs to the surface when exactly one tetrahedron uses it.
/// Faces keep the winding they have in their tetrahedron, which is
/// outward-facing for positively oriented tetrahedra.
pub fn boundary_facets(tets: &[[u32; 4]]) -> Vec<[u32; 3]> {
    let mut faces: BTreeMap<[u32; 3], (usize, [u32; 3])> = BTreeMap::new();
    for &[a, b, c, d] in tets {
        for face in [[a, c, b], [a, b, d], [a, d, c], [b, c, d]] {
            let mut key = face;
            key.sort_unstable();
            faces.entry(key).or_insert((0, face)).0 += 1;
        }
    }
    faces
        .into_values()
        .filter(|&(count, _)| count == 1)
        .map(|(_, face)| face)
        .collect()
}

/// Vertices lying on a border edge of a triangle surface, ascending.
///
/// A border edge is an edge used by exactly one triangle. A closed
/// surface (for example the boundary of a tetrahedral solid) has none.
pub fn border_vertices(faces: &[[u32; 3]]) -> Vec<u32> {
    let mut edge_use: BTreeMap<[u32; 2], u32> = BTreeMap::new();
    for &[a, b, c] in faces {
        for (v0, v1) in [(a, b), (b, c), (c, a)] {
            *edge_use.entry(canonical_edge(v0, v1)).or_default() += 1;
        }
    }

    let border: BTreeSet<u32> = edge_use
        .into_iter()
        .filter(|&(_, count)| count == 1)
        .flat_map(|(edge, _)| edge)
        .collect();
    border.into_iter().collect()
}
