//! Procedural mesh generators for demos and testing.
//!
//! These generators produce deterministic, resolution-configurable
//! meshes. Triangle windings face +Z; tetrahedra are positively oriented.

use glam::Vec3;

use deform_types::{DeformResult, ObjectId};

use crate::mesh::DeformableMesh;
use crate::topology::{self, Elements};

/// Raw buffers of a generated mesh.
#[derive(Debug, Clone)]
pub struct GeneratedMesh {
    pub positions: Vec<Vec3>,
    pub elements: Elements,
    pub boundary_facets: Vec<[u32; 3]>,
}

impl GeneratedMesh {
    /// Number of generated vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Builds a [`DeformableMesh`] from the generated buffers.
    pub fn into_mesh(self, id: ObjectId) -> DeformResult<DeformableMesh> {
        match self.elements {
            Elements::Triangles(faces) => DeformableMesh::from_triangles(self.positions, faces, id),
            Elements::Tetrahedra(tets) => {
                DeformableMesh::from_tetrahedra(self.positions, tets, self.boundary_facets, id)
            }
        }
    }
}

/// Generates a flat rectangular quad grid in the XY plane.
///
/// The grid spans `[-width/2, width/2]` in X and `[-height/2, height/2]` in Y,
/// centered at the origin at Z=0. Row 0 is the top edge (`y = height/2`).
///
/// # Arguments
/// - `cols` — Number of quads along X (vertex count = cols + 1).
/// - `rows` — Number of quads along Y (vertex count = rows + 1).
/// - `width` — Total width in meters.
/// - `height` — Total height in meters.
///
/// # Example
/// ```
/// use deform_mesh::generators::quad_grid;
/// let grid = quad_grid(2, 2, 1.0, 1.0);
/// assert_eq!(grid.vertex_count(), 9);  // 3×3 vertices
/// assert_eq!(grid.elements.len(), 8);  // 2×2 quads × 2 tris each
/// ```
pub fn quad_grid(cols: usize, rows: usize, width: f32, height: f32) -> GeneratedMesh {
    let verts_x = cols + 1;
    let verts_y = rows + 1;

    let half_w = width / 2.0;
    let half_h = height / 2.0;

    let mut positions = Vec::with_capacity(verts_x * verts_y);
    for j in 0..verts_y {
        for i in 0..verts_x {
            let u = i as f32 / cols.max(1) as f32;
            let v = j as f32 / rows.max(1) as f32;
            positions.push(Vec3::new(-half_w + u * width, half_h - v * height, 0.0));
        }
    }

    // Two triangles per quad
    let mut faces = Vec::with_capacity(cols * rows * 2);
    for j in 0..rows {
        for i in 0..cols {
            let top_left = (j * verts_x + i) as u32;
            let top_right = top_left + 1;
            let bot_left = top_left + verts_x as u32;
            let bot_right = bot_left + 1;

            faces.push([top_left, bot_left, top_right]);
            faces.push([top_right, bot_left, bot_right]);
        }
    }

    GeneratedMesh {
        positions,
        boundary_facets: faces.clone(),
        elements: Elements::Triangles(faces),
    }
}

/// Generates an axis-aligned box of tetrahedra.
///
/// The box spans `origin .. origin + size` and is split into
/// `nx × ny × nz` cells of six tetrahedra each (Kuhn subdivision, so
/// neighbouring cells share conforming faces).
pub fn tet_box(nx: usize, ny: usize, nz: usize, origin: Vec3, size: Vec3) -> GeneratedMesh {
    let (vx, vy, vz) = (nx + 1, ny + 1, nz + 1);
    let index = |i: usize, j: usize, k: usize| ((k * vy + j) * vx + i) as u32;

    let cell = size / Vec3::new(nx.max(1) as f32, ny.max(1) as f32, nz.max(1) as f32);
    let mut positions = Vec::with_capacity(vx * vy * vz);
    for k in 0..vz {
        for j in 0..vy {
            for i in 0..vx {
                positions.push(origin + cell * Vec3::new(i as f32, j as f32, k as f32));
            }
        }
    }

    // Each Kuhn tet walks from corner 000 to corner 111 along one axis order.
    const AXIS_ORDERS: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    let mut tets = Vec::with_capacity(nx * ny * nz * 6);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                for order in AXIS_ORDERS {
                    let mut corner = [i, j, k];
                    let mut tet = [index(i, j, k); 4];
                    for (slot, axis) in order.into_iter().enumerate() {
                        corner[axis] += 1;
                        tet[slot + 1] = index(corner[0], corner[1], corner[2]);
                    }
                    if signed_volume(&positions, tet) < 0.0 {
                        tet.swap(2, 3);
                    }
                    tets.push(tet);
                }
            }
        }
    }

    GeneratedMesh {
        boundary_facets: topology::boundary_facets(&tets),
        positions,
        elements: Elements::Tetrahedra(tets),
    }
}

fn signed_volume(positions: &[Vec3], [a, b, c, d]: [u32; 4]) -> f32 {
    let p = |v: u32| positions[v as usize];
    (p(b) - p(a)).cross(p(c) - p(a)).dot(p(d) - p(a)) / 6.0
}
