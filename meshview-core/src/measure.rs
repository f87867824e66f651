/// Scalar properties of a mesh: volume, surface area, watertightness
use hashbrown::HashMap;
use serde::Serialize;

use crate::geometry::Mesh;

/// Derived properties shown in the sidebar
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeshMeasures {
    pub volume: f64,
    pub surface_area: f64,
    pub is_watertight: bool,
    pub boundary_edges: usize,
    pub non_manifold_edges: usize,
}

impl MeshMeasures {
    pub fn of(mesh: &Mesh) -> Self {
        let edges = EdgeCounts::build(&mesh.faces);
        Self {
            volume: signed_volume(mesh),
            surface_area: surface_area(mesh),
            is_watertight: edges.is_watertight(),
            boundary_edges: edges.boundary_count(),
            non_manifold_edges: edges.non_manifold_count(),
        }
    }
}

/// Signed volume by summing origin tetrahedra.
///
/// Positive for closed meshes wound counter-clockwise seen from outside,
/// negative for inside-out ones. Meaningless for open meshes.
pub fn signed_volume(mesh: &Mesh) -> f64 {
    mesh.triangles()
        .map(|tri| {
            let [a, b, c] = tri.vertices.map(|p| p.coords.cast::<f64>());
            a.dot(&b.cross(&c))
        })
        .sum::<f64>()
        / 6.0
}

pub fn surface_area(mesh: &Mesh) -> f64 {
    mesh.triangles().map(|tri| tri.area()).sum()
}

/// True when every edge is shared by exactly two faces.
///
/// A mesh without faces is never watertight.
pub fn is_watertight(mesh: &Mesh) -> bool {
    EdgeCounts::build(&mesh.faces).is_watertight()
}

/// Number of faces using each undirected edge
struct EdgeCounts {
    counts: HashMap<(u32, u32), u32>,
}

impl EdgeCounts {
    fn build(faces: &[[u32; 3]]) -> Self {
        let mut counts: HashMap<(u32, u32), u32> = HashMap::with_capacity(faces.len() * 3 / 2);
        for &[a, b, c] in faces {
            for edge in [normalize_edge(a, b), normalize_edge(b, c), normalize_edge(c, a)] {
                *counts.entry(edge).or_default() += 1;
            }
        }
        Self { counts }
    }

    fn is_watertight(&self) -> bool {
        !self.counts.is_empty() && self.counts.values().all(|&n| n == 2)
    }

    fn boundary_count(&self) -> usize {
        self.counts.values().filter(|&&n| n == 1).count()
    }

    fn non_manifold_count(&self) -> usize {
        self.counts.values().filter(|&&n| n > 2).count()
    }
}

#[inline]
fn normalize_edge(v0: u32, v1: u32) -> (u32, u32) {
    if v0 < v1 {
        (v0, v1)
    } else {
        (v1, v0)
    }
}
