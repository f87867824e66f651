/// Geometry primitives for uploaded meshes
use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{ViewError, ViewResult};

/// An 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Given to uncolored elements of a mesh whose other elements carry colors
    pub const UNSET: Rgba = Rgba::rgb(102, 102, 102);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (the leading `#` is optional).
    pub fn from_hex(text: &str) -> Option<Self> {
        let hex = text.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    /// CSS `rgb(r,g,b)` form; alpha is dropped.
    pub fn to_css(&self) -> String {
        format!("rgb({},{},{})", self.r, self.g, self.b)
    }

    /// Channel-wise mean of a set of colors, `None` when the set is empty.
    pub fn mean<'a>(colors: impl IntoIterator<Item = &'a Rgba>) -> Option<Self> {
        let mut sum = [0u32; 4];
        let mut count = 0u32;
        for c in colors {
            sum[0] += u32::from(c.r);
            sum[1] += u32::from(c.g);
            sum[2] += u32::from(c.b);
            sum[3] += u32::from(c.a);
            count += 1;
        }
        if count == 0 {
            return None;
        }
        let avg = |s: u32| ((s + count / 2) / count) as u8;
        Some(Self::new(avg(sum[0]), avg(sum[1]), avg(sum[2]), avg(sum[3])))
    }
}

/// Color data attached to a mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MeshColors {
    #[default]
    None,
    /// One color per vertex, same length as `Mesh::vertices`
    Vertex(Vec<Rgba>),
    /// One color per face, same length as `Mesh::faces`
    Face(Vec<Rgba>),
}

impl MeshColors {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Vertex(_) => "vertex",
            Self::Face(_) => "face",
        }
    }
}

/// A triangle given by its three corner positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub vertices: [Point3<f32>; 3],
}

impl Triangle {
    pub fn new(v0: Point3<f32>, v1: Point3<f32>, v2: Point3<f32>) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    fn edge_cross(&self) -> Vector3<f32> {
        let [v0, v1, v2] = self.vertices;
        (v1 - v0).cross(&(v2 - v0))
    }

    /// Face normal from the winding order, `None` for degenerate triangles
    pub fn calculate_normal(&self) -> Option<Vector3<f32>> {
        self.edge_cross().try_normalize(f32::EPSILON)
    }

    pub fn area(&self) -> f64 {
        let [v0, v1, v2] = self.vertices.map(|p| p.cast::<f64>());
        (v1 - v0).cross(&(v2 - v0)).norm() * 0.5
    }
}

/// An indexed triangle mesh with optional colors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Point3<f32>>,
    pub faces: Vec<[u32; 3]>,
    pub colors: MeshColors,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
            colors: MeshColors::None,
        }
    }

    /// Build a mesh and check that every face index and color array fits.
    pub fn from_parts(
        vertices: Vec<Point3<f32>>,
        faces: Vec<[u32; 3]>,
        colors: MeshColors,
    ) -> ViewResult<Self> {
        let mesh = Self {
            vertices,
            faces,
            colors,
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Build an indexed mesh from a triangle soup, sharing bit-identical corners.
    pub fn from_triangles(triangles: &[Triangle], face_colors: Option<Vec<Rgba>>) -> Self {
        let mut mesh = Self::with_capacity(triangles.len() / 2 + 3, triangles.len());
        let mut lookup: HashMap<[u32; 3], u32> = HashMap::with_capacity(triangles.len());

        for triangle in triangles {
            let face = triangle.vertices.map(|p| {
                *lookup.entry(position_key(&p)).or_insert_with(|| {
                    mesh.vertices.push(p);
                    (mesh.vertices.len() - 1) as u32
                })
            });
            mesh.faces.push(face);
        }

        if let Some(colors) = face_colors {
            mesh.colors = MeshColors::Face(colors);
        }
        mesh
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn has_colors(&self) -> bool {
        !self.colors.is_none()
    }

    pub fn triangle(&self, face: usize) -> Triangle {
        let [a, b, c] = self.faces[face];
        Triangle::new(
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        )
    }

    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        (0..self.faces.len()).map(|i| self.triangle(i))
    }

    /// Axis-aligned bounds as `(min, max)`, `None` for a mesh without vertices
    pub fn bounds(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(lo, hi), p| {
            (lo.inf(p), hi.sup(p))
        }))
    }

    pub fn validate(&self) -> ViewResult<()> {
        let count = self.vertices.len();
        if let Some((face, index)) = self.faces.iter().enumerate().find_map(|(i, f)| {
            f.iter().find(|&&v| v as usize >= count).map(|&v| (i, v))
        }) {
            return Err(ViewError::invalid_content(format!(
                "face {face} references vertex {index} but only {count} vertices exist"
            )));
        }
        match &self.colors {
            MeshColors::Vertex(c) if c.len() != count => Err(ViewError::invalid_content(
                format!("{} vertex colors for {count} vertices", c.len()),
            )),
            MeshColors::Face(c) if c.len() != self.faces.len() => {
                Err(ViewError::invalid_content(format!(
                    "{} face colors for {} faces",
                    c.len(),
                    self.faces.len()
                )))
            }
            _ => Ok(()),
        }
    }

    /// Merge bit-identical vertex positions.
    ///
    /// Vertex-colored meshes are left alone since two coincident corners may
    /// carry different colors.
    pub fn weld(&mut self) {
        if matches!(self.colors, MeshColors::Vertex(_)) {
            return;
        }
        let mut lookup: HashMap<[u32; 3], u32> = HashMap::with_capacity(self.vertices.len());
        let mut vertices = Vec::with_capacity(self.vertices.len());
        let remap: Vec<u32> = self
            .vertices
            .iter()
            .map(|p| {
                *lookup.entry(position_key(p)).or_insert_with(|| {
                    vertices.push(*p);
                    (vertices.len() - 1) as u32
                })
            })
            .collect();

        for face in &mut self.faces {
            *face = face.map(|v| remap[v as usize]);
        }
        self.vertices = vertices;
    }

    /// Append another mesh, offsetting its face indices.
    ///
    /// Colors survive only when both sides carry the same kind.
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertices.len() as u32;
        let was_empty = self.vertices.is_empty() && self.faces.is_empty();

        self.colors = match (std::mem::take(&mut self.colors), &other.colors) {
            (_, theirs) if was_empty => theirs.clone(),
            (MeshColors::Vertex(mut ours), MeshColors::Vertex(theirs)) => {
                ours.extend_from_slice(theirs);
                MeshColors::Vertex(ours)
            }
            (MeshColors::Face(mut ours), MeshColors::Face(theirs)) => {
                ours.extend_from_slice(theirs);
                MeshColors::Face(ours)
            }
            _ => MeshColors::None,
        };

        self.vertices.extend_from_slice(&other.vertices);
        self.faces
            .extend(other.faces.iter().map(|f| f.map(|v| v + offset)));
    }

    /// Axis-aligned cube centered on the origin with outward winding
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        let vertices = vec![
            Point3::new(-h, -h, -h),
            Point3::new(h, -h, -h),
            Point3::new(h, h, -h),
            Point3::new(-h, h, -h),
            Point3::new(-h, -h, h),
            Point3::new(h, -h, h),
            Point3::new(h, h, h),
            Point3::new(-h, h, h),
        ];
        let faces = vec![
            // Bottom (-Z)
            [0, 2, 1],
            [0, 3, 2],
            // Top (+Z)
            [4, 5, 6],
            [4, 6, 7],
            // Front (-Y)
            [0, 1, 5],
            [0, 5, 4],
            // Back (+Y)
            [2, 3, 7],
            [2, 7, 6],
            // Left (-X)
            [0, 4, 7],
            [0, 7, 3],
            // Right (+X)
            [1, 2, 6],
            [1, 6, 5],
        ];
        Self {
            vertices,
            faces,
            colors: MeshColors::None,
        }
    }
}

/// Hash key for a position; `-0.0` and `0.0` share a key.
fn position_key(p: &Point3<f32>) -> [u32; 3] {
    let bits = |v: f32| if v == 0.0 { 0 } else { v.to_bits() };
    [bits(p.x), bits(p.y), bits(p.z)]
}
