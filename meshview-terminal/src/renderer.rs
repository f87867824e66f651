/// ASCII rasterizer for terminal rendering
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use meshview_core::{Camera, Mesh, MeshColors, Rgba, Triangle};
use nalgebra::{Matrix4, Point3, Vector3};
use std::io::Write;

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Lowest brightness given to a lit face so dark sides stay visible
const AMBIENT: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    character: char,
    color: Color,
}

const EMPTY: Cell = Cell {
    character: ' ',
    color: Color::Reset,
};

/// One color per face, derived from whatever colors the mesh carries
pub fn face_tints(mesh: &Mesh) -> Vec<Option<Rgba>> {
    match &mesh.colors {
        MeshColors::None => vec![None; mesh.face_count()],
        MeshColors::Face(colors) => colors.iter().copied().map(Some).collect(),
        MeshColors::Vertex(colors) => mesh
            .faces
            .iter()
            .map(|face| Rgba::mean(face.iter().map(|&v| &colors[v as usize])))
            .collect(),
    }
}

/// ASCII renderer that converts 3D meshes to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    cells: Vec<Cell>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            cells: vec![EMPTY; size],
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.cells.fill(EMPTY);
    }

    /// Character at a cell, for inspection
    pub fn char_at(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.cells[y * self.width + x].character)
    }

    pub fn render_mesh(
        &mut self,
        mesh: &Mesh,
        tints: &[Option<Rgba>],
        model_matrix: &Matrix4<f32>,
        camera: &Camera,
    ) {
        let light = (camera.position - camera.target)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::z);

        for (face, tint) in mesh.faces.iter().zip(tints) {
            let corners = face.map(|v| model_matrix.transform_point(&mesh.vertices[v as usize]));
            self.render_triangle(&corners, *tint, &light, camera);
        }
    }

    fn render_triangle(
        &mut self,
        corners: &[Point3<f32>; 3],
        tint: Option<Rgba>,
        light: &Vector3<f32>,
        camera: &Camera,
    ) {
        // Project vertices to screen space; corners are already in world space
        let identity = Matrix4::identity();
        let mut screen_coords = [(0.0, 0.0, 0.0); 3];
        for (slot, corner) in screen_coords.iter_mut().zip(corners) {
            match camera.project_to_screen(corner, &identity, self.width as u32, self.height as u32)
            {
                Some(coords) => *slot = coords,
                None => return, // Triangle is clipped
            }
        }

        // Two-sided lighting: uploaded meshes do not always agree on winding
        let Some(normal) = Triangle::new(corners[0], corners[1], corners[2]).calculate_normal()
        else {
            return;
        };
        let brightness = AMBIENT + (1.0 - AMBIENT) * normal.dot(light).abs();

        // Map brightness to character
        let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32) as usize;
        let char_index = char_index.min(LUMINOSITY_RAMP.len() - 1).max(1);
        let cell = Cell {
            character: LUMINOSITY_RAMP[char_index],
            color: shade(tint, brightness, LUMINOSITY_RAMP[char_index]),
        };

        self.rasterize_triangle(&screen_coords, cell);
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], cell: Cell) {
        let [v0, v1, v2] = *coords;

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i32;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i32;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i32;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                let Some((w0, w1, w2)) =
                    barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    self.depth_buffer[idx] = depth;
                    self.cells[idx] = cell;
                }
            }
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for row in self.cells.chunks(self.width.max(1)) {
            for cell in row {
                writer.queue(SetForegroundColor(cell.color))?;
                writer.queue(Print(cell.character))?;
            }
            writer.queue(Print("\r\n"))?;
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Terminal color for a face: its tint scaled by brightness, or a
/// ramp-based gray/cyan for uncolored meshes
fn shade(tint: Option<Rgba>, brightness: f32, character: char) -> Color {
    match tint {
        Some(c) => {
            let scale = |v: u8| (v as f32 * brightness).round().clamp(0.0, 255.0) as u8;
            Color::Rgb {
                r: scale(c.r),
                g: scale(c.g),
                b: scale(c.b),
            }
        }
        None => match character {
            ' ' | '.' | ':' => Color::DarkGrey,
            '-' | '=' => Color::Grey,
            '+' | '*' => Color::White,
            _ => Color::Cyan,
        },
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
