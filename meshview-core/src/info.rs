/// Sidebar content: mesh metadata and the error debug panel
use serde::Serialize;

use crate::error::ViewError;
use crate::measure::MeshMeasures;
use crate::scene::Selected;
use crate::upload::FileType;

/// Metadata shown next to the viewport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshInfo {
    pub file_type: String,
    pub scene_name: Option<String>,
    pub available: Vec<String>,
    pub vertex_count: usize,
    pub face_count: usize,
    pub volume: f64,
    pub surface_area: f64,
    pub has_colors: bool,
    pub color_kind: &'static str,
    pub material_count: usize,
    pub is_watertight: bool,
    /// Edges used by one face only
    pub boundary_edges: usize,
    /// Edges shared by more than two faces
    pub non_manifold_edges: usize,
}

impl MeshInfo {
    pub fn new(file_type: FileType, selected: &Selected) -> Self {
        let mesh = &selected.mesh;
        let measures = MeshMeasures::of(mesh);
        Self {
            file_type: file_type.label(),
            scene_name: selected.scene_name.clone(),
            available: selected.available.clone(),
            vertex_count: mesh.vertex_count(),
            face_count: mesh.face_count(),
            volume: measures.volume,
            surface_area: measures.surface_area,
            has_colors: mesh.has_colors(),
            color_kind: mesh.colors.kind(),
            material_count: selected.material_count,
            is_watertight: measures.is_watertight,
            boundary_edges: measures.boundary_edges,
            non_manifold_edges: measures.non_manifold_edges,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(name) = &self.scene_name {
            lines.push(format!("Loaded from scene: {name}"));
        }
        lines.push(format!("File type: {}", self.file_type));
        lines.push(format!(
            "Number of vertices: {}",
            group_thousands(self.vertex_count)
        ));
        lines.push(format!("Number of faces: {}", group_thousands(self.face_count)));
        lines.push(format!("Volume: {:.2} cubic units", self.volume));
        lines.push(format!("Surface area: {:.2} square units", self.surface_area));
        lines.push(format!("Has colors/materials: {}", yes_no(self.has_colors)));
        if self.material_count > 0 {
            lines.push(format!("Distinct materials: {}", self.material_count));
        }
        lines.push(format!("Is watertight: {}", yes_no(self.is_watertight)));
        if self.boundary_edges > 0 {
            lines.push(format!(
                "Boundary edges: {}",
                group_thousands(self.boundary_edges)
            ));
        }
        if self.non_manifold_edges > 0 {
            lines.push(format!(
                "Non-manifold edges: {}",
                group_thousands(self.non_manifold_edges)
            ));
        }
        if self.available.len() > 1 {
            lines.push(format!("Meshes in file: {}", self.available.join(", ")));
        }
        lines
    }
}

/// Banner and debug details for a failed upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPanel {
    pub banner: String,
    pub file_type: String,
    pub error_type: String,
    pub message: String,
}

impl ErrorPanel {
    pub fn new(extension: &str, error: &ViewError) -> Self {
        Self {
            banner: format!(
                "Error loading {} file: {error}",
                extension.to_uppercase()
            ),
            file_type: extension.to_string(),
            error_type: error.kind_name().to_string(),
            message: error.to_string(),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        vec![
            "Debug information:".to_string(),
            format!("File type: {}", self.file_type),
            format!("Error type: {}", self.error_type),
            format!("Full error: {}", self.message),
        ]
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

/// `1234567` → `1,234,567`
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
