/// Viewer configuration
use serde::{Deserialize, Serialize};

use crate::error::{ViewError, ViewResult};
use crate::scene::MeshSelection;

/// How per-face colors reach the renderer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceColorMode {
    /// One flat color per triangle
    #[default]
    Flat,
    /// Average incident face colors onto each vertex
    Interpolate,
}

/// Coloring for meshes that carry no colors of their own
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightColoring {
    /// Z coordinate through a multi-stop colorscale
    #[default]
    Gradient,
    /// Single fallback color
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub face_color_mode: FaceColorMode,
    pub height_coloring: HeightColoring,
    pub selection: MeshSelection,
    /// Weld coincident vertices of indexed formats (STL is always welded)
    pub merge_vertices: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            face_color_mode: FaceColorMode::default(),
            height_coloring: HeightColoring::default(),
            selection: MeshSelection::default(),
            merge_vertices: true,
        }
    }
}

impl ViewerConfig {
    /// Parse a JSON object; missing fields keep their defaults.
    pub fn from_json(text: &str) -> ViewResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| ViewError::invalid_content(format!("invalid viewer configuration: {e}")))
    }
}
