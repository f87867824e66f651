/// One pass from an upload to what the page shows
use log::{info, warn};
use serde_json::{json, Value};

use crate::config::ViewerConfig;
use crate::error::ViewResult;
use crate::geometry::Mesh;
use crate::info::{ErrorPanel, MeshInfo};
use crate::loader::load_selected;
use crate::render::{build_descriptor, RenderDescriptor};
use crate::upload::Upload;

/// Shown while no file has been uploaded
pub const PROMPT: &str = "Please upload an STL or 3MF file to view";

/// A successfully loaded upload
#[derive(Debug, Clone)]
pub struct View {
    pub mesh: Mesh,
    pub figure: RenderDescriptor,
    pub info: MeshInfo,
}

/// What the page displays
#[derive(Debug, Clone)]
pub enum ViewState {
    /// No file yet: prompt only, no viewport or metadata
    Prompt,
    Rendered(Box<View>),
    Failed(ErrorPanel),
}

impl ViewState {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }

    /// JSON handed to the page script
    pub fn to_json(&self) -> Value {
        match self {
            Self::Prompt => json!({ "state": "prompt", "message": PROMPT }),
            Self::Rendered(view) => json!({
                "state": "rendered",
                "figure": view.figure,
                "info": view.info,
                "sidebar": view.info.lines(),
            }),
            Self::Failed(panel) => json!({
                "state": "error",
                "banner": panel.banner,
                "error": panel,
                "debug": panel.lines(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Viewer {
    config: ViewerConfig,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ViewerConfig {
        &mut self.config
    }

    /// Load, select, and describe one upload.
    pub fn view(&self, upload: &Upload) -> ViewResult<View> {
        let file_type = upload.file_type()?;
        let selected = load_selected(upload, &self.config)?;
        let figure = build_descriptor(&selected.mesh, &self.config);
        let info = MeshInfo::new(file_type, &selected);
        info!(
            "rendered {} with {:?} coloring",
            upload.name, figure.color_source
        );
        Ok(View {
            mesh: selected.mesh,
            figure,
            info,
        })
    }

    /// Top-level handler: every failure becomes an error panel.
    pub fn handle(&self, upload: Option<&Upload>) -> ViewState {
        let Some(upload) = upload else {
            return ViewState::Prompt;
        };
        match self.view(upload) {
            Ok(view) => ViewState::Rendered(Box::new(view)),
            Err(err) => {
                warn!("failed to load {}: {err}", upload.name);
                ViewState::Failed(ErrorPanel::new(&upload.extension(), &err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stl::tests::{binary_stl, cube_triangles};

    #[test]
    fn test_no_upload_prompts() {
        let state = Viewer::default().handle(None);
        assert!(matches!(state, ViewState::Prompt));
        let json = state.to_json();
        assert_eq!(json["state"], "prompt");
        assert_eq!(json["message"], PROMPT);
        assert!(json.get("figure").is_none());
        assert!(json.get("sidebar").is_none());
    }

    #[test]
    fn test_rendered_state() {
        let upload = Upload::new("cube.stl", binary_stl(&cube_triangles(), &[]));
        let state = Viewer::default().handle(Some(&upload));
        assert!(state.is_rendered());
        let json = state.to_json();
        assert_eq!(json["state"], "rendered");
        assert_eq!(json["info"]["vertex_count"], 8);
        assert_eq!(json["figure"]["data"][0]["i"].as_array().unwrap().len(), 12);
        assert_eq!(json["sidebar"][0], "File type: STL");
    }

    #[test]
    fn test_failure_becomes_panel() {
        let upload = Upload::new("model.obj", b"o cube".to_vec());
        let state = Viewer::default().handle(Some(&upload));
        let ViewState::Failed(panel) = &state else {
            panic!("expected failure");
        };
        assert_eq!(panel.file_type, "obj");
        assert_eq!(panel.error_type, "UnsupportedFormat");
        assert!(panel.banner.starts_with("Error loading OBJ file:"));
        assert_eq!(state.to_json()["state"], "error");
    }
}
