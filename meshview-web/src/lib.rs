/// meshview web - WASM bindings for the browser page
///
/// The page script owns the DOM and plotly; this module turns uploaded
/// bytes into the JSON view state the script draws from.
use meshview_core::{MeshSelection, Upload, ViewResult, Viewer, ViewerConfig, ACCEPTED_EXTENSIONS};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct MeshViewer {
    viewer: Viewer,
}

#[wasm_bindgen]
impl MeshViewer {
    /// Create a viewer from an optional JSON configuration.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<MeshViewer, JsValue> {
        let config = parse_config(config_json.as_deref())
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(MeshViewer {
            viewer: Viewer::new(config),
        })
    }

    /// Load one upload; failures come back as an error state, never a throw.
    pub fn upload(&self, name: &str, bytes: Vec<u8>) -> String {
        log::debug!("upload {name}: {} bytes", bytes.len());
        let upload = Upload::new(name, bytes);
        self.viewer.handle(Some(&upload)).to_json().to_string()
    }

    /// State shown before any file is chosen
    pub fn prompt(&self) -> String {
        self.viewer.handle(None).to_json().to_string()
    }

    #[wasm_bindgen(js_name = selectMesh)]
    pub fn select_mesh(&mut self, name: String) {
        self.viewer.config_mut().selection = MeshSelection::Named(name);
    }

    #[wasm_bindgen(js_name = mergeMeshes)]
    pub fn merge_meshes(&mut self) {
        self.viewer.config_mut().selection = MeshSelection::Merged;
    }

    #[wasm_bindgen(js_name = firstMesh)]
    pub fn first_mesh(&mut self) {
        self.viewer.config_mut().selection = MeshSelection::First;
    }

    /// Value for the file input's `accept` attribute
    pub fn accept() -> String {
        accept_list()
    }
}

fn parse_config(json: Option<&str>) -> ViewResult<ViewerConfig> {
    match json {
        Some(text) if !text.trim().is_empty() => ViewerConfig::from_json(text),
        _ => Ok(ViewerConfig::default()),
    }
}

fn accept_list() -> String {
    ACCEPTED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info)
        .map_err(|e| JsValue::from_str(&format!("Failed to init logger: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshview_core::FaceColorMode;
    use serde_json::Value;

    fn viewer(config: Option<&str>) -> MeshViewer {
        MeshViewer {
            viewer: Viewer::new(parse_config(config).unwrap()),
        }
    }

    #[test]
    fn test_accept_list() {
        assert_eq!(accept_list(), ".stl,.3mf");
    }

    #[test]
    fn test_parse_config() {
        assert_eq!(parse_config(None).unwrap(), ViewerConfig::default());
        assert_eq!(parse_config(Some("  ")).unwrap(), ViewerConfig::default());
        let config = parse_config(Some(r#"{"face_color_mode": "interpolate"}"#)).unwrap();
        assert_eq!(config.face_color_mode, FaceColorMode::Interpolate);
        assert!(parse_config(Some("{not json")).is_err());
    }

    #[test]
    fn test_prompt_and_failed_upload() {
        let viewer = viewer(None);
        let prompt: Value = serde_json::from_str(&viewer.prompt()).unwrap();
        assert_eq!(prompt["state"], "prompt");

        let failed: Value = serde_json::from_str(&viewer.upload("part.stl", vec![1, 2, 3])).unwrap();
        assert_eq!(failed["state"], "error");
        assert_eq!(failed["error"]["error_type"], "InvalidHeader");
    }

    #[test]
    fn test_selection_methods() {
        let mut viewer = viewer(None);
        viewer.select_mesh("partB".into());
        assert_eq!(
            viewer.viewer.config().selection,
            MeshSelection::Named("partB".into())
        );
        viewer.merge_meshes();
        assert_eq!(viewer.viewer.config().selection, MeshSelection::Merged);
        viewer.first_mesh();
        assert_eq!(viewer.viewer.config().selection, MeshSelection::First);
    }
}
