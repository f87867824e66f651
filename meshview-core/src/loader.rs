/// Parse an upload into the mesh to display
use log::{debug, info};

use crate::config::ViewerConfig;
use crate::error::ViewResult;
use crate::scene::{Loaded, Selected};
use crate::stl::parse_stl;
use crate::threemf::parse_3mf;
use crate::upload::{FileType, Upload};

/// Parse the upload according to its extension.
pub fn load(upload: &Upload) -> ViewResult<Loaded> {
    let file_type = upload.file_type()?;
    debug!(
        "loading {} ({} bytes) as {:?}",
        upload.name,
        upload.bytes.len(),
        file_type
    );
    match file_type {
        FileType::Stl => parse_stl(&upload.bytes).map(Loaded::Single),
        FileType::ThreeMf => parse_3mf(&upload.bytes).map(Loaded::Scene),
    }
}

/// Parse the upload and pick one mesh as the configuration asks.
pub fn load_selected(upload: &Upload, config: &ViewerConfig) -> ViewResult<Selected> {
    let mut selected = load(upload)?.select(&config.selection)?;
    if config.merge_vertices {
        let before = selected.mesh.vertex_count();
        selected.mesh.weld();
        if selected.mesh.vertex_count() != before {
            debug!(
                "welded {} duplicate vertices",
                before - selected.mesh.vertex_count()
            );
        }
    }
    info!(
        "{}: {} vertices, {} faces, colors={}",
        upload.name,
        selected.mesh.vertex_count(),
        selected.mesh.face_count(),
        selected.mesh.colors.kind()
    );
    Ok(selected)
}
