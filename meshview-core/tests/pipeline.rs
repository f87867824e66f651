//! End-to-end checks from uploaded bytes to the page state.

use std::io::{Cursor, Write};

use approx::assert_relative_eq;
use meshview_core::{
    ColorSource, FaceColorMode, Mesh, MeshSelection, Upload, ViewState, Viewer, ViewerConfig,
};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// ASCII STL of the unit cube, one facet per triangle of `Mesh::cube`
fn ascii_cube() -> String {
    let cube = Mesh::cube(1.0);
    let mut text = String::from("solid cube\n");
    for tri in cube.triangles() {
        text.push_str("  facet normal 0 0 0\n    outer loop\n");
        for p in tri.vertices {
            text.push_str(&format!("      vertex {} {} {}\n", p.x, p.y, p.z));
        }
        text.push_str("    endloop\n  endfacet\n");
    }
    text.push_str("endsolid cube\n");
    text
}

fn binary_cube(attribute: u16) -> Vec<u8> {
    let cube = Mesh::cube(1.0);
    let mut data = vec![0u8; 80];
    data.extend_from_slice(&(cube.face_count() as u32).to_le_bytes());
    for tri in cube.triangles() {
        data.extend_from_slice(&[0u8; 12]);
        for p in tri.vertices {
            for v in [p.x, p.y, p.z] {
                data.extend_from_slice(&v.to_le_bytes());
            }
        }
        data.extend_from_slice(&attribute.to_le_bytes());
    }
    data
}

fn three_mf(resources: &str, objects: &str) -> Vec<u8> {
    let model = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02" xmlns:m="http://schemas.microsoft.com/3dmanufacturing/material/2015/02">
<resources>{resources}{objects}</resources>
<build><item objectid="1"/></build>
</model>"#
    );
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    zip.start_file("3D/3dmodel.model", options).unwrap();
    zip.write_all(model.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

const VERTICES: &str = r#"<vertices><vertex x="0" y="0" z="0"/><vertex x="1" y="0" z="0"/><vertex x="0" y="1" z="0"/><vertex x="0" y="0" z="1"/></vertices>"#;

fn object(id: u32, name: &str, attrs: &str, triangles: &str) -> String {
    format!(
        r#"<object id="{id}" name="{name}" type="model" {attrs}><mesh>{VERTICES}<triangles>{triangles}</triangles></mesh></object>"#
    )
}

const TETRA: &str = r#"<triangle v1="0" v2="2" v3="1"/><triangle v1="0" v2="1" v3="3"/><triangle v1="0" v2="3" v3="2"/><triangle v1="1" v2="2" v3="3"/>"#;

fn rendered(state: ViewState) -> Box<meshview_core::View> {
    match state {
        ViewState::Rendered(view) => view,
        ViewState::Failed(panel) => panic!("unexpected failure: {}", panel.banner),
        ViewState::Prompt => panic!("unexpected prompt"),
    }
}

#[test]
fn ascii_stl_cube_reports_counts_and_measures() {
    let upload = Upload::new("Cube.STL", ascii_cube());
    let view = rendered(Viewer::default().handle(Some(&upload)));

    assert_eq!(view.info.vertex_count, 8);
    assert_eq!(view.info.face_count, 12);
    assert_relative_eq!(view.info.volume, 1.0, epsilon = 1e-6);
    assert_relative_eq!(view.info.surface_area, 6.0, epsilon = 1e-6);
    assert!(view.info.is_watertight);
    assert_eq!(view.info.file_type, "STL");
    assert_eq!(view.figure.color_source, ColorSource::HeightGradient);
}

#[test]
fn binary_stl_colored_facets() {
    let red = 0x8000 | (0x1f << 10);
    let upload = Upload::new("red.stl", binary_cube(red));

    let flat = rendered(Viewer::default().handle(Some(&upload)));
    let trace = &flat.figure.data[0];
    assert!(flat.info.has_colors);
    assert_eq!(trace.facecolor.as_ref().unwrap().len(), 12);
    assert_eq!(trace.facecolor.as_ref().unwrap()[0], "rgb(255,0,0)");

    let config = ViewerConfig {
        face_color_mode: FaceColorMode::Interpolate,
        ..ViewerConfig::default()
    };
    let smooth = rendered(Viewer::new(config).handle(Some(&upload)));
    let colors = smooth.figure.data[0].vertexcolor.as_ref().unwrap();
    assert_eq!(colors.len(), smooth.info.vertex_count);
    assert!(colors.iter().all(|c| c == "rgb(255,0,0)"));
}

#[test]
fn scene_defaults_to_first_mesh() {
    let objects = format!(
        "{}{}",
        object(1, "partA", "", TETRA),
        object(2, "partB", "", r#"<triangle v1="0" v2="1" v3="2"/>"#)
    );
    let upload = Upload::new("parts.3mf", three_mf("", &objects));
    let view = rendered(Viewer::default().handle(Some(&upload)));

    assert_eq!(view.info.scene_name.as_deref(), Some("partA"));
    assert_eq!(view.info.face_count, 4);
    assert_eq!(view.info.vertex_count, 4);
    assert!(view.info.is_watertight);
    assert_eq!(view.info.available, vec!["partA", "partB"]);
    assert_eq!(view.info.lines()[0], "Loaded from scene: partA");
}

#[test]
fn scene_selection_by_name_and_merge() {
    let objects = format!(
        "{}{}",
        object(1, "partA", "", TETRA),
        object(2, "partB", "", r#"<triangle v1="0" v2="1" v3="2"/>"#)
    );
    let upload = Upload::new("parts.3mf", three_mf("", &objects));

    let mut viewer = Viewer::default();
    viewer.config_mut().selection = MeshSelection::Named("partB".into());
    let view = rendered(viewer.handle(Some(&upload)));
    assert_eq!(view.info.face_count, 1);
    assert!(!view.info.is_watertight);
    assert_eq!(view.info.boundary_edges, 3);
    assert!(view.info.lines().contains(&"Boundary edges: 3".to_string()));

    viewer.config_mut().selection = MeshSelection::Merged;
    let view = rendered(viewer.handle(Some(&upload)));
    assert_eq!(view.info.face_count, 5);
    assert_eq!(view.info.scene_name.as_deref(), Some("merged"));

    viewer.config_mut().selection = MeshSelection::Named("partC".into());
    let ViewState::Failed(panel) = viewer.handle(Some(&upload)) else {
        panic!("missing mesh should fail");
    };
    assert_eq!(panel.error_type, "MeshNotFound");
}

#[test]
fn three_mf_vertex_colors_are_vertex_shaped() {
    let resources = r##"<m:colorgroup id="9"><m:color color="#FF0000"/><m:color color="#0000FF"/></m:colorgroup>"##;
    let triangles = r#"<triangle v1="0" v2="2" v3="1" pid="9" p1="0" p2="1" p3="0"/><triangle v1="0" v2="1" v3="3" pid="9" p1="0"/><triangle v1="0" v2="3" v3="2" pid="9" p1="1"/><triangle v1="1" v2="2" v3="3" pid="9" p1="1"/>"#;
    let upload = Upload::new(
        "painted.3mf",
        three_mf(resources, &object(1, "painted", "", triangles)),
    );
    let view = rendered(Viewer::default().handle(Some(&upload)));

    assert_eq!(view.figure.color_source, ColorSource::VertexColors);
    let colors = view.figure.data[0].vertexcolor.as_ref().unwrap();
    assert_eq!(colors.len(), view.info.vertex_count);
    assert_eq!(view.info.material_count, 2);
    assert!(view.info.has_colors);
}

#[test]
fn mismatched_extensions_surface_error_banner() {
    let viewer = Viewer::default();

    let stl_as_3mf = Upload::new("cube.3mf", binary_cube(0));
    let ViewState::Failed(panel) = viewer.handle(Some(&stl_as_3mf)) else {
        panic!("STL bytes should not parse as 3MF");
    };
    assert!(panel.banner.starts_with("Error loading 3MF file:"));
    assert_eq!(panel.error_type, "ZipError");

    let zip_as_stl = Upload::new("parts.stl", three_mf("", &object(1, "a", "", TETRA)));
    let state = viewer.handle(Some(&zip_as_stl));
    assert!(matches!(state, ViewState::Failed(_)));

    let unknown = Upload::new("model.ply", b"ply\nformat ascii 1.0\n".to_vec());
    let ViewState::Failed(panel) = viewer.handle(Some(&unknown)) else {
        panic!("unknown extension should fail");
    };
    assert_eq!(panel.error_type, "UnsupportedFormat");
    assert_eq!(panel.file_type, "ply");
}

#[test]
fn no_upload_shows_only_prompt() {
    let json = Viewer::default().handle(None).to_json();
    assert_eq!(json["state"], "prompt");
    assert_eq!(json.as_object().unwrap().len(), 2);
}
