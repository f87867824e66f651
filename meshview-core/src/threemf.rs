/// 3MF (3D Manufacturing Format) reader
use std::io::{Cursor, Read, Seek};
use std::str::FromStr;

use hashbrown::{HashMap, HashSet};
use log::{debug, info, warn};
use nalgebra::Point3;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{ViewError, ViewResult};
use crate::geometry::{Mesh, MeshColors, Rgba};
use crate::scene::Scene;

/// Conventional locations of the model part
const MODEL_PATHS: [&str; 3] = ["3D/3dmodel.model", "3d/3dmodel.model", "3D/3DModel.model"];

/// Suffix of the relationship type pointing at the model part
const MODEL_RELATIONSHIP: &str = "/3dmodel";

/// Parse a 3MF archive held in memory into a scene of named meshes.
///
/// The model part (normally `3D/3dmodel.model`) is XML. Every `<object>`
/// holding a `<mesh>` becomes one entry of the scene, in document order.
/// Colors come from `<basematerials>` (`displaycolor`) and `<colorgroup>`
/// (`color`) resources referenced through `pid`/`p1`/`p2`/`p3` on triangles
/// or `pid`/`pindex` on the object. Uniform corners give face colors,
/// differing corners give vertex colors. Build items, components and
/// textures are not interpreted.
pub fn parse_3mf(data: &[u8]) -> ViewResult<Scene> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    let content = read_model_file(&mut archive)?;
    parse_model(&content)
}

/// Locate the model part: package relationship first, then known paths,
/// then any `.model` entry.
fn read_model_file<R: Read + Seek>(archive: &mut ZipArchive<R>) -> ViewResult<String> {
    let mut candidates: Vec<String> = Vec::new();
    if let Some(rels) = read_entry(archive, "_rels/.rels")? {
        candidates.extend(start_part(&rels));
    }
    candidates.extend(MODEL_PATHS.iter().map(|p| p.to_string()));
    candidates.extend(
        archive
            .file_names()
            .filter(|name| name.to_ascii_lowercase().ends_with(".model"))
            .map(String::from),
    );

    for candidate in &candidates {
        if let Some(content) = read_entry(archive, candidate)? {
            debug!("3MF model part: {candidate}");
            return Ok(content);
        }
    }

    Err(ViewError::invalid_content(
        "3MF archive does not contain a model file",
    ))
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> ViewResult<Option<String>> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut content = String::new();
            file.read_to_string(&mut content)?;
            Ok(Some(content))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Target of the 3D model relationship in `_rels/.rels`, without the leading `/`.
fn start_part(rels: &str) -> Option<String> {
    let mut reader = Reader::from_str(rels);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let kind = attr(&e, b"Type").ok().flatten()?;
                if kind.ends_with(MODEL_RELATIONSHIP) {
                    let target = attr(&e, b"Target").ok().flatten()?;
                    return Some(target.trim_start_matches('/').to_string());
                }
            }
            Ok(Event::Eof) => return None,
            Err(e) => {
                warn!("ignoring unreadable 3MF relationships: {e}");
                return None;
            }
            _ => {}
        }
    }
}

/// Parse the model XML content.
pub(crate) fn parse_model(content: &str) -> ViewResult<Scene> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut parser = ModelParser::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => parser.start(&e)?,
            Event::Empty(e) => {
                parser.start(&e)?;
                parser.end(e.local_name().as_ref());
            }
            Event::End(e) => parser.end(e.local_name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
    }
    parser.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Section {
    #[default]
    Other,
    Vertices,
    Triangles,
}

#[derive(Debug)]
struct RawTriangle {
    vertices: [u32; 3],
    pid: Option<u32>,
    properties: [Option<u32>; 3],
}

#[derive(Debug, Default)]
struct RawObject {
    id: u32,
    name: Option<String>,
    pid: Option<u32>,
    pindex: Option<u32>,
    has_mesh: bool,
    vertices: Vec<Point3<f32>>,
    triangles: Vec<RawTriangle>,
}

#[derive(Debug, Default)]
struct ModelParser {
    groups: HashMap<u32, Vec<Rgba>>,
    group: Option<(u32, Vec<Rgba>)>,
    object: Option<RawObject>,
    objects: Vec<RawObject>,
    section: Section,
}

impl ModelParser {
    fn start(&mut self, e: &BytesStart<'_>) -> ViewResult<()> {
        match e.local_name().as_ref() {
            b"basematerials" | b"colorgroup" => {
                let id = required(e, b"id")?;
                self.group = Some((id, Vec::new()));
            }
            b"base" | b"color" => {
                let key: &[u8] = if e.local_name().as_ref() == b"base" {
                    b"displaycolor"
                } else {
                    b"color"
                };
                if let Some((id, colors)) = self.group.as_mut() {
                    let text = attr(e, key)?.unwrap_or_default();
                    let color = Rgba::from_hex(&text).unwrap_or_else(|| {
                        warn!("material group {id}: unreadable color '{text}'");
                        Rgba::UNSET
                    });
                    colors.push(color);
                }
            }
            b"object" => {
                self.object = Some(RawObject {
                    id: required(e, b"id")?,
                    name: attr(e, b"name")?.filter(|n| !n.trim().is_empty()),
                    pid: optional(e, b"pid")?,
                    pindex: optional(e, b"pindex")?,
                    ..RawObject::default()
                });
            }
            b"mesh" => {
                if let Some(object) = self.object.as_mut() {
                    object.has_mesh = true;
                }
            }
            b"vertices" => self.section = Section::Vertices,
            b"triangles" => self.section = Section::Triangles,
            b"vertex" if self.section == Section::Vertices => {
                if let Some(object) = self.object.as_mut() {
                    object.vertices.push(Point3::new(
                        required(e, b"x")?,
                        required(e, b"y")?,
                        required(e, b"z")?,
                    ));
                }
            }
            b"triangle" if self.section == Section::Triangles => {
                if let Some(object) = self.object.as_mut() {
                    object.triangles.push(RawTriangle {
                        vertices: [
                            required(e, b"v1")?,
                            required(e, b"v2")?,
                            required(e, b"v3")?,
                        ],
                        pid: optional(e, b"pid")?,
                        properties: [
                            optional(e, b"p1")?,
                            optional(e, b"p2")?,
                            optional(e, b"p3")?,
                        ],
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, local_name: &[u8]) {
        match local_name {
            b"basematerials" | b"colorgroup" => {
                if let Some((id, colors)) = self.group.take() {
                    self.groups.insert(id, colors);
                }
            }
            b"object" => {
                if let Some(object) = self.object.take() {
                    if object.has_mesh {
                        self.objects.push(object);
                    } else {
                        debug!("skipping 3MF object {} without a mesh", object.id);
                    }
                }
            }
            b"vertices" | b"triangles" => self.section = Section::Other,
            _ => {}
        }
    }

    fn finish(self) -> ViewResult<Scene> {
        let mut scene = Scene::new();
        for object in self.objects {
            let name = object
                .name
                .clone()
                .unwrap_or_else(|| format!("object_{}", object.id));
            let faces = object.triangles.iter().map(|t| t.vertices).collect();
            let mut mesh = Mesh::from_parts(object.vertices.clone(), faces, MeshColors::None)
                .map_err(|e| ViewError::invalid_content(format!("object '{name}': {e}")))?;
            let (colors, material_count) = resolve_colors(&object, &self.groups);
            mesh.colors = colors;
            scene.push(name, mesh, material_count);
        }
        info!("3MF: {} mesh objects", scene.len());
        Ok(scene)
    }
}

/// Turn triangle material references into mesh colors.
///
/// Returns the colors and the number of distinct colors referenced.
fn resolve_colors(object: &RawObject, groups: &HashMap<u32, Vec<Rgba>>) -> (MeshColors, usize) {
    let corners: Vec<Option<[Rgba; 3]>> = object
        .triangles
        .iter()
        .map(|t| corner_colors(t, object, groups))
        .collect();

    let distinct: HashSet<Rgba> = corners.iter().flatten().flatten().copied().collect();
    if distinct.is_empty() {
        return (MeshColors::None, 0);
    }

    let uniform = corners
        .iter()
        .flatten()
        .all(|[a, b, c]| a == b && b == c);
    if uniform {
        let colors = corners
            .iter()
            .map(|c| c.map_or(Rgba::UNSET, |[a, _, _]| a))
            .collect();
        return (MeshColors::Face(colors), distinct.len());
    }

    let mut per_vertex: Vec<Vec<Rgba>> = vec![Vec::new(); object.vertices.len()];
    for (triangle, colors) in object.triangles.iter().zip(&corners) {
        if let Some(colors) = colors {
            for (&v, color) in triangle.vertices.iter().zip(colors) {
                per_vertex[v as usize].push(*color);
            }
        }
    }
    let colors = per_vertex
        .iter()
        .map(|c| Rgba::mean(c).unwrap_or(Rgba::UNSET))
        .collect();
    (MeshColors::Vertex(colors), distinct.len())
}

fn corner_colors(
    triangle: &RawTriangle,
    object: &RawObject,
    groups: &HashMap<u32, Vec<Rgba>>,
) -> Option<[Rgba; 3]> {
    let group = groups.get(&triangle.pid.or(object.pid)?)?;
    let [p1, p2, p3] = triangle.properties;
    let p1 = p1.or(object.pindex)?;
    let lookup = |p: u32| group.get(p as usize).copied();
    Some([
        lookup(p1)?,
        lookup(p2.unwrap_or(p1))?,
        lookup(p3.unwrap_or(p1))?,
    ])
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> ViewResult<Option<String>> {
    for attribute in e.attributes().flatten() {
        if attribute.key.local_name().as_ref() == key {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn optional<T: FromStr>(e: &BytesStart<'_>, key: &[u8]) -> ViewResult<Option<T>> {
    let Some(text) = attr(e, key)? else {
        return Ok(None);
    };
    text.trim().parse().map(Some).map_err(|_| {
        ViewError::invalid_content(format!(
            "invalid {} '{text}' on <{}>",
            String::from_utf8_lossy(key),
            String::from_utf8_lossy(e.local_name().as_ref())
        ))
    })
}

fn required<T: FromStr>(e: &BytesStart<'_>, key: &[u8]) -> ViewResult<T> {
    optional(e, key)?.ok_or_else(|| {
        ViewError::invalid_content(format!(
            "missing {} on <{}>",
            String::from_utf8_lossy(key),
            String::from_utf8_lossy(e.local_name().as_ref())
        ))
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    /// Zip a model document the way slicers package it
    pub(crate) fn package(model: &str) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file("_rels/.rels", options).unwrap();
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/3D/3dmodel.model" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#,
        )
        .unwrap();
        zip.start_file("3D/3dmodel.model", options).unwrap();
        zip.write_all(model.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    /// Model document with one mesh object per `(name, extra object attributes, triangles xml)`
    pub(crate) fn model(resources: &str, objects: &[(&str, &str, &str)]) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02" xmlns:m="http://schemas.microsoft.com/3dmanufacturing/material/2015/02">
<resources>
"#,
        );
        xml.push_str(resources);
        for (i, (name, extra, triangles)) in objects.iter().enumerate() {
            xml.push_str(&format!(
                r#"<object id="{}" name="{name}" type="model" {extra}><mesh><vertices>
<vertex x="0" y="0" z="0"/><vertex x="1" y="0" z="0"/><vertex x="0" y="1" z="0"/><vertex x="0" y="0" z="1"/>
</vertices><triangles>{triangles}</triangles></mesh></object>
"#,
                i + 10
            ));
        }
        xml.push_str("</resources>\n<build/>\n</model>");
        xml
    }

    /// Closed tetrahedron over the four vertices written by `model`
    pub(crate) const TETRA: &str = r#"<triangle v1="0" v2="2" v3="1"/><triangle v1="0" v2="1" v3="3"/><triangle v1="0" v2="3" v3="2"/><triangle v1="1" v2="2" v3="3"/>"#;

    #[test]
    fn test_parse_two_objects_in_order() {
        let data = package(&model("", &[("partA", "", TETRA), ("partB", "", r#"<triangle v1="0" v2="1" v3="2"/>"#)]));
        let scene = parse_3mf(&data).unwrap();
        assert_eq!(scene.names(), vec!["partA", "partB"]);
        let a = scene.get("partA").unwrap();
        assert_eq!(a.mesh.vertex_count(), 4);
        assert_eq!(a.mesh.face_count(), 4);
        assert_eq!(scene.get("partB").unwrap().mesh.face_count(), 1);
    }

    #[test]
    fn test_unnamed_object_and_component_object() {
        let xml = r#"<model><resources>
<object id="7"><mesh><vertices><vertex x="0" y="0" z="0"/><vertex x="1" y="0" z="0"/><vertex x="0" y="1" z="0"/></vertices>
<triangles><triangle v1="0" v2="1" v3="2"/></triangles></mesh></object>
<object id="8"><components><component objectid="7"/></components></object>
</resources></model>"#;
        let scene = parse_model(xml).unwrap();
        assert_eq!(scene.names(), vec!["object_7"]);
    }

    #[test]
    fn test_blank_name_falls_back_to_id() {
        let scene = parse_model(&model("", &[("  ", "", TETRA), ("merged", "", TETRA)])).unwrap();
        assert_eq!(scene.names(), vec!["object_10", "merged"]);
        assert!(scene.names().iter().all(|name| !name.is_empty()));
    }

    #[test]
    fn test_base_material_face_colors() {
        let resources = r##"<basematerials id="1"><base name="Red" displaycolor="#FF0000"/><base name="Blue" displaycolor="#0000FFFF"/></basematerials>"##;
        let triangles = r#"<triangle v1="0" v2="2" v3="1" pid="1" p1="1"/><triangle v1="0" v2="1" v3="3"/><triangle v1="0" v2="3" v3="2"/><triangle v1="1" v2="2" v3="3"/>"#;
        let scene = parse_model(&model(resources, &[("body", r#"pid="1" pindex="0""#, triangles)])).unwrap();
        let body = scene.get("body").unwrap();
        assert_eq!(body.material_count, 2);
        match &body.mesh.colors {
            MeshColors::Face(colors) => {
                assert_eq!(colors[0], Rgba::rgb(0, 0, 255));
                assert_eq!(colors[1], Rgba::rgb(255, 0, 0));
                assert_eq!(colors.len(), 4);
            }
            other => panic!("expected face colors, got {}", other.kind()),
        }
    }

    #[test]
    fn test_color_group_vertex_colors() {
        let resources = r##"<m:colorgroup id="5"><m:color color="#FF0000"/><m:color color="#00FF00"/></m:colorgroup>"##;
        let triangles = r#"<triangle v1="0" v2="1" v3="2" pid="5" p1="0" p2="1" p3="1"/>"#;
        let scene = parse_model(&model(resources, &[("grad", "", triangles)])).unwrap();
        let grad = scene.get("grad").unwrap();
        match &grad.mesh.colors {
            MeshColors::Vertex(colors) => {
                assert_eq!(colors.len(), 4);
                assert_eq!(colors[0], Rgba::rgb(255, 0, 0));
                assert_eq!(colors[1], Rgba::rgb(0, 255, 0));
                // Vertex 3 is not used by any colored triangle
                assert_eq!(colors[3], Rgba::UNSET);
            }
            other => panic!("expected vertex colors, got {}", other.kind()),
        }
        assert_eq!(grad.material_count, 2);
    }

    #[test]
    fn test_no_materials_means_no_colors() {
        let scene = parse_model(&model("", &[("plain", "", TETRA)])).unwrap();
        let plain = scene.get("plain").unwrap();
        assert!(plain.mesh.colors.is_none());
        assert_eq!(plain.material_count, 0);
    }

    #[test]
    fn test_out_of_range_index() {
        let result = parse_model(&model("", &[("bad", "", r#"<triangle v1="0" v2="1" v3="9"/>"#)]));
        assert!(matches!(result, Err(ViewError::InvalidContent { message }) if message.contains("bad")));
    }

    #[test]
    fn test_bad_coordinate() {
        let xml = r#"<model><resources><object id="1"><mesh><vertices><vertex x="zero" y="0" z="0"/></vertices></mesh></object></resources></model>"#;
        assert!(matches!(parse_model(xml), Err(ViewError::InvalidContent { .. })));
    }

    #[test]
    fn test_not_a_zip() {
        let result = parse_3mf(b"solid not a zip archive");
        assert!(matches!(result, Err(ViewError::Zip(_))));
    }

    #[test]
    fn test_zip_without_model() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("readme.txt", SimpleFileOptions::default().compression_method(CompressionMethod::Stored))
            .unwrap();
        zip.write_all(b"hello").unwrap();
        let data = zip.finish().unwrap().into_inner();
        assert!(matches!(parse_3mf(&data), Err(ViewError::InvalidContent { .. })));
    }

    #[test]
    fn test_start_part_from_rels() {
        let rels = r#"<Relationships><Relationship Target="/3D/other.model" Id="r" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/></Relationships>"#;
        assert_eq!(start_part(rels).as_deref(), Some("3D/other.model"));
    }
}
