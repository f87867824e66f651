/// Render descriptor: the plotly figure handed to the browser renderer
use serde::Serialize;

use crate::config::{FaceColorMode, HeightColoring, ViewerConfig};
use crate::geometry::{Mesh, MeshColors, Rgba};
use crate::projection::SceneCamera;

/// Mesh color when nothing else applies
pub const FALLBACK_COLOR: &str = "#e5ecf6";

/// Low-to-high stops for height coloring
pub const HEIGHT_COLORSCALE: [(f32, &str); 4] = [
    (0.0, "#1f3b73"),
    (0.35, "#3f6fb5"),
    (0.7, "#8fb3e0"),
    (1.0, FALLBACK_COLOR),
];

const TRANSPARENT: &str = "rgba(0,0,0,0)";

/// Which branch of the color policy produced the trace colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSource {
    VertexColors,
    FaceColors,
    InterpolatedFaceColors,
    HeightGradient,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderDescriptor {
    pub data: Vec<Mesh3dTrace>,
    pub layout: Layout,
    #[serde(skip)]
    pub color_source: ColorSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mesh3dTrace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
    pub i: Vec<u32>,
    pub j: Vec<u32>,
    pub k: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertexcolor: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facecolor: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorscale: Option<Vec<(f32, String)>>,
    pub flatshading: bool,
    pub showscale: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub scene: SceneLayout,
    pub paper_bgcolor: &'static str,
    pub margin: Margin,
    pub showlegend: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneLayout {
    pub aspectmode: &'static str,
    pub camera: SceneCamera,
    pub xaxis: Axis,
    pub yaxis: Axis,
    pub zaxis: Axis,
    pub bgcolor: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Axis {
    pub showbackground: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

impl Default for Layout {
    fn default() -> Self {
        let axis = Axis {
            showbackground: false,
        };
        Self {
            scene: SceneLayout {
                aspectmode: "data",
                camera: SceneCamera::default(),
                xaxis: axis,
                yaxis: axis,
                zaxis: axis,
                bgcolor: TRANSPARENT,
            },
            paper_bgcolor: TRANSPARENT,
            margin: Margin {
                l: 0,
                r: 0,
                t: 0,
                b: 0,
            },
            showlegend: false,
        }
    }
}

/// Colors resolved for one trace
struct TraceColors {
    vertexcolor: Option<Vec<String>>,
    facecolor: Option<Vec<String>>,
    color: Option<String>,
    intensity: Option<Vec<f32>>,
    colorscale: Option<Vec<(f32, String)>>,
    source: ColorSource,
}

impl TraceColors {
    fn empty(source: ColorSource) -> Self {
        Self {
            vertexcolor: None,
            facecolor: None,
            color: None,
            intensity: None,
            colorscale: None,
            source,
        }
    }
}

/// Build the figure for a mesh: one `mesh3d` trace plus the fixed layout.
///
/// Colors resolve in order: vertex colors to `vertexcolor`; face colors to
/// `facecolor` or averaged into `vertexcolor`; otherwise Z height through
/// `colorscale`, or one flat `color`.
pub fn build_descriptor(mesh: &Mesh, config: &ViewerConfig) -> RenderDescriptor {
    let colors = resolve_colors(mesh, config);
    let trace = Mesh3dTrace {
        kind: "mesh3d",
        x: mesh.vertices.iter().map(|p| p.x).collect(),
        y: mesh.vertices.iter().map(|p| p.y).collect(),
        z: mesh.vertices.iter().map(|p| p.z).collect(),
        i: mesh.faces.iter().map(|f| f[0]).collect(),
        j: mesh.faces.iter().map(|f| f[1]).collect(),
        k: mesh.faces.iter().map(|f| f[2]).collect(),
        vertexcolor: colors.vertexcolor,
        facecolor: colors.facecolor,
        color: colors.color,
        intensity: colors.intensity,
        colorscale: colors.colorscale,
        flatshading: colors.source == ColorSource::FaceColors,
        showscale: false,
    };
    RenderDescriptor {
        data: vec![trace],
        layout: Layout::default(),
        color_source: colors.source,
    }
}

fn css(colors: &[Rgba]) -> Vec<String> {
    colors.iter().map(Rgba::to_css).collect()
}

fn resolve_colors(mesh: &Mesh, config: &ViewerConfig) -> TraceColors {
    match (&mesh.colors, config.face_color_mode, config.height_coloring) {
        (MeshColors::Vertex(colors), _, _) => TraceColors {
            vertexcolor: Some(css(colors)),
            ..TraceColors::empty(ColorSource::VertexColors)
        },
        (MeshColors::Face(colors), FaceColorMode::Flat, _) => TraceColors {
            facecolor: Some(css(colors)),
            ..TraceColors::empty(ColorSource::FaceColors)
        },
        (MeshColors::Face(colors), FaceColorMode::Interpolate, _) => TraceColors {
            vertexcolor: Some(css(&face_colors_to_vertices(mesh, colors))),
            ..TraceColors::empty(ColorSource::InterpolatedFaceColors)
        },
        (MeshColors::None, _, HeightColoring::Gradient) => TraceColors {
            intensity: Some(mesh.vertices.iter().map(|p| p.z).collect()),
            colorscale: Some(
                HEIGHT_COLORSCALE
                    .iter()
                    .map(|&(stop, color)| (stop, color.to_string()))
                    .collect(),
            ),
            ..TraceColors::empty(ColorSource::HeightGradient)
        },
        (MeshColors::None, _, HeightColoring::Flat) => TraceColors {
            color: Some(FALLBACK_COLOR.to_string()),
            ..TraceColors::empty(ColorSource::Flat)
        },
    }
}

/// Mean color of the faces around each vertex; unused vertices get the fallback.
pub fn face_colors_to_vertices(mesh: &Mesh, face_colors: &[Rgba]) -> Vec<Rgba> {
    let mut incident: Vec<Vec<Rgba>> = vec![Vec::new(); mesh.vertex_count()];
    for (face, color) in mesh.faces.iter().zip(face_colors) {
        for &v in face {
            incident[v as usize].push(*color);
        }
    }
    let fallback = Rgba::from_hex(FALLBACK_COLOR).unwrap_or(Rgba::UNSET);
    incident
        .iter()
        .map(|colors| Rgba::mean(colors).unwrap_or(fallback))
        .collect()
}
