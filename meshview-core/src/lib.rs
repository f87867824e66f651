/// meshview core - shared loading, measuring and figure building
///
/// This library holds the stateless pipeline behind every front-end:
/// upload typing, STL/3MF parsing, scene selection, geometric measures,
/// the render descriptor and the sidebar contents.

pub mod config;
pub mod error;
pub mod geometry;
pub mod info;
pub mod loader;
pub mod measure;
pub mod projection;
pub mod render;
pub mod scene;
pub mod stl;
pub mod threemf;
pub mod transform;
pub mod upload;
pub mod viewer;

// Re-export commonly used types
pub use config::{FaceColorMode, HeightColoring, ViewerConfig};
pub use error::{ViewError, ViewResult};
pub use geometry::{Mesh, MeshColors, Rgba, Triangle};
pub use info::{ErrorPanel, MeshInfo};
pub use measure::MeshMeasures;
pub use projection::{Camera, SceneCamera};
pub use render::{build_descriptor, ColorSource, RenderDescriptor};
pub use scene::{Loaded, MeshSelection, Scene, Selected};
pub use transform::Orbit;
pub use upload::{FileType, Upload, ACCEPTED_EXTENSIONS};
pub use viewer::{View, ViewState, Viewer, PROMPT};
