/// Named mesh collections and the choice of which mesh to view
use hashbrown::{HashMap, HashSet};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{ViewError, ViewResult};
use crate::geometry::Mesh;

/// Name under which a merged scene is reported
pub const MERGED_NAME: &str = "merged";

/// One entry of a scene
#[derive(Debug, Clone, PartialEq)]
pub struct NamedMesh {
    pub name: String,
    pub mesh: Mesh,
    /// Distinct material colors referenced by the mesh's triangles
    pub material_count: usize,
}

/// Meshes in file order with unique names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    meshes: Vec<NamedMesh>,
    taken: HashSet<String>,
    /// Next `_<n>` suffix to try for each repeated base name
    next_suffix: HashMap<String, usize>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mesh, suffixing `_<n>` to the name if it is already taken.
    pub fn push(&mut self, name: impl Into<String>, mesh: Mesh, material_count: usize) {
        let base = name.into();
        let mut name = base.clone();
        if self.taken.contains(&name) {
            let n = self.next_suffix.entry(base.clone()).or_insert(1);
            loop {
                name = format!("{base}_{n}");
                *n += 1;
                if !self.taken.contains(&name) {
                    break;
                }
            }
        }
        self.taken.insert(name.clone());
        self.meshes.push(NamedMesh {
            name,
            mesh,
            material_count,
        });
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.meshes.iter().map(|m| m.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&NamedMesh> {
        self.meshes.iter().find(|m| m.name == name)
    }
}

/// Which mesh of a scene to show
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshSelection {
    /// First mesh in file order
    #[default]
    First,
    Named(String),
    /// Every mesh concatenated into one
    Merged,
}

/// Result of parsing a file
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    Single(Mesh),
    Scene(Scene),
}

/// The mesh chosen for display, with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Selected {
    pub mesh: Mesh,
    /// Set when the mesh was picked out of a scene
    pub scene_name: Option<String>,
    /// Every name in the scene, empty for single-mesh files
    pub available: Vec<String>,
    pub material_count: usize,
}

impl Loaded {
    pub fn select(self, selection: &MeshSelection) -> ViewResult<Selected> {
        let scene = match self {
            Loaded::Single(mesh) => {
                return Ok(Selected {
                    mesh,
                    scene_name: None,
                    available: Vec::new(),
                    material_count: 0,
                })
            }
            Loaded::Scene(scene) => scene,
        };
        if scene.is_empty() {
            return Err(ViewError::EmptyScene);
        }
        let available = scene.names();

        let (name, mesh, material_count) = match selection {
            MeshSelection::First => {
                let first = scene
                    .meshes
                    .into_iter()
                    .next()
                    .ok_or(ViewError::EmptyScene)?;
                (first.name, first.mesh, first.material_count)
            }
            MeshSelection::Named(wanted) => {
                let found = scene
                    .meshes
                    .into_iter()
                    .find(|m| &m.name == wanted)
                    .ok_or_else(|| ViewError::MeshNotFound {
                        name: wanted.clone(),
                    })?;
                (found.name, found.mesh, found.material_count)
            }
            MeshSelection::Merged => {
                let mut merged = Mesh::new();
                let mut materials = 0;
                for part in &scene.meshes {
                    merged.merge(&part.mesh);
                    materials += part.material_count;
                }
                (MERGED_NAME.to_string(), merged, materials)
            }
        };

        info!("selected '{name}' from scene of {}", available.len());
        Ok(Selected {
            mesh,
            scene_name: Some(name),
            available,
            material_count,
        })
    }
}
