/// Uploaded files and type inference from their names
use serde::Serialize;

use crate::error::{ViewError, ViewResult};

/// Extensions the upload widget accepts
pub const ACCEPTED_EXTENSIONS: [&str; 2] = ["stl", "3mf"];

/// A file handed over by the user, held entirely in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Lower-cased text after the last `.`; the whole name when there is no dot.
    pub fn extension(&self) -> String {
        let name = self.name.trim();
        name.rsplit('.').next().unwrap_or(name).to_lowercase()
    }

    pub fn file_type(&self) -> ViewResult<FileType> {
        FileType::from_extension(&self.extension())
    }
}

/// Supported mesh formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileType {
    Stl,
    ThreeMf,
}

impl FileType {
    pub fn from_extension(extension: &str) -> ViewResult<Self> {
        match extension.to_lowercase().as_str() {
            "stl" => Ok(Self::Stl),
            "3mf" => Ok(Self::ThreeMf),
            other => Err(ViewError::UnsupportedFormat {
                extension: other.to_string(),
            }),
        }
    }

    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Stl => "stl",
            Self::ThreeMf => "3mf",
        }
    }

    /// Upper-case label for the sidebar
    pub fn label(&self) -> String {
        self.extension().to_uppercase()
    }
}
