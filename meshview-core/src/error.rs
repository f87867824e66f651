/// Error types for loading and viewing meshes
use thiserror::Error;

/// Result type for viewer operations.
pub type ViewResult<T> = Result<T, ViewError>;

/// Everything that can go wrong between an upload and a rendered view.
#[derive(Debug, Error)]
pub enum ViewError {
    /// Extension outside the accepted set.
    #[error("unsupported file type: .{extension} (expected .stl or .3mf)")]
    UnsupportedFormat { extension: String },

    /// The file parsed structurally but its content is wrong.
    #[error("invalid file content: {message}")]
    InvalidContent { message: String },

    #[error("unexpected end of file at byte {position}")]
    UnexpectedEof { position: usize },

    #[error("invalid STL header: expected at least {expected} bytes, got {got}")]
    InvalidHeader { expected: usize, got: usize },

    #[error("file contains no meshes")]
    EmptyScene,

    #[error("no mesh named '{name}' in file")]
    MeshNotFound { name: String },

    #[error("invalid 3MF archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("invalid 3MF model XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ViewError {
    pub fn invalid_content(message: impl Into<String>) -> Self {
        Self::InvalidContent {
            message: message.into(),
        }
    }

    /// Short type name shown in the debug panel.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat { .. } => "UnsupportedFormat",
            Self::InvalidContent { .. } => "InvalidContent",
            Self::UnexpectedEof { .. } => "UnexpectedEof",
            Self::InvalidHeader { .. } => "InvalidHeader",
            Self::EmptyScene => "EmptyScene",
            Self::MeshNotFound { .. } => "MeshNotFound",
            Self::Zip(_) => "ZipError",
            Self::Xml(_) => "XmlError",
            Self::Io(_) => "IoError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(ViewError::EmptyScene.kind_name(), "EmptyScene");
        assert_eq!(
            ViewError::invalid_content("bad").kind_name(),
            "InvalidContent"
        );
    }

    #[test]
    fn test_messages() {
        let err = ViewError::UnsupportedFormat {
            extension: "obj".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unsupported file type: .obj (expected .stl or .3mf)"
        );
        let err = ViewError::MeshNotFound {
            name: "partC".to_string(),
        };
        assert_eq!(err.to_string(), "no mesh named 'partC' in file");
    }
}
