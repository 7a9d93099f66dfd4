use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AtlasError>;

#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("malformed expression matrix at line {line}: {reason}")]
    MalformedMatrix { line: usize, reason: String },

    #[error("{what} contains no data rows")]
    EmptyInput { what: &'static str },

    #[error("malformed annotation table at line {line}: {reason}")]
    MalformedAnnotation { line: usize, reason: String },

    #[error("none of the {requested} requested genes are present in the expression matrix")]
    NoGenesMatched { requested: usize },

    #[error("reference sample '{name}' is not a column of the expression matrix")]
    UnknownSample { name: String },

    #[error("gene '{gene}' has no non-missing values; no statistic can be computed")]
    DegenerateInput { gene: String },

    #[error("internal render error: {0}")]
    RenderError(String),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AtlasError {
    pub fn malformed_matrix(line: usize, reason: impl Into<String>) -> Self {
        AtlasError::MalformedMatrix {
            line,
            reason: reason.into(),
        }
    }

    pub fn malformed_annotation(line: usize, reason: impl Into<String>) -> Self {
        AtlasError::MalformedAnnotation {
            line,
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AtlasError::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that describe bad user input, as opposed to an internal defect.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, AtlasError::RenderError(_) | AtlasError::Io { .. })
    }
}

impl From<std::fmt::Error> for AtlasError {
    fn from(e: std::fmt::Error) -> Self {
        AtlasError::RenderError(format!("formatting failed: {}", e))
    }
}

impl From<serde_json::Error> for AtlasError {
    fn from(e: serde_json::Error) -> Self {
        AtlasError::RenderError(format!("model serialization failed: {}", e))
    }
}
