use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("invalid quantization depth {0} (must be in 1..=256 and divide 256)")]
    InvalidDepth(u32),

    #[error("IO error on {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },

    #[error("cannot decode {}: {source}", .path.display())]
    Decode { path: PathBuf, source: image::ImageError },

    #[error("image has no pixels: {0}")]
    EmptyImage(String),

    #[error("histogram shape mismatch: {left} vs {right} bins")]
    ShapeMismatch { left: usize, right: usize },

    #[error("malformed histogram file {}: {msg}", .path.display())]
    Format { path: PathBuf, msg: String },
}

impl SearchError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SearchError::Io { path: path.into(), source }
    }

    pub fn format(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        SearchError::Format { path: path.into(), msg: msg.into() }
    }

    /// Errors that only disqualify a single dataset candidate. Everything else aborts the run.
    pub fn is_candidate_recoverable(&self) -> bool {
        matches!(self, SearchError::Io { .. } | SearchError::Decode { .. } | SearchError::EmptyImage(_))
    }
}
