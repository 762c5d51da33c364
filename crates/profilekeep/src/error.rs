use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors surfaced by the guard, the host seams and the archiver.
///
/// Pre-save hook failures are deliberately absent: they are logged and
/// rolled back inside the save path and never reach the caller.
#[derive(Debug, Error)]
pub enum KeepError {
    #[error("profile not found for session {0}")]
    ProfileNotFound(String),

    #[error("profile {context} is missing field `{field}`")]
    MissingField { field: &'static str, context: String },

    #[error("load router `{router}` failed: {source}")]
    LoadRouter {
        router: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),
}

impl KeepError {
    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, KeepError>;
