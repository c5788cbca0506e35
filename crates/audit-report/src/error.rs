//! Error types for report persistence.

use std::path::{Path, PathBuf};

/// Result type for output operations.
pub type OutputResult<T> = Result<T, OutputError>;

/// Errors raised while writing or reading report artifacts.
///
/// Encoding problems never show up here: the structural encoder recovers
/// them locally. Writers turn these into a logged [`SaveOutcome::Failed`].
///
/// [`SaveOutcome::Failed`]: crate::writer::SaveOutcome::Failed
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Directory creation, file open/write/rename failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization or parsing failed.
    #[error("JSON error at {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Key-value database failure (open, insert, commit).
    #[error("database error at {}: {source}", path.display())]
    Database {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A loaded document does not have the expected shape.
    #[error("invalid document {}: {message}", path.display())]
    InvalidDocument { path: PathBuf, message: String },
}

impl OutputError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn database(path: &Path, source: rusqlite::Error) -> Self {
        Self::Database {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn invalid(path: &Path, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Path of the artifact the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. }
            | Self::Json { path, .. }
            | Self::Database { path, .. }
            | Self::InvalidDocument { path, .. } => path,
        }
    }

    /// True when the underlying cause is a missing file.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
