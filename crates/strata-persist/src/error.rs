//! Persistence error types.

use std::path::PathBuf;

use strata_archive::ArchiveError;
use thiserror::Error;

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistError>;

/// Persistence operation error.
#[derive(Debug, Error)]
pub enum PersistError {
    /// File I/O error.
    #[error("failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive layer rejected the data.
    #[error("archive error")]
    Archive {
        #[from]
        source: ArchiveError,
    },

    /// Checksum verification failed after a verified write.
    #[error("checksum verification failed for {path}: {detail}")]
    Checksum { path: PathBuf, detail: String },

    /// The option set does not make sense for the requested operation.
    #[error("invalid persistence options: {reason}")]
    InvalidOptions { reason: &'static str },

    /// The final rename of the atomic save could not be completed.
    #[error("failed to replace {target_path} with {temp_path}")]
    AtomicReplace {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Armored text could not be decoded back into archive bytes.
    #[error("invalid armored data: {detail}")]
    Encoding { detail: String },
}

impl PersistError {
    /// A short message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => {
                format!("Could not {} the file at {}", operation, path.display())
            }
            Self::Archive { source } => source.user_message(),
            Self::Checksum { path, .. } => {
                format!(
                    "The file at {} failed its integrity check and may be corrupted.",
                    path.display()
                )
            }
            Self::InvalidOptions { .. } => "The file could not be saved.".to_string(),
            Self::AtomicReplace { target_path, .. } => {
                format!(
                    "Could not save the file to {}. Check disk space and permissions.",
                    target_path.display()
                )
            }
            Self::Encoding { .. } => {
                "The data is not valid or has been corrupted.".to_string()
            }
        }
    }
}
