//! Archive error types.
//!
//! Every fatal condition unwinds to the caller of the top-level serialize or
//! deserialize entry point. There is no partial-object recovery: a partially
//! deserialized graph cannot be trusted, so callers are expected to catch the
//! error, present [`ArchiveError::user_message`] to the user, and keep the
//! diagnostic for logs.

use thiserror::Error;

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Archive operation error.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Low-level read/write failure on the underlying medium.
    #[error("I/O error while {operation}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The medium ended before the requested data could be read.
    #[error("unexpected end of archive data")]
    UnexpectedEof,

    /// The stream claims a format version this build has no routine for.
    /// Either the data is corrupt or the file was written by a newer build.
    #[error("unknown format version {version} for class '{class}'")]
    UnknownVersion { class: String, version: u16 },

    /// The stored version number was the zero sentinel: the object carries
    /// no payload. Distinct from [`ArchiveError::UnknownVersion`] because a
    /// caller may treat an empty object as a default-constructed one.
    #[error("no more data to deserialize for class '{class}'")]
    NoMoreData { class: String },

    /// Debug-tag mismatch after an object frame. This always indicates a bug
    /// in a paired read/write routine: the reader consumed a different number
    /// or type of fields than the writer produced.
    #[error("serializer symmetry broken, fix the V{version} routine for '{class}'")]
    Symmetry { class: String, version: u16 },

    /// A polymorphic class name was read that was never installed in the
    /// type registry. A registration bug, not a data bug.
    #[error("could not create instance of type '{class}'")]
    UnregisteredType { class: String },

    /// A registry entry produced an object of a different concrete type than
    /// the caller asked for.
    #[error("instance of '{class}' does not have the requested type")]
    TypeMismatch { class: String },

    /// Malformed input. `code` is a terse alphanumeric identifier of the
    /// failing parse site; `line` is meaningful for text input only.
    #[error("parse error [{code}] at line {line}: {detail}")]
    Parse {
        code: &'static str,
        line: u64,
        detail: String,
    },

    /// The stream matched no known archive format during auto-detection.
    #[error("unrecognized archive format")]
    UnknownFormat,

    /// A write was attempted on a loading archive, or a read on a storing
    /// one. Always a caller bug.
    #[error("archive operation does not match stream direction")]
    WrongDirection,
}

impl ArchiveError {
    /// Whether this error must abort the whole pass.
    ///
    /// Only the zero-version sentinel is recoverable; everything else leaves
    /// the stream position (and possibly the target object) in an
    /// untrustworthy state.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::NoMoreData { .. })
    }

    /// A short message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io { .. } | Self::UnexpectedEof => {
                "The file could not be read or written.".to_string()
            }
            Self::UnknownVersion { .. } => {
                "This file was created by a newer version of the application.".to_string()
            }
            Self::Parse { .. } | Self::UnknownFormat => {
                "The file is not valid or has been corrupted.".to_string()
            }
            _ => "The file could not be loaded or saved.".to_string(),
        }
    }

    pub(crate) fn io(operation: &'static str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEof
        } else {
            Self::Io { operation, source }
        }
    }
}
