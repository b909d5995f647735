//! Error types for the signage player
//!
//! This module defines the error taxonomy shared by the playlist store,
//! the playback engine and the media backend. We use thiserror for the
//! library error type and anyhow only at the binary's top level.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the signage player
#[derive(Error, Debug)]
pub enum SignageError {
    /// A transport command was issued while the playlist has no items
    #[error("Playlist is empty")]
    EmptyPlaylist,

    /// Explicit play(index) outside the playlist
    #[error("Index out of range: {index} (playlist has {len} items)")]
    IndexOutOfRange { index: i64, len: usize },

    /// The filename is not part of the playlist
    #[error("Not in playlist: {0}")]
    NotInPlaylist(String),

    /// The file does not exist in the video directory
    #[error("File missing on disk: {0}")]
    FileMissing(String),

    /// Writing the persisted playlist failed
    #[error("Failed to persist playlist to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Opaque failure reported by the media backend
    #[error("Backend error: {0}")]
    Backend(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File error: {0}")]
    FileIO(#[from] std::io::Error),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error for unexpected situations
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SignageError {
    /// Create a backend error from string
    pub fn backend_error<S: Into<String>>(msg: S) -> Self {
        SignageError::Backend(msg.into())
    }

    /// Stable identifier used in command replies
    pub fn code(&self) -> &'static str {
        match self {
            SignageError::EmptyPlaylist => "empty_playlist",
            SignageError::IndexOutOfRange { .. } => "index_out_of_range",
            SignageError::NotInPlaylist(_) => "not_in_playlist",
            SignageError::FileMissing(_) => "file_missing",
            SignageError::Persistence { .. } => "persistence_write_failure",
            SignageError::Backend(_) => "backend_failure",
            SignageError::Config(_) => "config",
            SignageError::FileIO(_) => "file_io",
            SignageError::InvalidInput(_) => "invalid_input",
            SignageError::Internal(_) => "internal",
        }
    }
}

/// Convenience type alias for Results in the signage player
pub type Result<T> = std::result::Result<T, SignageError>;

/// Extension trait for converting other errors to SignageError
pub trait IntoSignageError<T> {
    /// Convert this error into a SignageError with the given context
    fn backend_err(self, context: &str) -> Result<T>;
    fn config_err(self, context: &str) -> Result<T>;
    fn internal_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> IntoSignageError<T> for std::result::Result<T, E> {
    fn backend_err(self, context: &str) -> Result<T> {
        self.map_err(|e| SignageError::Backend(format!("{}: {}", context, e)))
    }

    fn config_err(self, context: &str) -> Result<T> {
        self.map_err(|e| SignageError::Config(format!("{}: {}", context, e)))
    }

    fn internal_err(self, context: &str) -> Result<T> {
        self.map_err(|e| SignageError::Internal(format!("{}: {}", context, e)))
    }
}
