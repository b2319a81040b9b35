//! Custom error types for the application.
//!
//! This module defines the primary error type, `BurstError`, used across the capture pipeline.
//! Using the `thiserror` crate it gives every failure a stable, matchable variant so the host
//! shell can decide what to do with it.
//!
//! ## Error Hierarchy
//!
//! - **`AlreadyRunning`**: a burst was requested while another one is capturing. Rejected
//!   immediately, the active session is left untouched.
//! - **`DeviceUnavailable`**: the capture device could not be opened. No burst starts.
//! - **`CaptureFailed`**: the device reported an error (or timed out) for a single capture. The
//!   burst ends in the failed state and is never retried automatically.
//! - **`Io`**: wraps an [`IoFailure`] whose [`IoFailureKind`] tells apart directory creation,
//!   frame writes and metadata writes. The first two abort a burst; metadata failures are only
//!   ever reported as warnings.
//! - **`InvalidCoordinate`**: a latitude/longitude pair outside the valid ranges.
//! - **`Config`** / **`Configuration`**: loading and semantic validation of `AppConfig`.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type BurstResult<T> = std::result::Result<T, BurstError>;

/// Boxed source error carried by [`IoFailure`].
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which stage of persistence failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoFailureKind {
    /// The destination directory did not exist and could not be created.
    DirectoryCreateFailed,
    /// The frame file could not be created, written or flushed.
    WriteFailed,
    /// The image metadata container could not be opened, encoded or saved.
    MetadataWriteFailed,
}

impl fmt::Display for IoFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoFailureKind::DirectoryCreateFailed => write!(f, "directory create failed"),
            IoFailureKind::WriteFailed => write!(f, "write failed"),
            IoFailureKind::MetadataWriteFailed => write!(f, "metadata write failed"),
        }
    }
}

/// A filesystem or metadata failure tied to a specific path.
#[derive(Error, Debug)]
#[error("{kind} for {}: {source}", .path.display())]
pub struct IoFailure {
    /// Stage that failed
    pub kind: IoFailureKind,
    /// File or directory the operation targeted
    pub path: PathBuf,
    /// Underlying cause
    #[source]
    pub source: BoxedSource,
}

impl IoFailure {
    /// Build a failure of `kind` for `path` from any error source.
    pub fn new(kind: IoFailureKind, path: impl AsRef<Path>, source: impl Into<BoxedSource>) -> Self {
        Self {
            kind,
            path: path.as_ref().to_path_buf(),
            source: source.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum BurstError {
    #[error("A burst is already in progress")]
    AlreadyRunning,

    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("I/O failure: {0}")]
    Io(#[from] IoFailure),

    #[error("Invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),
}

impl From<figment::Error> for BurstError {
    fn from(value: figment::Error) -> Self {
        BurstError::Config(Box::new(value))
    }
}

impl BurstError {
    /// The I/O failure stage, if this is an I/O error.
    pub fn io_kind(&self) -> Option<IoFailureKind> {
        match self {
            BurstError::Io(failure) => Some(failure.kind),
            _ => None,
        }
    }
}
