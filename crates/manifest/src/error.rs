//! Error types for the manifest crate

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading a package manifest
#[derive(Error, Debug)]
pub enum Error {
    /// IO error while reading the manifest file
    #[error("failed to read manifest {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest is not well-formed XML
    #[error("malformed manifest {}: {source}", .path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    /// Path does not exist
    #[error("path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),
}

/// Result type for manifest operations
pub type Result<T> = std::result::Result<T, Error>;
