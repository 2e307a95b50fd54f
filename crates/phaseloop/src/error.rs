//! Error types for package execution.
//!
//! Errors are categorized so the orchestrator can decide whether a failure
//! ends the run (environment), is reported as a worker-side marker
//! (precondition, invalid package), or is a plain operator error.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for package execution operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of execution errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The sandbox or another part of the environment could not be prepared.
    Environment,
    /// The package declined to run in the current environment state.
    Precondition,
    /// The package content is malformed.
    InvalidPackage,
    /// Package or directory not found.
    NotFound,
    /// Command line could not be interpreted.
    Arguments,
    /// Archive could not be read or extracted.
    Archive,
    /// The worker process could not be started or did not exit normally.
    Launch,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether an error of this category ends the run immediately.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Environment)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Environment => "Environment initialization failed",
            Self::Precondition => "Package precondition failed",
            Self::InvalidPackage => "Invalid package",
            Self::NotFound => "Not found",
            Self::Arguments => "Invalid arguments",
            Self::Archive => "Invalid package archive",
            Self::Launch => "Worker could not be executed",
            Self::Other => "Unexpected error",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while resolving, unpacking or executing a package.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Package reference could not be resolved.
    #[error("Given package does not exist: {}", .0.display())]
    PackageNotFound(PathBuf),

    /// Target directory does not exist.
    #[error("Given target directory does not exist: {}", .0.display())]
    TargetNotFound(PathBuf),

    /// No package was given on the command line.
    #[error("Missing package")]
    MissingPackage,

    /// Unrecognized `LOGLEVEL:` value.
    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    /// Sandbox could not be built.
    #[error("cannot build sandbox at {}: {source}", .path.display())]
    Sandbox {
        /// Sandbox directory.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Box<Error>,
    },

    /// Package archive could not be read or extracted.
    #[error("cannot extract {}: {source}", .path.display())]
    Archive {
        /// Archive path.
        path: PathBuf,
        /// Underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// Worker process could not be started.
    #[error("cannot start worker {}: {source}", .worker.display())]
    Launch {
        /// Worker binary.
        worker: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Worker process ended without an exit code (killed by a signal).
    #[error("worker {} terminated without an exit code", .worker.display())]
    WorkerTerminated {
        /// Worker binary.
        worker: PathBuf,
    },

    /// The package declined to run in the current environment state.
    #[error("{0}")]
    Precondition(String),

    /// The package content is malformed.
    #[error("{0}")]
    InvalidPackage(String),

    /// A worker-side failure wrapping its cause.
    #[error("worker failed in phase {phase}: {source}")]
    Worker {
        /// Phase in which the failure occurred.
        phase: u32,
        /// Underlying error.
        #[source]
        source: Box<Error>,
    },

    /// IO error during file operations.
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Manifest could not be read.
    #[error(transparent)]
    Manifest(#[from] manifest::Error),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

/// How a failed worker invocation is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerFailure<'a> {
    /// Precondition marker with its message.
    Precondition(&'a str),
    /// Invalid package marker with its message.
    InvalidPackage(&'a str),
    /// Anything else.
    Unhandled,
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap an error that occurred while preparing the sandbox.
    pub fn sandbox(path: impl Into<PathBuf>, source: Error) -> Self {
        Self::Sandbox {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::PackageNotFound(_) | Error::TargetNotFound(_) => ErrorCategory::NotFound,
            Error::MissingPackage | Error::InvalidLogLevel(_) => ErrorCategory::Arguments,
            Error::Sandbox { .. } => ErrorCategory::Environment,
            Error::Archive { .. } => ErrorCategory::Archive,
            Error::Launch { .. } | Error::WorkerTerminated { .. } => ErrorCategory::Launch,
            Error::Precondition(_) => ErrorCategory::Precondition,
            Error::InvalidPackage(_) => ErrorCategory::InvalidPackage,
            Error::Worker { source, .. } => source.category(),
            Error::Manifest(_) => ErrorCategory::InvalidPackage,
            Error::Io { .. } | Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error ends the run immediately.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.category().is_fatal()
    }

    /// Classify a failed worker invocation.
    ///
    /// Looks at this error and at its direct source for the precondition and
    /// invalid-package markers.
    pub fn worker_failure(&self) -> WorkerFailure<'_> {
        fn marker(error: &Error) -> Option<WorkerFailure<'_>> {
            match error {
                Error::Precondition(msg) => Some(WorkerFailure::Precondition(msg)),
                Error::InvalidPackage(msg) => Some(WorkerFailure::InvalidPackage(msg)),
                _ => None,
            }
        }

        marker(self)
            .or_else(|| {
                std::error::Error::source(self)
                    .and_then(|inner| {
                        inner
                            .downcast_ref::<Error>()
                            .or_else(|| inner.downcast_ref::<Box<Error>>().map(|b| b.as_ref()))
                    })
                    .and_then(marker)
            })
            .unwrap_or(WorkerFailure::Unhandled)
    }
}
