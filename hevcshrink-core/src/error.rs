// ============================================================================
// hevcshrink-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Core Error Types and Helpers
//
// This module defines the error enum used throughout hevcshrink-core together
// with small constructors for the external-command failures that ffmpeg and
// ffprobe produce.
//
// KEY COMPONENTS:
// - CoreError: every failure the library can report
// - CoreResult: result alias used by all public functions
// - ErrorKind: the four-way classification used in batch summaries
// - command_*_error: helpers for process start/wait/exit failures

use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors produced by hevcshrink-core.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Directory traversal error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to probe {path}: {message}")]
    Probe { path: PathBuf, message: String },

    #[error("Failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },

    #[error("No hardware HEVC encoder available")]
    HardwareUnavailable,

    #[error("Failed to delete original {path}: {source}")]
    Deletion {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Required command '{0}' not found in PATH")]
    DependencyNotFound(String),

    #[error("Failed to start '{command}': {source}")]
    CommandStart {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed waiting for '{command}': {source}")]
    CommandWait {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path error: {0}")]
    PathError(String),
}

/// Result type for hevcshrink-core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Classification of an error as seen by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad directory or multiplier; only fatal before any file is touched.
    Input,
    /// The file could not be read as a media container.
    Probe,
    /// The external encoder failed or is unavailable.
    Encode,
    /// Filesystem failure, typically deleting the original.
    Io,
}

impl CoreError {
    /// Maps this error onto the operator-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound(_) | CoreError::InvalidInput(_) => ErrorKind::Input,
            CoreError::Probe { .. } | CoreError::Json(_) => ErrorKind::Probe,
            CoreError::Encode { .. }
            | CoreError::HardwareUnavailable
            | CoreError::DependencyNotFound(_)
            | CoreError::CommandStart { .. }
            | CoreError::CommandWait { .. }
            | CoreError::CommandFailed { .. } => ErrorKind::Encode,
            CoreError::Io(_)
            | CoreError::Walkdir(_)
            | CoreError::Deletion { .. }
            | CoreError::PathError(_) => ErrorKind::Io,
        }
    }

    /// Builds a probe error for `path`.
    pub fn probe(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        CoreError::Probe {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Builds an encode error for `path`.
    pub fn encode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        CoreError::Encode {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Error for a command that could not be spawned.
pub fn command_start_error(command: impl Into<String>, source: io::Error) -> CoreError {
    CoreError::CommandStart {
        command: command.into(),
        source,
    }
}

/// Error for a command whose exit status could not be collected.
pub fn command_wait_error(command: impl Into<String>, source: io::Error) -> CoreError {
    CoreError::CommandWait {
        command: command.into(),
        source,
    }
}

/// Error for a command that ran but exited unsuccessfully.
pub fn command_failed_error(
    command: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed {
        command: command.into(),
        status,
        stderr: stderr.into(),
    }
}
