//! Error types for cortigraph.
//!
//! This module defines all error types used throughout the library.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur while reading surfaces, building graphs or
/// driving external tools.
#[derive(Error, Debug)]
pub enum MeshError {
    /// A face references a vertex that does not exist.
    #[error("face {face} references vertex index {vertex} out of range")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face does not have exactly three vertices.
    #[error("face {face} does not have exactly 3 vertices (has {len})")]
    MalformedFace {
        /// The face index.
        face: usize,
        /// Number of vertex indices the face actually has.
        len: usize,
    },

    /// A face has duplicate vertex indices (degenerate triangle).
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading a surface from file.
    #[error("failed to load surface from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Invalid state for the requested operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },

    /// A required environment variable is not defined.
    #[error("environment variable {0} is not defined")]
    MissingEnv(&'static str),

    /// An external command exited unsuccessfully.
    #[error("command `{program}` failed with {status}")]
    CommandFailed {
        /// The program that was run.
        program: String,
        /// Its exit status.
        status: ExitStatus,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create a load error for `path`.
    pub(crate) fn load<P: Into<PathBuf>, M: Into<String>>(path: P, message: M) -> Self {
        MeshError::LoadError {
            path: path.into(),
            message: message.into(),
        }
    }
}
