//! Core error types

use std::path::PathBuf;

use thiserror::Error;

use crate::markers::FieldType;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("unrecognized workload kind '{tag}' in workload config")]
    InvalidKind { tag: String },

    #[error("manifest not found: {path}")]
    MissingManifest { path: PathBuf },

    #[error("unable to read manifest {path}: {message}")]
    UnreadableManifest { path: PathBuf, message: String },

    #[error("invalid manifest {path}: {message}")]
    InvalidManifest { path: PathBuf, message: String },

    #[error("invalid glob pattern '{pattern}': {message}")]
    GlobPattern { pattern: String, message: String },

    #[error("invalid marker at {path}:{line}: {message}")]
    InvalidMarker {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("marker for field '{field}' at {path}:{line} declares type {declared} but annotates {literal:?}")]
    MarkerTypeConflict {
        path: PathBuf,
        line: usize,
        field: String,
        declared: FieldType,
        literal: String,
    },

    #[error("field '{field}' is defined as {existing} at {existing_origin} but as {conflicting} at {conflicting_origin}")]
    FieldTypeConflict {
        field: String,
        existing: FieldType,
        existing_origin: String,
        conflicting: FieldType,
        conflicting_origin: String,
    },
}

impl CoreError {
    /// Path of the manifest the error points at, if any
    pub fn manifest_path(&self) -> Option<&std::path::Path> {
        match self {
            CoreError::MissingManifest { path }
            | CoreError::UnreadableManifest { path, .. }
            | CoreError::InvalidManifest { path, .. }
            | CoreError::InvalidMarker { path, .. }
            | CoreError::MarkerTypeConflict { path, .. } => Some(path),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
