//! Error types for the workload model

use std::path::PathBuf;

use opforge_core::{CoreError, WorkloadKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkloadError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("{kind} '{workload}': {source}")]
    InWorkload {
        kind: WorkloadKind,
        workload: String,
        #[source]
        source: Box<WorkloadError>,
    },

    // ============ Definition Errors ============
    #[error("missing required fields: [{}]", fields.join(", "))]
    MissingRequiredFields { fields: Vec<String> },

    #[error("cannot set component workloads on a component workload - only on collections")]
    NoComponentsOnComponent,

    #[error("cannot set component workloads on a standalone workload - only on collections")]
    NoComponentsOnStandalone,

    #[error("component '{name}' is declared more than once")]
    DuplicateComponent { name: String },

    #[error("components '{first}' and '{second}' share the package name '{package_name}'")]
    PackageNameCollision {
        package_name: String,
        first: String,
        second: String,
    },

    // ============ Dependency Errors ============
    #[error("component '{component}' depends on unknown component '{dependency}'")]
    UnresolvedDependency {
        component: String,
        dependency: String,
    },

    #[error("circular dependency between components: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    // ============ Config Errors ============
    #[error("invalid workload config {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    #[error("unable to parse workload config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("force was not requested and file exists at location {path}")]
    ConfigExists { path: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl WorkloadError {
    /// Attach the workload the error happened in
    pub fn in_workload(self, kind: WorkloadKind, workload: &str) -> Self {
        match self {
            already @ WorkloadError::InWorkload { .. } => already,
            other => WorkloadError::InWorkload {
                kind,
                workload: workload.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, without workload context
    pub fn root(&self) -> &WorkloadError {
        match self {
            WorkloadError::InWorkload { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkloadError>;
