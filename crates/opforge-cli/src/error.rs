//! CLI error types with exit code handling
//!
//! Library errors are mapped onto a small set of diagnostics, each with its
//! own exit code and, where useful, a hint for fixing the input.

use miette::Diagnostic;
use opforge_core::CoreError;
use opforge_workload::WorkloadError;
use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// The workload definition or its markers are not acceptable
    #[error("Validation failed: {message}")]
    #[diagnostic(code(opforge::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Workload config could not be decoded or written
    #[error("Config error: {message}")]
    #[diagnostic(code(opforge::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Manifest error: {message}")]
    #[diagnostic(code(opforge::cli::manifest))]
    Manifest {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Dependency error: {message}")]
    #[diagnostic(code(opforge::cli::dependency))]
    Dependency {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("IO error: {message}")]
    #[diagnostic(code(opforge::cli::io))]
    Io { message: String },

    /// Internal error (serialization, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(opforge::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Manifest { .. } => exit_codes::MANIFEST_ERROR,
            CliError::Dependency { .. } => exit_codes::DEPENDENCY_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn io(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

fn help(text: &str) -> Option<String> {
    Some(text.to_string())
}

impl From<WorkloadError> for CliError {
    fn from(err: WorkloadError) -> Self {
        let message = err.to_string();

        match err.root() {
            WorkloadError::Core(core) => match core {
                CoreError::InvalidKind { .. } => CliError::Config {
                    message,
                    help: help(
                        "kind must be one of StandaloneWorkload, WorkloadCollection or ComponentWorkload",
                    ),
                },
                CoreError::MissingManifest { .. }
                | CoreError::UnreadableManifest { .. }
                | CoreError::InvalidManifest { .. }
                | CoreError::GlobPattern { .. } => CliError::Manifest {
                    message,
                    help: help("resources are resolved relative to the workload config file"),
                },
                CoreError::InvalidMarker { .. } => CliError::Validation {
                    message,
                    help: help(
                        "markers look like `# +operator-builder:field:name=<path>,type=<type>,default=<value>`",
                    ),
                },
                CoreError::MarkerTypeConflict { .. } | CoreError::FieldTypeConflict { .. } => {
                    CliError::Validation {
                        message,
                        help: help("give every marker for the same field the same type"),
                    }
                }
            },
            WorkloadError::MissingRequiredFields { .. } => CliError::Validation {
                message,
                help: help("set the missing fields in the workload config"),
            },
            WorkloadError::NoComponentsOnComponent | WorkloadError::NoComponentsOnStandalone => {
                CliError::Validation {
                    message,
                    help: None,
                }
            }
            WorkloadError::DuplicateComponent { .. }
            | WorkloadError::PackageNameCollision { .. } => CliError::Validation {
                message,
                help: help("rename one of the components"),
            },
            WorkloadError::UnresolvedDependency { .. } => CliError::Dependency {
                message,
                help: help("dependencies must name components of the same collection"),
            },
            WorkloadError::CircularDependency { .. } => CliError::Dependency {
                message,
                help: help("remove one of the dependencies in the cycle"),
            },
            WorkloadError::InvalidConfig { .. } | WorkloadError::ConfigParse { .. } => {
                CliError::Config {
                    message,
                    help: None,
                }
            }
            WorkloadError::ConfigExists { .. } => CliError::Config {
                message,
                help: help("pass --force to overwrite it"),
            },
            WorkloadError::Io { .. } => CliError::Io { message },
            WorkloadError::Yaml(_) | WorkloadError::InWorkload { .. } => {
                CliError::Internal { message }
            }
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::io(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::internal(err.to_string())
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
