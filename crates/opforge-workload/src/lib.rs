//! opforge Workload - the workload model built from annotated manifests
//!
//! A workload is one of three shapes, all implementing [`WorkloadBuilder`]:
//! - [`StandaloneWorkload`]: a single API and controller
//! - [`WorkloadCollection`]: a parent API owning component workloads
//! - [`ComponentWorkload`]: a member of a collection, with sibling dependencies
//!
//! Configs are decoded with [`WorkloadConfig`] and taken through the staged
//! [`Lifecycle`], after which a [`WorkloadSummary`] describes the result.

pub mod collection;
pub mod component;
pub mod config;
pub mod dependency;
pub mod error;
pub mod lifecycle;
pub mod standalone;
pub mod summary;
pub mod workload;

pub use collection::WorkloadCollection;
pub use component::ComponentWorkload;
pub use config::{
    ConfigDocument, ConfigSpec, STDOUT_PATH, WorkloadConfig, render_config, write_config_file,
};
pub use dependency::{ComponentRef, DependencyGraph};
pub use error::{Result, WorkloadError};
pub use lifecycle::{
    Defined, DependenciesResolved, Lifecycle, NamesSet, ResourcesLoaded, Validated, process,
};
pub use standalone::StandaloneWorkload;
pub use summary::WorkloadSummary;
pub use workload::{Workload, WorkloadBuilder, WorkloadShared, WorkloadSpec};
