//! Staged processing of a decoded workload
//!
//! A workload moves through `Defined -> Validated -> ResourcesLoaded ->
//! NamesSet -> DependenciesResolved`. Each stage is its own type, so a stage
//! can only be reached through the one before it.
//!
//! The stage transitions themselves are private to this crate:
//!
//! ```compile_fail
//! use opforge_core::WorkloadApiSpec;
//! use opforge_workload::WorkloadCollection;
//!
//! let mut collection = WorkloadCollection::new("", WorkloadApiSpec::default(), ["a.yaml"]);
//! collection.resolve_dependencies();
//! ```
//!
//! ```compile_fail
//! use opforge_core::WorkloadApiSpec;
//! use opforge_workload::{WorkloadBuilder, WorkloadCollection};
//!
//! let mut collection = WorkloadCollection::new("", WorkloadApiSpec::default(), ["a.yaml"]);
//! collection.set_names();
//! ```

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::dependency::DependencyGraph;
use crate::error::Result;
use crate::workload::{Workload, WorkloadBuilder, WorkloadStages};

/// Decoded, not yet checked
#[derive(Debug)]
pub struct Defined;

/// Required fields present
#[derive(Debug)]
pub struct Validated;

/// Manifests read and markers processed
#[derive(Debug)]
pub struct ResourcesLoaded;

/// Package name and companion commands derived
#[derive(Debug)]
pub struct NamesSet;

/// Component dependencies linked
#[derive(Debug)]
pub struct DependenciesResolved;

#[derive(Debug)]
pub struct Lifecycle<S> {
    workload: Workload,
    workload_path: PathBuf,
    graph: Option<DependencyGraph>,
    _stage: PhantomData<S>,
}

impl<S> Lifecycle<S> {
    pub fn workload(&self) -> &Workload {
        &self.workload
    }

    /// Location of the workload's config file
    pub fn workload_path(&self) -> &Path {
        &self.workload_path
    }

    pub fn into_workload(self) -> Workload {
        self.workload
    }

    fn advance<T>(self) -> Lifecycle<T> {
        Lifecycle {
            workload: self.workload,
            workload_path: self.workload_path,
            graph: self.graph,
            _stage: PhantomData,
        }
    }
}

impl Lifecycle<Defined> {
    pub fn new(workload: impl Into<Workload>, workload_path: impl Into<PathBuf>) -> Self {
        Self {
            workload: workload.into(),
            workload_path: workload_path.into(),
            graph: None,
            _stage: PhantomData,
        }
    }

    pub fn validate(self) -> Result<Lifecycle<Validated>> {
        self.workload.validate()?;
        debug!(workload = %self.workload.name(), "workload validated");
        Ok(self.advance())
    }
}

impl Lifecycle<Validated> {
    /// Read manifests relative to the config file and process their markers
    pub fn load_resources(mut self) -> Result<Lifecycle<ResourcesLoaded>> {
        self.workload.load_manifests(&self.workload_path)?;
        self.workload.set_resources()?;
        Ok(self.advance())
    }
}

impl Lifecycle<ResourcesLoaded> {
    pub fn set_names(mut self) -> Lifecycle<NamesSet> {
        self.workload.set_names();
        self.advance()
    }
}

impl Lifecycle<NamesSet> {
    /// Link component dependencies
    ///
    /// A component processed outside its collection has no siblings, so any
    /// declared dependency is unresolved.
    pub fn resolve_dependencies(mut self) -> Result<Lifecycle<DependenciesResolved>> {
        self.graph = match &mut self.workload {
            Workload::Collection(collection) => Some(collection.resolve_dependencies()?),
            Workload::Component(component) => Some(
                DependencyGraph::from_declarations([(
                    component.shared.name.as_str(),
                    component.dependencies.as_slice(),
                )])
                .map_err(|e| e.in_workload(component.shared.kind, &component.shared.name))?,
            ),
            Workload::Standalone(_) => None,
        };
        Ok(self.advance())
    }
}

impl Lifecycle<DependenciesResolved> {
    /// The component graph; `None` for standalone workloads
    pub fn graph(&self) -> Option<&DependencyGraph> {
        self.graph.as_ref()
    }

    pub fn detect_cycle(&self) -> Option<Vec<String>> {
        self.graph.as_ref().and_then(DependencyGraph::detect_cycle)
    }

    /// Components in dependency order; fails on a cycle
    pub fn generation_order(&self) -> Result<Vec<&str>> {
        match &self.graph {
            Some(graph) => graph.generation_order(),
            None => Ok(Vec::new()),
        }
    }
}

/// Run every stage
pub fn process(
    workload: impl Into<Workload>,
    workload_path: impl Into<PathBuf>,
) -> Result<Lifecycle<DependenciesResolved>> {
    Lifecycle::new(workload, workload_path)
        .validate()?
        .load_resources()?
        .set_names()
        .resolve_dependencies()
}
