//! Workload collections: a parent API owning a set of component workloads

use std::collections::{HashMap, HashSet};
use std::path::Path;

use opforge_core::{
    CliCommand, CommandRole, MarkerScope, WorkloadApiSpec, WorkloadKind, to_package_name,
};
use tracing::{debug, warn};

use crate::component::ComponentWorkload;
use crate::dependency::DependencyGraph;
use crate::error::{Result, WorkloadError};
use crate::workload::{WorkloadBuilder, WorkloadShared, WorkloadSpec, WorkloadStages, config_dir};

const DEFAULT_SUBCOMMAND_NAME: &str = "collection";

#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadCollection {
    pub shared: WorkloadShared,
    pub api: WorkloadApiSpec,
    pub root_command: CliCommand,
    pub sub_command: CliCommand,

    /// Component config references as written in the config
    pub component_files: Vec<String>,

    pub spec: WorkloadSpec,

    components: Vec<ComponentWorkload>,
}

impl WorkloadCollection {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        api: WorkloadApiSpec,
        component_files: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            shared: WorkloadShared::new(name, WorkloadKind::Collection),
            api,
            root_command: CliCommand::default(),
            sub_command: CliCommand::default(),
            component_files: component_files.into_iter().map(Into::into).collect(),
            spec: WorkloadSpec::default(),
            components: Vec::new(),
        }
    }

    /// Look up a component by name
    pub fn component(&self, name: &str) -> Option<&ComponentWorkload> {
        self.components.iter().find(|c| c.shared.name == name)
    }

    /// Resolved dependencies of a component, as components
    pub fn dependencies_of(&self, component: &ComponentWorkload) -> Vec<&ComponentWorkload> {
        component
            .dependencies()
            .iter()
            .filter_map(|r| self.components.get(r.index))
            .collect()
    }

    /// Link every component's declared dependencies to its siblings
    ///
    /// Cycles are logged but not rejected here; see
    /// [`DependencyGraph::generation_order`].
    pub(crate) fn resolve_dependencies(&mut self) -> Result<DependencyGraph> {
        let graph = DependencyGraph::build(&self.components)
            .map_err(|e| e.in_workload(self.shared.kind, &self.shared.name))?;

        for (index, component) in self.components.iter_mut().enumerate() {
            component.set_component_dependencies(graph.refs_of(index));
        }

        if let Some(cycle) = graph.detect_cycle() {
            warn!(
                collection = %self.shared.name,
                cycle = %cycle.join(" -> "),
                "circular dependency between components"
            );
        }

        debug!(
            collection = %self.shared.name,
            edges = graph.edges().count(),
            "resolved component dependencies"
        );
        Ok(graph)
    }

    fn check_components(&self) -> Result<()> {
        let mut names: HashSet<&str> = HashSet::new();
        let mut packages: HashMap<String, &str> = HashMap::new();

        for component in &self.components {
            let name = component.shared.name.as_str();
            if !names.insert(name) {
                return Err(WorkloadError::DuplicateComponent {
                    name: name.to_string(),
                });
            }

            let package_name = to_package_name(name);
            if let Some(first) = packages.insert(package_name.clone(), name) {
                return Err(WorkloadError::PackageNameCollision {
                    package_name,
                    first: first.to_string(),
                    second: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl WorkloadBuilder for WorkloadCollection {
    fn shared(&self) -> &WorkloadShared {
        &self.shared
    }

    fn api(&self) -> &WorkloadApiSpec {
        &self.api
    }

    fn spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    fn validate(&self) -> Result<()> {
        self.shared.check_required(&self.api, true)?;
        for component in &self.components {
            component.validate()?;
        }
        self.check_components()
            .map_err(|e| e.in_workload(self.shared.kind, &self.shared.name))
    }

    fn root_command(&self) -> Option<&CliCommand> {
        Some(&self.root_command)
    }

    fn sub_command(&self) -> Option<&CliCommand> {
        Some(&self.sub_command)
    }

    fn components(&self) -> &[ComponentWorkload] {
        &self.components
    }
}

impl WorkloadStages for WorkloadCollection {
    /// Loads the collection's own manifests, then every component's
    fn load_manifests(&mut self, workload_path: &Path) -> Result<()> {
        let base = config_dir(workload_path);
        self.spec
            .load_manifests(&base)
            .map_err(|e| WorkloadError::from(e).in_workload(self.shared.kind, &self.shared.name))?;

        for component in &mut self.components {
            component.load_manifests(workload_path)?;
        }
        Ok(())
    }

    /// Field and collection markers of the collection's manifests, plus
    /// collection markers of every component manifest
    fn set_resources(&mut self) -> Result<()> {
        let kind = self.shared.kind;
        let name = self.shared.name.clone();
        let context = |e: WorkloadError| e.in_workload(kind, &name);

        let api = self.api.clone();
        self.spec
            .process_manifests(&api, &[MarkerScope::Field, MarkerScope::Collection])
            .map_err(|e| context(e.into()))?;

        for component in &mut self.components {
            component.set_resources()?;
        }

        for component in &self.components {
            for manifest in &component.spec.parsed {
                self.spec
                    .api_spec_fields
                    .add_manifest(manifest, &[MarkerScope::Collection])
                    .map_err(|e| context(e.into()))?;
            }
            self.spec.rbac_rules.merge(&component.spec.rbac_rules);
        }

        debug!(
            collection = %name,
            components = self.components.len(),
            fields = self.spec.api_spec_fields.len(),
            "collection resources set"
        );
        Ok(())
    }

    fn set_names(&mut self) {
        self.shared.set_package_name();

        // Without a root command no companion CLI is generated
        if self.root_command.has_name() {
            let kind = self.api.kind.to_lowercase();
            self.root_command.set_common_values(
                &self.shared.package_name,
                &format!("Manage {kind} collection and components"),
                CommandRole::Root,
            );
            self.sub_command.set_common_values(
                DEFAULT_SUBCOMMAND_NAME,
                &format!("Manage {kind} workload"),
                CommandRole::Sub,
            );
        }

        for component in &mut self.components {
            component.set_names();
        }
    }

    fn set_components(&mut self, components: Vec<ComponentWorkload>) -> Result<()> {
        self.components = components;
        for component in &mut self.components {
            component.attach(&self.shared.name, &self.api.domain);
        }
        debug!(
            collection = %self.shared.name,
            components = self.components.len(),
            "components set"
        );
        Ok(())
    }
}
