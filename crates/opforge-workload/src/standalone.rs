//! Standalone workloads: one API, one controller, no components

use std::path::Path;

use opforge_core::{CliCommand, CommandRole, MarkerScope, WorkloadApiSpec, WorkloadKind};
use tracing::debug;

use crate::component::ComponentWorkload;
use crate::error::{Result, WorkloadError};
use crate::workload::{WorkloadBuilder, WorkloadShared, WorkloadSpec, WorkloadStages, config_dir};

#[derive(Debug, Clone, PartialEq)]
pub struct StandaloneWorkload {
    pub shared: WorkloadShared,
    pub api: WorkloadApiSpec,
    pub root_command: CliCommand,
    pub spec: WorkloadSpec,
}

impl StandaloneWorkload {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        api: WorkloadApiSpec,
        resources: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            shared: WorkloadShared::new(name, WorkloadKind::Standalone),
            api,
            root_command: CliCommand::default(),
            spec: WorkloadSpec::new(resources),
        }
    }

    fn context(&self, err: impl Into<WorkloadError>) -> WorkloadError {
        err.into().in_workload(self.shared.kind, &self.shared.name)
    }
}

impl WorkloadBuilder for StandaloneWorkload {
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
        self.shared.check_required(&self.api, false)
    }

    fn root_command(&self) -> Option<&CliCommand> {
        Some(&self.root_command)
    }

    fn sub_command(&self) -> Option<&CliCommand> {
        None
    }
}

impl WorkloadStages for StandaloneWorkload {
    fn load_manifests(&mut self, workload_path: &Path) -> Result<()> {
        let base = config_dir(workload_path);
        self.spec
            .load_manifests(&base)
            .map_err(|e| self.context(e))
    }

    fn set_resources(&mut self) -> Result<()> {
        let api = self.api.clone();
        self.spec
            .process_manifests(&api, &[MarkerScope::Field])
            .map_err(|e| self.context(e))?;
        self.spec
            .reject_scope(
                MarkerScope::Collection,
                "collection markers are only valid in collection and component manifests",
            )
            .map_err(|e| self.context(e))?;

        debug!(workload = %self.shared.name, "standalone resources set");
        Ok(())
    }

    fn set_names(&mut self) {
        self.shared.set_package_name();

        if self.root_command.has_name() {
            let description = format!("Manage {} workload", self.api.kind.to_lowercase());
            self.root_command.set_common_values(
                &self.shared.package_name,
                &description,
                CommandRole::Root,
            );
        }
    }

    fn set_components(&mut self, _components: Vec<ComponentWorkload>) -> Result<()> {
        Err(self.context(WorkloadError::NoComponentsOnStandalone))
    }
}
