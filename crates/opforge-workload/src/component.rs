//! Component workloads: members of a collection

use std::path::{Path, PathBuf};

use opforge_core::{CliCommand, CommandRole, MarkerScope, WorkloadApiSpec, WorkloadKind};
use tracing::debug;

use crate::dependency::ComponentRef;
use crate::error::{Result, WorkloadError};
use crate::workload::{WorkloadBuilder, WorkloadShared, WorkloadSpec, WorkloadStages, config_dir};

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentWorkload {
    pub shared: WorkloadShared,
    pub api: WorkloadApiSpec,
    pub sub_command: CliCommand,

    /// Names of sibling components this one depends on
    pub dependencies: Vec<String>,

    /// Location of the component's own config file
    pub config_path: PathBuf,

    pub spec: WorkloadSpec,

    collection: Option<String>,
    component_dependencies: Vec<ComponentRef>,
}

impl ComponentWorkload {
    pub fn new<S: Into<String>, D: Into<String>>(
        name: impl Into<String>,
        api: WorkloadApiSpec,
        resources: impl IntoIterator<Item = S>,
        dependencies: impl IntoIterator<Item = D>,
    ) -> Self {
        Self {
            shared: WorkloadShared::new(name, WorkloadKind::Component),
            api,
            sub_command: CliCommand::default(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            config_path: PathBuf::new(),
            spec: WorkloadSpec::new(resources),
            collection: None,
            component_dependencies: Vec::new(),
        }
    }

    /// Name of the owning collection, once attached to one
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub(crate) fn attach(&mut self, collection: &str, domain: &str) {
        self.collection = Some(collection.to_string());
        if self.api.domain.is_empty() {
            self.api.domain = domain.to_string();
        }
    }

    pub(crate) fn set_component_dependencies(&mut self, dependencies: Vec<ComponentRef>) {
        self.component_dependencies = dependencies;
    }

    fn context(&self, err: impl Into<WorkloadError>) -> WorkloadError {
        err.into().in_workload(self.shared.kind, &self.shared.name)
    }
}

impl WorkloadBuilder for ComponentWorkload {
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

    /// The root command belongs to the owning collection
    fn root_command(&self) -> Option<&CliCommand> {
        None
    }

    fn sub_command(&self) -> Option<&CliCommand> {
        Some(&self.sub_command)
    }

    fn dependencies(&self) -> &[ComponentRef] {
        &self.component_dependencies
    }
}

impl WorkloadStages for ComponentWorkload {
    /// Manifests resolve against the component's own config file when known
    fn load_manifests(&mut self, workload_path: &Path) -> Result<()> {
        let base = if self.config_path.as_os_str().is_empty() {
            config_dir(workload_path)
        } else {
            config_dir(&self.config_path)
        };
        self.spec
            .load_manifests(&base)
            .map_err(|e| self.context(e))
    }

    fn set_resources(&mut self) -> Result<()> {
        let api = self.api.clone();
        self.spec
            .process_manifests(&api, &[MarkerScope::Field])
            .map_err(|e| self.context(e))?;

        debug!(
            component = %self.shared.name,
            collection = ?self.collection,
            "component resources set"
        );
        Ok(())
    }

    fn set_names(&mut self) {
        self.shared.set_package_name();

        let description = format!("Manage {} workload", self.shared.package_name);
        self.sub_command.set_common_values(
            &self.shared.package_name,
            &description,
            CommandRole::Sub,
        );
    }

    fn set_components(&mut self, _components: Vec<ComponentWorkload>) -> Result<()> {
        Err(self.context(WorkloadError::NoComponentsOnComponent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(sub: CliCommand) -> ComponentWorkload {
        let mut workload = ComponentWorkload::new(
            "shared-name",
            WorkloadApiSpec {
                kind: "ComponentWorkloadTest".to_string(),
                ..Default::default()
            },
            Vec::<String>::new(),
            Vec::<String>::new(),
        );
        workload.sub_command = sub;
        workload
    }

    #[test]
    fn test_set_names_missing_subcommand() {
        let mut workload = component(CliCommand::default());
        workload.set_names();

        assert_eq!(workload.shared.package_name, "sharedname");
        let sub = &workload.sub_command;
        assert_eq!(sub.name, "sharedname");
        assert_eq!(sub.description, "Manage sharedname workload");
        assert_eq!(sub.var_name, "Sharedname");
        assert_eq!(sub.file_name, "sharedname");
        assert!(sub.is_subcommand);
        assert!(!sub.is_rootcommand);
    }

    #[test]
    fn test_set_names_with_subcommand() {
        let mut workload = component(CliCommand::new("hassubcommand", "custom description"));
        workload.set_names();

        let sub = &workload.sub_command;
        assert_eq!(sub.name, "hassubcommand");
        assert_eq!(sub.description, "custom description");
        assert_eq!(sub.var_name, "Hassubcommand");
        assert!(sub.is_subcommand);

        let once = workload.clone();
        workload.set_names();
        assert_eq!(workload, once);
    }

    #[test]
    fn test_no_components_on_component() {
        let mut workload = component(CliCommand::default());
        let err = workload.set_components(Vec::new()).unwrap_err();
        assert!(matches!(err.root(), WorkloadError::NoComponentsOnComponent));
        assert!(workload.root_command().is_none());
    }

    #[test]
    fn test_attach_inherits_domain() {
        let mut workload = component(CliCommand::default());
        workload.attach("platform", "acme.com");
        assert_eq!(workload.collection(), Some("platform"));
        assert_eq!(workload.api.domain, "acme.com");

        workload.api.domain = "other.io".to_string();
        workload.attach("platform", "acme.com");
        assert_eq!(workload.api.domain, "other.io");
    }

    #[test]
    fn test_component_resource() {
        let workload = ComponentWorkload::new(
            "widget",
            WorkloadApiSpec {
                group: "apps".to_string(),
                version: "v1".to_string(),
                kind: "Widget".to_string(),
                ..Default::default()
            },
            Vec::<String>::new(),
            Vec::<String>::new(),
        );
        let resource = workload.component_resource("example.com", "repo/mod", true);

        assert!(!resource.namespaced);
        assert_eq!(resource.plural, "widgets");
        assert_eq!(resource.path, "repo/mod/apis/apps/v1");
    }
}
