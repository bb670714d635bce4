//! The shared workload capability contract
//!
//! Each workload shape implements [`WorkloadBuilder`]. Decoding a config
//! yields a [`Workload`], which dispatches to the concrete shape.

use std::path::{Path, PathBuf};

use opforge_core::{
    ApiFields, CliCommand, ComponentResource, CoreError, Manifest, MarkerScope, OwnershipRules,
    ParsedManifest, RbacRules, SourceFile, WorkloadApiSpec, WorkloadKind, expand_manifests,
    markers::parse_manifest, source::func_names, to_package_name,
};
use tracing::debug;

use crate::collection::WorkloadCollection;
use crate::component::ComponentWorkload;
use crate::dependency::ComponentRef;
use crate::error::{Result, WorkloadError};
use crate::standalone::StandaloneWorkload;

/// Identity shared by every workload shape
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadShared {
    pub name: String,

    /// Derived from `name` by `set_names`
    pub package_name: String,

    pub kind: WorkloadKind,
}

impl WorkloadShared {
    pub fn new(name: impl Into<String>, kind: WorkloadKind) -> Self {
        Self {
            name: name.into(),
            package_name: String::new(),
            kind,
        }
    }

    pub(crate) fn set_package_name(&mut self) {
        self.package_name = to_package_name(&self.name);
    }

    /// Report `name` plus the missing API coordinates
    pub(crate) fn check_required(&self, api: &WorkloadApiSpec, require_domain: bool) -> Result<()> {
        let mut fields = Vec::new();
        if self.name.is_empty() {
            fields.push("name".to_string());
        }
        fields.extend(api.missing_fields(require_domain));

        if fields.is_empty() {
            Ok(())
        } else {
            Err(WorkloadError::MissingRequiredFields { fields }.in_workload(self.kind, &self.name))
        }
    }
}

/// Manifests of a workload and everything derived from them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkloadSpec {
    /// Manifest references as written in the config
    pub resources: Vec<String>,

    /// Expanded manifest entries, in first-seen order
    pub manifests: Vec<Manifest>,

    /// Manifests with their markers resolved
    pub parsed: Vec<ParsedManifest>,

    pub api_spec_fields: ApiFields,
    pub source_files: Vec<SourceFile>,
    pub rbac_rules: RbacRules,
    pub ownership_rules: OwnershipRules,
}

impl WorkloadSpec {
    pub fn new<S: Into<String>>(resources: impl IntoIterator<Item = S>) -> Self {
        Self {
            resources: resources.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Expand resource references relative to `base` and read every manifest
    pub(crate) fn load_manifests(&mut self, base: &Path) -> std::result::Result<(), CoreError> {
        let mut manifests = expand_manifests(base, &self.resources)?;
        for manifest in &mut manifests {
            manifest.load()?;
        }
        debug!(
            base = %base.display(),
            manifests = manifests.len(),
            "loaded workload manifests"
        );
        self.manifests = manifests;
        Ok(())
    }

    /// Parse markers and derive fields, source files and rules
    ///
    /// Only markers whose scope is in `scopes` populate the field tree.
    /// Everything derived is rebuilt from scratch.
    pub(crate) fn process_manifests(
        &mut self,
        api: &WorkloadApiSpec,
        scopes: &[MarkerScope],
    ) -> std::result::Result<(), CoreError> {
        let mut parsed = Vec::with_capacity(self.manifests.len());
        for manifest in &mut self.manifests {
            if !manifest.is_loaded() {
                manifest.load()?;
            }
            let content = manifest.content().unwrap_or_default();
            parsed.push(parse_manifest(&manifest.path, content)?);
        }

        let mut fields = ApiFields::new();
        for manifest in &parsed {
            fields.add_manifest(manifest, scopes)?;
        }

        let source_files = SourceFile::plan(&parsed)?;

        let mut rbac_rules = RbacRules::new();
        rbac_rules.add_workload_api(api);
        rbac_rules.add_source_files(&source_files);

        let mut ownership_rules = OwnershipRules::new();
        ownership_rules.add_source_files(&source_files, &api.gvk());

        debug!(
            fields = fields.len(),
            source_files = source_files.len(),
            rbac_rules = rbac_rules.len(),
            "processed workload manifests"
        );

        self.parsed = parsed;
        self.api_spec_fields = fields;
        self.source_files = source_files;
        self.rbac_rules = rbac_rules;
        self.ownership_rules = ownership_rules;
        Ok(())
    }

    /// Fail on the first marker whose scope is not allowed here
    pub(crate) fn reject_scope(
        &self,
        scope: MarkerScope,
        reason: &str,
    ) -> std::result::Result<(), CoreError> {
        for manifest in &self.parsed {
            if let Some(hit) = manifest.markers.iter().find(|m| m.scope == scope) {
                return Err(CoreError::InvalidMarker {
                    path: manifest.path.clone(),
                    line: hit.line,
                    message: reason.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Directory workload manifests are resolved against
pub(crate) fn config_dir(workload_path: &Path) -> PathBuf {
    match workload_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ if workload_path.is_dir() => workload_path.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Capabilities every workload shape provides to the generation layer
pub trait WorkloadBuilder {
    fn shared(&self) -> &WorkloadShared;
    fn api(&self) -> &WorkloadApiSpec;
    fn spec(&self) -> &WorkloadSpec;

    /// Check required fields; collections also check their components
    fn validate(&self) -> Result<()>;

    fn root_command(&self) -> Option<&CliCommand>;
    fn sub_command(&self) -> Option<&CliCommand>;

    fn components(&self) -> &[ComponentWorkload] {
        &[]
    }

    /// Resolved sibling dependencies, for components
    fn dependencies(&self) -> &[ComponentRef] {
        &[]
    }

    fn name(&self) -> &str {
        &self.shared().name
    }

    fn package_name(&self) -> &str {
        &self.shared().package_name
    }

    fn workload_kind(&self) -> WorkloadKind {
        self.shared().kind
    }

    fn domain(&self) -> &str {
        &self.api().domain
    }

    fn api_group(&self) -> &str {
        &self.api().group
    }

    fn api_version(&self) -> &str {
        &self.api().version
    }

    fn api_kind(&self) -> &str {
        &self.api().kind
    }

    fn is_cluster_scoped(&self) -> bool {
        self.api().cluster_scoped
    }

    fn is_standalone(&self) -> bool {
        self.workload_kind() == WorkloadKind::Standalone
    }

    fn is_collection(&self) -> bool {
        self.workload_kind() == WorkloadKind::Collection
    }

    fn is_component(&self) -> bool {
        self.workload_kind() == WorkloadKind::Component
    }

    fn has_root_cmd_name(&self) -> bool {
        self.root_command().is_some_and(CliCommand::has_name)
    }

    fn has_sub_cmd_name(&self) -> bool {
        self.sub_command().is_some_and(CliCommand::has_name)
    }

    fn has_child_resources(&self) -> bool {
        !self.spec().resources.is_empty()
    }

    fn api_spec_fields(&self) -> &ApiFields {
        &self.spec().api_spec_fields
    }

    fn rbac_rules(&self) -> &RbacRules {
        &self.spec().rbac_rules
    }

    fn ownership_rules(&self) -> &OwnershipRules {
        &self.spec().ownership_rules
    }

    fn source_files(&self) -> &[SourceFile] {
        &self.spec().source_files
    }

    /// Create and init function names across source files
    fn func_names(&self) -> (Vec<String>, Vec<String>) {
        func_names(self.source_files())
    }

    fn component_resource(&self, domain: &str, repo: &str, cluster_scoped: bool) -> ComponentResource {
        self.api().component_resource(domain, repo, cluster_scoped)
    }
}

/// Stage transitions, driven only by [`crate::Lifecycle`] and config loading
pub(crate) trait WorkloadStages: WorkloadBuilder {
    /// Expand and read manifests; `workload_path` is the config file location
    fn load_manifests(&mut self, workload_path: &Path) -> Result<()>;

    /// Parse markers and derive fields, source files and rules
    fn set_resources(&mut self) -> Result<()>;

    /// Derive the package name and companion command metadata
    fn set_names(&mut self);

    fn set_components(&mut self, components: Vec<ComponentWorkload>) -> Result<()>;
}

/// A decoded workload of any shape
#[derive(Debug, Clone, PartialEq)]
pub enum Workload {
    Standalone(StandaloneWorkload),
    Collection(WorkloadCollection),
    Component(ComponentWorkload),
}

macro_rules! dispatch {
    ($self:ident, $w:ident => $body:expr) => {
        match $self {
            Workload::Standalone($w) => $body,
            Workload::Collection($w) => $body,
            Workload::Component($w) => $body,
        }
    };
}

impl Workload {
    pub fn as_collection(&self) -> Option<&WorkloadCollection> {
        match self {
            Workload::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    pub fn as_collection_mut(&mut self) -> Option<&mut WorkloadCollection> {
        match self {
            Workload::Collection(collection) => Some(collection),
            _ => None,
        }
    }
}

impl WorkloadBuilder for Workload {
    fn shared(&self) -> &WorkloadShared {
        dispatch!(self, w => w.shared())
    }

    fn api(&self) -> &WorkloadApiSpec {
        dispatch!(self, w => w.api())
    }

    fn spec(&self) -> &WorkloadSpec {
        dispatch!(self, w => w.spec())
    }

    fn validate(&self) -> Result<()> {
        dispatch!(self, w => w.validate())
    }

    fn root_command(&self) -> Option<&CliCommand> {
        dispatch!(self, w => w.root_command())
    }

    fn sub_command(&self) -> Option<&CliCommand> {
        dispatch!(self, w => w.sub_command())
    }

    fn components(&self) -> &[ComponentWorkload] {
        dispatch!(self, w => w.components())
    }

    fn dependencies(&self) -> &[ComponentRef] {
        dispatch!(self, w => w.dependencies())
    }
}

impl WorkloadStages for Workload {
    fn load_manifests(&mut self, workload_path: &Path) -> Result<()> {
        dispatch!(self, w => w.load_manifests(workload_path))
    }

    fn set_resources(&mut self) -> Result<()> {
        dispatch!(self, w => w.set_resources())
    }

    fn set_names(&mut self) {
        dispatch!(self, w => w.set_names())
    }

    fn set_components(&mut self, components: Vec<ComponentWorkload>) -> Result<()> {
        dispatch!(self, w => w.set_components(components))
    }
}

impl From<StandaloneWorkload> for Workload {
    fn from(workload: StandaloneWorkload) -> Self {
        Workload::Standalone(workload)
    }
}

impl From<WorkloadCollection> for Workload {
    fn from(workload: WorkloadCollection) -> Self {
        Workload::Collection(workload)
    }
}

impl From<ComponentWorkload> for Workload {
    fn from(workload: ComponentWorkload) -> Self {
        Workload::Component(workload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir() {
        assert_eq!(config_dir(Path::new("configs/app.yaml")), PathBuf::from("configs"));
        assert_eq!(config_dir(Path::new("app.yaml")), PathBuf::from("."));
    }

    #[test]
    fn test_check_required() {
        let shared = WorkloadShared::new("", WorkloadKind::Collection);
        let err = shared
            .check_required(&WorkloadApiSpec::default(), true)
            .unwrap_err();

        match err.root() {
            WorkloadError::MissingRequiredFields { fields } => assert_eq!(
                fields,
                &vec![
                    "name",
                    "spec.api.domain",
                    "spec.api.group",
                    "spec.api.version",
                    "spec.api.kind"
                ]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_process_manifests_with_inline_content() {
        let content = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  replicas: 2 # +operator-builder:field:name=replicas
"#;
        let mut spec = WorkloadSpec::new(["app.yaml"]);
        spec.manifests = vec![Manifest::inline("app.yaml", content)];
        spec.process_manifests(&WorkloadApiSpec::sample(), &[MarkerScope::Field])
            .unwrap();

        assert_eq!(spec.api_spec_fields.len(), 1);
        assert_eq!(spec.source_files.len(), 1);
        assert!(spec.rbac_rules.allows("apps", "deployments", "create"));
        assert!(spec.rbac_rules.allows("apps.acme.com", "myapps/status", "update"));
        assert_eq!(spec.ownership_rules.len(), 1);
    }
}
