//! Serializable view of a fully processed workload

use opforge_core::{
    ApiFields, CliCommand, ComponentResource, OwnershipRules, RbacRules, SourceFile, WorkloadKind,
};
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::lifecycle::{DependenciesResolved, Lifecycle};
use crate::workload::WorkloadBuilder;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSummary {
    pub name: String,
    pub kind: WorkloadKind,
    pub package_name: String,
    pub resource: ComponentResource,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_command: Option<CliCommand>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_command: Option<CliCommand>,

    pub fields: ApiFields,

    /// Sample `spec` built from field defaults
    pub sample_spec: Value,

    pub rbac_rules: RbacRules,
    pub ownership_rules: OwnershipRules,
    pub source_files: Vec<SourceFile>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub create_funcs: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub init_funcs: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<WorkloadSummary>,

    /// Components in dependency order, for collections
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub generation_order: Vec<String>,
}

impl WorkloadSummary {
    /// Summarize a resolved workload; `repo` is the generated module path
    ///
    /// Fails when the component graph has a cycle.
    pub fn new(lifecycle: &Lifecycle<DependenciesResolved>, repo: &str) -> Result<Self> {
        let workload = lifecycle.workload();
        let mut summary = Self::describe(workload, repo);
        if workload.is_collection() {
            summary.generation_order = lifecycle
                .generation_order()?
                .into_iter()
                .map(str::to_string)
                .collect();
        }
        Ok(summary)
    }

    fn describe<W: WorkloadBuilder + ?Sized>(workload: &W, repo: &str) -> Self {
        let named = |command: Option<&CliCommand>| command.filter(|c| c.has_name()).cloned();
        let (create_funcs, init_funcs) = workload.func_names();

        Self {
            name: workload.name().to_string(),
            kind: workload.workload_kind(),
            package_name: workload.package_name().to_string(),
            resource: workload.component_resource(
                workload.domain(),
                repo,
                workload.is_cluster_scoped(),
            ),
            root_command: named(workload.root_command()),
            sub_command: named(workload.sub_command()),
            fields: workload.api_spec_fields().clone(),
            sample_spec: workload.api_spec_fields().sample_spec(),
            rbac_rules: workload.rbac_rules().clone(),
            ownership_rules: workload.ownership_rules().clone(),
            source_files: workload.source_files().to_vec(),
            create_funcs,
            init_funcs,
            dependencies: workload
                .dependencies()
                .iter()
                .map(|d| d.name.clone())
                .collect(),
            components: workload
                .components()
                .iter()
                .map(|c| Self::describe(c, repo))
                .collect(),
            generation_order: Vec::new(),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
