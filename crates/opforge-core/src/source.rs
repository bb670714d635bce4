//! Per-manifest generation units
//!
//! Every manifest becomes one generated source file holding one create
//! function per resource document. The planner gives each resource a unique
//! identifier across the workload so generated names never collide.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;
use serde_yaml::Value;
use tracing::debug;

use crate::api::GroupVersionKind;
use crate::error::{CoreError, Result};
use crate::manifest::split_documents;
use crate::markers::ParsedManifest;
use crate::naming::{to_snake_case, to_var_name};
use crate::rbac::RbacRule;

const RBAC_GROUP: &str = "rbac.authorization.k8s.io";

/// One resource document of a manifest
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildResource {
    pub name: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    /// Identifier unique across the workload (`DeploymentDefaultWebStore`)
    pub unique_name: String,

    pub group: String,
    pub version: String,
    pub kind: String,

    pub create_func_name: String,

    /// Document text with marker comments stripped
    #[serde(skip)]
    pub content: String,

    /// Rules granted by this resource when it is a Role or ClusterRole
    #[serde(skip)]
    pub role_rules: Vec<RbacRule>,
}

impl ChildResource {
    /// Decode a single manifest document
    ///
    /// Returns `None` for empty documents.
    pub fn from_document(manifest: &ParsedManifest, text: &str) -> Result<Option<Self>> {
        let invalid = |message: String| CoreError::InvalidManifest {
            path: manifest.path.clone(),
            message,
        };

        let document: Value = serde_yaml::from_str(text).map_err(|e| invalid(e.to_string()))?;
        if document.is_null() {
            return Ok(None);
        }
        if !document.is_mapping() {
            return Err(invalid("resource document is not a mapping".to_string()));
        }

        let api_version = document
            .get("apiVersion")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("resource document has no apiVersion".to_string()))?;
        let kind = document
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("resource document has no kind".to_string()))?;

        let metadata = document.get("metadata");
        let name = metadata
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| invalid(format!("{kind} has no metadata.name")))?;
        let namespace = metadata
            .and_then(|m| m.get("namespace"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        let gvk = GroupVersionKind::from_api_version(api_version, kind);
        let unique_name = to_var_name(&format!("{kind}-{namespace}-{name}"));

        let role_rules = if gvk.group == RBAC_GROUP && matches!(kind, "Role" | "ClusterRole") {
            role_rules(&document)
        } else {
            Vec::new()
        };

        Ok(Some(Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            create_func_name: format!("Create{unique_name}"),
            unique_name,
            group: gvk.group,
            version: gvk.version,
            kind: gvk.kind,
            content: text.to_string(),
            role_rules,
        }))
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind {
            group: self.group.clone(),
            version: self.version.clone(),
            kind: self.kind.clone(),
        }
    }

    /// Custom resource definitions get an init function in addition to create
    #[inline]
    pub fn is_crd(&self) -> bool {
        self.kind == "CustomResourceDefinition"
    }

    fn rename(&mut self, unique_name: String) {
        self.create_func_name = format!("Create{unique_name}");
        self.unique_name = unique_name;
    }
}

fn role_rules(document: &Value) -> Vec<RbacRule> {
    let strings = |value: Option<&Value>| -> Vec<String> {
        value
            .and_then(Value::as_sequence)
            .map(|seq| {
                seq.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };

    let Some(rules) = document.get("rules").and_then(Value::as_sequence) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for rule in rules {
        let resources = strings(rule.get("resources"));
        let verbs = strings(rule.get("verbs"));
        if resources.is_empty() || verbs.is_empty() {
            continue;
        }
        for group in strings(rule.get("apiGroups")) {
            out.push(RbacRule::new(group, resources.clone(), verbs.clone()));
        }
    }
    out
}

/// A generated source file and the resources it creates
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    /// Snake-case stem of the generated file
    pub file_name: String,

    pub manifest: PathBuf,

    pub children: Vec<ChildResource>,
}

impl SourceFile {
    /// Build the source file for one parsed manifest
    pub fn from_manifest(manifest: &ParsedManifest) -> Result<Self> {
        let stem = manifest
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut children = Vec::new();
        for (_, text) in split_documents(&manifest.content) {
            if let Some(child) = ChildResource::from_document(manifest, &text)? {
                children.push(child);
            }
        }

        Ok(Self {
            file_name: to_snake_case(&stem),
            manifest: manifest.path.clone(),
            children,
        })
    }

    /// Plan source files for every manifest of a workload
    ///
    /// File names and child identifiers are made unique by numeric suffixes
    /// in manifest order.
    pub fn plan(manifests: &[ParsedManifest]) -> Result<Vec<Self>> {
        let mut files = Vec::with_capacity(manifests.len());
        let mut file_names: HashMap<String, usize> = HashMap::new();
        let mut unique_names: HashMap<String, usize> = HashMap::new();

        for manifest in manifests {
            let mut file = Self::from_manifest(manifest)?;
            file.file_name = dedupe(&mut file_names, &file.file_name, "_");

            for child in &mut file.children {
                let unique = dedupe(&mut unique_names, &child.unique_name, "");
                if unique != child.unique_name {
                    child.rename(unique);
                }
            }

            debug!(
                file = %file.file_name,
                children = file.children.len(),
                "planned source file"
            );
            files.push(file);
        }

        Ok(files)
    }
}

fn dedupe(seen: &mut HashMap<String, usize>, name: &str, separator: &str) -> String {
    let count = seen.entry(name.to_string()).or_insert(0);
    *count += 1;
    if *count == 1 {
        name.to_string()
    } else {
        format!("{name}{separator}{count}")
    }
}

/// Create and init function names across source files
///
/// Init functions exist only for custom resource definitions.
pub fn func_names(files: &[SourceFile]) -> (Vec<String>, Vec<String>) {
    let mut create = Vec::new();
    let mut init = Vec::new();

    for child in files.iter().flat_map(|f| &f.children) {
        create.push(child.create_func_name.clone());
        if child.is_crd() {
            init.push(format!("Init{}", child.unique_name));
        }
    }

    (create, init)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::parse_manifest;
    use std::path::Path;

    fn parsed(path: &str, content: &str) -> ParsedManifest {
        parse_manifest(Path::new(path), content).unwrap()
    }

    const APP: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: web-store
  namespace: default
spec:
  replicas: 2 # +operator-builder:field:name=replicas
---
apiVersion: v1
kind: Service
metadata:
  name: web-store
"#;

    #[test]
    fn test_children() {
        let file = SourceFile::from_manifest(&parsed("manifests/web-store.yaml", APP)).unwrap();

        assert_eq!(file.file_name, "web_store");
        assert_eq!(file.children.len(), 2);

        let deploy = &file.children[0];
        assert_eq!(deploy.unique_name, "DeploymentDefaultWebStore");
        assert_eq!(deploy.create_func_name, "CreateDeploymentDefaultWebStore");
        assert_eq!(deploy.group, "apps");
        assert_eq!(deploy.version, "v1");
        assert!(!deploy.content.contains("+operator-builder"));

        let service = &file.children[1];
        assert_eq!(service.unique_name, "ServiceWebStore");
        assert_eq!(service.group, "");
        assert_eq!(service.namespace, "");
    }

    #[test]
    fn test_plan_dedupes_names() {
        let first = parsed("a/app.yaml", APP);
        let second = parsed("b/app.yaml", APP);
        let files = SourceFile::plan(&[first, second]).unwrap();

        assert_eq!(files[0].file_name, "app");
        assert_eq!(files[1].file_name, "app_2");
        assert_eq!(files[1].children[0].unique_name, "DeploymentDefaultWebStore2");
        assert_eq!(
            files[1].children[0].create_func_name,
            "CreateDeploymentDefaultWebStore2"
        );
    }

    #[test]
    fn test_func_names() {
        let crd = r#"apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: widgets.acme.com
"#;
        let files = SourceFile::plan(&[parsed("crd.yaml", crd), parsed("app.yaml", APP)]).unwrap();
        let (create, init) = func_names(&files);

        assert_eq!(
            create,
            vec![
                "CreateCustomResourceDefinitionWidgetsAcmeCom",
                "CreateDeploymentDefaultWebStore",
                "CreateServiceWebStore"
            ]
        );
        assert_eq!(init, vec!["InitCustomResourceDefinitionWidgetsAcmeCom"]);
    }

    #[test]
    fn test_role_rules() {
        let role = r#"apiVersion: rbac.authorization.k8s.io/v1
kind: ClusterRole
metadata:
  name: reader
rules:
  - apiGroups: ["", "apps"]
    resources: ["pods", "deployments"]
    verbs: ["get", "list"]
  - nonResourceURLs: ["/healthz"]
    verbs: ["get"]
"#;
        let file = SourceFile::from_manifest(&parsed("role.yaml", role)).unwrap();
        let rules = &file.children[0].role_rules;

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].group, "");
        assert_eq!(rules[1].group, "apps");
        assert!(rules[1].resources.contains("deployments"));
        assert!(rules[1].verbs.contains("list"));
    }

    #[test]
    fn test_invalid_documents() {
        let no_kind = parsed("x.yaml", "apiVersion: v1\nmetadata:\n  name: x\n");
        assert!(matches!(
            SourceFile::from_manifest(&no_kind),
            Err(CoreError::InvalidManifest { .. })
        ));

        let no_name = parsed("x.yaml", "apiVersion: v1\nkind: ConfigMap\n");
        let err = SourceFile::from_manifest(&no_name).unwrap_err();
        assert!(err.to_string().contains("ConfigMap has no metadata.name"));

        let scalar = parsed("x.yaml", "just text\n");
        assert!(SourceFile::from_manifest(&scalar).is_err());
    }
}
