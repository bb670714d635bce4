//! API coordinates for generated workload types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::naming::pluralize;

/// Target API coordinates for a workload's generated custom resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadApiSpec {
    #[serde(default)]
    pub domain: String,

    #[serde(default)]
    pub group: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub cluster_scoped: bool,
}

impl WorkloadApiSpec {
    /// Placeholder coordinates used by generated sample configs
    pub fn sample() -> Self {
        Self {
            domain: "acme.com".to_string(),
            group: "apps".to_string(),
            version: "v1alpha1".to_string(),
            kind: "MyApp".to_string(),
            cluster_scoped: false,
        }
    }

    /// Config paths of required coordinates that are empty
    ///
    /// `domain` is only required when `require_domain` is set (collections);
    /// components inherit theirs from the owning collection.
    pub fn missing_fields(&self, require_domain: bool) -> Vec<String> {
        let mut missing = Vec::new();

        if require_domain && self.domain.is_empty() {
            missing.push("spec.api.domain".to_string());
        }
        if self.group.is_empty() {
            missing.push("spec.api.group".to_string());
        }
        if self.version.is_empty() {
            missing.push("spec.api.version".to_string());
        }
        if self.kind.is_empty() {
            missing.push("spec.api.kind".to_string());
        }

        missing
    }

    /// Fully qualified API group (`apps.acme.com`)
    pub fn qualified_group(&self) -> String {
        match (self.group.is_empty(), self.domain.is_empty()) {
            (_, true) => self.group.clone(),
            (true, false) => self.domain.clone(),
            (false, false) => format!("{}.{}", self.group, self.domain),
        }
    }

    /// The group/version/kind of the generated custom resource
    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind {
            group: self.qualified_group(),
            version: self.version.clone(),
            kind: self.kind.clone(),
        }
    }

    /// Lowercase plural resource name of the generated kind
    pub fn plural(&self) -> String {
        pluralize(&self.kind)
    }

    /// Descriptor used to register the generated API type
    pub fn component_resource(
        &self,
        domain: &str,
        repo: &str,
        cluster_scoped: bool,
    ) -> ComponentResource {
        ComponentResource {
            domain: domain.to_string(),
            group: self.group.clone(),
            version: self.version.clone(),
            kind: self.kind.clone(),
            plural: self.plural(),
            path: format!("{}/apis/{}/{}", repo, self.group, self.version),
            namespaced: !cluster_scoped,
            controller: true,
            crd_version: "v1".to_string(),
        }
    }
}

/// Canonical descriptor of a generated API resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentResource {
    pub domain: String,
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
    /// Go-style import path of the API package
    pub path: String,
    pub namespaced: bool,
    pub controller: bool,
    pub crd_version: String,
}

impl ComponentResource {
    #[inline]
    pub fn is_cluster_scoped(&self) -> bool {
        !self.namespaced
    }
}

/// A Kubernetes group/version/kind triple
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupVersionKind {
    /// API group, empty for the core group
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    /// Split a manifest `apiVersion` (`apps/v1`, `v1`) and pair it with a kind
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        let (group, version) = match api_version.rsplit_once('/') {
            Some((group, version)) => (group, version),
            None => ("", api_version),
        };

        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        }
    }

    /// `apiVersion` form of the group and version
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}
