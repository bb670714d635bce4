//! RBAC rules a workload's controller needs
//!
//! The controller creates and updates every resource its manifests declare,
//! and must itself hold any permission granted by a Role or ClusterRole it
//! manages. Rules sharing a group and verb set collapse into one rule.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::api::WorkloadApiSpec;
use crate::naming::pluralize;
use crate::source::{ChildResource, SourceFile};

/// Verbs needed to reconcile a child resource
pub const DEFAULT_VERBS: &[&str] = &["get", "list", "watch", "create", "update", "patch", "delete"];

/// Verbs needed on the status subresource of the workload's own API
pub const STATUS_VERBS: &[&str] = &["get", "update", "patch"];

/// Access to a set of resources of one API group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RbacRule {
    /// API group, empty for the core group
    pub group: String,
    pub resources: BTreeSet<String>,
    pub verbs: BTreeSet<String>,
}

impl RbacRule {
    pub fn new<R, V>(group: impl Into<String>, resources: R, verbs: V) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            group: group.into(),
            resources: resources.into_iter().map(Into::into).collect(),
            verbs: verbs.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the rule grants `verb` on `resource` in `group`
    pub fn allows(&self, group: &str, resource: &str, verb: &str) -> bool {
        self.group == group
            && (self.resources.contains(resource) || self.resources.contains("*"))
            && (self.verbs.contains(verb) || self.verbs.contains("*"))
    }
}

/// Renders the rule as a kubebuilder RBAC marker
impl fmt::Display for RbacRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let group = if self.group.is_empty() {
            "core"
        } else {
            self.group.as_str()
        };
        let join = |set: &BTreeSet<String>| set.iter().cloned().collect::<Vec<_>>().join(";");

        write!(
            f,
            "+kubebuilder:rbac:groups={},resources={},verbs={}",
            group,
            join(&self.resources),
            join(&self.verbs)
        )
    }
}

/// De-duplicated rule set, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RbacRules {
    rules: Vec<RbacRule>,
}

impl RbacRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, merging it into an existing rule with the same group and verbs
    pub fn add(&mut self, rule: RbacRule) {
        match self
            .rules
            .iter_mut()
            .find(|r| r.group == rule.group && r.verbs == rule.verbs)
        {
            Some(existing) => existing.resources.extend(rule.resources),
            None => self.rules.push(rule),
        }
    }

    /// Rules for reconciling a child resource, plus any rules it grants
    pub fn add_child(&mut self, child: &ChildResource) {
        self.add(RbacRule::new(
            child.group.clone(),
            [pluralize(&child.kind)],
            DEFAULT_VERBS.iter().copied(),
        ));
        for rule in &child.role_rules {
            self.add(rule.clone());
        }
    }

    pub fn add_source_files(&mut self, files: &[SourceFile]) {
        for child in files.iter().flat_map(|f| &f.children) {
            self.add_child(child);
        }
    }

    /// Rules on the workload's own API and its status subresource
    pub fn add_workload_api(&mut self, api: &WorkloadApiSpec) {
        let plural = api.plural();
        let group = api.qualified_group();

        self.add(RbacRule::new(
            group.clone(),
            [plural.clone()],
            DEFAULT_VERBS.iter().copied(),
        ));
        self.add(RbacRule::new(
            group,
            [format!("{plural}/status")],
            STATUS_VERBS.iter().copied(),
        ));
    }

    pub fn merge(&mut self, other: &RbacRules) {
        for rule in &other.rules {
            self.add(rule.clone());
        }
    }

    pub fn allows(&self, group: &str, resource: &str, verb: &str) -> bool {
        self.rules.iter().any(|r| r.allows(group, resource, verb))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RbacRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
