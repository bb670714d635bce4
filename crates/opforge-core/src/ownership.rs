//! Ownership rules between a workload's API and its child resources

use std::collections::BTreeSet;

use serde::Serialize;

use crate::api::GroupVersionKind;
use crate::source::SourceFile;

/// `owner` owns resources of type `owned`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct OwnershipRule {
    pub owned: GroupVersionKind,
    pub owner: GroupVersionKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OwnershipRules {
    rules: BTreeSet<OwnershipRule>,
}

impl OwnershipRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the rule was already present
    pub fn add(&mut self, owned: GroupVersionKind, owner: GroupVersionKind) -> bool {
        self.rules.insert(OwnershipRule { owned, owner })
    }

    /// One rule per distinct child kind across `files`, all owned by `owner`
    pub fn add_source_files(&mut self, files: &[SourceFile], owner: &GroupVersionKind) {
        for child in files.iter().flat_map(|f| &f.children) {
            self.add(child.gvk(), owner.clone());
        }
    }

    pub fn contains(&self, owned: &GroupVersionKind, owner: &GroupVersionKind) -> bool {
        self.rules.iter().any(|r| &r.owned == owned && &r.owner == owner)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OwnershipRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
