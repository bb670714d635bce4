//! Workload kind registry

use std::fmt;
use std::str::FromStr;

use phf::phf_map;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CoreError, Result};

/// Textual tags accepted in workload configuration documents
static WORKLOAD_KINDS: phf::Map<&'static str, WorkloadKind> = phf_map! {
    "StandaloneWorkload" => WorkloadKind::Standalone,
    "WorkloadCollection" => WorkloadKind::Collection,
    "ComponentWorkload" => WorkloadKind::Component,
};

/// Which of the supported workload shapes a configuration describes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    #[default]
    Unknown,
    Standalone,
    Collection,
    Component,
}

impl WorkloadKind {
    /// Decode a textual tag, rejecting anything outside the closed set
    pub fn parse(tag: &str) -> Result<Self> {
        WORKLOAD_KINDS
            .get(tag)
            .copied()
            .ok_or_else(|| CoreError::InvalidKind {
                tag: tag.to_string(),
            })
    }

    /// The textual tag for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standalone => "StandaloneWorkload",
            Self::Collection => "WorkloadCollection",
            Self::Component => "ComponentWorkload",
            Self::Unknown => "Unknown Workload Type",
        }
    }

    #[inline]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for WorkloadKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if !self.is_known() {
            return Err(serde::ser::Error::custom(
                "refusing to serialize an unknown workload kind",
            ));
        }
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for WorkloadKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Self::parse(&tag).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tags() {
        assert_eq!(
            WorkloadKind::parse("StandaloneWorkload").unwrap(),
            WorkloadKind::Standalone
        );
        assert_eq!(
            WorkloadKind::parse("WorkloadCollection").unwrap(),
            WorkloadKind::Collection
        );
        assert_eq!(
            WorkloadKind::parse("ComponentWorkload").unwrap(),
            WorkloadKind::Component
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        for tag in ["", "standaloneworkload", "Unknown Workload Type", "Workload"] {
            let err = WorkloadKind::parse(tag).unwrap_err();
            assert!(matches!(err, CoreError::InvalidKind { .. }), "{tag}");
        }
    }

    #[test]
    fn test_format_parse_identity() {
        for kind in [
            WorkloadKind::Standalone,
            WorkloadKind::Collection,
            WorkloadKind::Component,
        ] {
            assert_eq!(WorkloadKind::parse(&kind.to_string()).unwrap(), kind);
        }
        assert_eq!(WorkloadKind::Unknown.to_string(), "Unknown Workload Type");
    }

    #[test]
    fn test_serde() {
        let kind: WorkloadKind = serde_yaml::from_str("WorkloadCollection").unwrap();
        assert_eq!(kind, WorkloadKind::Collection);
        assert_eq!(
            serde_yaml::to_string(&WorkloadKind::Component).unwrap().trim(),
            "ComponentWorkload"
        );

        assert!(serde_yaml::from_str::<WorkloadKind>("Collection").is_err());
        assert!(serde_yaml::to_string(&WorkloadKind::Unknown).is_err());
    }
}
