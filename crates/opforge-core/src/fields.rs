//! Merged API field tree
//!
//! Marker hits from every manifest of a workload merge into one tree keyed by
//! dotted field name. `web.image` and `web.replicas` share an implicit `web`
//! object node. Insertion order is kept at every level so generated types and
//! samples list fields in the order the manifests declare them.

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};
use tracing::trace;

use crate::error::{CoreError, Result};
use crate::markers::{FieldType, MarkerHit, MarkerScope, ParsedManifest};

/// Manifest location of the marker that introduced a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOrigin {
    pub manifest: PathBuf,
    pub line: usize,
}

impl FieldOrigin {
    pub fn new(manifest: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            manifest: manifest.into(),
            line,
        }
    }
}

impl fmt::Display for FieldOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.manifest.display(), self.line)
    }
}

impl Serialize for FieldOrigin {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A node of the field tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiField {
    /// Last segment of the dotted path
    pub name: String,

    /// Full dotted path from the root
    pub path: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub origin: FieldOrigin,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub children: IndexMap<String, ApiField>,

    /// Declared by a marker, as opposed to implied by a nested path
    #[serde(skip)]
    pub marked: bool,
}

impl ApiField {
    fn implicit(name: &str, path: String, origin: FieldOrigin) -> Self {
        Self {
            name: name.to_string(),
            path,
            field_type: FieldType::Object,
            default: None,
            description: None,
            origin,
            children: IndexMap::new(),
            marked: false,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.marked
    }

    fn schema(&self) -> Value {
        if !self.marked {
            return object_schema(&self.children);
        }

        let mut schema = Map::new();
        schema.insert("type".into(), json!(self.field_type.schema_type()));
        if let Some(default) = &self.default {
            schema.insert("default".into(), default.clone());
        }
        if let Some(description) = &self.description {
            schema.insert("description".into(), json!(description));
        }
        Value::Object(schema)
    }

    fn sample(&self) -> Value {
        if self.marked {
            self.default.clone().unwrap_or(Value::Null)
        } else {
            sample_object(&self.children)
        }
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a ApiField>) {
        if self.marked {
            out.push(self);
        }
        for child in self.children.values() {
            child.collect_leaves(out);
        }
    }
}

/// Ordered, de-duplicated field tree of a workload's API
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ApiFields {
    root: IndexMap<String, ApiField>,
}

impl ApiFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge every hit of `manifest` whose scope is in `scopes`
    pub fn add_manifest(&mut self, manifest: &ParsedManifest, scopes: &[MarkerScope]) -> Result<()> {
        for hit in manifest.markers_in(scopes) {
            self.add_marker(&manifest.path, hit)?;
        }
        Ok(())
    }

    /// Merge a single marker hit
    ///
    /// The first definition of a path wins; redefining it with the same type
    /// is a no-op and with another type is a `FieldTypeConflict`, as is using a
    /// path both as a leaf and as the prefix of another field.
    pub fn add_marker(&mut self, manifest: &Path, hit: &MarkerHit) -> Result<()> {
        let origin = FieldOrigin::new(manifest, hit.line);
        let segments: Vec<&str> = hit.field.split('.').collect();
        let Some((leaf, parents)) = segments.split_last() else {
            return Ok(());
        };

        let mut level = &mut self.root;
        let mut path = String::new();

        for segment in parents {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(segment);

            let node = level
                .entry(segment.to_string())
                .or_insert_with(|| ApiField::implicit(segment, path.clone(), origin.clone()));

            if node.marked {
                return Err(CoreError::FieldTypeConflict {
                    field: path,
                    existing: node.field_type,
                    existing_origin: node.origin.to_string(),
                    conflicting: FieldType::Object,
                    conflicting_origin: origin.to_string(),
                });
            }
            level = &mut node.children;
        }

        if !path.is_empty() {
            path.push('.');
        }
        path.push_str(leaf);

        match level.get(*leaf) {
            Some(existing) if existing.marked && existing.field_type == hit.field_type => {
                trace!(field = %path, origin = %origin, "field already defined");
                Ok(())
            }
            Some(existing) => Err(CoreError::FieldTypeConflict {
                field: path,
                existing: existing.field_type,
                existing_origin: existing.origin.to_string(),
                conflicting: hit.field_type,
                conflicting_origin: origin.to_string(),
            }),
            None => {
                trace!(field = %path, field_type = %hit.field_type, "adding field");
                level.insert(
                    leaf.to_string(),
                    ApiField {
                        name: leaf.to_string(),
                        path,
                        field_type: hit.field_type,
                        default: Some(hit.default.clone()),
                        description: hit.description.clone(),
                        origin,
                        children: IndexMap::new(),
                        marked: true,
                    },
                );
                Ok(())
            }
        }
    }

    /// Look up a node by dotted path
    pub fn get(&self, path: &str) -> Option<&ApiField> {
        let mut segments = path.split('.');
        let mut node = self.root.get(segments.next()?)?;
        for segment in segments {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    /// Top-level nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &ApiField> {
        self.root.values()
    }

    /// Marker-defined fields, depth first in insertion order
    pub fn leaves(&self) -> Vec<&ApiField> {
        let mut out = Vec::new();
        for node in self.root.values() {
            node.collect_leaves(&mut out);
        }
        out
    }

    /// Number of marker-defined fields
    pub fn len(&self) -> usize {
        self.leaves().len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// JSON-schema-like description of the `spec` of the generated resource
    pub fn to_schema(&self) -> Value {
        object_schema(&self.root)
    }

    /// A `spec` populated with every field's default
    pub fn sample_spec(&self) -> Value {
        sample_object(&self.root)
    }
}

fn object_schema(children: &IndexMap<String, ApiField>) -> Value {
    let properties: Map<String, Value> = children
        .iter()
        .map(|(name, field)| (name.clone(), field.schema()))
        .collect();
    json!({ "type": "object", "properties": properties })
}

fn sample_object(children: &IndexMap<String, ApiField>) -> Value {
    Value::Object(
        children
            .iter()
            .map(|(name, field)| (name.clone(), field.sample()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::parse_manifest;

    fn hit(field: &str, field_type: FieldType, default: Value, line: usize) -> MarkerHit {
        MarkerHit {
            line,
            document: 0,
            key_path: "spec.value".to_string(),
            field: field.to_string(),
            field_type,
            default,
            description: None,
            replace: None,
            scope: MarkerScope::Field,
        }
    }

    #[test]
    fn test_same_path_same_type_is_noop() {
        let mut fields = ApiFields::new();
        fields
            .add_marker(Path::new("a.yaml"), &hit("replicas", FieldType::Integer, json!(2), 3))
            .unwrap();
        fields
            .add_marker(Path::new("b.yaml"), &hit("replicas", FieldType::Integer, json!(5), 9))
            .unwrap();

        assert_eq!(fields.len(), 1);
        let replicas = fields.get("replicas").unwrap();
        assert_eq!(replicas.default, Some(json!(2)));
        assert_eq!(replicas.origin.to_string(), "a.yaml:3");
    }

    #[test]
    fn test_conflicting_types() {
        let mut fields = ApiFields::new();
        fields
            .add_marker(Path::new("a.yaml"), &hit("replicas", FieldType::Integer, json!(2), 3))
            .unwrap();
        let err = fields
            .add_marker(Path::new("b.yaml"), &hit("replicas", FieldType::String, json!("2"), 7))
            .unwrap_err();

        match err {
            CoreError::FieldTypeConflict {
                field,
                existing,
                existing_origin,
                conflicting,
                conflicting_origin,
            } => {
                assert_eq!(field, "replicas");
                assert_eq!(existing, FieldType::Integer);
                assert_eq!(existing_origin, "a.yaml:3");
                assert_eq!(conflicting, FieldType::String);
                assert_eq!(conflicting_origin, "b.yaml:7");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_leaf_and_prefix_conflict() {
        let mut fields = ApiFields::new();
        fields
            .add_marker(Path::new("a.yaml"), &hit("web", FieldType::String, json!("x"), 1))
            .unwrap();
        let err = fields
            .add_marker(Path::new("a.yaml"), &hit("web.image", FieldType::String, json!("y"), 2))
            .unwrap_err();
        assert!(matches!(err, CoreError::FieldTypeConflict { ref field, .. } if field == "web"));

        let mut fields = ApiFields::new();
        fields
            .add_marker(Path::new("a.yaml"), &hit("web.image", FieldType::String, json!("y"), 2))
            .unwrap();
        let err = fields
            .add_marker(Path::new("a.yaml"), &hit("web", FieldType::Object, json!({}), 5))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::FieldTypeConflict {
                existing: FieldType::Object,
                ..
            }
        ));
    }

    #[test]
    fn test_nested_paths_and_order() {
        let content = r#"spec:
  replicas: 2 # +operator-builder:field:name=web.replicas
  image: nginx # +operator-builder:field:name=web.image,description="Web image"
  debug: false # +operator-builder:field:name=debug
  port: 80 # +operator-builder:collection:field:name=port
"#;
        let parsed = parse_manifest(Path::new("app.yaml"), content).unwrap();
        let mut fields = ApiFields::new();
        fields.add_manifest(&parsed, &[MarkerScope::Field]).unwrap();

        let paths: Vec<&str> = fields.leaves().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["web.replicas", "web.image", "debug"]);
        assert!(!fields.get("web").unwrap().is_leaf());
        assert!(fields.get("port").is_none());

        assert_eq!(
            fields.sample_spec(),
            json!({"web": {"replicas": 2, "image": "nginx"}, "debug": false})
        );
    }

    #[test]
    fn test_schema() {
        let content = "a: 1 # +operator-builder:field:name=web.replicas,description=\"Pods\"\nb: 1.5 # +operator-builder:field:name=ratio\n";
        let parsed = parse_manifest(Path::new("app.yaml"), content).unwrap();
        let mut fields = ApiFields::new();
        fields.add_manifest(&parsed, &[MarkerScope::Field]).unwrap();

        let rendered = serde_json::to_string_pretty(&fields.to_schema()).unwrap();
        insta::assert_snapshot!(rendered, @r###"
        {
          "type": "object",
          "properties": {
            "web": {
              "type": "object",
              "properties": {
                "replicas": {
                  "type": "integer",
                  "default": 1,
                  "description": "Pods"
                }
              }
            },
            "ratio": {
              "type": "number",
              "default": 1.5
            }
          }
        }
        "###);
    }
}
