//! Workload configuration files
//!
//! Decoding peeks the `kind` tag, then reads the matching typed document.
//! Encoding goes through [`ConfigDocument`] before serialization.

use std::path::{Path, PathBuf};

use opforge_core::{CliCommand, CoreError, WorkloadApiSpec, WorkloadKind, expand_manifests};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collection::WorkloadCollection;
use crate::component::ComponentWorkload;
use crate::error::{Result, WorkloadError};
use crate::standalone::StandaloneWorkload;
use crate::workload::{Workload, WorkloadBuilder, WorkloadStages, config_dir};

/// Path meaning "standard output" for written configs
pub const STDOUT_PATH: &str = "-";

const SAMPLE_COLLECTION_NAME: &str = "workload-collection-config";
const SAMPLE_COMPONENT_NAME: &str = "component-workload-config";
const SAMPLE_STANDALONE_NAME: &str = "standalone-workload-config";
const SAMPLE_COMPONENT_FILE: &str = "/path/to/my/component-workload-config.yaml";
const SAMPLE_RESOURCE_FILE: &str = "/path/to/my/child-resources.yaml";

/// On-disk form of a workload config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Left empty when missing so validation reports it with the other fields
    #[serde(default)]
    pub name: String,
    pub kind: WorkloadKind,

    #[serde(default)]
    pub spec: ConfigSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigSpec {
    #[serde(default)]
    pub api: WorkloadApiSpec,

    #[serde(default, skip_serializing_if = "CliCommand::is_empty")]
    pub companion_cli_rootcmd: CliCommand,

    #[serde(default, skip_serializing_if = "CliCommand::is_empty")]
    pub companion_cli_subcmd: CliCommand,

    #[serde(default)]
    pub resources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub component_files: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

/// Only the user-facing parts of a command are written back
fn command_entry(command: Option<&CliCommand>) -> CliCommand {
    command
        .map(|c| CliCommand::new(c.name.clone(), c.description.clone()))
        .unwrap_or_default()
}

impl ConfigDocument {
    /// Sample document for `kind`, as written by `init-config`
    pub fn sample(kind: WorkloadKind) -> Result<Self> {
        let api = WorkloadApiSpec::sample();
        let lower = api.kind.to_lowercase();
        let root = CliCommand::new(format!("{lower}ctl"), format!("Manage {lower} workload"));
        let sub = CliCommand::new(lower.clone(), format!("Manage {lower} workload"));

        let (name, spec) = match kind {
            WorkloadKind::Standalone => (
                SAMPLE_STANDALONE_NAME,
                ConfigSpec {
                    api,
                    companion_cli_rootcmd: root,
                    resources: vec![SAMPLE_RESOURCE_FILE.to_string()],
                    ..Default::default()
                },
            ),
            WorkloadKind::Collection => (
                SAMPLE_COLLECTION_NAME,
                ConfigSpec {
                    api,
                    companion_cli_rootcmd: root,
                    companion_cli_subcmd: sub,
                    resources: vec![SAMPLE_RESOURCE_FILE.to_string()],
                    component_files: vec![SAMPLE_COMPONENT_FILE.to_string()],
                    ..Default::default()
                },
            ),
            WorkloadKind::Component => (
                SAMPLE_COMPONENT_NAME,
                ConfigSpec {
                    api,
                    companion_cli_subcmd: sub,
                    resources: vec![SAMPLE_RESOURCE_FILE.to_string()],
                    dependencies: vec![format!("{SAMPLE_COMPONENT_NAME}-2")],
                    ..Default::default()
                },
            ),
            WorkloadKind::Unknown => {
                return Err(CoreError::InvalidKind {
                    tag: kind.to_string(),
                }
                .into());
            }
        };

        Ok(Self {
            name: name.to_string(),
            kind,
            spec,
        })
    }

    /// Build the typed workload, rejecting sections its kind does not have
    pub fn into_workload(self, path: &Path) -> Result<Workload> {
        let invalid = |message: String| WorkloadError::InvalidConfig {
            path: path.to_path_buf(),
            message,
        };
        let kind = self.kind;
        let spec = self.spec;

        let reject = |present: bool, section: &str| -> Result<()> {
            if present {
                Err(invalid(format!("spec.{section} is not valid for a {kind}")))
            } else {
                Ok(())
            }
        };

        let workload = match kind {
            WorkloadKind::Standalone => {
                reject(!spec.companion_cli_subcmd.is_empty(), "companionCliSubcmd")?;
                reject(!spec.component_files.is_empty(), "componentFiles")?;
                reject(!spec.dependencies.is_empty(), "dependencies")?;

                let mut workload = StandaloneWorkload::new(self.name, spec.api, spec.resources);
                workload.root_command = spec.companion_cli_rootcmd;
                Workload::Standalone(workload)
            }
            WorkloadKind::Collection => {
                reject(!spec.dependencies.is_empty(), "dependencies")?;

                let mut workload =
                    WorkloadCollection::new(self.name, spec.api, spec.component_files);
                workload.spec.resources = spec.resources;
                workload.root_command = spec.companion_cli_rootcmd;
                workload.sub_command = spec.companion_cli_subcmd;
                Workload::Collection(workload)
            }
            WorkloadKind::Component => {
                reject(!spec.companion_cli_rootcmd.is_empty(), "companionCliRootcmd")?;
                reject(!spec.component_files.is_empty(), "componentFiles")?;

                let mut workload =
                    ComponentWorkload::new(self.name, spec.api, spec.resources, spec.dependencies);
                workload.sub_command = spec.companion_cli_subcmd;
                workload.config_path = path.to_path_buf();
                Workload::Component(workload)
            }
            WorkloadKind::Unknown => {
                return Err(CoreError::InvalidKind {
                    tag: kind.to_string(),
                }
                .into());
            }
        };

        Ok(workload)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl From<&Workload> for ConfigDocument {
    fn from(workload: &Workload) -> Self {
        let (resources, component_files, dependencies) = match workload {
            Workload::Standalone(w) => (w.spec.resources.clone(), Vec::new(), Vec::new()),
            Workload::Collection(w) => (
                w.spec.resources.clone(),
                w.component_files.clone(),
                Vec::new(),
            ),
            Workload::Component(w) => (w.spec.resources.clone(), Vec::new(), w.dependencies.clone()),
        };

        Self {
            name: workload.name().to_string(),
            kind: workload.workload_kind(),
            spec: ConfigSpec {
                api: workload.api().clone(),
                companion_cli_rootcmd: command_entry(workload.root_command()),
                companion_cli_subcmd: command_entry(workload.sub_command()),
                resources,
                component_files,
                dependencies,
            },
        }
    }
}

/// A decoded workload and the file it came from
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadConfig {
    pub path: PathBuf,
    pub workload: Workload,
}

impl WorkloadConfig {
    /// Decode a single config document; component files are not followed
    pub fn from_yaml(path: impl Into<PathBuf>, content: &str) -> Result<Self> {
        let path = path.into();
        let parse_error = |source| WorkloadError::ConfigParse {
            path: path.clone(),
            source,
        };

        let value: serde_yaml::Value = serde_yaml::from_str(content).map_err(parse_error)?;
        let tag = value
            .get("kind")
            .and_then(|k| k.as_str())
            .ok_or_else(|| WorkloadError::InvalidConfig {
                path: path.clone(),
                message: "missing string field 'kind'".to_string(),
            })?;
        let kind = WorkloadKind::parse(tag)?;

        let document: ConfigDocument = serde_yaml::from_value(value).map_err(parse_error)?;
        debug!(path = %path.display(), %kind, name = %document.name, "decoded workload config");

        let workload = document.into_workload(&path)?;
        Ok(Self { path, workload })
    }

    /// Read a config file; a collection also reads its component files
    ///
    /// Component file references resolve against the collection config's
    /// directory and may be globs or directories.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_config(path)?;
        let mut config = Self::from_yaml(path, &content)?;

        if let Workload::Collection(collection) = &mut config.workload {
            let components = load_components(path, &collection.component_files)
                .map_err(|e| e.in_workload(collection.shared.kind, &collection.shared.name))?;
            collection.set_components(components)?;
        }

        Ok(config)
    }

    pub fn into_workload(self) -> Workload {
        self.workload
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| WorkloadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_components(collection_path: &Path, files: &[String]) -> Result<Vec<ComponentWorkload>> {
    let base = config_dir(collection_path);
    let mut components = Vec::new();

    for entry in expand_manifests(&base, files)? {
        let content = read_config(&entry.path)?;
        match WorkloadConfig::from_yaml(&entry.path, &content)?.workload {
            Workload::Component(component) => components.push(component),
            other => {
                return Err(WorkloadError::InvalidConfig {
                    path: entry.path,
                    message: format!(
                        "component file must be a {}, found {}",
                        WorkloadKind::Component,
                        other.workload_kind()
                    ),
                });
            }
        }
    }

    debug!(
        collection = %collection_path.display(),
        components = components.len(),
        "loaded component configs"
    );
    Ok(components)
}

/// Validate the sample for `kind` and encode it
pub fn render_config(kind: WorkloadKind) -> Result<String> {
    let document = ConfigDocument::sample(kind)?;
    document.clone().into_workload(Path::new(STDOUT_PATH))?.validate()?;
    document.to_yaml()
}

/// Write a rendered config, refusing to replace an existing file unless forced
pub fn write_config_file(path: &Path, content: &str, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(WorkloadError::ConfigExists {
            path: path.to_path_buf(),
        });
    }

    std::fs::write(path, content).map_err(|source| WorkloadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), force, "wrote workload config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const STANDALONE: &str = r#"name: webstore
kind: StandaloneWorkload
spec:
  api:
    domain: acme.com
    group: apps
    version: v1alpha1
    kind: WebStore
    clusterScoped: false
  companionCliRootcmd:
    name: webstorectl
    description: Manage webstore application
  resources:
    - app.yaml
"#;

    #[test]
    fn test_from_yaml_standalone() {
        let config = WorkloadConfig::from_yaml("workload.yaml", STANDALONE).unwrap();
        let Workload::Standalone(workload) = &config.workload else {
            panic!("expected a standalone workload");
        };

        assert_eq!(workload.shared.name, "webstore");
        assert_eq!(workload.api.kind, "WebStore");
        assert_eq!(workload.root_command.name, "webstorectl");
        assert_eq!(workload.spec.resources, vec!["app.yaml"]);
        assert!(config.workload.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_invalid_kind() {
        let err = WorkloadConfig::from_yaml("w.yaml", "name: x\nkind: Workload\n").unwrap_err();
        assert!(matches!(
            err,
            WorkloadError::Core(CoreError::InvalidKind { ref tag }) if tag == "Workload"
        ));

        let err = WorkloadConfig::from_yaml("w.yaml", "name: x\n").unwrap_err();
        assert!(matches!(err, WorkloadError::InvalidConfig { .. }));
    }

    #[test]
    fn test_missing_name_is_reported_with_other_fields() {
        let content = "kind: StandaloneWorkload\nspec:\n  api:\n    group: apps\n";
        let workload = WorkloadConfig::from_yaml("w.yaml", content)
            .unwrap()
            .into_workload();
        assert_eq!(workload.name(), "");

        let err = workload.validate().unwrap_err();
        match err.root() {
            WorkloadError::MissingRequiredFields { fields } => assert_eq!(
                fields,
                &vec!["name", "spec.api.version", "spec.api.kind"]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_yaml_rejects_foreign_sections() {
        let content = "name: x\nkind: StandaloneWorkload\nspec:\n  dependencies: [y]\n";
        let err = WorkloadConfig::from_yaml("w.yaml", content).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid workload config w.yaml: spec.dependencies is not valid for a StandaloneWorkload"
        );

        let content = "name: x\nkind: ComponentWorkload\nspec:\n  componentFiles: [y.yaml]\n";
        assert!(WorkloadConfig::from_yaml("w.yaml", content).is_err());

        let content = "name: x\nkind: ComponentWorkload\nspec:\n  unknownField: 1\n";
        assert!(matches!(
            WorkloadConfig::from_yaml("w.yaml", content).unwrap_err(),
            WorkloadError::ConfigParse { .. }
        ));
    }

    #[test]
    fn test_load_collection_with_components() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("components")).unwrap();
        fs::write(
            dir.path().join("collection.yaml"),
            r#"name: platform
kind: WorkloadCollection
spec:
  api:
    domain: acme.com
    group: platform
    version: v1alpha1
    kind: Platform
  componentFiles:
    - components/*.yaml
"#,
        )
        .unwrap();
        for (name, deps) in [("db", "[]"), ("web", "[db]")] {
            fs::write(
                dir.path().join(format!("components/{name}.yaml")),
                format!(
                    "name: {name}\nkind: ComponentWorkload\nspec:\n  api:\n    group: apps\n    version: v1\n    kind: {name}\n  dependencies: {deps}\n"
                ),
            )
            .unwrap();
        }

        let config = WorkloadConfig::load(dir.path().join("collection.yaml")).unwrap();
        let collection = config.workload.as_collection().unwrap();
        let names: Vec<&str> = collection
            .components()
            .iter()
            .map(|c| c.shared.name.as_str())
            .collect();
        assert_eq!(names, vec!["db", "web"]);

        let web = collection.component("web").unwrap();
        assert_eq!(web.api.domain, "acme.com");
        assert_eq!(web.collection(), Some("platform"));
        assert!(web.config_path.ends_with("components/web.yaml"));
        assert_eq!(web.dependencies, vec!["db"]);
    }

    #[test]
    fn test_load_rejects_nested_collection() {
        let dir = TempDir::new().unwrap();
        let collection = "name: c\nkind: WorkloadCollection\nspec:\n  componentFiles: [inner.yaml]\n";
        fs::write(dir.path().join("outer.yaml"), collection).unwrap();
        fs::write(dir.path().join("inner.yaml"), collection).unwrap();

        let err = WorkloadConfig::load(dir.path().join("outer.yaml")).unwrap_err();
        assert!(matches!(err.root(), WorkloadError::InvalidConfig { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = WorkloadConfig::load("/nonexistent/workload.yaml").unwrap_err();
        assert!(matches!(err, WorkloadError::Io { .. }));
    }

    #[test]
    fn test_render_standalone_config() {
        insta::assert_snapshot!(render_config(WorkloadKind::Standalone).unwrap(), @r###"
        name: standalone-workload-config
        kind: StandaloneWorkload
        spec:
          api:
            domain: acme.com
            group: apps
            version: v1alpha1
            kind: MyApp
            clusterScoped: false
          companionCliRootcmd:
            name: myappctl
            description: Manage myapp workload
          resources:
          - /path/to/my/child-resources.yaml
        "###);
    }

    #[test]
    fn test_samples_decode_back() {
        for kind in [
            WorkloadKind::Standalone,
            WorkloadKind::Collection,
            WorkloadKind::Component,
        ] {
            let rendered = render_config(kind).unwrap();
            let config = WorkloadConfig::from_yaml("-", &rendered).unwrap();
            assert_eq!(config.workload.workload_kind(), kind);
            assert_eq!(ConfigDocument::from(&config.workload), ConfigDocument::sample(kind).unwrap());
        }

        assert!(render_config(WorkloadKind::Unknown).is_err());
    }

    #[test]
    fn test_component_sample() {
        let sample = ConfigDocument::sample(WorkloadKind::Component).unwrap();
        assert_eq!(sample.name, "component-workload-config");
        assert_eq!(sample.spec.dependencies, vec!["component-workload-config-2"]);
        assert!(sample.spec.companion_cli_rootcmd.is_empty());
        assert_eq!(sample.spec.companion_cli_subcmd.name, "myapp");
    }

    #[test]
    fn test_write_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("workload.yaml");

        write_config_file(&path, "first", false).unwrap();
        let err = write_config_file(&path, "second", false).unwrap_err();
        assert!(
            err.to_string()
                .starts_with("force was not requested and file exists at location")
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "first");

        write_config_file(&path, "second", true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }
}
