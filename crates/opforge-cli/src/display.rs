//! Display formatting for CLI output
//!
//! Renders the human-readable summary printed by `inspect`.

use console::style;
use opforge_workload::{DependencyGraph, WorkloadSummary};
use std::io::{self, Write};

/// Format count with proper pluralization
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

/// Renderer for a processed workload summary
pub struct SummaryRenderer<W: Write> {
    writer: W,
}

impl Default for SummaryRenderer<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryRenderer<io::Stdout> {
    pub fn new() -> Self {
        Self {
            writer: io::stdout(),
        }
    }
}

impl<W: Write> SummaryRenderer<W> {
    /// Create a renderer that writes to a custom writer (for testing)
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn render(
        &mut self,
        summary: &WorkloadSummary,
        graph: Option<&DependencyGraph>,
    ) -> io::Result<()> {
        // Header
        writeln!(
            self.writer,
            "{} {} ({})",
            style("Workload").cyan().bold(),
            style(&summary.name).bold(),
            summary.kind
        )?;
        writeln!(self.writer, "{}", "═".repeat(66))?;

        self.render_identity(summary, "  ")?;
        self.render_fields(summary)?;
        self.render_rules(summary)?;
        self.render_source_files(summary)?;

        if !summary.components.is_empty() {
            self.render_components(summary, graph)?;
        }

        Ok(())
    }

    fn render_identity(&mut self, summary: &WorkloadSummary, indent: &str) -> io::Result<()> {
        let resource = &summary.resource;
        let scope = if resource.is_cluster_scoped() {
            "cluster"
        } else {
            "namespaced"
        };
        let group = if resource.domain.is_empty() {
            resource.group.clone()
        } else {
            format!("{}.{}", resource.group, resource.domain)
        };

        writeln!(
            self.writer,
            "{indent}{}: {}/{}, Kind={} ({})",
            style("API").dim(),
            group,
            resource.version,
            resource.kind,
            scope
        )?;
        writeln!(self.writer, "{indent}{}: {}", style("Package").dim(), summary.package_name)?;
        writeln!(self.writer, "{indent}{}: {}", style("Types").dim(), resource.path)?;

        for (label, command) in [
            ("Root command", &summary.root_command),
            ("Subcommand", &summary.sub_command),
        ] {
            if let Some(command) = command {
                writeln!(
                    self.writer,
                    "{indent}{}: {} - {}",
                    style(label).dim(),
                    command.name,
                    command.description
                )?;
            }
        }

        if !summary.dependencies.is_empty() {
            writeln!(
                self.writer,
                "{indent}{}: {}",
                style("Depends on").dim(),
                summary.dependencies.join(", ")
            )?;
        }
        Ok(())
    }

    fn render_fields(&mut self, summary: &WorkloadSummary) -> io::Result<()> {
        let leaves = summary.fields.leaves();
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "{} ({}):",
            style("Fields").bold(),
            pluralize(leaves.len(), "field", "fields")
        )?;

        let width = leaves.iter().map(|f| f.path.len()).max().unwrap_or(0);
        for field in leaves {
            let default = field
                .default
                .as_ref()
                .map(|d| format!(" = {d}"))
                .unwrap_or_default();
            writeln!(
                self.writer,
                "  {:width$}  {:8}{}  {}",
                field.path,
                field.field_type.to_string(),
                default,
                style(&field.origin).dim(),
            )?;
        }
        Ok(())
    }

    fn render_rules(&mut self, summary: &WorkloadSummary) -> io::Result<()> {
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "{} ({}):",
            style("RBAC").bold(),
            pluralize(summary.rbac_rules.len(), "rule", "rules")
        )?;
        for rule in summary.rbac_rules.iter() {
            writeln!(self.writer, "  {}", rule)?;
        }

        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "{} ({}):",
            style("Ownership").bold(),
            pluralize(summary.ownership_rules.len(), "rule", "rules")
        )?;
        for rule in summary.ownership_rules.iter() {
            writeln!(
                self.writer,
                "  {} {} {}",
                rule.owned,
                style("<-").dim(),
                rule.owner
            )?;
        }
        Ok(())
    }

    fn render_source_files(&mut self, summary: &WorkloadSummary) -> io::Result<()> {
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "{} ({}):",
            style("Source files").bold(),
            pluralize(summary.source_files.len(), "file", "files")
        )?;
        for file in &summary.source_files {
            writeln!(
                self.writer,
                "  {} {}",
                style(&file.file_name).cyan(),
                style(file.manifest.display()).dim()
            )?;
            for child in &file.children {
                writeln!(self.writer, "    {} {}", style("→").blue(), child.create_func_name)?;
            }
        }
        Ok(())
    }

    fn render_components(
        &mut self,
        summary: &WorkloadSummary,
        graph: Option<&DependencyGraph>,
    ) -> io::Result<()> {
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "{} ({}):",
            style("Components").bold(),
            pluralize(summary.components.len(), "component", "components")
        )?;

        for component in &summary.components {
            writeln!(self.writer, "  {}", style(&component.name).cyan().bold())?;
            self.render_identity(component, "    ")?;
            writeln!(
                self.writer,
                "    {}: {}, {}",
                style("Generates").dim(),
                pluralize(component.fields.leaves().len(), "field", "fields"),
                pluralize(component.source_files.len(), "source file", "source files")
            )?;
        }

        if let Some(graph) = graph
            && graph.edges().next().is_some()
        {
            writeln!(self.writer)?;
            writeln!(self.writer, "{}:", style("Dependencies").bold())?;
            for line in graph.render_tree().lines() {
                writeln!(self.writer, "  {}", line)?;
            }
        }

        if !summary.generation_order.is_empty() {
            writeln!(self.writer)?;
            writeln!(
                self.writer,
                "{}: {}",
                style("Generation order").bold(),
                summary.generation_order.join(" → ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opforge_workload::{WorkloadConfig, process};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_render_standalone_summary() {
        console::set_colors_enabled(false);

        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("app.yaml"),
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\nspec:\n  replicas: 2 # +operator-builder:field:name=web.replicas\n",
        )
        .unwrap();
        let config = dir.path().join("workload.yaml");
        fs::write(
            &config,
            "name: web-app\nkind: StandaloneWorkload\nspec:\n  api:\n    domain: acme.com\n    group: apps\n    version: v1alpha1\n    kind: WebApp\n  companionCliRootcmd:\n    name: webctl\n  resources:\n    - app.yaml\n",
        )
        .unwrap();

        let workload = WorkloadConfig::load(&config).unwrap().into_workload();
        let resolved = process(workload, &config).unwrap();
        let summary = WorkloadSummary::new(&resolved, "github.com/acme/web").unwrap();

        let mut renderer = SummaryRenderer::with_writer(Vec::new());
        renderer.render(&summary, resolved.graph()).unwrap();
        let output = String::from_utf8(renderer.into_inner()).unwrap();

        assert!(output.starts_with("Workload web-app (StandaloneWorkload)"));
        assert!(output.contains("API: apps.acme.com/v1alpha1, Kind=WebApp (namespaced)"));
        assert!(output.contains("Root command: webctl - Manage webapp workload"));
        assert!(output.contains("Fields (1 field):"));
        assert!(output.contains("web.replicas  integer  = 2"));
        assert!(output.contains("→ CreateDeploymentWeb"));
        assert!(!output.contains("Components"));
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(1, "field", "fields"), "1 field");
        assert_eq!(pluralize(0, "field", "fields"), "0 fields");
        assert_eq!(pluralize(3, "rule", "rules"), "3 rules");
    }
}
