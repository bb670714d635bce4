//! Inspect command - process a workload config and describe the result

use clap::ValueEnum;
use opforge_workload::{WorkloadConfig, WorkloadSummary, process};
use std::path::Path;
use tracing::debug;

use crate::display::SummaryRenderer;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable overview
    Summary,
    Yaml,
    Json,
}

pub fn run(config: &Path, output: OutputFormat, repo: &str) -> Result<()> {
    let workload = WorkloadConfig::load(config)?.into_workload();
    let resolved = process(workload, config)?;
    let summary = WorkloadSummary::new(&resolved, repo)?;
    debug!(workload = %summary.name, ?output, "workload processed");

    match output {
        OutputFormat::Summary => {
            SummaryRenderer::new().render(&summary, resolved.graph())?;
        }
        OutputFormat::Yaml => print!("{}", summary.to_yaml()?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    Ok(())
}
