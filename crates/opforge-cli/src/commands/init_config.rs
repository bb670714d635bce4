//! Init-config command - write a sample workload config

use clap::ValueEnum;
use console::style;
use opforge_core::WorkloadKind;
use opforge_workload::{STDOUT_PATH, render_config, write_config_file};
use std::path::Path;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InitKind {
    /// A single API with its own controller
    Standalone,
    /// A parent API owning component workloads
    Collection,
    /// A member of a collection
    Component,
}

impl From<InitKind> for WorkloadKind {
    fn from(kind: InitKind) -> Self {
        match kind {
            InitKind::Standalone => WorkloadKind::Standalone,
            InitKind::Collection => WorkloadKind::Collection,
            InitKind::Component => WorkloadKind::Component,
        }
    }
}

pub fn run(kind: InitKind, path: &Path, force: bool) -> Result<()> {
    let content = render_config(kind.into())?;

    if path.as_os_str() == STDOUT_PATH {
        print!("{}", content);
        return Ok(());
    }

    write_config_file(path, &content, force)?;
    println!(
        "{} Wrote {} workload config to {}",
        style("✓").green().bold(),
        WorkloadKind::from(kind),
        style(path.display()).cyan()
    );
    Ok(())
}
