//! opforge CLI - inspect operator workload configs and scaffold new ones

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod display;
mod error;
mod exit_codes;

use commands::init_config::InitKind;
use commands::inspect::OutputFormat;

#[derive(Parser)]
#[command(name = "opforge")]
#[command(author = "opforge Contributors")]
#[command(version)]
#[command(about = "Turn annotated Kubernetes manifests into typed operator workloads", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a workload config and describe the resolved workload
    Inspect {
        /// Workload config file
        config: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Summary)]
        output: OutputFormat,

        /// Module path the generated API types live under
        #[arg(long, default_value = "github.com/acme/acme-operator")]
        repo: String,
    },

    /// Initialize a workload configuration
    InitConfig {
        /// Workload type to initialize
        #[arg(value_enum)]
        kind: InitKind,

        /// File path to initialize workload at (`-` for stdout)
        #[arg(short, long, default_value = "-")]
        path: PathBuf,

        /// Override the config if it already exists
        #[arg(short, long)]
        force: bool,
    },
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_target(debug)
        .init();
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = match cli.command {
        Commands::Inspect {
            config,
            output,
            repo,
        } => commands::inspect::run(&config, output, &repo),

        Commands::InitConfig { kind, path, force } => {
            commands::init_config::run(kind, &path, force)
        }
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
