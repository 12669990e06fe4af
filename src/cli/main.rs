//! CLI binary entry point for data-engine-fvt

#[cfg(feature = "cli")]
use anyhow::Context;
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use data_engine_fvt::cli::commands::config::{handle_sample_config, handle_show_config};
#[cfg(feature = "cli")]
use data_engine_fvt::cli::commands::run::{RunArgs, handle_run};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "data-engine-fvt")]
#[command(about = "Functional verification suite for the data engine service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Run every scenario against every configured connection
    Run {
        /// Configuration file (defaults to .data-engine-fvt.toml in the workspace)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory searched for the configuration file
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
        /// Server platform URL
        #[arg(long)]
        endpoint: Option<String>,
        /// Server variant (repeatable): serverinmem, servergraph
        #[arg(short, long = "server")]
        servers: Vec<String>,
        /// User the scenarios run as
        #[arg(short, long)]
        user: Option<String>,
        /// Report format: json, yaml
        #[arg(short, long, default_value = "json")]
        format: String,
        /// Write the report to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a sample configuration, or write it into a directory
    SampleConfig {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Show the effective configuration
    ShowConfig {
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
    },
}

#[cfg(feature = "cli")]
fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run {
            config,
            workspace,
            endpoint,
            servers,
            user,
            format,
            output,
        } => {
            let args = RunArgs {
                config,
                workspace,
                endpoint,
                servers,
                user,
                format,
                output,
            };
            handle_run(&args).context("Suite run failed")?;
        }
        Commands::SampleConfig { dir } => {
            handle_sample_config(dir.as_deref()).context("Failed to write sample config")?
        }
        Commands::ShowConfig { workspace } => {
            handle_show_config(&workspace).context("Failed to load config")?
        }
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature is not enabled. Build with --features cli");
    std::process::exit(1);
}
