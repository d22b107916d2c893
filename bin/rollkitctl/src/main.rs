//! ---
//! rk_section: "07-operator-interfaces"
//! rk_subsection: "binary"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Operator CLI for configuration lifecycle and cluster migrations."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod configuration;
mod migration;
mod runtime;

#[derive(Debug, Parser)]
#[command(author, version, about = "rollkit operator control utility", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalOptions {
    /// Path to the rollkit configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Actor recorded in the audit trail.
    #[arg(long, global = true, env = "ROLLKIT_ACTOR", default_value = "operator")]
    pub actor: String,

    /// Correlation id recorded in the audit trail.
    #[arg(long = "request-id", global = true, value_name = "ID")]
    pub request_id: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(subcommand, about = "Configuration lifecycle actions")]
    Configuration(configuration::ConfigurationCommand),
    #[command(subcommand, about = "Cluster migration actions")]
    Migration(migration::MigrationCommand),
    #[command(about = "Print the computed resource state")]
    State {
        /// Query every release again before printing.
        #[arg(long)]
        recheck: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = runtime::Runtime::open(&cli.global).await?;
    match cli.command {
        Commands::Configuration(cmd) => configuration::run(&runtime, cmd).await,
        Commands::Migration(cmd) => migration::run(&runtime, cmd).await,
        Commands::State { recheck } => {
            let state = if recheck {
                runtime.orchestrator.recheck(&runtime.ctx).await?
            } else {
                runtime.orchestrator.resource_state().await
            };
            runtime::print_json(&state)
        }
    }
}
