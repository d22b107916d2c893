//! ---
//! rk_section: "07-operator-interfaces"
//! rk_subsection: "binary"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Operator CLI for configuration lifecycle and cluster migrations."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Subcommand};
use rollkit_model::{ConfigurationId, ConfigurationSettings};
use serde_json::json;

use crate::runtime::{print_json, Runtime};

#[derive(Debug, Subcommand)]
pub enum ConfigurationCommand {
    /// List every configuration.
    List,
    /// Create a draft from a settings file (YAML or JSON).
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, value_name = "FILE")]
        settings: PathBuf,
    },
    /// Replace the settings of a draft.
    Edit {
        id: ConfigurationId,
        #[arg(long, value_name = "FILE")]
        settings: PathBuf,
    },
    /// Validate a draft without changing it.
    Check { id: ConfigurationId },
    /// Freeze a valid draft as the next release.
    Ready { id: ConfigurationId },
    /// Withdraw a ready configuration.
    Obsolete { id: ConfigurationId },
    /// Mark the active configuration as known-good.
    Stable {
        id: ConfigurationId,
        #[arg(long, action = ArgAction::Set, default_value_t = true)]
        value: bool,
    },
    /// Activate the first release of an empty cluster.
    Bootstrap { id: ConfigurationId },
}

pub async fn run(runtime: &Runtime, command: ConfigurationCommand) -> Result<()> {
    let orchestrator = &runtime.orchestrator;
    let ctx = &runtime.ctx;
    match command {
        ConfigurationCommand::List => print_json(&orchestrator.configurations().await),
        ConfigurationCommand::Create { name, settings } => {
            let id = orchestrator
                .create_configuration(ctx, &name, read_settings(&settings)?)
                .await?;
            print_json(&json!({ "id": id }))
        }
        ConfigurationCommand::Edit { id, settings } => {
            orchestrator
                .update_draft(ctx, id, read_settings(&settings)?)
                .await?;
            print_json(&json!({ "id": id }))
        }
        ConfigurationCommand::Check { id } => {
            let errors = orchestrator.configuration_check(ctx, id).await?;
            print_json(&errors)?;
            if errors.is_empty() {
                Ok(())
            } else {
                anyhow::bail!("configuration {id} has {} error(s)", errors.len())
            }
        }
        ConfigurationCommand::Ready { id } => {
            orchestrator.set_ready(ctx, id).await?;
            print_json(&orchestrator.configuration(id).await?)
        }
        ConfigurationCommand::Obsolete { id } => {
            orchestrator.set_obsolete(ctx, id).await?;
            print_json(&orchestrator.configuration(id).await?)
        }
        ConfigurationCommand::Stable { id, value } => {
            orchestrator.set_stable(ctx, id, value).await?;
            print_json(&orchestrator.configuration(id).await?)
        }
        ConfigurationCommand::Bootstrap { id } => {
            orchestrator.bootstrap(ctx, id).await?;
            print_json(&orchestrator.resource_state().await)
        }
    }
}

fn read_settings(path: &Path) -> Result<ConfigurationSettings> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("unable to read settings file {}", path.display()))?;
    serde_yaml::from_str(&text)
        .with_context(|| format!("failed to parse settings file {}", path.display()))
}
