//! ---
//! rk_section: "07-operator-interfaces"
//! rk_subsection: "binary"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Operator CLI for configuration lifecycle and cluster migrations."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use anyhow::{anyhow, Result};
use clap::{Subcommand, ValueEnum};
use rollkit_model::{ConfigurationId, MigrationId, MigrationSide};
use rollkit_orchestrator::ResourceUpgrade;
use serde_json::json;

use crate::runtime::{print_json, Runtime};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SideArg {
    Source,
    Destination,
}

impl From<SideArg> for MigrationSide {
    fn from(value: SideArg) -> Self {
        match value {
            SideArg::Source => MigrationSide::Source,
            SideArg::Destination => MigrationSide::Destination,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum MigrationCommand {
    /// Start a migration from the active configuration to `id`.
    Start { id: ConfigurationId },
    /// Roll the nodes onto one side of the migration.
    Nodes {
        #[arg(long, value_enum)]
        target: SideArg,
    },
    /// Migrate resources, each given as TEMPLATE/MIGRATOR/RESOURCE.
    Resources {
        #[arg(long, value_enum, default_value_t = SideArg::Destination)]
        target: SideArg,
        #[arg(required = true, num_args = 1..)]
        resources: Vec<String>,
    },
    /// Complete the active migration.
    Finish,
    /// Abandon the active migration.
    Cancel,
    /// Print migration history.
    List,
    /// Print the log of a migration, or of idle resource updates.
    Log {
        #[arg(long)]
        migration: Option<MigrationId>,
    },
}

pub async fn run(runtime: &Runtime, command: MigrationCommand) -> Result<()> {
    let orchestrator = &runtime.orchestrator;
    let ctx = &runtime.ctx;
    match command {
        MigrationCommand::Start { id } => {
            let migration = orchestrator.update_cluster(ctx, id).await?;
            print_json(&json!({ "migration": migration }))
        }
        MigrationCommand::Nodes { target } => {
            orchestrator.nodes_update(ctx, target.into()).await?;
            print_json(&orchestrator.resource_state().await)
        }
        MigrationCommand::Resources { target, resources } => {
            let requests = resources
                .iter()
                .map(|address| parse_request(address, target.into()))
                .collect::<Result<Vec<_>>>()?;
            let records = orchestrator.resource_update(ctx, &requests).await?;
            print_json(&records)
        }
        MigrationCommand::Finish => {
            orchestrator.finish(ctx).await?;
            print_json(&orchestrator.migrations().await.last())
        }
        MigrationCommand::Cancel => {
            orchestrator.cancel(ctx).await?;
            print_json(&orchestrator.migrations().await.last())
        }
        MigrationCommand::List => print_json(&orchestrator.migrations().await),
        MigrationCommand::Log { migration } => {
            print_json(&orchestrator.migration_log(migration).await)
        }
    }
}

fn parse_request(address: &str, target: MigrationSide) -> Result<ResourceUpgrade> {
    let mut parts = address.splitn(3, '/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(template), Some(migrator), Some(resource))
            if !template.is_empty() && !migrator.is_empty() && !resource.is_empty() =>
        {
            Ok(ResourceUpgrade::new(template, migrator, resource, target))
        }
        _ => Err(anyhow!(
            "resource {address:?} must look like TEMPLATE/MIGRATOR/RESOURCE"
        )),
    }
}
