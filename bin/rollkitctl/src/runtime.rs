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
use std::sync::Arc;

use anyhow::{Context, Result};
use rollkit_common::{init_tracing, AppConfig, SandboxMode};
use rollkit_migrator::{InProcessSandbox, ProcessSandbox, ReleaseSandbox};
use rollkit_orchestrator::{MigrationOrchestrator, RecordingNodeUpdater, RequestContext};
use rollkit_persistence::{AuditLog, JsonFileStore};
use serde::Serialize;
use tracing::info;

use crate::GlobalOptions;

/// Orchestrator wired from the loaded configuration, plus the caller context.
pub struct Runtime {
    pub orchestrator: MigrationOrchestrator,
    pub ctx: RequestContext,
}

impl Runtime {
    pub async fn open(options: &GlobalOptions) -> Result<Self> {
        let mut candidates = Vec::new();
        if let Some(path) = &options.config {
            candidates.push(path.clone());
        }
        candidates.push(PathBuf::from("configs/rollkit.toml"));
        let loaded = AppConfig::load_with_source(&candidates)?;
        let config = loaded.config;
        init_tracing("rollkitctl", &config.logging)?;
        info!(config = %loaded.source.display(), mode = ?config.sandbox.mode, "configuration loaded");

        let sandbox: Arc<dyn ReleaseSandbox> = match config.sandbox.mode {
            SandboxMode::Process => Arc::new(ProcessSandbox::new(
                config.sandbox.worker_command.clone(),
                config.sandbox.worker_args.clone(),
                config.sandbox.collector_timeout,
            )),
            SandboxMode::InProcess => {
                Arc::new(InProcessSandbox::builtin(config.sandbox.collector_timeout))
            }
        };
        let audit = AuditLog::open(&config.store.audit_log).with_context(|| {
            format!("unable to open audit log {}", config.store.audit_log.display())
        })?;
        let orchestrator = MigrationOrchestrator::open(
            Arc::new(JsonFileStore::new(&config.store.path)),
            sandbox,
            Arc::new(RecordingNodeUpdater::new(config.cluster.nodes.clone())),
        )
        .await?
        .with_audit_log(audit);

        let mut ctx = RequestContext::new(options.actor.clone());
        if let Some(request_id) = &options.request_id {
            ctx = ctx.with_request_id(request_id.clone());
        }
        Ok(Self { orchestrator, ctx })
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
