//! ---
//! rk_section: "04-migration-execution"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Migrator contract, collectors, and the release sandbox boundary."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Serialized request/response records crossing the sandbox boundary.
use rollkit_model::{MigrationLogRecord, MigratorReleaseState};
use serde::{Deserialize, Serialize};

use crate::collector::{execute, CollectorOutcome};
use crate::executor::{MigrationExecutor, MigratorCommand};
use crate::registry::MigratorRegistry;
use crate::release_state::ReleaseStateCollector;

/// Version of the request/response layout.
pub const PROTOCOL_VERSION: u16 = 1;

/// Work a sandbox should perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum SandboxTask {
    /// Run the release state collector.
    ReleaseState,
    /// Run the migration executor.
    Migrate {
        /// Commands in execution order.
        commands: Vec<MigratorCommand>,
    },
}

/// One collector call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxRequest {
    /// Layout version.
    pub protocol: u16,
    /// Migrator template configuration text.
    pub configuration: String,
    /// Requested work.
    pub task: SandboxTask,
}

impl SandboxRequest {
    /// Release state request.
    pub fn release_state(configuration: impl Into<String>) -> Self {
        Self {
            protocol: PROTOCOL_VERSION,
            configuration: configuration.into(),
            task: SandboxTask::ReleaseState,
        }
    }

    /// Migration request.
    pub fn migrate(configuration: impl Into<String>, commands: Vec<MigratorCommand>) -> Self {
        Self {
            protocol: PROTOCOL_VERSION,
            configuration: configuration.into(),
            task: SandboxTask::Migrate { commands },
        }
    }
}

/// Collector result payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SandboxResult {
    /// Output of the release state collector.
    ReleaseState(Vec<MigratorReleaseState>),
    /// Output of the migration executor.
    Migrate(Vec<MigrationLogRecord>),
}

/// One collector response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxResponse {
    /// Layout version.
    pub protocol: u16,
    /// Present when the collector completed.
    #[serde(default)]
    pub result: Option<SandboxResult>,
    /// Every failure the collector met.
    #[serde(default)]
    pub errors: Vec<MigrationLogRecord>,
    /// Migrator log lines.
    #[serde(default)]
    pub logs: Vec<String>,
}

impl SandboxResponse {
    /// A response carrying a single error and no result.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            protocol: PROTOCOL_VERSION,
            result: None,
            errors: vec![MigrationLogRecord::error(message)],
            logs: Vec::new(),
        }
    }

    fn from_outcome<T>(outcome: CollectorOutcome<T>, wrap: impl FnOnce(T) -> SandboxResult) -> Self {
        Self {
            protocol: PROTOCOL_VERSION,
            result: outcome.result.map(wrap),
            errors: outcome.errors,
            logs: outcome.logs,
        }
    }

    /// Split into release states and errors. A mismatched payload is reported as an error.
    pub fn into_release_state(self) -> (Option<Vec<MigratorReleaseState>>, Vec<MigrationLogRecord>) {
        let mut errors = self.errors;
        match self.result {
            Some(SandboxResult::ReleaseState(states)) => (Some(states), errors),
            Some(SandboxResult::Migrate(_)) => {
                errors.push(MigrationLogRecord::error(
                    "Sandbox returned a migration result for a release state request",
                ));
                (None, errors)
            }
            None => (None, errors),
        }
    }

    /// Split into operation records and errors. A mismatched payload is reported as an error.
    pub fn into_operations(self) -> (Vec<MigrationLogRecord>, Vec<MigrationLogRecord>) {
        let mut errors = self.errors;
        match self.result {
            Some(SandboxResult::Migrate(records)) => (records, errors),
            Some(SandboxResult::ReleaseState(_)) => {
                errors.push(MigrationLogRecord::error(
                    "Sandbox returned a release state for a migration request",
                ));
                (Vec::new(), errors)
            }
            None => (Vec::new(), errors),
        }
    }
}

/// Execute a request against `registry`. This is the body of every sandbox.
pub fn serve(registry: &MigratorRegistry, request: &SandboxRequest) -> SandboxResponse {
    if request.protocol != PROTOCOL_VERSION {
        return SandboxResponse::failed(format!(
            "Unsupported sandbox protocol version {}",
            request.protocol
        ));
    }
    match &request.task {
        SandboxTask::ReleaseState => SandboxResponse::from_outcome(
            execute(ReleaseStateCollector, registry, &request.configuration),
            SandboxResult::ReleaseState,
        ),
        SandboxTask::Migrate { commands } => SandboxResponse::from_outcome(
            execute(
                MigrationExecutor::new(commands.clone()),
                registry,
                &request.configuration,
            ),
            SandboxResult::Migrate,
        ),
    }
}

/// JSON-in, JSON-out variant of [`serve`]. Malformed requests yield an error response.
pub fn serve_json(registry: &MigratorRegistry, request: &str) -> serde_json::Result<String> {
    let response = match serde_json::from_str::<SandboxRequest>(request) {
        Ok(request) => serve(registry, &request),
        Err(err) => SandboxResponse::failed(format!("Malformed sandbox request: {err}")),
    };
    serde_json::to_string(&response)
}
