//! ---
//! rk_section: "06-orchestration"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Cluster migration state machine and its command surface."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Cluster migration orchestrator.
//!
//! The [`MigrationOrchestrator`] is the only writer of configuration and
//! migration records. Every command either completes and persists, or is
//! declined with a list of `{field, message}` errors and changes nothing.
#![warn(missing_docs)]

use rollkit_model::{ConfigurationId, ErrorDescription};
use rollkit_persistence::PersistenceError;
use thiserror::Error;

pub mod context;
pub mod nodes;
pub mod orchestrator;
pub mod plan;
pub mod snapshot;
pub mod state;
pub mod validation;

pub use context::RequestContext;
pub use nodes::{NodeUpdater, RecordingNodeUpdater};
pub use orchestrator::MigrationOrchestrator;
pub use plan::{MigrationPlan, ResourceUpgrade, SidePlan, TemplatePlan};
pub use snapshot::collect_release_state;
pub use state::ClusterResourceState;
pub use validation::check_configuration;

/// Result alias used throughout the orchestrator crate.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Error type for orchestrator commands.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The command is not legal in the current state. Nothing was changed.
    #[error("request declined: {}", describe(.errors))]
    Declined {
        /// Every reason the command was declined.
        errors: Vec<ErrorDescription>,
    },
    /// The referenced configuration does not exist.
    #[error("configuration {0} was not found")]
    NotFound(ConfigurationId),
    /// The node updater failed; the migration stays in its current state.
    #[error("nodes could not be updated: {0}")]
    NodeUpdate(String),
    /// Wrapper for store and audit log failures.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl OrchestratorError {
    /// Decline with a single message not tied to a field.
    pub fn declined(message: impl Into<String>) -> Self {
        Self::Declined {
            errors: vec![ErrorDescription::general(message)],
        }
    }

    /// Decline with a single message attached to `field`.
    pub fn declined_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Declined {
            errors: vec![ErrorDescription::new(field, message)],
        }
    }

    /// Errors carried by a declined command; empty for other variants.
    pub fn errors(&self) -> &[ErrorDescription] {
        match self {
            Self::Declined { errors } => errors,
            _ => &[],
        }
    }
}

fn describe(errors: &[ErrorDescription]) -> String {
    errors
        .iter()
        .map(|error| match &error.field {
            Some(field) => format!("{field}: {}", error.message),
            None => error.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}
