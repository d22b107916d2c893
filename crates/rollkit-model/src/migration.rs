//! ---
//! rk_section: "02-data-model"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Plain data records shared by collectors, reconciliation, and the orchestrator."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::configuration::ConfigurationId;

/// Identifier assigned to a migration by the persistence collaborator.
pub type MigrationId = u64;

/// Progress of a cluster-wide migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MigrationState {
    /// Created; release snapshots are being collected.
    Preparing,
    /// Nodes are being restarted onto another release.
    NodesUpdating,
    /// The last node restart completed.
    NodesUpdated,
    /// A resource migration batch is executing.
    ResourcesUpdating,
    /// The last resource migration batch completed.
    ResourcesUpdated,
    /// Completed; the destination is active.
    Finished,
    /// Aborted by the operator; the source is active.
    Cancelled,
}

impl MigrationState {
    /// Terminal states accept no further commands.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MigrationState::Finished | MigrationState::Cancelled)
    }
}

/// Direction of travel between two point lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MigrationDirection {
    /// The destination extends the source.
    Upgrade,
    /// The source extends the destination.
    Downgrade,
    /// Nothing to migrate.
    Stay,
    /// Point lists diverge; no safe path exists.
    Undefined,
}

/// One of the two configurations taking part in a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MigrationSide {
    /// The configuration the migration started from.
    Source,
    /// The configuration the migration moves to.
    Destination,
}

impl MigrationSide {
    /// The other side.
    pub fn opposite(self) -> Self {
        match self {
            MigrationSide::Source => MigrationSide::Destination,
            MigrationSide::Destination => MigrationSide::Source,
        }
    }
}

/// Operator-facing plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MigrationStep {
    /// Nothing has been done yet; cancel is still possible.
    Start,
    /// Nodes are being moved between releases.
    NodesUpdating,
    /// Nodes are on the target release.
    NodesUpdated,
    /// Resources are being moved between points.
    ResourcesUpdating,
    /// Resources reached their target points.
    ResourcesUpdated,
    /// Ready to finish.
    Finish,
    /// Directions conflict; only cancel is possible.
    Broken,
}

impl MigrationStep {
    /// The canonical step plan for a migration direction.
    pub fn plan(direction: MigrationDirection) -> Vec<MigrationStep> {
        match direction {
            MigrationDirection::Upgrade => vec![
                MigrationStep::Start,
                MigrationStep::ResourcesUpdating,
                MigrationStep::ResourcesUpdated,
                MigrationStep::NodesUpdating,
                MigrationStep::Finish,
            ],
            MigrationDirection::Downgrade => vec![
                MigrationStep::Start,
                MigrationStep::NodesUpdating,
                MigrationStep::NodesUpdated,
                MigrationStep::ResourcesUpdating,
                MigrationStep::Finish,
            ],
            MigrationDirection::Stay => vec![
                MigrationStep::Start,
                MigrationStep::NodesUpdating,
                MigrationStep::Finish,
            ],
            MigrationDirection::Undefined => vec![MigrationStep::Broken],
        }
    }
}

/// One cluster-wide upgrade or downgrade between two configurations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Migration {
    /// Store-assigned identifier.
    pub id: MigrationId,
    /// Only one migration may be active cluster-wide.
    pub is_active: bool,
    /// Current progress.
    pub state: MigrationState,
    /// Aggregated direction, known once both releases have been inspected.
    #[serde(default)]
    pub direction: Option<MigrationDirection>,
    /// Creation timestamp.
    pub started: DateTime<Utc>,
    /// Set once the migration reaches a terminal state.
    #[serde(default)]
    pub finished: Option<DateTime<Utc>>,
    /// The configuration that was active when the migration was created.
    pub from_configuration_id: ConfigurationId,
    /// The requested configuration.
    pub to_configuration_id: ConfigurationId,
}

impl Migration {
    /// Construct a migration in the `Preparing` state.
    pub fn preparing(
        id: MigrationId,
        from_configuration_id: ConfigurationId,
        to_configuration_id: ConfigurationId,
    ) -> Self {
        Self {
            id,
            is_active: true,
            state: MigrationState::Preparing,
            direction: None,
            started: Utc::now(),
            finished: None,
            from_configuration_id,
            to_configuration_id,
        }
    }

    /// Configuration id for the requested side.
    pub fn configuration_id(&self, side: MigrationSide) -> ConfigurationId {
        match side {
            MigrationSide::Source => self.from_configuration_id,
            MigrationSide::Destination => self.to_configuration_id,
        }
    }

    /// Move into a terminal state.
    pub fn close(&mut self, state: MigrationState) {
        self.state = state;
        self.is_active = false;
        self.finished = Some(Utc::now());
    }
}
