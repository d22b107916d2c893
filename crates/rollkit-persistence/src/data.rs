//! ---
//! rk_section: "03-persistence-logging"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Cluster store and hash-chained audit log."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use rollkit_model::{
    Configuration, ConfigurationId, ConfigurationState, Migration, MigrationId,
    MigrationLogRecord,
};
use serde::{Deserialize, Serialize};

use crate::{PersistenceError, Result};

/// Every persisted record of a cluster: configurations, migrations, and the
/// append-only migration log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterData {
    /// Configurations in creation order.
    #[serde(default)]
    pub configurations: Vec<Configuration>,
    /// Migrations in creation order.
    #[serde(default)]
    pub migrations: Vec<Migration>,
    /// Migration log, oldest first.
    #[serde(default)]
    pub migration_log: Vec<MigrationLogRecord>,
}

impl ClusterData {
    /// Look up a configuration.
    pub fn configuration(&self, id: ConfigurationId) -> Result<&Configuration> {
        self.configurations
            .iter()
            .find(|configuration| configuration.id == id)
            .ok_or(PersistenceError::ConfigurationNotFound(id))
    }

    /// Look up a configuration for modification.
    pub fn configuration_mut(&mut self, id: ConfigurationId) -> Result<&mut Configuration> {
        self.configurations
            .iter_mut()
            .find(|configuration| configuration.id == id)
            .ok_or(PersistenceError::ConfigurationNotFound(id))
    }

    /// Store a new configuration under the next free id and return that id.
    pub fn add_configuration(&mut self, mut configuration: Configuration) -> ConfigurationId {
        let id = self
            .configurations
            .iter()
            .map(|configuration| configuration.id)
            .max()
            .unwrap_or(0)
            + 1;
        configuration.id = id;
        self.configurations.push(configuration);
        id
    }

    /// The configuration in a given state, if any. Returns the first match.
    pub fn configuration_in(&self, state: ConfigurationState) -> Option<&Configuration> {
        self.configurations
            .iter()
            .find(|configuration| configuration.state == state)
    }

    /// The configuration the cluster currently runs.
    pub fn active_configuration(&self) -> Option<&Configuration> {
        self.configuration_in(ConfigurationState::Active)
    }

    /// Look up a migration.
    pub fn migration(&self, id: MigrationId) -> Result<&Migration> {
        self.migrations
            .iter()
            .find(|migration| migration.id == id)
            .ok_or(PersistenceError::MigrationNotFound(id))
    }

    /// The migration currently in progress.
    pub fn active_migration(&self) -> Option<&Migration> {
        self.migrations.iter().find(|migration| migration.is_active)
    }

    /// The migration currently in progress, for modification.
    pub fn active_migration_mut(&mut self) -> Option<&mut Migration> {
        self.migrations.iter_mut().find(|migration| migration.is_active)
    }

    /// Open a migration between two configurations under the next free id.
    pub fn start_migration(&mut self, from: ConfigurationId, to: ConfigurationId) -> &Migration {
        let id = self
            .migrations
            .iter()
            .map(|migration| migration.id)
            .max()
            .unwrap_or(0)
            + 1;
        self.migrations.push(Migration::preparing(id, from, to));
        &self.migrations[self.migrations.len() - 1]
    }

    /// Append records to the migration log.
    pub fn append_log(&mut self, records: impl IntoIterator<Item = MigrationLogRecord>) {
        self.migration_log.extend(records);
    }

    /// Log records of one migration, or of idle-mode operations when `None`.
    pub fn migration_log(&self, migration_id: Option<MigrationId>) -> Vec<&MigrationLogRecord> {
        self.migration_log
            .iter()
            .filter(|record| record.migration_id == migration_id)
            .collect()
    }

    /// Check the cluster-wide invariants: at most one active configuration,
    /// at most one active migration, and migrations referencing known configurations.
    pub fn check_invariants(&self) -> Result<()> {
        let active = self
            .configurations
            .iter()
            .filter(|configuration| configuration.state == ConfigurationState::Active)
            .count();
        if active > 1 {
            return Err(PersistenceError::Invariant(format!(
                "{active} configurations are active"
            )));
        }
        let running = self.migrations.iter().filter(|m| m.is_active).count();
        if running > 1 {
            return Err(PersistenceError::Invariant(format!(
                "{running} migrations are active"
            )));
        }
        for migration in &self.migrations {
            for id in [migration.from_configuration_id, migration.to_configuration_id] {
                if self.configuration(id).is_err() {
                    return Err(PersistenceError::Invariant(format!(
                        "migration {} references unknown configuration {id}",
                        migration.id
                    )));
                }
            }
        }
        Ok(())
    }
}
