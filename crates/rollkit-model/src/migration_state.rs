//! ---
//! rk_section: "02-data-model"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Plain data records shared by collectors, reconciliation, and the orchestrator."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Computed reconciliation views. Never persisted; rebuilt from two release snapshots.
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::migration::{MigrationDirection, MigrationSide};
use crate::release_state::MigratorReleaseState;

/// Where a resource stands relative to the two releases of a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourcePosition {
    /// The resource has no current point.
    NotCreated,
    /// The destination no longer declares the resource's migrator.
    Obsolete,
    /// Both releases agree on the point the resource is at.
    SourceAndDestination,
    /// At the source's last defined point.
    Source,
    /// At the destination's last defined point.
    Destination,
    /// At neither release's last defined point.
    Undefined,
}

impl ResourcePosition {
    /// Positions that need no work in either direction.
    pub fn is_neutral(&self) -> bool {
        matches!(
            self,
            ResourcePosition::NotCreated
                | ResourcePosition::Obsolete
                | ResourcePosition::SourceAndDestination
        )
    }
}

/// Presence of a template or migrator across the two releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MigratorPosition {
    /// Only the destination declares it.
    New,
    /// Only the source declares it.
    Obsolete,
    /// Both releases declare it.
    Merged,
}

/// Aggregate position of every resource in a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MigrationPosition {
    /// Every resource is in a neutral position.
    NoMigrationNeeded,
    /// Every non-neutral resource is at the source.
    Source,
    /// Every non-neutral resource is at the destination.
    Destination,
    /// Resources are split between sides or undefined.
    Mixed,
}

/// Reconciled state of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMigrationState {
    /// Template the resource's migrator belongs to.
    pub template_code: String,
    /// Migrator type owning the resource.
    pub migrator_type_name: String,
    /// Resource code.
    pub code: String,
    /// Resource name.
    pub name: String,
    /// Live point used for reconciliation.
    pub current_point: Option<String>,
    /// The source release's last defined point, if the source declares the migrator.
    pub source_point: Option<String>,
    /// The destination release's last defined point, if the destination declares the migrator.
    pub destination_point: Option<String>,
    /// Which release's code may move the resource to `source_point`.
    pub migration_to_source_executor: Option<MigrationSide>,
    /// Which release's code may move the resource to `destination_point`.
    pub migration_to_destination_executor: Option<MigrationSide>,
}

impl ResourceMigrationState {
    /// Derived position. Blank points count as absent.
    pub fn position(&self) -> ResourcePosition {
        let current = non_blank(self.current_point.as_deref());
        let source = non_blank(self.source_point.as_deref());
        let destination = non_blank(self.destination_point.as_deref());

        let Some(current) = current else {
            return ResourcePosition::NotCreated;
        };
        let Some(destination) = destination else {
            return ResourcePosition::Obsolete;
        };
        let at_source = source == Some(current);
        let at_destination = destination == current;
        match (at_source, at_destination) {
            (true, true) => ResourcePosition::SourceAndDestination,
            (true, false) => ResourcePosition::Source,
            (false, true) => ResourcePosition::Destination,
            (false, false) => ResourcePosition::Undefined,
        }
    }

    /// The executor able to move the resource towards `target`.
    pub fn executor_towards(&self, target: MigrationSide) -> Option<MigrationSide> {
        match target {
            MigrationSide::Source => self.migration_to_source_executor,
            MigrationSide::Destination => self.migration_to_destination_executor,
        }
    }

    /// The point the resource would reach when moved towards `target`.
    pub fn point_for(&self, target: MigrationSide) -> Option<&str> {
        match target {
            MigrationSide::Source => self.source_point.as_deref(),
            MigrationSide::Destination => self.destination_point.as_deref(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Reconciled state of one migrator within a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigratorMigrationState {
    /// Migrator type name.
    pub type_name: String,
    /// Human readable name.
    pub name: String,
    /// Presence across releases.
    pub position: MigratorPosition,
    /// Direction implied by the two point lists.
    pub direction: MigrationDirection,
    /// Source snapshot, if the source declares the migrator.
    pub source: Option<MigratorReleaseState>,
    /// Destination snapshot, if the destination declares the migrator.
    pub destination: Option<MigratorReleaseState>,
    /// Resources in reconciliation order.
    pub resources: Vec<ResourceMigrationState>,
}

/// Reconciled state of one migrator template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigratorTemplateMigrationState {
    /// Template code.
    pub code: String,
    /// Template name (destination's when both releases declare it).
    pub name: String,
    /// Presence across releases.
    pub position: MigratorPosition,
    /// Migrators in reconciliation order.
    pub migrators: Vec<MigratorMigrationState>,
}

impl MigratorTemplateMigrationState {
    /// Look up a migrator by type name.
    pub fn migrator(&self, type_name: &str) -> Option<&MigratorMigrationState> {
        self.migrators
            .iter()
            .find(|migrator| migrator.type_name == type_name)
    }
}

/// The full reconciliation view of a migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStateView {
    /// Aggregate resource position.
    pub position: MigrationPosition,
    /// Per-template states.
    pub templates: Vec<MigratorTemplateMigrationState>,
}

impl MigrationStateView {
    /// Look up a template by code.
    pub fn template(&self, code: &str) -> Option<&MigratorTemplateMigrationState> {
        self.templates.iter().find(|template| template.code == code)
    }

    /// Look up a resource by its full address.
    pub fn resource(
        &self,
        template_code: &str,
        migrator_type_name: &str,
        resource_code: &str,
    ) -> Option<&ResourceMigrationState> {
        self.template(template_code)?
            .migrator(migrator_type_name)?
            .resources
            .iter()
            .find(|resource| resource.code == resource_code)
    }

    /// Iterate every reconciled resource.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceMigrationState> {
        self.templates
            .iter()
            .flat_map(|template| template.migrators.iter())
            .flat_map(|migrator| migrator.resources.iter())
    }
}
