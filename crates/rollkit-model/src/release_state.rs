//! ---
//! rk_section: "02-data-model"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Plain data records shared by collectors, reconciliation, and the orchestrator."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::configuration::ConfigurationId;
use crate::log::MigrationLogRecord;

/// A resource as described by the migrator that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigratableResource {
    /// Stable resource code.
    pub code: String,
    /// Human readable name.
    pub name: String,
}

impl MigratableResource {
    /// Convenience constructor.
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Live state of one resource as seen by one release's migrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReleaseState {
    /// Stable resource code.
    pub code: String,
    /// Human readable name.
    pub name: String,
    /// Current point; `None` when the resource does not exist yet.
    #[serde(default)]
    pub current_point: Option<String>,
}

/// One release's view of a migrator and its resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigratorReleaseState {
    /// Registry key of the migrator type.
    pub type_name: String,
    /// Human readable name.
    pub name: String,
    /// Ordered points known to this release's migrator code.
    #[serde(default)]
    pub migration_points: Vec<String>,
    /// Last element of `migration_points`.
    #[serde(default)]
    pub last_defined_point: Option<String>,
    /// Resources with their live points.
    #[serde(default)]
    pub resources: Vec<ResourceReleaseState>,
}

impl MigratorReleaseState {
    /// Whether this migrator declares the given point. Absent points are never declared.
    pub fn declares(&self, point: Option<&str>) -> bool {
        match point {
            Some(point) => self.migration_points.iter().any(|p| p == point),
            None => false,
        }
    }

    /// Look up a resource by code.
    pub fn resource(&self, code: &str) -> Option<&ResourceReleaseState> {
        self.resources.iter().find(|resource| resource.code == code)
    }
}

/// One release's view of every migrator declared by a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigratorTemplateReleaseState {
    /// Template code.
    pub code: String,
    /// Template name.
    pub name: String,
    /// Resolved migrators.
    #[serde(default)]
    pub migrators: Vec<MigratorReleaseState>,
}

impl MigratorTemplateReleaseState {
    /// Look up a migrator by type name.
    pub fn migrator(&self, type_name: &str) -> Option<&MigratorReleaseState> {
        self.migrators
            .iter()
            .find(|migrator| migrator.type_name == type_name)
    }
}

/// Full resource snapshot of one configuration, with the errors met while collecting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseState {
    /// Configuration the snapshot belongs to.
    pub configuration_id: ConfigurationId,
    /// Per-template states in configuration order.
    #[serde(default)]
    pub templates: Vec<MigratorTemplateReleaseState>,
    /// Load and query errors. Collection continues past each of them.
    #[serde(default)]
    pub errors: Vec<MigrationLogRecord>,
}

impl ReleaseState {
    /// Look up a template by code.
    pub fn template(&self, code: &str) -> Option<&MigratorTemplateReleaseState> {
        self.templates.iter().find(|template| template.code == code)
    }

    /// Iterate every resource of every migrator.
    pub fn resources(&self) -> impl Iterator<Item = (&MigratorReleaseState, &ResourceReleaseState)> {
        self.templates
            .iter()
            .flat_map(|template| template.migrators.iter())
            .flat_map(|migrator| migrator.resources.iter().map(move |resource| (migrator, resource)))
    }
}
