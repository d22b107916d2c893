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

/// Identifier assigned to a configuration by the persistence collaborator.
pub type ConfigurationId = u64;

/// Lifecycle state of a cluster configuration (release).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConfigurationState {
    /// Authored and still mutable.
    #[default]
    Draft,
    /// Validated and frozen, eligible as a migration destination.
    Ready,
    /// The configuration the cluster is currently running.
    Active,
    /// Superseded by another configuration.
    Obsolete,
}

/// A versioned, cluster-wide settings snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Store-assigned identifier.
    pub id: ConfigurationId,
    /// Human readable name.
    pub name: String,
    /// Major version component.
    #[serde(default)]
    pub major_version: u32,
    /// Minor version component.
    #[serde(default)]
    pub minor_version: u32,
    /// Free form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
    /// When the configuration first became active.
    #[serde(default)]
    pub started: Option<DateTime<Utc>>,
    /// When the configuration stopped being active.
    #[serde(default)]
    pub finished: Option<DateTime<Utc>>,
    /// Current lifecycle state.
    #[serde(default)]
    pub state: ConfigurationState,
    /// Operator flag marking an active configuration as known-good.
    #[serde(default)]
    pub is_stable: bool,
    /// Templates and packages.
    #[serde(default)]
    pub settings: ConfigurationSettings,
}

impl Configuration {
    /// Construct a new draft configuration.
    pub fn draft(id: ConfigurationId, name: impl Into<String>, settings: ConfigurationSettings) -> Self {
        Self {
            id,
            name: name.into(),
            major_version: 0,
            minor_version: 0,
            notes: None,
            created: Utc::now(),
            started: None,
            finished: None,
            state: ConfigurationState::Draft,
            is_stable: false,
            settings,
        }
    }

    /// Only drafts may be edited.
    pub fn is_mutable(&self) -> bool {
        matches!(self.state, ConfigurationState::Draft)
    }

    /// Look up a migrator template by its stable code.
    pub fn migrator_template(&self, code: &str) -> Option<&MigratorTemplate> {
        self.settings
            .migrator_templates
            .iter()
            .find(|template| template.code == code)
    }
}

/// Templates and packages that make up a configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSettings {
    /// Node templates describing what runs on cluster nodes.
    #[serde(default)]
    pub node_templates: Vec<NodeTemplate>,
    /// Migrator templates owning stateful resources.
    #[serde(default)]
    pub migrator_templates: Vec<MigratorTemplate>,
    /// Packages (with pinned versions) the templates may require.
    #[serde(default)]
    pub packages: Vec<PackageDescription>,
}

/// Description of one class of cluster node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTemplate {
    /// Stable identity across releases.
    pub code: String,
    /// Human readable name.
    pub name: String,
    /// Node configuration text.
    #[serde(default)]
    pub configuration: String,
    /// Packages the node needs.
    #[serde(default)]
    pub package_requirements: Vec<PackageRequirement>,
    /// Minimum number of instances for a healthy cluster.
    #[serde(default)]
    pub minimum_required_instances: u32,
    /// Upper bound of useful instances.
    #[serde(default)]
    pub maximum_needed_instances: Option<u32>,
    /// Scheduling priority.
    #[serde(default)]
    pub priority: f64,
}

/// Declarative identity of one migrator class within a configuration.
///
/// Two templates with the same `code` in different configurations describe the
/// same logical migrator, although their compiled code may be incompatible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigratorTemplate {
    /// Stable identity across releases.
    pub code: String,
    /// Human readable name.
    pub name: String,
    /// Migrator configuration document (TOML). Lists migrator types under `rollkit.migrators`.
    #[serde(default)]
    pub configuration: String,
    /// Free form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Execution priority among templates.
    #[serde(default)]
    pub priority: f64,
    /// Packages the migrator code ships in.
    #[serde(default)]
    pub package_requirements: Vec<PackageRequirement>,
    /// Worker executable carrying this release's migrator code.
    #[serde(default)]
    pub executor: Option<String>,
}

/// A package pinned by the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescription {
    /// Package identifier.
    pub id: String,
    /// Exact version.
    pub version: String,
}

/// A template's requirement on a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRequirement {
    /// Package identifier.
    pub id: String,
    /// Version override; when absent the configuration's pinned version applies.
    #[serde(default)]
    pub specific_version: Option<String>,
}
