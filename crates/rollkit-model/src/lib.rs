//! ---
//! rk_section: "02-data-model"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Plain data records shared by collectors, reconciliation, and the orchestrator."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Data records for rollkit.
//!
//! Everything in this crate is plain data: records are copied by value across the
//! sandbox boundary and between the orchestrator and its persistence collaborator.
#![warn(missing_docs)]

pub mod configuration;
pub mod errors;
pub mod log;
pub mod migration;
pub mod migration_state;
pub mod release_state;

pub use configuration::{
    Configuration, ConfigurationId, ConfigurationSettings, ConfigurationState, MigratorTemplate,
    NodeTemplate, PackageDescription, PackageRequirement,
};
pub use errors::ErrorDescription;
pub use log::{MigrationLogRecord, MigrationLogRecordType};
pub use migration::{
    Migration, MigrationDirection, MigrationId, MigrationSide, MigrationState, MigrationStep,
};
pub use migration_state::{
    MigrationPosition, MigrationStateView, MigratorMigrationState, MigratorPosition,
    MigratorTemplateMigrationState, ResourceMigrationState, ResourcePosition,
};
pub use release_state::{
    MigratableResource, MigratorReleaseState, MigratorTemplateReleaseState, ReleaseState,
    ResourceReleaseState,
};
