//! ---
//! rk_section: "04-migration-execution"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Migrator contract, collectors, and the release sandbox boundary."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Migrator plugins and the machinery that runs them.
//!
//! A collector executes one unit of work against exactly one release's migrator
//! code and returns plain data plus every failure it met. Collectors reach the
//! host only through [`wire`] records, either from a worker process or from a
//! fresh in-process registry.
#![warn(missing_docs)]

pub mod collector;
pub mod contract;
pub mod executor;
pub mod file_marker;
pub mod registry;
pub mod release_state;
pub mod sandbox;
pub mod settings;
pub mod wire;

pub use collector::{display_name, execute, guard, CallFailure, Collector, CollectorContext, CollectorOutcome};
pub use contract::Migrator;
pub use executor::{MigrationExecutor, MigratorCommand};
pub use file_marker::FileMarkerMigrator;
pub use registry::{MigratorFactory, MigratorRegistry, RegistryError};
pub use release_state::ReleaseStateCollector;
pub use sandbox::{
    InProcessSandbox, ProcessSandbox, RegistryFactory, ReleaseSandbox, SandboxError,
};
pub use settings::{MigratorSettings, MIGRATORS_PATH};
pub use wire::{serve, serve_json, SandboxRequest, SandboxResponse, SandboxResult, SandboxTask};
