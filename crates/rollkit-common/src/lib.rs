//! ---
//! rk_section: "01-core-functionality"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Shared configuration and tracing setup."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Core shared primitives for the rollkit workspace.
//! This crate exposes configuration loading and logging setup consumed by the
//! orchestrator, the operator CLI, and the sandbox worker.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, ClusterConfig, LoadedAppConfig, LoggingConfig, SandboxConfig, SandboxMode,
    StoreConfig,
};
pub use logging::{init_tracing, LogFormat};
