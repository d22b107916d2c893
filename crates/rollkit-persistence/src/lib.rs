//! ---
//! rk_section: "03-persistence-logging"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Cluster store and hash-chained audit log."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
#![warn(missing_docs)]

use rollkit_model::{ConfigurationId, MigrationId};

/// Result alias used throughout the persistence crate.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Error type for the persistence subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Wrapper for IO errors encountered while reading/writing persistence files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization issues.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Reported when a stored document fails integrity verification.
    #[error("cluster store hash mismatch")]
    HashMismatch,
    /// The stored document was written by an incompatible version.
    #[error("unsupported cluster store version {0}")]
    UnsupportedVersion(u16),
    /// No configuration with the given id.
    #[error("configuration {0} was not found")]
    ConfigurationNotFound(ConfigurationId),
    /// No migration with the given id.
    #[error("migration {0} was not found")]
    MigrationNotFound(MigrationId),
    /// The data violates a cluster-wide invariant and was not stored.
    #[error("cluster invariant violated: {0}")]
    Invariant(String),
}

pub mod audit;
pub mod data;
pub mod store;

pub use audit::{AuditEntry, AuditLog};
pub use data::ClusterData;
pub use store::{ClusterStore, InMemoryStore, JsonFileStore, STORE_VERSION};
