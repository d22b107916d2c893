//! ---
//! rk_section: "05-reconciliation"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Pure reconciliation of release snapshots into per-resource migration state."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Reconciliation of release snapshots.
//!
//! Every function here is pure: it reads one or two [`ReleaseState`] values and
//! produces a fresh view. Nothing is cached and nothing touches a live resource.
//!
//! [`ReleaseState`]: rollkit_model::ReleaseState
#![warn(missing_docs)]

pub mod capabilities;
pub mod direction;
pub mod guards;
pub mod matching;
pub mod position;
pub mod release;
pub mod resource;

pub use capabilities::MigrationCapabilities;
pub use direction::{migration_direction, migrator_direction, points_direction};
pub use guards::{cancel_blockers, finish_blockers, ResourceAddress, UNKNOWN_STATE};
pub use matching::reconcile;
pub use position::migration_position;
pub use release::{is_migratable, is_settled, unsettled_resources};
pub use resource::{one_sided, two_sided};
