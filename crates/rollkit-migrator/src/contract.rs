//! ---
//! rk_section: "04-migration-execution"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Migrator contract, collectors, and the release sandbox boundary."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use anyhow::Result;
use rollkit_model::MigratableResource;

/// Resource-specific migration plugin.
///
/// Point lists are ordered and belong to one compiled version of the migrator;
/// two releases may disagree about the list for the same template code.
/// A resource may only be migrated to a point present in [`Migrator::all_points`].
pub trait Migrator {
    /// Human readable migrator name.
    fn name(&self) -> String;

    /// Resources this migrator manages.
    fn migratable_resources(&self) -> Result<Vec<MigratableResource>>;

    /// Ordered migration points known to this version.
    fn all_points(&self) -> Result<Vec<String>>;

    /// The last element of [`Migrator::all_points`].
    fn latest_point(&self) -> Result<Option<String>> {
        Ok(self.all_points()?.last().cloned())
    }

    /// Live-queried current point. `None` means the resource does not exist yet.
    fn current_point(&self, resource: &MigratableResource) -> Result<Option<String>>;

    /// Move the resource to `point`, returning log lines.
    fn migrate(&mut self, resource: &MigratableResource, point: &str) -> Result<Vec<String>>;
}
