//! ---
//! rk_section: "05-reconciliation"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Pure reconciliation of release snapshots into per-resource migration state."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Which operator actions fit the current shape of a migration.
use rollkit_model::{MigrationDirection, MigrationPosition, MigrationSide, MigrationStep};
use serde::{Deserialize, Serialize};

/// Action flags and step plan derived from direction, aggregate position, and
/// which release the nodes currently run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationCapabilities {
    /// Resource updates are meaningful right now.
    pub can_migrate_resources: bool,
    /// Nodes may be rolled back onto the source release.
    pub can_update_nodes_to_source: bool,
    /// Nodes may be rolled onto the destination release.
    pub can_update_nodes_to_destination: bool,
    /// Every resource is where the destination expects it.
    pub can_finish_migration: bool,
    /// Ordered step plan for the direction.
    pub steps: Vec<MigrationStep>,
    /// Step the migration is currently at.
    pub current_step: MigrationStep,
}

impl MigrationCapabilities {
    /// Capabilities of a migration whose direction cannot be followed.
    pub fn broken() -> Self {
        Self {
            can_migrate_resources: false,
            can_update_nodes_to_source: false,
            can_update_nodes_to_destination: false,
            can_finish_migration: false,
            steps: MigrationStep::plan(MigrationDirection::Undefined),
            current_step: MigrationStep::Broken,
        }
    }

    /// Derive the flags. `active` is the side whose configuration the nodes run.
    pub fn derive(
        direction: MigrationDirection,
        position: MigrationPosition,
        active: MigrationSide,
    ) -> Self {
        use MigrationDirection::*;

        if direction == Undefined {
            return Self::broken();
        }
        let on_source = active == MigrationSide::Source;
        let on_destination = active == MigrationSide::Destination;
        let at = |wanted: MigrationPosition| position == wanted;

        let nothing_to_migrate = direction == Stay
            || (direction == Upgrade && at(MigrationPosition::Destination) && on_destination)
            || (direction == Downgrade && at(MigrationPosition::Source) && on_source);

        let can_update_nodes_to_destination = on_source
            && (direction == Stay
                || (direction == Upgrade && at(MigrationPosition::Destination))
                || direction == Downgrade);
        let can_update_nodes_to_source = on_destination
            && (direction == Stay
                || (direction == Downgrade && at(MigrationPosition::Source))
                || direction == Upgrade);

        let can_finish_migration =
            at(MigrationPosition::Destination) || at(MigrationPosition::NoMigrationNeeded);

        let untouched = (at(MigrationPosition::Source) || at(MigrationPosition::NoMigrationNeeded))
            && on_source;
        let completed = can_finish_migration && on_destination;
        let current_step = if untouched {
            MigrationStep::Start
        } else if completed {
            MigrationStep::Finish
        } else {
            match direction {
                Upgrade if !at(MigrationPosition::Destination) => MigrationStep::ResourcesUpdating,
                Upgrade if on_source => MigrationStep::NodesUpdating,
                Upgrade => MigrationStep::ResourcesUpdated,
                Downgrade if on_source => MigrationStep::NodesUpdating,
                Downgrade if !at(MigrationPosition::Source) => MigrationStep::ResourcesUpdating,
                Downgrade => MigrationStep::NodesUpdated,
                Stay => MigrationStep::NodesUpdating,
                Undefined => MigrationStep::Broken,
            }
        };

        Self {
            can_migrate_resources: !nothing_to_migrate,
            can_update_nodes_to_source,
            can_update_nodes_to_destination,
            can_finish_migration,
            steps: MigrationStep::plan(direction),
            current_step,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_upgrade_starts_with_resources() {
        let caps = MigrationCapabilities::derive(
            MigrationDirection::Upgrade,
            MigrationPosition::Source,
            MigrationSide::Source,
        );
        assert_eq!(caps.current_step, MigrationStep::Start);
        assert!(caps.can_migrate_resources);
        assert!(!caps.can_update_nodes_to_destination);
        assert!(!caps.can_finish_migration);
    }

    #[test]
    fn upgraded_resources_unlock_node_cut_over() {
        let caps = MigrationCapabilities::derive(
            MigrationDirection::Upgrade,
            MigrationPosition::Destination,
            MigrationSide::Source,
        );
        assert!(caps.can_update_nodes_to_destination);
        assert!(caps.can_finish_migration);
        assert_eq!(caps.current_step, MigrationStep::NodesUpdating);

        let done = MigrationCapabilities::derive(
            MigrationDirection::Upgrade,
            MigrationPosition::Destination,
            MigrationSide::Destination,
        );
        assert!(!done.can_migrate_resources);
        assert_eq!(done.current_step, MigrationStep::Finish);
    }

    #[test]
    fn downgrade_moves_nodes_first() {
        let caps = MigrationCapabilities::derive(
            MigrationDirection::Downgrade,
            MigrationPosition::Mixed,
            MigrationSide::Source,
        );
        assert!(caps.can_update_nodes_to_destination);
        assert_eq!(caps.current_step, MigrationStep::NodesUpdating);

        let nodes_moved = MigrationCapabilities::derive(
            MigrationDirection::Downgrade,
            MigrationPosition::Mixed,
            MigrationSide::Destination,
        );
        assert_eq!(nodes_moved.current_step, MigrationStep::ResourcesUpdating);
        assert!(!nodes_moved.can_update_nodes_to_source);
    }

    #[test]
    fn undefined_direction_is_broken() {
        let caps = MigrationCapabilities::derive(
            MigrationDirection::Undefined,
            MigrationPosition::Destination,
            MigrationSide::Destination,
        );
        assert_eq!(caps, MigrationCapabilities::broken());
        assert_eq!(caps.steps, vec![MigrationStep::Broken]);
    }
}
