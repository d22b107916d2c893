//! ---
//! rk_section: "05-reconciliation"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Pure reconciliation of release snapshots into per-resource migration state."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use rollkit_model::{MigrationPosition, ResourceMigrationState, ResourcePosition};

/// Aggregate the positions of every resource of a migration.
///
/// Neutral resources (not created, obsolete, or already at both points) never
/// decide the outcome. Anything undefined, or a split between sides, is `Mixed`.
pub fn migration_position<'a>(
    resources: impl IntoIterator<Item = &'a ResourceMigrationState>,
) -> MigrationPosition {
    let (mut at_source, mut at_destination) = (false, false);
    for resource in resources {
        match resource.position() {
            ResourcePosition::Source => at_source = true,
            ResourcePosition::Destination => at_destination = true,
            ResourcePosition::Undefined => return MigrationPosition::Mixed,
            ResourcePosition::NotCreated
            | ResourcePosition::Obsolete
            | ResourcePosition::SourceAndDestination => {}
        }
    }
    match (at_source, at_destination) {
        (false, false) => MigrationPosition::NoMigrationNeeded,
        (true, false) => MigrationPosition::Source,
        (false, true) => MigrationPosition::Destination,
        (true, true) => MigrationPosition::Mixed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(current: Option<&str>) -> ResourceMigrationState {
        ResourceMigrationState {
            template_code: "db".into(),
            migrator_type_name: "schema".into(),
            code: "orders".into(),
            name: "Orders".into(),
            current_point: current.map(str::to_owned),
            source_point: Some("v1".into()),
            destination_point: Some("v2".into()),
            migration_to_source_executor: None,
            migration_to_destination_executor: None,
        }
    }

    #[test]
    fn neutral_resources_do_not_count() {
        assert_eq!(migration_position([&at(None)]), MigrationPosition::NoMigrationNeeded);
        assert_eq!(migration_position([&at(None), &at(Some("v1"))]), MigrationPosition::Source);
        assert_eq!(migration_position([&at(Some("v2"))]), MigrationPosition::Destination);
    }

    #[test]
    fn split_or_undefined_is_mixed() {
        assert_eq!(migration_position([&at(Some("v1")), &at(Some("v2"))]), MigrationPosition::Mixed);
        assert_eq!(migration_position([&at(Some("v0"))]), MigrationPosition::Mixed);
    }
}
