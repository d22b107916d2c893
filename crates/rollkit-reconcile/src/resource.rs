//! ---
//! rk_section: "05-reconciliation"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Pure reconciliation of release snapshots into per-resource migration state."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Per-resource rules deciding which release may move a resource, and to where.
use rollkit_model::{
    MigrationSide, MigratorPosition, MigratorReleaseState, ResourceMigrationState,
    ResourceReleaseState,
};

/// Resource whose migrator exists in only one release.
///
/// `position` must be [`MigratorPosition::New`] or [`MigratorPosition::Obsolete`];
/// a `Merged` position is treated as `New`.
pub fn one_sided(
    template_code: &str,
    migrator: &MigratorReleaseState,
    resource: &ResourceReleaseState,
    position: MigratorPosition,
) -> ResourceMigrationState {
    let obsolete = position == MigratorPosition::Obsolete;
    let last = migrator.last_defined_point.clone();
    let current = resource.current_point.as_deref();

    let movable = migrator.declares(current) && current != last.as_deref();
    let (to_source, to_destination) = match (obsolete, movable) {
        (true, true) => (Some(MigrationSide::Source), None),
        (false, true) => (None, Some(MigrationSide::Destination)),
        (_, false) => (None, None),
    };

    ResourceMigrationState {
        template_code: template_code.to_owned(),
        migrator_type_name: migrator.type_name.clone(),
        code: resource.code.clone(),
        name: resource.name.clone(),
        current_point: resource.current_point.clone(),
        source_point: if obsolete { last.clone() } else { None },
        destination_point: if obsolete { None } else { last },
        migration_to_source_executor: to_source,
        migration_to_destination_executor: to_destination,
    }
}

/// Resource known to both releases' versions of the same migrator.
///
/// The destination's live read wins when both are present.
pub fn two_sided(
    template_code: &str,
    source: &MigratorReleaseState,
    source_resource: &ResourceReleaseState,
    destination: &MigratorReleaseState,
    destination_resource: &ResourceReleaseState,
) -> ResourceMigrationState {
    let current_point = destination_resource
        .current_point
        .clone()
        .or_else(|| source_resource.current_point.clone());
    let current = current_point.as_deref();
    let source_last = source.last_defined_point.as_deref();
    let destination_last = destination.last_defined_point.as_deref();

    let to_source = if destination.declares(current) && destination.declares(source_last) {
        Some(MigrationSide::Destination)
    } else if source.declares(current) {
        Some(MigrationSide::Source)
    } else {
        None
    };
    let to_destination = if destination.declares(current) {
        Some(MigrationSide::Destination)
    } else if source.declares(current) && source.declares(destination_last) {
        Some(MigrationSide::Source)
    } else {
        None
    };

    ResourceMigrationState {
        template_code: template_code.to_owned(),
        migrator_type_name: destination.type_name.clone(),
        code: destination_resource.code.clone(),
        name: destination_resource.name.clone(),
        migration_to_source_executor: to_source.filter(|_| current != source_last),
        migration_to_destination_executor: to_destination.filter(|_| current != destination_last),
        source_point: source.last_defined_point.clone(),
        destination_point: destination.last_defined_point.clone(),
        current_point,
    }
}
