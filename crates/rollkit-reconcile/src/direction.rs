//! ---
//! rk_section: "05-reconciliation"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Pure reconciliation of release snapshots into per-resource migration state."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use rollkit_model::{MigrationDirection, MigratorTemplateMigrationState, ResourceMigrationState, ResourcePosition};

fn is_prefix(prefix: &[String], of: &[String]) -> bool {
    prefix.len() <= of.len()
        && prefix
            .iter()
            .zip(of)
            .all(|(left, right)| left.eq_ignore_ascii_case(right))
}

/// Compare two ordered point lists. Point labels compare case-insensitively.
pub fn points_direction(source: &[String], destination: &[String]) -> MigrationDirection {
    if source.len() == destination.len() && is_prefix(source, destination) {
        MigrationDirection::Stay
    } else if is_prefix(source, destination) {
        MigrationDirection::Upgrade
    } else if is_prefix(destination, source) {
        MigrationDirection::Downgrade
    } else {
        MigrationDirection::Undefined
    }
}

/// Direction of a migrator present in both releases. Nothing needs to move when
/// every resource is missing or obsolete.
pub fn migrator_direction(
    source_points: &[String],
    destination_points: &[String],
    resources: &[ResourceMigrationState],
) -> MigrationDirection {
    let idle = resources.iter().all(|resource| {
        matches!(
            resource.position(),
            ResourcePosition::NotCreated | ResourcePosition::Obsolete
        )
    });
    if idle {
        MigrationDirection::Stay
    } else {
        points_direction(source_points, destination_points)
    }
}

/// Direction of a whole migration. Mixed upgrades and downgrades, or any
/// undefined migrator, make the migration undefined.
pub fn migration_direction(templates: &[MigratorTemplateMigrationState]) -> MigrationDirection {
    let directions = templates
        .iter()
        .flat_map(|template| template.migrators.iter())
        .map(|migrator| migrator.direction);

    let (mut upgrade, mut downgrade) = (false, false);
    for direction in directions {
        match direction {
            MigrationDirection::Undefined => return MigrationDirection::Undefined,
            MigrationDirection::Upgrade => upgrade = true,
            MigrationDirection::Downgrade => downgrade = true,
            MigrationDirection::Stay => {}
        }
    }
    match (upgrade, downgrade) {
        (true, true) => MigrationDirection::Undefined,
        (true, false) => MigrationDirection::Upgrade,
        (false, true) => MigrationDirection::Downgrade,
        (false, false) => MigrationDirection::Stay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollkit_model::{MigratorMigrationState, MigratorPosition};

    fn points(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn with(direction: MigrationDirection) -> MigratorMigrationState {
        MigratorMigrationState {
            type_name: format!("{direction}"),
            name: String::new(),
            position: MigratorPosition::Merged,
            direction,
            source: None,
            destination: None,
            resources: Vec::new(),
        }
    }

    fn template(migrators: Vec<MigratorMigrationState>) -> MigratorTemplateMigrationState {
        MigratorTemplateMigrationState {
            code: "db".into(),
            name: "Database".into(),
            position: MigratorPosition::Merged,
            migrators,
        }
    }

    #[test]
    fn prefix_comparison() {
        assert_eq!(points_direction(&points(&["1", "2"]), &points(&["1", "2"])), MigrationDirection::Stay);
        assert_eq!(points_direction(&points(&["1"]), &points(&["1", "2"])), MigrationDirection::Upgrade);
        assert_eq!(points_direction(&points(&["1", "2"]), &points(&["1"])), MigrationDirection::Downgrade);
        assert_eq!(points_direction(&points(&["1", "3"]), &points(&["1", "2"])), MigrationDirection::Undefined);
        assert_eq!(points_direction(&points(&["V1"]), &points(&["v1", "v2"])), MigrationDirection::Upgrade);
    }

    #[test]
    fn partial_labels_are_not_prefixes() {
        assert_eq!(points_direction(&points(&["v1"]), &points(&["v10"])), MigrationDirection::Undefined);
    }

    #[test]
    fn mixed_migrators_are_undefined() {
        let mixed = template(vec![with(MigrationDirection::Upgrade), with(MigrationDirection::Downgrade)]);
        assert_eq!(migration_direction(&[mixed]), MigrationDirection::Undefined);

        let calm = template(vec![with(MigrationDirection::Upgrade), with(MigrationDirection::Stay)]);
        assert_eq!(migration_direction(&[calm]), MigrationDirection::Upgrade);
        assert_eq!(migration_direction(&[]), MigrationDirection::Stay);
    }
}
