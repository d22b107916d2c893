//! ---
//! rk_section: "05-reconciliation"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Pure reconciliation of release snapshots into per-resource migration state."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Single-release checks used while no migration is running.
use rollkit_model::{MigratorReleaseState, ReleaseState, ResourceReleaseState};

/// Resources whose current point differs from their migrator's last defined point.
pub fn unsettled_resources(
    state: &ReleaseState,
) -> impl Iterator<Item = (&str, &MigratorReleaseState, &ResourceReleaseState)> {
    state.templates.iter().flat_map(|template| {
        template.migrators.iter().flat_map(move |migrator| {
            migrator
                .resources
                .iter()
                .filter(move |resource| resource.current_point != migrator.last_defined_point)
                .map(move |resource| (template.code.as_str(), migrator, resource))
        })
    })
}

/// Every resource sits at its migrator's last defined point.
pub fn is_settled(state: &ReleaseState) -> bool {
    unsettled_resources(state).next().is_none()
}

/// Every existing resource sits at a point its migrator declares, so the
/// release's own code can move it.
pub fn is_migratable(state: &ReleaseState) -> bool {
    state.resources().all(|(migrator, resource)| {
        resource.current_point.is_none() || migrator.declares(resource.current_point.as_deref())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollkit_model::MigratorTemplateReleaseState;

    fn state(current: &[Option<&str>]) -> ReleaseState {
        ReleaseState {
            configuration_id: 1,
            templates: vec![MigratorTemplateReleaseState {
                code: "db".into(),
                name: "Database".into(),
                migrators: vec![MigratorReleaseState {
                    type_name: "schema".into(),
                    name: "Schema".into(),
                    migration_points: vec!["v1".into(), "v2".into()],
                    last_defined_point: Some("v2".into()),
                    resources: current
                        .iter()
                        .enumerate()
                        .map(|(index, point)| ResourceReleaseState {
                            code: format!("r{index}"),
                            name: format!("R{index}"),
                            current_point: point.map(str::to_owned),
                        })
                        .collect(),
                }],
            }],
            errors: Vec::new(),
        }
    }

    #[test]
    fn settled_only_when_everything_is_at_last_point() {
        assert!(is_settled(&state(&[Some("v2"), Some("v2")])));
        assert!(!is_settled(&state(&[Some("v2"), None])));
        let release = state(&[Some("v1"), Some("v2")]);
        let unsettled: Vec<_> = unsettled_resources(&release).map(|(_, _, r)| r.code.clone()).collect();
        assert_eq!(unsettled, vec!["r0"]);
    }

    #[test]
    fn undeclared_points_block_idle_migration() {
        assert!(is_migratable(&state(&[Some("v1"), None])));
        assert!(!is_migratable(&state(&[Some("v9")])));
    }
}
