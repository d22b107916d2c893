//! ---
//! rk_section: "05-reconciliation"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Pure reconciliation of release snapshots into per-resource migration state."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Preconditions of the terminal migration commands, reported per resource.
use std::fmt;

use rollkit_model::{ErrorDescription, MigrationStateView, ResourceMigrationState, ResourcePosition};
use serde::{Deserialize, Serialize};

/// Full address of a resource inside a migration view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceAddress {
    /// Migrator template code.
    pub template_code: String,
    /// Migrator type name.
    pub migrator_type_name: String,
    /// Resource code.
    pub resource_code: String,
}

impl ResourceAddress {
    /// Build an address.
    pub fn new(
        template_code: impl Into<String>,
        migrator_type_name: impl Into<String>,
        resource_code: impl Into<String>,
    ) -> Self {
        Self {
            template_code: template_code.into(),
            migrator_type_name: migrator_type_name.into(),
            resource_code: resource_code.into(),
        }
    }

    fn of(resource: &ResourceMigrationState) -> Self {
        Self::new(
            resource.template_code.clone(),
            resource.migrator_type_name.clone(),
            resource.code.clone(),
        )
    }

    /// `{field, message}` error pointing at this resource.
    pub fn error(&self, message: impl Into<String>) -> ErrorDescription {
        ErrorDescription::new(self.to_string(), message)
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "resources[\"{}\"][\"{}\"][\"{}\"]",
            self.template_code, self.migrator_type_name, self.resource_code
        )
    }
}

/// Resources that keep a migration from finishing: anything still at the
/// source point or at a point neither release defines.
pub fn finish_blockers(view: &MigrationStateView) -> Vec<ErrorDescription> {
    view.resources()
        .filter_map(|resource| {
            let message = match resource.position() {
                ResourcePosition::Source => "Resource is not migrated to the destination point",
                ResourcePosition::Undefined => "Resource is at an undefined point",
                _ => return None,
            };
            Some(ResourceAddress::of(resource).error(message))
        })
        .collect()
}

/// Message for touched resources whose current point is not known.
pub const UNKNOWN_STATE: &str = "Resource state is unknown";

/// Touched resources that could no longer be brought back to the source.
///
/// A resource is reversible when it already sits at the source point, is at both
/// points, was never created, or some release can still migrate it to the source.
/// A touched address missing from the view could not be read and blocks cancel.
pub fn cancel_blockers(
    view: &MigrationStateView,
    touched: &[ResourceAddress],
) -> Vec<ErrorDescription> {
    touched
        .iter()
        .filter_map(|address| {
            let Some(resource) = view.resource(
                &address.template_code,
                &address.migrator_type_name,
                &address.resource_code,
            ) else {
                return Some(address.error(UNKNOWN_STATE));
            };
            let reversible = matches!(
                resource.position(),
                ResourcePosition::Source
                    | ResourcePosition::SourceAndDestination
                    | ResourcePosition::NotCreated
            ) || resource.migration_to_source_executor.is_some();
            (!reversible).then(|| address.error("Resource can not be migrated back to the source point"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollkit_model::{
        MigrationPosition, MigrationSide, MigrationDirection, MigratorMigrationState,
        MigratorPosition, MigratorTemplateMigrationState,
    };

    fn resource(code: &str, current: &str, to_source: Option<MigrationSide>) -> ResourceMigrationState {
        ResourceMigrationState {
            template_code: "db".into(),
            migrator_type_name: "schema".into(),
            code: code.into(),
            name: code.into(),
            current_point: Some(current.into()),
            source_point: Some("v1".into()),
            destination_point: Some("v2".into()),
            migration_to_source_executor: to_source,
            migration_to_destination_executor: None,
        }
    }

    fn view(resources: Vec<ResourceMigrationState>) -> MigrationStateView {
        MigrationStateView {
            position: MigrationPosition::Mixed,
            templates: vec![MigratorTemplateMigrationState {
                code: "db".into(),
                name: "Database".into(),
                position: MigratorPosition::Merged,
                migrators: vec![MigratorMigrationState {
                    type_name: "schema".into(),
                    name: "Schema".into(),
                    position: MigratorPosition::Merged,
                    direction: MigrationDirection::Upgrade,
                    source: None,
                    destination: None,
                    resources,
                }],
            }],
        }
    }

    #[test]
    fn finish_is_blocked_by_source_and_undefined_resources() {
        let view = view(vec![
            resource("done", "v2", None),
            resource("behind", "v1", None),
            resource("lost", "v7", None),
        ]);
        let blockers = finish_blockers(&view);
        let fields: Vec<_> = blockers.iter().map(|e| e.field.clone().unwrap()).collect();
        assert_eq!(
            fields,
            vec![
                r#"resources["db"]["schema"]["behind"]"#.to_owned(),
                r#"resources["db"]["schema"]["lost"]"#.to_owned(),
            ]
        );
    }

    #[test]
    fn cancel_requires_a_way_back() {
        let view = view(vec![
            resource("reversible", "v2", Some(MigrationSide::Destination)),
            resource("stuck", "v2", None),
            resource("untouched", "v1", None),
        ]);
        let touched = vec![
            ResourceAddress::new("db", "schema", "reversible"),
            ResourceAddress::new("db", "schema", "stuck"),
            ResourceAddress::new("db", "schema", "untouched"),
            ResourceAddress::new("db", "schema", "vanished"),
        ];
        let blockers = cancel_blockers(&view, &touched);
        assert_eq!(blockers.len(), 2);
        assert_eq!(
            blockers[0].field.as_deref(),
            Some(r#"resources["db"]["schema"]["stuck"]"#)
        );
        assert_eq!(
            blockers[1].field.as_deref(),
            Some(r#"resources["db"]["schema"]["vanished"]"#)
        );
        assert_eq!(blockers[1].message, UNKNOWN_STATE);
    }
}
