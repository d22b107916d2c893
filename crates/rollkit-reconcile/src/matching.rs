//! ---
//! rk_section: "05-reconciliation"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Pure reconciliation of release snapshots into per-resource migration state."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Pairs templates, migrators, and resources of two releases by code.
//!
//! Ordering is destination-first: everything the destination declares comes in
//! destination order, followed by what only the source still declares.
use rollkit_model::{
    MigrationDirection, MigrationStateView, MigratorMigrationState, MigratorPosition,
    MigratorReleaseState, MigratorTemplateMigrationState, MigratorTemplateReleaseState,
    ReleaseState, ResourceMigrationState,
};

use crate::direction::migrator_direction;
use crate::position::migration_position;
use crate::resource::{one_sided, two_sided};

/// Reconcile two release snapshots into a migration view.
pub fn reconcile(source: &ReleaseState, destination: &ReleaseState) -> MigrationStateView {
    let mut templates = Vec::new();
    for to in &destination.templates {
        match source.template(&to.code) {
            Some(from) => templates.push(merged_template(from, to)),
            None => templates.push(one_sided_template(to, MigratorPosition::New)),
        }
    }
    for from in &source.templates {
        if destination.template(&from.code).is_none() {
            templates.push(one_sided_template(from, MigratorPosition::Obsolete));
        }
    }

    let position = migration_position(
        templates
            .iter()
            .flat_map(|template| template.migrators.iter())
            .flat_map(|migrator| migrator.resources.iter()),
    );
    MigrationStateView {
        position,
        templates,
    }
}

fn one_sided_template(
    template: &MigratorTemplateReleaseState,
    position: MigratorPosition,
) -> MigratorTemplateMigrationState {
    MigratorTemplateMigrationState {
        code: template.code.clone(),
        name: template.name.clone(),
        position,
        migrators: template
            .migrators
            .iter()
            .map(|migrator| one_sided_migrator(&template.code, migrator, position))
            .collect(),
    }
}

fn one_sided_migrator(
    template_code: &str,
    migrator: &MigratorReleaseState,
    position: MigratorPosition,
) -> MigratorMigrationState {
    let (source, destination) = match position {
        MigratorPosition::Obsolete => (Some(migrator.clone()), None),
        _ => (None, Some(migrator.clone())),
    };
    MigratorMigrationState {
        type_name: migrator.type_name.clone(),
        name: migrator.name.clone(),
        position,
        direction: MigrationDirection::Stay,
        resources: migrator
            .resources
            .iter()
            .map(|resource| one_sided(template_code, migrator, resource, position))
            .collect(),
        source,
        destination,
    }
}

fn merged_template(
    from: &MigratorTemplateReleaseState,
    to: &MigratorTemplateReleaseState,
) -> MigratorTemplateMigrationState {
    let mut migrators = Vec::new();
    for destination in &to.migrators {
        match from.migrator(&destination.type_name) {
            Some(source) => migrators.push(merged_migrator(&to.code, source, destination)),
            None => migrators.push(one_sided_migrator(
                &to.code,
                destination,
                MigratorPosition::New,
            )),
        }
    }
    for source in &from.migrators {
        if to.migrator(&source.type_name).is_none() {
            migrators.push(one_sided_migrator(
                &to.code,
                source,
                MigratorPosition::Obsolete,
            ));
        }
    }
    MigratorTemplateMigrationState {
        code: to.code.clone(),
        name: to.name.clone(),
        position: MigratorPosition::Merged,
        migrators,
    }
}

fn merged_migrator(
    template_code: &str,
    source: &MigratorReleaseState,
    destination: &MigratorReleaseState,
) -> MigratorMigrationState {
    let resources = merged_resources(template_code, source, destination);
    let direction = migrator_direction(
        &source.migration_points,
        &destination.migration_points,
        &resources,
    );
    MigratorMigrationState {
        type_name: destination.type_name.clone(),
        name: destination.name.clone(),
        position: MigratorPosition::Merged,
        direction,
        source: Some(source.clone()),
        destination: Some(destination.clone()),
        resources,
    }
}

fn merged_resources(
    template_code: &str,
    source: &MigratorReleaseState,
    destination: &MigratorReleaseState,
) -> Vec<ResourceMigrationState> {
    let mut resources = Vec::new();
    for to in &destination.resources {
        match source.resource(&to.code) {
            Some(from) => resources.push(two_sided(template_code, source, from, destination, to)),
            None => resources.push(one_sided(
                template_code,
                destination,
                to,
                MigratorPosition::New,
            )),
        }
    }
    for from in &source.resources {
        if destination.resource(&from.code).is_none() {
            resources.push(one_sided(
                template_code,
                source,
                from,
                MigratorPosition::Obsolete,
            ));
        }
    }
    resources
}
