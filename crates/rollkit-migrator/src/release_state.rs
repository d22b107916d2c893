//! ---
//! rk_section: "04-migration-execution"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Migrator contract, collectors, and the release sandbox boundary."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use rollkit_model::{MigrationLogRecord, MigratorReleaseState, ResourceReleaseState};

use crate::collector::{display_name, guard, CallFailure, Collector, CollectorContext};

/// Snapshot of every resolvable migrator of one release: resources, declared
/// points, and live current points.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReleaseStateCollector;

impl ReleaseStateCollector {
    fn failure(
        message: &str,
        failure: CallFailure,
        type_name: &str,
        name: &str,
    ) -> MigrationLogRecord {
        let mut record = MigrationLogRecord::error(format!("{message}: {}", failure.message))
            .with_migrator(type_name, Some(name.to_owned()));
        record.error_stack_trace = failure.detail;
        record
    }
}

impl Collector for ReleaseStateCollector {
    type Output = Vec<MigratorReleaseState>;

    fn get_result(&mut self, context: &mut CollectorContext<'_>) -> anyhow::Result<Self::Output> {
        let mut states = Vec::new();
        for (type_name, migrator) in context.migrators() {
            let name = display_name(migrator.as_ref(), &type_name);

            let resources = match guard(|| migrator.migratable_resources()) {
                Ok(resources) => resources,
                Err(failure) => {
                    context.record(Self::failure(
                        "Error on requesting migratable resources",
                        failure,
                        &type_name,
                        &name,
                    ));
                    continue;
                }
            };

            let points = match guard(|| migrator.all_points()) {
                Ok(points) => points,
                Err(failure) => {
                    context.record(Self::failure(
                        "Error on requesting available migration points",
                        failure,
                        &type_name,
                        &name,
                    ));
                    continue;
                }
            };

            let mut resource_states = Vec::with_capacity(resources.len());
            for resource in resources {
                match guard(|| migrator.current_point(&resource)) {
                    Ok(current_point) => resource_states.push(ResourceReleaseState {
                        code: resource.code,
                        name: resource.name,
                        current_point,
                    }),
                    Err(failure) => {
                        let record = Self::failure(
                            "Error on requesting resource current point",
                            failure,
                            &type_name,
                            &name,
                        )
                        .with_resource(resource.code, Some(resource.name));
                        context.record(record);
                    }
                }
            }

            states.push(MigratorReleaseState {
                type_name,
                name,
                last_defined_point: points.last().cloned(),
                migration_points: points,
                resources: resource_states,
            });
        }
        Ok(states)
    }
}
