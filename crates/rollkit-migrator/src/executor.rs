//! ---
//! rk_section: "04-migration-execution"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Migrator contract, collectors, and the release sandbox boundary."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use indexmap::IndexMap;
use rollkit_model::MigrationLogRecord;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::collector::{display_name, guard, Collector, CollectorContext};
use crate::contract::Migrator;

/// Requested transitions for one migrator type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigratorCommand {
    /// Registry key of the migrator.
    pub type_name: String,
    /// `resource code -> desired point`, executed in insertion order.
    pub resources: IndexMap<String, String>,
}

impl MigratorCommand {
    /// Empty command for a migrator type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            resources: IndexMap::new(),
        }
    }

    /// Add a transition.
    pub fn with_resource(mut self, code: impl Into<String>, point: impl Into<String>) -> Self {
        self.resources.insert(code.into(), point.into());
        self
    }
}

/// Applies a batch of point transitions, producing exactly one operation record
/// per `(resource, point)` pair of every resolvable command.
#[derive(Debug, Clone, Default)]
pub struct MigrationExecutor {
    commands: Vec<MigratorCommand>,
}

impl MigrationExecutor {
    /// Executor over the given commands.
    pub fn new(commands: Vec<MigratorCommand>) -> Self {
        Self { commands }
    }

    fn run_command(
        migrator: &mut dyn Migrator,
        command: &MigratorCommand,
        context: &mut CollectorContext<'_>,
        records: &mut Vec<MigrationLogRecord>,
    ) {
        let name = display_name(&*migrator, &command.type_name);
        let resources = guard(|| migrator.migratable_resources());
        let points = guard(|| migrator.all_points());

        for (resource_code, desired_point) in &command.resources {
            let mut operation = MigrationLogRecord::operation(&command.type_name, resource_code)
                .with_migrator(&command.type_name, Some(name.clone()));
            operation.destination_point = Some(desired_point.clone());

            let resources = match &resources {
                Ok(resources) => resources,
                Err(failure) => {
                    operation.fail(
                        format!(
                            "Exception while requesting migratable resources: {}",
                            failure.message
                        ),
                        failure.detail.clone(),
                    );
                    records.push(operation);
                    continue;
                }
            };
            let Some(resource) = resources.iter().find(|r| &r.code == resource_code) else {
                operation.fail("Resource is not defined in the migrator", None);
                records.push(operation);
                continue;
            };
            operation.resource_name = Some(resource.name.clone());

            match guard(|| migrator.current_point(resource)) {
                Ok(current) => operation.source_point = current,
                Err(failure) => {
                    operation.fail(
                        format!(
                            "Exception while checking resource current point: {}",
                            failure.message
                        ),
                        failure.detail,
                    );
                    records.push(operation);
                    continue;
                }
            }

            let declared = match &points {
                Ok(points) => points.iter().any(|p| p == desired_point),
                Err(failure) => {
                    operation.fail(
                        format!(
                            "Exception while requesting migration points: {}",
                            failure.message
                        ),
                        failure.detail.clone(),
                    );
                    records.push(operation);
                    continue;
                }
            };
            if !declared {
                operation.fail("Resource cannot migrate to point", None);
                records.push(operation);
                continue;
            }

            match guard(|| migrator.migrate(resource, desired_point)) {
                Ok(lines) => {
                    info!(
                        migrator = %command.type_name,
                        resource = %resource_code,
                        point = %desired_point,
                        "resource migrated"
                    );
                    context.log_lines(lines);
                    operation.finish();
                }
                Err(failure) => operation.fail(
                    format!("Exception while migrating resource: {}", failure.message),
                    failure.detail,
                ),
            }
            records.push(operation);
        }
    }
}

impl Collector for MigrationExecutor {
    type Output = Vec<MigrationLogRecord>;

    fn get_result(&mut self, context: &mut CollectorContext<'_>) -> anyhow::Result<Self::Output> {
        let mut migrators: IndexMap<String, Box<dyn Migrator>> =
            context.migrators().into_iter().collect();
        let mut records = Vec::new();

        for command in &self.commands {
            let Some(migrator) = migrators.get_mut(&command.type_name) else {
                context.record(
                    MigrationLogRecord::error("Migrator is not defined")
                        .with_migrator(command.type_name.clone(), None),
                );
                continue;
            };
            Self::run_command(migrator.as_mut(), command, context, &mut records);
        }
        Ok(records)
    }
}
