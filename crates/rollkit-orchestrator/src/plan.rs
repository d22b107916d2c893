//! ---
//! rk_section: "06-orchestration"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Cluster migration state machine and its command surface."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Turning operator resource requests into executor commands.
//!
//! A request names a resource and the side it should move towards. The
//! reconciled view decides which release's code executes the step and which
//! point it targets; requests are then grouped by executing side, template,
//! and migrator type. A single invalid request declines the whole batch.
use indexmap::IndexMap;
use rollkit_logging::{rk_info, LogContext};
use rollkit_migrator::{MigratorCommand, ReleaseSandbox, SandboxRequest};
use rollkit_model::{
    Configuration, ErrorDescription, MigrationId, MigrationLogRecord, MigrationSide,
    MigrationStateView, MigratorTemplate, ReleaseState,
};
use rollkit_reconcile::ResourceAddress;
use serde::{Deserialize, Serialize};

/// One requested resource transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUpgrade {
    /// Migrator template code.
    pub template_code: String,
    /// Migrator type name within the template.
    pub migrator_type_name: String,
    /// Resource code within the migrator.
    pub resource_code: String,
    /// Side whose point the resource should reach. Ignored outside a migration.
    pub target: MigrationSide,
}

impl ResourceUpgrade {
    /// Request moving a resource towards `target`.
    pub fn new(
        template_code: impl Into<String>,
        migrator_type_name: impl Into<String>,
        resource_code: impl Into<String>,
        target: MigrationSide,
    ) -> Self {
        Self {
            template_code: template_code.into(),
            migrator_type_name: migrator_type_name.into(),
            resource_code: resource_code.into(),
            target,
        }
    }

    /// Address used in error fields.
    pub fn address(&self) -> ResourceAddress {
        ResourceAddress::new(
            self.template_code.clone(),
            self.migrator_type_name.clone(),
            self.resource_code.clone(),
        )
    }
}

/// Executor commands for one migrator template.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplatePlan {
    /// Template definition of the executing release.
    pub template: MigratorTemplate,
    /// Commands keyed by migrator type name, in request order.
    pub commands: IndexMap<String, MigratorCommand>,
}

/// Every template plan executed by one release.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SidePlan {
    templates: IndexMap<String, TemplatePlan>,
}

impl SidePlan {
    /// Add `resource_code → point` to the command of `type_name` under `template`.
    pub fn add(
        &mut self,
        template: &MigratorTemplate,
        type_name: &str,
        resource_code: &str,
        point: &str,
    ) {
        let plan = self
            .templates
            .entry(template.code.clone())
            .or_insert_with(|| TemplatePlan {
                template: template.clone(),
                commands: IndexMap::new(),
            });
        plan.commands
            .entry(type_name.to_owned())
            .or_insert_with(|| MigratorCommand::new(type_name))
            .resources
            .insert(resource_code.to_owned(), point.to_owned());
    }

    /// Template plans in execution order.
    pub fn templates(&self) -> impl Iterator<Item = &TemplatePlan> {
        self.templates.values()
    }

    /// Number of resource transitions.
    pub fn operation_count(&self) -> usize {
        self.templates
            .values()
            .flat_map(|plan| plan.commands.values())
            .map(|command| command.resources.len())
            .sum()
    }

    /// `true` when nothing is planned.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Plans for both releases of a migration. The source plan runs first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationPlan {
    /// Steps executed with the source release's code.
    pub source: SidePlan,
    /// Steps executed with the destination release's code.
    pub destination: SidePlan,
}

impl MigrationPlan {
    fn side_mut(&mut self, side: MigrationSide) -> &mut SidePlan {
        match side {
            MigrationSide::Source => &mut self.source,
            MigrationSide::Destination => &mut self.destination,
        }
    }

    /// Build the plan for `requests` against the reconciled `view`.
    pub fn build(
        view: &MigrationStateView,
        source: &Configuration,
        destination: &Configuration,
        requests: &[ResourceUpgrade],
    ) -> Result<Self, Vec<ErrorDescription>> {
        let mut plan = Self::default();
        let mut errors = Vec::new();

        for request in requests {
            let address = request.address();
            let Some(template) = view.template(&request.template_code) else {
                errors.push(address.error("Migrator template was not found"));
                continue;
            };
            let Some(migrator) = template.migrator(&request.migrator_type_name) else {
                errors.push(address.error("Migrator was not found"));
                continue;
            };
            let Some(resource) = migrator
                .resources
                .iter()
                .find(|resource| resource.code == request.resource_code)
            else {
                errors.push(address.error("Resource was not found"));
                continue;
            };
            let (Some(side), Some(point)) = (
                resource.executor_towards(request.target),
                resource.point_for(request.target),
            ) else {
                errors.push(address.error("Resource can not be migrated"));
                continue;
            };
            let executing = match side {
                MigrationSide::Source => source,
                MigrationSide::Destination => destination,
            };
            let Some(definition) = executing.migrator_template(&request.template_code) else {
                errors.push(address.error("Migrator template was not found"));
                continue;
            };
            plan.side_mut(side)
                .add(definition, &request.migrator_type_name, &request.resource_code, point);
        }

        if errors.is_empty() {
            Ok(plan)
        } else {
            Err(errors)
        }
    }
}

/// Plan bringing resources of the active release to their last defined points.
pub fn build_settle_plan(
    release: &ReleaseState,
    configuration: &Configuration,
    requests: &[ResourceUpgrade],
) -> Result<SidePlan, Vec<ErrorDescription>> {
    let mut plan = SidePlan::default();
    let mut errors = Vec::new();

    for request in requests {
        let address = request.address();
        let Some(template) = release.template(&request.template_code) else {
            errors.push(address.error("Migrator template was not found"));
            continue;
        };
        let Some(migrator) = template.migrator(&request.migrator_type_name) else {
            errors.push(address.error("Migrator was not found"));
            continue;
        };
        let Some(resource) = migrator.resource(&request.resource_code) else {
            errors.push(address.error("Resource was not found"));
            continue;
        };
        let Some(point) = migrator
            .last_defined_point
            .as_deref()
            .filter(|point| resource.current_point.as_deref() != Some(*point))
        else {
            errors.push(address.error("Resource can not be migrated"));
            continue;
        };
        let Some(definition) = configuration.migrator_template(&request.template_code) else {
            errors.push(address.error("Migrator template was not found"));
            continue;
        };
        plan.add(definition, &request.migrator_type_name, &request.resource_code, point);
    }

    if errors.is_empty() {
        Ok(plan)
    } else {
        Err(errors)
    }
}

/// Run `plan` with `configuration`'s code, one template at a time.
///
/// Every returned record carries the migration id, the executing configuration,
/// and the template identity. Collector errors are reported as
/// `Error while executing migration: ...` records.
pub async fn execute(
    sandbox: &dyn ReleaseSandbox,
    plan: &SidePlan,
    configuration: &Configuration,
    migration_id: Option<MigrationId>,
) -> Vec<MigrationLogRecord> {
    let mut records = Vec::new();

    for step in plan.templates() {
        let template = &step.template;
        let mut ctx = LogContext::new()
            .with_configuration(configuration.id)
            .with_template(&template.code);
        if let Some(id) = migration_id {
            ctx = ctx.with_migration(id);
        }
        let request = SandboxRequest::migrate(
            template.configuration.clone(),
            step.commands.values().cloned().collect(),
        );
        let (operations, errors) = sandbox
            .run(template.executor.as_deref(), request)
            .await
            .into_operations();
        rk_info!(
            context = ctx,
            "executed {} operation(s) with {} collector error(s)",
            operations.len(),
            errors.len()
        );

        for mut record in operations {
            record.enrich(migration_id, configuration.id, &template.code, &template.name);
            records.push(record);
        }
        for mut error in errors {
            let message = error.error_message.take().unwrap_or_default();
            error.error_message = Some(format!("Error while executing migration: {message}"));
            error.enrich(migration_id, configuration.id, &template.code, &template.name);
            records.push(error);
        }
    }

    records
}
