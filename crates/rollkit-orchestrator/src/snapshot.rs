//! ---
//! rk_section: "06-orchestration"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Cluster migration state machine and its command surface."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Release snapshots gathered through the sandbox.
use rollkit_logging::{rk_debug, rk_warn, LogContext};
use rollkit_migrator::{ReleaseSandbox, SandboxRequest};
use rollkit_model::{
    Configuration, MigrationId, MigratorTemplate, MigratorTemplateReleaseState, ReleaseState,
};

/// Migrator templates in collection order: highest priority first, ties in declaration order.
pub fn templates_by_priority(configuration: &Configuration) -> Vec<&MigratorTemplate> {
    let mut templates: Vec<&MigratorTemplate> =
        configuration.settings.migrator_templates.iter().collect();
    templates.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    templates
}

/// Snapshot every migrator template of `configuration` using that release's code.
///
/// Templates run one at a time. A template whose collector reported any error
/// is left out of the snapshot and its errors are kept on the result, enriched
/// with the template identity and `migration_id`.
pub async fn collect_release_state(
    sandbox: &dyn ReleaseSandbox,
    configuration: &Configuration,
    migration_id: Option<MigrationId>,
) -> ReleaseState {
    let mut state = ReleaseState {
        configuration_id: configuration.id,
        templates: Vec::new(),
        errors: Vec::new(),
    };

    for template in templates_by_priority(configuration) {
        let ctx = LogContext::new()
            .with_configuration(configuration.id)
            .with_template(&template.code);
        let response = sandbox
            .run(
                template.executor.as_deref(),
                SandboxRequest::release_state(template.configuration.clone()),
            )
            .await;
        for line in &response.logs {
            rk_debug!(context = ctx, "{}", line);
        }

        let (migrators, errors) = response.into_release_state();
        match migrators {
            Some(migrators) if errors.is_empty() => {
                state.templates.push(MigratorTemplateReleaseState {
                    code: template.code.clone(),
                    name: template.name.clone(),
                    migrators,
                });
            }
            _ => {
                rk_warn!(
                    context = ctx,
                    "release state of template skipped with {} error(s)",
                    errors.len()
                );
                state.errors.extend(errors.into_iter().map(|mut error| {
                    error.enrich(migration_id, configuration.id, &template.code, &template.name);
                    error
                }));
            }
        }
    }

    state
}
