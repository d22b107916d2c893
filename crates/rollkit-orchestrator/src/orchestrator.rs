//! ---
//! rk_section: "06-orchestration"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Cluster migration state machine and its command surface."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! The cluster migration state machine.
//!
//! Mutating commands hold the write half of one lock for their whole run, so
//! they are applied one at a time. Queries take the read half. Each command
//! works on a copy of the persisted records and swaps it in only after the
//! store accepted it.
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rollkit_logging::{log_system_event, rk_warn, LogContext, SystemEventOutcome};
use rollkit_migrator::ReleaseSandbox;
use rollkit_model::{
    Configuration, ConfigurationId, ConfigurationSettings, ConfigurationState, ErrorDescription,
    Migration, MigrationDirection, MigrationId, MigrationLogRecord, MigrationSide,
    MigrationState,
};
use rollkit_persistence::{AuditLog, ClusterData, ClusterStore};
use rollkit_reconcile::finish_blockers;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::context::RequestContext;
use crate::nodes::NodeUpdater;
use crate::plan::{self, build_settle_plan, MigrationPlan, ResourceUpgrade};
use crate::snapshot::collect_release_state;
use crate::state::{touched_resources, ClusterResourceState};
use crate::validation::check_configuration;
use crate::{OrchestratorError, Result};

struct Cluster {
    data: ClusterData,
    resources: ClusterResourceState,
}

/// Single writer of configuration and migration state.
pub struct MigrationOrchestrator {
    store: Arc<dyn ClusterStore>,
    sandbox: Arc<dyn ReleaseSandbox>,
    nodes: Arc<dyn NodeUpdater>,
    audit: Option<Mutex<AuditLog>>,
    cluster: RwLock<Cluster>,
}

impl MigrationOrchestrator {
    /// Load the persisted cluster and compute its resource state.
    pub async fn open(
        store: Arc<dyn ClusterStore>,
        sandbox: Arc<dyn ReleaseSandbox>,
        nodes: Arc<dyn NodeUpdater>,
    ) -> Result<Self> {
        let data = store.load()?;
        let resources = evaluate(sandbox.as_ref(), &data).await?;
        info!(
            configurations = data.configurations.len(),
            migrations = data.migrations.len(),
            "orchestrator started"
        );
        Ok(Self {
            store,
            sandbox,
            nodes,
            audit: None,
            cluster: RwLock::new(Cluster { data, resources }),
        })
    }

    /// Record every accepted command in `log`.
    pub fn with_audit_log(mut self, log: AuditLog) -> Self {
        self.audit = Some(Mutex::new(log));
        self
    }

    /// Current computed resource state.
    pub async fn resource_state(&self) -> ClusterResourceState {
        self.cluster.read().await.resources.clone()
    }

    /// Every configuration in creation order.
    pub async fn configurations(&self) -> Vec<Configuration> {
        self.cluster.read().await.data.configurations.clone()
    }

    /// One configuration.
    pub async fn configuration(&self, id: ConfigurationId) -> Result<Configuration> {
        let cluster = self.cluster.read().await;
        configuration(&cluster.data, id).cloned()
    }

    /// Every migration in creation order.
    pub async fn migrations(&self) -> Vec<Migration> {
        self.cluster.read().await.data.migrations.clone()
    }

    /// The migration in progress.
    pub async fn active_migration(&self) -> Option<Migration> {
        self.cluster.read().await.data.active_migration().cloned()
    }

    /// Log records of a migration, or of resource updates made outside one.
    pub async fn migration_log(&self, migration_id: Option<MigrationId>) -> Vec<MigrationLogRecord> {
        let cluster = self.cluster.read().await;
        cluster
            .data
            .migration_log(migration_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Query every release again and recompute the resource state.
    pub async fn recheck(&self, ctx: &RequestContext) -> Result<ClusterResourceState> {
        let mut cluster = self.cluster.write().await;
        self.refresh(&mut cluster).await?;
        debug!(actor = %ctx.actor, "resource state rechecked");
        Ok(cluster.resources.clone())
    }

    /// Author a new draft configuration.
    pub async fn create_configuration(
        &self,
        ctx: &RequestContext,
        name: &str,
        settings: ConfigurationSettings,
    ) -> Result<ConfigurationId> {
        let mut cluster = self.cluster.write().await;
        let mut data = cluster.data.clone();
        let id = data.add_configuration(Configuration::draft(0, name, settings));
        self.save(&mut cluster, data)?;
        self.audit(ctx, "configuration.created", json!({ "configuration": id, "name": name }))?;
        info!(configuration = id, name, "configuration created");
        Ok(id)
    }

    /// Replace the settings of a draft.
    pub async fn update_draft(
        &self,
        ctx: &RequestContext,
        id: ConfigurationId,
        settings: ConfigurationSettings,
    ) -> Result<()> {
        let mut cluster = self.cluster.write().await;
        let mut data = cluster.data.clone();
        let draft = configuration_mut(&mut data, id)?;
        if !draft.is_mutable() {
            return Err(OrchestratorError::declined(
                "Only draft configurations can be edited",
            ));
        }
        draft.settings = settings;
        self.save(&mut cluster, data)?;
        self.audit(ctx, "configuration.updated", json!({ "configuration": id }))
    }

    /// Validate a draft. Changes nothing.
    pub async fn configuration_check(
        &self,
        ctx: &RequestContext,
        id: ConfigurationId,
    ) -> Result<Vec<ErrorDescription>> {
        let cluster = self.cluster.read().await;
        let draft = configuration(&cluster.data, id)?;
        if draft.state != ConfigurationState::Draft {
            return Err(OrchestratorError::declined(
                "Only draft configurations can be checked",
            ));
        }
        let errors = check_configuration(draft);
        debug!(actor = %ctx.actor, configuration = id, errors = errors.len(), "configuration checked");
        Ok(errors)
    }

    /// Freeze a valid draft as the next release candidate.
    pub async fn set_ready(&self, ctx: &RequestContext, id: ConfigurationId) -> Result<()> {
        let mut cluster = self.cluster.write().await;
        let draft = configuration(&cluster.data, id)?;
        if draft.state != ConfigurationState::Draft {
            return Err(OrchestratorError::declined(
                "Only draft configurations can be made ready",
            ));
        }
        let errors = check_configuration(draft);
        if !errors.is_empty() {
            return Err(OrchestratorError::Declined { errors });
        }
        if cluster
            .data
            .configuration_in(ConfigurationState::Ready)
            .is_some()
        {
            return Err(OrchestratorError::declined(
                "There is already a ready configuration",
            ));
        }

        let mut data = cluster.data.clone();
        configuration_mut(&mut data, id)?.state = ConfigurationState::Ready;
        self.save(&mut cluster, data)?;
        self.audit(ctx, "configuration.ready", json!({ "configuration": id }))?;
        log_system_event(
            Some(&LogContext::new().with_configuration(id)),
            "configuration.ready",
            "configuration is ready",
            SystemEventOutcome::Success,
        );
        Ok(())
    }

    /// Withdraw a ready configuration.
    pub async fn set_obsolete(&self, ctx: &RequestContext, id: ConfigurationId) -> Result<()> {
        let mut cluster = self.cluster.write().await;
        if configuration(&cluster.data, id)?.state != ConfigurationState::Ready {
            return Err(OrchestratorError::declined(
                "Only ready configurations can be made obsolete",
            ));
        }
        if cluster
            .data
            .active_migration()
            .is_some_and(|migration| migration.to_configuration_id == id)
        {
            return Err(OrchestratorError::declined(
                "The configuration is used by the active migration",
            ));
        }

        let mut data = cluster.data.clone();
        let retired = configuration_mut(&mut data, id)?;
        retired.state = ConfigurationState::Obsolete;
        retired.finished = Some(Utc::now());
        self.save(&mut cluster, data)?;
        self.audit(ctx, "configuration.obsolete", json!({ "configuration": id }))
    }

    /// Mark the active configuration as known-good, or clear the mark.
    pub async fn set_stable(
        &self,
        ctx: &RequestContext,
        id: ConfigurationId,
        is_stable: bool,
    ) -> Result<()> {
        let mut cluster = self.cluster.write().await;
        let current = configuration(&cluster.data, id)?;
        if current.state != ConfigurationState::Active {
            return Err(OrchestratorError::declined(
                "Only active configurations can be marked stable",
            ));
        }
        if current.is_stable == is_stable {
            return Err(OrchestratorError::declined_field(
                "isStable",
                "The value is not changed",
            ));
        }

        let mut data = cluster.data.clone();
        configuration_mut(&mut data, id)?.is_stable = is_stable;
        self.save(&mut cluster, data)?;
        self.audit(
            ctx,
            "configuration.stable",
            json!({ "configuration": id, "is_stable": is_stable }),
        )
    }

    /// Activate the first release of a cluster that has none.
    pub async fn bootstrap(&self, ctx: &RequestContext, id: ConfigurationId) -> Result<()> {
        let mut cluster = self.cluster.write().await;
        if cluster.data.active_configuration().is_some() {
            return Err(OrchestratorError::declined(
                "There is already an active configuration",
            ));
        }
        let release = configuration(&cluster.data, id)?.clone();
        if release.state != ConfigurationState::Ready {
            return Err(OrchestratorError::declined(
                "Only ready configurations can be activated",
            ));
        }

        self.update_nodes(&mut cluster, &release, None).await?;
        let mut data = cluster.data.clone();
        let activated = configuration_mut(&mut data, id)?;
        activated.state = ConfigurationState::Active;
        activated.started = Some(Utc::now());
        self.save(&mut cluster, data)?;
        self.refresh(&mut cluster).await?;
        self.audit(ctx, "cluster.bootstrapped", json!({ "configuration": id }))?;
        log_system_event(
            Some(&LogContext::new().with_configuration(id)),
            "cluster.bootstrapped",
            "configuration activated",
            SystemEventOutcome::Success,
        );
        Ok(())
    }

    /// Start a migration from the active configuration to `id`.
    pub async fn update_cluster(&self, ctx: &RequestContext, id: ConfigurationId) -> Result<MigrationId> {
        let mut cluster = self.cluster.write().await;
        if cluster.data.active_migration().is_some() {
            return Err(OrchestratorError::declined(
                "There is already a pending migration",
            ));
        }
        let (Some(_), Some(active)) = (
            cluster.resources.release_state.as_ref(),
            cluster.data.active_configuration(),
        ) else {
            return Err(OrchestratorError::declined("Resources state is unknown"));
        };
        if !cluster.resources.can_create_migration {
            return Err(OrchestratorError::declined(
                "The migration cannot be created at this time",
            ));
        }
        if active.id == id {
            return Err(OrchestratorError::declined("This release is already set"));
        }
        let from = active.id;
        if configuration(&cluster.data, id)?.state == ConfigurationState::Draft {
            return Err(OrchestratorError::declined(
                "The cluster cannot be migrated to a draft release",
            ));
        }

        let mut data = cluster.data.clone();
        let migration_id = data.start_migration(from, id).id;
        self.save(&mut cluster, data)?;
        self.refresh(&mut cluster).await?;

        let direction = cluster.resources.direction;
        self.audit(
            ctx,
            "migration.created",
            json!({ "migration": migration_id, "from": from, "to": id, "direction": direction }),
        )?;
        log_system_event(
            Some(&LogContext::new().with_migration(migration_id).with_configuration(id)),
            "migration.created",
            &format!("migration {from} -> {id} created"),
            SystemEventOutcome::Success,
        );
        Ok(migration_id)
    }

    /// Roll the cluster nodes onto the `target` release of the active migration.
    pub async fn nodes_update(&self, ctx: &RequestContext, target: MigrationSide) -> Result<()> {
        let mut cluster = self.cluster.write().await;
        let migration = active_migration(&cluster.data)?;
        let allowed = match target {
            MigrationSide::Source => cluster.resources.can_update_nodes_to_source,
            MigrationSide::Destination => cluster.resources.can_update_nodes_to_destination,
        };
        if !allowed {
            return Err(OrchestratorError::declined(format!(
                "Nodes can not be updated to the {} release at this time",
                side_label(target)
            )));
        }
        let release = configuration(&cluster.data, migration.configuration_id(target))?.clone();

        let mut data = cluster.data.clone();
        set_migration_state(&mut data, MigrationState::NodesUpdating);
        self.save(&mut cluster, data)?;

        self.update_nodes(&mut cluster, &release, Some(migration.id)).await?;

        let mut data = cluster.data.clone();
        switch_nodes(&mut data, &migration, target)?;
        set_migration_state(&mut data, MigrationState::NodesUpdated);
        self.save(&mut cluster, data)?;
        self.refresh(&mut cluster).await?;
        self.audit(
            ctx,
            "migration.nodes_updated",
            json!({ "migration": migration.id, "configuration": release.id }),
        )?;
        log_system_event(
            Some(&LogContext::new().with_migration(migration.id).with_configuration(release.id)),
            "migration.nodes_updated",
            &format!("nodes run the {} release", side_label(target)),
            SystemEventOutcome::Success,
        );
        Ok(())
    }

    /// Migrate the requested resources.
    ///
    /// During a migration each request moves a resource towards its `target`
    /// side. Without one, requested resources of the active release are brought
    /// to their last defined points. The returned records were appended to the
    /// migration log.
    pub async fn resource_update(
        &self,
        ctx: &RequestContext,
        requests: &[ResourceUpgrade],
    ) -> Result<Vec<MigrationLogRecord>> {
        if requests.is_empty() {
            return Err(OrchestratorError::declined("No resources were requested"));
        }
        let mut cluster = self.cluster.write().await;
        if !cluster.resources.can_migrate_resources {
            return Err(OrchestratorError::declined(
                "The resources can not be migrated at this time",
            ));
        }
        let records = match cluster.data.active_migration().cloned() {
            Some(migration) => self.migrate_resources(&mut cluster, migration, requests).await?,
            None => self.settle_resources(&mut cluster, requests).await?,
        };

        let failed = records.iter().filter(|record| record.is_error()).count();
        self.audit(
            ctx,
            "resources.updated",
            json!({
                "migration": records.first().and_then(|record| record.migration_id),
                "operations": records.len(),
                "errors": failed,
            }),
        )?;
        log_system_event(
            None,
            "resources.updated",
            &format!("{} record(s), {failed} error(s)", records.len()),
            if failed == 0 {
                SystemEventOutcome::Success
            } else {
                SystemEventOutcome::Fault
            },
        );
        Ok(records)
    }

    async fn migrate_resources(
        &self,
        cluster: &mut Cluster,
        migration: Migration,
        requests: &[ResourceUpgrade],
    ) -> Result<Vec<MigrationLogRecord>> {
        let source = configuration(&cluster.data, migration.from_configuration_id)?.clone();
        let destination = configuration(&cluster.data, migration.to_configuration_id)?.clone();
        let view = cluster
            .resources
            .migration_state
            .as_ref()
            .ok_or_else(|| OrchestratorError::declined("Resources state is unknown"))?;
        let plan = MigrationPlan::build(view, &source, &destination, requests)
            .map_err(|errors| OrchestratorError::Declined { errors })?;

        let mut data = cluster.data.clone();
        set_migration_state(&mut data, MigrationState::ResourcesUpdating);
        self.save(cluster, data)?;

        let sandbox = self.sandbox.as_ref();
        let mut records = plan::execute(sandbox, &plan.source, &source, Some(migration.id)).await;
        records.extend(plan::execute(sandbox, &plan.destination, &destination, Some(migration.id)).await);

        let mut data = cluster.data.clone();
        data.append_log(records.iter().cloned());
        set_migration_state(&mut data, MigrationState::ResourcesUpdated);
        self.save(cluster, data)?;
        self.refresh(cluster).await?;
        Ok(records)
    }

    async fn settle_resources(
        &self,
        cluster: &mut Cluster,
        requests: &[ResourceUpgrade],
    ) -> Result<Vec<MigrationLogRecord>> {
        let active = cluster
            .data
            .active_configuration()
            .cloned()
            .ok_or_else(|| OrchestratorError::declined("Resources state is unknown"))?;
        let release = cluster
            .resources
            .release_state
            .as_ref()
            .ok_or_else(|| OrchestratorError::declined("Resources state is unknown"))?;
        let plan = build_settle_plan(release, &active, requests)
            .map_err(|errors| OrchestratorError::Declined { errors })?;

        let records = plan::execute(self.sandbox.as_ref(), &plan, &active, None).await;
        let mut data = cluster.data.clone();
        data.append_log(records.iter().cloned());
        self.save(cluster, data)?;
        self.refresh(cluster).await?;
        Ok(records)
    }

    /// Complete the active migration: the destination becomes the active release.
    pub async fn finish(&self, ctx: &RequestContext) -> Result<()> {
        let mut cluster = self.cluster.write().await;
        let migration = active_migration(&cluster.data)?;
        if cluster.resources.direction == Some(MigrationDirection::Undefined) {
            return Err(OrchestratorError::declined(
                "The migration is broken and can only be cancelled",
            ));
        }
        if !cluster.resources.is_complete() {
            return Err(OrchestratorError::declined("Resources state is unknown"));
        }
        let blockers = cluster
            .resources
            .migration_state
            .as_ref()
            .map(finish_blockers)
            .unwrap_or_default();
        if !blockers.is_empty() {
            return Err(OrchestratorError::Declined { errors: blockers });
        }
        if !cluster.resources.can_finish_migration {
            return Err(OrchestratorError::declined(
                "The migration cannot be finished at this time",
            ));
        }

        let destination = configuration(&cluster.data, migration.to_configuration_id)?.clone();
        let mut data = cluster.data.clone();
        if destination.state != ConfigurationState::Active {
            self.update_nodes(&mut cluster, &destination, Some(migration.id)).await?;
            switch_nodes(&mut data, &migration, MigrationSide::Destination)?;
        }
        configuration_mut(&mut data, destination.id)?.finished = None;
        close_migration(&mut data, MigrationState::Finished);
        self.save(&mut cluster, data)?;
        self.refresh(&mut cluster).await?;

        self.audit(ctx, "migration.finished", json!({ "migration": migration.id }))?;
        log_system_event(
            Some(&LogContext::new().with_migration(migration.id).with_configuration(destination.id)),
            "migration.finished",
            "destination release is active",
            SystemEventOutcome::Success,
        );
        Ok(())
    }

    /// Abandon the active migration: the source becomes the active release again.
    pub async fn cancel(&self, ctx: &RequestContext) -> Result<()> {
        let mut cluster = self.cluster.write().await;
        let migration = active_migration(&cluster.data)?;
        let touched = touched_resources(cluster.data.migration_log(Some(migration.id)));
        let blockers = cluster.resources.cancel_blockers(&touched);
        if !blockers.is_empty() {
            return Err(OrchestratorError::Declined { errors: blockers });
        }

        let source = configuration(&cluster.data, migration.from_configuration_id)?.clone();
        let mut data = cluster.data.clone();
        if source.state != ConfigurationState::Active {
            self.update_nodes(&mut cluster, &source, Some(migration.id)).await?;
            switch_nodes(&mut data, &migration, MigrationSide::Source)?;
        }
        close_migration(&mut data, MigrationState::Cancelled);
        self.save(&mut cluster, data)?;
        self.refresh(&mut cluster).await?;

        self.audit(
            ctx,
            "migration.cancelled",
            json!({ "migration": migration.id, "touched": touched.len() }),
        )?;
        log_system_event(
            Some(&LogContext::new().with_migration(migration.id).with_configuration(source.id)),
            "migration.cancelled",
            "source release is active",
            SystemEventOutcome::Success,
        );
        Ok(())
    }

    fn save(&self, cluster: &mut Cluster, data: ClusterData) -> Result<()> {
        self.store.persist(&data)?;
        cluster.data = data;
        Ok(())
    }

    async fn refresh(&self, cluster: &mut Cluster) -> Result<()> {
        let mut resources = evaluate(self.sandbox.as_ref(), &cluster.data).await?;

        // The direction is fixed by the first complete snapshot of a migration.
        if resources.is_complete() {
            let mut data = cluster.data.clone();
            let pinned = match (resources.direction, data.active_migration_mut()) {
                (Some(direction), Some(migration)) if migration.direction.is_none() => {
                    migration.direction = Some(direction);
                    resources.migration = Some(migration.clone());
                    true
                }
                _ => false,
            };
            if pinned {
                self.save(cluster, data)?;
            }
        }

        cluster.resources = resources;
        Ok(())
    }

    /// Restart the nodes onto `release`. A failure is appended to the log of
    /// `migration` (or the idle log) before it is returned.
    async fn update_nodes(
        &self,
        cluster: &mut Cluster,
        release: &Configuration,
        migration: Option<MigrationId>,
    ) -> Result<()> {
        let Err(error) = self.nodes.update_nodes(release).await else {
            return Ok(());
        };
        let message = error.to_string();
        let mut ctx = LogContext::new().with_configuration(release.id);
        if let Some(id) = migration {
            ctx = ctx.with_migration(id);
        }
        log_system_event(Some(&ctx), "nodes.update", &message, SystemEventOutcome::Fault);

        let mut record = MigrationLogRecord::error(format!("Error while updating nodes: {message}"));
        record.migration_id = migration;
        record.configuration_id = Some(release.id);
        let mut data = cluster.data.clone();
        data.append_log([record]);
        self.save(cluster, data)?;
        Err(OrchestratorError::NodeUpdate(message))
    }

    fn audit(&self, ctx: &RequestContext, action: &str, mut metadata: serde_json::Value) -> Result<()> {
        let Some(log) = &self.audit else {
            return Ok(());
        };
        if let (Some(request_id), Some(fields)) = (&ctx.request_id, metadata.as_object_mut()) {
            fields.insert("request_id".to_owned(), json!(request_id));
        }
        log.lock().append(&ctx.actor, action, metadata)?;
        Ok(())
    }
}

async fn evaluate(sandbox: &dyn ReleaseSandbox, data: &ClusterData) -> Result<ClusterResourceState> {
    let Some(migration) = data.active_migration() else {
        let release = match data.active_configuration() {
            Some(active) => Some(collect_release_state(sandbox, active, None).await),
            None => None,
        };
        return Ok(ClusterResourceState::idle(release));
    };

    let source = data.configuration(migration.from_configuration_id)?;
    let destination = data.configuration(migration.to_configuration_id)?;
    let source_state = collect_release_state(sandbox, source, Some(migration.id)).await;
    let destination_state = collect_release_state(sandbox, destination, Some(migration.id)).await;
    let touched = touched_resources(data.migration_log(Some(migration.id)));
    let active_side = if destination.state == ConfigurationState::Active {
        MigrationSide::Destination
    } else {
        MigrationSide::Source
    };

    let state = ClusterResourceState::migrating(
        migration,
        source_state,
        destination_state,
        active_side,
        &touched,
    );
    if !state.is_complete() {
        rk_warn!(
            context = LogContext::new().with_migration(migration.id),
            "resource state computed from incomplete snapshots ({} errors)",
            state.errors.len()
        );
    }
    Ok(state)
}

/// Flip configuration states after the nodes moved onto `target`.
///
/// Moving forward retires the source. Moving back returns the destination to
/// `Ready`, or to `Obsolete` when it had been retired before or another
/// release took the ready slot meanwhile.
fn switch_nodes(data: &mut ClusterData, migration: &Migration, target: MigrationSide) -> Result<()> {
    let now = Utc::now();
    let retiring_id = migration.configuration_id(target.opposite());
    let ready_elsewhere = data
        .configurations
        .iter()
        .any(|c| c.state == ConfigurationState::Ready && c.id != retiring_id);

    let retiring = configuration_mut(data, retiring_id)?;
    match target {
        MigrationSide::Destination => {
            retiring.state = ConfigurationState::Obsolete;
            retiring.finished = Some(now);
        }
        MigrationSide::Source => {
            retiring.state = if retiring.finished.is_some() || ready_elsewhere {
                ConfigurationState::Obsolete
            } else {
                ConfigurationState::Ready
            };
        }
    }

    let activated = configuration_mut(data, migration.configuration_id(target))?;
    activated.state = ConfigurationState::Active;
    if activated.started.is_none() {
        activated.started = Some(now);
    }
    if target == MigrationSide::Source {
        activated.finished = None;
    }
    Ok(())
}

fn set_migration_state(data: &mut ClusterData, state: MigrationState) {
    if let Some(migration) = data.active_migration_mut() {
        migration.state = state;
    }
}

fn close_migration(data: &mut ClusterData, state: MigrationState) {
    if let Some(migration) = data.active_migration_mut() {
        migration.close(state);
    }
}

fn active_migration(data: &ClusterData) -> Result<Migration> {
    data.active_migration()
        .cloned()
        .ok_or_else(|| OrchestratorError::declined("There is no active migration"))
}

fn configuration(data: &ClusterData, id: ConfigurationId) -> Result<&Configuration> {
    data.configuration(id)
        .map_err(|_| OrchestratorError::NotFound(id))
}

fn configuration_mut(data: &mut ClusterData, id: ConfigurationId) -> Result<&mut Configuration> {
    data.configuration_mut(id)
        .map_err(|_| OrchestratorError::NotFound(id))
}

fn side_label(side: MigrationSide) -> &'static str {
    match side {
        MigrationSide::Source => "source",
        MigrationSide::Destination => "destination",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollkit_migrator::InProcessSandbox;
    use rollkit_persistence::InMemoryStore;
    use std::time::Duration;

    use crate::nodes::RecordingNodeUpdater;

    async fn orchestrator(data: ClusterData) -> MigrationOrchestrator {
        MigrationOrchestrator::open(
            Arc::new(InMemoryStore::new(data)),
            Arc::new(InProcessSandbox::builtin(Duration::from_secs(5))),
            Arc::new(RecordingNodeUpdater::new(vec!["node-1".into()])),
        )
        .await
        .unwrap()
    }

    fn release(id: ConfigurationId, state: ConfigurationState) -> Configuration {
        let mut configuration = Configuration::draft(id, format!("r{id}"), ConfigurationSettings::default());
        configuration.state = state;
        configuration
    }

    #[tokio::test]
    async fn set_stable_requires_a_change() {
        let data = ClusterData {
            configurations: vec![release(1, ConfigurationState::Active)],
            ..ClusterData::default()
        };
        let orchestrator = orchestrator(data).await;
        let ctx = RequestContext::new("operator");

        orchestrator.set_stable(&ctx, 1, true).await.unwrap();
        let error = orchestrator.set_stable(&ctx, 1, true).await.unwrap_err();
        assert_eq!(
            error.errors(),
            &[ErrorDescription::new("isStable", "The value is not changed")]
        );
        assert!(orchestrator.configuration(1).await.unwrap().is_stable);
    }

    #[tokio::test]
    async fn unknown_configuration_is_not_found() {
        let orchestrator = orchestrator(ClusterData::default()).await;
        let error = orchestrator
            .set_ready(&RequestContext::system(), 42)
            .await
            .unwrap_err();
        assert!(matches!(error, OrchestratorError::NotFound(42)));
    }

    #[tokio::test]
    async fn only_ready_configurations_become_obsolete() {
        let data = ClusterData {
            configurations: vec![
                release(1, ConfigurationState::Ready),
                release(2, ConfigurationState::Obsolete),
            ],
            ..ClusterData::default()
        };
        let orchestrator = orchestrator(data).await;
        let ctx = RequestContext::system();

        let error = orchestrator.set_obsolete(&ctx, 2).await.unwrap_err();
        assert_eq!(
            error.errors()[0].message,
            "Only ready configurations can be made obsolete"
        );
        orchestrator.set_obsolete(&ctx, 1).await.unwrap();
        let retired = orchestrator.configuration(1).await.unwrap();
        assert_eq!(retired.state, ConfigurationState::Obsolete);
        assert!(retired.finished.is_some());
    }

    #[tokio::test]
    async fn update_cluster_without_active_release_is_declined() {
        let data = ClusterData {
            configurations: vec![release(1, ConfigurationState::Ready)],
            ..ClusterData::default()
        };
        let orchestrator = orchestrator(data).await;
        let error = orchestrator
            .update_cluster(&RequestContext::system(), 1)
            .await
            .unwrap_err();
        assert_eq!(error.errors()[0].message, "Resources state is unknown");
        assert!(orchestrator.migrations().await.is_empty());
    }

    #[tokio::test]
    async fn update_cluster_checks_run_in_order() {
        let data = ClusterData {
            configurations: vec![
                release(1, ConfigurationState::Active),
                release(2, ConfigurationState::Draft),
            ],
            ..ClusterData::default()
        };
        let orchestrator = orchestrator(data).await;
        let ctx = RequestContext::system();
        let state = orchestrator.resource_state().await;
        assert!(state.can_create_migration);

        let same = orchestrator.update_cluster(&ctx, 1).await.unwrap_err();
        assert_eq!(same.errors()[0].message, "This release is already set");
        let missing = orchestrator.update_cluster(&ctx, 9).await.unwrap_err();
        assert!(matches!(missing, OrchestratorError::NotFound(9)));
        let draft = orchestrator.update_cluster(&ctx, 2).await.unwrap_err();
        assert_eq!(
            draft.errors()[0].message,
            "The cluster cannot be migrated to a draft release"
        );
    }

    #[tokio::test]
    async fn switching_back_restores_the_ready_slot() {
        let mut data = ClusterData {
            configurations: vec![
                release(1, ConfigurationState::Active),
                release(2, ConfigurationState::Ready),
            ],
            ..ClusterData::default()
        };
        let migration = data.start_migration(1, 2).clone();

        switch_nodes(&mut data, &migration, MigrationSide::Destination).unwrap();
        assert_eq!(data.configuration(1).unwrap().state, ConfigurationState::Obsolete);
        assert_eq!(data.configuration(2).unwrap().state, ConfigurationState::Active);

        switch_nodes(&mut data, &migration, MigrationSide::Source).unwrap();
        assert_eq!(data.configuration(1).unwrap().state, ConfigurationState::Active);
        assert!(data.configuration(1).unwrap().finished.is_none());
        assert_eq!(data.configuration(2).unwrap().state, ConfigurationState::Ready);
    }
}
