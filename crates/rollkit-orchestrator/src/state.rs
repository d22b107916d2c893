//! ---
//! rk_section: "06-orchestration"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Cluster migration state machine and its command surface."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Operator-facing view of the cluster's resources and the actions open to them.
use rollkit_model::{
    ErrorDescription, Migration, MigrationDirection, MigrationLogRecord, MigrationLogRecordType,
    MigrationSide, MigrationStateView, MigrationStep, ReleaseState,
};
use rollkit_reconcile::{
    cancel_blockers, is_migratable, is_settled, migration_direction, reconcile,
    MigrationCapabilities, ResourceAddress, UNKNOWN_STATE,
};
use serde::{Deserialize, Serialize};

/// Computed resource state of the cluster. Recomputed after every command; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterResourceState {
    /// The active migration, if any.
    pub migration: Option<Migration>,
    /// Direction of the active migration.
    pub direction: Option<MigrationDirection>,
    /// Release the nodes currently run during a migration.
    pub active_side: Option<MigrationSide>,
    /// Snapshot of the active release while no migration runs.
    pub release_state: Option<ReleaseState>,
    /// Source snapshot during a migration.
    pub source_state: Option<ReleaseState>,
    /// Destination snapshot during a migration.
    pub destination_state: Option<ReleaseState>,
    /// Reconciled view during a migration.
    pub migration_state: Option<MigrationStateView>,
    /// A migration may be created.
    pub can_create_migration: bool,
    /// Resource updates are accepted.
    pub can_migrate_resources: bool,
    /// Nodes may be rolled back onto the source release.
    pub can_update_nodes_to_source: bool,
    /// Nodes may be rolled onto the destination release.
    pub can_update_nodes_to_destination: bool,
    /// The migration may be finished.
    pub can_finish_migration: bool,
    /// The migration may be cancelled.
    pub can_cancel_migration: bool,
    /// Step plan of the active migration.
    pub steps: Vec<MigrationStep>,
    /// Step the active migration is at.
    pub current_step: Option<MigrationStep>,
    /// Snapshot errors, enriched with template identity.
    pub errors: Vec<MigrationLogRecord>,
}

impl ClusterResourceState {
    /// State outside a migration, derived from the active release snapshot.
    pub fn idle(release: Option<ReleaseState>) -> Self {
        let Some(release) = release else {
            return Self::default();
        };
        let clean = release.errors.is_empty();
        let settled = is_settled(&release);
        Self {
            can_create_migration: clean && settled,
            can_migrate_resources: clean && !settled && is_migratable(&release),
            errors: release.errors.clone(),
            release_state: Some(release),
            ..Self::default()
        }
    }

    /// State of an active migration.
    ///
    /// `touched` lists resources already migrated under this migration; they
    /// decide whether cancel is still possible.
    pub fn migrating(
        migration: &Migration,
        source: ReleaseState,
        destination: ReleaseState,
        active_side: MigrationSide,
        touched: &[ResourceAddress],
    ) -> Self {
        let view = reconcile(&source, &destination);
        let direction = migration
            .direction
            .unwrap_or_else(|| migration_direction(&view.templates));
        let capabilities = MigrationCapabilities::derive(direction, view.position, active_side);
        let mut errors = source.errors.clone();
        errors.extend(destination.errors.iter().cloned());
        let clean = errors.is_empty();

        Self {
            migration: Some(migration.clone()),
            direction: Some(direction),
            active_side: Some(active_side),
            can_migrate_resources: clean && capabilities.can_migrate_resources,
            can_update_nodes_to_source: clean && capabilities.can_update_nodes_to_source,
            can_update_nodes_to_destination: clean && capabilities.can_update_nodes_to_destination,
            can_finish_migration: clean && capabilities.can_finish_migration,
            can_cancel_migration: blockers_for_cancel(&view, &errors, touched).is_empty(),
            steps: capabilities.steps,
            current_step: Some(capabilities.current_step),
            errors,
            source_state: Some(source),
            destination_state: Some(destination),
            migration_state: Some(view),
            ..Self::default()
        }
    }

    /// `true` when the snapshots behind this state are complete.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Reasons the active migration cannot be cancelled.
    pub fn cancel_blockers(&self, touched: &[ResourceAddress]) -> Vec<ErrorDescription> {
        self.migration_state
            .as_ref()
            .map(|view| blockers_for_cancel(view, &self.errors, touched))
            .unwrap_or_default()
    }
}

/// Reconciled blockers plus every touched resource a snapshot error names.
fn blockers_for_cancel(
    view: &MigrationStateView,
    errors: &[MigrationLogRecord],
    touched: &[ResourceAddress],
) -> Vec<ErrorDescription> {
    let mut blockers = cancel_blockers(view, touched);
    for address in touched {
        if !errors.iter().any(|error| concerns(error, address)) {
            continue;
        }
        let blocker = address.error(UNKNOWN_STATE);
        if !blockers.iter().any(|known| known.field == blocker.field) {
            blockers.push(blocker);
        }
    }
    blockers
}

// Unset identity fields widen an error to everything below them.
fn concerns(error: &MigrationLogRecord, address: &ResourceAddress) -> bool {
    let matches = |field: &Option<String>, value: &str| field.as_deref().map_or(true, |f| f == value);
    matches(&error.migrator_template_code, &address.template_code)
        && matches(&error.migrator_type_name, &address.migrator_type_name)
        && matches(&error.resource_code, &address.resource_code)
}

/// Resources an executor attempted to move, deduplicated, in log order.
pub fn touched_resources<'a>(
    records: impl IntoIterator<Item = &'a MigrationLogRecord>,
) -> Vec<ResourceAddress> {
    let mut touched: Vec<ResourceAddress> = Vec::new();
    for record in records {
        if record.record_type == MigrationLogRecordType::Error {
            continue;
        }
        let (Some(template), Some(migrator), Some(resource)) = (
            record.migrator_template_code.as_deref(),
            record.migrator_type_name.as_deref(),
            record.resource_code.as_deref(),
        ) else {
            continue;
        };
        let address = ResourceAddress::new(template, migrator, resource);
        if !touched.contains(&address) {
            touched.push(address);
        }
    }
    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollkit_model::{
        MigratorReleaseState, MigratorTemplateReleaseState, ResourceReleaseState,
    };

    fn release(id: u64, points: &[&str], current: Option<&str>) -> ReleaseState {
        ReleaseState {
            configuration_id: id,
            templates: vec![MigratorTemplateReleaseState {
                code: "storage".into(),
                name: "Storage".into(),
                migrators: vec![MigratorReleaseState {
                    type_name: "file-marker".into(),
                    name: "Marker".into(),
                    migration_points: points.iter().map(|p| p.to_string()).collect(),
                    last_defined_point: points.last().map(|p| p.to_string()),
                    resources: vec![ResourceReleaseState {
                        code: "orders".into(),
                        name: "orders".into(),
                        current_point: current.map(str::to_owned),
                    }],
                }],
            }],
            errors: Vec::new(),
        }
    }

    #[test]
    fn settled_release_allows_a_new_migration() {
        let state = ClusterResourceState::idle(Some(release(1, &["v1", "v2"], Some("v2"))));
        assert!(state.can_create_migration);
        assert!(!state.can_migrate_resources);
    }

    #[test]
    fn unsettled_release_must_be_migrated_first() {
        let state = ClusterResourceState::idle(Some(release(1, &["v1", "v2"], Some("v1"))));
        assert!(!state.can_create_migration);
        assert!(state.can_migrate_resources);

        let unknown = ClusterResourceState::idle(Some(release(1, &["v1", "v2"], Some("v9"))));
        assert!(!unknown.can_create_migration);
        assert!(!unknown.can_migrate_resources);
    }

    #[test]
    fn snapshot_errors_block_everything() {
        let mut snapshot = release(1, &["v1", "v2"], Some("v2"));
        snapshot.errors.push(MigrationLogRecord::error("Migrator is not defined"));
        let state = ClusterResourceState::idle(Some(snapshot));
        assert!(!state.can_create_migration);
        assert!(!state.is_complete());

        assert_eq!(ClusterResourceState::idle(None), ClusterResourceState::default());
    }

    #[test]
    fn fresh_upgrade_starts_with_resources() {
        let migration = Migration::preparing(1, 1, 2);
        let state = ClusterResourceState::migrating(
            &migration,
            release(1, &["v1"], Some("v1")),
            release(2, &["v1", "v2"], Some("v1")),
            MigrationSide::Source,
            &[],
        );
        assert_eq!(state.direction, Some(MigrationDirection::Upgrade));
        assert_eq!(state.current_step, Some(MigrationStep::Start));
        assert!(state.can_migrate_resources);
        assert!(!state.can_finish_migration);
        assert!(state.can_cancel_migration);
    }

    #[test]
    fn unreadable_touched_resource_blocks_cancel() {
        let migration = Migration::preparing(1, 1, 2);
        let orders = ResourceAddress::new("storage", "file-marker", "orders");
        let mut destination = release(2, &["v1", "v2"], Some("v2"));
        let mut unrelated = MigrationLogRecord::error("boom").with_resource("invoices", None);
        unrelated.enrich(Some(1), 2, "storage", "Storage");
        destination.errors.push(unrelated.clone());

        let state = ClusterResourceState::migrating(
            &migration,
            release(1, &["v1"], Some("v2")),
            destination.clone(),
            MigrationSide::Source,
            std::slice::from_ref(&orders),
        );
        assert!(state.can_cancel_migration);

        let mut failure = MigrationLogRecord::error("Error on requesting resource current point")
            .with_resource("orders", None);
        failure.enrich(Some(1), 2, "storage", "Storage");
        destination.errors.push(failure);
        let state = ClusterResourceState::migrating(
            &migration,
            release(1, &["v1"], Some("v2")),
            destination,
            MigrationSide::Source,
            std::slice::from_ref(&orders),
        );
        assert!(!state.can_cancel_migration);
        let blockers = state.cancel_blockers(std::slice::from_ref(&orders));
        assert_eq!(blockers.len(), 1);
        assert_eq!(blockers[0].message, UNKNOWN_STATE);
    }

    #[test]
    fn touched_resources_skip_plain_errors() {
        let mut operation = MigrationLogRecord::operation("file-marker", "orders");
        operation.enrich(Some(1), 2, "storage", "Storage");
        let duplicate = operation.clone();
        let mut error = MigrationLogRecord::error("boom").with_resource("invoices", None);
        error.enrich(Some(1), 2, "storage", "Storage");

        let touched = touched_resources([&operation, &duplicate, &error]);
        assert_eq!(touched, vec![ResourceAddress::new("storage", "file-marker", "orders")]);
    }
}
