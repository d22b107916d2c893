//! ---
//! rk_section: "15-testing-qa-runbook"
//! rk_subsection: "integration-tests"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Downgrade carried across an orchestrator restart on a file store."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rollkit_migrator::{FileMarkerMigrator, InProcessSandbox};
use rollkit_model::{
    ConfigurationId, ConfigurationSettings, ConfigurationState, MigrationDirection,
    MigrationSide, MigrationState,
};
use rollkit_orchestrator::{
    MigrationOrchestrator, RecordingNodeUpdater, RequestContext, ResourceUpgrade,
};
use rollkit_persistence::JsonFileStore;

fn release(markers: &Path, points: &str) -> ConfigurationSettings {
    let yaml = format!(
        r#"
node_templates:
  - code: worker
    name: Worker
    package_requirements: [{{ id: core }}]
migrator_templates:
  - code: storage
    name: Storage
    package_requirements: [{{ id: core }}]
    configuration: |
      [rollkit]
      migrators = ["file-marker"]
      [file_marker]
      directory = {markers:?}
      points = [{points}]
      resources = ["orders"]
packages:
  - {{ id: core, version: "1.0.0" }}
"#,
        markers = markers.display().to_string(),
    );
    serde_yaml::from_str(&yaml).unwrap()
}

async fn open(store: &Path, nodes: Arc<RecordingNodeUpdater>) -> MigrationOrchestrator {
    MigrationOrchestrator::open(
        Arc::new(JsonFileStore::new(store)),
        Arc::new(InProcessSandbox::builtin(Duration::from_secs(5))),
        nodes,
    )
    .await
    .unwrap()
}

async fn ready(
    orchestrator: &MigrationOrchestrator,
    ctx: &RequestContext,
    name: &str,
    settings: ConfigurationSettings,
) -> ConfigurationId {
    let id = orchestrator.create_configuration(ctx, name, settings).await.unwrap();
    orchestrator.set_ready(ctx, id).await.unwrap();
    id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn downgrade_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let markers = dir.path().join("markers");
    let store = dir.path().join("cluster.json");
    let nodes = Arc::new(RecordingNodeUpdater::new(vec!["node-1".into()]));
    let ctx = RequestContext::new("operator");

    let (newer, older, migration_id) = {
        let orchestrator = open(&store, nodes.clone()).await;
        let newer = ready(&orchestrator, &ctx, "r2", release(&markers, r#""v1", "v2""#)).await;
        orchestrator.bootstrap(&ctx, newer).await.unwrap();
        FileMarkerMigrator::set_point(&markers, "orders", "v2").unwrap();
        orchestrator.recheck(&ctx).await.unwrap();

        let older = ready(&orchestrator, &ctx, "r1", release(&markers, r#""v1""#)).await;
        let migration_id = orchestrator.update_cluster(&ctx, older).await.unwrap();

        let state = orchestrator.resource_state().await;
        assert_eq!(state.direction, Some(MigrationDirection::Downgrade));
        assert!(!state.can_migrate_resources);
        assert!(state.can_update_nodes_to_destination);
        (newer, older, migration_id)
    };

    let orchestrator = open(&store, nodes.clone()).await;
    let migration = orchestrator.active_migration().await.unwrap();
    assert_eq!(migration.id, migration_id);
    assert_eq!(migration.direction, Some(MigrationDirection::Downgrade));

    orchestrator
        .nodes_update(&ctx, MigrationSide::Destination)
        .await
        .unwrap();
    assert_eq!(
        orchestrator.configuration(older).await.unwrap().state,
        ConfigurationState::Active
    );
    assert_eq!(
        orchestrator.configuration(newer).await.unwrap().state,
        ConfigurationState::Obsolete
    );
    assert!(orchestrator.resource_state().await.can_migrate_resources);

    let records = orchestrator
        .resource_update(
            &ctx,
            &[ResourceUpgrade::new("storage", "file-marker", "orders", MigrationSide::Destination)],
        )
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source_point.as_deref(), Some("v2"));
    assert_eq!(records[0].destination_point.as_deref(), Some("v1"));
    assert_eq!(
        FileMarkerMigrator::read_point(&markers, "orders").unwrap().as_deref(),
        Some("v1")
    );

    orchestrator.finish(&ctx).await.unwrap();
    let finished = orchestrator.migrations().await.pop().unwrap();
    assert_eq!(finished.state, MigrationState::Finished);
    assert_eq!(nodes.history(), vec![newer, older]);

    let reopened = open(&store, nodes).await;
    assert!(reopened.active_migration().await.is_none());
    assert_eq!(reopened.migration_log(Some(migration_id)).await.len(), 1);
    assert!(reopened.resource_state().await.can_create_migration);
}
