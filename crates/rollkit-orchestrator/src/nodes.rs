//! ---
//! rk_section: "06-orchestration"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Cluster migration state machine and its command surface."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Node rollout collaborator.
use async_trait::async_trait;
use parking_lot::Mutex;
use rollkit_model::{Configuration, ConfigurationId};
use tracing::info;

/// Rolls cluster nodes onto the binaries of a configuration.
#[async_trait]
pub trait NodeUpdater: Send + Sync {
    /// Restart every node on `configuration`. Returns once the rollout settled.
    async fn update_nodes(&self, configuration: &Configuration) -> anyhow::Result<()>;
}

/// Node updater that only records rollouts. Used by the CLI and the test suites.
#[derive(Debug, Default)]
pub struct RecordingNodeUpdater {
    nodes: Vec<String>,
    history: Mutex<Vec<ConfigurationId>>,
    failure: Mutex<Option<String>>,
}

impl RecordingNodeUpdater {
    /// Updater for the named nodes.
    pub fn new(nodes: Vec<String>) -> Self {
        Self {
            nodes,
            ..Self::default()
        }
    }

    /// Make every following rollout fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    /// Let rollouts succeed again.
    pub fn recover(&self) {
        *self.failure.lock() = None;
    }

    /// Configurations rolled out so far, oldest first.
    pub fn history(&self) -> Vec<ConfigurationId> {
        self.history.lock().clone()
    }
}

#[async_trait]
impl NodeUpdater for RecordingNodeUpdater {
    async fn update_nodes(&self, configuration: &Configuration) -> anyhow::Result<()> {
        if let Some(message) = self.failure.lock().clone() {
            anyhow::bail!(message);
        }
        for node in &self.nodes {
            info!(node = %node, configuration = configuration.id, "node restarted");
        }
        self.history.lock().push(configuration.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollkit_model::ConfigurationSettings;

    #[tokio::test]
    async fn failure_is_sticky_until_recovered() {
        let updater = RecordingNodeUpdater::new(vec!["node-1".into()]);
        let configuration = Configuration::draft(4, "next", ConfigurationSettings::default());

        updater.fail_with("node-1 did not come back");
        let error = updater.update_nodes(&configuration).await.unwrap_err();
        assert_eq!(error.to_string(), "node-1 did not come back");
        assert!(updater.history().is_empty());

        updater.recover();
        updater.update_nodes(&configuration).await.unwrap();
        assert_eq!(updater.history(), vec![4]);
    }
}
