//! ---
//! rk_section: "04-migration-execution"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Migrator contract, collectors, and the release sandbox boundary."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Sandboxes run a collector with exactly one release's migrator code and hand
//! back a [`SandboxResponse`]. Only serialized records cross the boundary.
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use rollkit_logging::rk_error;
use tracing::debug;

use crate::registry::MigratorRegistry;
use crate::wire::{serve_json, SandboxRequest, SandboxResponse};

/// Builds a fresh registry for every in-process call.
pub type RegistryFactory = Arc<dyn Fn() -> MigratorRegistry + Send + Sync>;

/// Transport failures of a sandbox call. They are reported to callers as error
/// records, never as `Err`.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The request could not be serialized.
    #[error("Sandbox request could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
    /// The response could not be deserialized.
    #[error("Sandbox response could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),
    /// The worker process could not be started.
    #[error("Sandbox worker {command} could not be started: {source}")]
    Spawn {
        /// Program that failed to start.
        command: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Pipe IO with the worker failed.
    #[error("Sandbox worker IO failed: {0}")]
    Io(#[from] std::io::Error),
    /// The worker exited unsuccessfully.
    #[error("Sandbox worker exited with {status}: {stderr}")]
    WorkerFailed {
        /// Exit status.
        status: String,
        /// Captured stderr.
        stderr: String,
    },
    /// The outer deadline expired.
    #[error("Collector timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    /// The blocking task running the collector died.
    #[error("Collector task failed: {0}")]
    Join(String),
    /// No code is available for the requested executor.
    #[error("Sandbox executor {0} is not available")]
    UnknownExecutor(String),
}

/// Boundary running one collector call against one release's migrator code.
#[async_trait]
pub trait ReleaseSandbox: Send + Sync {
    /// Execute `request`. `executor` names the code bundle pinned by the template,
    /// if any. Transport failures come back as error records.
    async fn run(&self, executor: Option<&str>, request: SandboxRequest) -> SandboxResponse;
}

/// Runs collectors on the blocking pool with a fresh registry per call.
#[derive(Clone)]
pub struct InProcessSandbox {
    default: RegistryFactory,
    executors: IndexMap<String, RegistryFactory>,
    timeout: Duration,
}

impl InProcessSandbox {
    /// Sandbox using `factory` for every template that does not pin an executor.
    pub fn new(factory: RegistryFactory, timeout: Duration) -> Self {
        Self {
            default: factory,
            executors: IndexMap::new(),
            timeout,
        }
    }

    /// Sandbox over the built-in migrators.
    pub fn builtin(timeout: Duration) -> Self {
        Self::new(Arc::new(MigratorRegistry::with_builtin), timeout)
    }

    /// Provide the code for a named executor.
    pub fn with_executor(mut self, name: impl Into<String>, factory: RegistryFactory) -> Self {
        self.executors.insert(name.into(), factory);
        self
    }

    async fn call(
        &self,
        executor: Option<&str>,
        request: SandboxRequest,
    ) -> Result<SandboxResponse, SandboxError> {
        let factory = match executor {
            Some(name) => self
                .executors
                .get(name)
                .cloned()
                .ok_or_else(|| SandboxError::UnknownExecutor(name.to_owned()))?,
            None => self.default.clone(),
        };
        let payload = serde_json::to_string(&request).map_err(SandboxError::Encode)?;
        let task = tokio::task::spawn_blocking(move || {
            let registry = factory();
            serve_json(&registry, &payload)
        });
        let text = timeout(self.timeout, task)
            .await
            .map_err(|_| SandboxError::Timeout(self.timeout))?
            .map_err(|err| SandboxError::Join(err.to_string()))?
            .map_err(SandboxError::Encode)?;
        serde_json::from_str(&text).map_err(SandboxError::Decode)
    }
}

#[async_trait]
impl ReleaseSandbox for InProcessSandbox {
    async fn run(&self, executor: Option<&str>, request: SandboxRequest) -> SandboxResponse {
        match self.call(executor, request).await {
            Ok(response) => response,
            Err(err) => {
                rk_error!("in-process collector failed on {}: {err}", executor.unwrap_or("default"));
                SandboxResponse::failed(err.to_string())
            }
        }
    }
}

/// Runs every collector call in a short-lived worker process.
#[derive(Debug, Clone)]
pub struct ProcessSandbox {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessSandbox {
    /// Sandbox launching `command` for templates that do not pin an executor.
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    async fn call(
        &self,
        executor: Option<&str>,
        request: SandboxRequest,
    ) -> Result<SandboxResponse, SandboxError> {
        let payload = serde_json::to_vec(&request).map_err(SandboxError::Encode)?;
        let program = executor.unwrap_or(&self.command);
        debug!(program, "starting sandbox worker");
        let mut child = Command::new(program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SandboxError::Spawn {
                command: program.to_owned(),
                source,
            })?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SandboxError::Io(std::io::Error::other("worker stdin unavailable")))?;

        let exchange = async move {
            stdin.write_all(&payload).await?;
            stdin.shutdown().await?;
            drop(stdin);
            child.wait_with_output().await
        };
        // Dropping the exchange on expiry drops the child, which kills it.
        let output = timeout(self.timeout, exchange)
            .await
            .map_err(|_| SandboxError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(SandboxError::WorkerFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        serde_json::from_slice(&output.stdout).map_err(SandboxError::Decode)
    }
}

#[async_trait]
impl ReleaseSandbox for ProcessSandbox {
    async fn run(&self, executor: Option<&str>, request: SandboxRequest) -> SandboxResponse {
        match self.call(executor, request).await {
            Ok(response) => response,
            Err(err) => {
                rk_error!("sandbox worker {} failed: {err}", executor.unwrap_or(&self.command));
                SandboxResponse::failed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::Migrator;
    use rollkit_model::MigratableResource;

    struct Sleepy;

    impl Migrator for Sleepy {
        fn name(&self) -> String {
            "Sleepy".into()
        }

        fn migratable_resources(&self) -> anyhow::Result<Vec<MigratableResource>> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(Vec::new())
        }

        fn all_points(&self) -> anyhow::Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn current_point(&self, _: &MigratableResource) -> anyhow::Result<Option<String>> {
            Ok(None)
        }

        fn migrate(&mut self, _: &MigratableResource, _: &str) -> anyhow::Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn sleepy_registry() -> MigratorRegistry {
        let mut registry = MigratorRegistry::new();
        registry.register("sleepy", |_| Ok(Box::new(Sleepy) as Box<dyn Migrator>));
        registry
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn timeout_is_recorded_not_raised() {
        let sandbox = InProcessSandbox::new(Arc::new(sleepy_registry), Duration::from_millis(50));
        let response = sandbox
            .run(
                None,
                SandboxRequest::release_state("[rollkit]\nmigrators = [\"sleepy\"]\n"),
            )
            .await;
        assert!(response.result.is_none());
        assert_eq!(
            response.errors[0].error_message.as_deref(),
            Some("Collector timed out after 0s")
        );
    }

    #[tokio::test]
    async fn unknown_executor_is_recorded() {
        let sandbox = InProcessSandbox::builtin(Duration::from_secs(5));
        let response = sandbox
            .run(Some("release-9"), SandboxRequest::release_state(""))
            .await;
        assert_eq!(
            response.errors[0].error_message.as_deref(),
            Some("Sandbox executor release-9 is not available")
        );
    }

    #[tokio::test]
    async fn missing_worker_binary_is_recorded() {
        let sandbox = ProcessSandbox::new(
            "rollkit-worker-that-does-not-exist",
            Vec::new(),
            Duration::from_secs(5),
        );
        let response = sandbox.run(None, SandboxRequest::release_state("")).await;
        assert!(response.result.is_none());
        assert!(response.errors[0]
            .error_message
            .as_deref()
            .unwrap()
            .starts_with("Sandbox worker rollkit-worker-that-does-not-exist could not be started"));
    }
}
