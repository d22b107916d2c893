//! ---
//! rk_section: "01-core-functionality"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Shared configuration and tracing setup."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_sandbox_mode() -> SandboxMode {
    SandboxMode::Process
}

fn default_worker_command() -> String {
    "rollkit-worker".to_owned()
}

fn default_collector_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_store_path() -> PathBuf {
    PathBuf::from("target/rollkit/cluster.json")
}

fn default_audit_log() -> PathBuf {
    PathBuf::from("target/rollkit/audit.log")
}

/// Primary configuration object for rollkit processes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "ROLLKIT_CONFIG";

    /// Load configuration from disk, respecting the `ROLLKIT_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.sandbox.validate()?;
        if self.store.path.as_os_str().is_empty() {
            return Err(anyhow!("store.path must not be empty"));
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// Where collectors run.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SandboxMode {
    /// A short-lived worker process per collector call.
    #[default]
    Process,
    /// A fresh migrator registry per call inside the host, behind the same wire format.
    InProcess,
}

/// Collector sandbox settings.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_sandbox_mode")]
    pub mode: SandboxMode,
    /// Worker executable used when a migrator template does not name its own.
    #[serde(default = "default_worker_command")]
    pub worker_command: String,
    #[serde(default)]
    pub worker_args: Vec<String>,
    /// Outer deadline for one collector call. Expiry is recorded as a collector error.
    #[serde(default = "default_collector_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub collector_timeout: Duration,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            mode: default_sandbox_mode(),
            worker_command: default_worker_command(),
            worker_args: Vec::new(),
            collector_timeout: default_collector_timeout(),
        }
    }
}

impl SandboxConfig {
    pub fn validate(&self) -> Result<()> {
        if self.collector_timeout.is_zero() {
            return Err(anyhow!("sandbox.collector_timeout must be positive"));
        }
        if matches!(self.mode, SandboxMode::Process) && self.worker_command.trim().is_empty() {
            return Err(anyhow!(
                "sandbox.worker_command is required in process mode"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default = "default_audit_log")]
    pub audit_log: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            audit_log: default_audit_log(),
        }
    }
}

/// Cluster topology known to the node updater.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(default)]
    pub nodes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_document() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config.sandbox.mode, SandboxMode::Process);
        assert_eq!(config.sandbox.collector_timeout, Duration::from_secs(300));
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
    }

    #[test]
    fn sandbox_section_parses() {
        let config: AppConfig = r#"
            [sandbox]
            mode = "in-process"
            collector_timeout = 12

            [cluster]
            nodes = ["node-a", "node-b"]
        "#
        .parse()
        .unwrap();
        assert_eq!(config.sandbox.mode, SandboxMode::InProcess);
        assert_eq!(config.sandbox.collector_timeout, Duration::from_secs(12));
        assert_eq!(config.cluster.nodes.len(), 2);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = "[sandbox]\ncollector_timeout = 0\n"
            .parse::<AppConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("collector_timeout"));
    }
}
