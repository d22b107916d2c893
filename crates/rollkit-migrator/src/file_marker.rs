//! ---
//! rk_section: "04-migration-execution"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Migrator contract, collectors, and the release sandbox boundary."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Reference migrator keeping each resource's point in a marker file.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rollkit_model::MigratableResource;
use serde::Deserialize;

use crate::contract::Migrator;
use crate::settings::MigratorSettings;

fn default_name() -> String {
    "File marker".to_owned()
}

/// `[file_marker]` section of a template configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FileMarkerSettings {
    /// Display name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Directory holding one marker file per resource.
    pub directory: PathBuf,
    /// Declared points, oldest first.
    #[serde(default)]
    pub points: Vec<String>,
    /// Resource codes.
    #[serde(default)]
    pub resources: Vec<String>,
    /// Fault injection: fail `all_points`.
    #[serde(default)]
    pub throw_on_get_all_points: bool,
    /// Fault injection: fail `current_point`.
    #[serde(default)]
    pub throw_on_get_current_point: bool,
    /// Fault injection: fail `migratable_resources`.
    #[serde(default)]
    pub throw_on_get_migratable_resources: bool,
    /// Fault injection: fail `migrate`.
    #[serde(default)]
    pub throw_on_migrate: bool,
}

/// File-backed migrator used by the CLI demo flows and the test suites.
#[derive(Debug, Clone)]
pub struct FileMarkerMigrator {
    settings: FileMarkerSettings,
}

impl FileMarkerMigrator {
    /// Registry key.
    pub const TYPE_NAME: &'static str = "file-marker";
    /// Settings table.
    pub const SECTION: &'static str = "file_marker";

    /// Build from a template configuration.
    pub fn from_settings(settings: &MigratorSettings) -> Result<Self> {
        Ok(Self {
            settings: settings.section(Self::SECTION)?,
        })
    }

    /// Build from typed settings.
    pub fn new(settings: FileMarkerSettings) -> Self {
        Self { settings }
    }

    /// Write a marker directly, bypassing point validation.
    pub fn set_point(directory: &Path, resource_code: &str, point: &str) -> Result<()> {
        fs::create_dir_all(directory)
            .with_context(|| format!("unable to create marker directory {}", directory.display()))?;
        let path = directory.join(resource_code);
        fs::write(&path, point)
            .with_context(|| format!("unable to write marker {}", path.display()))
    }

    /// Read a marker directly.
    pub fn read_point(directory: &Path, resource_code: &str) -> Result<Option<String>> {
        let path = directory.join(resource_code);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("unable to read marker {}", path.display()))?;
        let point = content.trim();
        Ok((!point.is_empty()).then(|| point.to_owned()))
    }
}

impl Migrator for FileMarkerMigrator {
    fn name(&self) -> String {
        self.settings.name.clone()
    }

    fn migratable_resources(&self) -> Result<Vec<MigratableResource>> {
        if self.settings.throw_on_get_migratable_resources {
            bail!("migratable resources are unavailable");
        }
        Ok(self
            .settings
            .resources
            .iter()
            .map(|code| MigratableResource::new(code.clone(), code.clone()))
            .collect())
    }

    fn all_points(&self) -> Result<Vec<String>> {
        if self.settings.throw_on_get_all_points {
            bail!("migration points are unavailable");
        }
        Ok(self.settings.points.clone())
    }

    fn current_point(&self, resource: &MigratableResource) -> Result<Option<String>> {
        if self.settings.throw_on_get_current_point {
            bail!("current point of {} is unavailable", resource.code);
        }
        Self::read_point(&self.settings.directory, &resource.code)
    }

    fn migrate(&mut self, resource: &MigratableResource, point: &str) -> Result<Vec<String>> {
        if self.settings.throw_on_migrate {
            bail!("migration of {} to {point} failed", resource.code);
        }
        Self::set_point(&self.settings.directory, &resource.code, point)?;
        Ok(vec!["success".to_owned()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn settings(directory: &Path) -> FileMarkerSettings {
        FileMarkerSettings {
            name: default_name(),
            directory: directory.to_path_buf(),
            points: vec!["v1".into(), "v2".into()],
            resources: vec!["orders".into()],
            throw_on_get_all_points: false,
            throw_on_get_current_point: false,
            throw_on_get_migratable_resources: false,
            throw_on_migrate: false,
        }
    }

    #[test]
    fn missing_marker_means_not_created() {
        let dir = tempdir().unwrap();
        let migrator = FileMarkerMigrator::new(settings(dir.path()));
        let resource = &migrator.migratable_resources().unwrap()[0];
        assert_eq!(migrator.current_point(resource).unwrap(), None);
        assert_eq!(migrator.latest_point().unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn migrate_writes_marker() {
        let dir = tempdir().unwrap();
        let mut migrator = FileMarkerMigrator::new(settings(dir.path()));
        let resource = migrator.migratable_resources().unwrap().remove(0);
        assert_eq!(migrator.migrate(&resource, "v2").unwrap(), vec!["success"]);
        assert_eq!(
            FileMarkerMigrator::read_point(dir.path(), "orders").unwrap().as_deref(),
            Some("v2")
        );
    }

    #[test]
    fn section_requires_directory() {
        let settings = MigratorSettings::parse("[file_marker]\npoints = [\"v1\"]\n").unwrap();
        assert!(FileMarkerMigrator::from_settings(&settings).is_err());
    }
}
