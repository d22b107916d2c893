//! ---
//! rk_section: "04-migration-execution"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Migrator contract, collectors, and the release sandbox boundary."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::contract::Migrator;
use crate::file_marker::FileMarkerMigrator;
use crate::settings::MigratorSettings;

/// Constructor for a migrator type, fed with the template's settings.
pub type MigratorFactory =
    Arc<dyn Fn(&MigratorSettings) -> anyhow::Result<Box<dyn Migrator>> + Send + Sync>;

/// Failures resolving a migrator type name.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No factory is registered under the name.
    #[error("Migrator type {0} was not found")]
    NotFound(String),
    /// The factory rejected the template settings.
    #[error("Migrator type {type_name} could not be created: {source}")]
    Construction {
        /// Requested type name.
        type_name: String,
        /// Factory error.
        #[source]
        source: anyhow::Error,
    },
}

/// Map of stable type names to migrator factories, populated at process start.
#[derive(Clone, Default)]
pub struct MigratorRegistry {
    factories: IndexMap<String, MigratorFactory>,
}

impl fmt::Debug for MigratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigratorRegistry")
            .field("types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MigratorRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the migrators shipped with rollkit.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(FileMarkerMigrator::TYPE_NAME, |settings| {
            Ok(Box::new(FileMarkerMigrator::from_settings(settings)?) as Box<dyn Migrator>)
        });
        registry
    }

    /// Register (or replace) a factory.
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&MigratorSettings) -> anyhow::Result<Box<dyn Migrator>> + Send + Sync + 'static,
    {
        self.factories.insert(type_name.into(), Arc::new(factory));
        self
    }

    /// Whether a type name is known.
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered type names in registration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Build a migrator instance.
    pub fn create(
        &self,
        type_name: &str,
        settings: &MigratorSettings,
    ) -> Result<Box<dyn Migrator>, RegistryError> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| RegistryError::NotFound(type_name.to_owned()))?;
        factory(settings).map_err(|source| RegistryError::Construction {
            type_name: type_name.to_owned(),
            source,
        })
    }
}
