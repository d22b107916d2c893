//! ---
//! rk_section: "04-migration-execution"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Migrator contract, collectors, and the release sandbox boundary."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Key listing the migrator type names a template registers.
pub const MIGRATORS_PATH: &str = "rollkit.migrators";

/// Parsed migrator template configuration with dotted-path lookups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigratorSettings {
    root: toml::Table,
}

impl MigratorSettings {
    /// Parse a template configuration document.
    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        let root = toml::from_str::<toml::Table>(text)?;
        Ok(Self { root })
    }

    /// Resolve a dotted path such as `rollkit.migrators`.
    pub fn value(&self, path: &str) -> Option<&toml::Value> {
        let mut segments = path.split('.');
        let mut current = self.root.get(segments.next()?)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    /// String value at `path`.
    pub fn string(&self, path: &str) -> Option<&str> {
        self.value(path)?.as_str()
    }

    /// Boolean value at `path`; absent keys read as `false`.
    pub fn flag(&self, path: &str) -> bool {
        self.value(path)
            .and_then(toml::Value::as_bool)
            .unwrap_or(false)
    }

    /// String array at `path`. Non-string entries are skipped.
    pub fn string_list(&self, path: &str) -> Option<Vec<String>> {
        let values = self.value(path)?.as_array()?;
        Some(
            values
                .iter()
                .filter_map(|value| value.as_str().map(str::to_owned))
                .collect(),
        )
    }

    /// Deserialize the table at `path` into a typed section. A missing table
    /// deserializes from an empty one so serde defaults apply.
    pub fn section<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self
            .value(path)
            .cloned()
            .unwrap_or_else(|| toml::Value::Table(toml::Table::new()));
        value
            .try_into()
            .with_context(|| format!("invalid migrator settings section `{path}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"
        [rollkit]
        migrators = ["file-marker", 42, "other"]

        [file_marker]
        directory = "/tmp/markers"
        throw_on_migrate = true
    "#;

    #[test]
    fn dotted_paths_resolve() {
        let settings = MigratorSettings::parse(DOCUMENT).unwrap();
        assert_eq!(
            settings.string_list(MIGRATORS_PATH).unwrap(),
            vec!["file-marker".to_owned(), "other".to_owned()]
        );
        assert_eq!(settings.string("file_marker.directory"), Some("/tmp/markers"));
        assert!(settings.flag("file_marker.throw_on_migrate"));
        assert!(!settings.flag("file_marker.throw_on_get_all_points"));
        assert!(settings.value("file_marker.directory.deeper").is_none());
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(MigratorSettings::parse("[rollkit\nmigrators = ").is_err());
    }
}
