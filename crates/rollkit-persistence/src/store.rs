//! ---
//! rk_section: "03-persistence-logging"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Cluster store and hash-chained audit log."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Whole-document cluster stores. A write either lands completely or not at all.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::data::ClusterData;
use crate::{PersistenceError, Result};

/// Current store envelope version.
pub const STORE_VERSION: u16 = 1;

/// Persistence collaborator of the orchestrator.
pub trait ClusterStore: Send + Sync {
    /// Read the current document. A store that was never written yields empty data.
    fn load(&self) -> Result<ClusterData>;

    /// Replace the stored document. Invariant violations are rejected before writing.
    fn persist(&self, data: &ClusterData) -> Result<()>;
}

/// Store kept in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: Mutex<ClusterData>,
}

impl InMemoryStore {
    /// Store seeded with `data`.
    pub fn new(data: ClusterData) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }
}

impl ClusterStore for InMemoryStore {
    fn load(&self) -> Result<ClusterData> {
        Ok(self.data.lock().clone())
    }

    fn persist(&self, data: &ClusterData) -> Result<()> {
        data.check_invariants()?;
        *self.data.lock() = data.clone();
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreEnvelope {
    version: u16,
    saved_at: DateTime<Utc>,
    hash: String,
    data: ClusterData,
}

/// Store writing one hashed JSON document, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn compute_hash(data: &ClusterData) -> Result<String> {
    let serialized = serde_json::to_vec(data)?;
    Ok(hex::encode(Sha256::digest(serialized)))
}

impl ClusterStore for JsonFileStore {
    fn load(&self) -> Result<ClusterData> {
        if !self.path.exists() {
            return Ok(ClusterData::default());
        }
        let bytes = fs::read(&self.path)?;
        let envelope: StoreEnvelope = serde_json::from_slice(&bytes)?;
        if envelope.version != STORE_VERSION {
            return Err(PersistenceError::UnsupportedVersion(envelope.version));
        }
        if compute_hash(&envelope.data)? != envelope.hash {
            return Err(PersistenceError::HashMismatch);
        }
        Ok(envelope.data)
    }

    fn persist(&self, data: &ClusterData) -> Result<()> {
        data.check_invariants()?;
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&directory)?;

        let envelope = StoreEnvelope {
            version: STORE_VERSION,
            saved_at: Utc::now(),
            hash: compute_hash(data)?,
            data: data.clone(),
        };
        let mut file = tempfile::NamedTempFile::new_in(&directory)?;
        file.write_all(&serde_json::to_vec_pretty(&envelope)?)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|err| err.error)?;
        debug!(path = %self.path.display(), "cluster store written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollkit_model::{Configuration, ConfigurationSettings, ConfigurationState};
    use tempfile::tempdir;

    fn seeded() -> ClusterData {
        let mut data = ClusterData::default();
        let mut active = Configuration::draft(0, "base", ConfigurationSettings::default());
        active.state = ConfigurationState::Active;
        data.add_configuration(active);
        data
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("cluster.json"));
        assert_eq!(store.load().unwrap(), ClusterData::default());
    }

    #[test]
    fn written_document_is_read_back() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/cluster.json"));
        let data = seeded();
        store.persist(&data).unwrap();
        assert_eq!(store.load().unwrap(), data);
    }

    #[test]
    fn tampered_document_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cluster.json");
        let store = JsonFileStore::new(&path);
        store.persist(&seeded()).unwrap();

        let mut envelope: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        envelope["data"]["configurations"][0]["name"] = serde_json::json!("forged");
        fs::write(&path, serde_json::to_vec_pretty(&envelope).unwrap()).unwrap();

        assert!(matches!(store.load(), Err(PersistenceError::HashMismatch)));
    }

    #[test]
    fn invariant_violations_are_not_written() {
        let store = InMemoryStore::default();
        let mut data = seeded();
        let mut second = Configuration::draft(0, "second", ConfigurationSettings::default());
        second.state = ConfigurationState::Active;
        data.add_configuration(second);
        assert!(store.persist(&data).is_err());
        assert_eq!(store.load().unwrap(), ClusterData::default());
    }
}
