//! ---
//! rk_section: "03-persistence-logging"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Cluster store and hash-chained audit log."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Result;

/// Entry recorded in the audit log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    /// Timestamp when the command was accepted.
    pub timestamp: DateTime<Utc>,
    /// Operator who issued the command.
    pub actor: String,
    /// Command name (e.g. `migration.create`, `configuration.set_ready`).
    pub action: String,
    /// Command arguments and outcome serialized as JSON.
    pub metadata: serde_json::Value,
    /// SHA-256 hash of the entry contents and previous hash.
    pub hash: String,
    /// Hash of the previous entry (or zero string for the first entry).
    pub previous_hash: String,
}

impl AuditEntry {
    fn compute_hash(
        timestamp: DateTime<Utc>,
        actor: &str,
        action: &str,
        metadata: &serde_json::Value,
        previous_hash: &str,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(
            timestamp
                .timestamp_nanos_opt()
                .unwrap_or_default()
                .to_be_bytes(),
        );
        hasher.update(actor.as_bytes());
        hasher.update(action.as_bytes());
        hasher.update(metadata.to_string().as_bytes());
        hasher.update(previous_hash.as_bytes());
        hex::encode(hasher.finalize())
    }
}

fn genesis() -> String {
    "0".repeat(64)
}

/// Append-only audit trail backed by a newline-delimited JSON file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
    last_hash: String,
}

impl AuditLog {
    /// Open the audit log at `path`, picking up the head hash of existing entries.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let last_hash = Self::read_entries(&path)?
            .last()
            .map(|entry| entry.hash.clone())
            .unwrap_or_else(genesis);
        Ok(Self { path, last_hash })
    }

    fn read_entries(path: &Path) -> Result<Vec<AuditEntry>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for line in BufReader::new(fs::File::open(path)?).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }

    /// Append a new audit entry to the log.
    pub fn append(
        &mut self,
        actor: &str,
        action: &str,
        metadata: serde_json::Value,
    ) -> Result<AuditEntry> {
        let timestamp = Utc::now();
        let hash = AuditEntry::compute_hash(timestamp, actor, action, &metadata, &self.last_hash);
        let entry = AuditEntry {
            timestamp,
            actor: actor.to_string(),
            action: action.to_string(),
            metadata,
            hash: hash.clone(),
            previous_hash: self.last_hash.clone(),
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(serde_json::to_string(&entry)?.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        self.last_hash = hash;
        Ok(entry)
    }

    /// Every entry, oldest first.
    pub fn entries(&self) -> Result<Vec<AuditEntry>> {
        Self::read_entries(&self.path)
    }

    /// Verify integrity of the chain (detect tampering).
    pub fn verify(&self) -> Result<bool> {
        let mut previous = genesis();
        for entry in self.entries()? {
            let expected = AuditEntry::compute_hash(
                entry.timestamp,
                &entry.actor,
                &entry.action,
                &entry.metadata,
                &previous,
            );
            if expected != entry.hash || entry.previous_hash != previous {
                return Ok(false);
            }
            previous = entry.hash;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn audit_log_detects_tampering() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let mut log = AuditLog::open(&path).unwrap();
        log.append("alice", "migration.create", serde_json::json!({"to": 2}))
            .unwrap();
        log.append("bob", "migration.cancel", serde_json::json!({"migration": 1}))
            .unwrap();
        assert!(log.verify().unwrap());

        let mut entries: Vec<serde_json::Value> = fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        entries[1]["actor"] = serde_json::json!("mallory");
        let forged: String = entries.iter().map(|e| format!("{e}\n")).collect();
        fs::write(&path, forged).unwrap();
        assert!(!AuditLog::open(&path).unwrap().verify().unwrap());
    }

    #[test]
    fn reopened_log_continues_the_chain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit/log.jsonl");
        let first = AuditLog::open(&path)
            .unwrap()
            .append("alice", "configuration.check", serde_json::json!({}))
            .unwrap();
        let mut reopened = AuditLog::open(&path).unwrap();
        let second = reopened
            .append("alice", "configuration.set_ready", serde_json::json!({"id": 2}))
            .unwrap();
        assert_eq!(second.previous_hash, first.hash);
        assert_eq!(reopened.entries().unwrap().len(), 2);
        assert!(reopened.verify().unwrap());
    }
}
