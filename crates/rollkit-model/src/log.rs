//! ---
//! rk_section: "02-data-model"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Plain data records shared by collectors, reconciliation, and the orchestrator."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::configuration::ConfigurationId;
use crate::migration::MigrationId;

/// Kind of audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MigrationLogRecordType {
    /// A resource transition that completed.
    Operation,
    /// A resource transition that was attempted and failed.
    OperationError,
    /// A failure not tied to a single transition (load, query, timeout).
    Error,
}

/// Append-only audit record of an attempted resource transition or a collector failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationLogRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// Record kind.
    pub record_type: MigrationLogRecordType,
    /// Migration the record belongs to; absent for idle-mode resource updates.
    #[serde(default)]
    pub migration_id: Option<MigrationId>,
    /// Configuration whose code executed the step.
    #[serde(default)]
    pub configuration_id: Option<ConfigurationId>,
    /// Migrator template code.
    #[serde(default)]
    pub migrator_template_code: Option<String>,
    /// Migrator template name.
    #[serde(default)]
    pub migrator_template_name: Option<String>,
    /// Registry key of the migrator type.
    #[serde(default)]
    pub migrator_type_name: Option<String>,
    /// Human readable migrator name.
    #[serde(default)]
    pub migrator_name: Option<String>,
    /// Resource code.
    #[serde(default)]
    pub resource_code: Option<String>,
    /// Resource name.
    #[serde(default)]
    pub resource_name: Option<String>,
    /// When the attempt started.
    pub started: DateTime<Utc>,
    /// When the attempt finished; open operations have none.
    #[serde(default)]
    pub finished: Option<DateTime<Utc>>,
    /// Point the resource was at before the attempt.
    #[serde(default)]
    pub source_point: Option<String>,
    /// Point the attempt aimed for.
    #[serde(default)]
    pub destination_point: Option<String>,
    /// Failure description.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Failure detail (error source chain or panic payload).
    #[serde(default)]
    pub error_stack_trace: Option<String>,
}

impl MigrationLogRecord {
    fn blank(record_type: MigrationLogRecordType) -> Self {
        Self {
            id: Uuid::new_v4(),
            record_type,
            migration_id: None,
            configuration_id: None,
            migrator_template_code: None,
            migrator_template_name: None,
            migrator_type_name: None,
            migrator_name: None,
            resource_code: None,
            resource_name: None,
            started: Utc::now(),
            finished: None,
            source_point: None,
            destination_point: None,
            error_message: None,
            error_stack_trace: None,
        }
    }

    /// A finished error record not tied to a transition.
    pub fn error(message: impl Into<String>) -> Self {
        let mut record = Self::blank(MigrationLogRecordType::Error);
        record.error_message = Some(message.into());
        record.finished = Some(record.started);
        record
    }

    /// Open an operation record for a resource transition.
    pub fn operation(migrator_type_name: impl Into<String>, resource_code: impl Into<String>) -> Self {
        let mut record = Self::blank(MigrationLogRecordType::Operation);
        record.migrator_type_name = Some(migrator_type_name.into());
        record.resource_code = Some(resource_code.into());
        record
    }

    /// Attach migrator identity.
    pub fn with_migrator(mut self, type_name: impl Into<String>, name: Option<String>) -> Self {
        self.migrator_type_name = Some(type_name.into());
        self.migrator_name = name;
        self
    }

    /// Attach resource identity.
    pub fn with_resource(mut self, code: impl Into<String>, name: Option<String>) -> Self {
        self.resource_code = Some(code.into());
        self.resource_name = name;
        self
    }

    /// Attach failure detail.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.error_stack_trace = Some(detail.into());
        self
    }

    /// Stamp the record as successfully finished.
    pub fn finish(&mut self) {
        self.finished = Some(Utc::now());
    }

    /// Stamp the record as a failed operation.
    pub fn fail(&mut self, message: impl Into<String>, detail: Option<String>) {
        self.record_type = MigrationLogRecordType::OperationError;
        self.error_message = Some(message.into());
        self.error_stack_trace = detail;
        self.finished = Some(Utc::now());
    }

    /// Attach the orchestration context the collector cannot know about.
    pub fn enrich(
        &mut self,
        migration_id: Option<MigrationId>,
        configuration_id: ConfigurationId,
        template_code: &str,
        template_name: &str,
    ) {
        self.migration_id = migration_id;
        self.configuration_id = Some(configuration_id);
        self.migrator_template_code = Some(template_code.to_owned());
        self.migrator_template_name = Some(template_name.to_owned());
    }

    /// `true` for `OperationError` and `Error` records.
    pub fn is_error(&self) -> bool {
        !matches!(self.record_type, MigrationLogRecordType::Operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failing_an_operation_changes_its_type() {
        let mut record = MigrationLogRecord::operation("file-marker", "db");
        assert!(!record.is_error());
        record.fail("Resource cannot migrate to point", None);
        assert_eq!(record.record_type, MigrationLogRecordType::OperationError);
        assert!(record.finished.is_some());
        assert!(record.is_error());
    }

    #[test]
    fn record_serializes_as_plain_json() {
        let mut record = MigrationLogRecord::error("Migrator is not defined").with_migrator("missing", None);
        record.enrich(Some(3), 2, "storage", "Storage");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["record_type"], "error");
        assert_eq!(value["migration_id"], 3);
        assert_eq!(value["migrator_template_code"], "storage");
    }
}
