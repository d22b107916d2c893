//! ---
//! rk_section: "02-data-model"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Plain data records shared by collectors, reconciliation, and the orchestrator."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};

/// A `{field, message}` pair returned to operators when a request is declined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescription {
    /// Path of the offending field, if the error is attributable to one.
    #[serde(default)]
    pub field: Option<String>,
    /// Human readable explanation.
    pub message: String,
}

impl ErrorDescription {
    /// Error attached to a specific field.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Error not attributable to a single field.
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{field}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}
