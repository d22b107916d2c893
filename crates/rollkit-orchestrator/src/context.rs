//! ---
//! rk_section: "06-orchestration"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Cluster migration state machine and its command surface."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

/// Caller identity attached to every command, recorded in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Who issued the command.
    pub actor: String,
    /// Correlation id supplied by the caller.
    #[serde(default)]
    pub request_id: Option<String>,
}

impl RequestContext {
    /// Context for a named actor.
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            request_id: None,
        }
    }

    /// Attach a correlation id.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Context used by internal callers such as startup.
    pub fn system() -> Self {
        Self::new("system")
    }
}
