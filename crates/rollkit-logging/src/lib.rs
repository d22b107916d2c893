//! ---
//! rk_section: "03-persistence-logging"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Structured logging adapters carrying migration context."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Initialize a subscriber writing to stderr only. Used by sandbox workers whose
/// stdout carries the wire response.
pub fn init_stderr() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Migration the event belongs to.
    pub migration: Option<u64>,
    /// Configuration whose code is involved.
    pub configuration: Option<u64>,
    /// Migrator template code.
    pub template: Option<&'a str>,
    /// Migrator type name.
    pub migrator: Option<&'a str>,
    /// Resource code.
    pub resource: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a migration identifier.
    pub fn with_migration(mut self, migration: u64) -> Self {
        self.migration = Some(migration);
        self
    }

    /// Attach a configuration identifier.
    pub fn with_configuration(mut self, configuration: u64) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Attach a template code.
    pub fn with_template(mut self, template: &'a str) -> Self {
        self.template = Some(template);
        self
    }

    /// Attach a migrator type name.
    pub fn with_migrator(mut self, migrator: &'a str) -> Self {
        self.migrator = Some(migrator);
        self
    }

    /// Attach a resource code.
    pub fn with_resource(mut self, resource: &'a str) -> Self {
        self.resource = Some(resource);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation was declined or failed.
    Fault,
}

impl SystemEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized system event with a success/fault outcome.
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let default = LogContext::default();
    let ctx = context.unwrap_or(&default);
    match outcome {
        SystemEventOutcome::Success => tracing::info!(
            event,
            outcome = outcome.as_str(),
            migration = ctx.migration.unwrap_or_default(),
            configuration = ctx.configuration.unwrap_or_default(),
            template = ctx.template.unwrap_or(""),
            migrator = ctx.migrator.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            message = %message
        ),
        SystemEventOutcome::Fault => tracing::warn!(
            event,
            outcome = outcome.as_str(),
            migration = ctx.migration.unwrap_or_default(),
            configuration = ctx.configuration.unwrap_or_default(),
            template = ctx.template.unwrap_or(""),
            migrator = ctx.migrator.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            message = %message
        ),
    }
}
