//! ---
//! rk_section: "04-migration-execution"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Migrator contract, collectors, and the release sandbox boundary."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Failure boundary shared by every collector.
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rollkit_logging::{rk_warn, LogContext};
use rollkit_model::MigrationLogRecord;
use tracing::debug;

use crate::contract::Migrator;
use crate::registry::MigratorRegistry;
use crate::settings::{MigratorSettings, MIGRATORS_PATH};

/// A failed plugin call, either an returned error or a panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFailure {
    /// Top-level message.
    pub message: String,
    /// Full error chain or panic payload.
    pub detail: Option<String>,
}

impl CallFailure {
    fn from_error(err: &anyhow::Error) -> Self {
        Self {
            message: err.to_string(),
            detail: Some(format!("{err:?}")),
        }
    }

    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_owned()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "non-string panic payload".to_owned()
        };
        Self {
            message: format!("panic: {message}"),
            detail: None,
        }
    }
}

/// Run a plugin call, converting both `Err` and panics into a [`CallFailure`].
pub fn guard<T, F>(call: F) -> Result<T, CallFailure>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(CallFailure::from_error(&err)),
        Err(payload) => Err(CallFailure::from_panic(payload)),
    }
}

/// Display name of `migrator`, falling back to `type_name` when the call fails.
pub fn display_name(migrator: &dyn Migrator, type_name: &str) -> String {
    guard(|| Ok(migrator.name())).unwrap_or_else(|failure| {
        rk_warn!(
            context = LogContext::new().with_migrator(type_name),
            "migrator name unavailable: {}",
            failure.message
        );
        type_name.to_owned()
    })
}

/// Throwaway per-call context: the template settings, the resolved migrator
/// type names, and the accumulated errors and log lines.
pub struct CollectorContext<'r> {
    registry: &'r MigratorRegistry,
    settings: MigratorSettings,
    type_names: Vec<String>,
    errors: Vec<MigrationLogRecord>,
    logs: Vec<String>,
}

impl<'r> CollectorContext<'r> {
    /// Parse the template configuration and resolve its migrator names.
    /// Unknown names and parse failures are recorded and skipped.
    pub fn initialize(registry: &'r MigratorRegistry, configuration: &str) -> Self {
        let mut context = Self {
            registry,
            settings: MigratorSettings::default(),
            type_names: Vec::new(),
            errors: Vec::new(),
            logs: Vec::new(),
        };

        match MigratorSettings::parse(configuration) {
            Ok(settings) => context.settings = settings,
            Err(err) => {
                context.record(
                    MigrationLogRecord::error(format!(
                        "Migrator configuration could not be parsed: {err}"
                    )),
                );
                return context;
            }
        }

        let names = context
            .settings
            .string_list(MIGRATORS_PATH)
            .unwrap_or_default();
        for type_name in names {
            if registry.contains(&type_name) {
                context.type_names.push(type_name);
            } else {
                context.record(
                    MigrationLogRecord::error(format!("Migrator type {type_name} was not found"))
                        .with_migrator(type_name.clone(), None),
                );
            }
        }
        debug!(migrators = ?context.type_names, "collector initialised");
        context
    }

    /// Instantiate every resolved migrator. Construction failures are recorded and skipped.
    pub fn migrators(&mut self) -> Vec<(String, Box<dyn Migrator>)> {
        let mut migrators = Vec::with_capacity(self.type_names.len());
        for type_name in self.type_names.clone() {
            let settings = &self.settings;
            let registry = self.registry;
            match guard(|| registry.create(&type_name, settings).map_err(anyhow::Error::from)) {
                Ok(migrator) => migrators.push((type_name, migrator)),
                Err(failure) => {
                    let mut record = MigrationLogRecord::error(failure.message)
                        .with_migrator(type_name.clone(), None);
                    record.error_stack_trace = failure.detail;
                    self.record(record);
                }
            }
        }
        migrators
    }

    /// Template settings.
    pub fn settings(&self) -> &MigratorSettings {
        &self.settings
    }

    /// Append an error record.
    pub fn record(&mut self, record: MigrationLogRecord) {
        let mut ctx = LogContext::new();
        if let Some(migrator) = record.migrator_type_name.as_deref() {
            ctx = ctx.with_migrator(migrator);
        }
        if let Some(resource) = record.resource_code.as_deref() {
            ctx = ctx.with_resource(resource);
        }
        rk_warn!(
            context = ctx,
            "collector error recorded: {}",
            record.error_message.as_deref().unwrap_or("")
        );
        self.errors.push(record);
    }

    /// Append migrator log lines.
    pub fn log_lines(&mut self, lines: impl IntoIterator<Item = String>) {
        self.logs.extend(lines);
    }

    /// Errors recorded so far.
    pub fn errors(&self) -> &[MigrationLogRecord] {
        &self.errors
    }
}

/// A unit of work executed against one release's migrators.
pub trait Collector {
    /// Plain-data result.
    type Output;

    /// Compute the result. Plugin failures should be recorded on the context; an
    /// `Err` here aborts the result but is still captured by [`execute`].
    fn get_result(&mut self, context: &mut CollectorContext<'_>) -> anyhow::Result<Self::Output>;
}

/// Result of one collector run: whatever could be computed plus every failure.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorOutcome<T> {
    /// Set when `get_result` completed.
    pub result: Option<T>,
    /// Load, query, and execution errors in the order they occurred.
    pub errors: Vec<MigrationLogRecord>,
    /// Lines produced by migrators.
    pub logs: Vec<String>,
}

/// Initialize a context for `configuration` and run the collector inside the failure
/// boundary. Never panics and never returns an error.
pub fn execute<C: Collector>(
    mut collector: C,
    registry: &MigratorRegistry,
    configuration: &str,
) -> CollectorOutcome<C::Output> {
    let mut context = CollectorContext::initialize(registry, configuration);
    let result = match guard(|| collector.get_result(&mut context)) {
        Ok(value) => Some(value),
        Err(failure) => {
            let mut record = MigrationLogRecord::error(failure.message);
            record.error_stack_trace = failure.detail;
            context.record(record);
            None
        }
    };
    CollectorOutcome {
        result,
        errors: context.errors,
        logs: context.logs,
    }
}
