//! ---
//! rk_section: "03-persistence-logging"
//! rk_subsection: "module"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Structured logging adapters carrying migration context."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
/// Emit an informational log enriched with migration context.
#[macro_export]
macro_rules! rk_info {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::INFO,
            migration = ctx.migration.unwrap_or_default(),
            configuration = ctx.configuration.unwrap_or_default(),
            template = ctx.template.unwrap_or(""),
            migrator = ctx.migrator.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::rk_info!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit a debug log enriched with migration context.
#[macro_export]
macro_rules! rk_debug {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::DEBUG,
            migration = ctx.migration.unwrap_or_default(),
            configuration = ctx.configuration.unwrap_or_default(),
            template = ctx.template.unwrap_or(""),
            migrator = ctx.migrator.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::rk_debug!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit a warning log enriched with migration context.
#[macro_export]
macro_rules! rk_warn {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::WARN,
            migration = ctx.migration.unwrap_or_default(),
            configuration = ctx.configuration.unwrap_or_default(),
            template = ctx.template.unwrap_or(""),
            migrator = ctx.migrator.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::rk_warn!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit an error log enriched with migration context.
#[macro_export]
macro_rules! rk_error {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::ERROR,
            migration = ctx.migration.unwrap_or_default(),
            configuration = ctx.configuration.unwrap_or_default(),
            template = ctx.template.unwrap_or(""),
            migrator = ctx.migrator.unwrap_or(""),
            resource = ctx.resource.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::rk_error!(context = $crate::LogContext::default(), $($arg)+)
    }};
}
