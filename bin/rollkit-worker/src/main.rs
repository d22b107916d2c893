//! ---
//! rk_section: "07-operator-interfaces"
//! rk_subsection: "binary"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Sandbox worker process for collector requests."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
//! Reads one JSON sandbox request from stdin and writes one JSON response to
//! stdout. Logs go to stderr; stdout carries nothing but the response.
use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use rollkit_migrator::{serve_json, MigratorRegistry};
use tracing::debug;

fn main() -> Result<()> {
    rollkit_logging::init_stderr();

    let mut request = String::new();
    io::stdin()
        .read_to_string(&mut request)
        .context("unable to read sandbox request from stdin")?;
    debug!(bytes = request.len(), "sandbox request received");

    let registry = MigratorRegistry::with_builtin();
    let response = serve_json(&registry, &request).context("unable to encode sandbox response")?;

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(response.as_bytes())
        .context("unable to write sandbox response")?;
    stdout.flush()?;
    Ok(())
}
