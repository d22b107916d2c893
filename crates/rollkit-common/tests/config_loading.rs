//! ---
//! rk_section: "01-core-functionality"
//! rk_subsection: "integration-tests"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Configuration loading from candidate paths."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use std::fs;

use rollkit_common::config::{AppConfig, SandboxMode};
use tempfile::tempdir;

#[test]
fn first_existing_candidate_wins() {
    let dir = tempdir().expect("tempdir");
    let missing = dir.path().join("missing.toml");
    let present = dir.path().join("rollkit.toml");
    fs::write(
        &present,
        "[sandbox]\nmode = \"in-process\"\n[store]\npath = \"state/cluster.json\"\n",
    )
    .expect("write config");

    let loaded = AppConfig::load_with_source(&[missing, present.clone()]).expect("config loads");
    assert_eq!(loaded.source, present);
    assert_eq!(loaded.config.sandbox.mode, SandboxMode::InProcess);
    assert!(loaded.config.store.path.ends_with("cluster.json"));
}

#[test]
fn no_candidates_reports_inspected_paths() {
    let dir = tempdir().expect("tempdir");
    let missing = dir.path().join("nowhere.toml");
    let err = AppConfig::load(&[missing]).expect_err("nothing to load");
    assert!(err.to_string().contains("nowhere.toml"));
}
