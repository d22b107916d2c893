//! ---
//! rk_section: "15-testing-qa-runbook"
//! rk_subsection: "integration-tests"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "Repository-wide checks on shipped configuration and source headers."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use rollkit_common::{AppConfig, SandboxMode};
use rollkit_model::ConfigurationSettings;
use rollkit_orchestrator::check_configuration;
use walkdir::WalkDir;

fn root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..")
}

fn read(path: &str) -> String {
    let full = root().join(path);
    fs::read_to_string(&full)
        .unwrap_or_else(|err| panic!("failed to read {}: {}", full.display(), err))
}

#[test]
fn default_config_parses() {
    let config: AppConfig = read("configs/rollkit.toml").parse().unwrap();
    assert_eq!(config.sandbox.mode, SandboxMode::Process);
    assert_eq!(config.sandbox.worker_command, "rollkit-worker");
    assert!(!config.cluster.nodes.is_empty());
}

#[test]
fn sample_release_is_valid() {
    let settings: ConfigurationSettings =
        serde_yaml::from_str(&read("configs/release-sample.yaml")).unwrap();
    let mut configuration = rollkit_model::Configuration::draft(1, "sample", settings);
    assert_eq!(check_configuration(&configuration), Vec::new());

    configuration.settings.packages.clear();
    assert!(!check_configuration(&configuration).is_empty());
}

#[test]
fn rust_sources_carry_frontmatter() {
    for dir in ["crates", "bin", "tests"] {
        for entry in WalkDir::new(root().join(dir))
            .into_iter()
            .filter_entry(|e| e.file_name() != "target")
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        {
            let content = fs::read_to_string(entry.path()).unwrap();
            assert!(
                content.starts_with("//! ---"),
                "{} must include frontmatter header",
                entry.path().display()
            );
            assert!(
                content.contains("rk_section:"),
                "{} must declare rk_section",
                entry.path().display()
            );
        }
    }
}
