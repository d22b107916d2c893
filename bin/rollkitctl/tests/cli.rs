//! ---
//! rk_section: "07-operator-interfaces"
//! rk_subsection: "integration-tests"
//! rk_type: "source"
//! rk_scope: "code"
//! rk_description: "End-to-end checks for the rollkitctl binary."
//! rk_version: "v0.0.0-prealpha"
//! rk_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let config = root.join("rollkit.toml");
        fs::write(
            &config,
            format!(
                "[logging]\ndirectory = {:?}\nformat = \"pretty\"\n\n[sandbox]\nmode = \"in-process\"\ncollector_timeout = 30\n\n[store]\npath = {:?}\naudit_log = {:?}\n\n[cluster]\nnodes = [\"node-1\"]\n",
                root.join("logs").display().to_string(),
                root.join("cluster.json").display().to_string(),
                root.join("audit.log").display().to_string(),
            ),
        )
        .unwrap();
        Self { dir, config }
    }

    fn settings(&self, points: &[&str]) -> PathBuf {
        let path = self.dir.path().join(format!("settings-{}.yaml", points.len()));
        let markers = self.dir.path().join("markers").display().to_string();
        let points = points
            .iter()
            .map(|p| format!("{p:?}"))
            .collect::<Vec<_>>()
            .join(", ");
        let storage = format!(
            "[rollkit]\nmigrators = [\"file-marker\"]\n\n[file_marker]\ndirectory = {markers:?}\npoints = [{points}]\nresources = [\"orders\"]\n"
        );
        let yaml = serde_json::json!({
            "node_templates": [{
                "code": "worker",
                "name": "Worker",
                "package_requirements": [{ "id": "core" }],
                "minimum_required_instances": 1
            }],
            "migrator_templates": [{
                "code": "storage",
                "name": "Storage",
                "configuration": storage,
                "package_requirements": [{ "id": "core" }]
            }],
            "packages": [{ "id": "core", "version": "1.0.0" }]
        });
        fs::write(&path, serde_yaml::to_string(&yaml).unwrap()).unwrap();
        path
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("rollkitctl").unwrap();
        cmd.env_remove("ROLLKIT_CONFIG")
            .env("ROLLKIT_ACTOR", "ci")
            .arg("--config")
            .arg(&self.config);
        cmd
    }

    fn json(&self, args: &[&str]) -> Value {
        let output = self.cmd().args(args).assert().success().get_output().stdout.clone();
        serde_json::from_slice(&output).unwrap()
    }
}

fn marker(dir: &Path) -> Option<String> {
    fs::read_to_string(dir.join("markers").join("orders"))
        .ok()
        .map(|text| text.trim().to_owned())
}

#[test]
fn bootstraps_and_settles_a_release() {
    let ws = Workspace::new();
    let settings = ws.settings(&["v1"]);
    let created = ws.json(&[
        "configuration",
        "create",
        "--name",
        "r1",
        "--settings",
        settings.to_str().unwrap(),
    ]);
    let id = created["id"].as_u64().unwrap().to_string();

    let checked = ws.json(&["configuration", "check", &id]);
    assert_eq!(checked, Value::Array(Vec::new()));

    let ready = ws.json(&["configuration", "ready", &id]);
    assert_eq!(ready["state"], "ready");

    let state = ws.json(&["configuration", "bootstrap", &id]);
    assert_eq!(state["can_create_migration"], false);
    assert_eq!(state["can_migrate_resources"], true);

    let records = ws.json(&["migration", "resources", "storage/file-marker/orders"]);
    assert_eq!(records.as_array().unwrap().len(), 1);
    assert_eq!(records[0]["destination_point"], "v1");
    assert_eq!(marker(ws.dir.path()).as_deref(), Some("v1"));

    let state = ws.json(&["state"]);
    assert_eq!(state["can_create_migration"], true);

    let audit = fs::read_to_string(ws.dir.path().join("audit.log")).unwrap();
    assert!(audit.contains("configuration.created"));
    assert!(audit.contains("\"ci\""));
}

#[test]
fn declined_commands_exit_with_failure() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["migration", "finish"])
        .assert()
        .failure();
    ws.cmd()
        .args(["migration", "resources", "not-an-address"])
        .assert()
        .failure();
}

#[test]
fn missing_config_is_reported() {
    let ws = Workspace::new();
    Command::cargo_bin("rollkitctl")
        .unwrap()
        .env_remove("ROLLKIT_CONFIG")
        .current_dir(ws.dir.path())
        .args(["--config", "absent.toml", "state"])
        .assert()
        .failure();
}
