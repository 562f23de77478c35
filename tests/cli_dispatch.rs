use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use uuid::Uuid;

const NOW: &str = "2024-06-30T12:00:00Z";

fn unique_workspace(prefix: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("{prefix}-{}", Uuid::now_v7()));
    std::fs::create_dir_all(&path).expect("workspace should be creatable");
    path
}

fn run_croplog(db_path: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_croplog"))
        .arg("--db")
        .arg(db_path)
        .arg("--now")
        .arg(NOW)
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("CROPLOG_LOG")
        .output()
        .expect("croplog command should run")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "expected success but failed.\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn assert_failure(output: &Output) {
    assert!(
        !output.status.success(),
        "expected failure but command succeeded.\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn parse_created_id(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .split_whitespace()
        .nth(1)
        .expect("created output should include id")
        .to_string()
}

fn parse_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be json")
}

#[test]
fn farm_crop_recommend_apply_round_trip() {
    let root = unique_workspace("croplog-cli-flow");
    let db = root.join(".croplog/state.sqlite");

    let farm = run_croplog(&db, &["farm", "add", "North", "--code", "N1"]);
    assert_success(&farm);
    let farm_id = parse_created_id(&farm);
    assert!(farm_id.starts_with("farm-"));

    let crop = run_croplog(
        &db,
        &[
            "crop",
            "add",
            "wheat",
            "--farm",
            &farm_id,
            "--planted",
            "2024-06-27",
            "--area",
            "4",
        ],
    );
    assert_success(&crop);
    let crop_id = parse_created_id(&crop);
    assert!(String::from_utf8_lossy(&crop.stdout).contains("Wheat"));

    let feed = run_croplog(&db, &["recommend", "--crop", &crop_id, "--json"]);
    assert_success(&feed);
    let feed = parse_json(&feed);
    let items = feed["items"].as_array().expect("items array");
    assert!(!items.is_empty());
    assert!(items.iter().all(|item| item["crop_id"] == crop_id.as_str()));
    assert_eq!(items[0]["priority"], "high");

    let recommendation_id = format!("{crop_id}:fertilizer:npk-20-20-0");
    let apply = run_croplog(&db, &["apply", &recommendation_id, "-q", "40", "-u", "kg"]);
    assert_success(&apply);
    assert!(String::from_utf8_lossy(&apply.stdout).contains("NPK 20-20-0"));

    let apps = run_croplog(&db, &["app", "ls", "--crop", &crop_id, "--json"]);
    assert_success(&apps);
    let apps = parse_json(&apps);
    let apps = apps.as_array().expect("applications array");
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0]["date"], "2024-06-30");
    assert_eq!(apps[0]["treatment_type"], "fertilizer");

    let activity = run_croplog(&db, &["activity", "--json"]);
    assert_success(&activity);
    let activity = parse_json(&activity);
    assert_eq!(
        activity[0]["message"],
        "Applied fertilizer: NPK 20-20-0 to Wheat"
    );

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn errors_exit_non_zero_with_message() {
    let root = unique_workspace("croplog-cli-errors");
    let db = root.join(".croplog/state.sqlite");

    let missing = run_croplog(&db, &["crop", "rm", "crop-none"]);
    assert_failure(&missing);
    let stderr = String::from_utf8_lossy(&missing.stderr);
    assert!(stderr.contains("error: crop 'crop-none' not found"), "{stderr}");

    let bad_type = run_croplog(
        &db,
        &[
            "app", "add", "-c", "crop-none", "--type", "compost", "-p", "Mulch", "-q", "1", "-u",
            "kg",
        ],
    );
    assert_failure(&bad_type);

    let bad_setting = run_croplog(&db, &["config", "set", "urgent_limit", "0"]);
    assert_failure(&bad_setting);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn stage_and_knowledge_do_not_need_a_database() {
    let root = unique_workspace("croplog-cli-nodb");
    let db = root.join("never/created.sqlite");

    let stage = run_croplog(&db, &["stage", "2024-05-01", "--json"]);
    assert_success(&stage);
    let stage = parse_json(&stage);
    assert_eq!(stage["days_since_planting"], 60);
    assert_eq!(stage["stage"], "flowering");

    let knowledge = run_croplog(&db, &["knowledge", "rice", "--json"]);
    assert_success(&knowledge);
    let knowledge = parse_json(&knowledge);
    assert_eq!(knowledge[0]["id"], "rice");

    assert_failure(&run_croplog(&db, &["knowledge", "cassava"]));
    assert!(!db.exists());

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn config_get_reports_settings_and_storage() {
    let root = unique_workspace("croplog-cli-config");
    let db = root.join(".croplog/state.sqlite");

    assert_success(&run_croplog(&db, &["config", "set", "activity-limit", "5"]));
    let config = run_croplog(&db, &["config", "get", "--json"]);
    assert_success(&config);
    let config = parse_json(&config);
    assert_eq!(config["settings"]["activity_limit"], 5);
    assert_eq!(config["settings"]["urgent_limit"], 3);
    assert_eq!(
        config["collections"].as_array().map(Vec::len),
        Some(5)
    );

    let _ = std::fs::remove_dir_all(root);
}
