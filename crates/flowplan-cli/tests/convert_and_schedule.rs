//! End-to-end tests that invoke the compiled `flowplan` binary.

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn flowplan_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("target/debug/flowplan")
}

const SAMPLE_PROJECT: &str = r#"{
  "version": "1.0",
  "exportedAt": "2026-01-01T00:00:00Z",
  "tasks": [
    {"id": "a", "text": "Design", "start": "2026-01-01", "duration": 3, "type": "task"},
    {"id": "b", "text": "Build", "duration": 2, "type": "task"}
  ],
  "links": [
    {"id": "l1", "source": "a", "target": "b", "type": "e2s"}
  ]
}"#;

#[test]
fn schedule_command_reports_propagated_dates() {
    let dir = tempdir().unwrap();
    let project_file = dir.path().join("project.json");
    fs::write(&project_file, SAMPLE_PROJECT).unwrap();

    let output = Command::new(flowplan_binary())
        .args(["schedule", "--project-start", "2026-01-01"])
        .arg(&project_file)
        .output()
        .expect("failed to run flowplan schedule");

    assert!(output.status.success(), "schedule should succeed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Design"));
    assert!(stdout.contains("Build"));
}

#[test]
fn critical_path_command_marks_both_tasks_critical_on_a_single_chain() {
    let dir = tempdir().unwrap();
    let project_file = dir.path().join("project.json");
    fs::write(&project_file, SAMPLE_PROJECT).unwrap();

    let output = Command::new(flowplan_binary())
        .args(["critical-path", "--project-start", "0"])
        .arg(&project_file)
        .output()
        .expect("failed to run flowplan critical-path");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("CRITICAL").count(), 2);
}

#[test]
fn convert_round_trips_json_to_csv_and_back() {
    let dir = tempdir().unwrap();
    let project_file = dir.path().join("project.json");
    fs::write(&project_file, SAMPLE_PROJECT).unwrap();
    let csv_file = dir.path().join("project.csv");

    let to_csv = Command::new(flowplan_binary())
        .args(["convert", "--from", "json", "--to", "csv", "-o"])
        .arg(&csv_file)
        .arg(&project_file)
        .output()
        .expect("failed to run flowplan convert to csv");
    assert!(to_csv.status.success());

    let csv_content = fs::read_to_string(&csv_file).unwrap();
    assert!(csv_content.contains("Design"));
    assert!(csv_content.contains("Build"));

    let json_file = dir.path().join("roundtrip.json");
    let to_json = Command::new(flowplan_binary())
        .args(["convert", "--from", "csv", "--to", "json", "-o"])
        .arg(&json_file)
        .arg(&csv_file)
        .output()
        .expect("failed to run flowplan convert to json");
    assert!(to_json.status.success());

    let json_content = fs::read_to_string(&json_file).unwrap();
    assert!(json_content.contains("\"id\": \"a\""));
}
