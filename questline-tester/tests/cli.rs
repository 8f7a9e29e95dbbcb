use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "questline-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_questline-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(&output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("corrupt-save"));
    let _ = std::fs::remove_file(output_path);
}

#[test]
fn cli_runs_all_scenarios_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_questline-tester");
    let output_path = temp_path("run");
    let output = Command::new(exe)
        .args([
            "--report",
            "json",
            "--scenarios",
            "all",
            "--iterations",
            "2",
            "--seeds",
            "1,2",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Questline Automated Tester"));

    let report = std::fs::read_to_string(&output_path).expect("read report");
    let value: serde_json::Value = serde_json::from_str(&report).expect("json report");
    assert_eq!(value.as_array().map(Vec::len), Some(14));
    assert!(value.as_array().unwrap().iter().all(|r| r["passed"] == true));
    let _ = std::fs::remove_file(output_path);
}

#[test]
fn cli_file_saves_land_in_save_dir() {
    let exe = env!("CARGO_BIN_EXE_questline-tester");
    let save_dir = temp_path("saves");
    let output = Command::new(exe)
        .args(["--scenarios", "resume", "--iterations", "1", "--seeds", "3", "--save-dir"])
        .arg(&save_dir)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    assert!(save_dir.join("resume-3").join("istanbulMacerasi_save.json").exists());
    let _ = std::fs::remove_dir_all(save_dir);
}

#[test]
fn cli_config_file_sets_save_key() {
    let exe = env!("CARGO_BIN_EXE_questline-tester");
    let save_dir = temp_path("config-saves");
    let config = temp_path("config.json");
    std::fs::write(&config, r#"{ "save_key": "qa_slot" }"#).expect("write config");
    let output = Command::new(exe)
        .args(["--scenarios", "resume", "--iterations", "1", "--seeds", "4", "--config"])
        .arg(&config)
        .arg("--save-dir")
        .arg(&save_dir)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    assert!(save_dir.join("resume-4").join("qa_slot.json").exists());
    let _ = std::fs::remove_dir_all(save_dir);
    let _ = std::fs::remove_file(config);
}

#[test]
fn cli_fails_on_invalid_catalog() {
    let exe = env!("CARGO_BIN_EXE_questline-tester");
    let catalog = temp_path("catalog.json");
    std::fs::write(&catalog, r#"{ "themes": [] }"#).expect("write catalog");
    let output = Command::new(exe)
        .args(["--iterations", "1", "--catalog"])
        .arg(&catalog)
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid catalog"));
    let _ = std::fs::remove_file(catalog);
}
