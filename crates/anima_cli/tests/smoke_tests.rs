//! CLI smoke tests: basic binary behavior.

use std::process::Command;

fn cli_bin(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_anima"));
    cmd.current_dir(dir.path())
        .env_remove("ANIMA_WORKSPACE")
        .env_remove("ANIMA_CANVAS_ROOT")
        .env_remove("ANIMA_CONFIG")
        .arg("--workspace")
        .arg(dir.path().join("workspace"))
        .arg("--canvas-root")
        .arg(dir.path().join("canvas"));
    cmd
}

#[test]
fn test_help_flag() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = cli_bin(&dir).arg("--help").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "Expected usage info in --help output");
}

#[test]
fn test_version_flag() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = cli_bin(&dir).arg("--version").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("anima"), "Expected binary name in --version output");
}

#[test]
fn test_parse_prints_json() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = cli_bin(&dir)
        .args(["parse", "hello [[emotion: name=joy]] [[audio_as_voice]]"])
        .output()
        .expect("failed to run");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["cleanedText"], "hello");
    assert_eq!(value["audioAsVoice"], true);
    assert_eq!(value["directives"][0]["fields"]["name"], "joy");
    assert!(!dir.path().join("workspace").exists());
}

#[test]
fn test_init_then_process() {
    let dir = tempfile::TempDir::new().unwrap();
    let init = cli_bin(&dir).arg("init").output().expect("failed to run");
    assert!(init.status.success());
    assert!(dir.path().join("workspace/emotion-state.json").exists());

    let output = cli_bin(&dir)
        .args(["process", "I feel happy today [[emotion: name=joy|valence=0.8|arousal=0.5]]"])
        .output()
        .expect("failed to run");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "I feel happy today");

    let raw = std::fs::read_to_string(dir.path().join("canvas/persona-canvas.json")).unwrap();
    let canvas: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(canvas["emotion"]["primary"], "joy");
}

#[test]
fn test_missing_config_falls_back_to_defaults() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = cli_bin(&dir)
        .arg("--config")
        .arg(dir.path().join("nonexistent.toml"))
        .arg("snapshot")
        .env("RUST_LOG", "info")
        .output()
        .expect("failed to run");
    assert!(output.status.success());
    assert!(dir.path().join("canvas/persona-canvas.json").exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("using defaults"), "Expected fallback notice in logs: {}", stderr);
}
