use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Binary isolated from any user or working-directory config
fn subforge(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("subforge").unwrap();
    cmd.current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .env_remove("SUBFORGE_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

const WORDS: &str = r#"[
    {"text": "Hello", "start_ms": 0, "end_ms": 400},
    {"text": "there", "start_ms": 450, "end_ms": 900},
    {"text": "friends", "start_ms": 2600, "end_ms": 3100}
]"#;

#[test]
fn test_styles_lists_presets() {
    let dir = TempDir::new().unwrap();
    subforge(&dir)
        .arg("styles")
        .assert()
        .success()
        .stdout(predicate::str::contains("instagram_classic"))
        .stdout(predicate::str::contains("gaming"));
}

#[test]
fn test_styles_json() {
    let dir = TempDir::new().unwrap();
    let output = subforge(&dir).args(["styles", "--json"]).output().unwrap();
    assert!(output.status.success());

    let styles: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let styles = styles.as_array().unwrap();
    assert_eq!(styles.len(), 5);
    assert_eq!(styles[0]["id"], "instagram_classic");
}

#[test]
fn test_classify_vertical() {
    let dir = TempDir::new().unwrap();
    subforge(&dir)
        .args(["classify", "--width", "1080", "--height", "1920"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"orientation\": \"vertical\""));
}

#[test]
fn test_classify_reports_line_width_inside_safe_area() {
    let dir = TempDir::new().unwrap();
    let output = subforge(&dir)
        .args(["classify", "--width", "1920", "--height", "1080"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let geometry: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let layout = &geometry["layout"];
    let line_width = layout["max_line_width"].as_u64().unwrap();
    let safe = layout["safe_margin"].as_u64().unwrap();
    assert_eq!(safe, 54);
    assert!(line_width > 0);
    assert!(line_width + 2 * safe <= 1920);
}

#[test]
fn test_classify_rejects_zero_width() {
    let dir = TempDir::new().unwrap();
    subforge(&dir)
        .args(["classify", "--width", "0", "--height", "1080"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid video dimensions"));
}

#[test]
fn test_render_writes_ass_script() {
    let dir = TempDir::new().unwrap();
    let words = dir.path().join("talk.words.json");
    std::fs::write(&words, WORDS).unwrap();
    let output = dir.path().join("subs").join("talk.ass");

    subforge(&dir)
        .arg("render")
        .arg("--words")
        .arg(&words)
        .args(["--style", "gaming", "--width", "1080", "--height", "1920"])
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let script = std::fs::read_to_string(&output).unwrap();
    assert!(script.starts_with("[Script Info]"));
    assert!(script.contains("Style: gaming,"));
    assert_eq!(script.lines().filter(|l| l.starts_with("Dialogue:")).count(), 2);
}

#[test]
fn test_render_highlight_color_override() {
    let dir = TempDir::new().unwrap();
    let words = dir.path().join("talk.words.json");
    std::fs::write(&words, WORDS).unwrap();
    let output = dir.path().join("talk.ass");

    subforge(&dir)
        .arg("render")
        .arg("--words")
        .arg(&words)
        .args(["--width", "1080", "--height", "1920", "--highlight-color", "#4A90E2"])
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let script = std::fs::read_to_string(&output).unwrap();
    assert!(script.contains("&H00E2904A"));
}

#[test]
fn test_render_rejects_bad_color() {
    let dir = TempDir::new().unwrap();
    subforge(&dir)
        .args(["render", "--words", "w.json", "--width", "1080", "--height", "1920"])
        .args(["--output", "out.ass", "--highlight-color", "green"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a color"));
}

#[test]
fn test_render_srt() {
    let dir = TempDir::new().unwrap();
    let words = dir.path().join("talk.words.json");
    std::fs::write(&words, WORDS).unwrap();
    let output = dir.path().join("talk.srt");

    subforge(&dir)
        .arg("render")
        .arg("--words")
        .arg(&words)
        .args(["--width", "1920", "--height", "1080", "--format", "srt"])
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let srt = std::fs::read_to_string(&output).unwrap();
    assert!(srt.starts_with("1\n00:00:00,000 --> "));
    assert!(srt.contains("Hello there"));
}

#[test]
fn test_render_unknown_style_fails() {
    let dir = TempDir::new().unwrap();
    let words = dir.path().join("talk.words.json");
    std::fs::write(&words, WORDS).unwrap();

    subforge(&dir)
        .arg("render")
        .arg("--words")
        .arg(&words)
        .args(["--style", "vaporwave", "--width", "1080", "--height", "1920"])
        .args(["--output", "out.ass"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown style: vaporwave"));
}

#[test]
fn test_config_reads_local_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("subforge.toml"), "[cues]\nsilence_break_ms = 900\n").unwrap();

    subforge(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("silence_break_ms = 900"));
}

#[test]
fn test_startup_logs_config_source_and_env_overrides() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("subforge.toml"), "[cues]\nsilence_break_ms = 900\n").unwrap();

    subforge(&dir)
        .env("SUBFORGE_MAX_WORKERS", "3")
        .args(["--log-level", "info", "config"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Loaded configuration from"))
        .stderr(predicate::str::contains("SUBFORGE_MAX_WORKERS"));
}
