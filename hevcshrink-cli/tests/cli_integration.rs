use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use std::error::Error;
use tempfile::tempdir;

fn hevcshrink_cmd() -> Command {
    let mut cmd = Command::cargo_bin("hevcshrink").expect("Failed to find hevcshrink binary");
    cmd.env_remove("HEVCSHRINK_MULTIPLIER").env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_nonexistent_directory_fails() -> Result<(), Box<dyn Error>> {
    let root = tempdir()?;
    let missing = root.path().join("surely_not_here");

    hevcshrink_cmd()
        .arg("encode")
        .arg(&missing)
        .arg("--non-interactive")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Error:").and(contains("not found")));

    assert!(!missing.exists());
    Ok(())
}

#[test]
fn test_missing_directory_non_interactive_fails() {
    hevcshrink_cmd()
        .args(["encode", "--non-interactive"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("No directory given"));
}

#[test]
fn test_out_of_range_multiplier_rejected() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;

    hevcshrink_cmd()
        .arg("encode")
        .arg(dir.path())
        .args(["--multiplier", "20", "--non-interactive"])
        .assert()
        .failure()
        .stderr(contains("multiplier"));

    Ok(())
}

#[test]
fn test_multiplier_from_environment_is_validated() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;

    hevcshrink_cmd()
        .env("HEVCSHRINK_MULTIPLIER", "0.01")
        .arg("encode")
        .arg(dir.path())
        .arg("--non-interactive")
        .assert()
        .failure();

    Ok(())
}

#[test]
fn test_empty_directory_succeeds_with_zero_summary() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;

    hevcshrink_cmd()
        .arg("encode")
        .arg(dir.path())
        .arg("--non-interactive")
        .assert()
        .success()
        .stdout(contains("SUMMARY").and(contains("Encoded")).and(contains("No video files found")));

    let logs: Vec<_> = std::fs::read_dir(dir.path().join("logs"))?.collect::<Result<_, _>>()?;
    assert_eq!(logs.len(), 1);
    let name = logs[0].file_name().to_string_lossy().into_owned();
    assert!(name.starts_with("hevcshrink_run_") && name.ends_with(".log"));

    Ok(())
}

#[test]
fn test_json_summary_written() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let logs = tempdir()?;
    let summary_path = logs.path().join("reports").join("summary.json");

    hevcshrink_cmd()
        .arg("encode")
        .arg(dir.path())
        .args(["--multiplier", "0.5", "--non-interactive", "--log-dir"])
        .arg(logs.path())
        .arg("--json-summary")
        .arg(&summary_path)
        .assert()
        .success();

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&summary_path)?)?;
    assert_eq!(value["encoded"], 0);
    assert_eq!(value["failed"], 0);
    assert_eq!(value["multiplier"], 0.5);
    assert!(!dir.path().join("logs").exists());

    Ok(())
}

#[test]
fn test_ask_policy_without_terminal_keeps_originals() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;

    hevcshrink_cmd()
        .arg("encode")
        .arg(dir.path())
        .args(["--delete-originals", "ask", "--non-interactive"])
        .assert()
        .success()
        .stdout(contains("originals will be kept"));

    Ok(())
}

#[test]
fn test_unknown_encoder_rejected() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;

    hevcshrink_cmd()
        .arg("encode")
        .arg(dir.path())
        .args(["--encoder", "h264_magic", "--non-interactive"])
        .assert()
        .failure()
        .stderr(contains("Unknown encoder"));

    Ok(())
}

#[test]
fn test_missing_tools_fail_files_but_complete_the_run() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let empty_path = tempdir()?;
    let logs = tempdir()?;
    let summary_path = logs.path().join("summary.json");
    std::fs::write(dir.path().join("clip.mp4"), b"not really a video")?;
    std::fs::write(dir.path().join("other.mkv"), b"not really a video")?;

    hevcshrink_cmd()
        .env("PATH", empty_path.path())
        .arg("encode")
        .arg(dir.path())
        .args(["--non-interactive", "--log-dir"])
        .arg(logs.path())
        .arg("--json-summary")
        .arg(&summary_path)
        .assert()
        .success()
        .stdout(contains("SUMMARY"));

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&summary_path)?)?;
    assert_eq!(value["failed"], 2);
    assert_eq!(value["encoded"], 0);
    assert_eq!(value["failures"][0]["kind"], "probe");
    assert_eq!(value["failures"][1]["kind"], "probe");
    assert!(dir.path().join("clip.mp4").exists());

    Ok(())
}

#[test]
fn test_multiplier_preset_name_accepted() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let logs = tempdir()?;
    let summary_path = logs.path().join("summary.json");

    hevcshrink_cmd()
        .arg("encode")
        .arg(dir.path())
        .args(["--multiplier", "lowest", "--non-interactive", "--log-dir"])
        .arg(logs.path())
        .arg("--json-summary")
        .arg(&summary_path)
        .assert()
        .success();

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&summary_path)?)?;
    assert_eq!(value["multiplier"], 0.25);
    assert_eq!(value["cancelled"], false);

    Ok(())
}
