//! End-to-end tests for the appdeploy binary
//!
//! These tests verify:
//! - Invalid requests are rejected before anything loads
//! - Setup failures exit with the environment-load code and run no step
//! - A dry-run uninstall of an absent application succeeds

use std::fs;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

use appdeploy::{DeploymentProfile, DeploymentType, ExitStatus};

fn appdeploy(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_appdeploy"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .output()
        .expect("appdeploy should start")
}

/// Exit code as the parent process sees it
fn observed(code: i32) -> i32 {
    if cfg!(windows) { code } else { code & 0xff }
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_profile(dir: &Path, profile: &DeploymentProfile) -> String {
    let path = dir.join("profile.json");
    profile.save_to_file(&path).expect("save should succeed");
    path.to_string_lossy().into_owned()
}

// ============================================================================
// Request validation
// ============================================================================

#[test]
fn test_invalid_deployment_type_exits_unhandled_fatal() {
    let output = appdeploy(&["--deployment-type", "Repair", "--disable-logging"]);

    assert_eq!(
        output.status.code(),
        Some(observed(ExitStatus::UnhandledFatal.code()))
    );
    let err = stderr(&output);
    assert!(err.contains("Invalid deployment type 'Repair'"));
    assert!(!err.contains("Executing"));
}

// ============================================================================
// Environment load failures
// ============================================================================

#[test]
fn test_missing_profile_exits_environment_load_failed() {
    let temp = TempDir::new().expect("tempdir should succeed");
    let missing = temp.path().join("missing.json");

    let output = appdeploy(&[
        "--profile",
        &missing.to_string_lossy(),
        "--deploy-mode",
        "Silent",
        "--disable-logging",
    ]);

    assert_eq!(
        output.status.code(),
        Some(observed(ExitStatus::EnvironmentLoadFailed.code()))
    );
    let err = stderr(&output);
    assert!(err.contains("Profile error"));
    assert!(!err.contains("Executing"));
    assert!(!err.contains("in progress"));
}

#[cfg(unix)]
#[test]
fn test_truncated_exit_code_is_reported_in_full() {
    let output = appdeploy(&["--profile", "/definitely/not/here.json", "--disable-logging"]);
    assert!(stderr(&output).contains("Exit code 60008 is reported as 104"));
}

#[test]
fn test_invalid_profile_exits_environment_load_failed() {
    let temp = TempDir::new().expect("tempdir should succeed");
    let path = temp.path().join("profile.json");
    fs::write(&path, "{ not json").expect("write should succeed");

    let output = appdeploy(&["--profile", &path.to_string_lossy(), "--disable-logging"]);

    assert_eq!(
        output.status.code(),
        Some(observed(ExitStatus::EnvironmentLoadFailed.code()))
    );
}

#[test]
fn test_missing_package_files_is_logged_and_fails_setup() {
    let temp = TempDir::new().expect("tempdir should succeed");
    let mut profile = DeploymentProfile::default();
    profile.files_dir = temp.path().join("Files");
    profile.support_files_dir = temp.path().join("SupportFiles");
    let profile_path = write_profile(temp.path(), &profile);
    let log_dir = temp.path().join("logs");

    let output = appdeploy(&[
        "--profile",
        &profile_path,
        "--deploy-mode",
        "Silent",
        "--log-dir",
        &log_dir.to_string_lossy(),
    ]);

    assert_eq!(
        output.status.code(),
        Some(observed(ExitStatus::EnvironmentLoadFailed.code()))
    );
    let log = fs::read_to_string(log_dir.join(profile.log_file_name(DeploymentType::Install)))
        .expect("log file should exist");
    assert!(log.contains("package files directory"));
    assert!(!log.contains("Executing"));
}

// ============================================================================
// Successful runs
// ============================================================================

#[test]
fn test_dry_run_uninstall_of_absent_application_succeeds() {
    let temp = TempDir::new().expect("tempdir should succeed");
    let mut profile = DeploymentProfile::default();
    profile.files_dir = temp.path().join("Files");
    profile.support_files_dir = temp.path().join("SupportFiles");
    let profile_path = write_profile(temp.path(), &profile);

    let output = appdeploy(&[
        "--profile",
        &profile_path,
        "--deployment-type",
        "uninstall",
        "--deploy-mode",
        "Silent",
        "--disable-logging",
        "--dry-run",
    ]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
}
