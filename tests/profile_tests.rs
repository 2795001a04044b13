//! Tests for loading and saving deployment profiles

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use appdeploy::{DeployError, DeploymentProfile};

#[test]
fn test_save_then_load_keeps_profile() {
    let temp = TempDir::new().expect("tempdir should succeed");
    let path = temp.path().join("profile.json");
    let mut profile = DeploymentProfile::default();
    profile.app.version = "3.0.20".to_string();
    profile.files_dir = temp.path().join("Files");
    profile.support_files_dir = temp.path().join("SupportFiles");

    profile.save_to_file(&path).expect("save should succeed");
    let loaded = DeploymentProfile::load_from_file(&path).expect("load should succeed");

    assert_eq!(loaded, profile);
}

#[test]
fn test_partial_profile_uses_defaults_and_resolves_dirs() {
    let temp = TempDir::new().expect("tempdir should succeed");
    let path = temp.path().join("profile.json");
    fs::write(
        &path,
        r#"{ "app": { "version": "3.0.21" }, "close_apps": ["vlc", "vlc-cache-gen"] }"#,
    )
    .expect("write should succeed");

    let loaded = DeploymentProfile::load_from_file(&path).expect("load should succeed");

    assert_eq!(loaded.app.name, "VLC media player");
    assert_eq!(loaded.close_apps, vec!["vlc", "vlc-cache-gen"]);
    assert_eq!(loaded.files_dir, temp.path().join("Files"));
    assert_eq!(loaded.support_files_dir, temp.path().join("SupportFiles"));
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_invalid_json_is_profile_error() {
    let temp = TempDir::new().expect("tempdir should succeed");
    let path = temp.path().join("profile.json");
    fs::write(&path, "{ not json").expect("write should succeed");

    let err = DeploymentProfile::load_from_file(&path).expect_err("load should fail");
    assert!(matches!(err, DeployError::Profile(_)));
    assert!(err.to_string().contains("Failed to parse profile JSON"));
}

#[test]
fn test_missing_file_is_profile_error() {
    let err = DeploymentProfile::load_from_file(PathBuf::from("/no/such/profile.json"))
        .expect_err("load should fail");
    assert!(matches!(err, DeployError::Profile(_)));
}

#[test]
fn test_empty_installer_path_fails_validation() {
    let temp = TempDir::new().expect("tempdir should succeed");
    let path = temp.path().join("profile.json");
    fs::write(&path, r#"{ "installer": { "path": "", "args": [] } }"#)
        .expect("write should succeed");

    let loaded = DeploymentProfile::load_from_file(&path).expect("load should succeed");
    assert!(loaded.validate().is_err());
}
