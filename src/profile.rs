//! Deployment profile: everything that used to be a script-wide variable.
//!
//! A profile is built once at startup, either from the built-in defaults for
//! the media player or from a JSON file, and is never mutated afterwards.
//! Relative artifact paths resolve against `files_dir` / `support_files_dir`,
//! which in turn resolve against the directory the profile was loaded from.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::environment::ShortcutSpec;
use crate::error::{DeployError, Result};
use crate::types::DeploymentType;

/// Application metadata used for logging and log file naming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppInfo {
    pub vendor: String,
    pub name: String,
    pub version: String,
    pub arch: String,
    pub lang: String,
    pub revision: String,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            vendor: "VideoLAN".to_string(),
            name: "VLC media player".to_string(),
            version: "3.0.21".to_string(),
            arch: "x64".to_string(),
            lang: "EN".to_string(),
            revision: "01".to_string(),
        }
    }
}

impl AppInfo {
    /// "VideoLAN VLC media player 3.0.21"
    pub fn display_name(&self) -> String {
        format!("{} {} {}", self.vendor, self.name, self.version)
    }
}

/// The new installer and its silent switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerSpec {
    /// Relative paths resolve against `files_dir`
    pub path: PathBuf,
    pub args: Vec<String>,
}

/// A directory where a previous version may be installed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallLocation {
    pub dir: PathBuf,
    /// Uninstaller file name inside `dir`
    pub uninstaller: PathBuf,
    pub args: Vec<String>,
}

impl InstallLocation {
    pub fn uninstaller_path(&self) -> PathBuf {
        self.dir.join(&self.uninstaller)
    }
}

/// Machine-wide configuration seeded on install
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedConfig {
    pub dir: PathBuf,
    /// Relative paths resolve against `support_files_dir`
    pub files: Vec<PathBuf>,
}

/// Shortcuts left behind by the vendor installer's default layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleArtifacts {
    pub shortcut_folder: PathBuf,
    pub desktop_shortcut: PathBuf,
}

/// Immutable deployment configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentProfile {
    pub app: AppInfo,
    pub files_dir: PathBuf,
    pub support_files_dir: PathBuf,
    /// Process names (without extension) that must not run during deployment
    pub close_apps: Vec<String>,
    /// Free space needed for install; 0 disables the check
    pub required_disk_space_mb: u64,
    pub install_countdown_secs: Option<u64>,
    pub uninstall_countdown_secs: Option<u64>,
    /// Pause after uninstall so the distribution system's detection sees it
    pub uninstall_settle_secs: u64,
    /// Upper bound on any launched installer/uninstaller
    pub process_timeout_secs: Option<u64>,
    pub installer: InstallerSpec,
    pub install_locations: Vec<InstallLocation>,
    pub shared_config: SharedConfig,
    pub shortcut: ShortcutSpec,
    pub stale_artifacts: StaleArtifacts,
}

impl Default for DeploymentProfile {
    fn default() -> Self {
        let app = AppInfo::default();
        let start_menu = PathBuf::from(r"C:\ProgramData\Microsoft\Windows\Start Menu\Programs");
        let vlc_exe = PathBuf::from(r"C:\Program Files\VideoLAN\VLC\vlc.exe");

        Self {
            installer: InstallerSpec {
                path: PathBuf::from(format!("vlc-{}-win64.exe", app.version)),
                args: vec!["/L=1033".to_string(), "/S".to_string()],
            },
            app,
            files_dir: PathBuf::from("Files"),
            support_files_dir: PathBuf::from("SupportFiles"),
            close_apps: vec!["vlc".to_string()],
            required_disk_space_mb: 500,
            install_countdown_secs: None,
            uninstall_countdown_secs: Some(60),
            uninstall_settle_secs: 30,
            process_timeout_secs: Some(1800),
            install_locations: vec![
                InstallLocation {
                    dir: PathBuf::from(r"C:\Program Files\VideoLAN\VLC"),
                    uninstaller: PathBuf::from("uninstall.exe"),
                    args: vec!["/S".to_string()],
                },
                InstallLocation {
                    dir: PathBuf::from(r"C:\Program Files (x86)\VideoLAN\VLC"),
                    uninstaller: PathBuf::from("uninstall.exe"),
                    args: vec!["/S".to_string()],
                },
            ],
            shared_config: SharedConfig {
                dir: PathBuf::from(r"C:\Users\Default\AppData\Roaming\vlc"),
                files: vec![PathBuf::from("vlcrc"), PathBuf::from("vlc-qt-interface.ini")],
            },
            shortcut: ShortcutSpec {
                path: start_menu.join("VLC media player.lnk"),
                target: vlc_exe.clone(),
                arguments: "--no-qt-privacy-ask --no-qt-updates-notif".to_string(),
                icon: Some(vlc_exe),
                description: "VLC media player".to_string(),
            },
            stale_artifacts: StaleArtifacts {
                shortcut_folder: start_menu.join("VideoLAN"),
                desktop_shortcut: PathBuf::from(r"C:\Users\Public\Desktop\VLC media player.lnk"),
            },
        }
    }
}

impl DeploymentProfile {
    /// Load a profile from a JSON file.
    ///
    /// Missing fields fall back to the built-in defaults. Relative
    /// `files_dir`/`support_files_dir` resolve against the file's directory.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let profile = Self::read_json(path).map_err(|e| DeployError::profile(format!("{:#}", e)))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(profile.resolved_against(base))
    }

    fn read_json(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile from {:?}", path))?;
        let profile: Self =
            serde_json::from_str(&content).context("Failed to parse profile JSON")?;
        Ok(profile)
    }

    /// Save the profile as pretty JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).map_err(|e| {
            DeployError::io(format!("Failed to write profile to {:?}", path.as_ref()), e)
        })
    }

    /// Make the base directories absolute with respect to `base`
    pub fn resolved_against(mut self, base: &Path) -> Self {
        if self.files_dir.is_relative() {
            self.files_dir = base.join(&self.files_dir);
        }
        if self.support_files_dir.is_relative() {
            self.support_files_dir = base.join(&self.support_files_dir);
        }
        self
    }

    /// Validate the profile
    pub fn validate(&self) -> Result<()> {
        if self.app.name.trim().is_empty() {
            return Err(DeployError::profile("application name must be specified"));
        }
        if self.app.version.trim().is_empty() {
            return Err(DeployError::profile("application version must be specified"));
        }
        if self.installer.path.as_os_str().is_empty() {
            return Err(DeployError::profile("installer path must be specified"));
        }
        if self.install_locations.is_empty() {
            return Err(DeployError::profile("at least one install location is required"));
        }
        if let Some(location) = self
            .install_locations
            .iter()
            .find(|l| l.uninstaller.as_os_str().is_empty())
        {
            return Err(DeployError::profile(format!(
                "install location {:?} has no uninstaller",
                location.dir
            )));
        }
        if self.shortcut.path.as_os_str().is_empty() {
            return Err(DeployError::profile("shortcut path must be specified"));
        }
        if self.shortcut.target.as_os_str().is_empty() {
            return Err(DeployError::profile("shortcut target must be specified"));
        }
        if self.close_apps.iter().any(|name| name.trim().is_empty()) {
            return Err(DeployError::profile("close_apps contains an empty process name"));
        }
        Ok(())
    }

    /// Installer path with `files_dir` applied
    pub fn installer_path(&self) -> PathBuf {
        self.files_dir.join(&self.installer.path)
    }

    /// (source, destination) pairs for the shared configuration files
    pub fn config_copies(&self) -> Vec<(PathBuf, PathBuf)> {
        self.shared_config
            .files
            .iter()
            .map(|file| {
                let source = self.support_files_dir.join(file);
                let name = file.file_name().map(PathBuf::from).unwrap_or_else(|| file.clone());
                (source, self.shared_config.dir.join(name))
            })
            .collect()
    }

    /// Log file name for one run, e.g. `VideoLAN_VLCmediaplayer_3.0.21_x64_Install.log`
    pub fn log_file_name(&self, action: DeploymentType) -> String {
        let squash = |s: &str| s.split_whitespace().collect::<String>();
        format!(
            "{}_{}_{}_{}_{}.log",
            squash(&self.app.vendor),
            squash(&self.app.name),
            squash(&self.app.version),
            squash(&self.app.arch),
            action
        )
    }
}
