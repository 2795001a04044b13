//! Step descriptors and the per-action plans.
//!
//! Each action resolves to a fixed, ordered list of [`Step`]s. Building the
//! plan is pure: it only reads the request and the profile, so the order can
//! be checked without touching the host.
//!
//! # Install
//!
//! ```text
//! CloseApps (disk space check) → ShowProgress → UninstallPrevious → RunInstaller
//!   → CreateFolder → CopyFile ×2 → CreateShortcut → RemoveFolder → RemoveFile
//! ```
//!
//! # Uninstall
//!
//! ```text
//! CloseApps (60s countdown) → ShowProgress → UninstallPrevious
//!   → RemoveFolder → RemoveFile ×2 → Wait (30s)
//! ```
//!
//! Terminal-server mode adds a `TerminalServerMode(Install)` step first and a
//! `TerminalServerMode(Execute)` step to the plan's `finally` list.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::environment::{CloseAppsPrompt, ProcessSpec, ShortcutSpec};
use crate::profile::{DeploymentProfile, InstallLocation};
use crate::request::DeploymentRequest;
use crate::types::DeploymentType;

/// Host executable that switches terminal-server install mode
pub const TERMINAL_SERVER_TOOL: &str = "change.exe";

/// Terminal-server session mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalServerMode {
    Install,
    Execute,
}

impl TerminalServerMode {
    /// Arguments for `change.exe`
    pub fn args(&self) -> Vec<String> {
        let switch = match self {
            Self::Install => "/install",
            Self::Execute => "/execute",
        };
        vec!["user".to_string(), switch.to_string()]
    }
}

/// One unit of work in a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    TerminalServerMode(TerminalServerMode),
    CloseApps(CloseAppsPrompt),
    ShowProgress(String),
    /// Run the uninstaller of every location where a previous install is found
    UninstallPrevious {
        locations: Vec<InstallLocation>,
        timeout: Option<Duration>,
    },
    /// Run the installer; its exit code feeds the final exit code
    RunInstaller(ProcessSpec),
    CreateFolder(PathBuf),
    CopyFile {
        source: PathBuf,
        destination: PathBuf,
    },
    CreateShortcut(ShortcutSpec),
    RemoveFolder(PathBuf),
    RemoveFile(PathBuf),
    Wait(Duration),
}

impl Step {
    /// Short name used in logs and error context
    pub fn label(&self) -> &'static str {
        match self {
            Self::TerminalServerMode(_) => "TerminalServerMode",
            Self::CloseApps(_) => "CloseApps",
            Self::ShowProgress(_) => "ShowProgress",
            Self::UninstallPrevious { .. } => "UninstallPrevious",
            Self::RunInstaller(_) => "RunInstaller",
            Self::CreateFolder(_) => "CreateFolder",
            Self::CopyFile { .. } => "CopyFile",
            Self::CreateShortcut(_) => "CreateShortcut",
            Self::RemoveFolder(_) => "RemoveFolder",
            Self::RemoveFile(_) => "RemoveFile",
            Self::Wait(_) => "Wait",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TerminalServerMode(mode) => write!(f, "TerminalServerMode {:?}", mode),
            Self::CloseApps(prompt) => write!(f, "CloseApps [{}]", prompt.apps.join(", ")),
            Self::ShowProgress(message) => write!(f, "ShowProgress \"{}\"", message),
            Self::UninstallPrevious { locations, .. } => {
                write!(f, "UninstallPrevious ({} locations)", locations.len())
            }
            Self::RunInstaller(spec) => write!(f, "RunInstaller {}", spec.command_line()),
            Self::CreateFolder(path) => write!(f, "CreateFolder {}", path.display()),
            Self::CopyFile {
                source,
                destination,
            } => write!(f, "CopyFile {} -> {}", source.display(), destination.display()),
            Self::CreateShortcut(shortcut) => {
                write!(f, "CreateShortcut {}", shortcut.path.display())
            }
            Self::RemoveFolder(path) => write!(f, "RemoveFolder {}", path.display()),
            Self::RemoveFile(path) => write!(f, "RemoveFile {}", path.display()),
            Self::Wait(duration) => write!(f, "Wait {}s", duration.as_secs()),
        }
    }
}

/// Ordered steps for one action, plus steps that run however the plan ends
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Plan {
    pub steps: Vec<Step>,
    pub finally: Vec<Step>,
}

impl Plan {
    /// Labels of the main steps, in order
    pub fn labels(&self) -> Vec<&'static str> {
        self.steps.iter().map(Step::label).collect()
    }
}

/// Resolve a request into its plan
pub fn plan(request: &DeploymentRequest, profile: &DeploymentProfile) -> Plan {
    let mut steps = match request.action() {
        DeploymentType::Install => install_steps(profile),
        DeploymentType::Uninstall => uninstall_steps(profile),
    };

    let mut finally = Vec::new();
    if request.terminal_server_mode() {
        steps.insert(0, Step::TerminalServerMode(TerminalServerMode::Install));
        finally.push(Step::TerminalServerMode(TerminalServerMode::Execute));
    }

    Plan { steps, finally }
}

fn progress_message(action: DeploymentType) -> String {
    format!("{} in progress. Please wait...", action.noun())
}

fn process_timeout(profile: &DeploymentProfile) -> Option<Duration> {
    profile.process_timeout_secs.map(Duration::from_secs)
}

fn install_steps(profile: &DeploymentProfile) -> Vec<Step> {
    let required_disk_space_mb =
        (profile.required_disk_space_mb > 0).then_some(profile.required_disk_space_mb);

    let mut steps = vec![
        Step::CloseApps(CloseAppsPrompt {
            apps: profile.close_apps.clone(),
            countdown: profile.install_countdown_secs.map(Duration::from_secs),
            required_disk_space_mb,
        }),
        Step::ShowProgress(progress_message(DeploymentType::Install)),
        Step::UninstallPrevious {
            locations: profile.install_locations.clone(),
            timeout: process_timeout(profile),
        },
        Step::RunInstaller(
            ProcessSpec::new(profile.installer_path(), profile.installer.args.clone())
                .wait_for(process_timeout(profile)),
        ),
        Step::CreateFolder(profile.shared_config.dir.clone()),
    ];

    steps.extend(
        profile
            .config_copies()
            .into_iter()
            .map(|(source, destination)| Step::CopyFile {
                source,
                destination,
            }),
    );

    steps.push(Step::CreateShortcut(profile.shortcut.clone()));
    steps.push(Step::RemoveFolder(profile.stale_artifacts.shortcut_folder.clone()));
    steps.push(Step::RemoveFile(profile.stale_artifacts.desktop_shortcut.clone()));
    steps
}

fn uninstall_steps(profile: &DeploymentProfile) -> Vec<Step> {
    vec![
        Step::CloseApps(CloseAppsPrompt {
            apps: profile.close_apps.clone(),
            countdown: profile.uninstall_countdown_secs.map(Duration::from_secs),
            required_disk_space_mb: None,
        }),
        Step::ShowProgress(progress_message(DeploymentType::Uninstall)),
        Step::UninstallPrevious {
            locations: profile.install_locations.clone(),
            timeout: process_timeout(profile),
        },
        Step::RemoveFolder(profile.stale_artifacts.shortcut_folder.clone()),
        Step::RemoveFile(profile.stale_artifacts.desktop_shortcut.clone()),
        Step::RemoveFile(profile.shortcut.path.clone()),
        Step::Wait(Duration::from_secs(profile.uninstall_settle_secs)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeployMode;

    fn request(action: DeploymentType) -> DeploymentRequest {
        DeploymentRequest::new(action, DeployMode::Silent)
    }

    #[test]
    fn test_install_plan_order() {
        let plan = plan(&request(DeploymentType::Install), &DeploymentProfile::default());
        assert_eq!(
            plan.labels(),
            vec![
                "CloseApps",
                "ShowProgress",
                "UninstallPrevious",
                "RunInstaller",
                "CreateFolder",
                "CopyFile",
                "CopyFile",
                "CreateShortcut",
                "RemoveFolder",
                "RemoveFile",
            ]
        );
        assert!(plan.finally.is_empty());
    }

    #[test]
    fn test_uninstall_plan_order_and_timings() {
        let profile = DeploymentProfile::default();
        let plan = plan(&request(DeploymentType::Uninstall), &profile);
        assert_eq!(
            plan.labels(),
            vec![
                "CloseApps",
                "ShowProgress",
                "UninstallPrevious",
                "RemoveFolder",
                "RemoveFile",
                "RemoveFile",
                "Wait",
            ]
        );
        match &plan.steps[0] {
            Step::CloseApps(prompt) => {
                assert_eq!(prompt.countdown, Some(Duration::from_secs(60)));
                assert_eq!(prompt.required_disk_space_mb, None);
            }
            other => panic!("unexpected first step {other}"),
        }
        assert_eq!(plan.steps[6], Step::Wait(Duration::from_secs(30)));
    }

    #[test]
    fn test_install_checks_disk_space() {
        let plan = plan(&request(DeploymentType::Install), &DeploymentProfile::default());
        match &plan.steps[0] {
            Step::CloseApps(prompt) => assert_eq!(prompt.required_disk_space_mb, Some(500)),
            other => panic!("unexpected first step {other}"),
        }
    }

    #[test]
    fn test_terminal_server_mode_wraps_plan() {
        let request = request(DeploymentType::Install).with_terminal_server_mode(true);
        let plan = plan(&request, &DeploymentProfile::default());
        assert_eq!(
            plan.steps[0],
            Step::TerminalServerMode(TerminalServerMode::Install)
        );
        assert_eq!(
            plan.finally,
            vec![Step::TerminalServerMode(TerminalServerMode::Execute)]
        );
    }

    #[test]
    fn test_step_display() {
        let step = Step::RemoveFile(PathBuf::from("/tmp/a.lnk"));
        assert_eq!(step.to_string(), "RemoveFile /tmp/a.lnk");
        assert_eq!(TerminalServerMode::Execute.args(), vec!["user", "/execute"]);
    }
}
