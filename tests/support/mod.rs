//! Recording environment shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use appdeploy::{
    CloseAppsPrompt, DeployError, DialogIcon, Environment, ProcessSpec, PromptOutcome, Result,
    Severity, ShortcutSpec,
};

/// Every host-facing call the dispatcher made, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    PromptCloseApps(CloseAppsPrompt),
    ShowProgress(Option<String>),
    RunProcess {
        path: PathBuf,
        args: Vec<String>,
        hidden: bool,
    },
    CopyFile(PathBuf, PathBuf),
    CreateShortcut(PathBuf),
    CreateFolder(PathBuf),
    RemoveFolder(PathBuf),
    RemoveFile(PathBuf),
    Dialog(String, DialogIcon),
    Sleep(Duration),
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::PromptCloseApps(_) => "prompt_close_apps",
            Call::ShowProgress(_) => "show_progress",
            Call::RunProcess { .. } => "run_process",
            Call::CopyFile(..) => "copy_file",
            Call::CreateShortcut(_) => "create_shortcut",
            Call::CreateFolder(_) => "create_folder",
            Call::RemoveFolder(_) => "remove_folder",
            Call::RemoveFile(_) => "remove_file",
            Call::Dialog(..) => "show_dialog",
            Call::Sleep(_) => "sleep",
        }
    }
}

#[derive(Debug, Default)]
pub struct MockEnvironment {
    pub calls: Vec<Call>,
    pub logs: Vec<(String, Severity)>,
    /// Paths `path_exists` reports as present
    pub existing: HashSet<PathBuf>,
    /// Exit code per process path; anything else exits 0
    pub exit_codes: HashMap<PathBuf, i32>,
    pub prompt_outcome: Option<PromptOutcome>,
    /// Operation name (see `Call::name`) that returns an error
    pub fail_on: Option<&'static str>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing(mut self, path: impl Into<PathBuf>) -> Self {
        self.existing.insert(path.into());
        self
    }

    pub fn with_exit_code(mut self, path: impl Into<PathBuf>, code: i32) -> Self {
        self.exit_codes.insert(path.into(), code);
        self
    }

    pub fn with_prompt_outcome(mut self, outcome: PromptOutcome) -> Self {
        self.prompt_outcome = Some(outcome);
        self
    }

    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.fail_on = Some(operation);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.calls.iter().map(Call::name).collect()
    }

    pub fn processes(&self) -> Vec<PathBuf> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::RunProcess { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn dialogs(&self) -> Vec<(String, DialogIcon)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Dialog(text, icon) => Some((text.clone(), *icon)),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, call: Call) -> Result<()> {
        let name = call.name();
        self.calls.push(call);
        if self.fail_on == Some(name) {
            return Err(DeployError::io(
                format!("mock {} failure", name),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied"),
            ));
        }
        Ok(())
    }
}

impl Environment for MockEnvironment {
    fn prompt_close_apps(&mut self, prompt: &CloseAppsPrompt) -> Result<PromptOutcome> {
        self.record(Call::PromptCloseApps(prompt.clone()))?;
        Ok(self.prompt_outcome.unwrap_or(PromptOutcome::Proceed))
    }

    fn show_progress(&mut self, message: Option<&str>) -> Result<()> {
        self.record(Call::ShowProgress(message.map(str::to_string)))
    }

    fn run_process(&mut self, spec: &ProcessSpec) -> Result<i32> {
        self.record(Call::RunProcess {
            path: spec.path.clone(),
            args: spec.args.clone(),
            hidden: spec.hidden,
        })?;
        Ok(self.exit_codes.get(&spec.path).copied().unwrap_or(0))
    }

    fn path_exists(&self, path: &Path) -> bool {
        self.existing.contains(path)
    }

    fn copy_file(&mut self, source: &Path, destination: &Path) -> Result<()> {
        self.record(Call::CopyFile(source.to_path_buf(), destination.to_path_buf()))
    }

    fn create_shortcut(&mut self, shortcut: &ShortcutSpec) -> Result<()> {
        self.record(Call::CreateShortcut(shortcut.path.clone()))
    }

    fn create_folder(&mut self, path: &Path) -> Result<()> {
        self.record(Call::CreateFolder(path.to_path_buf()))
    }

    fn remove_folder(&mut self, path: &Path) -> Result<()> {
        self.record(Call::RemoveFolder(path.to_path_buf()))
    }

    fn remove_file(&mut self, path: &Path) -> Result<()> {
        self.record(Call::RemoveFile(path.to_path_buf()))
    }

    fn log(&mut self, message: &str, severity: Severity) {
        self.logs.push((message.to_string(), severity));
    }

    fn show_dialog(&mut self, text: &str, icon: DialogIcon) {
        self.calls.push(Call::Dialog(text.to_string(), icon));
    }

    fn sleep(&mut self, duration: Duration) {
        self.calls.push(Call::Sleep(duration));
    }
}
