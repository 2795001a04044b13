//! The environment contract the dispatcher runs against.
//!
//! The dispatcher never touches the host directly. Every prompt, process
//! launch and file-system change goes through an [`Environment`], which lets
//! the real host ([`crate::host::HostEnvironment`]) be swapped for a recording
//! mock in tests.
//!
//! # Contract
//!
//! - Removal of a path that does not exist succeeds.
//! - `run_process` returns the child's exit code; only failure to start, wait
//!   on, or bound the child is an error.
//! - Whether prompts and dialogs block is the environment's decision, based
//!   on the deploy mode it was built with.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::types::{DialogIcon, Severity};

/// Arguments for the close-applications prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseAppsPrompt {
    /// Process names without extension
    pub apps: Vec<String>,
    /// Auto-dismiss the prompt after this long
    pub countdown: Option<Duration>,
    /// Minimum free space in MB, checked before prompting
    pub required_disk_space_mb: Option<u64>,
}

/// How the close-applications prompt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// Nothing blocking was left running
    Proceed,
    /// The countdown expired and the prompt dismissed itself
    TimedOut,
    /// Free disk space was below the requirement
    InsufficientDiskSpace,
}

/// A process to launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub path: PathBuf,
    pub args: Vec<String>,
    /// Suppress any console window
    pub hidden: bool,
    /// Kill the process if it runs longer than this
    pub wait_for: Option<Duration>,
}

impl ProcessSpec {
    pub fn new(path: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            path: path.into(),
            args,
            hidden: false,
            wait_for: None,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn wait_for(mut self, limit: Option<Duration>) -> Self {
        self.wait_for = limit;
        self
    }

    /// Command line as it would be typed, for logging
    pub fn command_line(&self) -> String {
        let mut line = format!("\"{}\"", self.path.display());
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// A shortcut to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutSpec {
    pub path: PathBuf,
    pub target: PathBuf,
    pub arguments: String,
    pub icon: Option<PathBuf>,
    pub description: String,
}

/// Host operations available to the dispatcher.
pub trait Environment {
    /// Ask the user to close blocking applications, optionally checking disk space first
    fn prompt_close_apps(&mut self, prompt: &CloseAppsPrompt) -> Result<PromptOutcome>;

    /// Show a progress indicator; `None` uses the environment's default text
    fn show_progress(&mut self, message: Option<&str>) -> Result<()>;

    /// Run a process to completion and return its exit code
    fn run_process(&mut self, spec: &ProcessSpec) -> Result<i32>;

    fn path_exists(&self, path: &Path) -> bool;

    fn copy_file(&mut self, source: &Path, destination: &Path) -> Result<()>;

    fn create_shortcut(&mut self, shortcut: &ShortcutSpec) -> Result<()>;

    fn create_folder(&mut self, path: &Path) -> Result<()>;

    fn remove_folder(&mut self, path: &Path) -> Result<()>;

    fn remove_file(&mut self, path: &Path) -> Result<()>;

    fn log(&mut self, message: &str, severity: Severity);

    /// Show a message to the user; blocks only where the mode permits it
    fn show_dialog(&mut self, text: &str, icon: DialogIcon);

    fn sleep(&mut self, duration: Duration);
}
