//! Type-safe deployment vocabulary
//!
//! Every value that arrives from the command line as text is parsed into one of
//! these enums before the dispatcher sees it, so invalid values never reach a step.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The action requested by the distribution system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum DeploymentType {
    #[default]
    Install,
    Uninstall,
}

impl DeploymentType {
    /// Noun used in progress messages ("Installation", "Uninstallation")
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Install => "Installation",
            Self::Uninstall => "Uninstallation",
        }
    }
}

/// How much the environment is allowed to interact with the logged-on user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum DeployMode {
    /// Prompts and dialogs are shown and may block
    #[default]
    Interactive,
    /// No UI at all; blocking applications are closed without asking
    Silent,
    /// Progress may be shown, but nothing waits on the user
    NonInteractive,
}

impl DeployMode {
    /// Whether the environment may show prompts that wait for the user
    pub fn allows_blocking_ui(&self) -> bool {
        matches!(self, Self::Interactive)
    }

    /// Whether non-blocking status output is shown
    pub fn shows_progress(&self) -> bool {
        !matches!(self, Self::Silent)
    }
}

/// Log severity as understood by the environment log sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Icon shown next to a dialog message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DialogIcon {
    Information,
    Exclamation,
    Stop,
}
