//! appdeploy library
//!
//! Core of the deployment wrapper: the request model, the per-action plans,
//! the dispatcher that runs them, and the environment it runs them against.

pub mod cli;
pub mod dispatcher;
pub mod environment;
pub mod error;
pub mod host;
pub mod logging;
pub mod outcome;
pub mod profile;
pub mod request;
pub mod steps;
pub mod types;

// Re-export main types for convenience
pub use dispatcher::Dispatcher;
pub use environment::{
    CloseAppsPrompt, Environment, ProcessSpec, PromptOutcome, ShortcutSpec,
};
pub use error::{DeployError, Result};
pub use host::{HostEnvironment, HostOptions};
pub use outcome::{DeployOutcome, ExitStatus};
pub use profile::{
    AppInfo, DeploymentProfile, InstallLocation, InstallerSpec, SharedConfig, StaleArtifacts,
};
pub use request::{DeploymentRequest, StepResult};
pub use steps::{plan, Plan, Step, TerminalServerMode};
pub use types::{DeployMode, DeploymentType, DialogIcon, Severity};
