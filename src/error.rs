//! Error handling module for appdeploy
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Every error maps onto one of the reserved exit codes in [`ExitStatus`].

use std::path::PathBuf;
use thiserror::Error;

use crate::outcome::ExitStatus;

/// Main error type for appdeploy
#[derive(Error, Debug)]
pub enum DeployError {
    /// Deployment type outside the fixed Install/Uninstall set
    #[error("Invalid deployment type '{0}'. Valid: Install, Uninstall")]
    InvalidDeploymentType(String),

    /// Deploy mode outside the fixed set
    #[error("Invalid deploy mode '{0}'. Valid: Interactive, Silent, NonInteractive")]
    InvalidDeployMode(String),

    /// The environment layer could not be brought up
    #[error("Environment failed to load: {0}")]
    EnvironmentLoad(String),

    /// Profile loading or validation errors
    #[error("Profile error: {0}")]
    Profile(String),

    /// IO errors with the operation that caused them
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A process could not be started or waited on
    #[error("Process error: {0}")]
    Process(String),

    /// A process outlived its allowed runtime and was killed
    #[error("Process {} did not exit within {}s", .path.display(), .secs)]
    ProcessTimeout { path: PathBuf, secs: u64 },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A plan step failed; wraps the underlying error
    #[error("Step '{step}' failed: {source}")]
    Step {
        step: String,
        #[source]
        source: Box<DeployError>,
    },
}

/// Result type alias for deployment operations
pub type Result<T> = std::result::Result<T, DeployError>;

// Convenient error constructors
impl DeployError {
    /// Create an environment-load error
    pub fn environment(msg: impl Into<String>) -> Self {
        Self::EnvironmentLoad(msg.into())
    }

    /// Create a profile error
    pub fn profile(msg: impl Into<String>) -> Self {
        Self::Profile(msg.into())
    }

    /// Create a process error
    pub fn process(msg: impl Into<String>) -> Self {
        Self::Process(msg.into())
    }

    /// Wrap an IO error with what was being attempted
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Attach the failing step's label
    pub fn in_step(self, step: impl Into<String>) -> Self {
        Self::Step {
            step: step.into(),
            source: Box::new(self),
        }
    }

    /// Reserved exit code this error is reported with
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Self::EnvironmentLoad(_) | Self::Profile(_) => ExitStatus::EnvironmentLoadFailed,
            _ => ExitStatus::UnhandledFatal,
        }
    }
}
