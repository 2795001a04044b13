//! The deployment request and per-step results

use std::str::FromStr;

use crate::cli::Cli;
use crate::error::{DeployError, Result};
use crate::types::{DeployMode, DeploymentType};

/// A single deployment request, built once from the command line.
///
/// Fields are private so the request cannot change after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    action: DeploymentType,
    mode: DeployMode,
    allow_reboot_passthrough: bool,
    terminal_server_mode: bool,
    logging_enabled: bool,
}

impl DeploymentRequest {
    pub fn new(action: DeploymentType, mode: DeployMode) -> Self {
        Self {
            action,
            mode,
            allow_reboot_passthrough: false,
            terminal_server_mode: false,
            logging_enabled: true,
        }
    }

    /// Parse and validate raw text values.
    ///
    /// Fails with [`DeployError::InvalidDeploymentType`] for anything other than
    /// Install/Uninstall, before any step can run.
    pub fn parse(action: &str, mode: &str) -> Result<Self> {
        let action = DeploymentType::from_str(action.trim())
            .map_err(|_| DeployError::InvalidDeploymentType(action.to_string()))?;
        let mode = DeployMode::from_str(mode.trim())
            .map_err(|_| DeployError::InvalidDeployMode(mode.to_string()))?;
        Ok(Self::new(action, mode))
    }

    /// Build the request from parsed command-line arguments
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        Ok(Self::parse(&cli.deployment_type, &cli.deploy_mode)?
            .with_reboot_passthrough(cli.allow_reboot_passthrough)
            .with_terminal_server_mode(cli.terminal_server_mode)
            .with_logging(!cli.disable_logging))
    }

    pub fn with_reboot_passthrough(mut self, allow: bool) -> Self {
        self.allow_reboot_passthrough = allow;
        self
    }

    pub fn with_terminal_server_mode(mut self, enabled: bool) -> Self {
        self.terminal_server_mode = enabled;
        self
    }

    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.logging_enabled = enabled;
        self
    }

    pub fn action(&self) -> DeploymentType {
        self.action
    }

    pub fn mode(&self) -> DeployMode {
        self.mode
    }

    pub fn allow_reboot_passthrough(&self) -> bool {
        self.allow_reboot_passthrough
    }

    pub fn terminal_server_mode(&self) -> bool {
        self.terminal_server_mode
    }

    pub fn logging_enabled(&self) -> bool {
        self.logging_enabled
    }
}

/// Result of executing one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    pub exit_code: i32,
    /// Halt dispatch after this step
    pub fatal: bool,
}

impl StepResult {
    pub const fn ok() -> Self {
        Self {
            exit_code: 0,
            fatal: false,
        }
    }

    pub const fn code(exit_code: i32) -> Self {
        Self {
            exit_code,
            fatal: false,
        }
    }

    pub const fn fatal(exit_code: i32) -> Self {
        Self {
            exit_code,
            fatal: true,
        }
    }
}
