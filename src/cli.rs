use clap::Parser;
use std::path::PathBuf;

/// appdeploy - install or uninstall a managed application
#[derive(Parser, Debug)]
#[command(name = "appdeploy")]
#[command(about = "Deployment wrapper for installing or uninstalling a managed application")]
#[command(version)]
pub struct Cli {
    /// Action to perform (Install or Uninstall)
    ///
    /// Kept as text so that the value is validated by the deployment request
    /// itself, before any step runs.
    #[arg(long, default_value = "Install")]
    pub deployment_type: String,

    /// Interaction level (Interactive, Silent or NonInteractive)
    #[arg(long, default_value = "Interactive")]
    pub deploy_mode: String,

    /// Return 3010 to the caller when the installer asks for a restart
    #[arg(long)]
    pub allow_reboot_passthrough: bool,

    /// Switch the host into terminal-server install mode for the duration of the run
    #[arg(long)]
    pub terminal_server_mode: bool,

    /// Do not write a deployment log file
    #[arg(long)]
    pub disable_logging: bool,

    /// JSON deployment profile to use instead of the built-in one
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Directory for the deployment log file
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Dry-run mode: log every change that would be made without making it.
    ///
    /// Read-only inspection (install detection, running processes, disk
    /// space) still happens so the preview is realistic.
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["appdeploy"]).unwrap();
        assert_eq!(cli.deployment_type, "Install");
        assert_eq!(cli.deploy_mode, "Interactive");
        assert!(!cli.allow_reboot_passthrough);
        assert!(!cli.terminal_server_mode);
        assert!(!cli.disable_logging);
        assert!(!cli.dry_run);
        assert!(cli.profile.is_none());
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "appdeploy",
            "--deployment-type",
            "Uninstall",
            "--deploy-mode",
            "NonInteractive",
            "--allow-reboot-passthrough",
            "--terminal-server-mode",
            "--disable-logging",
            "--profile",
            "profile.json",
        ])
        .unwrap();
        assert_eq!(cli.deployment_type, "Uninstall");
        assert_eq!(cli.deploy_mode, "NonInteractive");
        assert!(cli.allow_reboot_passthrough);
        assert!(cli.terminal_server_mode);
        assert!(cli.disable_logging);
        assert_eq!(cli.profile, Some(PathBuf::from("profile.json")));
    }

    #[test]
    fn test_unknown_action_text_is_accepted_by_parser() {
        // Validation happens in DeploymentRequest, not in clap
        let cli = Cli::try_parse_from(["appdeploy", "--deployment-type", "Repair"]).unwrap();
        assert_eq!(cli.deployment_type, "Repair");
    }
}
