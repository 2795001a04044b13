//! appdeploy - Main entry point
//!
//! Parses the command line, loads the deployment profile and host environment,
//! runs the dispatcher and exits with its code.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use appdeploy::cli::Cli;
use appdeploy::logging::{self, LogOptions};
use appdeploy::{
    DeploymentProfile, DeploymentRequest, DeploymentType, Dispatcher, ExitStatus,
    HostEnvironment, HostOptions, Result,
};

/// Main application entry point
fn main() {
    let cli = Cli::parse_args();
    let code = run(&cli);
    if cfg!(not(windows)) && !(0..=255).contains(&code) {
        eprintln!(
            "Exit code {} is reported as {} on this platform (8-bit exit status)",
            code,
            code & 0xff
        );
    }
    std::process::exit(code);
}

fn run(cli: &Cli) -> i32 {
    // Invalid values are rejected here, before anything is loaded
    let request = match DeploymentRequest::from_cli(cli) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("✗ {}", e);
            return e.exit_status().code();
        }
    };

    let (profile, mut env) = match load_environment(cli, &request) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("✗ {}", e);
            return ExitStatus::EnvironmentLoadFailed.code();
        }
    };

    let outcome = Dispatcher::new(&mut env, &profile).dispatch(&request);
    info!("Exiting with code {}", outcome.exit_code());
    outcome.exit_code()
}

/// Everything that must succeed before the first step may run
fn load_environment(
    cli: &Cli,
    request: &DeploymentRequest,
) -> Result<(DeploymentProfile, HostEnvironment)> {
    let profile = match &cli.profile {
        Some(path) => DeploymentProfile::load_from_file(path)?,
        None => DeploymentProfile::default().resolved_against(&package_dir()),
    };
    profile.validate()?;

    let log_file = request.logging_enabled().then(|| {
        cli.log_dir
            .clone()
            .unwrap_or_else(default_log_dir)
            .join(profile.log_file_name(request.action()))
    });
    logging::init(&LogOptions { file: log_file })?;
    info!("Loaded profile for {}", profile.app.display_name());

    // Logging is up by now, so this failure also lands in the log file
    let env = HostEnvironment::load(host_options(cli, request, &profile))
        .inspect_err(|e| error!("{}", e))?;

    Ok((profile, env))
}

/// Host options for this run. Free space is checked on the disk the
/// application is installed to.
fn host_options(
    cli: &Cli,
    request: &DeploymentRequest,
    profile: &DeploymentProfile,
) -> HostOptions {
    let mut options = HostOptions::new(request.mode());
    options.dry_run = cli.dry_run;
    if request.action() == DeploymentType::Install {
        options.files_dir = Some(profile.files_dir.clone());
    }
    if let Some(location) = profile.install_locations.first() {
        options.disk_check_path = location.dir.clone();
    }
    options
}

/// Directory the executable was shipped in
fn package_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_log_dir() -> PathBuf {
    std::env::temp_dir().join("appdeploy")
}
