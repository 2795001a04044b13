//! Deployment dispatcher
//!
//! Executes a [`Plan`] against an [`Environment`] and folds everything into a
//! single [`DeployOutcome`].
//!
//! # Error tiers
//!
//! - A step returning `Err` stops the plan. The error is logged, shown to the
//!   user through `show_dialog`, and the outcome becomes
//!   `Failed(UnhandledFatal)` no matter what exit code had been accumulated.
//! - A step returning a fatal [`StepResult`] stops the plan with that step's
//!   exit code.
//! - Steps in `Plan::finally` always run afterwards; their errors are logged
//!   and otherwise ignored.
//!
//! Nothing is rolled back. A failure mid-plan leaves whatever the earlier
//! steps did in place.

use tracing::debug;

use crate::environment::{Environment, ProcessSpec, PromptOutcome};
use crate::error::{DeployError, Result};
use crate::outcome::{fold_installer_exit_code, DeployOutcome, ExitStatus};
use crate::profile::{DeploymentProfile, InstallLocation};
use crate::request::{DeploymentRequest, StepResult};
use crate::steps::{self, Plan, Step, TERMINAL_SERVER_TOOL};
use crate::types::{DialogIcon, Severity};

/// How the main step list ended when no step returned an error
enum Completion {
    Finished(i32),
    Halted(i32),
}

/// Runs deployment plans against an environment
pub struct Dispatcher<'a, E: Environment> {
    env: &'a mut E,
    profile: &'a DeploymentProfile,
}

impl<'a, E: Environment> Dispatcher<'a, E> {
    pub fn new(env: &'a mut E, profile: &'a DeploymentProfile) -> Self {
        Self { env, profile }
    }

    /// Plan and execute the requested action
    pub fn dispatch(&mut self, request: &DeploymentRequest) -> DeployOutcome {
        let plan = steps::plan(request, self.profile);
        self.run_plan(request, &plan)
    }

    /// Execute an already-built plan
    pub fn run_plan(&mut self, request: &DeploymentRequest, plan: &Plan) -> DeployOutcome {
        let banner = format!(
            "[{}] {} started in [{}] mode",
            self.profile.app.display_name(),
            request.action(),
            request.mode()
        );
        self.env.log(&banner, Severity::Info);

        let result = self.run_steps(request, &plan.steps);

        for step in &plan.finally {
            if let Err(e) = self.execute(request, step) {
                let message = format!("Cleanup step '{}' failed: {}", step.label(), e);
                self.env.log(&message, Severity::Warning);
            }
        }

        let outcome = match result {
            Ok(Completion::Finished(code)) => {
                if code == ExitStatus::Success.code() || code == ExitStatus::RebootRequired.code() {
                    DeployOutcome::Succeeded(code)
                } else {
                    DeployOutcome::Failed(code)
                }
            }
            Ok(Completion::Halted(code)) => DeployOutcome::Failed(code),
            Err(e) => self.report_fatal(request, &e),
        };

        let summary = format!(
            "[{}] {} {}",
            self.profile.app.display_name(),
            request.action(),
            outcome
        );
        self.env.log(
            &summary,
            if outcome.is_success() { Severity::Info } else { Severity::Error },
        );
        outcome
    }

    fn run_steps(&mut self, request: &DeploymentRequest, steps: &[Step]) -> Result<Completion> {
        let mut exit_code = ExitStatus::Success.code();

        for (index, step) in steps.iter().enumerate() {
            debug!("Step {}/{}: {}", index + 1, steps.len(), step);
            let result = self
                .execute(request, step)
                .map_err(|e| e.in_step(step.label()))?;

            if result.fatal {
                self.env.log(
                    &format!(
                        "Step '{}' halted the deployment with exit code {}",
                        step.label(),
                        result.exit_code
                    ),
                    Severity::Error,
                );
                return Ok(Completion::Halted(result.exit_code));
            }

            if let Step::RunInstaller(_) = step {
                exit_code = fold_installer_exit_code(
                    exit_code,
                    result.exit_code,
                    request.allow_reboot_passthrough(),
                );
            }
        }

        Ok(Completion::Finished(exit_code))
    }

    fn report_fatal(&mut self, request: &DeploymentRequest, err: &DeployError) -> DeployOutcome {
        let message = format!("{} failed: {}", request.action(), err);
        debug!(error = ?err, "unhandled deployment error");
        self.env.log(&message, Severity::Error);
        self.env.show_dialog(&message, DialogIcon::Stop);
        DeployOutcome::failed(ExitStatus::UnhandledFatal)
    }

    fn execute(&mut self, request: &DeploymentRequest, step: &Step) -> Result<StepResult> {
        match step {
            Step::TerminalServerMode(mode) => {
                let spec = ProcessSpec::new(TERMINAL_SERVER_TOOL, mode.args()).hidden();
                let code = self.env.run_process(&spec)?;
                if code != 0 {
                    return Err(DeployError::process(format!(
                        "{} exited with code {}",
                        spec.command_line(),
                        code
                    )));
                }
                Ok(StepResult::ok())
            }
            Step::CloseApps(prompt) => match self.env.prompt_close_apps(prompt)? {
                PromptOutcome::Proceed => Ok(StepResult::ok()),
                PromptOutcome::TimedOut => {
                    self.env.log(
                        "Close-applications prompt timed out, continuing",
                        Severity::Warning,
                    );
                    Ok(StepResult::ok())
                }
                PromptOutcome::InsufficientDiskSpace => {
                    let message = format!(
                        "You do not have enough disk space to complete the {} of {}",
                        request.action().noun().to_lowercase(),
                        self.profile.app.name
                    );
                    self.env.log(&message, Severity::Error);
                    self.env.show_dialog(&message, DialogIcon::Exclamation);
                    Ok(StepResult::fatal(ExitStatus::InsufficientDiskSpace.code()))
                }
            },
            Step::ShowProgress(message) => {
                self.env.show_progress(Some(message))?;
                Ok(StepResult::ok())
            }
            Step::UninstallPrevious { locations, timeout } => {
                for location in locations {
                    self.uninstall_location(location, *timeout)?;
                }
                Ok(StepResult::ok())
            }
            Step::RunInstaller(spec) => {
                self.env.log(&format!("Running installer {}", spec.command_line()), Severity::Info);
                let code = self.env.run_process(spec)?;
                let severity = if code == 0 || code == ExitStatus::RebootRequired.code() {
                    Severity::Info
                } else {
                    Severity::Warning
                };
                self.env.log(&format!("Installer exited with code {}", code), severity);
                Ok(StepResult::code(code))
            }
            Step::CreateFolder(path) => {
                self.env.create_folder(path)?;
                Ok(StepResult::ok())
            }
            Step::CopyFile {
                source,
                destination,
            } => {
                self.env.copy_file(source, destination)?;
                Ok(StepResult::ok())
            }
            Step::CreateShortcut(shortcut) => {
                self.env.create_shortcut(shortcut)?;
                Ok(StepResult::ok())
            }
            Step::RemoveFolder(path) => {
                self.env.remove_folder(path)?;
                Ok(StepResult::ok())
            }
            Step::RemoveFile(path) => {
                self.env.remove_file(path)?;
                Ok(StepResult::ok())
            }
            Step::Wait(duration) => {
                self.env.log(
                    &format!("Waiting {}s before returning", duration.as_secs()),
                    Severity::Info,
                );
                self.env.sleep(*duration);
                Ok(StepResult::ok())
            }
        }
    }

    /// Run one location's uninstaller if a previous install is found there.
    ///
    /// The uninstaller's exit code is logged but never becomes the final code.
    fn uninstall_location(
        &mut self,
        location: &InstallLocation,
        timeout: Option<std::time::Duration>,
    ) -> Result<()> {
        let uninstaller = location.uninstaller_path();
        if !self.env.path_exists(&uninstaller) {
            debug!("No installation found at {}", location.dir.display());
            return Ok(());
        }

        self.env.log(
            &format!("Found installation at {}, uninstalling", location.dir.display()),
            Severity::Info,
        );
        let spec = ProcessSpec::new(uninstaller, location.args.clone())
            .hidden()
            .wait_for(timeout);
        let code = self.env.run_process(&spec)?;
        if code != 0 {
            self.env.log(
                &format!("Uninstaller {} exited with code {}", spec.command_line(), code),
                Severity::Warning,
            );
        }
        Ok(())
    }
}
