//! The real host environment.
//!
//! Backs the [`Environment`] contract with `std::fs`, `std::process` and
//! `sysinfo`. Prompts and dialogs only block in Interactive mode.
//!
//! # Dry run
//!
//! With `dry_run` set, every operation that changes the host (process
//! launches, file copies, removals, shortcut creation, closing applications)
//! is logged and skipped. Read-only inspection such as install detection,
//! the running-process scan and the disk-space check still happens so the
//! preview reflects the machine it runs on.

use std::fs;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus as ProcessExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use sysinfo::{Disks, ProcessesToUpdate, System};
use tracing::{debug, error, info, warn};

use crate::environment::{CloseAppsPrompt, Environment, ProcessSpec, PromptOutcome, ShortcutSpec};
use crate::error::{DeployError, Result};
use crate::types::{DeployMode, DialogIcon, Severity};

/// How often a bounded process wait polls the child
const PROCESS_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Options the host environment is loaded with
#[derive(Debug, Clone)]
pub struct HostOptions {
    pub mode: DeployMode,
    pub dry_run: bool,
    /// Package directory that must exist for the environment to load
    pub files_dir: Option<PathBuf>,
    /// Directory whose disk is checked for free space
    pub disk_check_path: PathBuf,
}

impl HostOptions {
    pub fn new(mode: DeployMode) -> Self {
        Self {
            mode,
            dry_run: false,
            files_dir: None,
            disk_check_path: std::env::temp_dir(),
        }
    }
}

/// What a wait on the console ended with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleAnswer {
    Entered,
    TimedOut,
    /// Input reached end of file; nobody can answer any more
    Closed,
}

/// Operator input, read line by line on a single background thread.
///
/// Prompts and dialogs receive from the same channel, so a read left pending
/// by an expired countdown is picked up by the next wait instead of holding
/// the console.
struct ConsoleInput {
    source: Option<Box<dyn BufRead + Send>>,
    lines: Option<mpsc::Receiver<ConsoleAnswer>>,
    /// Whether someone can be expected to answer at all
    attended: bool,
    closed: bool,
}

impl ConsoleInput {
    fn stdin() -> Self {
        Self {
            source: None,
            lines: None,
            attended: io::stdin().is_terminal(),
            closed: false,
        }
    }

    fn from_reader(reader: Box<dyn BufRead + Send>) -> Self {
        Self {
            source: Some(reader),
            lines: None,
            attended: true,
            closed: false,
        }
    }

    /// Wait for a line, giving up after `limit` if one is set.
    ///
    /// Closed input never ends a countdown early: the wait still runs to the
    /// deadline and reports `TimedOut`. Without a countdown it reports `Closed`.
    fn wait(&mut self, limit: Option<Duration>) -> ConsoleAnswer {
        let deadline = limit.map(|limit| Instant::now() + limit);

        if !self.closed {
            let source = &mut self.source;
            let lines = self.lines.get_or_insert_with(|| {
                spawn_reader(
                    source
                        .take()
                        .unwrap_or_else(|| Box::new(BufReader::new(io::stdin()))),
                )
            });
            let event = match deadline {
                Some(deadline) => {
                    match lines.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                        Ok(event) => event,
                        Err(RecvTimeoutError::Timeout) => return ConsoleAnswer::TimedOut,
                        Err(RecvTimeoutError::Disconnected) => ConsoleAnswer::Closed,
                    }
                }
                None => lines.recv().unwrap_or(ConsoleAnswer::Closed),
            };
            if event == ConsoleAnswer::Entered {
                return ConsoleAnswer::Entered;
            }
            self.closed = true;
        }

        match deadline {
            Some(deadline) => {
                thread::sleep(deadline.saturating_duration_since(Instant::now()));
                ConsoleAnswer::TimedOut
            }
            None => ConsoleAnswer::Closed,
        }
    }
}

/// Forward one event per line read; the thread ends at end of input.
fn spawn_reader(mut source: Box<dyn BufRead + Send>) -> mpsc::Receiver<ConsoleAnswer> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        loop {
            let mut line = String::new();
            let event = match source.read_line(&mut line) {
                Ok(n) if n > 0 => ConsoleAnswer::Entered,
                _ => ConsoleAnswer::Closed,
            };
            if tx.send(event).is_err() || event == ConsoleAnswer::Closed {
                break;
            }
        }
    });
    rx
}

/// Environment backed by the local machine
pub struct HostEnvironment {
    options: HostOptions,
    system: System,
    console: ConsoleInput,
}

impl HostEnvironment {
    /// Bring the environment up.
    ///
    /// Fails with [`DeployError::EnvironmentLoad`] when the package directory
    /// is missing, before the dispatcher can run any step.
    pub fn load(options: HostOptions) -> Result<Self> {
        Self::load_with_console(options, ConsoleInput::stdin())
    }

    /// Like [`load`](Self::load), but prompts and dialogs read their answers
    /// from `input` instead of stdin.
    pub fn with_console<R>(options: HostOptions, input: R) -> Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        Self::load_with_console(options, ConsoleInput::from_reader(Box::new(input)))
    }

    fn load_with_console(options: HostOptions, console: ConsoleInput) -> Result<Self> {
        if let Some(dir) = &options.files_dir {
            if !dir.is_dir() {
                return Err(DeployError::environment(format!(
                    "package files directory {} not found",
                    dir.display()
                )));
            }
        }

        debug!(
            "Host environment loaded (mode={}, dry_run={}, console={})",
            options.mode, options.dry_run, console.attended
        );
        Ok(Self {
            options,
            system: System::new(),
            console,
        })
    }

    /// Wait for the operator to acknowledge the close-apps prompt
    fn await_operator(&mut self, countdown: Option<Duration>) -> PromptOutcome {
        match self.console.wait(countdown) {
            ConsoleAnswer::Entered => PromptOutcome::Proceed,
            ConsoleAnswer::TimedOut => PromptOutcome::TimedOut,
            ConsoleAnswer::Closed => {
                warn!("Console input closed before the prompt was answered");
                PromptOutcome::TimedOut
            }
        }
    }

    /// Names from `apps` that currently have a running process
    fn running_apps(&mut self, apps: &[String]) -> Vec<String> {
        self.system.refresh_processes(ProcessesToUpdate::All, true);
        apps.iter()
            .filter(|app| {
                let wanted = normalize_process_name(app);
                self.system
                    .processes()
                    .values()
                    .any(|p| normalize_process_name(&p.name().to_string_lossy()) == wanted)
            })
            .cloned()
            .collect()
    }

    fn close_apps(&mut self, apps: &[String]) {
        if self.options.dry_run {
            info!("[dry-run] Would close running applications: {}", apps.join(", "));
            return;
        }

        self.system.refresh_processes(ProcessesToUpdate::All, true);
        for app in apps {
            let wanted = normalize_process_name(app);
            for process in self.system.processes().values() {
                if normalize_process_name(&process.name().to_string_lossy()) != wanted {
                    continue;
                }
                if process.kill() {
                    info!("Closed {} (PID {})", app, process.pid());
                } else {
                    warn!("Failed to close {} (PID {})", app, process.pid());
                }
            }
        }
    }

    /// Free space in MB on the disk holding `disk_check_path`
    fn free_space_mb(&self) -> Option<u64> {
        let disks = Disks::new_with_refreshed_list();
        disks
            .iter()
            .filter(|d| self.options.disk_check_path.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .map(|d| d.available_space() / (1024 * 1024))
    }

    fn skip(&self, what: impl AsRef<str>) -> bool {
        if self.options.dry_run {
            info!("[dry-run] Would {}", what.as_ref());
        }
        self.options.dry_run
    }
}

impl Environment for HostEnvironment {
    fn prompt_close_apps(&mut self, prompt: &CloseAppsPrompt) -> Result<PromptOutcome> {
        if let Some(required) = prompt.required_disk_space_mb {
            match self.free_space_mb() {
                Some(free) if free < required => {
                    error!("Insufficient disk space: {} MB free, {} MB required", free, required);
                    return Ok(PromptOutcome::InsufficientDiskSpace);
                }
                Some(free) => debug!("Disk space check passed: {} MB free", free),
                None => warn!(
                    "Could not determine free space for {}",
                    self.options.disk_check_path.display()
                ),
            }
        }

        let running = self.running_apps(&prompt.apps);
        if running.is_empty() {
            return Ok(PromptOutcome::Proceed);
        }

        if !self.options.mode.allows_blocking_ui() || self.options.dry_run {
            self.close_apps(&running);
            return Ok(PromptOutcome::Proceed);
        }

        if !self.console.attended {
            warn!(
                "No console attached, closing {} without prompting",
                running.join(", ")
            );
            self.close_apps(&running);
            return Ok(PromptOutcome::TimedOut);
        }

        eprintln!("The following applications must be closed before continuing:");
        for app in &running {
            eprintln!("  - {}", app);
        }
        match prompt.countdown {
            Some(limit) => eprintln!(
                "Save your work and press Enter. They will be closed automatically in {}s.",
                limit.as_secs()
            ),
            None => eprintln!("Save your work and press Enter to close them."),
        }

        let outcome = self.await_operator(prompt.countdown);
        let still_running = self.running_apps(&running);
        if !still_running.is_empty() {
            self.close_apps(&still_running);
        }

        Ok(outcome)
    }

    fn show_progress(&mut self, message: Option<&str>) -> Result<()> {
        let message = message.unwrap_or("Deployment in progress. Please wait...");
        if self.options.mode.shows_progress() {
            eprintln!("{}", message);
        }
        info!("{}", message);
        Ok(())
    }

    fn run_process(&mut self, spec: &ProcessSpec) -> Result<i32> {
        if self.skip(format!("run {}", spec.command_line())) {
            return Ok(0);
        }

        info!("Executing {}", spec.command_line());
        let mut cmd = Command::new(&spec.path);
        cmd.args(&spec.args);
        if spec.hidden {
            cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
            hide_window(&mut cmd);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| DeployError::io(format!("Failed to start {}", spec.path.display()), e))?;

        let status = match spec.wait_for {
            Some(limit) => wait_with_deadline(&mut child, &spec.path, limit)?,
            None => child.wait().map_err(|e| {
                DeployError::io(format!("Failed waiting for {}", spec.path.display()), e)
            })?,
        };

        let code = status.code().unwrap_or(-1);
        info!("{} exited with code {}", spec.path.display(), code);
        Ok(code)
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn copy_file(&mut self, source: &Path, destination: &Path) -> Result<()> {
        if self.skip(format!("copy {} to {}", source.display(), destination.display())) {
            return Ok(());
        }
        fs::copy(source, destination).map_err(|e| {
            DeployError::io(
                format!("Failed to copy {} to {}", source.display(), destination.display()),
                e,
            )
        })?;
        info!("Copied {} to {}", source.display(), destination.display());
        Ok(())
    }

    fn create_shortcut(&mut self, shortcut: &ShortcutSpec) -> Result<()> {
        if self.skip(format!("create shortcut {}", shortcut.path.display())) {
            return Ok(());
        }
        if let Some(parent) = shortcut.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                DeployError::io(format!("Failed to create {}", parent.display()), e)
            })?;
        }
        write_shortcut(shortcut)?;
        info!("Created shortcut {}", shortcut.path.display());
        Ok(())
    }

    fn create_folder(&mut self, path: &Path) -> Result<()> {
        if self.skip(format!("create folder {}", path.display())) {
            return Ok(());
        }
        fs::create_dir_all(path)
            .map_err(|e| DeployError::io(format!("Failed to create folder {}", path.display()), e))
    }

    fn remove_folder(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            debug!("Folder {} does not exist, nothing to remove", path.display());
            return Ok(());
        }
        if self.skip(format!("remove folder {}", path.display())) {
            return Ok(());
        }
        fs::remove_dir_all(path).map_err(|e| {
            DeployError::io(format!("Failed to remove folder {}", path.display()), e)
        })?;
        info!("Removed folder {}", path.display());
        Ok(())
    }

    fn remove_file(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            debug!("File {} does not exist, nothing to remove", path.display());
            return Ok(());
        }
        if self.skip(format!("remove file {}", path.display())) {
            return Ok(());
        }
        match fs::remove_file(path) {
            Ok(()) => {
                info!("Removed file {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DeployError::io(
                format!("Failed to remove file {}", path.display()),
                e,
            )),
        }
    }

    fn log(&mut self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => info!("{}", message),
            Severity::Warning => warn!("{}", message),
            Severity::Error => error!("{}", message),
        }
    }

    fn show_dialog(&mut self, text: &str, icon: DialogIcon) {
        info!("Dialog [{}]: {}", icon, text);
        if !self.options.mode.allows_blocking_ui()
            || self.options.dry_run
            || !self.console.attended
        {
            return;
        }
        eprintln!();
        eprintln!("[{}] {}", icon, text);
        eprint!("Press Enter to continue...");
        let _ = io::stderr().flush();
        self.console.wait(None);
    }

    fn sleep(&mut self, duration: Duration) {
        if self.skip(format!("wait {}s", duration.as_secs())) {
            return;
        }
        thread::sleep(duration);
    }
}

/// Lowercase and drop a trailing `.exe` so `VLC.exe` matches `vlc`
pub fn normalize_process_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    lower.strip_suffix(".exe").map(str::to_string).unwrap_or(lower)
}

fn wait_with_deadline(
    child: &mut Child,
    path: &Path,
    limit: Duration,
) -> Result<ProcessExitStatus> {
    let started = Instant::now();
    loop {
        let polled = child
            .try_wait()
            .map_err(|e| DeployError::io(format!("Failed waiting for {}", path.display()), e))?;
        if let Some(status) = polled {
            return Ok(status);
        }
        if started.elapsed() >= limit {
            warn!("{} exceeded {}s, killing it", path.display(), limit.as_secs());
            let _ = child.kill();
            let _ = child.wait();
            return Err(DeployError::ProcessTimeout {
                path: path.to_path_buf(),
                secs: limit.as_secs(),
            });
        }
        thread::sleep(PROCESS_POLL_INTERVAL);
    }
}

#[cfg(windows)]
fn hide_window(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_window(_cmd: &mut Command) {}

/// Quote a value for a single-quoted PowerShell string
#[cfg_attr(not(windows), allow(dead_code))]
fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// WScript.Shell script that writes the shortcut
#[cfg_attr(not(windows), allow(dead_code))]
fn shortcut_script(shortcut: &ShortcutSpec) -> String {
    let mut script = format!(
        "$s = (New-Object -ComObject WScript.Shell).CreateShortcut({}); \
         $s.TargetPath = {}; $s.Arguments = {}; $s.Description = {}; ",
        ps_quote(&shortcut.path.to_string_lossy()),
        ps_quote(&shortcut.target.to_string_lossy()),
        ps_quote(&shortcut.arguments),
        ps_quote(&shortcut.description),
    );
    if let Some(icon) = &shortcut.icon {
        script.push_str(&format!("$s.IconLocation = {}; ", ps_quote(&icon.to_string_lossy())));
    }
    script.push_str("$s.Save()");
    script
}

/// freedesktop entry used where `.lnk` files are not available
#[cfg_attr(windows, allow(dead_code))]
fn desktop_entry(shortcut: &ShortcutSpec) -> String {
    let mut entry = format!(
        "[Desktop Entry]\nType=Application\nName={}\nExec=\"{}\" {}\n",
        shortcut.description,
        shortcut.target.display(),
        shortcut.arguments
    );
    if let Some(icon) = &shortcut.icon {
        entry.push_str(&format!("Icon={}\n", icon.display()));
    }
    entry
}

#[cfg(windows)]
fn write_shortcut(shortcut: &ShortcutSpec) -> Result<()> {
    let status = Command::new("powershell.exe")
        .args(["-NoProfile", "-NonInteractive", "-ExecutionPolicy", "Bypass", "-Command"])
        .arg(shortcut_script(shortcut))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| DeployError::io("Failed to start powershell.exe", e))?;
    if status.status.success() {
        Ok(())
    } else {
        Err(DeployError::process(format!(
            "creating shortcut {} failed: {}",
            shortcut.path.display(),
            String::from_utf8_lossy(&status.stderr).trim()
        )))
    }
}

#[cfg(not(windows))]
fn write_shortcut(shortcut: &ShortcutSpec) -> Result<()> {
    fs::write(&shortcut.path, desktop_entry(shortcut)).map_err(|e| {
        DeployError::io(format!("Failed to write shortcut {}", shortcut.path.display()), e)
    })
}
