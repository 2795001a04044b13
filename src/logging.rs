//! Logging setup
//!
//! Console output always goes to stderr. When logging is enabled a second,
//! plain-text layer appends to a per-run log file so the distribution system
//! can collect it. `RUST_LOG` overrides the default `info` filter.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{DeployError, Result};

/// Where log output goes
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Log file to append to; `None` keeps logging on the console only
    pub file: Option<PathBuf>,
}

/// Install the global tracing subscriber.
///
/// Failing to create the log file is an environment-load failure.
pub fn init(options: &LogOptions) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match &options.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    DeployError::environment(format!(
                        "cannot create log directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    DeployError::environment(format!(
                        "cannot open log file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| DeployError::environment(format!("cannot install logger: {}", e)))
}
