//! Exit codes and terminal deployment states
//!
//! The distribution system only ever sees an integer. Inside the crate that
//! integer is always produced from an [`ExitStatus`] or an installer's own
//! code wrapped in a [`DeployOutcome`].

use std::fmt;

/// Exit codes reserved by the deployment wrapper itself.
///
/// These are Windows exit codes. Unix keeps only the low 8 bits of an exit
/// status, so 3010, 60001, 60008 and 69520 arrive there as 194, 97, 104 and
/// 144 and can collide with installer codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExitStatus {
    /// Deployment finished without error
    Success = 0,
    /// Installer asked for a restart; only surfaced with reboot passthrough
    RebootRequired = 3010,
    /// A step failed and the failure was caught at the top level
    UnhandledFatal = 60001,
    /// The environment layer could not be loaded, no step ran
    EnvironmentLoadFailed = 60008,
    /// The close-apps prompt found too little free disk space
    InsufficientDiskSpace = 69520,
}

impl ExitStatus {
    /// Numeric exit code handed back to the distribution system
    #[inline]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

/// Terminal state of a dispatch. There are no intermediate states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployOutcome {
    Succeeded(i32),
    Failed(i32),
}

impl DeployOutcome {
    /// Failure carrying one of the reserved codes
    pub const fn failed(status: ExitStatus) -> Self {
        Self::Failed(status.code())
    }

    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Succeeded(code) | Self::Failed(code) => code,
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

impl fmt::Display for DeployOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded(code) => write!(f, "succeeded with exit code {}", code),
            Self::Failed(code) => write!(f, "failed with exit code {}", code),
        }
    }
}

/// Fold an installer exit code into the running exit code.
///
/// Only a code that is neither 0 nor 3010 replaces the current value. A 3010
/// is kept when reboot passthrough is allowed and otherwise left at the
/// current value.
pub fn fold_installer_exit_code(
    current: i32,
    installer_code: i32,
    allow_reboot_passthrough: bool,
) -> i32 {
    let reboot = ExitStatus::RebootRequired.code();
    if installer_code != ExitStatus::Success.code() && installer_code != reboot {
        installer_code
    } else if installer_code == reboot && allow_reboot_passthrough {
        reboot
    } else {
        current
    }
}
