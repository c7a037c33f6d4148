//! Backend abstraction for package managers.
//!
//! The [`Backend`] trait defines the interface for interacting with a
//! system package manager, allowing for different implementations (rpm
//! based, apt based, in-memory for tests).

pub mod apt;
pub mod memory;
pub mod rpm;

use crate::error::{Error, Result};
use crate::types::{InstallCommand, ManagerKind, Package};
use std::process::{Command, Output, Stdio};

/// Backend trait for package manager operations.
pub trait Backend: Send + Sync {
    /// Which package manager this backend drives.
    fn kind(&self) -> ManagerKind;

    /// Check if the package manager is usable.
    fn is_available(&self) -> bool;

    /// Installed version, or `None` if the package is not installed.
    fn installed_version(&self, package: &Package) -> Result<Option<String>>;

    /// Check if a package is installed (at any version).
    fn is_installed(&self, package: &Package) -> Result<bool> {
        Ok(self.installed_version(package)?.is_some())
    }

    /// The non-interactive command line that installs a package.
    fn install_command(&self, package: &Package) -> InstallCommand;

    /// Install a package.
    fn install(&self, package: &Package) -> Result<()> {
        let cmd = self.install_command(package);
        log::debug!("Running {}", cmd);

        let output = run(&cmd.program, &cmd.arg_refs())?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::from_output(&stderr, Some(&package.name)));
        }
        Ok(())
    }
}

/// Detect the package manager on this host.
///
/// Prefers dnf, then yum, then apt-get.
pub fn detect() -> Result<Box<dyn Backend>> {
    if command_exists("dnf") {
        return Ok(Box::new(rpm::RpmBackend::new(ManagerKind::Dnf)));
    }
    if command_exists("yum") {
        return Ok(Box::new(rpm::RpmBackend::new(ManagerKind::Yum)));
    }
    if command_exists("apt-get") {
        return Ok(Box::new(apt::AptBackend::new()));
    }
    Err(Error::ManagerNotFound)
}

/// Run a command and capture its output.
pub(crate) fn run(program: &str, args: &[&str]) -> Result<Output> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| Error::CommandFailed {
            message: format!("failed to execute {}: {}", program, e),
            stderr: String::new(),
        })
}

/// Check if a command exists in PATH.
pub(crate) fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
