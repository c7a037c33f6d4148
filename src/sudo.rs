//! Scoped sudo context
//!
//! Sudo is never requested for the entire process. Instead:
//! 1. Every change is computed first (no sudo needed)
//! 2. Sudo is acquired once, only if a pending change needs it
//! 3. Privileges are released when the context is dropped
//!
//! When the process already runs as root no context is needed at all:
//! resources are built without the sudo flag. Directories decide for
//! themselves from who owns the path (see `resource::directory`).

use anyhow::{Context, Result, bail};
use declarative::{CommandOutput, SudoProvider};
use std::process::{Command, Output, Stdio};

use crate::users;

/// Who is running, decided once per invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Privileges {
    pub root: bool,
    /// Effective uid of the process
    pub uid: u32,
    pub user: String,
}

impl Privileges {
    /// Inspect the running process
    pub fn detect() -> Result<Self> {
        Ok(Self {
            root: users::is_root(),
            uid: users::effective_uid(),
            user: users::current_user_name()?,
        })
    }

    /// Whether system-wide operations (packages, accounts) need sudo
    pub fn needed_for_system(&self) -> bool {
        !self.root
    }
}

/// Scoped sudo context - automatically invalidates on drop
pub struct SudoContext {
    validated: bool,
}

impl SudoContext {
    /// Acquire sudo privileges with a reason shown to user
    pub fn acquire(reason: &str) -> Result<Self> {
        eprintln!();
        eprintln!("  Sudo required: {}", reason);
        eprintln!();

        // Validate sudo (will prompt for password)
        let status = Command::new("sudo")
            .args(["-v"])
            .status()
            .context("Failed to execute sudo")?;

        if !status.success() {
            return Err(declarative::Error::PermissionDenied {
                message: "failed to acquire sudo privileges".to_string(),
            }
            .into());
        }

        Ok(Self { validated: true })
    }

    fn run_internal(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        if !self.validated {
            bail!("Sudo context not validated");
        }

        log::debug!("sudo {} {}", cmd, args.join(" "));

        Command::new("sudo")
            .arg("-n")
            .arg(cmd)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to execute: sudo {} {:?}", cmd, args))
    }
}

impl SudoProvider for SudoContext {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput> {
        let output = self.run_internal(cmd, args)?;
        Ok(output.into())
    }
}

impl Drop for SudoContext {
    fn drop(&mut self) {
        // Invalidate sudo timestamp to release privileges
        let _ = Command::new("sudo").args(["-k"]).status();
    }
}
