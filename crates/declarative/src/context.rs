//! Apply context and provider traits
//!
//! These traits keep the engine free of any particular sudo, progress,
//! or prompt implementation.

use crate::types::{ApplyResult, CommandOutput};
use anyhow::Result;

/// Provider for elevated privilege operations
pub trait SudoProvider: Send + Sync {
    /// Run a command with elevated privileges
    fn run(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Run a command and fail with its stderr if it exits non-zero
    fn run_checked(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput> {
        let output = self.run(cmd, args)?;
        if !output.success {
            anyhow::bail!(
                "{} {} failed: {}",
                cmd,
                args.join(" "),
                output.stderr_str().trim()
            );
        }
        Ok(output)
    }
}

/// Progress callback for execution
pub trait ProgressCallback: Send {
    /// Called once before the first step is applied
    fn on_run_start(&mut self, steps: usize, privileged: bool);

    /// Called when starting to apply a single resource
    fn on_resource_start(&mut self, recipe: &str, id: &str, description: &str);

    /// Called when a resource application completes
    fn on_resource_complete(&mut self, recipe: &str, id: &str, result: &ApplyResult);

    /// Called after the last step, or after the step that halted the run
    fn on_run_complete(&mut self);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback: Send {
    /// Ask the user to confirm an action
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_run_start(&mut self, _steps: usize, _privileged: bool) {}
    fn on_resource_start(&mut self, _recipe: &str, _id: &str, _description: &str) {}
    fn on_resource_complete(&mut self, _recipe: &str, _id: &str, _result: &ApplyResult) {}
    fn on_run_complete(&mut self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Context passed to resource apply operations
pub struct ApplyContext<'a> {
    /// Whether this is a dry run (no actual changes)
    pub dry_run: bool,
    /// Whether to output verbose information
    pub verbose: bool,
    /// Sudo provider, present only when the run acquired privileges
    pub sudo: Option<&'a dyn SudoProvider>,
}

impl<'a> ApplyContext<'a> {
    /// Create a new apply context
    pub fn new(dry_run: bool, verbose: bool) -> Self {
        Self {
            dry_run,
            verbose,
            sudo: None,
        }
    }

    /// Create a context with a sudo provider
    pub fn with_sudo(dry_run: bool, verbose: bool, sudo: &'a dyn SudoProvider) -> Self {
        Self {
            dry_run,
            verbose,
            sudo: Some(sudo),
        }
    }

    /// Get the sudo provider, or a privilege error if none was acquired
    pub fn require_sudo(&self) -> Result<&dyn SudoProvider> {
        self.sudo.ok_or_else(|| {
            crate::Error::PermissionDenied {
                message: "elevated privileges required but not acquired".to_string(),
            }
            .into()
        })
    }
}
