//! User account resource - created with useradd if missing

use anyhow::{Context, Result, bail};
use declarative::Error;
use std::path::PathBuf;
use std::process::Command;

use super::{ApplyContext, ApplyResult, Resource, ResourceState, SudoRequirement};
use crate::users;

/// An account that must exist
///
/// Only existence is reconciled. Home and shell are used when creating
/// the account and are not enforced afterwards.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub name: String,
    /// Create as a system account (`useradd -r`)
    pub system: bool,
    /// Home directory to create (`useradd -m -d`)
    pub home: Option<PathBuf>,
    pub shell: Option<String>,
    pub requires_sudo: bool,
}

impl UserAccount {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            system: false,
            home: None,
            shell: None,
            requires_sudo: false,
        }
    }

    pub fn system(mut self, system: bool) -> Self {
        self.system = system;
        self
    }

    pub fn home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    pub fn shell(mut self, shell: Option<String>) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_sudo(mut self, requires: bool) -> Self {
        self.requires_sudo = requires;
        self
    }

    /// `useradd` arguments, account name last
    pub fn useradd_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.system {
            args.push("-r".to_string());
        }
        if let Some(home) = &self.home {
            args.push("-m".to_string());
            args.push("-d".to_string());
            args.push(home.to_string_lossy().to_string());
        }
        if let Some(shell) = &self.shell {
            args.push("-s".to_string());
            args.push(shell.clone());
        }
        args.push(self.name.clone());
        args
    }

    fn exists(&self) -> Result<bool> {
        Ok(users::by_name(&self.name)?.is_some())
    }

    fn create(&self, ctx: &ApplyContext) -> Result<()> {
        let args = self.useradd_args();
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        let (success, stderr) = if self.requires_sudo {
            let output = ctx.require_sudo()?.run("useradd", &arg_refs)?;
            (output.success, output.stderr_str())
        } else {
            let output = Command::new("useradd")
                .args(&arg_refs)
                .output()
                .context("Failed to run useradd")?;
            (
                output.status.success(),
                String::from_utf8_lossy(&output.stderr).to_string(),
            )
        };

        if !success {
            let lower = stderr.to_lowercase();
            if lower.contains("permission denied") || lower.contains("cannot lock") {
                return Err(Error::PermissionDenied {
                    message: stderr.trim().to_string(),
                }
                .into());
            }
            bail!("useradd {} failed: {}", self.name, stderr.trim());
        }

        Ok(())
    }
}

impl Resource for UserAccount {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        if self.system {
            format!("System user {}", self.name)
        } else {
            format!("User {}", self.name)
        }
    }

    fn resource_type(&self) -> &'static str {
        "user"
    }

    fn sudo_requirement(&self) -> SudoRequirement {
        if self.requires_sudo {
            SudoRequirement::Required {
                reason: format!("Creating user {} requires root", self.name),
            }
        } else {
            SudoRequirement::None
        }
    }

    fn current_state(&self) -> Result<ResourceState> {
        if self.exists()? {
            Ok(ResourceState::Present { details: None })
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present { details: None }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        if self.exists()? {
            return Ok(ApplyResult::NoChange);
        }

        self.create(ctx)?;
        Ok(ApplyResult::Created)
    }
}
