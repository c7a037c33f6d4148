//! System package resource - installed at whatever version the manager resolves

use anyhow::{Context, Result};
use declarative::Error;
use pkgkit::{Client, ErrorCategory, Package};
use std::sync::Arc;

use super::{ApplyContext, ApplyResult, Resource, ResourceState, SudoRequirement};

/// A package that must be installed
#[derive(Clone)]
pub struct SystemPackage {
    pub name: String,
    pub requires_sudo: bool,
    client: Arc<Client>,
}

impl std::fmt::Debug for SystemPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemPackage")
            .field("name", &self.name)
            .field("manager", &self.client.kind())
            .field("requires_sudo", &self.requires_sudo)
            .finish()
    }
}

impl SystemPackage {
    pub fn new(name: &str, client: Arc<Client>) -> Self {
        Self {
            name: name.to_string(),
            requires_sudo: false,
            client,
        }
    }

    pub fn with_sudo(mut self, requires: bool) -> Self {
        self.requires_sudo = requires;
        self
    }

    fn package(&self) -> Package {
        Package::new(&self.name)
    }

    fn installed_version(&self) -> Result<Option<String>> {
        self.client
            .installed_version(&self.package())
            .with_context(|| format!("Failed to query package {}", self.name))
    }

    fn install(&self, ctx: &ApplyContext) -> Result<()> {
        if self.requires_sudo {
            let cmd = self.client.install_command(&self.package());
            let output = ctx.require_sudo()?.run(&cmd.program, &cmd.arg_refs())?;
            if !output.success {
                let err = pkgkit::Error::from_output(&output.stderr_str(), Some(&self.name));
                return Err(self.classify(err));
            }
            return Ok(());
        }

        self.client
            .install(&self.package())
            .map_err(|e| self.classify(e))
    }

    /// Lift package manager failures into the engine's taxonomy
    fn classify(&self, err: pkgkit::Error) -> anyhow::Error {
        match err.category() {
            ErrorCategory::NotFound => Error::PackageNotFound {
                name: self.name.clone(),
            }
            .into(),
            ErrorCategory::Permission => Error::PermissionDenied {
                message: err.to_string(),
            }
            .into(),
            _ => anyhow::Error::new(err).context(format!("Failed to install {}", self.name)),
        }
    }
}

impl Resource for SystemPackage {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        format!("Install package {} via {}", self.name, self.client.kind())
    }

    fn resource_type(&self) -> &'static str {
        "package"
    }

    fn sudo_requirement(&self) -> SudoRequirement {
        if self.requires_sudo {
            SudoRequirement::Required {
                reason: format!("Installing {} requires root", self.name),
            }
        } else {
            SudoRequirement::None
        }
    }

    fn current_state(&self) -> Result<ResourceState> {
        // Any installed version satisfies the declaration
        match self.installed_version()? {
            Some(_) => Ok(ResourceState::Present { details: None }),
            None => Ok(ResourceState::Absent),
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

        if let Some(version) = self.installed_version()? {
            log::debug!("{} already installed at {}", self.name, version);
            return Ok(ApplyResult::NoChange);
        }

        self.install(ctx)?;
        Ok(ApplyResult::Created)
    }
}
