//! Directory resource - existence, permission bits and owner

use anyhow::{Context, Result};
use declarative::Error;
use std::fs;
use std::io;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use super::{ApplyContext, ApplyResult, Resource, ResourceState, SudoRequirement};
use crate::sudo::Privileges;
use crate::users;

/// A directory that must exist with an exact mode and owner
///
/// Creation is not recursive: the parent must already exist, so a
/// declaration lists every level it cares about.
#[derive(Debug, Clone)]
pub struct Directory {
    pub path: PathBuf,
    /// Permission bits, at most 0o7777
    pub mode: u32,
    pub owner: String,
    /// Always go through sudo
    pub requires_sudo: bool,
    /// Unprivileged invoking user; sudo is then decided from the path
    invoker: Option<Privileges>,
}

#[derive(Debug)]
enum DirectoryState {
    Missing,
    /// Something other than a directory sits at the path
    Conflict(&'static str),
    Correct,
    Drifted { mode: u32, owner: String },
}

impl Directory {
    pub fn new(path: impl AsRef<Path>, mode: u32, owner: &str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            mode,
            owner: owner.to_string(),
            requires_sudo: false,
            invoker: None,
        }
    }

    pub fn with_sudo(mut self, requires: bool) -> Self {
        self.requires_sudo = requires;
        self
    }

    /// Reconcile as this user, escalating when the host requires it
    pub fn run_as(mut self, privileges: &Privileges) -> Self {
        self.invoker = (!privileges.root).then(|| privileges.clone());
        self
    }

    /// Why reaching the desired state needs root, judged from the host
    ///
    /// Only the owner may chmod a path, only root may give it away, and
    /// creating it needs write access to the parent. Group membership is
    /// not consulted: a parent writable only through its group still goes
    /// through sudo.
    fn sudo_reason(&self) -> Option<String> {
        if self.requires_sudo {
            return Some(format!("{} is owned by {}", self.path.display(), self.owner));
        }

        let invoker = self.invoker.as_ref()?;
        if invoker.user != self.owner {
            return Some(format!(
                "{} must be owned by {}",
                self.path.display(),
                self.owner
            ));
        }

        match fs::metadata(&self.path) {
            Ok(meta) if meta.is_dir() && meta.uid() != invoker.uid => Some(format!(
                "{} is owned by {}",
                self.path.display(),
                users::name_of(meta.uid())
            )),
            Ok(_) => None,
            Err(_) => {
                // A missing parent fails on create either way
                let parent = self.path.parent()?;
                let meta = fs::metadata(parent).ok()?;
                (!writable_by(&meta, invoker.uid)).then(|| {
                    format!("{} is not writable by {}", parent.display(), invoker.user)
                })
            }
        }
    }

    fn needs_sudo(&self) -> bool {
        self.sudo_reason().is_some()
    }

    fn details(mode: u32, owner: &str) -> String {
        format!("mode {:04o}, owner {}", mode, owner)
    }

    fn check_current(&self) -> Result<DirectoryState> {
        let meta = match fs::metadata(&self.path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // A dangling symlink still occupies the path
                return Ok(if fs::symlink_metadata(&self.path).is_ok() {
                    DirectoryState::Conflict("dangling symlink")
                } else {
                    DirectoryState::Missing
                });
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to stat {}", self.path.display()));
            }
        };

        if !meta.is_dir() {
            return Ok(DirectoryState::Conflict(if meta.is_file() {
                "regular file"
            } else {
                "special file"
            }));
        }

        let mode = meta.permissions().mode() & 0o7777;
        let owner = users::name_of(meta.uid());

        if mode == self.mode && owner == self.owner {
            Ok(DirectoryState::Correct)
        } else {
            Ok(DirectoryState::Drifted { mode, owner })
        }
    }

    fn conflict(&self, found: &str) -> anyhow::Error {
        Error::PathConflict {
            path: self.path.clone(),
            found: found.to_string(),
            expected: "directory".to_string(),
        }
        .into()
    }

    /// Resolve the owner before touching the filesystem
    fn owner_uid(&self) -> Result<u32> {
        users::by_name(&self.owner)?
            .map(|u| u.uid)
            .ok_or_else(|| Error::UnknownUser(self.owner.clone()).into())
    }

    fn create(&self, ctx: &ApplyContext) -> Result<()> {
        let uid = self.owner_uid()?;

        if self.needs_sudo() {
            let sudo = ctx.require_sudo()?;
            let path = self.path.to_string_lossy();
            sudo.run_checked("mkdir", &["--", &path])?;
            sudo.run_checked("chmod", &[&format!("{:04o}", self.mode), "--", &path])?;
            sudo.run_checked("chown", &[&self.owner, "--", &path])?;
            return Ok(());
        }

        fs::create_dir(&self.path).with_context(|| {
            let parent = self.path.parent().unwrap_or(Path::new("/"));
            if parent.exists() {
                format!("Failed to create {}", self.path.display())
            } else {
                format!(
                    "Failed to create {}: parent {} does not exist",
                    self.path.display(),
                    parent.display()
                )
            }
        })?;
        self.set_mode()?;
        self.set_owner(uid)
    }

    fn repair(&self, ctx: &ApplyContext, mode: u32, owner: &str) -> Result<()> {
        let uid = self.owner_uid()?;

        if self.needs_sudo() {
            let sudo = ctx.require_sudo()?;
            let path = self.path.to_string_lossy();
            if mode != self.mode {
                sudo.run_checked("chmod", &[&format!("{:04o}", self.mode), "--", &path])?;
            }
            if owner != self.owner {
                sudo.run_checked("chown", &[&self.owner, "--", &path])?;
            }
            return Ok(());
        }

        if mode != self.mode {
            self.set_mode()?;
        }
        if owner != self.owner {
            self.set_owner(uid)?;
        }
        Ok(())
    }

    fn set_mode(&self) -> Result<()> {
        fs::set_permissions(&self.path, fs::Permissions::from_mode(self.mode)).with_context(
            || {
                format!(
                    "Failed to set mode {:04o} on {}",
                    self.mode,
                    self.path.display()
                )
            },
        )?;
        verify_mode(&self.path, self.mode)
    }

    fn set_owner(&self, uid: u32) -> Result<()> {
        std::os::unix::fs::chown(&self.path, Some(uid), None).with_context(|| {
            format!(
                "Failed to change owner of {} to {}",
                self.path.display(),
                self.owner
            )
        })
    }
}

impl Resource for Directory {
    fn id(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    fn description(&self) -> String {
        format!(
            "Directory {} ({})",
            self.path.display(),
            Self::details(self.mode, &self.owner)
        )
    }

    fn resource_type(&self) -> &'static str {
        "directory"
    }

    fn sudo_requirement(&self) -> SudoRequirement {
        match self.sudo_reason() {
            Some(reason) => SudoRequirement::Required { reason },
            None => SudoRequirement::None,
        }
    }

    fn current_state(&self) -> Result<ResourceState> {
        match self.check_current()? {
            DirectoryState::Missing => Ok(ResourceState::Absent),
            DirectoryState::Conflict(found) => Ok(ResourceState::Modified {
                from: found.to_string(),
                to: "directory".to_string(),
            }),
            DirectoryState::Correct => Ok(self.desired_state()),
            DirectoryState::Drifted { mode, owner } => Ok(ResourceState::Present {
                details: Some(Self::details(mode, &owner)),
            }),
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::Present {
            details: Some(Self::details(self.mode, &self.owner)),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        match self.check_current()? {
            DirectoryState::Correct => Ok(ApplyResult::NoChange),
            DirectoryState::Conflict(found) => Err(self.conflict(found)),
            DirectoryState::Missing => {
                self.create(ctx)?;
                Ok(ApplyResult::Created)
            }
            DirectoryState::Drifted { mode, owner } => {
                self.repair(ctx, mode, &owner)?;
                Ok(ApplyResult::Modified)
            }
        }
    }
}

/// Whether `uid` may create entries in the directory described by `meta`
fn writable_by(meta: &fs::Metadata, uid: u32) -> bool {
    let bits = meta.mode();
    if meta.uid() == uid {
        bits & 0o300 == 0o300
    } else {
        bits & 0o003 == 0o003
    }
}

/// Fail when the kernel did not keep the requested bits
///
/// An unprivileged chmod silently drops setgid for a group the caller is
/// not in; reporting success would leave the directory drifted.
fn verify_mode(path: &Path, wanted: u32) -> Result<()> {
    let actual = fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .permissions()
        .mode()
        & 0o7777;

    if actual == wanted {
        return Ok(());
    }

    Err(Error::PermissionDenied {
        message: format!(
            "mode {:04o} on {} was reduced to {:04o}",
            wanted,
            path.display(),
            actual
        ),
    }
    .into())
}
