//! In-memory backend.
//!
//! Tracks "installed" packages in a set and resolves installs against a
//! fixed catalog. Used by tests and by callers that want to evaluate a
//! declaration without touching the host.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{InstallCommand, ManagerKind, Package};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Backend that never leaves the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    /// Packages the "repositories" can provide, with their version
    catalog: HashMap<String, String>,
    /// Installed packages and versions
    installed: Mutex<HashMap<String, String>>,
    /// Every successful install, in order
    journal: Mutex<Vec<String>>,
    /// Simulate a non-root caller
    deny_install: bool,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a package available for installation.
    pub fn with_available(mut self, name: &str, version: &str) -> Self {
        self.catalog.insert(name.to_string(), version.to_string());
        self
    }

    /// Mark a package as already installed.
    pub fn with_installed(self, name: &str, version: &str) -> Self {
        self.installed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), version.to_string());
        self
    }

    /// Fail every install with a permission error.
    pub fn deny_install(mut self) -> Self {
        self.deny_install = true;
        self
    }

    /// Names installed through this backend, in install order.
    pub fn journal(&self) -> Vec<String> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Backend for MemoryBackend {
    fn kind(&self) -> ManagerKind {
        ManagerKind::Memory
    }

    fn is_available(&self) -> bool {
        true
    }

    fn installed_version(&self, package: &Package) -> Result<Option<String>> {
        Ok(self
            .installed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&package.name)
            .cloned())
    }

    fn install_command(&self, package: &Package) -> InstallCommand {
        InstallCommand {
            program: "memory".to_string(),
            args: vec!["install".into(), package.name.clone()],
        }
    }

    fn install(&self, package: &Package) -> Result<()> {
        if self.deny_install {
            return Err(Error::Permission {
                message: format!("cannot install {}: not root", package.name),
            });
        }

        let version = self
            .catalog
            .get(&package.name)
            .ok_or_else(|| Error::NotFound {
                name: package.name.clone(),
            })?;

        let mut installed = self.installed.lock().unwrap_or_else(PoisonError::into_inner);
        if installed.contains_key(&package.name) {
            return Ok(());
        }
        installed.insert(package.name.clone(), version.clone());
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(package.name.clone());
        Ok(())
    }
}
