//! Core types for system package management.

use serde::{Deserialize, Serialize};

/// Supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagerKind {
    /// Fedora / RHEL 8+
    Dnf,
    /// RHEL / CentOS 7 and older
    Yum,
    /// Debian / Ubuntu
    Apt,
    /// In-memory backend, no host access
    Memory,
}

impl ManagerKind {
    /// Executable used to install packages.
    pub fn program(&self) -> &'static str {
        match self {
            ManagerKind::Dnf => "dnf",
            ManagerKind::Yum => "yum",
            ManagerKind::Apt => "apt-get",
            ManagerKind::Memory => "memory",
        }
    }
}

impl std::fmt::Display for ManagerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program())
    }
}

/// A system package to query or install.
///
/// There is no version field: installation always takes whatever version
/// the package manager resolves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Package {
    /// Package name as known to the package manager (e.g., "gcc-c++")
    pub name: String,
}

impl Package {
    /// Create a package with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// A command line that installs a package.
///
/// Exposed so callers can run it through their own privilege wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallCommand {
    /// Executable name
    pub program: String,
    /// Arguments, package name last
    pub args: Vec<String>,
}

impl InstallCommand {
    /// Arguments as string slices.
    pub fn arg_refs(&self) -> Vec<&str> {
        self.args.iter().map(String::as_str).collect()
    }
}

impl std::fmt::Display for InstallCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.program, self.args.join(" "))
    }
}
