//! # pkgkit
//!
//! Query and install system packages through the host's package manager.
//!
//! This crate provides:
//! - Detection of the package manager (dnf, yum, apt-get)
//! - Installed-version queries against the rpm or dpkg database
//! - Non-interactive installs with stderr-based error categorization
//! - An in-memory backend for tests
//!
//! ## Example
//!
//! ```no_run
//! use pkgkit::{Client, Package};
//!
//! let client = Client::new().expect("no package manager");
//! let gcc = Package::new("gcc-c++");
//! if !client.is_installed(&gcc).expect("query failed") {
//!     client.install(&gcc).expect("install failed");
//! }
//! ```
//!
//! Installs take whatever version the repositories resolve; there is no
//! pinning and no retry.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod types;

pub use backend::Backend;
pub use backend::memory::MemoryBackend;
pub use error::{Error, ErrorCategory, Result};
pub use types::{InstallCommand, ManagerKind, Package};

/// High-level client for package operations.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a client for the detected package manager.
    ///
    /// Returns [`Error::ManagerNotFound`] if none is installed.
    pub fn new() -> Result<Self> {
        let backend = backend::detect()?;
        log::debug!("Using package manager: {}", backend.kind());
        Ok(Self { backend })
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Which package manager this client drives.
    pub fn kind(&self) -> ManagerKind {
        self.backend.kind()
    }

    /// Check if the package manager is usable.
    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Check if a package is installed.
    pub fn is_installed(&self, package: &Package) -> Result<bool> {
        self.backend.is_installed(package)
    }

    /// Get the installed version of a package.
    pub fn installed_version(&self, package: &Package) -> Result<Option<String>> {
        self.backend.installed_version(package)
    }

    /// The command line that would install a package.
    pub fn install_command(&self, package: &Package) -> InstallCommand {
        self.backend.install_command(package)
    }

    /// Install a package.
    pub fn install(&self, package: &Package) -> Result<()> {
        self.backend.install(package)
    }
}
