//! Error types for package manager operations.
//!
//! Package managers only report failures as text on stderr. Errors are
//! categorized from that text so callers can tell a missing package from
//! a privilege problem and give the user useful advice.

use thiserror::Error;

/// Categories of package manager errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Repository metadata or package download failed
    Network,
    /// Package not found in any enabled repository
    NotFound,
    /// Dependency or file conflict
    Conflict,
    /// Not running with enough privilege
    Permission,
    /// No supported package manager on this host
    ManagerNotFound,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network or repository issue",
            Self::NotFound => "Package not found",
            Self::Conflict => "Package conflict",
            Self::Permission => "Permission denied",
            Self::ManagerNotFound => "No package manager found",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check network access to the configured repositories",
            Self::NotFound => "Verify the package name or enable the repository that provides it",
            Self::Conflict => "Resolve the conflicting packages, then re-run",
            Self::Permission => "Run as root or through sudo",
            Self::ManagerNotFound => "Install dnf, yum, or apt-get, or check PATH",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur during package manager operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Repository or download failure
    #[error("network error: {message}")]
    Network {
        /// Package manager output
        message: String,
    },

    /// Package not found in any enabled repository
    #[error("package not found: {name}")]
    NotFound {
        /// Name of the package that could not be found
        name: String,
    },

    /// Dependency or file conflict
    #[error("conflict: {message}")]
    Conflict {
        /// Description of the conflict
        message: String,
    },

    /// Permission denied
    #[error("permission denied: {message}")]
    Permission {
        /// Details about what permission was denied
        message: String,
    },

    /// No supported package manager found in PATH
    #[error("no supported package manager found (tried dnf, yum, apt-get)")]
    ManagerNotFound,

    /// Command execution failed
    #[error("command failed: {message}")]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Network { .. } => ErrorCategory::Network,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Conflict { .. } => ErrorCategory::Conflict,
            Error::Permission { .. } => ErrorCategory::Permission,
            Error::ManagerNotFound => ErrorCategory::ManagerNotFound,
            Error::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                ErrorCategory::Permission
            }
            _ => ErrorCategory::Other,
        }
    }

    /// Create an error from package manager output.
    ///
    /// Understands the wording of dnf, yum, and apt-get.
    pub fn from_output(stderr: &str, package_name: Option<&str>) -> Self {
        let stderr_lower = stderr.to_lowercase();

        // Privilege first: apt reports lock failures before anything else
        if stderr_lower.contains("you need to be root")
            || stderr_lower.contains("are you root")
            || stderr_lower.contains("superuser privileges")
            || stderr_lower.contains("permission denied")
            || stderr_lower.contains("could not open lock file")
            || stderr_lower.contains("operation not permitted")
        {
            return Error::Permission {
                message: stderr.trim().to_string(),
            };
        }

        // Not found
        if stderr_lower.contains("no match for argument")
            || stderr_lower.contains("unable to find a match")
            || (stderr_lower.contains("no package") && stderr_lower.contains("available"))
            || stderr_lower.contains("unable to locate package")
            || stderr_lower.contains("has no installation candidate")
        {
            return Error::NotFound {
                name: package_name.unwrap_or("unknown").to_string(),
            };
        }

        // Network
        if stderr_lower.contains("could not resolve")
            || stderr_lower.contains("temporary failure resolving")
            || stderr_lower.contains("failed to download")
            || stderr_lower.contains("cannot download")
            || stderr_lower.contains("curl error")
            || stderr_lower.contains("timed out")
            || stderr_lower.contains("failed to fetch")
        {
            return Error::Network {
                message: stderr.trim().to_string(),
            };
        }

        // Conflicts
        if stderr_lower.contains("conflicts with")
            || stderr_lower.contains("conflicting requests")
            || stderr_lower.contains("unmet dependencies")
        {
            return Error::Conflict {
                message: stderr.trim().to_string(),
            };
        }

        Error::CommandFailed {
            message: format!(
                "package manager failed{}",
                package_name
                    .map(|n| format!(" for {n}"))
                    .unwrap_or_default()
            ),
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Result type for package manager operations.
pub type Result<T> = std::result::Result<T, Error>;
