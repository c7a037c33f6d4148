//! Error types for reconciliation.
//!
//! Every failure is fatal to the run. Errors are bucketed into a
//! [`FailureCategory`] so the caller can tell a path conflict from a
//! missing package or a privilege problem.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure taxonomy reported for the step that halted a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureCategory {
    /// Target path exists but has the wrong type
    PathConflict,
    /// Package name not found in the configured repositories
    PackageResolution,
    /// Insufficient privilege to create, chown, or install
    Privilege,
    /// A recipe dependency could not be resolved
    Dependency,
    /// The declaration itself is invalid
    Configuration,
    /// Anything else
    Other,
}

impl FailureCategory {
    /// Classify an apply error.
    ///
    /// Looks for a typed [`Error`] first, then for an I/O permission error
    /// anywhere in the chain.
    pub fn of(error: &anyhow::Error) -> Self {
        if let Some(e) = error.downcast_ref::<Error>() {
            return e.category();
        }

        for cause in error.chain() {
            if let Some(e) = cause.downcast_ref::<Error>() {
                return e.category();
            }
            if let Some(io) = cause.downcast_ref::<io::Error>()
                && io.kind() == io::ErrorKind::PermissionDenied
            {
                return Self::Privilege;
            }
        }

        Self::Other
    }

    /// User-facing description of the category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::PathConflict => "Path type conflict",
            Self::PackageResolution => "Package not found",
            Self::Privilege => "Insufficient privilege",
            Self::Dependency => "Unresolved recipe dependency",
            Self::Configuration => "Invalid declaration",
            Self::Other => "Unexpected error",
        }
    }

    /// Actionable advice for the category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::PathConflict => "Remove or move the conflicting path, then re-run",
            Self::PackageResolution => "Check the package name and the enabled repositories",
            Self::Privilege => "Re-run as root or allow sudo for this user",
            Self::Dependency => "Declare the missing recipe or fix the depends list",
            Self::Configuration => "Fix the recipe configuration",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Errors raised while resolving recipes or applying resources.
#[derive(Debug, Error)]
pub enum Error {
    /// Path exists but is not the expected kind of filesystem object
    #[error("{} exists but is a {found}, not a {expected}", .path.display())]
    PathConflict {
        path: PathBuf,
        found: String,
        expected: String,
    },

    /// Package could not be resolved by the package manager
    #[error("package not found: {name}")]
    PackageNotFound { name: String },

    /// Operation not permitted for the current user
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    /// Owner or dependency user does not exist
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// Recipe named in a run list or depends list does not exist
    #[error("recipe not found: {name}{}", .required_by.as_ref().map(|r| format!(" (required by {r})")).unwrap_or_default())]
    RecipeNotFound {
        name: String,
        required_by: Option<String>,
    },

    /// Recipes depend on each other in a loop
    #[error("dependency cycle: {}", .chain.join(" -> "))]
    DependencyCycle { chain: Vec<String> },

    /// Permission mode string is not octal or out of range
    #[error("invalid mode '{0}': expected octal permission bits such as 0755")]
    InvalidMode(String),

    /// Declaration failed validation
    #[error("invalid declaration: {0}")]
    Invalid(String),
}

impl Error {
    /// Get the failure category.
    pub fn category(&self) -> FailureCategory {
        match self {
            Error::PathConflict { .. } => FailureCategory::PathConflict,
            Error::PackageNotFound { .. } => FailureCategory::PackageResolution,
            Error::PermissionDenied { .. } => FailureCategory::Privilege,
            Error::RecipeNotFound { .. } | Error::DependencyCycle { .. } => {
                FailureCategory::Dependency
            }
            Error::UnknownUser(_) | Error::InvalidMode(_) | Error::Invalid(_) => {
                FailureCategory::Configuration
            }
        }
    }
}

/// Result type for recipe resolution.
pub type Result<T> = std::result::Result<T, Error>;
