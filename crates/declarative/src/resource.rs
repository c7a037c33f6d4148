//! Resource trait for host state assertions
//!
//! A Resource is one desired-state statement: something on the host that
//! can be observed and, if it differs, converged.

use crate::context::ApplyContext;
use crate::types::{ApplyResult, ResourceState, SudoRequirement};
use anyhow::Result;
use std::fmt;

/// Core trait for declarative resources
///
/// Implementations must be idempotent: `apply` on a resource that is
/// already in its desired state returns [`ApplyResult::NoChange`] and
/// touches nothing.
///
/// # Example
///
/// ```ignore
/// use declarative::{Resource, ResourceState, ApplyResult, ApplyContext};
///
/// #[derive(Debug)]
/// struct Marker { path: std::path::PathBuf }
///
/// impl Resource for Marker {
///     fn id(&self) -> String { self.path.display().to_string() }
///     fn description(&self) -> String { format!("Marker file {}", self.path.display()) }
///     fn resource_type(&self) -> &'static str { "marker" }
///
///     fn current_state(&self) -> anyhow::Result<ResourceState> {
///         Ok(if self.path.exists() {
///             ResourceState::Present { details: None }
///         } else {
///             ResourceState::Absent
///         })
///     }
///
///     fn desired_state(&self) -> ResourceState {
///         ResourceState::Present { details: None }
///     }
///
///     fn apply(&self, ctx: &mut ApplyContext) -> anyhow::Result<ApplyResult> {
///         if ctx.dry_run {
///             return Ok(ApplyResult::Skipped { reason: "Dry run".into() });
///         }
///         if self.path.exists() {
///             return Ok(ApplyResult::NoChange);
///         }
///         std::fs::write(&self.path, "")?;
///         Ok(ApplyResult::Created)
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Unique identifier within the resource type
    ///
    /// A path for directories, a package name for packages.
    fn id(&self) -> String;

    /// Human-readable description of what this resource ensures
    fn description(&self) -> String;

    /// Resource type category ("directory", "package", "user")
    fn resource_type(&self) -> &'static str;

    /// Whether this resource requires elevated privileges
    fn sudo_requirement(&self) -> SudoRequirement {
        SudoRequirement::None
    }

    /// Detect the current state on the host
    fn current_state(&self) -> Result<ResourceState>;

    /// The desired state, derived from the declaration
    fn desired_state(&self) -> ResourceState;

    /// Check if the resource needs changes to reach desired state
    fn needs_apply(&self) -> Result<bool> {
        let current = self.current_state()?;
        let desired = self.desired_state();
        Ok(current != desired)
    }

    /// Converge the host to the desired state
    ///
    /// Returns `Err` for any fatal condition (conflict, missing package,
    /// missing privilege). The executor halts the run on the first error.
    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult>;
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Extension trait for working with boxed resources
pub trait ResourceExt {
    /// Check if the resource requires sudo based on its requirement
    fn requires_sudo(&self) -> bool;
}

impl<R: Resource + ?Sized> ResourceExt for R {
    fn requires_sudo(&self) -> bool {
        matches!(self.sudo_requirement(), SudoRequirement::Required { .. })
    }
}
