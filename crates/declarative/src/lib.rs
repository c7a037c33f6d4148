//! # Declarative
//!
//! A minimal engine for idempotent host state reconciliation.
//!
//! Declare what a host should look like as an ordered list of resources,
//! grouped into recipes that may depend on each other. The engine detects
//! current state, diffs it against desired state, and applies only the
//! delta, one resource at a time, in order.
//!
//! ## Core Concepts
//!
//! - **Resource**: one desired-state assertion (a directory, a package)
//! - **ResourceState**: the current or desired state of a resource
//! - **Recipe / Cookbook**: named groups of resources with dependencies
//! - **ExecutionPlan**: the resolved, ordered list of steps
//! - **Executor**: applies steps in order and halts on the first failure
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{Cookbook, Recipe, ExecuteOptions, execute_simple};
//!
//! let mut cookbook = Cookbook::new();
//! cookbook.add(Recipe::new("user").resource(Box::new(user_app)));
//! cookbook.add(
//!     Recipe::new("rails")
//!         .depends_on("user")
//!         .resource(Box::new(var_dir))
//!         .resource(Box::new(gcc)),
//! );
//!
//! let plan = cookbook.into_plan(&["rails".to_string()])?;
//! let summary = execute_simple(plan, ExecuteOptions::default(), || {
//!     anyhow::bail!("No sudo available")
//! })?;
//! assert!(summary.is_success());
//! ```
//!
//! ## Failure model
//!
//! There is no retry and no rollback. The first failing step halts the
//! run; its [`FailureCategory`] tells a path conflict apart from a missing
//! package or a privilege problem.

pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod planner;
pub mod recipe;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback,
    SudoProvider,
};
pub use diff::{DiffSummary, ResourceDiff, compute_diffs, group_by_recipe};
pub use error::{Error, FailureCategory};
pub use executor::{execute, execute_simple, execute_with_diffs};
pub use planner::{ExecutionPlan, PlanStep};
pub use recipe::{Cookbook, Recipe};
pub use resource::{BoxedResource, Resource, ResourceExt};
pub use types::{
    ApplyResult, CommandOutput, ExecuteOptions, ExecuteSummary, ResourceState, StepFailure,
    SudoRequirement,
};
