//! Concrete resources for host state declarations
//!
//! Each resource detects its current state, reports its desired state,
//! and converges one to the other. Privileged variants route their
//! commands through the sudo provider the engine hands them.

pub mod directory;
pub mod package;
pub mod user_account;

pub use declarative::{ApplyContext, ApplyResult, Resource, ResourceState, SudoRequirement};
pub use directory::Directory;
pub use package::SystemPackage;
pub use user_account::UserAccount;
