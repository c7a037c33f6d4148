//! Execution engine for hoststate
//!
//! The engine orchestrates:
//! 1. Diffing - Compute current vs desired state and show it
//! 2. Executing - Apply steps in order, acquiring sudo at most once
//! 3. Reporting - Summarize changes and explain a halt

pub mod differ;
pub mod executor;

pub use executor::{ExecuteOptions, execute};
