//! Diff computation for resources

use crate::resource::{Resource, ResourceExt};
use crate::types::ResourceState;
use anyhow::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A diff between current and desired state of a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Recipe that declared the resource, when known
    pub recipe: Option<String>,
    /// Unique identifier of the resource
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// Current state
    pub current: ResourceState,
    /// Desired state
    pub desired: ResourceState,
    /// Whether this resource requires sudo
    pub requires_sudo: bool,
}

impl ResourceDiff {
    /// Create a diff from a resource, returning None if no changes needed
    pub fn from_resource(resource: &dyn Resource) -> Result<Option<Self>> {
        let current = resource.current_state()?;
        Ok(Self::with_current(resource, current))
    }

    /// Build a diff from an already detected current state
    fn with_current(resource: &dyn Resource, current: ResourceState) -> Option<Self> {
        let desired = resource.desired_state();
        if current == desired {
            return None;
        }

        Some(Self {
            recipe: None,
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            current,
            desired,
            requires_sudo: resource.requires_sudo(),
        })
    }

    /// Attach the declaring recipe
    pub fn in_recipe(mut self, recipe: impl Into<String>) -> Self {
        self.recipe = Some(recipe.into());
        self
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Absent, ResourceState::Present { .. })
        )
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Present { .. }, ResourceState::Absent)
        )
    }

    /// Check if this diff represents a modification
    pub fn is_modification(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Modified { .. }, _)
                | (_, ResourceState::Modified { .. })
                | (ResourceState::Present { .. }, ResourceState::Present { .. })
        )
    }

    /// Check if the current state could not be detected
    pub fn is_unknown(&self) -> bool {
        matches!(self.current, ResourceState::Unknown)
    }
}

/// Detect state, turning detection failures into an `Unknown` diff
fn detect(resource: &dyn Resource) -> Option<ResourceDiff> {
    match resource.current_state() {
        Ok(current) => ResourceDiff::with_current(resource, current),
        Err(e) => {
            log::warn!("Could not detect state of {}: {:#}", resource.id(), e);
            ResourceDiff::with_current(resource, ResourceState::Unknown)
        }
    }
}

/// Compute diffs for a list of resources
///
/// Only resources that differ from their desired state are returned, in
/// the order given. Detection is read-only and runs on up to `jobs`
/// threads.
pub fn compute_diffs(resources: &[&dyn Resource], jobs: usize) -> Vec<ResourceDiff> {
    let detected: Vec<Option<ResourceDiff>> = if jobs <= 1 || resources.len() <= 1 {
        resources.iter().map(|r| detect(*r)).collect()
    } else {
        match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => pool.install(|| resources.par_iter().map(|r| detect(*r)).collect()),
            Err(e) => {
                log::warn!("Failed to create detection thread pool: {}", e);
                resources.iter().map(|r| detect(*r)).collect()
            }
        }
    };

    detected.into_iter().flatten().collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify
    pub modifications: usize,
    /// Number of resources whose state is unknown
    pub unknown: usize,
    /// Number of resources requiring sudo
    pub sudo_required: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else if diff.is_unknown() {
                summary.unknown += 1;
            } else {
                summary.modifications += 1;
            }
            if diff.requires_sudo {
                summary.sudo_required += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications + self.unknown
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by recipe, keeping first-seen recipe order
pub fn group_by_recipe(diffs: &[ResourceDiff]) -> Vec<(String, Vec<&ResourceDiff>)> {
    let mut groups: Vec<(String, Vec<&ResourceDiff>)> = Vec::new();
    for diff in diffs {
        let recipe = diff.recipe.clone().unwrap_or_default();
        match groups.iter_mut().find(|(name, _)| *name == recipe) {
            Some((_, entries)) => entries.push(diff),
            None => groups.push((recipe, vec![diff])),
        }
    }
    groups
}
