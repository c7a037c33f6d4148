//! Execution planner - ordered resource steps

use crate::diff::{ResourceDiff, compute_diffs};
use crate::resource::{BoxedResource, Resource, ResourceExt};
use std::collections::{HashMap, HashSet};

/// One resource to apply, tagged with the recipe that declared it
#[derive(Debug)]
pub struct PlanStep {
    /// Declaring recipe
    pub recipe: String,
    /// The resource itself
    pub resource: BoxedResource,
}

impl PlanStep {
    /// Create a new step
    pub fn new(recipe: impl Into<String>, resource: BoxedResource) -> Self {
        Self {
            recipe: recipe.into(),
            resource,
        }
    }
}

/// An execution plan: steps applied strictly in order
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    pub steps: Vec<PlanStep>,
    /// Direct dependencies of each recipe in the plan
    depends: HashMap<String, Vec<String>>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step
    pub fn push(&mut self, step: PlanStep) {
        self.steps.push(step);
    }

    /// Record the recipes `recipe` depends on
    pub fn set_dependencies(&mut self, recipe: impl Into<String>, depends: Vec<String>) {
        self.depends.insert(recipe.into(), depends);
    }

    /// Every recipe the given recipes depend on, directly or not
    fn dependencies_of<'a>(&'a self, recipes: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
        let mut found = HashSet::new();
        let mut stack: Vec<&str> = recipes.into_iter().collect();

        while let Some(recipe) = stack.pop() {
            for dep in self.depends.get(recipe).into_iter().flatten() {
                if found.insert(dep.clone()) {
                    stack.push(dep);
                }
            }
        }

        found
    }

    /// Diffs for every step that is out of sync, in plan order
    pub fn diffs(&self, jobs: usize) -> Vec<ResourceDiff> {
        let mut out = Vec::new();
        // Detect per recipe so each diff carries its recipe name
        let mut start = 0;
        while start < self.steps.len() {
            let recipe = &self.steps[start].recipe;
            let end = self.steps[start..]
                .iter()
                .position(|s| &s.recipe != recipe)
                .map_or(self.steps.len(), |n| start + n);

            let resources: Vec<&dyn Resource> = self.steps[start..end]
                .iter()
                .map(|s| s.resource.as_ref())
                .collect();
            out.extend(
                compute_diffs(&resources, jobs)
                    .into_iter()
                    .map(|d| d.in_recipe(recipe.as_str())),
            );
            start = end;
        }
        out
    }

    /// Filter plan to only include steps matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&PlanStep) -> bool,
    {
        let Self { steps, depends } = self;
        Self {
            steps: steps.into_iter().filter(|s| predicate(s)).collect(),
            depends,
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type" or "type.name". The name part may contain
    /// dots (`package.gcc-c++`, `directory./var/www`). Recipes that a
    /// matching step's recipe depends on keep all their steps, so a
    /// dependency still runs before anything that relies on it.
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                let matches = |s: &PlanStep| {
                    matches_filter(s.resource.as_ref(), resource_type.as_deref(), name.as_deref())
                };
                let required = self.dependencies_of(
                    self.steps
                        .iter()
                        .filter(|s| matches(*s))
                        .map(|s| s.recipe.as_str()),
                );
                self.filter(|s| matches(s) || required.contains(&s.recipe))
            }
        }
    }

    /// Restrict the plan to the given recipes
    pub fn filter_by_recipes(self, recipes: &[String]) -> Self {
        if recipes.is_empty() {
            return self;
        }
        self.filter(|s| recipes.iter().any(|r| *r == s.recipe))
    }

    /// Total number of steps in the plan
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check if plan has any privileged resources
    pub fn has_privileged(&self) -> bool {
        self.steps.iter().any(|s| s.resource.requires_sudo())
    }
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((kind, name)) if is_type_name(kind) => (Some(kind.to_string()), Some(name.to_string())),
        Some(_) => (None, Some(target.to_string())),
    }
}

fn is_type_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic() || c == '_')
}

/// Check if a resource matches the filter criteria
fn matches_filter(
    resource: &dyn Resource,
    resource_type: Option<&str>,
    name: Option<&str>,
) -> bool {
    if let Some(rt) = resource_type {
        // Allow common aliases
        let matches_type = match rt {
            "dirs" | "directories" => resource.resource_type() == "directory",
            "packages" | "pkg" => resource.resource_type() == "package",
            "users" => resource.resource_type() == "user",
            _ => resource.resource_type() == rt,
        };
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name
        && !resource.id().contains(n)
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ApplyContext;
    use crate::types::{ApplyResult, ResourceState};
    use anyhow::Result;

    #[derive(Debug)]
    struct Stub {
        kind: &'static str,
        id: &'static str,
        in_sync: bool,
    }

    impl Resource for Stub {
        fn id(&self) -> String {
            self.id.to_string()
        }

        fn description(&self) -> String {
            format!("{} {}", self.kind, self.id)
        }

        fn resource_type(&self) -> &'static str {
            self.kind
        }

        fn current_state(&self) -> Result<ResourceState> {
            Ok(if self.in_sync {
                ResourceState::Present { details: None }
            } else {
                ResourceState::Absent
            })
        }

        fn desired_state(&self) -> ResourceState {
            ResourceState::Present { details: None }
        }

        fn apply(&self, _ctx: &mut ApplyContext) -> Result<ApplyResult> {
            Ok(ApplyResult::NoChange)
        }
    }

    fn plan() -> ExecutionPlan {
        let mut plan = ExecutionPlan::new();
        for (recipe, kind, id, in_sync) in [
            ("user", "user", "app", true),
            ("rails", "directory", "/var", true),
            ("rails", "directory", "/var/www", false),
            ("rails", "package", "gcc-c++", false),
            ("rails", "package", "sqlite-devel", true),
        ] {
            plan.push(PlanStep::new(recipe, Box::new(Stub { kind, id, in_sync })));
        }
        plan.set_dependencies("user", Vec::new());
        plan.set_dependencies("rails", vec!["user".to_string()]);
        plan
    }

    fn step_ids(plan: &ExecutionPlan) -> Vec<(&str, String)> {
        plan.steps
            .iter()
            .map(|s| (s.recipe.as_str(), s.resource.id()))
            .collect()
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("package"), (Some("package".to_string()), None));
        assert_eq!(
            parse_target("package.gcc-c++"),
            (Some("package".to_string()), Some("gcc-c++".to_string()))
        );
        assert_eq!(
            parse_target("directory./var/www"),
            (Some("directory".to_string()), Some("/var/www".to_string()))
        );
        assert_eq!(parse_target("/etc/x.conf"), (None, Some("/etc/x.conf".to_string())));
    }

    #[test]
    fn test_filter_by_target_alias() {
        let filtered = plan().filter_by_target(Some("packages"));
        assert_eq!(
            filtered
                .steps
                .iter()
                .filter(|s| s.resource.resource_type() == "package")
                .count(),
            2
        );

        let filtered = plan().filter_by_target(Some("directory./var/www"));
        assert_eq!(
            step_ids(&filtered),
            [("user", "app".to_string()), ("rails", "/var/www".to_string())]
        );
    }

    #[test]
    fn test_filter_keeps_dependency_recipes_first() {
        let filtered = plan().filter_by_target(Some("directory"));
        assert_eq!(
            step_ids(&filtered),
            [
                ("user", "app".to_string()),
                ("rails", "/var".to_string()),
                ("rails", "/var/www".to_string()),
            ]
        );
    }

    #[test]
    fn test_filter_does_not_pull_in_dependents() {
        let filtered = plan().filter_by_target(Some("user"));
        assert_eq!(step_ids(&filtered), [("user", "app".to_string())]);
    }

    #[test]
    fn test_transitive_dependencies_kept() {
        let mut plan = ExecutionPlan::new();
        for (recipe, id) in [("base", "root"), ("user", "app"), ("rails", "/var")] {
            plan.push(PlanStep::new(
                recipe,
                Box::new(Stub {
                    kind: if recipe == "rails" { "directory" } else { "user" },
                    id,
                    in_sync: false,
                }),
            ));
        }
        plan.set_dependencies("user", vec!["base".to_string()]);
        plan.set_dependencies("rails", vec!["user".to_string()]);

        assert_eq!(plan.filter_by_target(Some("directory")).len(), 3);
    }

    #[test]
    fn test_filter_by_recipes() {
        let filtered = plan().filter_by_recipes(&["user".to_string()]);
        assert_eq!(filtered.len(), 1);
        assert_eq!(plan().filter_by_recipes(&[]).len(), 5);
    }

    #[test]
    fn test_diffs_carry_recipe_in_order() {
        let diffs = plan().diffs(2);
        let ids: Vec<_> = diffs.iter().map(|d| d.resource_id.as_str()).collect();
        assert_eq!(ids, ["/var/www", "gcc-c++"]);
        assert!(diffs.iter().all(|d| d.recipe.as_deref() == Some("rails")));
    }
}
