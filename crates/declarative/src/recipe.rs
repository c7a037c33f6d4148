//! Recipes and run-list resolution
//!
//! A recipe is a named, ordered list of resources plus the names of the
//! recipes that must be reconciled before it. A [`Cookbook`] holds every
//! known recipe and expands a run list into dependency order.

use crate::error::{Error, Result};
use crate::planner::{ExecutionPlan, PlanStep};
use crate::resource::BoxedResource;
use std::collections::HashMap;

/// A named unit of provisioning
#[derive(Debug)]
pub struct Recipe {
    /// Recipe name, unique within a cookbook
    pub name: String,
    /// Recipes that must complete before this one
    pub depends: Vec<String>,
    /// Resources in declaration order
    pub resources: Vec<BoxedResource>,
}

impl Recipe {
    /// Create an empty recipe
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            depends: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Declare a dependency on another recipe
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends.push(name.into());
        self
    }

    /// Append a resource
    pub fn resource(mut self, resource: BoxedResource) -> Self {
        self.resources.push(resource);
        self
    }
}

/// Collection of recipes available to a run
#[derive(Debug, Default)]
pub struct Cookbook {
    recipes: HashMap<String, Recipe>,
    /// Names in insertion order, for listing
    order: Vec<String>,
}

impl Cookbook {
    /// Create an empty cookbook
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a recipe, replacing any recipe with the same name
    pub fn add(&mut self, recipe: Recipe) {
        if !self.recipes.contains_key(&recipe.name) {
            self.order.push(recipe.name.clone());
        }
        self.recipes.insert(recipe.name.clone(), recipe);
    }

    /// Look up a recipe by name
    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }

    /// Iterate recipes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.order.iter().filter_map(|name| self.recipes.get(name))
    }

    /// Number of recipes
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Check if the cookbook has no recipes
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Expand a run list into the order recipes must be reconciled
    ///
    /// Dependencies come before dependents, each recipe appears once, and
    /// siblings keep their declared order.
    pub fn resolve(&self, run_list: &[String]) -> Result<Vec<String>> {
        let mut resolved = Vec::new();
        let mut visiting = Vec::new();

        for name in run_list {
            self.visit(name, None, &mut visiting, &mut resolved)?;
        }

        Ok(resolved)
    }

    fn visit(
        &self,
        name: &str,
        required_by: Option<&str>,
        visiting: &mut Vec<String>,
        resolved: &mut Vec<String>,
    ) -> Result<()> {
        if resolved.iter().any(|r| r == name) {
            return Ok(());
        }

        if let Some(pos) = visiting.iter().position(|v| v == name) {
            let mut chain = visiting[pos..].to_vec();
            chain.push(name.to_string());
            return Err(Error::DependencyCycle { chain });
        }

        let recipe = self.recipes.get(name).ok_or_else(|| Error::RecipeNotFound {
            name: name.to_string(),
            required_by: required_by.map(str::to_string),
        })?;

        visiting.push(name.to_string());
        for dep in &recipe.depends {
            self.visit(dep, Some(name), visiting, resolved)?;
        }
        visiting.pop();

        log::debug!("Resolved recipe {}", name);
        resolved.push(name.to_string());
        Ok(())
    }

    /// Resolve a run list and consume the cookbook into an execution plan
    pub fn into_plan(mut self, run_list: &[String]) -> Result<ExecutionPlan> {
        let order = self.resolve(run_list)?;
        let mut plan = ExecutionPlan::new();

        for name in order {
            if let Some(recipe) = self.recipes.remove(&name) {
                plan.set_dependencies(&recipe.name, recipe.depends);
                for resource in recipe.resources {
                    plan.push(PlanStep::new(&recipe.name, resource));
                }
            }
        }

        Ok(plan)
    }
}
