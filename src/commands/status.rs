use anyhow::Result;
use colored::Colorize;
use declarative::{ExecutionPlan, ResourceDiff, ResourceState};
use serde::Serialize;
use std::collections::HashMap;

use crate::Context;
use crate::cli::StatusArgs;
use crate::engine::differ::{diff_symbol, state_change};
use crate::ui;

type Pending<'a> = HashMap<(&'a str, &'a str), &'a ResourceDiff>;

/// Index diffs by (recipe, resource id)
fn pending_by_step(diffs: &[ResourceDiff]) -> Pending<'_> {
    diffs
        .iter()
        .map(|d| ((d.recipe.as_deref().unwrap_or(""), d.resource_id.as_str()), d))
        .collect()
}

/// Every step of the plan, in order, with its sync state
fn entries(plan: &ExecutionPlan, pending: &Pending<'_>) -> Vec<StatusEntry> {
    plan.steps
        .iter()
        .map(|step| {
            let id = step.resource.id();
            let desired = step.resource.desired_state();
            let diff = pending.get(&(step.recipe.as_str(), id.as_str()));
            StatusEntry {
                recipe: step.recipe.clone(),
                resource_type: step.resource.resource_type().to_string(),
                description: step.resource.description(),
                in_sync: diff.is_none(),
                current: diff.map_or_else(|| desired.clone(), |d| d.current.clone()),
                requires_sudo: diff.is_some_and(|d| d.requires_sudo),
                desired,
                id,
            }
        })
        .collect()
}

/// One assertion as reported by `status --json`
#[derive(Debug, Serialize)]
struct StatusEntry {
    recipe: String,
    resource_type: String,
    id: String,
    description: String,
    in_sync: bool,
    current: ResourceState,
    desired: ResourceState,
    requires_sudo: bool,
}

pub fn run(ctx: &Context, args: StatusArgs) -> Result<()> {
    let plan = super::load_plan(ctx, &args.selection)?;
    let diffs = plan.diffs(super::DETECT_JOBS);
    let pending = pending_by_step(&diffs);
    let entries = entries(&plan, &pending);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    ui::header("Host Status");

    let mut current_recipe = "";
    for entry in &entries {
        if entry.recipe != current_recipe {
            ui::section(&format!("recipe {}", entry.recipe));
            current_recipe = &entry.recipe;
        }

        let diff = pending.get(&(entry.recipe.as_str(), entry.id.as_str()));
        let (symbol, note) = match diff {
            None => ("✓".green(), String::new()),
            Some(d) => (diff_symbol(d), state_change(d)),
        };

        println!(
            "  {} {:<10} {:<24} {}",
            symbol,
            entry.resource_type.dimmed(),
            entry.id,
            note.dimmed()
        );
    }

    println!();
    let out_of_sync = diffs.len();
    if out_of_sync == 0 {
        ui::success(&format!("All {} assertions in sync", entries.len()));
    } else {
        ui::warn(&format!(
            "{} of {} assertions out of sync (run `hoststate apply`)",
            out_of_sync,
            entries.len()
        ));
    }

    Ok(())
}
