use anyhow::Result;
use colored::Colorize;
use declarative::{Cookbook, Recipe};

use crate::Context;
use crate::config;
use crate::schema::HostConfig;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let (host_config, source) = config::load(ctx.config.as_deref())?;

    ui::header("Recipes");
    ui::kv("Source", &source.to_string());

    for (name, recipe) in &host_config.recipes {
        ui::section(name);
        if !recipe.depends.is_empty() {
            ui::kv("depends", &recipe.depends.join(", "));
        }
        ui::kv(
            "assertions",
            &format!(
                "{} users, {} directories, {} packages",
                recipe.users.len(),
                recipe.directories.len(),
                recipe.packages.len()
            ),
        );
    }

    println!();
    if host_config.run_list.is_empty() {
        ui::info("No run_list configured");
    } else {
        let order = run_order(&host_config, &host_config.run_list)?;
        ui::kv("run_list", &host_config.run_list.join(", "));
        ui::kv("order", &order.join(" → ").bold().to_string());
    }

    Ok(())
}

/// Dependency order for a run list, without touching the host
fn run_order(host_config: &HostConfig, run_list: &[String]) -> Result<Vec<String>> {
    let mut cookbook = Cookbook::new();
    for (name, recipe) in &host_config.recipes {
        let mut entry = Recipe::new(name);
        for dep in &recipe.depends {
            entry = entry.depends_on(dep);
        }
        cookbook.add(entry);
    }
    Ok(cookbook.resolve(run_list)?)
}
