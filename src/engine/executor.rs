//! Execution engine - hoststate executor with UI integration

use anyhow::{Result, bail};
use colored::Colorize;
use indicatif::ProgressBar;

use crate::progress;
use crate::sudo::SudoContext;
use crate::ui;
use declarative::{
    ApplyResult, AutoConfirm, ConfirmCallback, ExecuteSummary, ExecutionPlan, ProgressCallback,
    execute_with_diffs,
};

use super::differ::{display_diff, display_sudo_boundary};

/// Options for execution (includes `yes` for confirmation skip)
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Threads for state detection
    pub jobs: usize,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Whether a user can answer the confirmation prompt
    pub interactive: bool,
    /// Verbose output
    pub verbose: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            yes: false,
            interactive: false,
            verbose: false,
        }
    }
}

/// Progress bar that also prints one line per changed or failed step
#[derive(Default)]
struct TerminalProgress {
    bar: Option<ProgressBar>,
    verbose: bool,
}

impl ProgressCallback for TerminalProgress {
    fn on_run_start(&mut self, steps: usize, privileged: bool) {
        println!();
        println!(
            "  {} Applying {} resources{}...",
            "→".cyan(),
            steps,
            if privileged { " (with sudo)" } else { "" }
        );
        self.bar = Some(progress::bar(steps as u64, "Applying"));
    }

    fn on_resource_start(&mut self, recipe: &str, id: &str, _description: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("[{}] {}", recipe, ui::truncate_left(id, 40)));
        }
    }

    fn on_resource_complete(&mut self, recipe: &str, id: &str, result: &ApplyResult) {
        let Some(bar) = &self.bar else { return };

        let symbol = match result {
            ApplyResult::NoChange => result.symbol().dimmed(),
            ApplyResult::Created | ApplyResult::Modified | ApplyResult::Removed => {
                result.symbol().green()
            }
            ApplyResult::Failed { .. } => result.symbol().red(),
            ApplyResult::Skipped { .. } => result.symbol().yellow(),
        };

        let line = match result {
            ApplyResult::Created => Some("created".to_string()),
            ApplyResult::Modified => Some("modified".to_string()),
            ApplyResult::Removed => Some("removed".to_string()),
            ApplyResult::Failed { error } => Some(error.clone()),
            ApplyResult::Skipped { reason } => Some(reason.clone()),
            ApplyResult::NoChange if self.verbose => Some("in sync".to_string()),
            ApplyResult::NoChange => None,
        };

        if let Some(line) = line {
            bar.println(format!(
                "    {} {} {} {}",
                symbol,
                format!("[{}]", recipe).dimmed(),
                id,
                line.dimmed()
            ));
        }
        bar.inc(1);
    }

    fn on_run_complete(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Confirm with user
struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt("Continue?")
            .default(true)
            .interact()?;

        Ok(confirmed)
    }
}

/// Execute the plan with hoststate's UI integration
pub fn execute(plan: ExecutionPlan, opts: ExecuteOptions) -> Result<ExecuteSummary> {
    // 1. Display what will change
    let diffs = plan.diffs(opts.jobs);
    display_diff(&diffs);

    if !diffs.is_empty() && !opts.dry_run {
        display_sudo_boundary(&diffs);

        if !opts.yes && !opts.interactive {
            bail!("Refusing to apply without confirmation on a non-interactive terminal; pass --yes");
        }
    }

    // 2. Apply in order, halting on the first failure
    let engine_opts = declarative::ExecuteOptions {
        dry_run: opts.dry_run,
        jobs: opts.jobs,
        verbose: opts.verbose,
    };
    let sudo = || SudoContext::acquire("Apply privileged host configuration");
    let mut progress = TerminalProgress {
        bar: None,
        verbose: opts.verbose,
    };

    let summary = if opts.yes {
        execute_with_diffs(plan, &diffs, engine_opts, sudo, &mut progress, &mut AutoConfirm)?
    } else {
        execute_with_diffs(plan, &diffs, engine_opts, sudo, &mut progress, &mut PromptConfirm)?
    };

    // 3. Summary
    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
    } else if !diffs.is_empty() {
        print_summary(&summary);
    }

    Ok(summary)
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if let Some(failure) = &summary.failure {
        println!(
            "  {} Halted at {} {} [{}]",
            "✗".red().bold(),
            failure.resource_type,
            failure.resource_id.bold(),
            failure.recipe
        );
        println!("    {}: {}", failure.category.to_string().red(), failure.error);
        println!("    {} {}", "→".cyan(), failure.category.advice());
    } else if summary.total_changes() == 0 && summary.skipped > 0 {
        println!("  {} Aborted, nothing applied", "✗".red());
        return;
    } else {
        println!("  {} Host state applied successfully!", "✓".green().bold());
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} resources modified", summary.modified);
    }
    if summary.no_change > 0 {
        println!("    • {} resources already in sync", summary.no_change);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.not_run > 0 {
        println!(
            "    • {} {} not run (earlier changes were kept)",
            summary.not_run,
            "resources".yellow()
        );
    }
}
