//! Diff display - hoststate-specific UI

use colored::{ColoredString, Colorize};
use declarative::{DiffSummary, ResourceDiff, ResourceState, group_by_recipe};

/// Symbol for a diff line
pub fn diff_symbol(diff: &ResourceDiff) -> ColoredString {
    if is_conflict(diff) {
        "!".red()
    } else if diff.is_addition() {
        "+".green()
    } else if diff.is_removal() {
        "-".red()
    } else if diff.is_modification() {
        "~".yellow()
    } else {
        "?".dimmed()
    }
}

/// Something of the wrong type occupies the path
pub fn is_conflict(diff: &ResourceDiff) -> bool {
    matches!(diff.current, ResourceState::Modified { .. })
}

/// One-line description of how the current state differs
pub fn state_change(diff: &ResourceDiff) -> String {
    match (&diff.current, &diff.desired) {
        (ResourceState::Absent, ResourceState::Present { details }) => format!(
            "(missing){}",
            details
                .as_ref()
                .map(|d| format!(" → {}", d))
                .unwrap_or_default()
        ),
        (ResourceState::Present { details: from }, ResourceState::Present { details: to }) => {
            format!(
                "{} → {}",
                from.as_deref().unwrap_or("current"),
                to.as_deref().unwrap_or("desired")
            )
        }
        (ResourceState::Modified { from, to }, _) => format!("(is a {}, want {})", from, to),
        (ResourceState::Unknown, _) => "(state unknown)".to_string(),
        (ResourceState::Present { .. }, ResourceState::Absent) => "(will remove)".to_string(),
        _ => String::new(),
    }
}

/// Display a list of diffs in a user-friendly format
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Host State Diff".bold()
    );
    println!("│");

    for (recipe, recipe_diffs) in group_by_recipe(diffs) {
        println!("│ {} {}", "recipe".dimmed(), recipe.bold());

        for diff in recipe_diffs {
            let sudo_indicator = if diff.requires_sudo {
                " [sudo]".red().to_string()
            } else {
                String::new()
            };

            println!(
                "│   {} {:<10} {:<24} {}{}",
                diff_symbol(diff),
                diff.resource_type,
                diff.resource_id,
                state_change(diff).dimmed(),
                sudo_indicator
            );
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    let conflicts = diffs.iter().filter(|d| is_conflict(d)).count();

    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} to create, {} to fix, {} require sudo)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.modifications.saturating_sub(conflicts).to_string().yellow(),
        summary.sudo_required.to_string().red()
    );
    if conflicts > 0 {
        println!(
            "│ {} {} path conflict(s) will halt apply",
            "⚠".yellow(),
            conflicts
        );
    }
    println!("└─────────────────────────────────────────────────────┘");
}

/// Display the sudo boundary warning
pub fn display_sudo_boundary(diffs: &[ResourceDiff]) {
    let privileged: Vec<&ResourceDiff> = diffs.iter().filter(|d| d.requires_sudo).collect();
    if privileged.is_empty() {
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Privilege Boundary".yellow().bold()
    );
    println!("│");
    println!(
        "│  {}  The following {} operations require sudo:",
        "⚠".yellow(),
        privileged.len()
    );
    println!("│");

    for diff in privileged.iter().take(10) {
        println!("│  • {}", diff.description);
    }

    if privileged.len() > 10 {
        println!("│  • ... and {} more", privileged.len() - 10);
    }

    println!("│");
    println!("│  Sudo will be requested once and released immediately after.");
    println!("│");
    println!("└─────────────────────────────────────────────────────────────┘");
}
