use anyhow::{Result, bail};
use declarative::ExecutionPlan;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{self, ExecuteOptions};
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let plan = super::load_plan(ctx, &args.selection)?;

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        jobs: usize::from(args.jobs.max(1)),
        yes: args.yes,
        interactive: ui::is_interactive(),
        verbose: ctx.verbose > 0,
    };

    apply_plan(plan, opts)
}

/// Apply and turn a halted run into an error, so the process exits non-zero
fn apply_plan(plan: ExecutionPlan, opts: ExecuteOptions) -> Result<()> {
    let summary = engine::execute(plan, opts)?;

    if let Some(failure) = summary.failure {
        bail!(
            "apply halted at {} {}: {}",
            failure.resource_type,
            failure.resource_id,
            failure.category
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::Host;
    use std::fs;

    fn unattended() -> ExecuteOptions {
        ExecuteOptions {
            jobs: 1,
            yes: true,
            ..ExecuteOptions::default()
        }
    }

    #[test]
    fn test_apply_converges() {
        let host = Host::fresh();
        apply_plan(host.plan(None), unattended()).unwrap();

        assert!(host.root.join("var").is_dir());
        assert!(host.plan(None).diffs(1).is_empty());
    }

    #[test]
    fn test_failed_step_is_an_error() {
        let host = Host::fresh();
        let var = host.root.join("var");
        fs::write(&var, "not a directory").unwrap();

        let err = apply_plan(host.plan(None), unattended()).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "apply halted at directory {}: Path type conflict",
                var.display()
            )
        );
    }

    #[test]
    fn test_refuses_without_yes_when_not_interactive() {
        let host = Host::fresh();
        let opts = ExecuteOptions {
            jobs: 1,
            ..ExecuteOptions::default()
        };

        let err = apply_plan(host.plan(None), opts).unwrap_err();
        assert!(err.to_string().contains("pass --yes"));
        assert!(!host.root.join("var").exists());
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let host = Host::fresh();
        let opts = ExecuteOptions {
            dry_run: true,
            ..unattended()
        };

        apply_plan(host.plan(None), opts).unwrap();
        assert!(!host.root.join("var").exists());
    }
}
