use anyhow::Result;

use crate::Context;
use crate::cli::DiffArgs;
use crate::engine::differ::{display_diff, display_sudo_boundary};
use crate::ui;

pub fn run(ctx: &Context, args: DiffArgs) -> Result<()> {
    let plan = super::load_plan(ctx, &args.selection)?;
    let diffs = plan.diffs(super::DETECT_JOBS);

    display_diff(&diffs);
    display_sudo_boundary(&diffs);

    if !diffs.is_empty() && !ctx.quiet {
        println!();
        ui::dim("Run `hoststate apply` to apply these changes");
    }

    Ok(())
}
