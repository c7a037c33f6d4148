//! Progress indicators for hoststate CLI.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// A bar for `len` steps, hidden when stdout is not a terminal
pub fn bar(len: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if !crate::ui::is_interactive() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }

    let style = ProgressStyle::default_bar()
        .template("  {prefix:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb
}
