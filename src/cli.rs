use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hoststate")]
#[command(version)]
#[command(about = "Reconcile a host against declared directories, packages and users", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Recipes file (default: $HOSTSTATE_CONFIG, then ~/.config/hoststate/recipes.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show every assertion and whether it is in sync
    Status(StatusArgs),

    /// Preview what apply would change
    Diff(DiffArgs),

    /// Make the host match the declared state
    Apply(ApplyArgs),

    /// List recipes with their dependencies
    Recipes,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Recipe selection shared by status, diff and apply
#[derive(Args, Clone, Default)]
pub struct Selection {
    /// Filter by type or type.name (e.g. directory, package.gcc-c++)
    pub target: Option<String>,

    /// Recipes to reconcile instead of the configured run list (repeatable)
    #[arg(short, long = "recipe", value_name = "NAME")]
    pub recipes: Vec<String>,
}

#[derive(Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub selection: Selection,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    #[command(flatten)]
    pub selection: Selection,
}

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub selection: Selection,

    /// Show what would change without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Apply without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Parallel jobs for state detection
    #[arg(short, long, default_value = "4")]
    pub jobs: u8,
}
