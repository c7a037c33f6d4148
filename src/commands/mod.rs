//! Command implementations
//!
//! - `status` - Show every assertion and whether it is in sync
//! - `diff` - Preview what apply would change
//! - `apply` - Make current state match desired state
//! - `recipes` - List recipes and the resolved run order

pub mod apply;
pub mod diff;
pub mod recipes;
pub mod status;

use anyhow::{Context as AnyhowContext, Result, bail};
use declarative::ExecutionPlan;
use pkgkit::{Client, MemoryBackend};
use std::sync::Arc;

use crate::Context;
use crate::cli::Selection;
use crate::config;
use crate::schema::HostConfig;
use crate::sudo::Privileges;

/// Parallelism for read-only state detection
pub(crate) const DETECT_JOBS: usize = 4;

/// Load the recipes and build the filtered execution plan
pub(crate) fn load_plan(ctx: &Context, selection: &Selection) -> Result<ExecutionPlan> {
    let (host_config, source) = config::load(ctx.config.as_deref())?;
    log::info!("Using {}", source);

    let client = Arc::new(package_client(&host_config)?);
    let privileges = Privileges::detect()?;
    log::debug!(
        "Running as {}{}",
        privileges.user,
        if privileges.root { " (root)" } else { "" }
    );

    build_plan(&host_config, selection, &client, &privileges)
}

/// Resolve the selected recipes and apply the target filter
pub(crate) fn build_plan(
    host_config: &HostConfig,
    selection: &Selection,
    client: &Arc<Client>,
    privileges: &Privileges,
) -> Result<ExecutionPlan> {
    let run_list = config::run_list(host_config, &selection.recipes);
    if run_list.is_empty() {
        bail!("No recipes to run: set run_list or pass --recipe");
    }

    let plan = config::build_cookbook(host_config, client, privileges)
        .into_plan(&run_list)?
        .filter_by_target(selection.target.as_deref());

    if plan.is_empty()
        && let Some(target) = &selection.target
    {
        bail!("No resources match '{}'", target);
    }

    Ok(plan)
}

/// The host's package manager, required only when packages are declared
fn package_client(host_config: &HostConfig) -> Result<Client> {
    let declares_packages = host_config.recipes.values().any(|r| !r.packages.is_empty());
    if !declares_packages {
        return Ok(Client::with_backend(Box::new(MemoryBackend::new())));
    }

    let client = Client::new().context("Packages are declared but no package manager was found")?;
    if !client.is_available() {
        bail!("Package manager {} is not usable on this host", client.kind());
    }
    Ok(client)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::users;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// The rails recipes under a temp root, owned by the invoking user
    pub(crate) struct Host {
        _temp: TempDir,
        pub root: PathBuf,
        pub config: HostConfig,
        pub client: Arc<Client>,
        pub privileges: Privileges,
    }

    impl Host {
        pub(crate) fn fresh() -> Self {
            let temp = TempDir::new().unwrap();
            let root = temp.path().to_path_buf();
            let owner = users::current_user_name().unwrap();
            let config = HostConfig::parse(&format!(
                r#"
                run_list = ["rails"]

                [[recipes.user.users]]
                name = "{owner}"

                [recipes.rails]
                depends = ["user"]
                packages = ["gcc-c++"]

                [[recipes.rails.directories]]
                path = "{root}/var"
                mode = "0755"
                owner = "{owner}"
                "#,
                root = root.display(),
            ))
            .unwrap();
            let client = Arc::new(Client::with_backend(Box::new(
                MemoryBackend::new().with_available("gcc-c++", "11.4.1-3.el9"),
            )));
            let privileges = Privileges {
                root: true,
                uid: users::effective_uid(),
                user: owner,
            };
            Self {
                _temp: temp,
                root,
                config,
                client,
                privileges,
            }
        }

        pub(crate) fn plan(&self, target: Option<&str>) -> ExecutionPlan {
            let selection = Selection {
                target: target.map(str::to_string),
                recipes: Vec::new(),
            };
            build_plan(&self.config, &selection, &self.client, &self.privileges).unwrap()
        }
    }
}
