//! Loading the recipes file and turning it into a cookbook

use anyhow::{Context, Result};
use declarative::{Cookbook, Recipe};
use pkgkit::Client;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::paths;
use crate::resource::{Directory, SystemPackage, UserAccount};
use crate::schema::HostConfig;
use crate::sudo::Privileges;

/// Where the recipes came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Builtin,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Builtin => write!(f, "built-in recipes"),
        }
    }
}

/// Load and validate the recipes, falling back to the built-in ones
pub fn load(explicit: Option<&Path>) -> Result<(HostConfig, Source)> {
    match paths::recipes_file(explicit)? {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Could not read {}", path.display()))?;
            let config = HostConfig::parse(&content)
                .with_context(|| format!("Could not load {}", path.display()))?;
            Ok((config, Source::File(path)))
        }
        None => Ok((HostConfig::builtin()?, Source::Builtin)),
    }
}

/// The recipes to reconcile: `--recipe` overrides, else the configured run list
pub fn run_list(config: &HostConfig, overrides: &[String]) -> Vec<String> {
    if overrides.is_empty() {
        config.run_list.clone()
    } else {
        overrides.to_vec()
    }
}

/// Build resources for every recipe
///
/// Within a recipe: users, then directories, then packages.
pub fn build_cookbook(
    config: &HostConfig,
    client: &Arc<Client>,
    privileges: &Privileges,
) -> Cookbook {
    let mut cookbook = Cookbook::new();

    for (name, spec) in &config.recipes {
        let mut recipe = Recipe::new(name);
        for dep in &spec.depends {
            recipe = recipe.depends_on(dep);
        }

        for user in &spec.users {
            recipe = recipe.resource(Box::new(
                UserAccount::new(&user.name)
                    .system(user.system)
                    .home(user.home.as_deref().map(paths::expand))
                    .shell(user.shell.clone())
                    .with_sudo(privileges.needed_for_system()),
            ));
        }

        for dir in &spec.directories {
            recipe = recipe.resource(Box::new(
                Directory::new(paths::expand(&dir.path), dir.mode.bits(), &dir.owner)
                    .run_as(privileges),
            ));
        }

        for package in &spec.packages {
            recipe = recipe.resource(Box::new(
                SystemPackage::new(package, Arc::clone(client))
                    .with_sudo(privileges.needed_for_system()),
            ));
        }

        log::debug!("Loaded recipe {} ({} assertions)", name, spec.len());
        cookbook.add(recipe);
    }

    cookbook
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sudo::SudoContext;
    use crate::users;
    use declarative::{
        ExecuteOptions, ExecuteSummary, ExecutionPlan, FailureCategory, ResourceExt,
        execute_simple,
    };
    use pkgkit::{MemoryBackend, Package};
    use std::os::unix::fs::{MetadataExt, PermissionsExt};
    use tempfile::TempDir;

    /// The rails recipe, rooted in a temp dir and owned by the invoking user
    fn rails_toml(root: &Path, owner: &str) -> String {
        format!(
            r#"
            run_list = ["rails"]

            [recipes.user]
            [[recipes.user.users]]
            name = "{owner}"

            [recipes.rails]
            depends = ["user"]
            packages = ["gcc-c++", "sqlite-devel"]

            [[recipes.rails.directories]]
            path = "{root}/var"
            mode = "0755"
            owner = "{owner}"

            [[recipes.rails.directories]]
            path = "{root}/var/www"
            mode = "0755"
            owner = "{owner}"
            "#,
            root = root.display(),
        )
    }

    struct Host {
        _temp: TempDir,
        root: PathBuf,
        owner: String,
        config: HostConfig,
        client: Arc<Client>,
        privileges: Privileges,
    }

    impl Host {
        fn fresh() -> Self {
            let temp = TempDir::new().unwrap();
            let root = temp.path().to_path_buf();
            let owner = users::current_user_name().unwrap();
            let config = HostConfig::parse(&rails_toml(&root, &owner)).unwrap();
            let client = Arc::new(Client::with_backend(Box::new(
                MemoryBackend::new()
                    .with_available("gcc-c++", "11.4.1-3.el9")
                    .with_available("sqlite-devel", "3.34.1-7.el9"),
            )));
            // Everything is owned by the invoking user; no sudo needed
            let privileges = Privileges {
                root: true,
                uid: users::effective_uid(),
                user: owner.clone(),
            };
            Self {
                _temp: temp,
                root,
                owner,
                config,
                client,
                privileges,
            }
        }

        fn plan(&self) -> ExecutionPlan {
            build_cookbook(&self.config, &self.client, &self.privileges)
                .into_plan(&self.config.run_list)
                .unwrap()
        }

        fn apply(&self) -> ExecuteSummary {
            execute_simple(self.plan(), ExecuteOptions::default(), || -> Result<SudoContext> {
                anyhow::bail!("sudo is not available in tests")
            })
            .unwrap()
        }

        fn installed(&self, name: &str) -> bool {
            self.client.is_installed(&Package::new(name)).unwrap()
        }
    }

    fn mode_of(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o7777
    }

    #[test]
    fn test_plan_order_user_first() {
        let host = Host::fresh();
        let plan = host.plan();

        let steps: Vec<(String, String)> = plan
            .steps
            .iter()
            .map(|s| (s.recipe.clone(), s.resource.id()))
            .collect();
        let var = host.root.join("var").display().to_string();
        let www = host.root.join("var/www").display().to_string();

        assert_eq!(
            steps,
            [
                ("user".to_string(), host.owner.clone()),
                ("rails".to_string(), var),
                ("rails".to_string(), www),
                ("rails".to_string(), "gcc-c++".to_string()),
                ("rails".to_string(), "sqlite-devel".to_string()),
            ]
        );
        assert!(!plan.has_privileged());
    }

    #[test]
    fn test_fresh_host_then_rerun() {
        let host = Host::fresh();

        let first = host.apply();
        assert!(first.is_success());
        assert_eq!(first.created, 4);
        assert_eq!(first.no_change, 1);

        for dir in [host.root.join("var"), host.root.join("var/www")] {
            assert!(dir.is_dir());
            assert_eq!(mode_of(&dir), 0o755);
            assert_eq!(users::name_of(fs::metadata(&dir).unwrap().uid()), host.owner);
        }
        assert!(host.installed("gcc-c++"));
        assert!(host.installed("sqlite-devel"));

        let second = host.apply();
        assert!(second.is_success());
        assert_eq!(second.total_changes(), 0);
        assert_eq!(second.no_change, 5);
        assert!(host.plan().diffs(1).is_empty());
    }

    #[test]
    fn test_www_is_a_regular_file() {
        let host = Host::fresh();
        let var = host.root.join("var");
        fs::create_dir(&var).unwrap();
        fs::set_permissions(&var, fs::Permissions::from_mode(0o700)).unwrap();
        fs::write(var.join("www"), "placeholder").unwrap();

        let summary = host.apply();

        assert!(!summary.is_success());
        assert_eq!(summary.no_change, 1);
        assert_eq!(summary.modified, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.not_run, 2);

        let failure = summary.failure.unwrap();
        assert_eq!(failure.recipe, "rails");
        assert_eq!(failure.resource_id, var.join("www").display().to_string());
        assert_eq!(failure.category, FailureCategory::PathConflict);

        // /var was fixed before the halt and stays fixed
        assert_eq!(mode_of(&var), 0o755);
        assert!(var.join("www").is_file());
        assert!(!host.installed("gcc-c++"));
    }

    #[test]
    fn test_missing_package_halts() {
        let mut host = Host::fresh();
        host.client = Arc::new(Client::with_backend(Box::new(
            MemoryBackend::new().with_available("gcc-c++", "11.4.1-3.el9"),
        )));

        let summary = host.apply();
        let failure = summary.failure.unwrap();
        assert_eq!(failure.resource_id, "sqlite-devel");
        assert_eq!(failure.category, FailureCategory::PackageResolution);
        assert_eq!(summary.created, 3);
        assert_eq!(summary.not_run, 0);
        assert!(host.installed("gcc-c++"));
    }

    #[test]
    fn test_recipe_override() {
        let host = Host::fresh();
        let run_list = run_list(&host.config, &["user".to_string()]);
        let plan = build_cookbook(&host.config, &host.client, &host.privileges)
            .into_plan(&run_list)
            .unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps[0].resource.resource_type(), "user");
    }

    #[test]
    fn test_unknown_dependency() {
        let config = HostConfig::parse(
            r#"
            run_list = ["rails"]
            [recipes.rails]
            depends = ["user"]
            "#,
        )
        .unwrap();
        let client = Arc::new(Client::with_backend(Box::new(MemoryBackend::new())));
        let privileges = Privileges::detect().unwrap();

        let err = build_cookbook(&config, &client, &privileges)
            .into_plan(&config.run_list)
            .unwrap_err();
        assert_eq!(err.to_string(), "recipe not found: user (required by rails)");
    }

    #[test]
    fn test_privileged_flags_for_unprivileged_user() {
        let config = HostConfig::builtin().unwrap();
        let client = Arc::new(Client::with_backend(Box::new(MemoryBackend::new())));
        let privileges = Privileges {
            root: false,
            uid: 1000,
            user: "deploy".to_string(),
        };

        let plan = build_cookbook(&config, &client, &privileges)
            .into_plan(&config.run_list)
            .unwrap();
        // Owned by app, installed system-wide: everything needs sudo
        assert!(plan.steps.iter().all(|s| s.resource.requires_sudo()));
    }

    #[test]
    fn test_path_owned_by_someone_else_acquires_sudo() {
        let temp = TempDir::new().unwrap();
        let var = temp.path().join("var");
        fs::create_dir(&var).unwrap();
        fs::set_permissions(&var, fs::Permissions::from_mode(0o700)).unwrap();

        let me = users::current_user_name().unwrap();
        let config = HostConfig::parse(&format!(
            r#"
            run_list = ["rails"]
            [[recipes.rails.directories]]
            path = "{}"
            mode = "0755"
            owner = "{me}"
            "#,
            var.display()
        ))
        .unwrap();
        // Same name as the owner, but the path belongs to another uid
        let privileges = Privileges {
            root: false,
            uid: fs::metadata(&var).unwrap().uid().wrapping_add(1),
            user: me,
        };
        let client = Arc::new(Client::with_backend(Box::new(MemoryBackend::new())));
        let plan = build_cookbook(&config, &client, &privileges)
            .into_plan(&config.run_list)
            .unwrap();

        assert!(plan.has_privileged());
        assert!(plan.diffs(1).iter().all(|d| d.requires_sudo));

        let requested = std::cell::Cell::new(false);
        let err = execute_simple(plan, ExecuteOptions::default(), || -> Result<SudoContext> {
            requested.set(true);
            anyhow::bail!("sudo is not available in tests")
        })
        .unwrap_err();

        assert!(requested.get());
        assert!(err.to_string().contains("sudo is not available"));
        // Nothing was attempted without privileges
        assert_eq!(mode_of(&var), 0o700);
    }

    #[test]
    fn test_target_filter_keeps_user_recipe() {
        let host = Host::fresh();
        let plan = host.plan().filter_by_target(Some("directory"));

        let recipes: Vec<&str> = plan.steps.iter().map(|s| s.recipe.as_str()).collect();
        assert_eq!(recipes, ["user", "rails", "rails"]);
        assert_eq!(plan.steps[0].resource.resource_type(), "user");
    }

    #[test]
    fn test_source_display() {
        assert_eq!(Source::Builtin.to_string(), "built-in recipes");
        assert_eq!(
            Source::File(PathBuf::from("/etc/hoststate/recipes.toml")).to_string(),
            "/etc/hoststate/recipes.toml"
        );
    }
}
