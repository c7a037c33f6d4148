//! Execution engine - applies plan steps in order, halting on the first failure

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback, SudoProvider};
use crate::diff::ResourceDiff;
use crate::error::FailureCategory;
use crate::planner::ExecutionPlan;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary, StepFailure};
use anyhow::Result;

/// Execute a plan with the given options and callbacks
///
/// Steps run one at a time in plan order. The first step whose `apply`
/// returns an error halts the run: it is recorded in
/// [`ExecuteSummary::failure`], the remaining steps are counted as
/// `not_run`, and everything applied before it stays applied.
///
/// `sudo_provider` is only called when a pending step needs elevated
/// privileges, and at most once.
pub fn execute<S, P, C>(
    plan: ExecutionPlan,
    opts: ExecuteOptions,
    sudo_provider: impl FnOnce() -> Result<S>,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    S: SudoProvider,
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let diffs = plan.diffs(opts.jobs);
    execute_with_diffs(plan, &diffs, opts, sudo_provider, progress, confirm)
}

/// Execute a plan against diffs the caller already computed
///
/// `diffs` must come from [`ExecutionPlan::diffs`] on the same plan. State
/// is not detected again, so confirmation and sudo are decided on exactly
/// the changes the caller displayed.
pub fn execute_with_diffs<S, P, C>(
    plan: ExecutionPlan,
    diffs: &[ResourceDiff],
    opts: ExecuteOptions,
    sudo_provider: impl FnOnce() -> Result<S>,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    S: SudoProvider,
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let pending = diffs.len();

    if pending == 0 {
        log::info!("All {} resources already in desired state", plan.len());
        return Ok(ExecuteSummary {
            no_change: plan.len(),
            ..Default::default()
        });
    }

    if opts.dry_run {
        return Ok(ExecuteSummary {
            skipped: pending,
            no_change: plan.len() - pending,
            ..Default::default()
        });
    }

    if !confirm.confirm("Apply changes?")? {
        return Ok(ExecuteSummary {
            skipped: plan.len(),
            ..Default::default()
        });
    }

    // Acquire privileges once, only if a pending change needs them
    let privileged = diffs.iter().any(|d| d.requires_sudo);
    let sudo = if privileged {
        Some(sudo_provider()?)
    } else {
        None
    };

    let mut summary = ExecuteSummary::default();
    progress.on_run_start(plan.len(), privileged);

    let total = plan.len();
    for (index, step) in plan.steps.into_iter().enumerate() {
        let id = step.resource.id();
        progress.on_resource_start(&step.recipe, &id, &step.resource.description());

        let mut ctx = match &sudo {
            Some(s) => ApplyContext::with_sudo(false, opts.verbose, s),
            None => ApplyContext::new(false, opts.verbose),
        };

        match step.resource.apply(&mut ctx) {
            Ok(result) => {
                log::debug!("{} [{}] -> {:?}", id, step.recipe, result);
                progress.on_resource_complete(&step.recipe, &id, &result);
                summary.add_result(&result);
            }
            Err(e) => {
                let category = FailureCategory::of(&e);
                let error = format!("{:#}", e);
                log::error!("{} [{}] failed: {}", id, step.recipe, error);

                let result = ApplyResult::Failed {
                    error: error.clone(),
                };
                progress.on_resource_complete(&step.recipe, &id, &result);
                summary.add_result(&result);
                summary.not_run = total - index - 1;
                summary.failure = Some(StepFailure {
                    recipe: step.recipe,
                    resource_id: id,
                    resource_type: step.resource.resource_type().to_string(),
                    category,
                    error,
                });
                break;
            }
        }
    }

    progress.on_run_complete();
    Ok(summary)
}

/// Simple execution without callbacks
///
/// Applies without prompting and without progress output.
pub fn execute_simple<S: SudoProvider>(
    plan: ExecutionPlan,
    opts: ExecuteOptions,
    sudo_provider: impl FnOnce() -> Result<S>,
) -> Result<ExecuteSummary> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, sudo_provider, &mut NoProgress, &mut AutoConfirm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::context::{AutoConfirm, AutoDecline, NoProgress};
    use crate::planner::PlanStep;
    use crate::resource::Resource;
    use crate::types::{CommandOutput, ResourceState, SudoRequirement};
    use std::cell::Cell;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Mock sudo provider for tests
    struct MockSudo;

    impl SudoProvider for MockSudo {
        fn run(&self, _cmd: &str, _args: &[&str]) -> Result<CommandOutput> {
            Ok(CommandOutput {
                stdout: Vec::new(),
                stderr: Vec::new(),
                success: true,
            })
        }
    }

    /// Shared fake host: a set of "present" ids plus an apply journal
    #[derive(Debug, Default)]
    struct Host {
        present: Mutex<Vec<String>>,
        journal: Mutex<Vec<String>>,
        /// current_state calls across all resources
        detections: AtomicUsize,
    }

    impl Host {
        fn has(&self, id: &str) -> bool {
            self.present.lock().unwrap().iter().any(|p| p == id)
        }
    }

    #[derive(Debug)]
    struct TestResource {
        id: String,
        host: Arc<Host>,
        /// Apply fails with a path conflict
        conflict: bool,
        /// Apply requires this id to be present first
        requires: Option<String>,
        sudo: bool,
    }

    impl TestResource {
        fn new(id: &str, host: &Arc<Host>) -> Self {
            Self {
                id: id.into(),
                host: Arc::clone(host),
                conflict: false,
                requires: None,
                sudo: false,
            }
        }
    }

    impl Resource for TestResource {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn description(&self) -> String {
            format!("Test resource {}", self.id)
        }

        fn resource_type(&self) -> &'static str {
            "test"
        }

        fn sudo_requirement(&self) -> SudoRequirement {
            if self.sudo {
                SudoRequirement::Required {
                    reason: "test".into(),
                }
            } else {
                SudoRequirement::None
            }
        }

        fn current_state(&self) -> Result<ResourceState> {
            self.host.detections.fetch_add(1, Ordering::SeqCst);
            if self.host.has(&self.id) {
                Ok(ResourceState::Present { details: None })
            } else {
                Ok(ResourceState::Absent)
            }
        }

        fn desired_state(&self) -> ResourceState {
            ResourceState::Present { details: None }
        }

        fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
            if ctx.dry_run {
                return Ok(ApplyResult::Skipped {
                    reason: "Dry run".into(),
                });
            }
            if self.host.has(&self.id) {
                return Ok(ApplyResult::NoChange);
            }
            if self.conflict {
                return Err(Error::PathConflict {
                    path: PathBuf::from(&self.id),
                    found: "regular file".into(),
                    expected: "directory".into(),
                }
                .into());
            }
            if let Some(req) = &self.requires
                && !self.host.has(req)
            {
                anyhow::bail!("{} applied before {}", self.id, req);
            }
            if self.sudo {
                ctx.require_sudo()?;
            }
            self.host.journal.lock().unwrap().push(self.id.clone());
            self.host.present.lock().unwrap().push(self.id.clone());
            Ok(ApplyResult::Created)
        }
    }

    fn plan_of(steps: Vec<(&str, TestResource)>) -> ExecutionPlan {
        let mut plan = ExecutionPlan::new();
        for (recipe, resource) in steps {
            plan.push(PlanStep::new(recipe, Box::new(resource)));
        }
        plan
    }

    fn rails_plan(host: &Arc<Host>) -> ExecutionPlan {
        let mut var = TestResource::new("/var", host);
        var.requires = Some("app".into());
        let mut www = TestResource::new("/var/www", host);
        www.requires = Some("app".into());
        plan_of(vec![
            ("user", TestResource::new("app", host)),
            ("rails", var),
            ("rails", www),
            ("rails", TestResource::new("gcc-c++", host)),
            ("rails", TestResource::new("sqlite-devel", host)),
        ])
    }

    fn no_sudo() -> Result<MockSudo> {
        anyhow::bail!("sudo should not be requested")
    }

    #[test]
    fn test_execute_empty_plan() {
        let result = execute(
            ExecutionPlan::new(),
            ExecuteOptions::default(),
            no_sudo,
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(result.total(), 0);
        assert!(result.is_success());
    }

    #[test]
    fn test_fresh_host_then_rerun_is_idempotent() {
        let host = Arc::new(Host::default());

        let first = execute_simple(rails_plan(&host), ExecuteOptions::default(), no_sudo).unwrap();
        assert!(first.is_success());
        assert_eq!(first.created, 5);
        assert_eq!(
            *host.journal.lock().unwrap(),
            ["app", "/var", "/var/www", "gcc-c++", "sqlite-devel"]
        );

        let second = execute_simple(rails_plan(&host), ExecuteOptions::default(), no_sudo).unwrap();
        assert!(second.is_success());
        assert_eq!(second.total_changes(), 0);
        assert_eq!(second.no_change, 5);
        assert_eq!(host.journal.lock().unwrap().len(), 5);
    }

    #[test]
    fn test_precomputed_diffs_detect_state_once() {
        let host = Arc::new(Host::default());
        let plan = rails_plan(&host);
        let diffs = plan.diffs(2);
        assert_eq!(host.detections.load(Ordering::SeqCst), 5);

        let summary = execute_with_diffs(
            plan,
            &diffs,
            ExecuteOptions::default(),
            no_sudo,
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(summary.created, 5);
        assert_eq!(host.detections.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_acts_on_supplied_diffs() {
        let host = Arc::new(Host::default());

        // Nothing shown as pending, so nothing is applied
        let summary = execute_with_diffs(
            rails_plan(&host),
            &[],
            ExecuteOptions::default(),
            no_sudo,
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();

        assert_eq!(summary.no_change, 5);
        assert!(host.journal.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failure_halts_run_without_rollback() {
        let host = Arc::new(Host::default());
        let mut www = TestResource::new("/var/www", &host);
        www.conflict = true;
        let plan = plan_of(vec![
            ("rails", TestResource::new("/var", &host)),
            ("rails", www),
            ("rails", TestResource::new("gcc-c++", &host)),
            ("rails", TestResource::new("sqlite-devel", &host)),
        ]);

        let summary = execute_simple(plan, ExecuteOptions::default(), no_sudo).unwrap();

        assert!(!summary.is_success());
        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.not_run, 2);
        assert!(host.has("/var"));
        assert!(!host.has("gcc-c++"));

        let failure = summary.failure.unwrap();
        assert_eq!(failure.resource_id, "/var/www");
        assert_eq!(failure.recipe, "rails");
        assert_eq!(failure.category, FailureCategory::PathConflict);
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let host = Arc::new(Host::default());
        host.present.lock().unwrap().push("app".into());
        let opts = ExecuteOptions {
            dry_run: true,
            ..Default::default()
        };

        let summary = execute_simple(rails_plan(&host), opts, no_sudo).unwrap();

        assert_eq!(summary.skipped, 4);
        assert_eq!(summary.no_change, 1);
        assert!(host.journal.lock().unwrap().is_empty());
    }

    #[test]
    fn test_declined_confirmation_skips_everything() {
        let host = Arc::new(Host::default());
        let summary = execute(
            rails_plan(&host),
            ExecuteOptions::default(),
            no_sudo,
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();

        assert_eq!(summary.skipped, 5);
        assert!(host.journal.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sudo_acquired_once_when_needed() {
        let host = Arc::new(Host::default());
        let mut pkg = TestResource::new("gcc-c++", &host);
        pkg.sudo = true;
        let mut pkg2 = TestResource::new("sqlite-devel", &host);
        pkg2.sudo = true;
        let plan = plan_of(vec![("rails", pkg), ("rails", pkg2)]);

        let calls = Cell::new(0);
        let summary = execute_simple(plan, ExecuteOptions::default(), || {
            calls.set(calls.get() + 1);
            Ok(MockSudo)
        })
        .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(summary.created, 2);
    }

    #[test]
    fn test_sudo_not_acquired_when_privileged_step_in_sync() {
        let host = Arc::new(Host::default());
        host.present.lock().unwrap().push("gcc-c++".into());
        let mut pkg = TestResource::new("gcc-c++", &host);
        pkg.sudo = true;
        let plan = plan_of(vec![("rails", pkg), ("rails", TestResource::new("/var", &host))]);

        let summary = execute_simple(plan, ExecuteOptions::default(), no_sudo).unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.no_change, 1);
    }

    #[test]
    fn test_sudo_failure_aborts_before_any_change() {
        let host = Arc::new(Host::default());
        let mut pkg = TestResource::new("gcc-c++", &host);
        pkg.sudo = true;
        let plan = plan_of(vec![("rails", TestResource::new("/var", &host)), ("rails", pkg)]);

        let result = execute_simple(plan, ExecuteOptions::default(), || -> Result<MockSudo> {
            anyhow::bail!("sudo denied")
        });

        assert!(result.is_err());
        assert!(host.journal.lock().unwrap().is_empty());
    }
}
