//! Integration tests for running tasks against a shared run context.
//!
//! Tasks here mirror typical provisioning steps: a setup hook that fills in
//! defaults, directory creation driven by `*_dir` keys, and tasks that invoke
//! other tasks with per-call overrides.

use anyhow::Result;
use deploy_conf::conf::{BaseConfig, Conf, Overrides};
use deploy_conf::error::{ConfError, ConfResult, ErrorCode};
use deploy_conf::exec::{DryRunExecutor, Privilege};
use deploy_conf::prompts::{CannedAnswers, Unattended};
use deploy_conf::provider::{ProvidesConf, provider};
use deploy_conf::provides_conf;
use deploy_conf::run::RunContext;
use deploy_conf::task::{Task, TaskContext};
use deploy_conf::template;
use serde_json::{Value, json};

/// Adds users, skipping the ones listed in `exclude_users`.
struct AddUsers;
impl ProvidesConf for AddUsers {}

impl Task for AddUsers {
    fn name(&self) -> &str {
        "users.add"
    }

    fn before_do(&self, cx: &TaskContext<'_>) -> Result<()> {
        cx.conf().set_default("exclude_users", json!([]))?;
        Ok(())
    }

    fn run(&self, cx: &TaskContext<'_>) -> Result<()> {
        let users: Vec<String> = cx.conf().get_as("users")?;
        let excluded: Vec<String> = cx.conf().get_as("exclude_users")?;
        for user in users.iter().filter(|u| !excluded.contains(u)) {
            cx.sudo(&format!("adduser --disabled-password {}", user))?;
        }
        Ok(())
    }
}

/// Creates every configured `*_dir` directory.
struct MakeDirs;
impl ProvidesConf for MakeDirs {}

impl Task for MakeDirs {
    fn name(&self) -> &str {
        "system.mkdirs"
    }

    fn run(&self, cx: &TaskContext<'_>) -> Result<()> {
        for (_, dir) in cx.conf().items_with_suffix("_dir")? {
            cx.run(&format!("mkdir --parents {}", template::render_value(&dir)))?;
        }
        Ok(())
    }
}

/// Refreshes the package index unless it was refreshed earlier in the run.
struct AptitudeUpdate;
impl ProvidesConf for AptitudeUpdate {}

impl Task for AptitudeUpdate {
    fn name(&self) -> &str {
        "system.aptitude_update"
    }

    fn run(&self, cx: &TaskContext<'_>) -> Result<()> {
        let force = cx.conf().get_or("force", false).as_bool().unwrap_or(false);
        let done = cx.run_context().cached("_aptitude_updated").is_some();
        if force || !done {
            cx.sudo("aptitude update")?;
            cx.run_context().remember("_aptitude_updated", json!(true));
        }
        Ok(())
    }
}

/// Installs packages, forcing an index refresh first.
struct AptitudeInstall;

impl AptitudeInstall {
    fn options(&self, conf: &Conf<'_>) -> ConfResult<Value> {
        let quiet = conf.get_or("quiet", true).as_bool().unwrap_or(true);
        Ok(json!(if quiet { "--assume-yes --quiet" } else { "--assume-yes" }))
    }
}

provides_conf!(AptitudeInstall { options });

impl Task for AptitudeInstall {
    fn name(&self) -> &str {
        "system.aptitude_install"
    }

    fn run(&self, cx: &TaskContext<'_>) -> Result<()> {
        cx.invoke(&AptitudeUpdate, Overrides::new().set("force", true))?;
        cx.sudo("aptitude install %(options)s %(packages)s")?;
        Ok(())
    }
}

/// Reads a release stamp that an override provider computes once per run.
struct Announce;
impl ProvidesConf for Announce {}

impl Task for Announce {
    fn name(&self) -> &str {
        "release.announce"
    }

    fn run(&self, cx: &TaskContext<'_>) -> Result<()> {
        cx.run("echo %(release)s")?;
        Ok(())
    }
}

fn run_over(base: BaseConfig, exec: &DryRunExecutor) -> RunContext {
    RunContext::new(base)
        .with_value_source(Unattended)
        .with_executor(exec.clone())
}

#[test]
fn test_before_do_default_is_visible_to_run() {
    let exec = DryRunExecutor::new();
    let run = run_over(BaseConfig::new().with("users", json!(["alice", "bob"])), &exec);

    run.invoke(&AddUsers, Overrides::new()).unwrap();
    assert_eq!(
        exec.command_lines(),
        vec!["adduser --disabled-password alice", "adduser --disabled-password bob"]
    );
}

#[test]
fn test_before_do_default_keeps_configured_value() {
    let exec = DryRunExecutor::new();
    let base = BaseConfig::new()
        .with("users", json!(["alice", "bob"]))
        .with("exclude_users", json!(["bob"]));
    let run = run_over(base, &exec);

    run.invoke(&AddUsers, Overrides::new()).unwrap();
    assert_eq!(exec.command_lines(), vec!["adduser --disabled-password alice"]);
}

#[test]
fn test_defaults_do_not_leak_between_invocations() {
    let exec = DryRunExecutor::new();
    let run = run_over(BaseConfig::new().with("users", json!(["alice"])), &exec);

    run.invoke(&AddUsers, Overrides::new()).unwrap();
    assert!(!run.base_keys().contains(&"exclude_users".to_string()));
    assert!(run.cached("exclude_users").is_none());
}

#[test]
fn test_mkdirs_creates_every_dir_key() {
    let exec = DryRunExecutor::new();
    let base = BaseConfig::new()
        .with("home_dir", "/home/deploy")
        .with("log_dir", "/var/log/app")
        .with("user", "deploy");
    let run = run_over(base, &exec);

    run.invoke(&MakeDirs, Overrides::new().set("src_dir", "/srv/app/src"))
        .unwrap();
    assert_eq!(
        exec.command_lines(),
        vec![
            "mkdir --parents /home/deploy",
            "mkdir --parents /var/log/app",
            "mkdir --parents /srv/app/src",
        ]
    );
    assert!(exec.commands().iter().all(|c| c.privilege == Privilege::User));
}

#[test]
fn test_nested_invocation_gets_its_own_overrides() {
    let exec = DryRunExecutor::new();
    let run = run_over(BaseConfig::new().with("packages", json!(["git", "curl"])), &exec);

    // first update runs normally, the forced one from install runs again
    run.invoke(&AptitudeUpdate, Overrides::new()).unwrap();
    run.invoke(&AptitudeInstall, Overrides::new()).unwrap();
    run.invoke(&AptitudeUpdate, Overrides::new()).unwrap();

    assert_eq!(
        exec.command_lines(),
        vec![
            "aptitude update",
            "aptitude update",
            "aptitude install --assume-yes --quiet git curl",
        ]
    );
}

#[test]
fn test_task_provider_reads_call_overrides() {
    let exec = DryRunExecutor::new();
    let run = run_over(BaseConfig::new().with("packages", "nginx"), &exec);

    run.invoke(&AptitudeInstall, Overrides::new().set("quiet", false))
        .unwrap();
    assert_eq!(
        exec.command_lines().last().map(String::as_str),
        Some("aptitude install --assume-yes nginx")
    );
}

#[test]
fn test_override_provider_result_shared_across_tasks() {
    use std::cell::Cell;
    use std::rc::Rc;

    let exec = DryRunExecutor::new();
    let run = run_over(BaseConfig::new(), &exec);
    let calls = Rc::new(Cell::new(0));

    let counter = calls.clone();
    let stamp = provider(move |_| {
        counter.set(counter.get() + 1);
        Ok(json!("2026.10.16-1"))
    });
    run.invoke(&Announce, Overrides::new().provider("release", stamp))
        .unwrap();
    // no override now: the value comes from the run cache
    run.invoke(&Announce, Overrides::new()).unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(exec.command_lines(), vec!["echo 2026.10.16-1", "echo 2026.10.16-1"]);
    assert_eq!(run.cached("release"), Some(json!("2026.10.16-1")));
}

#[test]
fn test_prompted_value_reused_by_later_tasks() {
    let exec = DryRunExecutor::new();
    let answers = CannedAnswers::new().answer("src_dir", "/opt/app");
    let run = RunContext::new(BaseConfig::new())
        .with_value_source(answers.clone())
        .with_executor(exec.clone());

    run.invoke(&Announce, Overrides::new().set("release", "r1"))
        .unwrap();
    run.invoke(&MakeDirs, Overrides::new()).unwrap();
    assert_eq!(exec.command_lines(), vec!["echo r1"]);

    struct Cleanup;
    impl ProvidesConf for Cleanup {}
    impl Task for Cleanup {
        fn name(&self) -> &str {
            "system.remove_src"
        }
        fn run(&self, cx: &TaskContext<'_>) -> Result<()> {
            cx.sudo("rm --recursive --force %(src_dir)s")?;
            Ok(())
        }
    }

    run.invoke(&Cleanup, Overrides::new()).unwrap();
    run.invoke(&MakeDirs, Overrides::new()).unwrap();

    assert_eq!(answers.asked(), vec!["system.remove_src.src_dir = "]);
    assert_eq!(
        exec.command_lines(),
        vec!["echo r1", "rm --recursive --force /opt/app", "mkdir --parents /opt/app"]
    );
}

#[test]
fn test_missing_value_names_task_and_key() {
    let exec = DryRunExecutor::new();
    let run = run_over(BaseConfig::new(), &exec);

    let err = run.invoke(&AddUsers, Overrides::new()).unwrap_err();
    let conf_err = err.downcast_ref::<ConfError>().unwrap();
    assert_eq!(conf_err.code, ErrorCode::MissingValue);
    assert_eq!(conf_err.key.as_deref(), Some("users"));
    assert!(format!("{:#}", err).contains("users.add.users"));
    assert!(exec.commands().is_empty());
}
