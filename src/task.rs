//! Task lifecycle integration.
//!
//! Each invocation of a [`Task`] gets a fresh [`Conf`] built from the call's
//! overrides, the task type's declared providers and the run's base
//! configuration. `before_do` may pre-populate keys with `set_default`; `run`
//! then reads configuration exclusively through the resolver. The resolver is
//! dropped when the invocation returns; the run cache outlives it.

use crate::conf::{Conf, ConfMap, Overrides};
use crate::error::ConfResult;
use crate::exec::Privilege;
use crate::provider::ProvidesConf;
use crate::run::RunContext;
use crate::template;
use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info, info_span};

/// A deployment step.
pub trait Task: ProvidesConf {
    /// Name used in prompt labels and logs, e.g. `supervisor.ctl`.
    fn name(&self) -> &str;

    /// Setup hook run before `run`.
    fn before_do(&self, _cx: &TaskContext<'_>) -> Result<()> {
        Ok(())
    }

    fn run(&self, cx: &TaskContext<'_>) -> Result<()>;
}

/// What a task body sees during one invocation.
pub struct TaskContext<'a> {
    conf: Conf<'a>,
    run: &'a RunContext,
}

impl<'a> TaskContext<'a> {
    /// The invocation's resolver.
    pub fn conf(&self) -> &Conf<'a> {
        &self.conf
    }

    pub fn run_context(&self) -> &'a RunContext {
        self.run
    }

    /// Shorthand for `conf().get(key)`.
    pub fn get(&self, key: &str) -> ConfResult<Value> {
        self.conf.get(key)
    }

    /// Interpolate a command template with this invocation's configuration.
    pub fn render(&self, command: &str) -> ConfResult<String> {
        template::render(command, &self.conf)
    }

    /// Interpolate and run a command as the connection user.
    pub fn run(&self, command: &str) -> Result<String> {
        self.execute(Privilege::User, command)
    }

    /// Interpolate and run a command with sudo.
    pub fn sudo(&self, command: &str) -> Result<String> {
        self.execute(Privilege::Sudo, command)
    }

    /// Invoke another task in the same run.
    pub fn invoke<T: Task>(&self, task: &T, overrides: Overrides) -> Result<()> {
        self.run.invoke(task, overrides)
    }

    fn execute(&self, privilege: Privilege, command: &str) -> Result<String> {
        let line = self.render(command)?;
        self.run
            .executor()
            .execute(privilege, &line)
            .with_context(|| format!("Command failed: {}", line))
    }
}

impl ConfMap for TaskContext<'_> {
    fn lookup(&self, key: &str) -> ConfResult<Value> {
        self.conf.get(key)
    }

    fn contains(&self, key: &str) -> bool {
        self.conf.contains(key)
    }

    fn key_names(&self) -> Vec<String> {
        self.conf.keys()
    }
}

impl RunContext {
    /// Run one invocation of `task` with `overrides` as its highest layer.
    pub fn invoke<T: Task>(&self, task: &T, overrides: Overrides) -> Result<()> {
        let span = info_span!("task", task = task.name(), run = %self.id());
        let _enter = span.enter();

        debug!(overrides = overrides.len(), "Building resolver");
        let cx = TaskContext {
            conf: Conf::for_task(self, task.name(), task, overrides),
            run: self,
        };

        info!("Task started");
        task.before_do(&cx)
            .with_context(|| format!("Task {} setup failed", task.name()))?;
        task.run(&cx)
            .with_context(|| format!("Task {} failed", task.name()))?;
        info!("Task finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::BaseConfig;
    use crate::error::{ConfError, ErrorCode};
    use crate::exec::DryRunExecutor;
    use crate::prompts::Unattended;
    use crate::provides_conf;
    use serde_json::json;

    struct RemoveSrc;
    impl ProvidesConf for RemoveSrc {}

    impl Task for RemoveSrc {
        fn name(&self) -> &str {
            "system.remove_src"
        }

        fn run(&self, cx: &TaskContext<'_>) -> Result<()> {
            cx.sudo("rm --recursive --force %(src_dir)s")?;
            Ok(())
        }
    }

    struct Update;

    impl Update {
        fn command(&self, _conf: &Conf<'_>) -> ConfResult<Value> {
            Ok(json!("update"))
        }
    }

    provides_conf!(Update { command });

    impl Task for Update {
        fn name(&self) -> &str {
            "supervisor.update"
        }

        fn run(&self, cx: &TaskContext<'_>) -> Result<()> {
            cx.sudo("supervisorctl --configuration=%(supervisord_config)s %(command)s")?;
            Ok(())
        }
    }

    fn run_over(base: BaseConfig, exec: &DryRunExecutor) -> RunContext {
        RunContext::new(base)
            .with_value_source(Unattended)
            .with_executor(exec.clone())
    }

    #[test]
    fn test_invoke_interpolates_base_values() {
        let exec = DryRunExecutor::new();
        let run = run_over(BaseConfig::new().with("src_dir", "/srv/app/src"), &exec);

        run.invoke(&RemoveSrc, Overrides::new()).unwrap();
        assert_eq!(exec.command_lines(), vec!["rm --recursive --force /srv/app/src"]);
        assert_eq!(exec.commands()[0].privilege, Privilege::Sudo);
    }

    #[test]
    fn test_overrides_win_for_this_call_only() {
        let exec = DryRunExecutor::new();
        let run = run_over(BaseConfig::new().with("src_dir", "/srv/app/src"), &exec);

        run.invoke(&RemoveSrc, Overrides::new().set("src_dir", "/tmp/other"))
            .unwrap();
        run.invoke(&RemoveSrc, Overrides::new()).unwrap();

        assert_eq!(
            exec.command_lines(),
            vec![
                "rm --recursive --force /tmp/other",
                "rm --recursive --force /srv/app/src"
            ]
        );
    }

    #[test]
    fn test_task_provider_used() {
        let exec = DryRunExecutor::new();
        let run = run_over(
            BaseConfig::new().with("supervisord_config", "/etc/supervisord.conf"),
            &exec,
        );

        run.invoke(&Update, Overrides::new()).unwrap();
        assert_eq!(
            exec.command_lines(),
            vec!["supervisorctl --configuration=/etc/supervisord.conf update"]
        );
    }

    #[test]
    fn test_missing_value_aborts_task() {
        let exec = DryRunExecutor::new();
        let run = run_over(BaseConfig::new(), &exec);

        let err = run.invoke(&RemoveSrc, Overrides::new()).unwrap_err();
        let conf_err = err.downcast_ref::<ConfError>().unwrap();
        assert_eq!(conf_err.code, ErrorCode::MissingValue);
        assert!(format!("{:#}", err).contains("system.remove_src.src_dir"));
        assert!(exec.commands().is_empty());
    }
}
