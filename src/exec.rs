//! Command execution seam.
//!
//! Tasks hand fully interpolated shell commands to an [`Executor`]. The remote
//! transport lives outside this crate; [`DryRunExecutor`] logs and records.

use anyhow::Result;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;

/// How a command is to be run on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    User,
    Sudo,
}

/// A command as handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutedCommand {
    pub privilege: Privilege,
    pub command: String,
}

/// Runs shell commands against the target host.
pub trait Executor {
    /// Run `command`, returning its standard output.
    fn execute(&self, privilege: Privilege, command: &str) -> Result<String>;
}

/// Records commands instead of running them.
///
/// Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct DryRunExecutor {
    commands: Rc<RefCell<Vec<ExecutedCommand>>>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<ExecutedCommand> {
        self.commands.borrow().clone()
    }

    /// Just the command lines, in order.
    pub fn command_lines(&self) -> Vec<String> {
        self.commands
            .borrow()
            .iter()
            .map(|c| c.command.clone())
            .collect()
    }
}

impl Executor for DryRunExecutor {
    fn execute(&self, privilege: Privilege, command: &str) -> Result<String> {
        info!(?privilege, command, "dry-run");
        self.commands.borrow_mut().push(ExecutedCommand {
            privilege,
            command: command.to_string(),
        });
        Ok(String::new())
    }
}
