//! Layered configuration resolution for deployment tasks.
//!
//! A [`Conf`](conf::Conf) answers key lookups from, in order: per-invocation
//! overrides, providers declared by the owning task, the run's base
//! configuration, and finally an interactive prompt whose answer is cached
//! for the rest of the run.

pub mod attr;
pub mod cli;
pub mod conf;
pub mod config;
pub mod error;
pub mod exec;
pub mod format;
pub mod logging;
pub mod prompts;
pub mod provider;
pub mod run;
pub mod task;
pub mod template;

pub use attr::AttrMap;
pub use conf::{BaseConfig, Conf, ConfMap, Overrides};
pub use error::{ConfError, ConfResult, ErrorCode};
pub use provider::{Provider, ProviderDecl, ProvidesConf};
pub use run::RunContext;
pub use task::{Task, TaskContext};
