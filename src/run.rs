//! Per-run execution context.
//!
//! One [`RunContext`] exists for each execution run. It owns the shared base
//! configuration, the run cache of prompted and override-computed values, the
//! interactive value source and the command executor. Every resolver in the
//! run borrows it.
//!
//! The context is deliberately `!Sync`: resolution, the cycle guard and the
//! cache all assume one task executes at a time.

use crate::conf::{BaseConfig, Entry};
use crate::error::ConfResult;
use crate::exec::{DryRunExecutor, Executor};
use crate::prompts::{TerminalPrompt, ValueSource};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Shared state for one execution run.
pub struct RunContext {
    id: String,
    started_at: DateTime<Utc>,
    base: RefCell<BaseConfig>,
    cache: RefCell<BTreeMap<String, Value>>,
    source: Box<dyn ValueSource>,
    executor: Box<dyn Executor>,
}

impl RunContext {
    /// Create a run over `base`, prompting on the terminal and executing
    /// commands in dry-run mode.
    pub fn new(base: BaseConfig) -> Self {
        let id = generate_run_id();
        debug!(run = %id, keys = base.len(), "Run context created");
        Self {
            id,
            started_at: Utc::now(),
            base: RefCell::new(base),
            cache: RefCell::new(BTreeMap::new()),
            source: Box::new(TerminalPrompt::stdio()),
            executor: Box::new(DryRunExecutor::new()),
        }
    }

    /// Set the interactive value source (builder pattern).
    pub fn with_value_source(mut self, source: impl ValueSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    /// Set the command executor (builder pattern).
    pub fn with_executor(mut self, executor: impl Executor + 'static) -> Self {
        self.executor = Box::new(executor);
        self
    }

    /// Set an explicit run id (builder pattern).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    /// A copy of the base entry for `key`.
    ///
    /// Cloned so no borrow is held while a provider runs.
    pub fn base_entry(&self, key: &str) -> Option<Entry> {
        self.base.borrow().get(key).cloned()
    }

    pub fn base_keys(&self) -> Vec<String> {
        self.base.borrow().keys().cloned().collect()
    }

    /// Add or replace a base value for the rest of the run.
    pub fn set_base(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.base.borrow_mut().insert(key, value);
    }

    /// Look up a remembered value.
    pub fn cached(&self, key: &str) -> Option<Value> {
        self.cache.borrow().get(key).cloned()
    }

    /// Remember a value for the rest of the run.
    pub fn remember(&self, key: &str, value: Value) {
        debug!(run = %self.id, key, "Remembered value");
        self.cache.borrow_mut().insert(key.to_string(), value);
    }

    /// Everything remembered so far.
    pub fn cache_snapshot(&self) -> BTreeMap<String, Value> {
        self.cache.borrow().clone()
    }

    /// Ask the value source for `key`.
    pub fn ask(&self, label: &str, key: &str) -> ConfResult<Value> {
        info!(run = %self.id, key, "Prompting for configuration value");
        self.source.resolve_or_fail(label, key)
    }

    /// Record an interactively obtained value in both the base layer and the
    /// cache.
    pub fn store_prompted(&self, key: &str, value: Value) {
        self.base.borrow_mut().insert(key, value.clone());
        self.remember(key, value);
    }
}

/// Generate a human-readable run id.
fn generate_run_id() -> String {
    use petname::{Generator, Petnames};

    Petnames::medium()
        .generate_one(2, "-")
        .unwrap_or_else(|| format!("run-{}", Utc::now().timestamp_millis()))
}
