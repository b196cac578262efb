//! Layered configuration resolver.
//!
//! A [`Conf`] answers lookups by walking its layers in priority order:
//!
//! 1. **Overrides** - explicit values for this invocation. A provider stored
//!    here is evaluated and its result remembered in the run cache.
//! 2. **Providers** - computed values declared by the owning task.
//! 3. **Base** - the run's shared static configuration (literals or providers).
//! 4. **Interactive** - the run cache, then the run's value source (the
//!    operator prompt). Never used for private keys or when prompting is off.
//!
//! Providers are evaluated on every access; only override-triggered provider
//! results and prompted values reach the run cache. A key whose provider is
//! being evaluated cannot reach that provider again until it returns: the
//! inner lookup fails with `ProviderCycle` unless a literal override for the
//! key has been set in the meantime.
//!
//! Non-prompting lookups (`peek`, `get_or`, `contains`, `set_default`,
//! `snapshot`, `items_with_suffix`) stay non-prompting all the way down:
//! providers they evaluate cannot prompt either.
//!
//! The resolver is append/lookup only. `delete` always fails.

mod layers;
mod mapping;

pub use layers::{BaseConfig, Entry, Overrides};
pub use mapping::ConfMap;

use crate::attr::AttrMap;
use crate::error::{ConfError, ConfResult, ErrorCode};
use crate::provider::{BoundProvider, Provider, ProvidesConf, bind_providers};
use crate::run::RunContext;
use crate::template;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

/// Keys starting with this prefix are never prompted for.
pub const PRIVATE_PREFIX: &str = "_";

/// Whether a key is reserved for configuration authors.
pub fn is_private(key: &str) -> bool {
    key.starts_with(PRIVATE_PREFIX)
}

/// Layered resolver for one task invocation.
pub struct Conf<'a> {
    name: String,
    run: &'a RunContext,
    providers: BTreeMap<&'static str, BoundProvider<'a>>,
    overrides: RefCell<Overrides>,
    in_flight: RefCell<BTreeSet<String>>,
    /// Depth of enclosing non-prompting lookups.
    quiet: Cell<usize>,
}

impl<'a> Conf<'a> {
    /// Create a resolver with no providers and no overrides.
    ///
    /// `name` is only used to label prompts and errors.
    pub fn new(run: &'a RunContext, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            run,
            providers: BTreeMap::new(),
            overrides: RefCell::new(Overrides::new()),
            in_flight: RefCell::new(BTreeSet::new()),
            quiet: Cell::new(0),
        }
    }

    /// Create the resolver for one invocation of `owner`.
    pub fn for_task<T: ProvidesConf>(
        run: &'a RunContext,
        name: impl Into<String>,
        owner: &'a T,
        overrides: Overrides,
    ) -> Self {
        Self::new(run, name)
            .with_providers(bind_providers(owner))
            .with_overrides(overrides)
    }

    /// Replace the override layer (builder pattern).
    pub fn with_overrides(self, overrides: Overrides) -> Self {
        self.overrides.replace(overrides);
        self
    }

    /// Add bound providers (builder pattern).
    pub fn with_providers(
        mut self,
        providers: impl IntoIterator<Item = (&'static str, BoundProvider<'a>)>,
    ) -> Self {
        self.providers.extend(providers);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run_context(&self) -> &'a RunContext {
        self.run
    }

    /// Resolve a key, prompting the operator as a last resort.
    pub fn get(&self, key: &str) -> ConfResult<Value> {
        self.resolve(key, true)
    }

    /// Resolve a key without prompting, substituting `default` when it is
    /// unresolved. Never fails.
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        match self.peek(key) {
            Ok(Some(value)) => value,
            Ok(None) => default.into(),
            Err(err) => {
                warn!(conf = %self.name, key, error = %err, "Provider failed, using default");
                default.into()
            }
        }
    }

    /// Resolve a key without prompting.
    ///
    /// Returns `Ok(None)` when the key is unresolved; other failures (a
    /// provider returning an error) are propagated.
    pub fn peek(&self, key: &str) -> ConfResult<Option<Value>> {
        let _quiet = Quiet::enter(&self.quiet);
        match self.resolve(key, false) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_missing() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Attribute-style read: like `get`, but an unresolved key fails with
    /// `AttributeNotFound`.
    pub fn attr(&self, name: &str) -> ConfResult<Value> {
        self.get(name).map_err(ConfError::into_attribute_error)
    }

    /// Resolve a key and deserialize it.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> ConfResult<T> {
        let value = self.get(key)?;
        serde_json::from_value(value).map_err(|e| {
            ConfError::invalid_config(format!("Invalid value for {}: {}", key, e)).with_key(key)
        })
    }

    /// Resolve a key and render it the way templates do.
    pub fn get_string(&self, key: &str) -> ConfResult<String> {
        Ok(template::render_value(&self.get(key)?))
    }

    /// Store an override.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.overrides
            .borrow_mut()
            .insert(key, Entry::Value(value.into()));
    }

    /// Store a provider as an override.
    pub fn set_provider(&self, key: impl Into<String>, provider: Provider) {
        self.overrides
            .borrow_mut()
            .insert(key, Entry::Provider(provider));
    }

    /// Return the resolved value of `key` if there is one (without
    /// prompting); otherwise store `default` as an override and return it.
    pub fn set_default(&self, key: &str, default: impl Into<Value>) -> ConfResult<Value> {
        if let Some(value) = self.peek(key)? {
            return Ok(value);
        }
        let default = default.into();
        debug!(conf = %self.name, key, "Storing default");
        self.set(key, default.clone());
        Ok(default)
    }

    /// Probe for a key without prompting.
    pub fn contains(&self, key: &str) -> bool {
        matches!(self.peek(key), Ok(Some(_)))
    }

    /// Union of override, provider and base key names, sorted.
    ///
    /// No provider is evaluated.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: BTreeSet<String> = self.overrides.borrow().keys().cloned().collect();
        keys.extend(self.providers.keys().map(|k| k.to_string()));
        keys.extend(self.run.base_keys());
        keys.into_iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = String> {
        self.keys().into_iter()
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deletion is not supported.
    pub fn delete(&self, key: &str) -> ConfResult<()> {
        Err(ConfError::not_implemented("delete").with_key(key))
    }

    /// Resolve every key without prompting, skipping unresolved ones.
    pub fn snapshot(&self) -> AttrMap {
        let mut map = AttrMap::new();
        for key in self.keys() {
            match self.peek(&key) {
                Ok(Some(value)) => {
                    map.insert(key, value);
                }
                Ok(None) => {}
                Err(err) => debug!(conf = %self.name, key = %key, error = %err, "Skipped in snapshot"),
            }
        }
        map
    }

    /// Resolved `(key, value)` pairs for keys ending in `suffix`, without
    /// prompting.
    pub fn items_with_suffix(&self, suffix: &str) -> ConfResult<Vec<(String, Value)>> {
        let mut items = Vec::new();
        for key in self.keys().into_iter().filter(|k| k.ends_with(suffix)) {
            if let Some(value) = self.peek(&key)? {
                items.push((key, value));
            }
        }
        Ok(items)
    }

    /// A sibling resolver sharing this one's run, name and providers, with a
    /// copy of the current overrides.
    pub fn fork(&self) -> Conf<'a> {
        Self {
            name: self.name.clone(),
            run: self.run,
            providers: self.providers.clone(),
            overrides: RefCell::new(self.overrides.borrow().clone()),
            in_flight: RefCell::new(BTreeSet::new()),
            quiet: Cell::new(0),
        }
    }

    fn resolve(&self, key: &str, interactive: bool) -> ConfResult<Value> {
        let interactive = interactive && self.quiet.get() == 0;

        // Overrides
        let entry = self.overrides.borrow().get(key).cloned();
        if let Some(entry) = entry {
            debug!(conf = %self.name, key, "Resolved from overrides");
            return match entry {
                Entry::Value(value) => Ok(value),
                Entry::Provider(provider) => {
                    let value = self.evaluate(key, |conf| provider.call(conf))?;
                    self.run.remember(key, value.clone());
                    Ok(value)
                }
            };
        }

        // Task providers
        if let Some(bound) = self.providers.get(key) {
            debug!(conf = %self.name, key, "Resolved from task provider");
            return self.evaluate(key, |conf| (**bound)(conf));
        }

        // Base
        if let Some(entry) = self.run.base_entry(key) {
            debug!(conf = %self.name, key, "Resolved from base");
            return match entry {
                Entry::Value(value) => Ok(value),
                Entry::Provider(provider) => self.evaluate(key, |conf| provider.call(conf)),
            };
        }

        // Interactive
        if interactive && !is_private(key) {
            if let Some(value) = self.run.cached(key) {
                debug!(conf = %self.name, key, "Resolved from run cache");
                return Ok(value);
            }
            let label = format!("{}.{} = ", self.name, key);
            let value = self.run.ask(&label, key).map_err(|err| {
                if err.code == ErrorCode::MissingValue {
                    let qualified = ConfError::missing(&self.name, key);
                    match err.details {
                        Some(details) => qualified.with_details(details),
                        None => qualified,
                    }
                } else {
                    err
                }
            })?;
            self.run.store_prompted(key, value.clone());
            return Ok(value);
        }

        Err(ConfError::missing(&self.name, key))
    }

    /// Run a provider with `key` marked in flight.
    fn evaluate<F>(&self, key: &str, provider: F) -> ConfResult<Value>
    where
        F: FnOnce(&Self) -> ConfResult<Value>,
    {
        if self.in_flight.borrow().contains(key) {
            debug!(conf = %self.name, key, "Provider re-entered");
            return Err(ConfError::cycle(&self.name, key));
        }
        let _guard = InFlight::enter(&self.in_flight, key);
        provider(self)
    }
}

impl ConfMap for Conf<'_> {
    fn lookup(&self, key: &str) -> ConfResult<Value> {
        self.get(key)
    }

    fn contains(&self, key: &str) -> bool {
        Conf::contains(self, key)
    }

    fn key_names(&self) -> Vec<String> {
        self.keys()
    }
}

impl fmt::Debug for Conf<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.snapshot().iter()).finish()
    }
}

/// Marks a key as being evaluated; unmarks it on every exit path.
struct InFlight<'c> {
    set: &'c RefCell<BTreeSet<String>>,
    key: String,
}

impl<'c> InFlight<'c> {
    fn enter(set: &'c RefCell<BTreeSet<String>>, key: &str) -> Self {
        set.borrow_mut().insert(key.to_string());
        Self {
            set,
            key: key.to_string(),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.borrow_mut().remove(&self.key);
    }
}

/// Suppresses prompting for the lifetime of one non-prompting lookup.
struct Quiet<'c>(&'c Cell<usize>);

impl<'c> Quiet<'c> {
    fn enter(depth: &'c Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for Quiet<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}
