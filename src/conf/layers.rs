//! Layer contents: literal values and tagged providers.

use crate::provider::Provider;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A value stored in the override or base layer.
#[derive(Debug, Clone)]
pub enum Entry {
    /// Used as-is.
    Value(Value),
    /// Evaluated against the resolver on every lookup.
    Provider(Provider),
}

impl Entry {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Entry::Value(v) => Some(v),
            Entry::Provider(_) => None,
        }
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, Entry::Provider(_))
    }
}

impl From<Value> for Entry {
    fn from(value: Value) -> Self {
        Entry::Value(value)
    }
}

impl From<Provider> for Entry {
    fn from(provider: Provider) -> Self {
        Entry::Provider(provider)
    }
}

/// Static configuration shared by every task in a run.
#[derive(Debug, Clone, Default)]
pub struct BaseConfig {
    entries: BTreeMap<String, Entry>,
}

impl BaseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object of literal values.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self {
            entries: map
                .into_iter()
                .map(|(k, v)| (k, Entry::Value(v)))
                .collect(),
        }
    }

    /// Insert a literal value (builder pattern).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a provider (builder pattern).
    pub fn with_provider(mut self, key: impl Into<String>, provider: Provider) -> Self {
        self.insert_provider(key, provider);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), Entry::Value(value.into()));
    }

    pub fn insert_provider(&mut self, key: impl Into<String>, provider: Provider) {
        self.entries.insert(key.into(), Entry::Provider(provider));
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Explicit per-invocation values; the highest-priority layer.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    entries: BTreeMap<String, Entry>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a literal override (builder pattern).
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), Entry::Value(value.into()));
        self
    }

    /// Add a provider override (builder pattern).
    pub fn provider(mut self, key: impl Into<String>, provider: Provider) -> Self {
        self.entries.insert(key.into(), Entry::Provider(provider));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: Entry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Overrides {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), Entry::Value(v.into())))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::provider;
    use serde_json::json;

    #[test]
    fn test_base_from_map() {
        let map = json!({"user": "deploy", "port": 22});
        let base = BaseConfig::from_map(map.as_object().unwrap().clone());
        assert_eq!(base.len(), 2);
        assert_eq!(base.get("port").and_then(Entry::as_value), Some(&json!(22)));
    }

    #[test]
    fn test_base_builder_mixes_values_and_providers() {
        let base = BaseConfig::new()
            .with("a", 1)
            .with_provider("b", provider(|_| Ok(json!(2))));
        assert!(!base.get("a").unwrap().is_provider());
        assert!(base.get("b").unwrap().is_provider());
    }

    #[test]
    fn test_overrides_from_pairs() {
        let overrides: Overrides = [("force", json!(true))].into_iter().collect();
        assert!(overrides.contains_key("force"));
        assert_eq!(overrides.len(), 1);
    }
}
