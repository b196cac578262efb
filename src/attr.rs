//! Insertion-ordered mapping with attribute-style reads.

use crate::conf::ConfMap;
use crate::error::{ConfError, ConfResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An ordered string-keyed mapping whose reads can be made attribute-style.
///
/// Keys keep the order they were first inserted in. `attr` fails with
/// `AttributeNotFound` where `get` would simply return `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttrMap(Map<String, Value>);

impl AttrMap {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Attribute-style read.
    pub fn attr(&self, name: &str) -> ConfResult<&Value> {
        self.0
            .get(name)
            .ok_or_else(|| ConfError::attribute_not_found(name))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for AttrMap {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<AttrMap> for Value {
    fn from(map: AttrMap) -> Self {
        Value::Object(map.0)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for AttrMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl ConfMap for AttrMap {
    fn lookup(&self, key: &str) -> ConfResult<Value> {
        self.0
            .get(key)
            .cloned()
            .ok_or_else(|| ConfError::missing("", key))
    }

    fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    fn key_names(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }
}
