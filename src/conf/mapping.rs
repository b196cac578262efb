//! The mapping interface consumed by templating and other collaborators.

use crate::error::ConfResult;
use serde_json::Value;

/// Read-only string-keyed mapping.
///
/// `contains` and `key_names` must not have side effects: collaborators call
/// them freely while building command lines.
pub trait ConfMap {
    /// Look a key up, failing with a missing-value error when absent.
    fn lookup(&self, key: &str) -> ConfResult<Value>;

    /// Probe for a key.
    fn contains(&self, key: &str) -> bool;

    /// Every key name, each exactly once.
    fn key_names(&self) -> Vec<String>;

    fn len(&self) -> usize {
        self.key_names().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
