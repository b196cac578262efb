//! Field-by-field merging of configuration tiers and environment sections.
//!
//! Later values win. Objects merge recursively, arrays and scalars are
//! replaced, and a null in the overlay means "not specified".

use serde_json::Value;

/// Deep merge `overlay` onto `base`.
///
/// # Example
/// ```
/// use serde_json::json;
/// use deploy_conf::config::deep_merge;
///
/// let defaults = json!({"user": "deploy", "backups": {"keep": 7, "dir": "/var/backups"}});
/// let prod = json!({"backups": {"keep": 30}, "hosts": ["web1", "web2"]});
/// let merged = deep_merge(defaults, prod);
/// assert_eq!(merged["backups"]["keep"], 30);
/// assert_eq!(merged["backups"]["dir"], "/var/backups");
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Merge tiers in order, lowest priority first.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}
