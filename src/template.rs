//! `%(key)s` string interpolation over any [`ConfMap`].
//!
//! Command lines are written as templates such as
//! `"supervisorctl --configuration=%(supervisord_config)s %(command)s"`.
//! Each `%(key)s` is replaced with the rendered value of `key`; `%%` is a
//! literal percent sign. Lookups go through [`ConfMap::lookup`], so a key
//! nothing else resolves may be prompted for.

use crate::conf::ConfMap;
use crate::error::ConfResult;
use regex_lite::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"%%|%\(([^()]+)\)s").expect("placeholder pattern is valid")
    })
}

/// Interpolate `template` with values from `map`.
pub fn render<M: ConfMap + ?Sized>(template: &str, map: &M) -> ConfResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in placeholder().captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        match caps.get(1) {
            Some(key) => out.push_str(&render_value(&map.lookup(key.as_str())?)),
            None => out.push('%'),
        }
        last = whole.end();
    }

    out.push_str(&template[last..]);
    Ok(out)
}

/// Keys referenced by a template, in order of first appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for caps in placeholder().captures_iter(template) {
        if let Some(key) = caps.get(1) {
            if !keys.iter().any(|k| k == key.as_str()) {
                keys.push(key.as_str().to_string());
            }
        }
    }
    keys
}

/// Render a value for substitution into a command line.
///
/// Strings are used raw, null is empty, arrays are space-joined and objects
/// become compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::AttrMap;
    use crate::error::ErrorCode;
    use serde_json::json;

    fn map() -> AttrMap {
        [
            ("user", json!("deploy")),
            ("packages", json!(["git", "curl"])),
            ("force", json!(false)),
            ("port", json!(22)),
            ("nothing", json!(null)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_render_substitutes_keys() {
        let out = render("chown --recursive %(user)s:%(user)s .ssh", &map()).unwrap();
        assert_eq!(out, "chown --recursive deploy:deploy .ssh");
    }

    #[test]
    fn test_render_value_kinds() {
        let out = render(
            "install -y %(packages)s force=%(force)s port=%(port)s [%(nothing)s]",
            &map(),
        )
        .unwrap();
        assert_eq!(out, "install -y git curl force=false port=22 []");
    }

    #[test]
    fn test_render_escaped_percent() {
        let out = render("echo 100%% for %(user)s", &map()).unwrap();
        assert_eq!(out, "echo 100% for deploy");
    }

    #[test]
    fn test_render_leaves_other_percent_sequences() {
        let out = render("date +%Y-%m-%d", &map()).unwrap();
        assert_eq!(out, "date +%Y-%m-%d");
    }

    #[test]
    fn test_render_missing_key_fails() {
        let err = render("rm -rf %(src_dir)s", &map()).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingValue);
        assert_eq!(err.key.as_deref(), Some("src_dir"));
    }

    #[test]
    fn test_placeholders_deduplicated() {
        assert_eq!(
            placeholders("%(user)s:%(user)s %(home)s %%"),
            vec!["user", "home"]
        );
    }
}
