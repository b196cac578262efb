//! Output formatting for resolved configuration.

use crate::attr::AttrMap;
use crate::template::render_value;
use anyhow::Result;
use serde_json::Value;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    Yaml,
    #[default]
    Text,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "yaml" | "yml" => Some(OutputFormat::Yaml),
            "text" | "txt" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

/// Format a resolved snapshot.
///
/// Text output is one `key = value` line per key, values rendered as they
/// would be in a command template.
pub fn format_snapshot(snapshot: &AttrMap, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(snapshot)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(snapshot)?),
        OutputFormat::Text => {
            let mut out = String::new();
            for (key, value) in snapshot.iter() {
                out.push_str(&format!("{} = {}\n", key, render_value(value)));
            }
            Ok(out)
        }
    }
}

/// Format a single value.
pub fn format_value(value: &Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        OutputFormat::Text => Ok(render_value(value)),
    }
}
