//! Configuration document types.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// A configuration document, as found in each tier's `config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Tool behaviour.
    #[serde(default)]
    pub settings: Settings,

    /// Base-layer values shared by every environment.
    #[serde(default)]
    pub defaults: Map<String, Value>,

    /// Environment-specific values merged over `defaults`.
    #[serde(default)]
    pub environments: BTreeMap<String, Map<String, Value>>,
}

impl Config {
    /// Load a single YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn environment_names(&self) -> Vec<&str> {
        self.environments.keys().map(String::as_str).collect()
    }
}

/// Tool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Allow the interactive layer to prompt the operator (default: true).
    #[serde(default = "default_interactive")]
    pub interactive: bool,

    /// Environment section used when none is given on the command line.
    #[serde(default)]
    pub environment: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interactive: default_interactive(),
            environment: None,
        }
    }
}

fn default_interactive() -> bool {
    true
}
