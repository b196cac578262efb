//! Configuration loader with tier-based merging.
//!
//! Loads `config.yaml` from each tier, merges them field-by-field and applies
//! environment variables, then assembles the base layer for a run.

use super::merge::{deep_merge, deep_merge_all};
use super::types::Config;
use crate::conf::BaseConfig;
use crate::error::{ConfError, ConfResult};
use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the per-tier configuration file.
pub const CONFIG_FILE: &str = "config.yaml";

/// Prefix of variables that set base-layer values.
pub const VAR_PREFIX: &str = "DEPLOY_CONF_VAR_";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Built-in defaults (lowest priority)
    Defaults = 0,
    /// Project-level config ($CWD/deploy/)
    Project = 1,
    /// User-level config (~/.deploy-conf/)
    User = 2,
    /// Environment variables (highest priority)
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Directories searched for each file tier.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub project_dir: Option<PathBuf>,
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        // Project dir: DEPLOY_CONF_PROJECT_DIR or $CWD/deploy
        let project_dir = std::env::var("DEPLOY_CONF_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("deploy")));

        // User dir: DEPLOY_CONF_USER_DIR or ~/.deploy-conf
        let user_dir = std::env::var("DEPLOY_CONF_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".deploy-conf")));

        Self {
            project_dir,
            user_dir,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }
}

/// Where one tier's values came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub tier: ConfigTier,
    pub path: Option<PathBuf>,
}

/// Loaded and merged configuration.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    sources: Vec<ConfigSource>,
    /// Base values from `DEPLOY_CONF_VAR_*`, applied after the environment section
    variables: Map<String, Value>,
    /// Environment selected through `DEPLOY_CONF_ENV`
    environment: Option<String>,
}

impl ConfigLoader {
    /// Load configuration from all tiers using the process environment.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load configuration with explicit paths and the process environment.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        let env: BTreeMap<String, String> = std::env::vars().collect();
        Self::load_with(paths, &env)
    }

    /// Load configuration with explicit paths and environment variables.
    pub fn load_with(paths: ConfigPaths, env: &BTreeMap<String, String>) -> Result<Self> {
        let mut sources = vec![ConfigSource {
            tier: ConfigTier::Defaults,
            path: None,
        }];

        // Explicit config file replaces the file tiers
        let mut config = if let Some(explicit) = env.get("DEPLOY_CONF_CONFIG_PATH") {
            let path = PathBuf::from(explicit);
            let config = Config::load(&path)?;
            sources.push(ConfigSource {
                tier: ConfigTier::Project,
                path: Some(path),
            });
            config
        } else {
            let mut tiers: Vec<Value> = vec![serde_json::to_value(Config::default())?];

            for (tier, dir) in [
                (ConfigTier::Project, paths.project_dir.as_deref()),
                (ConfigTier::User, paths.user_dir.as_deref()),
            ] {
                let Some(dir) = dir else { continue };
                let file = dir.join(CONFIG_FILE);
                if let Some(value) = read_tier(&file, tier) {
                    tiers.push(value);
                    sources.push(ConfigSource {
                        tier,
                        path: Some(file),
                    });
                }
            }

            serde_json::from_value(deep_merge_all(tiers))?
        };

        let (variables, environment) = Self::apply_env_overrides(&mut config, env);
        if environment.is_some() || env.keys().any(|k| k.starts_with("DEPLOY_CONF_")) {
            sources.push(ConfigSource {
                tier: ConfigTier::Environment,
                path: None,
            });
        }

        Ok(Self {
            paths,
            config,
            sources,
            variables,
            environment,
        })
    }

    /// Apply environment variable overrides to settings; returns the base
    /// values and the selected environment.
    fn apply_env_overrides(
        config: &mut Config,
        env: &BTreeMap<String, String>,
    ) -> (Map<String, Value>, Option<String>) {
        if env.contains_key("DEPLOY_CONF_NO_INPUT") {
            config.settings.interactive = false;
        }

        let mut variables = Map::new();
        for (name, value) in env {
            if let Some(key) = name.strip_prefix(VAR_PREFIX) {
                if key.is_empty() {
                    continue;
                }
                debug!(key = %key.to_lowercase(), "Base value from environment");
                variables.insert(key.to_lowercase(), Value::String(value.clone()));
            }
        }

        (variables, env.get("DEPLOY_CONF_ENV").cloned())
    }

    /// Assemble the base layer for `environment`.
    ///
    /// Falls back to `DEPLOY_CONF_ENV`, then `settings.environment`. With no
    /// environment at all, only `defaults` is used. `DEPLOY_CONF_VAR_*` values
    /// are merged last.
    pub fn base_config(&self, environment: Option<&str>) -> ConfResult<BaseConfig> {
        let selected = environment
            .or(self.environment.as_deref())
            .or(self.config.settings.environment.as_deref());

        let mut merged = Value::Object(self.config.defaults.clone());
        if let Some(name) = selected {
            let section = self.config.environments.get(name).ok_or_else(|| {
                ConfError::invalid_config(format!(
                    "Unknown environment '{}' (known: {})",
                    name,
                    self.config.environment_names().join(", ")
                ))
            })?;
            merged = deep_merge(merged, Value::Object(section.clone()));
        }
        merged = deep_merge(merged, Value::Object(self.variables.clone()));

        match merged {
            Value::Object(map) => Ok(BaseConfig::from_map(map)),
            _ => Err(ConfError::invalid_config("Merged defaults are not a mapping")),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Base values set through `DEPLOY_CONF_VAR_*`.
    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    /// Tiers that contributed, lowest priority first.
    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }
}

/// Read one tier's file, skipping it with a warning when unusable.
fn read_tier(file: &Path, tier: ConfigTier) -> Option<Value> {
    if !file.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(file) {
        Ok(content) => content,
        Err(e) => {
            warn!(%tier, path = %file.display(), error = %e, "Skipping unreadable config file");
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(e) => {
            warn!(%tier, path = %file.display(), error = %e, "Skipping unparsable config file");
            None
        }
    }
}
