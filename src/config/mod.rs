//! Base-configuration assembly.
//!
//! Consolidates configuration from four tiers with field-by-field YAML merging:
//! 1. **Defaults** - built into the binary
//! 2. **Project** - `$CWD/deploy/config.yaml`
//! 3. **User** - `~/.deploy-conf/config.yaml`
//! 4. **Environment** - `DEPLOY_CONF_*` variables
//!
//! The merged document's `defaults` mapping, with the selected
//! `environments.<name>` section merged over it, becomes the base layer of
//! every resolver in the run.
//!
//! ## Environment Variables
//! - `DEPLOY_CONF_CONFIG_PATH` - Explicit config file (replaces the file tiers)
//! - `DEPLOY_CONF_PROJECT_DIR` - Project config dir (default: `./deploy`)
//! - `DEPLOY_CONF_USER_DIR` - User config dir (default: `~/.deploy-conf`)
//! - `DEPLOY_CONF_ENV` - Environment section to apply
//! - `DEPLOY_CONF_NO_INPUT` - Disable prompting
//! - `DEPLOY_CONF_VAR_<NAME>` - Base value for key `<name>` (lower-cased)

mod loader;
mod merge;
mod types;

pub use loader::{CONFIG_FILE, ConfigLoader, ConfigPaths, ConfigSource, ConfigTier, VAR_PREFIX};
pub use merge::{deep_merge, deep_merge_all};
pub use types::{Config, Settings};
