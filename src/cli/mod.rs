//! CLI command definitions for deploy-conf
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::conf::Overrides;
use crate::format::OutputFormat;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;

/// Inspect and resolve layered deployment configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (replaces the project and user tiers)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Environment section to merge over the defaults
    #[arg(short, long, global = true)]
    pub env: Option<String>,

    /// Override a value for this invocation (KEY=VALUE, repeatable)
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment, global = true)]
    pub set: Vec<(String, Value)>,

    /// Never prompt; unresolved keys are errors
    #[arg(long, global = true)]
    pub no_input: bool,

    /// Name used to label prompts
    #[arg(long, default_value = "deploy", global = true)]
    pub name: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// The `--set` assignments as an override layer.
    pub fn overrides(&self) -> Overrides {
        self.set.iter().cloned().collect()
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every configuration key without evaluating anything
    Keys,

    /// Resolve one key (prompts if nothing else provides it)
    Get(GetArgs),

    /// Resolve every key that can be resolved without prompting
    Show(ShowArgs),

    /// Interpolate a %(key)s template
    Render(RenderArgs),
}

/// Arguments for the get subcommand
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Key to resolve
    pub key: String,

    /// Output format: text (default), json, or yaml
    #[arg(short, long, default_value = "text", value_parser = parse_format)]
    pub format: OutputFormat,
}

/// Arguments for the show subcommand
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Output format: text (default), json, or yaml
    #[arg(short, long, default_value = "text", value_parser = parse_format)]
    pub format: OutputFormat,
}

/// Arguments for the render subcommand
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Template such as "rm -rf %(src_dir)s"
    pub template: String,
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_str(s).ok_or_else(|| format!("unknown format '{}'", s))
}

/// Parse `KEY=VALUE`. The value is read as a YAML scalar or flow collection,
/// so `true`, `22` and `[git, curl]` keep their types; anything else is a
/// string.
pub fn parse_assignment(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    let value = if raw.trim().is_empty() {
        Value::String(String::new())
    } else {
        serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    };
    Ok((key.to_string(), value))
}
