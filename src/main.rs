//! deploy-conf
//!
//! Command-line front end for the layered configuration resolver: loads the
//! tiered base configuration, applies `--set` overrides and resolves keys the
//! same way deployment tasks do.

use anyhow::Result;
use clap::Parser;
use deploy_conf::cli::{Cli, Command};
use deploy_conf::conf::Conf;
use deploy_conf::config::{ConfigLoader, ConfigPaths};
use deploy_conf::format::{format_snapshot, format_value};
use deploy_conf::logging::{self, LogTarget};
use deploy_conf::prompts::Unattended;
use deploy_conf::run::RunContext;
use deploy_conf::template;
use std::collections::BTreeMap;
use tracing::{debug, info};

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut env: BTreeMap<String, String> = std::env::vars().collect();
    if let Some(config_path) = &cli.config {
        env.insert("DEPLOY_CONF_CONFIG_PATH".to_string(), config_path.clone());
    }
    let loader = ConfigLoader::load_with(ConfigPaths::discover(), &env)?;
    for source in loader.sources() {
        debug!(tier = %source.tier, path = ?source.path, "Config tier loaded");
    }

    let base = loader.base_config(cli.env.as_deref())?;
    let interactive = loader.config().settings.interactive && !cli.no_input;

    let run = RunContext::new(base);
    let run = if interactive {
        run
    } else {
        run.with_value_source(Unattended)
    };
    info!(run = %run.id(), interactive, "Run started");

    let conf = Conf::new(&run, cli.name.clone()).with_overrides(cli.overrides());

    match &cli.command {
        Command::Keys => {
            for key in conf.keys() {
                println!("{}", key);
            }
        }
        Command::Get(args) => {
            let value = conf.get(&args.key)?;
            println!("{}", format_value(&value, args.format)?);
        }
        Command::Show(args) => {
            print!("{}", format_snapshot(&conf.snapshot(), args.format)?);
        }
        Command::Render(args) => {
            println!("{}", template::render(&args.template, &conf)?);
        }
    }

    Ok(())
}
