//! docship - a push-to-publish pipeline for generated documentation.

mod cli;
mod config;
mod init;
mod logger;
mod pipeline;
mod serve;
mod utils;

use anyhow::{Result, bail};
use clap::Parser;
use cli::{Cli, Commands};
use config::PipelineConfig;
use init::new_project;
use pipeline::RunOptions;
use serve::serve_site;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    let config: &'static PipelineConfig = Box::leak(Box::new(load_config(cli)?));

    match &cli.command {
        Commands::Init { name } => new_project(config, name.is_some()),
        Commands::Run { run_args } => pipeline::run(
            config,
            RunOptions {
                event_ref: run_args.event_ref.clone(),
                fresh: run_args.fresh,
                dry_run: run_args.dry_run,
            },
        ),
        Commands::Build { fresh } => pipeline::build(config, *fresh),
        Commands::Publish { .. } => pipeline::publish_artifact(config),
        Commands::Serve { .. } => serve_site(config),
        Commands::Status => pipeline::report::show_status(config),
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &'static Cli) -> Result<PipelineConfig> {
    let root = cli.root.as_deref().unwrap_or(std::path::Path::new("./"));
    let config_path = root.join(&cli.config);

    let mut config = if config_path.exists() {
        PipelineConfig::from_path(&config_path)?
    } else {
        PipelineConfig::default()
    };
    config.update_with_cli(cli);

    // Validate config state based on command
    let config_exists = config.config_path.exists();
    match (cli.is_init(), config_exists) {
        (true, true) => {
            bail!("Config file already exists. Remove it manually or init in a different path.")
        }
        (false, false) => bail!("Config file not found. Run `docship init` first."),
        _ => {}
    }

    if !cli.is_init() {
        config.validate()?;
    }

    Ok(config)
}
