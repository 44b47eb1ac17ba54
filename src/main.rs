use anyhow::{Context, Result};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use vaultctl::config::Settings;

mod cli;
mod commands;

use crate::cli::args::{Cli, CliCommand};

fn main() {
    if let Err(err) = run() {
        eprintln!("vaultctl error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity.level());

    let mut settings =
        Settings::new(cli.connection.config.as_deref()).context("Configuration error")?;
    settings.merge_with_args(&cli.connection.overrides());
    settings.validate().context("Configuration error")?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to initialize async runtime")?;
    match &cli.command {
        CliCommand::Init => runtime.block_on(commands::init::run_init(&settings)),
        CliCommand::Unseal(args) => {
            runtime.block_on(commands::unseal::run_unseal(args, &settings))
        }
        CliCommand::Setup => runtime.block_on(commands::setup::run_setup(&settings)),
        CliCommand::Status => runtime.block_on(commands::status::run_status(&settings)),
    }
}

fn init_logging(level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
