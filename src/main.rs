// src/main.rs

use anyhow::Result;
use clap::Parser;
use offpkg::Config;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Completions { shell } = cli.command {
        return commands::cmd_completions(shell);
    }

    let config = Config::discover(cli.config.as_deref())?;

    match cli.command {
        Commands::Resolve {
            distribution,
            arch,
            json,
            packages,
        } => commands::cmd_resolve(&config, &distribution, &arch, json, packages),
        Commands::Fetch {
            distribution,
            arch,
            output,
            jobs,
            no_archive,
            packages,
        } => commands::cmd_fetch(&config, &distribution, &arch, output, jobs, no_archive, packages),
        Commands::Distros => commands::cmd_distros(&config),
        Commands::Completions { .. } => Ok(()),
    }
}
