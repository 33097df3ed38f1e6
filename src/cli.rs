// src/cli.rs
//! CLI definitions for offpkg
//!
//! The command implementations live in the `commands` module.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "offpkg")]
#[command(version)]
#[command(about = "Resolve and fetch package dependency closures from RPM and Debian mirrors", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ~/.config/offpkg/config.toml, else built-in)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the dependency closure and print the download list
    Resolve {
        /// Distribution identifier (see `offpkg distros`)
        #[arg(short, long)]
        distribution: String,

        /// Target architecture (auto, x86_64, aarch64, amd64, ...)
        #[arg(short, long, default_value = "auto")]
        arch: String,

        /// Print the resolution as JSON
        #[arg(long)]
        json: bool,

        /// Package names to resolve
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Resolve, download every package and pack them into a tarball
    Fetch {
        /// Distribution identifier (see `offpkg distros`)
        #[arg(short, long)]
        distribution: String,

        /// Target architecture (auto, x86_64, aarch64, amd64, ...)
        #[arg(short, long, default_value = "auto")]
        arch: String,

        /// Output directory (default: download_dir from the configuration)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Concurrent downloads (default: max_concurrent_downloads)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Leave the packages unarchived
        #[arg(long)]
        no_archive: bool,

        /// Package names to fetch
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// List configured distributions
    Distros,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
