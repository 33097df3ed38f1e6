// src/commands.rs
//! Command handlers for the offpkg CLI

use anyhow::{bail, Context, Result};
use clap::CommandFactory;
use clap_complete::Shell;
use offpkg::archive::{archive_name, create_run_dir, create_tarball};
use offpkg::repository::{download_packages, DownloadOptions};
use offpkg::{resolve_request, Config, RepositoryClient, Resolution, ResolveRequest};
use std::path::PathBuf;
use tracing::info;

use crate::cli::Cli;

fn client_for(config: &Config) -> Result<RepositoryClient> {
    Ok(RepositoryClient::with_timeout(config.settings.http_timeout())?)
}

fn build_request(config: &Config, distribution: &str, arch: &str, packages: Vec<String>) -> Result<ResolveRequest> {
    let dist = config.distribution(distribution)?;
    Ok(ResolveRequest {
        system_type: dist.system_type,
        distribution: distribution.to_string(),
        arch: arch.to_string(),
        packages,
    })
}

fn print_resolution(resolution: &Resolution) {
    println!("Mirror: {}", resolution.mirror_url);
    println!("Packages ({}):", resolution.packages.len());
    for pkg in &resolution.packages {
        println!("  {} {} [{}]", pkg.name, pkg.version, pkg.arch);
        match &pkg.download_url {
            Some(url) => println!("      {}", url),
            None => println!("      (no download URL)"),
        }
    }
    let total = resolution.total_size();
    if total > 0 {
        println!("Total size: {:.2} MB", total as f64 / 1_048_576.0);
    }
    if !resolution.missing.is_empty() {
        println!("Not found: {}", resolution.missing.join(", "));
    }
}

/// Resolve and print the download list
pub fn cmd_resolve(config: &Config, distribution: &str, arch: &str, json: bool, packages: Vec<String>) -> Result<()> {
    let request = build_request(config, distribution, arch, packages)?;
    let resolution = resolve_request(&client_for(config)?, config, &request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        print_resolution(&resolution);
    }
    Ok(())
}

/// Resolve, download and archive
pub fn cmd_fetch(
    config: &Config,
    distribution: &str,
    arch: &str,
    output: Option<PathBuf>,
    jobs: Option<usize>,
    no_archive: bool,
    packages: Vec<String>,
) -> Result<()> {
    let request = build_request(config, distribution, arch, packages)?;
    let client = client_for(config)?;
    let resolution = resolve_request(&client, config, &request)?;

    if !resolution.missing.is_empty() {
        println!("Not found: {}", resolution.missing.join(", "));
    }
    if resolution.packages.is_empty() {
        bail!("Nothing to download");
    }

    let output = output.unwrap_or_else(|| config.settings.download_dir.clone());
    let stem = archive_name(distribution).trim_end_matches(".tar.gz").to_string();
    let package_dir = create_run_dir(&output, &stem)
        .with_context(|| format!("Failed to prepare {}", output.display()))?;
    let options = DownloadOptions {
        jobs: jobs.unwrap_or(config.settings.max_concurrent_downloads),
        show_progress: true,
    };

    info!(
        "Fetching {} packages into {}",
        resolution.packages.len(),
        package_dir.display()
    );
    let report = download_packages(&client, &resolution.packages, &package_dir, &options)?;

    println!(
        "Downloaded {} of {} packages ({:.2} MB)",
        report.succeeded.len(),
        resolution.packages.len(),
        report.bytes as f64 / 1_048_576.0
    );
    for (name, error) in &report.failed {
        println!("  FAILED {}: {}", name, error);
    }
    println!("Packages: {}", package_dir.display());

    if !no_archive && !report.succeeded.is_empty() {
        let run_name = package_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(stem);
        let archive_path = output.join(format!("{run_name}.tar.gz"));
        let size = create_tarball(&package_dir, &archive_path, &run_name)
            .with_context(|| format!("Failed to create {}", archive_path.display()))?;
        println!("Archive: {} ({:.2} MB)", archive_path.display(), size as f64 / 1_048_576.0);
    }

    if !report.is_complete() {
        bail!("{} of {} downloads failed", report.failed.len(), resolution.packages.len());
    }
    Ok(())
}

/// List configured distributions
pub fn cmd_distros(config: &Config) -> Result<()> {
    if config.distributions.is_empty() {
        println!("No distributions configured");
        return Ok(());
    }

    println!("Distributions:");
    for (id, dist) in &config.distributions {
        let arch = dist.arch.as_deref().map(|a| format!(" ({a})")).unwrap_or_default();
        println!("  {:<16} [{}] {}{}", id, dist.system_type, dist.name, arch);
        println!("      {}", dist.url);
    }
    Ok(())
}

/// Write shell completions to stdout
pub fn cmd_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "offpkg", &mut std::io::stdout());
    Ok(())
}
