// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: distribution identifier
fn distribution_arg() -> Arg {
    Arg::new("distribution")
        .short('d')
        .long("distribution")
        .required(true)
        .help("Distribution identifier (see `offpkg distros`)")
}

/// Common argument: target architecture
fn arch_arg() -> Arg {
    Arg::new("arch")
        .short('a')
        .long("arch")
        .default_value("auto")
        .help("Target architecture (auto, x86_64, aarch64, amd64, ...)")
}

fn packages_arg() -> Arg {
    Arg::new("packages")
        .required(true)
        .num_args(1..)
        .help("Package names")
}

fn build_cli() -> Command {
    Command::new("offpkg")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Resolve and fetch package dependency closures from RPM and Debian mirrors")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("Configuration file (default: ~/.config/offpkg/config.toml, else built-in)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(clap::ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("resolve")
                .about("Resolve the dependency closure and print the download list")
                .arg(distribution_arg())
                .arg(arch_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(clap::ArgAction::SetTrue)
                        .help("Print the resolution as JSON"),
                )
                .arg(packages_arg()),
        )
        .subcommand(
            Command::new("fetch")
                .about("Resolve, download every package and pack them into a tarball")
                .arg(distribution_arg())
                .arg(arch_arg())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("DIR")
                        .help("Output directory (default: download_dir from the configuration)"),
                )
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .help("Concurrent downloads (default: max_concurrent_downloads)"),
                )
                .arg(
                    Arg::new("no_archive")
                        .long("no-archive")
                        .action(clap::ArgAction::SetTrue)
                        .help("Leave the packages unarchived"),
                )
                .arg(packages_arg()),
        )
        .subcommand(Command::new("distros").about("List configured distributions"))
        .subcommand(
            Command::new("completions")
                .about("Generate shell completions")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell to generate completions for"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("offpkg.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
        return;
    }

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
