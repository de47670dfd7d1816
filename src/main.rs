//! DANE-SMTP - DANE verification of SMTP servers
//!
//! This tool provides functionality for:
//! - Resolving the DANE records of a domain's mail servers
//! - Connecting to mail servers with DANE-only certificate trust
//! - Verifying stored certificate chains against stored DANE records

use clap::Parser;
use console::style;
use dane_smtp::cli::{Cli, Commands};
use dane_smtp::commands;
use dane_smtp::config::Settings;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "warn,dane_smtp=debug,smtp.wire=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.no_color {
        console::set_colors_enabled(false);
    }

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from_file(path)?,
        None => Settings::load_default()?,
    };
    cli.apply_overrides(&mut settings);

    match &cli.command {
        Commands::Resolve(args) => commands::run_resolve(args, &settings, cli.format),
        Commands::Connect(args) => commands::run_connect(args, &settings, cli.format),
        Commands::Verify(args) => commands::run_verify(args, cli.format),
        Commands::Tlsa(args) => commands::run_tlsa(args, &settings, cli.format),
    }
}
