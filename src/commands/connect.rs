//! DANE connection command

use crate::cli::{ConnectArgs, OutputFormat};
use crate::config::Settings;
use crate::output::{print_connect_outcome, print_json};
use crate::smtp::try_dane_connection;

/// Probe the mail servers of a domain until one passes DANE verification
pub fn run_connect(
    args: &ConnectArgs,
    settings: &Settings,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut settings = settings.clone();
    if let Some(port) = args.port {
        settings.smtp.port = port;
    }
    if args.wire_log {
        settings.smtp.wire_log = true;
    }

    let outcome = try_dane_connection(&args.domain, &settings)?;

    match format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Table => print_connect_outcome(&outcome),
    }

    if !outcome.is_connected() {
        anyhow::bail!("no DANE verified connection to {}", args.domain);
    }
    Ok(())
}
