//! CLI argument definitions using clap

use crate::config::Settings;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dane-smtp")]
#[command(version)]
#[command(about = "DANE verification of SMTP servers", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE", global = true, env = "DANE_SMTP_CONFIG")]
    pub config: Option<PathBuf>,

    /// DNS resolver host ("default" uses the system resolver)
    #[arg(long, value_name = "HOST", global = true)]
    pub dns_host: Option<String>,

    /// DNS resolver port
    #[arg(long, value_name = "PORT", global = true)]
    pub dns_port: Option<u16>,

    /// Send all DNS queries over TCP
    #[arg(long, global = true)]
    pub tcp: bool,

    /// Accept MX answers without DNSSEC (TLSA lookups stay secure)
    #[arg(long, global = true)]
    pub insecure_mx: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(host) = &self.dns_host {
            settings.dns.host = host.clone();
        }
        if let Some(port) = self.dns_port {
            settings.dns.port = port;
        }
        if self.tcp {
            settings.dns.tcp_only = true;
        }
        if self.insecure_mx {
            settings.dane.secure_mx = false;
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the DANE records of every mail server of a domain
    Resolve(ResolveArgs),

    /// Connect to the mail servers of a domain with DANE verification
    Connect(ConnectArgs),

    /// Verify a certificate chain against stored DANE records
    Verify(VerifyArgs),

    /// Show the TLSA records of a single mail server
    Tlsa(TlsaArgs),
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Mail domain
    #[arg(required = true)]
    pub domain: String,

    /// Store every resolved record as JSON in this directory
    #[arg(long, value_name = "DIR")]
    pub store: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConnectArgs {
    /// Mail domain
    #[arg(required = true)]
    pub domain: String,

    /// SMTP port
    #[arg(long)]
    pub port: Option<u16>,

    /// Log the SMTP dialog (requires --verbose to be visible)
    #[arg(long)]
    pub wire_log: bool,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Certificate chain, leaf first (PEM bundle or single DER)
    #[arg(long, value_name = "FILE", required = true)]
    pub chain: PathBuf,

    /// DANE record JSON file
    #[arg(long = "record", value_name = "FILE", required = true, num_args = 1..)]
    pub records: Vec<PathBuf>,

    /// Key exchange algorithm (derived from the leaf when omitted)
    #[arg(long, value_name = "ALG")]
    pub key_exchange: Option<String>,
}

#[derive(Args)]
pub struct TlsaArgs {
    /// Mail server hostname
    #[arg(required = true)]
    pub server: String,

    /// Domain recorded as the MX domain (defaults to the server)
    #[arg(long, value_name = "DOMAIN")]
    pub mx_domain: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    /// Styled terminal output (default)
    Table,
    /// JSON output
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
