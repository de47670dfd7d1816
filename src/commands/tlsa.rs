//! TLSA lookup command for a single mail server

use crate::cli::{OutputFormat, TlsaArgs};
use crate::config::Settings;
use crate::dane::DaneResolver;
use crate::dns::to_tlsa_query_name;
use crate::output::{print_header, print_json, print_record_set, print_warning};

/// Print the DANE records of one mail server
pub fn run_tlsa(
    args: &TlsaArgs,
    settings: &Settings,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let resolver = DaneResolver::from_settings(settings)?;
    let mx_domain = args.mx_domain.as_deref().unwrap_or(&args.server);
    let records = resolver.resolve_server_records(mx_domain, &args.server)?;

    match format {
        OutputFormat::Json => {
            let mut sorted: Vec<_> = records.iter().collect();
            sorted.sort_by_key(|r| r.to_string());
            print_json(&sorted)?;
        }
        OutputFormat::Table => {
            print_header(&format!("TLSA records at {}", to_tlsa_query_name(&args.server)));
            if records.is_empty() {
                print_warning("No TLSA records found");
            } else {
                print_record_set(&records);
            }
        }
    }

    Ok(())
}
