//! DANE resolution command

use crate::cli::{OutputFormat, ResolveArgs};
use crate::config::Settings;
use crate::dane::DaneResolver;
use crate::output::{print_json, print_server_records, print_success};
use anyhow::Context;

/// Resolve and print the DANE records of every mail server of a domain
pub fn run_resolve(
    args: &ResolveArgs,
    settings: &Settings,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let resolver = DaneResolver::from_settings(settings)?;
    let records = resolver.resolve_dane_records(&args.domain)?;

    match format {
        OutputFormat::Json => print_json(&records)?,
        OutputFormat::Table => print_server_records(&args.domain, &records),
    }

    if let Some(dir) = &args.store {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create {}", dir.display()))?;
        let mut stored = 0;
        for (server, set) in records.iter() {
            for (index, record) in set.iter().enumerate() {
                let path = dir.join(format!("{}.{}.tlsa.json", server, index));
                record.store(&path)?;
                stored += 1;
            }
        }
        if format == OutputFormat::Table {
            print_success(&format!("Stored {} record(s) in {}", stored, dir.display()));
        }
    }

    Ok(())
}
