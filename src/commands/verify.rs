//! Offline DANE verification command

use crate::cert_ops::reader::read_certificate_chain;
use crate::cli::{OutputFormat, VerifyArgs};
use crate::dane::{decide, DaneRecord, TrustDecision};
use crate::output::{print_decision, print_header, print_json, print_record_set};
use crate::smtp::key_exchange_name;
use anyhow::Context;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Serialize)]
pub struct VerifyOutput {
    pub chain_length: usize,
    pub key_exchange: String,
    pub records: usize,
    pub trusted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Decide whether a stored certificate chain is trusted by stored records
pub fn run_verify(args: &VerifyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let chain = read_certificate_chain(&args.chain)?;

    let mut records = HashSet::new();
    for path in &args.records {
        let record = DaneRecord::load(path)
            .with_context(|| format!("cannot load DANE record {}", path.display()))?;
        records.insert(record);
    }

    let key_exchange = args
        .key_exchange
        .clone()
        .unwrap_or_else(|| key_exchange_name(&chain[0]));
    let decision = decide(&chain, &key_exchange, &records);

    match format {
        OutputFormat::Json => print_json(&VerifyOutput {
            chain_length: chain.len(),
            key_exchange: key_exchange.clone(),
            records: records.len(),
            trusted: decision.is_accepted(),
            reason: match &decision {
                TrustDecision::Accept => None,
                TrustDecision::Reject(reason) => Some(reason.to_string()),
            },
        })?,
        OutputFormat::Table => {
            print_header(&format!(
                "Verifying {} ({} certificate(s), {})",
                args.chain.display(),
                chain.len(),
                key_exchange
            ));
            print_record_set(&records);
            println!();
            print_decision(&decision);
        }
    }

    Ok(decision.into_result()?)
}
