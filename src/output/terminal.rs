//! Styled terminal output

use crate::dane::{DaneRecord, MailServerRecords, TrustDecision};
use crate::smtp::ConnectOutcome;
use console::style;
use std::collections::HashSet;

/// Print section header
pub fn print_header(title: &str) {
    println!();
    println!("{}", style(format!("━━━ {} ━━━", title)).cyan().bold());
    println!();
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", style("!").yellow().bold(), message);
}

/// Print one DANE record as a zone-style line with its field meanings
pub fn print_record(record: &DaneRecord) {
    let line = format!(
        "_25._tcp.{}. IN TLSA {}",
        record.domain().trim_end_matches('.'),
        record
    );
    if record.is_supported() {
        println!("     {}", style(line).green());
    } else {
        println!(
            "     {} {}",
            style(line).dim(),
            style("(not usable for SMTP)").yellow()
        );
    }
    println!(
        "       {} / {} / {}",
        style(record.certificate_usage().description()).cyan(),
        record.selector().description(),
        record.matching_type().description()
    );
}

/// Print a record set sorted for stable output
pub fn print_record_set(records: &HashSet<DaneRecord>) {
    let mut sorted: Vec<&DaneRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.to_string());
    for record in sorted {
        print_record(record);
    }
}

/// Print the DANE records of every mail server in priority order
pub fn print_server_records(domain: &str, records: &MailServerRecords) {
    print_header(&format!("DANE records for {}", domain));

    if records.is_empty() {
        print_warning("No mail servers with DANE records found");
        return;
    }

    for (index, (server, set)) in records.iter().enumerate() {
        println!(
            "  {} {}",
            style(format!("{}.", index + 1)).bold(),
            style(server).bold()
        );
        print_record_set(set);
        println!();
    }
}

/// Print the result of a connection attempt
pub fn print_connect_outcome(outcome: &ConnectOutcome) {
    print_header(&format!("DANE connection for {}", outcome.domain));

    for attempt in &outcome.attempts {
        match &attempt.error {
            None => print_success(&attempt.server),
            Some(error) => print_error(&format!("{}: {}", attempt.server, error)),
        }
    }

    match &outcome.connected {
        Some(report) => {
            println!();
            println!("  Server     : {} ({})", style(&report.host).bold(), report.address);
            println!("  Greeting   : {}", report.greeting);
            println!("  Protocol   : {}", style(&report.protocol).cyan());
            println!("  Cipher     : {}", style(&report.cipher_suite).cyan());
        }
        None if outcome.attempts.is_empty() => {
            print_warning("No mail servers with DANE records to try");
        }
        None => {
            println!();
            print_error("No mail server passed DANE verification");
        }
    }
}

/// Print a trust decision
pub fn print_decision(decision: &TrustDecision) {
    match decision {
        TrustDecision::Accept => print_success("Certificate chain is trusted by DANE"),
        TrustDecision::Reject(reason) => print_error(&format!("Rejected: {}", reason)),
    }
}
