//! JSON output formatter

use serde::Serialize;

/// Serialize any output structure as pretty JSON
pub fn to_json_output<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Print an output structure as JSON to stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", to_json_output(value)?);
    Ok(())
}
