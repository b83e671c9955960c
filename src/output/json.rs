use anyhow::{Context, Result};
use serde::Serialize;

/// Serialize a value as pretty JSON and write it to stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered =
        serde_json::to_string_pretty(value).context("Failed to serialize output as JSON")?;
    println!("{rendered}");
    Ok(())
}
