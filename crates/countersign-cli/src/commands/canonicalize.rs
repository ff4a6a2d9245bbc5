//! Canonicalize command implementation.

use std::path::PathBuf;

use countersign_canonical::Canonicalizer;

use super::CommandResult;
use crate::input;

pub fn run(input: Option<PathBuf>) -> CommandResult {
    let value = input::read_json(input)?;
    let bytes = Canonicalizer::default()
        .encode(&value)
        .map_err(|e| format!("Canonicalization failed: {}", e))?;
    println!("{}", String::from_utf8_lossy(&bytes));
    Ok(())
}
