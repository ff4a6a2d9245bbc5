//! Reading JSON input from a file or stdin.

use std::io::{self, Read};
use std::path::PathBuf;

use countersign_canonical::SignablePayload;
use serde_json::Value;

pub fn read_text(input: Option<PathBuf>) -> Result<String, Box<dyn std::error::Error>> {
    match input {
        Some(path) => std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read file {}: {}", path.display(), e).into()),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

pub fn read_json(input: Option<PathBuf>) -> Result<Value, Box<dyn std::error::Error>> {
    let text = read_text(input)?;
    serde_json::from_str(&text).map_err(|e| format!("Invalid JSON: {}", e).into())
}

pub fn read_payload(input: Option<PathBuf>) -> Result<SignablePayload, Box<dyn std::error::Error>> {
    let value = read_json(input)?;
    SignablePayload::from_value(value).map_err(|e| format!("Invalid payload: {}", e).into())
}
