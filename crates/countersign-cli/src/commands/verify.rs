//! Verify command implementation.

use std::path::PathBuf;

use countersign_core::verify_with_jwk;

use super::CommandResult;
use crate::input;

/// Returns whether the signature is valid.
pub fn run(public_key: PathBuf, signature: String, input: Option<PathBuf>) -> CommandResult<bool> {
    let jwk = std::fs::read(&public_key)
        .map_err(|e| format!("Failed to read public key {}: {}", public_key.display(), e))?;
    let payload = input::read_payload(input)?;
    let valid = verify_with_jwk(&jwk, &payload, &signature)
        .map_err(|e| format!("Verification failed: {}", e))?;
    println!("{}", if valid { "valid" } else { "invalid" });
    Ok(valid)
}
