//! Public-key command implementation.

use countersign_store::KeyStore;
use serde_json::Value;

use super::{parse_user, CommandResult, Paths};
use crate::output;

pub fn run(paths: &Paths, user: String) -> CommandResult {
    let user_id = parse_user(&user)?;
    let store = paths.key_store()?;
    let bytes = store
        .public_key(&user_id)?
        .ok_or_else(|| format!("No public key stored for user {}", user_id))?;
    let jwk: Value = serde_json::from_slice(&bytes)?;
    println!("{}", output::format_json(&jwk));
    Ok(())
}
