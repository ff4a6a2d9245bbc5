//! Provision command implementation.

use countersign_authz::{AuthzConfig, Provisioner};
use countersign_core::{Algorithm, SystemClock};
use serde_json::{json, Value};

use super::{parse_user, CommandResult, Paths};
use crate::output;
use crate::secret::SecretSource;

pub fn run(
    paths: &Paths,
    config: &AuthzConfig,
    user: String,
    secret: SecretSource,
    algorithm: Option<Algorithm>,
) -> CommandResult {
    let user_id = parse_user(&user)?;
    let secret = secret.read()?;
    let algorithm = algorithm.unwrap_or(config.keys.algorithm);

    let store = paths.key_store()?;
    let sink = paths.audit_sink()?;
    let provisioner = Provisioner::new(&store, &sink, SystemClock, algorithm, config.kdf.params());
    let keys = provisioner
        .provision(&user_id, &secret)
        .map_err(|e| format!("Provisioning failed: {}", e))?;

    let public_key: Value = serde_json::from_slice(&keys.public_key_bytes)?;
    println!(
        "{}",
        output::format_json(&json!({
            "userId": user_id.as_str(),
            "algorithm": algorithm.as_str(),
            "keyId": keys.key_id.as_str(),
            "publicKey": public_key,
        }))
    );
    Ok(())
}
