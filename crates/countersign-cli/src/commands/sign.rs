//! Sign command implementation.

use std::path::PathBuf;

use countersign_authz::SigningService;
use countersign_core::SystemClock;

use super::{parse_user, CommandResult, Paths};
use crate::input;
use crate::secret::SecretSource;

pub fn run(
    paths: &Paths,
    user: String,
    input: Option<PathBuf>,
    secret: SecretSource,
) -> CommandResult {
    if secret.uses_stdin() && input.is_none() {
        return Err("--password-stdin needs the payload as a file argument".into());
    }
    let user_id = parse_user(&user)?;
    let secret = secret.read()?;
    let payload = input::read_payload(input)?;

    let store = paths.key_store()?;
    let sink = paths.audit_sink()?;
    let service = SigningService::new(&store, &sink, SystemClock);
    let signature = service
        .request_signature(&user_id, &payload, &secret)
        .map_err(|e| format!("{}: {}", e.kind(), e))?;
    println!("{}", signature.to_base64());
    Ok(())
}
