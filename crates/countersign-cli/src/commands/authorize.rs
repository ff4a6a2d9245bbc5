//! Authorize command implementation.

use std::path::PathBuf;

use countersign_authz::{AuthorizationRequest, Authorizer, AuthzConfig, RecordingLedger};
use countersign_core::SystemClock;

use super::{parse_user, CommandResult, Paths};
use crate::input;

/// Returns whether the purchase was authorized.
pub fn run(
    paths: &Paths,
    config: &AuthzConfig,
    user: String,
    signature: String,
    input: Option<PathBuf>,
    client_ip: Option<String>,
) -> CommandResult<bool> {
    let user_id = parse_user(&user)?;
    let payload = input::read_payload(input)?;

    let store = paths.key_store()?;
    let sink = paths.audit_sink()?;
    let ledger = RecordingLedger::new();
    let authorizer = Authorizer::new(&store, &sink, &ledger, SystemClock, config.replay);

    let mut request = AuthorizationRequest::new(user_id, payload, signature);
    request.client_ip = client_ip;
    let outcome = authorizer.authorize(&request)?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(outcome.is_authorized())
}
