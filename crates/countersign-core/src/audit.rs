//! Audit entries emitted by provisioning, signing and authorization.

use countersign_canonical::{Digest, UserId};
use serde::{Deserialize, Serialize};

/// Action names recorded in audit entries.
pub mod actions {
    /// A purchase authorization request arrived.
    pub const PURCHASE_RECEIVED: &str = "PURCHASE_RECEIVED";
    /// The payload timestamp is within the window.
    pub const PURCHASE_TIMESTAMP_CHECKED: &str = "PURCHASE_TIMESTAMP_CHECKED";
    /// The user's public key was loaded.
    pub const PURCHASE_KEY_LOADED: &str = "PURCHASE_KEY_LOADED";
    /// The signature verified.
    pub const PURCHASE_SIGNATURE_VERIFIED: &str = "PURCHASE_SIGNATURE_VERIFIED";
    /// The purchase was committed.
    pub const PURCHASE_SUCCESS: &str = "PURCHASE_SUCCESS";
    /// The request is structurally invalid.
    pub const PURCHASE_ATTEMPT_INVALID_DATA: &str = "PURCHASE_ATTEMPT_INVALID_DATA";
    /// Neither `productId` nor `orderId` is a non-empty string.
    pub const PURCHASE_ATTEMPT_INVALID_PRODUCT_ID: &str = "PURCHASE_ATTEMPT_INVALID_PRODUCT_ID";
    /// `amount` is missing, not a number, or not positive.
    pub const PURCHASE_ATTEMPT_INVALID_AMOUNT: &str = "PURCHASE_ATTEMPT_INVALID_AMOUNT";
    /// The payload timestamp is outside the window.
    pub const PURCHASE_ATTEMPT_EXPIRED: &str = "PURCHASE_ATTEMPT_EXPIRED";
    /// No usable public key is stored for the user.
    pub const PURCHASE_ATTEMPT_NO_PUBLIC_KEY: &str = "PURCHASE_ATTEMPT_NO_PUBLIC_KEY";
    /// The signature did not verify.
    pub const SIGNATURE_INVALID: &str = "SIGNATURE_INVALID";
    /// The ledger or key store failed after the request was accepted.
    pub const PURCHASE_ERROR: &str = "PURCHASE_ERROR";

    /// A server-side signature was produced.
    pub const PAYLOAD_SIGNED: &str = "PAYLOAD_SIGNED";
    /// The payload to sign is structurally invalid.
    pub const SIGN_REQUEST_INVALID_DATA: &str = "SIGN_REQUEST_INVALID_DATA";
    /// No sealed private key is stored for the user.
    pub const SIGN_REQUEST_NO_PRIVATE_KEY: &str = "SIGN_REQUEST_NO_PRIVATE_KEY";
    /// The supplied secret did not unlock the key.
    pub const SIGN_REQUEST_INVALID_PASSWORD: &str = "SIGN_REQUEST_INVALID_PASSWORD";
    /// The sealed record could not be parsed.
    pub const SIGN_REQUEST_MALFORMED_KEY: &str = "SIGN_REQUEST_MALFORMED_KEY";
    /// Signing failed for another reason.
    pub const SIGN_REQUEST_ERROR: &str = "SIGN_REQUEST_ERROR";

    /// A key pair was generated and stored.
    pub const KEYS_PROVISIONED: &str = "KEYS_PROVISIONED";
    /// A user's keys were destroyed.
    pub const KEYS_REVOKED: &str = "KEYS_REVOKED";
}

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Acting user, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// One of the [`actions`] constants.
    pub action: String,
    /// Human-readable detail. Never contains secrets or key material.
    pub details: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// Client address, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    /// Fingerprint correlating the entries of one request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<Digest>,
}

impl AuditEntry {
    /// Starts an entry with no user, address or attempt id.
    pub fn new(action: impl Into<String>, details: impl Into<String>, timestamp: i64) -> Self {
        Self {
            user_id: None,
            action: action.into(),
            details: details.into(),
            timestamp,
            client_ip: None,
            attempt_id: None,
        }
    }

    /// Sets the acting user.
    pub fn with_user(mut self, user_id: Option<UserId>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Sets the client address.
    pub fn with_client_ip(mut self, client_ip: Option<String>) -> Self {
        self.client_ip = client_ip;
        self
    }

    /// Sets the attempt fingerprint.
    pub fn with_attempt_id(mut self, attempt_id: Option<Digest>) -> Self {
        self.attempt_id = attempt_id;
        self
    }
}
