//! Results of an authorization attempt.

use std::fmt;

use countersign_canonical::SignablePayload;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Why a purchase was refused.
///
/// The serialized names are the ones clients match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RejectionReason {
    /// The payload timestamp fell outside the replay window.
    #[serde(rename = "ExpiredError")]
    Expired,
    /// No usable public key is stored for the user.
    #[serde(rename = "NoKeyError")]
    NoKey,
    /// The signature does not verify against the stored key.
    #[serde(rename = "BadSignatureError")]
    BadSignature,
    /// The payload or signature is structurally invalid.
    #[serde(rename = "EncodingError")]
    Encoding,
}

impl RejectionReason {
    /// Wire name of the reason.
    pub fn as_str(self) -> &'static str {
        match self {
            RejectionReason::Expired => "ExpiredError",
            RejectionReason::NoKey => "NoKeyError",
            RejectionReason::BadSignature => "BadSignatureError",
            RejectionReason::Encoding => "EncodingError",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of one request through the orchestrator.
///
/// Stages only move forward; every request ends in `Authorized` or
/// `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStage {
    /// Request accepted for processing and structurally valid.
    Received,
    /// Timestamp is inside the replay window.
    TimestampChecked,
    /// The user's public key was loaded.
    KeyLoaded,
    /// The signature verified.
    SignatureVerified,
    /// The purchase was committed.
    Authorized,
    /// The request was refused.
    Rejected(RejectionReason),
}

impl AuthorizationStage {
    /// True for `Authorized` and `Rejected`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AuthorizationStage::Authorized | AuthorizationStage::Rejected(_)
        )
    }
}

impl fmt::Display for AuthorizationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorizationStage::Received => f.write_str("received"),
            AuthorizationStage::TimestampChecked => f.write_str("timestamp_checked"),
            AuthorizationStage::KeyLoaded => f.write_str("key_loaded"),
            AuthorizationStage::SignatureVerified => f.write_str("signature_verified"),
            AuthorizationStage::Authorized => f.write_str("authorized"),
            AuthorizationStage::Rejected(reason) => write!(f, "rejected({reason})"),
        }
    }
}

/// Final answer for one request.
///
/// Serializes as `{"authorized": true, "payload": .., "receipt": ..}` or
/// `{"authorized": false, "reason": "ExpiredError"}`.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorizationOutcome<R> {
    /// The signature verified and the ledger accepted the purchase.
    Authorized {
        /// The payload exactly as verified.
        payload: SignablePayload,
        /// Ledger receipt.
        receipt: R,
    },
    /// The request was refused.
    Rejected {
        /// Why.
        reason: RejectionReason,
    },
}

impl<R> AuthorizationOutcome<R> {
    /// True when authorized.
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthorizationOutcome::Authorized { .. })
    }

    /// The rejection reason, if any.
    pub fn rejection(&self) -> Option<RejectionReason> {
        match self {
            AuthorizationOutcome::Rejected { reason } => Some(*reason),
            AuthorizationOutcome::Authorized { .. } => None,
        }
    }
}

impl<R: Serialize> Serialize for AuthorizationOutcome<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AuthorizationOutcome::Authorized { payload, receipt } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("authorized", &true)?;
                map.serialize_entry("payload", payload)?;
                map.serialize_entry("receipt", receipt)?;
                map.end()
            }
            AuthorizationOutcome::Rejected { reason } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("authorized", &false)?;
                map.serialize_entry("reason", reason)?;
                map.end()
            }
        }
    }
}
