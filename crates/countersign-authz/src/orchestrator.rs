//! Purchase authorization pipeline.
//!
//! ```text
//! Received -> TimestampChecked -> KeyLoaded -> SignatureVerified -> Authorized
//!     \               \                \                \
//!      `---------------`----------------`----------------`--> Rejected(reason)
//! ```
//!
//! Each transition writes exactly one audit entry. All entries of a request
//! share the payload digest as `attempt_id` so they can be correlated
//! without logging the payload itself.

use countersign_canonical::{Digest, SignablePayload, UserId};
use countersign_core::{
    actions, import_public, verify, AuditEntry, Clock, PublicKey, ReplayWindow,
    Signature,
};
use countersign_store::{AuditSink, KeyStore};

use crate::errors::AuthorizeError;
use crate::ledger::{AuthorizedPurchase, PurchaseLedger};
use crate::outcome::{AuthorizationOutcome, AuthorizationStage, RejectionReason};
use crate::purchase::{PurchaseTerms, TermsError};
use crate::record_audit;

/// One purchase authorization request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationRequest {
    /// Claimed buyer.
    pub user_id: UserId,
    /// The signed payload.
    pub payload: SignablePayload,
    /// Base64 signature over the canonical payload.
    pub signature: String,
    /// Client address, recorded in audit entries.
    pub client_ip: Option<String>,
}

impl AuthorizationRequest {
    /// A request with no client address.
    pub fn new(user_id: UserId, payload: SignablePayload, signature: impl Into<String>) -> Self {
        Self {
            user_id,
            payload,
            signature: signature.into(),
            client_ip: None,
        }
    }

    /// Sets the client address.
    pub fn with_client_ip(mut self, client_ip: impl Into<String>) -> Self {
        self.client_ip = Some(client_ip.into());
        self
    }
}

/// Per-request state threaded through the pipeline.
struct Attempt<'r> {
    request: &'r AuthorizationRequest,
    attempt_id: Option<Digest>,
    stage: AuthorizationStage,
}

/// Verifies signed purchases and commits the good ones.
///
/// Holds handles to its collaborators. Pass references or `Arc`s to share
/// stores between services.
pub struct Authorizer<K, A, L, C> {
    keys: K,
    audit: A,
    ledger: L,
    clock: C,
    window: ReplayWindow,
}

impl<K, A, L, C> Authorizer<K, A, L, C>
where
    K: KeyStore,
    A: AuditSink,
    L: PurchaseLedger,
    C: Clock,
{
    /// Builds an authorizer.
    pub fn new(keys: K, audit: A, ledger: L, clock: C, window: ReplayWindow) -> Self {
        Self {
            keys,
            audit,
            ledger,
            clock,
            window,
        }
    }

    /// The replay window in force.
    pub fn window(&self) -> ReplayWindow {
        self.window
    }

    /// Runs one request to a terminal stage.
    ///
    /// Refusals come back as [`AuthorizationOutcome::Rejected`]. `Err` means
    /// the key store or the ledger failed and the request could not be
    /// decided.
    pub fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationOutcome<L::Receipt>, AuthorizeError> {
        let mut attempt = Attempt {
            request,
            attempt_id: request.payload.digest().ok(),
            stage: AuthorizationStage::Received,
        };
        let span = tracing::info_span!(
            "authorize",
            user_id = %request.user_id,
            attempt_id = attempt.attempt_id.as_ref().map(|d| d.b64.as_str()).unwrap_or("-"),
        );
        let _guard = span.enter();

        self.emit(
            &attempt,
            actions::PURCHASE_RECEIVED,
            "purchase request received".into(),
        );

        let terms = match self.check_structure(request) {
            Ok(terms) => terms,
            Err((action, details)) => {
                return Ok(self.reject(&mut attempt, RejectionReason::Encoding, action, details))
            }
        };

        let now = self.clock.now_ms();
        if let Err(err) = self.window.check(terms.timestamp, now) {
            return Ok(self.reject(
                &mut attempt,
                RejectionReason::Expired,
                actions::PURCHASE_ATTEMPT_EXPIRED,
                err.to_string(),
            ));
        }
        self.advance(
            &mut attempt,
            AuthorizationStage::TimestampChecked,
            actions::PURCHASE_TIMESTAMP_CHECKED,
            format!("timestamp {} within window at {now}", terms.timestamp),
        );

        let public = match self.load_key(&request.user_id) {
            Ok(Some(public)) => public,
            Ok(None) => {
                return Ok(self.reject(
                    &mut attempt,
                    RejectionReason::NoKey,
                    actions::PURCHASE_ATTEMPT_NO_PUBLIC_KEY,
                    "no usable public key for user".into(),
                ))
            }
            Err(err) => {
                self.emit(
                    &attempt,
                    actions::PURCHASE_ERROR,
                    format!("key store failed: {err}"),
                );
                return Err(err);
            }
        };
        let key_id = public
            .thumbprint()
            .map(|kid| kid.as_str().to_string())
            .unwrap_or_default();
        self.advance(
            &mut attempt,
            AuthorizationStage::KeyLoaded,
            actions::PURCHASE_KEY_LOADED,
            format!("{} key {key_id}", public.algorithm()),
        );

        match verify(&public, &request.payload, &request.signature) {
            Ok(true) => {}
            Ok(false) => {
                return Ok(self.reject(
                    &mut attempt,
                    RejectionReason::BadSignature,
                    actions::SIGNATURE_INVALID,
                    "signature does not match payload".into(),
                ))
            }
            Err(err) => {
                return Ok(self.reject(
                    &mut attempt,
                    RejectionReason::Encoding,
                    actions::PURCHASE_ATTEMPT_INVALID_DATA,
                    err.to_string(),
                ))
            }
        }
        self.advance(
            &mut attempt,
            AuthorizationStage::SignatureVerified,
            actions::PURCHASE_SIGNATURE_VERIFIED,
            "signature verified".into(),
        );

        let Some(payload_digest) = attempt.attempt_id.clone() else {
            return Ok(self.reject(
                &mut attempt,
                RejectionReason::Encoding,
                actions::PURCHASE_ATTEMPT_INVALID_DATA,
                "payload cannot be fingerprinted".into(),
            ));
        };
        let product_id = terms.product_id.clone();
        let amount = terms.amount;
        let purchase = AuthorizedPurchase {
            user_id: request.user_id.clone(),
            terms,
            payload: request.payload.clone(),
            payload_digest,
        };
        match self.ledger.commit(purchase) {
            Ok(receipt) => {
                tracing::info!(%product_id, amount, "purchase authorized");
                self.advance(
                    &mut attempt,
                    AuthorizationStage::Authorized,
                    actions::PURCHASE_SUCCESS,
                    format!("product {product_id}, amount {amount}"),
                );
                Ok(AuthorizationOutcome::Authorized {
                    payload: request.payload.clone(),
                    receipt,
                })
            }
            Err(err) => {
                self.emit(
                    &attempt,
                    actions::PURCHASE_ERROR,
                    format!("ledger failed: {err}"),
                );
                Err(AuthorizeError::Ledger(Box::new(err)))
            }
        }
    }

    /// Validates the request shape. On failure returns the audit action and
    /// details for the rejection.
    fn check_structure(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<PurchaseTerms, (&'static str, String)> {
        if request.signature.trim().is_empty() {
            return Err((
                actions::PURCHASE_ATTEMPT_INVALID_DATA,
                "missing signature".into(),
            ));
        }
        if let Err(err) = Signature::from_base64(&request.signature) {
            return Err((
                actions::PURCHASE_ATTEMPT_INVALID_DATA,
                format!("signature is not base64: {err}"),
            ));
        }
        PurchaseTerms::from_payload(&request.payload).map_err(|err| {
            let action = match err {
                TermsError::Timestamp(_) => actions::PURCHASE_ATTEMPT_INVALID_DATA,
                TermsError::ProductId => actions::PURCHASE_ATTEMPT_INVALID_PRODUCT_ID,
                TermsError::Amount => actions::PURCHASE_ATTEMPT_INVALID_AMOUNT,
            };
            (action, err.to_string())
        })
    }

    /// `Ok(None)` covers both a missing record and one that does not parse.
    fn load_key(&self, user_id: &UserId) -> Result<Option<PublicKey>, AuthorizeError> {
        let Some(bytes) = self.keys.public_key(user_id)? else {
            return Ok(None);
        };
        match import_public(&bytes) {
            Ok(public) => Ok(Some(public)),
            Err(err) => {
                tracing::warn!(%user_id, error = %err, "stored public key is unusable");
                Ok(None)
            }
        }
    }

    fn advance(
        &self,
        attempt: &mut Attempt<'_>,
        next: AuthorizationStage,
        action: &str,
        details: String,
    ) {
        debug_assert!(!attempt.stage.is_terminal());
        tracing::debug!(from = %attempt.stage, to = %next, "authorization stage");
        attempt.stage = next;
        self.emit(attempt, action, details);
    }

    fn reject<R>(
        &self,
        attempt: &mut Attempt<'_>,
        reason: RejectionReason,
        action: &str,
        details: String,
    ) -> AuthorizationOutcome<R> {
        tracing::warn!(%reason, stage = %attempt.stage, "purchase rejected");
        self.advance(attempt, AuthorizationStage::Rejected(reason), action, details);
        AuthorizationOutcome::Rejected { reason }
    }

    fn emit(&self, attempt: &Attempt<'_>, action: &str, details: String) {
        let entry = AuditEntry::new(action, details, self.clock.now_ms())
            .with_user(Some(attempt.request.user_id.clone()))
            .with_client_ip(attempt.request.client_ip.clone())
            .with_attempt_id(attempt.attempt_id.clone());
        record_audit(&self.audit, entry);
    }
}
