//! Purchase authorization services for Countersign.
//!
//! [`Authorizer`] decides signed purchase requests, [`Provisioner`] issues
//! and revokes user key pairs, and [`SigningService`] signs on behalf of
//! users whose private keys are sealed in the store. All three take their
//! key store, audit sink and clock as explicit handles.
#![deny(missing_docs)]

use countersign_core::AuditEntry;
use countersign_store::AuditSink;

/// TOML configuration.
pub mod config;
/// Error types.
pub mod errors;
/// Purchase ledger trait and an in-memory ledger.
pub mod ledger;
/// The authorization state machine.
pub mod orchestrator;
/// Outcome and rejection types.
pub mod outcome;
/// Key provisioning.
pub mod provisioning;
/// Purchase field extraction.
pub mod purchase;
/// Server-side signing.
pub mod signing;

pub use config::{AuthzConfig, ConfigError, KdfConfig, KeysConfig};
pub use errors::{AuthorizeError, LedgerFailure, ProvisionError, SigningError};
pub use ledger::{AuthorizedPurchase, LedgerError, PurchaseLedger, PurchaseReceipt, RecordingLedger};
pub use orchestrator::{AuthorizationRequest, Authorizer};
pub use outcome::{AuthorizationOutcome, AuthorizationStage, RejectionReason};
pub use provisioning::{provision_keys, ProvisionedKeys, Provisioner};
pub use purchase::{PurchaseTerms, TermsError};
pub use signing::SigningService;

/// Audit failures are logged and never change the result of the operation
/// being audited.
pub(crate) fn record_audit<A: AuditSink + ?Sized>(sink: &A, entry: AuditEntry) {
    let action = entry.action.clone();
    if let Err(err) = sink.record(entry) {
        tracing::error!(%action, error = %err, "failed to record audit entry");
    }
}
