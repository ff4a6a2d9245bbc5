//! Where authorized purchases are committed.

use std::sync::{Arc, Mutex};

use countersign_canonical::{Digest, SignablePayload, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::purchase::PurchaseTerms;

/// A purchase whose signature and timestamp have been verified.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizedPurchase {
    /// Buyer.
    pub user_id: UserId,
    /// Extracted business fields.
    pub terms: PurchaseTerms,
    /// The payload as signed.
    pub payload: SignablePayload,
    /// Fingerprint of the canonical payload.
    pub payload_digest: Digest,
}

/// Sink for verified purchases.
///
/// The orchestrator calls [`PurchaseLedger::commit`] only after every check
/// has passed. An error here surfaces as
/// [`AuthorizeError::Ledger`](crate::AuthorizeError::Ledger).
pub trait PurchaseLedger: Send + Sync {
    /// What the caller gets back for a committed purchase.
    type Receipt;
    /// Commit failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Records the purchase.
    fn commit(&self, purchase: AuthorizedPurchase) -> Result<Self::Receipt, Self::Error>;
}

impl<T: PurchaseLedger + ?Sized> PurchaseLedger for &T {
    type Receipt = T::Receipt;
    type Error = T::Error;

    fn commit(&self, purchase: AuthorizedPurchase) -> Result<Self::Receipt, Self::Error> {
        (**self).commit(purchase)
    }
}

impl<T: PurchaseLedger + ?Sized> PurchaseLedger for Arc<T> {
    type Receipt = T::Receipt;
    type Error = T::Error;

    fn commit(&self, purchase: AuthorizedPurchase) -> Result<Self::Receipt, Self::Error> {
        (**self).commit(purchase)
    }
}

/// Receipt issued by [`RecordingLedger`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    /// Position in the ledger, starting at 1.
    pub purchase_id: u64,
    /// Fingerprint of the payload that was authorized.
    pub payload_digest: Digest,
}

/// Failure from [`RecordingLedger`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("ledger unavailable: {0}")]
pub struct LedgerError(pub String);

/// In-memory ledger keeping every committed purchase.
#[derive(Debug, Default)]
pub struct RecordingLedger {
    purchases: Mutex<Vec<AuthorizedPurchase>>,
    refuse: bool,
}

impl RecordingLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger that fails every commit.
    pub fn unavailable() -> Self {
        Self {
            purchases: Mutex::default(),
            refuse: true,
        }
    }

    /// Committed purchases in order.
    pub fn purchases(&self) -> Vec<AuthorizedPurchase> {
        self.purchases
            .lock()
            .map(|purchases| purchases.clone())
            .unwrap_or_default()
    }
}

impl PurchaseLedger for RecordingLedger {
    type Receipt = PurchaseReceipt;
    type Error = LedgerError;

    fn commit(&self, purchase: AuthorizedPurchase) -> Result<PurchaseReceipt, LedgerError> {
        if self.refuse {
            return Err(LedgerError("ledger refuses commits".into()));
        }
        let mut purchases = self
            .purchases
            .lock()
            .map_err(|_| LedgerError("lock poisoned".into()))?;
        let payload_digest = purchase.payload_digest.clone();
        purchases.push(purchase);
        Ok(PurchaseReceipt {
            purchase_id: purchases.len() as u64,
            payload_digest,
        })
    }
}
