//! Business fields of a purchase payload.

use countersign_canonical::{PayloadError, SignablePayload};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Payload field naming the product.
pub const PRODUCT_ID_FIELD: &str = "productId";
/// Alternative identifier accepted when `productId` is absent.
pub const ORDER_ID_FIELD: &str = "orderId";
/// Payload field carrying the amount.
pub const AMOUNT_FIELD: &str = "amount";

/// Why a payload does not describe a purchase.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TermsError {
    /// `timestamp` is missing or not integral epoch milliseconds.
    #[error("{0}")]
    Timestamp(String),
    /// Neither identifier field is a non-empty string.
    #[error("productId or orderId must be a non-empty string")]
    ProductId,
    /// `amount` is missing, not a number, or not strictly positive.
    #[error("amount must be a positive number")]
    Amount,
}

impl From<PayloadError> for TermsError {
    fn from(err: PayloadError) -> Self {
        TermsError::Timestamp(err.to_string())
    }
}

/// The fields authorization cares about, extracted from a payload.
///
/// Other payload fields are signed and carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseTerms {
    /// Product or order identifier.
    pub product_id: String,
    /// Positive, finite amount.
    pub amount: f64,
    /// Epoch milliseconds the client signed at.
    pub timestamp: i64,
}

impl PurchaseTerms {
    /// Extracts and validates the purchase fields.
    pub fn from_payload(payload: &SignablePayload) -> Result<Self, TermsError> {
        let timestamp = payload.timestamp_ms()?;
        let product_id = [PRODUCT_ID_FIELD, ORDER_ID_FIELD]
            .iter()
            .find_map(|field| match payload.get(field) {
                Some(Value::String(id)) if !id.trim().is_empty() => Some(id.clone()),
                _ => None,
            })
            .ok_or(TermsError::ProductId)?;
        let amount = payload
            .get(AMOUNT_FIELD)
            .and_then(Value::as_f64)
            .filter(|amount| amount.is_finite() && *amount > 0.0)
            .ok_or(TermsError::Amount)?;
        Ok(Self {
            product_id,
            amount,
            timestamp,
        })
    }
}
