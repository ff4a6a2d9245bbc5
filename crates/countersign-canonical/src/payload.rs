//! The payload that is signed and verified.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::canonicalizer::{CanonicalizationError, Canonicalizer};
use crate::digest::Digest;

/// Name of the mandatory epoch-millisecond field.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Domain separator for payload fingerprints: `b"countersign:payload:v1\0"`.
const PAYLOAD_DOMAIN_SEPARATOR: &[u8] = b"countersign:payload:v1\0";

/// Error raised when a payload has the wrong shape.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// The payload is not a JSON object.
    #[error("payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    /// A required field is absent.
    #[error("payload is missing required field `{0}`")]
    MissingField(String),
    /// A field is present but has the wrong type or range.
    #[error("payload field `{field}` is invalid: {reason}")]
    InvalidField {
        /// Field name.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// The payload could not be canonicalized.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),
}

/// Structured purchase payload covered by a signature.
///
/// Internally an ordered JSON object; insertion order is irrelevant because
/// only [`SignablePayload::canonical_bytes`] is ever signed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignablePayload(Map<String, Value>);

impl SignablePayload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(PayloadError::NotAnObject(json_type_name(&other))),
        }
    }

    /// Serializes a typed value into a payload.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, PayloadError> {
        let value = serde_json::to_value(value)
            .map_err(|err| CanonicalizationError::Unsupported(err.to_string()))?;
        Self::from_value(value)
    }

    /// Sets a field, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder form of [`SignablePayload::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets a floating point field, rejecting NaN and infinities.
    pub fn with_number(self, key: impl Into<String>, value: f64) -> Result<Self, PayloadError> {
        let key = key.into();
        let number = Number::from_f64(value)
            .ok_or_else(|| CanonicalizationError::NonFiniteNumber(key.clone()))?;
        Ok(self.with(key, Value::Number(number)))
    }

    /// Sets the `timestamp` field.
    pub fn with_timestamp(self, timestamp_ms: i64) -> Self {
        self.with(TIMESTAMP_FIELD, timestamp_ms)
    }

    /// Returns a field by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts the payload back into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Reads the mandatory `timestamp` field as epoch milliseconds.
    ///
    /// The value must be a JSON number with no fractional part.
    pub fn timestamp_ms(&self) -> Result<i64, PayloadError> {
        let value = self
            .0
            .get(TIMESTAMP_FIELD)
            .ok_or_else(|| PayloadError::MissingField(TIMESTAMP_FIELD.to_string()))?;
        let invalid = |reason: &str| PayloadError::InvalidField {
            field: TIMESTAMP_FIELD.to_string(),
            reason: reason.to_string(),
        };
        let Value::Number(number) = value else {
            return Err(invalid("expected a number of epoch milliseconds"));
        };
        if let Some(ms) = number.as_i64() {
            return Ok(ms);
        }
        match number.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
            Some(f) if f.is_finite() && f.fract() != 0.0 => {
                Err(invalid("fractional milliseconds are not allowed"))
            }
            _ => Err(invalid("out of range")),
        }
    }

    /// Canonical bytes that signatures are computed over.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CanonicalizationError> {
        self.canonical_bytes_with(&Canonicalizer::default())
    }

    /// Canonical bytes produced by a specific canonicalizer.
    pub fn canonical_bytes_with(
        &self,
        canonicalizer: &Canonicalizer,
    ) -> Result<Vec<u8>, CanonicalizationError> {
        canonicalizer.encode_serialize(&self.0)
    }

    /// Domain-separated fingerprint of the canonical bytes, safe to log.
    pub fn digest(&self) -> Result<Digest, CanonicalizationError> {
        let bytes = self.canonical_bytes()?;
        Ok(Digest::compute(PAYLOAD_DOMAIN_SEPARATOR, &[&bytes]))
    }
}

impl TryFrom<Value> for SignablePayload {
    type Error = PayloadError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<SignablePayload> for Value {
    fn from(payload: SignablePayload) -> Self {
        payload.into_value()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_objects() {
        assert_eq!(
            SignablePayload::from_value(json!([1, 2])).unwrap_err(),
            PayloadError::NotAnObject("array")
        );
        assert!(SignablePayload::from_value(json!("x")).is_err());
    }

    #[test]
    fn timestamp_must_be_present_and_integral() {
        let missing = SignablePayload::new().with("amount", 10);
        assert_eq!(
            missing.timestamp_ms().unwrap_err(),
            PayloadError::MissingField("timestamp".into())
        );

        let text = SignablePayload::new().with("timestamp", "2024-01-01T00:00:00Z");
        assert!(matches!(
            text.timestamp_ms(),
            Err(PayloadError::InvalidField { .. })
        ));

        let fractional = SignablePayload::new().with_number("timestamp", 1.5).unwrap();
        assert!(fractional.timestamp_ms().is_err());

        let ok = SignablePayload::new().with_timestamp(1_700_000_000_000);
        assert_eq!(ok.timestamp_ms().unwrap(), 1_700_000_000_000);

        let float_integral = SignablePayload::new()
            .with_number("timestamp", 1_700_000_000_000.0)
            .unwrap();
        assert_eq!(float_integral.timestamp_ms().unwrap(), 1_700_000_000_000);
    }

    #[test]
    fn with_number_rejects_non_finite() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = SignablePayload::new().with_number("amount", bad).unwrap_err();
            assert!(matches!(
                err,
                PayloadError::Canonicalization(CanonicalizationError::NonFiniteNumber(_))
            ));
        }
    }

    #[test]
    fn digest_ignores_insertion_order() {
        let a = SignablePayload::new().with("a", 1).with("b", 2);
        let b = SignablePayload::new().with("b", 2).with("a", 1);
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());
    }
}
