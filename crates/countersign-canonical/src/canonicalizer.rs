use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::fmt;

use crate::digest::Digest;

/// Default nesting limit for encoded payloads.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Error returned when a payload cannot be canonicalized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CanonicalizationError {
    /// The value does not have the shape the caller requires.
    #[error("invalid payload structure: {0}")]
    InvalidStructure(String),
    /// Non-finite number (NaN/Infinity) detected.
    #[error("non-finite number detected at {0}")]
    NonFiniteNumber(String),
    /// Nesting exceeds the configured depth limit.
    #[error("nesting deeper than {max} levels at {path}")]
    TooDeep {
        /// Location of the first value past the limit.
        path: String,
        /// Configured limit.
        max: usize,
    },
    /// A typed value could not be represented as JSON (e.g. non-string map keys).
    #[error("unsupported value: {0}")]
    Unsupported(String),
    /// A string could not be written.
    #[error("canonical serialization failed: {0}")]
    Serialization(String),
}

/// Largest magnitude below which every integer is exact as an IEEE double.
const MAX_SAFE_INTEGER: u64 = 1 << 53;

/// JSON path used in error messages.
#[derive(Debug, Clone)]
struct Path {
    segments: Vec<String>,
}

impl Path {
    fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    fn push_field(&self, field: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(field.to_string());
        Self { segments }
    }

    fn push_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(format!("[{}]", index));
        Self { segments }
    }

    fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "root")
        } else {
            write!(f, "{}", self.segments.join("."))
        }
    }
}

/// Encoder that turns JSON values into canonical bytes.
///
/// There is deliberately one encoder for both sides of the protocol: the
/// signer and the verifier each call [`Canonicalizer::encode`] on the payload,
/// so they cannot disagree on key order, whitespace or number formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canonicalizer {
    max_depth: usize,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl Canonicalizer {
    /// Creates a canonicalizer that rejects values nested deeper than `max_depth`.
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Returns the configured nesting limit.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Produces the canonical UTF-8 bytes for `value`.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
        self.validate(value, Path::root())?;

        let mut out = Vec::with_capacity(128);
        write_value(&mut out, value)?;
        Ok(out)
    }

    /// Serializes a typed value to JSON and encodes it canonically.
    pub fn encode_serialize<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, CanonicalizationError> {
        let value = serde_json::to_value(value)
            .map_err(|err| CanonicalizationError::Unsupported(err.to_string()))?;
        self.encode(&value)
    }

    /// Domain-separated SHA-256 of the canonical bytes of `value`.
    pub fn digest(&self, domain: &[u8], value: &Value) -> Result<Digest, CanonicalizationError> {
        let bytes = self.encode(value)?;
        Ok(Digest::compute(domain, &[&bytes]))
    }

    fn validate(&self, value: &Value, path: Path) -> Result<(), CanonicalizationError> {
        if path.depth() > self.max_depth {
            return Err(CanonicalizationError::TooDeep {
                path: path.to_string(),
                max: self.max_depth,
            });
        }
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    self.validate(child, path.push_field(key))?;
                }
                Ok(())
            }
            Value::Array(items) => {
                for (idx, item) in items.iter().enumerate() {
                    self.validate(item, path.push_index(idx))?;
                }
                Ok(())
            }
            Value::Number(num) => match num.as_f64() {
                Some(f) if !f.is_finite() => {
                    Err(CanonicalizationError::NonFiniteNumber(path.to_string()))
                }
                _ => Ok(()),
            },
            Value::String(_) | Value::Bool(_) | Value::Null => Ok(()),
        }
    }
}

/// RFC 8785 emitter: members sorted by UTF-16 code units, no whitespace,
/// numbers as ECMAScript `Number.prototype.toString` prints them and
/// strings as raw UTF-8 with only the mandatory escapes.
fn write_value(out: &mut Vec<u8>, value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(num) => out.extend_from_slice(format_number(num)?.as_bytes()),
        Value::String(s) => write_string(out, s)?,
        Value::Array(items) => {
            out.push(b'[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                write_value(out, item)?;
            }
            out.push(b']');
        }
        Value::Object(map) => write_object(out, map)?,
    }
    Ok(())
}

fn write_object(out: &mut Vec<u8>, map: &Map<String, Value>) -> Result<(), CanonicalizationError> {
    let mut members: Vec<(&String, &Value)> = map.iter().collect();
    members.sort_by(|(a, _), (b, _)| utf16_cmp(a, b));
    out.push(b'{');
    for (idx, (key, child)) in members.into_iter().enumerate() {
        if idx > 0 {
            out.push(b',');
        }
        write_string(out, key)?;
        out.push(b':');
        write_value(out, child)?;
    }
    out.push(b'}');
    Ok(())
}

fn utf16_cmp(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

/// serde_json escapes exactly `"`, `\` and C0 controls (short forms where
/// JSON has them, lowercase `\u00xx` otherwise) and leaves the rest as UTF-8.
fn write_string(out: &mut Vec<u8>, s: &str) -> Result<(), CanonicalizationError> {
    serde_json::to_writer(out, s)
        .map_err(|err| CanonicalizationError::Serialization(err.to_string()))
}

fn format_number(num: &Number) -> Result<String, CanonicalizationError> {
    if let Some(n) = num.as_u64() {
        if n <= MAX_SAFE_INTEGER {
            return Ok(n.to_string());
        }
    } else if let Some(n) = num.as_i64() {
        if n.unsigned_abs() <= MAX_SAFE_INTEGER {
            return Ok(n.to_string());
        }
    }
    match num.as_f64() {
        Some(f) if f.is_finite() => Ok(format_es_double(f)),
        _ => Err(CanonicalizationError::NonFiniteNumber(num.to_string())),
    }
}

/// Formats a finite double the way ECMAScript does.
///
/// Rust's `{:e}` yields the shortest digit string that round-trips, which is
/// the digit string ECMAScript picks; only the layout differs.
fn format_es_double(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let sci = format!("{:e}", value.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exponent + 1;

    let mut out = String::with_capacity(digits.len() + 8);
    if value.is_sign_negative() {
        out.push('-');
    }
    if k <= n && n <= 21 {
        out.push_str(&digits);
        out.extend(std::iter::repeat('0').take((n - k) as usize));
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        out.push_str(int);
        out.push('.');
        out.push_str(frac);
    } else if -6 < n && n <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take((-n) as usize));
        out.push_str(&digits);
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        out.push('e');
        out.push(if n - 1 < 0 { '-' } else { '+' });
        out.push_str(&(n - 1).abs().to_string());
    }
    out
}
