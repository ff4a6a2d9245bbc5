//! Key pair generation and JWK interchange.
//!
//! Two algorithms are supported and dispatched on the JWK `alg` member:
//! ECDSA over P-256 (`ES256`) and RSASSA-PKCS1-v1_5 with 2048-bit keys
//! (`RS256`), both over SHA-256. JWK members are base64url without padding.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use countersign_canonical::{Canonicalizer, Digest, KeyId};
use p256::ecdsa::{SigningKey as EcSigningKey, VerifyingKey as EcVerifyingKey};
use p256::{EncodedPoint, FieldBytes};
use rand::rngs::OsRng;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use serde_json::json;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::errors::KeyError;

/// Modulus size of generated RSA keys.
pub const RSA_KEY_BITS: usize = 2048;

/// Imported RSA keys smaller than this (in bytes) are refused.
const RSA_MIN_MODULUS_BYTES: usize = RSA_KEY_BITS / 8;

const P256_COORDINATE_LEN: usize = 32;

/// Signature algorithm of a key pair.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// ECDSA on P-256 with SHA-256, signatures in IEEE P1363 `r || s` form.
    #[default]
    #[serde(rename = "ES256")]
    Es256,
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    #[serde(rename = "RS256")]
    Rs256,
}

impl Algorithm {
    /// JOSE algorithm name.
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Es256 => "ES256",
            Algorithm::Rs256 => "RS256",
        }
    }

    /// JWK key type that carries this algorithm.
    pub fn kty(self) -> &'static str {
        match self {
            Algorithm::Es256 => "EC",
            Algorithm::Rs256 => "RSA",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ES256") {
            Ok(Algorithm::Es256)
        } else if s.eq_ignore_ascii_case("RS256") {
            Ok(Algorithm::Rs256)
        } else {
            Err(KeyError::UnsupportedAlgorithm(s.to_string()))
        }
    }
}

/// Resolves the algorithm of a JWK from `kty` and the optional `alg` member.
fn jwk_algorithm(kty: &str, alg: Option<&str>) -> Result<Algorithm, KeyError> {
    let by_kty = match kty {
        "EC" => Algorithm::Es256,
        "RSA" => Algorithm::Rs256,
        other => return Err(KeyError::UnsupportedAlgorithm(format!("kty {other}"))),
    };
    match alg {
        None => Ok(by_kty),
        Some(alg) => {
            let declared: Algorithm = alg.parse()?;
            if declared != by_kty {
                return Err(KeyError::Malformed(format!(
                    "alg {declared} does not match kty {kty}"
                )));
            }
            Ok(declared)
        }
    }
}

fn encode_member(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn decode_member(name: &str, value: Option<&String>) -> Result<Zeroizing<Vec<u8>>, KeyError> {
    let value = value.ok_or_else(|| KeyError::Malformed(format!("missing member `{name}`")))?;
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map(Zeroizing::new)
        .map_err(|err| KeyError::Malformed(format!("member `{name}` is not base64url: {err}")))
}

fn decode_coordinate(name: &str, value: Option<&String>) -> Result<Zeroizing<Vec<u8>>, KeyError> {
    let bytes = decode_member(name, value)?;
    if bytes.len() != P256_COORDINATE_LEN {
        return Err(KeyError::Malformed(format!(
            "member `{name}` must be {P256_COORDINATE_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

fn check_curve(kty: &str, crv: Option<&str>) -> Result<(), KeyError> {
    if kty != "EC" {
        return Err(KeyError::Malformed(format!("expected kty EC, got {kty}")));
    }
    match crv {
        Some("P-256") => Ok(()),
        Some(other) => Err(KeyError::Malformed(format!("unsupported curve {other}"))),
        None => Err(KeyError::Malformed("missing member `crv`".into())),
    }
}

/// Public half of a key pair in JWK form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicJwk {
    /// Key type: `EC` or `RSA`.
    pub kty: String,
    /// Curve name (EC only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// Affine x coordinate (EC only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// Affine y coordinate (EC only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// Modulus (RSA only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// Public exponent (RSA only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    /// Algorithm tag the verifier dispatches on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
}

impl PublicJwk {
    /// Algorithm implied by `kty` and `alg`.
    pub fn algorithm(&self) -> Result<Algorithm, KeyError> {
        jwk_algorithm(&self.kty, self.alg.as_deref())
    }

    /// Serializes the JWK to JSON bytes.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, KeyError> {
        serde_json::to_vec(self).map_err(|err| KeyError::Serialization(err.to_string()))
    }

    /// Parses JWK JSON bytes. Unknown members such as `ext` are ignored.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        serde_json::from_slice(bytes).map_err(|err| KeyError::Malformed(err.to_string()))
    }
}

/// Private half of a key pair in JWK form.
///
/// Every member is wiped on drop and the `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct PrivateJwk {
    /// Key type: `EC` or `RSA`.
    pub kty: String,
    /// Curve name (EC only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// Affine x coordinate (EC only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// Affine y coordinate (EC only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// Modulus (RSA only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// Public exponent (RSA only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    /// Private scalar (EC) or private exponent (RSA).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    /// First prime factor (RSA only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    /// Second prime factor (RSA only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    /// `d mod (p - 1)` (RSA only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    /// `d mod (q - 1)` (RSA only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    /// `q^-1 mod p` (RSA only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
    /// Algorithm tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
}

impl PrivateJwk {
    /// Algorithm implied by `kty` and `alg`.
    pub fn algorithm(&self) -> Result<Algorithm, KeyError> {
        jwk_algorithm(&self.kty, self.alg.as_deref())
    }

    /// The public members of this key.
    pub fn public(&self) -> PublicJwk {
        PublicJwk {
            kty: self.kty.clone(),
            crv: self.crv.clone(),
            x: self.x.clone(),
            y: self.y.clone(),
            n: self.n.clone(),
            e: self.e.clone(),
            alg: self.alg.clone(),
        }
    }

    /// Serializes the JWK into a buffer that is wiped on drop.
    pub fn to_json_bytes(&self) -> Result<Zeroizing<Vec<u8>>, KeyError> {
        serde_json::to_vec(self)
            .map(Zeroizing::new)
            .map_err(|err| KeyError::Serialization(err.to_string()))
    }

    /// Parses JWK JSON bytes.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        // serde_json errors may quote input, so do not forward them.
        serde_json::from_slice(bytes)
            .map_err(|_| KeyError::Malformed("private key is not a valid JWK".into()))
    }
}

impl fmt::Debug for PrivateJwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateJwk")
            .field("kty", &self.kty)
            .field("alg", &self.alg)
            .finish_non_exhaustive()
    }
}

/// A usable verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// P-256 verifying key.
    Es256(EcVerifyingKey),
    /// RSA public key.
    Rs256(RsaPublicKey),
}

impl PublicKey {
    /// Imports a JWK, validating the curve point or RSA parameters.
    pub fn from_jwk(jwk: &PublicJwk) -> Result<Self, KeyError> {
        match jwk.algorithm()? {
            Algorithm::Es256 => {
                check_curve(&jwk.kty, jwk.crv.as_deref())?;
                let x = decode_coordinate("x", jwk.x.as_ref())?;
                let y = decode_coordinate("y", jwk.y.as_ref())?;
                let point = EncodedPoint::from_affine_coordinates(
                    FieldBytes::from_slice(&x),
                    FieldBytes::from_slice(&y),
                    false,
                );
                EcVerifyingKey::from_encoded_point(&point)
                    .map(PublicKey::Es256)
                    .map_err(|_| KeyError::Malformed("point is not on curve P-256".into()))
            }
            Algorithm::Rs256 => {
                let n = decode_member("n", jwk.n.as_ref())?;
                let e = decode_member("e", jwk.e.as_ref())?;
                let key = RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e))
                    .map_err(|err| KeyError::Malformed(format!("invalid RSA key: {err}")))?;
                if key.size() < RSA_MIN_MODULUS_BYTES {
                    return Err(KeyError::Malformed(format!(
                        "RSA modulus is {} bits, at least {RSA_KEY_BITS} required",
                        key.size() * 8
                    )));
                }
                Ok(PublicKey::Rs256(key))
            }
        }
    }

    /// Exports the key as a JWK carrying its `alg` tag.
    pub fn to_jwk(&self) -> PublicJwk {
        match self {
            PublicKey::Es256(key) => {
                let point = key.to_encoded_point(false);
                PublicJwk {
                    kty: "EC".into(),
                    crv: Some("P-256".into()),
                    x: point.x().map(|c| encode_member(c)),
                    y: point.y().map(|c| encode_member(c)),
                    n: None,
                    e: None,
                    alg: Some(Algorithm::Es256.as_str().into()),
                }
            }
            PublicKey::Rs256(key) => PublicJwk {
                kty: "RSA".into(),
                crv: None,
                x: None,
                y: None,
                n: Some(encode_member(&key.n().to_bytes_be())),
                e: Some(encode_member(&key.e().to_bytes_be())),
                alg: Some(Algorithm::Rs256.as_str().into()),
            },
        }
    }

    /// The algorithm this key verifies.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            PublicKey::Es256(_) => Algorithm::Es256,
            PublicKey::Rs256(_) => Algorithm::Rs256,
        }
    }

    /// RFC 7638 thumbprint, used to refer to keys in logs.
    pub fn thumbprint(&self) -> Result<KeyId, KeyError> {
        let jwk = self.to_jwk();
        // Only the required members, in lexicographic order via JCS.
        let members = match self {
            PublicKey::Es256(_) => json!({"crv": jwk.crv, "kty": jwk.kty, "x": jwk.x, "y": jwk.y}),
            PublicKey::Rs256(_) => json!({"e": jwk.e, "kty": jwk.kty, "n": jwk.n}),
        };
        let bytes = Canonicalizer::default()
            .encode(&members)
            .map_err(|err| KeyError::Serialization(err.to_string()))?;
        let digest = Digest::compute(b"", &[&bytes]);
        KeyId::parse(digest.b64).map_err(|err| KeyError::Serialization(err.to_string()))
    }
}

/// A usable signing key. Key material is zeroized when dropped.
#[derive(Clone)]
pub enum PrivateKey {
    /// P-256 signing key.
    Es256(EcSigningKey),
    /// RSA private key.
    Rs256(RsaPrivateKey),
}

impl PrivateKey {
    /// Imports a private JWK, checking it is internally consistent.
    pub fn from_jwk(jwk: &PrivateJwk) -> Result<Self, KeyError> {
        match jwk.algorithm()? {
            Algorithm::Es256 => {
                check_curve(&jwk.kty, jwk.crv.as_deref())?;
                let d = decode_coordinate("d", jwk.d.as_ref())?;
                let key = EcSigningKey::from_slice(&d)
                    .map_err(|_| KeyError::Malformed("invalid P-256 private scalar".into()))?;
                let derived = PublicKey::Es256(EcVerifyingKey::from(&key)).to_jwk();
                let x_matches = jwk.x.is_none() || jwk.x == derived.x;
                let y_matches = jwk.y.is_none() || jwk.y == derived.y;
                if !x_matches || !y_matches {
                    return Err(KeyError::Malformed(
                        "public coordinates do not match private scalar".into(),
                    ));
                }
                Ok(PrivateKey::Es256(key))
            }
            Algorithm::Rs256 => {
                let n = decode_member("n", jwk.n.as_ref())?;
                let e = decode_member("e", jwk.e.as_ref())?;
                let d = decode_member("d", jwk.d.as_ref())?;
                let p = decode_member("p", jwk.p.as_ref())?;
                let q = decode_member("q", jwk.q.as_ref())?;
                let mut key = RsaPrivateKey::from_components(
                    BigUint::from_bytes_be(&n),
                    BigUint::from_bytes_be(&e),
                    BigUint::from_bytes_be(&d),
                    vec![BigUint::from_bytes_be(&p), BigUint::from_bytes_be(&q)],
                )
                .map_err(|err| KeyError::Malformed(format!("invalid RSA key: {err}")))?;
                key.validate()
                    .map_err(|err| KeyError::Malformed(format!("invalid RSA key: {err}")))?;
                key.precompute()
                    .map_err(|err| KeyError::Malformed(format!("invalid RSA key: {err}")))?;
                if key.size() < RSA_MIN_MODULUS_BYTES {
                    return Err(KeyError::Malformed(format!(
                        "RSA modulus is {} bits, at least {RSA_KEY_BITS} required",
                        key.size() * 8
                    )));
                }
                Ok(PrivateKey::Rs256(key))
            }
        }
    }

    /// Exports the key as a private JWK.
    pub fn to_jwk(&self) -> PrivateJwk {
        let public = self.public_key().to_jwk();
        match self {
            PrivateKey::Es256(key) => {
                let mut scalar = key.to_bytes();
                let d = encode_member(&scalar);
                scalar.as_mut_slice().zeroize();
                PrivateJwk {
                    kty: public.kty.clone(),
                    crv: public.crv.clone(),
                    x: public.x.clone(),
                    y: public.y.clone(),
                    n: None,
                    e: None,
                    d: Some(d),
                    p: None,
                    q: None,
                    dp: None,
                    dq: None,
                    qi: None,
                    alg: public.alg.clone(),
                }
            }
            PrivateKey::Rs256(key) => {
                let big = |v: &BigUint| encode_member(&Zeroizing::new(v.to_bytes_be()));
                let primes = key.primes();
                PrivateJwk {
                    kty: public.kty.clone(),
                    crv: None,
                    x: None,
                    y: None,
                    n: public.n.clone(),
                    e: public.e.clone(),
                    d: Some(big(key.d())),
                    p: primes.first().map(big),
                    q: primes.get(1).map(big),
                    dp: key.dp().map(big),
                    dq: key.dq().map(big),
                    qi: key
                        .qinv()
                        .map(|v| encode_member(&Zeroizing::new(v.to_bytes_be().1))),
                    alg: public.alg.clone(),
                }
            }
        }
    }

    /// The matching public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Es256(key) => PublicKey::Es256(EcVerifyingKey::from(key)),
            PrivateKey::Rs256(key) => PublicKey::Rs256(key.to_public_key()),
        }
    }

    /// The algorithm this key signs with.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            PrivateKey::Es256(_) => Algorithm::Es256,
            PrivateKey::Rs256(_) => Algorithm::Rs256,
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey::{:?}([REDACTED])", self.algorithm())
    }
}

/// A freshly generated key pair, both halves in JWK form.
#[derive(Debug, Clone)]
pub struct KeyPair {
    /// Signature algorithm.
    pub algorithm: Algorithm,
    /// Public JWK, safe to persist in plaintext.
    pub public: PublicJwk,
    /// Private JWK, to be sealed before it is persisted.
    pub private: PrivateJwk,
}

/// Generates a key pair from the OS random generator.
pub fn generate(algorithm: Algorithm) -> Result<KeyPair, KeyError> {
    let private = match algorithm {
        Algorithm::Es256 => PrivateKey::Es256(EcSigningKey::random(&mut OsRng)),
        Algorithm::Rs256 => PrivateKey::Rs256(
            RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
                .map_err(|err| KeyError::Generation(err.to_string()))?,
        ),
    };
    let private = private.to_jwk();
    tracing::debug!(algorithm = %algorithm, "generated key pair");
    Ok(KeyPair {
        algorithm,
        public: private.public(),
        private,
    })
}

/// Exports the public half of a key pair as JWK JSON bytes.
pub fn export_public(pair: &KeyPair) -> Result<Vec<u8>, KeyError> {
    pair.public.to_json_bytes()
}

/// Imports a public key from JWK JSON bytes.
pub fn import_public(bytes: &[u8]) -> Result<PublicKey, KeyError> {
    PublicKey::from_jwk(&PublicJwk::from_json_bytes(bytes)?)
}
