use std::sync::OnceLock;

use countersign_canonical::SignablePayload;
use countersign_core::{
    export_public, generate, import_public, open, seal, sign, verify, Algorithm, KdfParams,
    KeyPair, PrivateKey, SealError, Signature,
};
use serde_json::json;

const NOW: i64 = 1_700_000_000_000;

fn rsa_pair() -> &'static KeyPair {
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| generate(Algorithm::Rs256).unwrap())
}

fn pair(algorithm: Algorithm) -> KeyPair {
    match algorithm {
        Algorithm::Es256 => generate(Algorithm::Es256).unwrap(),
        Algorithm::Rs256 => rsa_pair().clone(),
    }
}

fn purchase() -> SignablePayload {
    SignablePayload::from_value(json!({
        "productId": "sku-42",
        "quantity": 2,
        "amount": 199.98,
        "timestamp": NOW,
    }))
    .unwrap()
}

#[test]
fn sign_then_verify_round_trips_for_both_algorithms() {
    for algorithm in [Algorithm::Es256, Algorithm::Rs256] {
        let pair = pair(algorithm);
        let private = PrivateKey::from_jwk(&pair.private).unwrap();
        let public = import_public(&export_public(&pair).unwrap()).unwrap();

        let signature = sign(&private, &purchase()).unwrap();
        assert!(
            verify(&public, &purchase(), &signature.to_base64()).unwrap(),
            "{algorithm} signature should verify"
        );
    }
}

#[test]
fn rsa_signatures_match_modulus_length() {
    let pair = pair(Algorithm::Rs256);
    let private = PrivateKey::from_jwk(&pair.private).unwrap();
    let signature = sign(&private, &purchase()).unwrap();
    assert_eq!(signature.as_bytes().len(), 256);
}

#[test]
fn verification_ignores_field_order() {
    let pair = pair(Algorithm::Es256);
    let private = PrivateKey::from_jwk(&pair.private).unwrap();
    let signature = sign(&private, &purchase()).unwrap();

    let reordered = SignablePayload::new()
        .with_timestamp(NOW)
        .with_number("amount", 199.98)
        .unwrap()
        .with("quantity", 2)
        .with("productId", "sku-42");
    assert!(verify(&private.public_key(), &reordered, &signature.to_base64()).unwrap());
}

#[test]
fn any_flipped_signature_byte_fails() {
    for algorithm in [Algorithm::Es256, Algorithm::Rs256] {
        let pair = pair(algorithm);
        let private = PrivateKey::from_jwk(&pair.private).unwrap();
        let public = private.public_key();
        let signature = sign(&private, &purchase()).unwrap();

        for index in [0, signature.as_bytes().len() / 2, signature.as_bytes().len() - 1] {
            let mut bytes = signature.as_bytes().to_vec();
            bytes[index] ^= 0x01;
            let tampered = Signature::from_bytes(bytes).to_base64();
            assert!(
                !verify(&public, &purchase(), &tampered).unwrap(),
                "{algorithm}: flipping byte {index} must invalidate"
            );
        }
    }
}

#[test]
fn changed_payload_fields_fail() {
    let pair = pair(Algorithm::Es256);
    let private = PrivateKey::from_jwk(&pair.private).unwrap();
    let public = private.public_key();
    let signature = sign(&private, &purchase()).unwrap().to_base64();

    let mutations = [
        ("amount", json!(1.0)),
        ("productId", json!("sku-43")),
        ("quantity", json!(3)),
        ("timestamp", json!(NOW + 1)),
        ("coupon", json!("FREE")),
    ];
    for (field, value) in mutations {
        let mut payload = purchase();
        payload.insert(field, value);
        assert!(
            !verify(&public, &payload, &signature).unwrap(),
            "changing {field} must invalidate"
        );
    }
}

#[test]
fn foreign_key_does_not_verify() {
    let signer = pair(Algorithm::Es256);
    let other = pair(Algorithm::Es256);
    let private = PrivateKey::from_jwk(&signer.private).unwrap();
    let signature = sign(&private, &purchase()).unwrap().to_base64();

    let foreign = import_public(&export_public(&other).unwrap()).unwrap();
    assert!(!verify(&foreign, &purchase(), &signature).unwrap());

    // An ES256 signature checked against an RSA key is simply invalid.
    let rsa = import_public(&export_public(&pair(Algorithm::Rs256)).unwrap()).unwrap();
    assert!(!verify(&rsa, &purchase(), &signature).unwrap());
}

#[test]
fn seal_then_open_restores_the_private_key() {
    let params = KdfParams::insecure_for_tests();
    for algorithm in [Algorithm::Es256, Algorithm::Rs256] {
        let pair = pair(algorithm);
        let sealed = seal(&pair.private, b"s3cret", &params).unwrap();
        assert_eq!(sealed.algorithm, algorithm);
        let opened = open(&sealed, b"s3cret").unwrap();
        assert_eq!(opened, pair.private);
    }
}

#[test]
fn wrong_secret_fails_with_decryption_error() {
    let pair = pair(Algorithm::Es256);
    let sealed = seal(&pair.private, b"right", &KdfParams::insecure_for_tests()).unwrap();
    assert_eq!(open(&sealed, b"wrong").unwrap_err(), SealError::Decryption);
}

#[test]
fn legacy_records_still_open() {
    let pair = pair(Algorithm::Rs256);
    let sealed = seal(&pair.private, b"legacy", &KdfParams::LegacySha256).unwrap();
    assert!(sealed.salt.is_empty());
    assert_eq!(open(&sealed, b"legacy").unwrap(), pair.private);
    assert_eq!(open(&sealed, b"other").unwrap_err(), SealError::Decryption);
}

#[test]
fn opened_key_signs_verifiably() {
    let pair = pair(Algorithm::Es256);
    let sealed = seal(&pair.private, b"pw", &KdfParams::insecure_for_tests()).unwrap();
    let private = PrivateKey::from_jwk(&open(&sealed, b"pw").unwrap()).unwrap();
    let signature = sign(&private, &purchase()).unwrap();

    let public = import_public(&export_public(&pair).unwrap()).unwrap();
    assert!(verify(&public, &purchase(), &signature.to_base64()).unwrap());
}

#[test]
fn rsa_private_jwk_round_trips() {
    let pair = pair(Algorithm::Rs256);
    let key = PrivateKey::from_jwk(&pair.private).unwrap();
    let exported = key.to_jwk();
    assert_eq!(exported.n, pair.private.n);
    assert_eq!(exported.d, pair.private.d);
    assert!(exported.qi.is_some());
    assert_eq!(key.public_key().to_jwk(), pair.public);
}
