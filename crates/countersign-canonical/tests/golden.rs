use countersign_canonical::{
    Canonicalizer, Digest, DigestAlg, PayloadError, SignablePayload, UserId,
};
use serde_json::json;

#[test]
fn digest_serializes_to_golden_json() {
    let digest = Digest {
        alg: DigestAlg::Sha256,
        b64: "Zm9vYmFy".into(),
    };

    assert_eq!(
        serde_json::to_string(&digest).unwrap(),
        r#"{"alg":"sha-256","b64":"Zm9vYmFy"}"#
    );
}

#[test]
fn purchase_payload_has_golden_bytes() {
    let payload = SignablePayload::from_value(json!({
        "timestamp": 1_700_000_000_000i64,
        "productId": "sku-123",
        "quantity": 2,
        "amount": 199.98,
        "currency": "EUR",
    }))
    .unwrap();

    let bytes = payload.canonical_bytes().unwrap();
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        r#"{"amount":199.98,"currency":"EUR","productId":"sku-123","quantity":2,"timestamp":1700000000000}"#
    );
}

#[test]
fn permuted_construction_yields_identical_bytes() {
    let forward = SignablePayload::new()
        .with("orderId", "ord-1")
        .with("amount", 50)
        .with(
            "items",
            json!([{"productId": "a", "quantity": 1, "unitPrice": 20},
                   {"productId": "b", "quantity": 3, "unitPrice": 10}]),
        )
        .with_timestamp(1_700_000_000_000);

    let reversed = SignablePayload::new()
        .with_timestamp(1_700_000_000_000)
        .with(
            "items",
            json!([{"unitPrice": 20, "quantity": 1, "productId": "a"},
                   {"unitPrice": 10, "productId": "b", "quantity": 3}]),
        )
        .with("amount", 50)
        .with("orderId", "ord-1");

    assert_eq!(
        forward.canonical_bytes().unwrap(),
        reversed.canonical_bytes().unwrap()
    );
    assert_eq!(forward.digest().unwrap(), reversed.digest().unwrap());
}

#[test]
fn array_order_is_significant() {
    let a = SignablePayload::new().with("items", json!(["x", "y"]));
    let b = SignablePayload::new().with("items", json!(["y", "x"]));
    assert_ne!(a.canonical_bytes().unwrap(), b.canonical_bytes().unwrap());
}

#[test]
fn non_ascii_strings_stay_utf8() {
    let value = json!({"name": "caf\u{e9}", "a": 1});
    let bytes = Canonicalizer::default().encode(&value).unwrap();
    assert_eq!(bytes, "{\"a\":1,\"name\":\"caf\u{e9}\"}".as_bytes());
}

#[test]
fn integral_floats_encode_like_integers() {
    let int = SignablePayload::new()
        .with("amount", 50)
        .with_timestamp(1_700_000_000_000);
    let float = SignablePayload::new()
        .with("amount", 50.0)
        .with_timestamp(1_700_000_000_000);

    let bytes = int.canonical_bytes().unwrap();
    assert_eq!(bytes, float.canonical_bytes().unwrap());
    assert_eq!(bytes, br#"{"amount":50,"timestamp":1700000000000}"#.to_vec());
    assert_eq!(int.digest().unwrap(), float.digest().unwrap());
}

#[test]
fn canonicalizer_digest_matches_across_orderings() {
    let canonicalizer = Canonicalizer::default();
    let a = canonicalizer
        .digest(b"test\0", &json!({"b": [1, 2], "a": null}))
        .unwrap();
    let b = canonicalizer
        .digest(b"test\0", &json!({"a": null, "b": [1, 2]}))
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn typed_payloads_round_trip_through_serde() {
    #[derive(serde::Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Purchase {
        product_id: String,
        amount: u32,
        timestamp: i64,
    }

    let payload = SignablePayload::from_serialize(&Purchase {
        product_id: "sku-9".into(),
        amount: 10,
        timestamp: 5,
    })
    .unwrap();
    assert_eq!(payload.timestamp_ms().unwrap(), 5);

    let err = SignablePayload::from_serialize(&vec![1, 2]).unwrap_err();
    assert_eq!(err, PayloadError::NotAnObject("array"));
}

#[test]
fn user_id_serializes_as_plain_string() {
    let id = UserId::parse("alice").unwrap();
    assert_eq!(serde_json::to_string(&id).unwrap(), r#""alice""#);
}
