//! Canonicalization and signing invariants across leto-core, leto-crypto,
//! and leto-token: deterministic canonical bytes, proof-independent
//! signing input, and stable token hashes.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rand_core::OsRng;
use serde_json::json;

use leto_core::{sha256_digest, CanonicalBytes, OrchestrationId, TokenId};
use leto_crypto::SigningKey;
use leto_token::{OrchestrationClaims, SignedToken, TokenClaims, TokenKind};

fn sample_claims() -> TokenClaims {
    let iat = Utc.with_ymd_and_hms(2031, 3, 14, 9, 0, 0).unwrap();
    TokenClaims {
        token_id: TokenId::new(),
        issuer: "registry.example.com".to_string(),
        subject: "carrier.example.com".to_string(),
        audience: vec!["booking.example.com".to_string()],
        issued_at: iat,
        not_before: iat,
        expires_at: iat + chrono::Duration::hours(1),
        kind: TokenKind::Orchestration,
        assurance: None,
        orchestration: Some(OrchestrationClaims {
            orchestration_id: OrchestrationId::new(),
            role: Some("Carrier".to_string()),
        }),
    }
}

#[test]
fn signed_token_survives_json_round_trips() {
    let sk = SigningKey::generate(&mut OsRng);
    let vk = sk.verifying_key();
    let token = SignedToken::sign(
        sample_claims(),
        &sk,
        "registry.example.com#key-1".to_string(),
        Utc::now(),
    )
    .unwrap();

    // Two encode/decode cycles; the signature stays verifiable and the
    // hash stays identical.
    let wire1 = token.encode().unwrap();
    let decoded1 = SignedToken::decode(&wire1).unwrap();
    let wire2 = decoded1.encode().unwrap();
    let decoded2 = SignedToken::decode(&wire2).unwrap();

    decoded2.verify_signature(&vk).unwrap();
    assert_eq!(
        token.token_hash().unwrap(),
        decoded2.token_hash().unwrap()
    );
}

#[test]
fn token_hash_is_not_the_token() {
    let sk = SigningKey::generate(&mut OsRng);
    let token = SignedToken::sign(
        sample_claims(),
        &sk,
        "registry.example.com#key-1".to_string(),
        Utc::now(),
    )
    .unwrap();

    let wire = token.encode().unwrap();
    let hash = token.token_hash().unwrap().to_hex();
    assert_eq!(hash.len(), 64);
    assert!(!wire.contains(&hash));
}

#[test]
fn claims_with_float_metadata_cannot_be_canonicalized() {
    // Floats are rejected at the canonicalization boundary; anything the
    // claims structs cannot represent as integers or strings never
    // becomes a signing input.
    let result = CanonicalBytes::from_value(json!({"weight_tons": 12.5}));
    assert!(result.is_err());
}

proptest! {
    #[test]
    fn canonical_digest_is_order_insensitive(
        pairs in proptest::collection::vec(("[a-z]{1,10}", "[ -~]{0,20}"), 1..10)
    ) {
        let mut forward = serde_json::Map::new();
        for (k, v) in &pairs {
            forward.insert(k.clone(), json!(v));
        }
        let mut reversed = serde_json::Map::new();
        for (k, v) in pairs.iter().rev() {
            reversed.insert(k.clone(), json!(v));
        }

        let c1 = CanonicalBytes::from_value(serde_json::Value::Object(forward)).unwrap();
        let c2 = CanonicalBytes::from_value(serde_json::Value::Object(reversed)).unwrap();
        prop_assert_eq!(sha256_digest(&c1), sha256_digest(&c2));
    }

    #[test]
    fn signatures_verify_for_arbitrary_subjects(subject in "[a-z0-9-]{1,20}\\.example\\.com") {
        let sk = SigningKey::generate(&mut OsRng);
        let vk = sk.verifying_key();

        let mut claims = sample_claims();
        claims.subject = subject;
        let token = SignedToken::sign(
            claims,
            &sk,
            "registry.example.com#key-1".to_string(),
            Utc::now(),
        )
        .unwrap();

        prop_assert!(token.verify_signature(&vk).is_ok());
    }
}
