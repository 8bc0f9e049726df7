//! # Signed Token Envelope
//!
//! A token on the wire is a compact JSON document: the claims body plus a
//! `proof` object. Signing canonicalizes the claims via
//! [`CanonicalBytes`], computes an Ed25519 signature, and attaches the
//! proof; verification recomputes the canonical claims and checks the
//! signature. The `proof` field never participates in the signing input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use leto_core::{sha256_digest, CanonicalBytes, ContentDigest};
use leto_crypto::{Ed25519Signature, SigningKey, VerifyingKey};

use crate::claims::TokenClaims;
use crate::error::TokenError;

/// Proof type identifier for the current signature scheme.
pub const PROOF_TYPE_ED25519: &str = "Ed25519Signature2020";

/// The cryptographic proof attached to a signed token.
///
/// Rigid structure — unexpected fields are rejected at deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenProof {
    /// Signature scheme identifier.
    #[serde(rename = "type")]
    pub proof_type: String,

    /// When the proof was created (UTC).
    pub created: DateTime<Utc>,

    /// Identifier of the signing key, e.g. `registry.example.com#key-1`.
    #[serde(rename = "verificationMethod")]
    pub verification_method: String,

    /// Hex-encoded Ed25519 signature (128 hex characters).
    #[serde(rename = "proofValue")]
    pub proof_value: String,
}

/// A signed claims token: claims body plus proof.
///
/// The wire form nests the two sections explicitly — the signing input
/// is the canonical bytes of `claims` alone, so the boundary between
/// signed and unsigned content is structural, not positional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignedToken {
    pub claims: TokenClaims,
    pub proof: TokenProof,
}

impl SignedToken {
    /// Sign a claims body, producing the complete token.
    pub fn sign(
        claims: TokenClaims,
        signing_key: &SigningKey,
        verification_method: String,
        created: DateTime<Utc>,
    ) -> Result<Self, TokenError> {
        let canonical = signing_input(&claims)?;
        let signature = signing_key.sign(&canonical);
        Ok(Self {
            claims,
            proof: TokenProof {
                proof_type: PROOF_TYPE_ED25519.to_string(),
                created,
                verification_method,
                proof_value: signature.to_hex(),
            },
        })
    }

    /// Verify the proof against the issuer's verifying key.
    pub fn verify_signature(&self, verifying_key: &VerifyingKey) -> Result<(), TokenError> {
        if self.proof.proof_type != PROOF_TYPE_ED25519 {
            return Err(TokenError::SignatureInvalid(format!(
                "unsupported proof type: {}",
                self.proof.proof_type
            )));
        }
        let canonical = signing_input(&self.claims)?;
        let signature = Ed25519Signature::from_hex(&self.proof.proof_value)
            .map_err(|e| TokenError::SignatureInvalid(e.to_string()))?;
        verifying_key
            .verify(&canonical, &signature)
            .map_err(|e| TokenError::SignatureInvalid(e.to_string()))
    }

    /// Encode as the opaque wire string (compact JSON).
    pub fn encode(&self) -> Result<String, TokenError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a presented wire string. Any parse failure is `Malformed`.
    pub fn decode(raw: &str) -> Result<Self, TokenError> {
        serde_json::from_str(raw).map_err(|e| TokenError::Malformed(e.to_string()))
    }

    /// SHA-256 hash of the full signed token (claims and proof), in
    /// canonical form. This — not the token itself — is what issuance
    /// records persist.
    pub fn token_hash(&self) -> Result<ContentDigest, TokenError> {
        let canonical = CanonicalBytes::new(self)?;
        Ok(sha256_digest(&canonical))
    }
}

/// The canonical signing input: the claims body alone.
fn signing_input(claims: &TokenClaims) -> Result<CanonicalBytes, TokenError> {
    Ok(CanonicalBytes::new(claims)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand_core::OsRng;

    use leto_core::{OrchestrationId, TokenId};
    use leto_trust::Tier;

    use crate::claims::{AssuranceClaims, OrchestrationClaims, TokenKind};

    fn sample_claims(kind: TokenKind) -> TokenClaims {
        let iat = Utc.with_ymd_and_hms(2031, 3, 14, 9, 0, 0).unwrap();
        TokenClaims {
            token_id: TokenId::new(),
            issuer: "registry.example.com".to_string(),
            subject: "carrier.example.com".to_string(),
            audience: vec!["booking.example.com".to_string()],
            issued_at: iat,
            not_before: iat,
            expires_at: iat + chrono::Duration::hours(1),
            kind,
            assurance: matches!(kind, TokenKind::Assurance).then(|| AssuranceClaims {
                tier: Tier::Tier2,
                verification_method: Some("dns_txt".to_string()),
                verified_at: Some(iat - chrono::Duration::days(3)),
            }),
            orchestration: matches!(kind, TokenKind::Orchestration).then(|| {
                OrchestrationClaims {
                    orchestration_id: OrchestrationId::new(),
                    role: Some("Carrier".to_string()),
                }
            }),
        }
    }

    fn signed(kind: TokenKind) -> (SignedToken, VerifyingKey) {
        let sk = SigningKey::generate(&mut OsRng);
        let vk = sk.verifying_key();
        let token = SignedToken::sign(
            sample_claims(kind),
            &sk,
            "registry.example.com#key-1".to_string(),
            Utc::now(),
        )
        .unwrap();
        (token, vk)
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let (token, vk) = signed(TokenKind::Orchestration);
        token.verify_signature(&vk).unwrap();
    }

    #[test]
    fn verification_fails_with_wrong_key() {
        let (token, _) = signed(TokenKind::Assurance);
        let other = SigningKey::generate(&mut OsRng).verifying_key();
        assert!(token.verify_signature(&other).is_err());
    }

    #[test]
    fn verification_fails_after_claims_tampering() {
        let (mut token, vk) = signed(TokenKind::Orchestration);
        token.claims.subject = "impostor.example.com".to_string();
        assert!(matches!(
            token.verify_signature(&vk),
            Err(TokenError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn unsupported_proof_type_rejected() {
        let (mut token, vk) = signed(TokenKind::Orchestration);
        token.proof.proof_type = "RsaSignature2018".to_string();
        assert!(matches!(
            token.verify_signature(&vk),
            Err(TokenError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn encode_decode_roundtrip() {
        let (token, vk) = signed(TokenKind::Orchestration);
        let wire = token.encode().unwrap();
        let decoded = SignedToken::decode(&wire).unwrap();
        assert_eq!(decoded, token);
        decoded.verify_signature(&vk).unwrap();
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            SignedToken::decode("not json at all"),
            Err(TokenError::Malformed(_))
        ));
        assert!(matches!(
            SignedToken::decode(r#"{"jti": "missing-everything"}"#),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn wire_form_nests_claims_and_proof() {
        let (token, _) = signed(TokenKind::Assurance);
        let value: serde_json::Value = serde_json::from_str(&token.encode().unwrap()).unwrap();
        assert!(value["claims"].get("jti").is_some());
        assert!(value["proof"].get("proofValue").is_some());
        assert!(value.get("jti").is_none());
    }

    #[test]
    fn token_hash_is_stable_and_proof_sensitive() {
        let (token, _) = signed(TokenKind::Orchestration);
        let h1 = token.token_hash().unwrap();
        let h2 = token.token_hash().unwrap();
        assert_eq!(h1, h2);

        // The hash covers the proof too: a re-signed token hashes
        // differently even with identical claims.
        let sk = SigningKey::generate(&mut OsRng);
        let resigned = SignedToken::sign(
            token.claims.clone(),
            &sk,
            "registry.example.com#key-2".to_string(),
            Utc::now(),
        )
        .unwrap();
        assert_ne!(h1, resigned.token_hash().unwrap());
    }

    #[test]
    fn proof_does_not_affect_signing_input() {
        let claims = sample_claims(TokenKind::Orchestration);
        let i1 = signing_input(&claims).unwrap();
        let i2 = signing_input(&claims).unwrap();
        assert_eq!(i1.as_bytes(), i2.as_bytes());
    }
}
