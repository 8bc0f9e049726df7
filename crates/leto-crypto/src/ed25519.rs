//! # Ed25519 Signing and Verification
//!
//! Thin wrappers around `ed25519-dalek` keeping two workspace invariants:
//!
//! - [`SigningKey::sign`] and [`VerifyingKey::verify`] accept only
//!   [`CanonicalBytes`] — a signature always covers canonicalized data.
//! - Signatures and public keys travel as lowercase hex strings; length
//!   and decoding errors surface as [`CryptoError`], never panics.

use ed25519_dalek::{Signer, Verifier};
use rand_core::CryptoRngCore;

use leto_core::CanonicalBytes;

use crate::error::CryptoError;

/// An Ed25519 signing key (32 bytes of secret material).
///
/// The `Debug` impl redacts the secret; the underlying dalek key zeroizes
/// on drop.
#[derive(Clone)]
pub struct SigningKey(ed25519_dalek::SigningKey);

impl SigningKey {
    /// Generate a fresh random key.
    pub fn generate<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Self {
        Self(ed25519_dalek::SigningKey::generate(rng))
    }

    /// Load a key from 64 hex characters of secret material.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = decode_hex(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| CryptoError::InvalidSecretKey(format!(
                "expected 32 bytes, got {}",
                v.len()
            )))?;
        Ok(Self(ed25519_dalek::SigningKey::from_bytes(&arr)))
    }

    /// Export the secret material as lowercase hex.
    ///
    /// Only for writing to a key store or environment configuration —
    /// never log the result.
    pub fn to_hex(&self) -> String {
        encode_hex(&self.0.to_bytes())
    }

    /// Derive the corresponding verifying (public) key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key())
    }

    /// Sign canonical bytes.
    pub fn sign(&self, data: &CanonicalBytes) -> Ed25519Signature {
        Ed25519Signature(self.0.sign(data.as_bytes()))
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("verifying_key", &self.verifying_key().to_hex())
            .finish_non_exhaustive()
    }
}

/// An Ed25519 verifying (public) key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

impl VerifyingKey {
    /// Load a public key from 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = decode_hex(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| CryptoError::InvalidPublicKey(format!(
                "expected 32 bytes, got {}",
                v.len()
            )))?;
        let key = ed25519_dalek::VerifyingKey::from_bytes(&arr)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Ok(Self(key))
    }

    /// Export the public key as lowercase hex.
    pub fn to_hex(&self) -> String {
        encode_hex(self.0.as_bytes())
    }

    /// Verify a signature over canonical bytes.
    pub fn verify(
        &self,
        data: &CanonicalBytes,
        signature: &Ed25519Signature,
    ) -> Result<(), CryptoError> {
        self.0
            .verify(data.as_bytes(), &signature.0)
            .map_err(|e| CryptoError::VerificationFailed(e.to_string()))
    }
}

/// A detached Ed25519 signature (64 bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ed25519Signature(ed25519_dalek::Signature);

impl Ed25519Signature {
    /// Encode the signature as 128 lowercase hex characters.
    pub fn to_hex(&self) -> String {
        encode_hex(&self.0.to_bytes())
    }

    /// Decode a signature from 128 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = decode_hex(s)?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| CryptoError::InvalidSignatureLength(v.len()))?;
        Ok(Self(ed25519_dalek::Signature::from_bytes(&arr)))
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn decode_hex(s: &str) -> Result<Vec<u8>, CryptoError> {
    if s.len() % 2 != 0 {
        return Err(CryptoError::HexDecode(format!(
            "odd-length hex string ({} chars)",
            s.len()
        )));
    }
    s.as_bytes()
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char)
                .to_digit(16)
                .ok_or_else(|| CryptoError::HexDecode(format!("invalid hex char {:?}", pair[0] as char)))?;
            let lo = (pair[1] as char)
                .to_digit(16)
                .ok_or_else(|| CryptoError::HexDecode(format!("invalid hex char {:?}", pair[1] as char)))?;
            Ok(((hi << 4) | lo) as u8)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;
    use serde_json::json;

    fn canonical(value: serde_json::Value) -> CanonicalBytes {
        CanonicalBytes::from_value(value).unwrap()
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let sk = SigningKey::generate(&mut OsRng);
        let vk = sk.verifying_key();
        let data = canonical(json!({"subject": "carrier.example.com"}));

        let sig = sk.sign(&data);
        vk.verify(&data, &sig).unwrap();
    }

    #[test]
    fn verification_fails_with_wrong_key() {
        let sk = SigningKey::generate(&mut OsRng);
        let other = SigningKey::generate(&mut OsRng);
        let data = canonical(json!({"subject": "carrier.example.com"}));

        let sig = sk.sign(&data);
        assert!(other.verifying_key().verify(&data, &sig).is_err());
    }

    #[test]
    fn verification_fails_with_tampered_data() {
        let sk = SigningKey::generate(&mut OsRng);
        let vk = sk.verifying_key();
        let sig = sk.sign(&canonical(json!({"tier": 2})));
        assert!(vk.verify(&canonical(json!({"tier": 1})), &sig).is_err());
    }

    #[test]
    fn signature_hex_roundtrip() {
        let sk = SigningKey::generate(&mut OsRng);
        let data = canonical(json!({"k": "v"}));
        let sig = sk.sign(&data);

        let hex = sig.to_hex();
        assert_eq!(hex.len(), 128);
        let parsed = Ed25519Signature::from_hex(&hex).unwrap();
        assert_eq!(sig, parsed);
    }

    #[test]
    fn signature_from_hex_rejects_wrong_length() {
        let err = Ed25519Signature::from_hex(&"ab".repeat(32)).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidSignatureLength(32)));
    }

    #[test]
    fn signature_from_hex_rejects_invalid_chars() {
        let err = Ed25519Signature::from_hex(&"zz".repeat(64)).unwrap_err();
        assert!(matches!(err, CryptoError::HexDecode(_)));
    }

    #[test]
    fn signing_key_hex_roundtrip() {
        let sk = SigningKey::generate(&mut OsRng);
        let restored = SigningKey::from_hex(&sk.to_hex()).unwrap();
        assert_eq!(sk.verifying_key(), restored.verifying_key());
    }

    #[test]
    fn verifying_key_hex_roundtrip() {
        let vk = SigningKey::generate(&mut OsRng).verifying_key();
        let restored = VerifyingKey::from_hex(&vk.to_hex()).unwrap();
        assert_eq!(vk, restored);
    }

    #[test]
    fn verifying_key_from_hex_rejects_garbage() {
        assert!(VerifyingKey::from_hex("deadbeef").is_err());
        assert!(VerifyingKey::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn signing_key_debug_redacts_secret() {
        let sk = SigningKey::generate(&mut OsRng);
        let debug = format!("{sk:?}");
        assert!(!debug.contains(&sk.to_hex()));
        assert!(debug.contains(&sk.verifying_key().to_hex()));
    }
}
