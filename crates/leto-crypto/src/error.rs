//! # Cryptographic Error Types
//!
//! Structured errors for all cryptographic operations in `leto-crypto`.

use thiserror::Error;

/// Errors from cryptographic operations in the LETO Stack.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("Ed25519 verification failed: {0}")]
    VerificationFailed(String),

    /// Invalid Ed25519 signature length.
    #[error("invalid Ed25519 signature length: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),

    /// Invalid Ed25519 public key.
    #[error("invalid Ed25519 public key: {0}")]
    InvalidPublicKey(String),

    /// Invalid Ed25519 secret key material.
    #[error("invalid Ed25519 secret key: {0}")]
    InvalidSecretKey(String),

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_failed_display() {
        let err = CryptoError::VerificationFailed("bad sig".to_string());
        assert!(format!("{err}").contains("bad sig"));
    }

    #[test]
    fn invalid_signature_length_display() {
        let err = CryptoError::InvalidSignatureLength(32);
        let msg = format!("{err}");
        assert!(msg.contains("64 bytes"));
        assert!(msg.contains("32"));
    }

    #[test]
    fn hex_decode_display() {
        let err = CryptoError::HexDecode("odd length".to_string());
        assert!(format!("{err}").contains("odd length"));
    }

    #[test]
    fn all_variants_are_debug() {
        let variants: Vec<CryptoError> = vec![
            CryptoError::VerificationFailed("a".to_string()),
            CryptoError::InvalidSignatureLength(0),
            CryptoError::InvalidPublicKey("b".to_string()),
            CryptoError::InvalidSecretKey("c".to_string()),
            CryptoError::HexDecode("d".to_string()),
        ];
        for v in variants {
            assert!(!format!("{v:?}").is_empty());
        }
    }
}
