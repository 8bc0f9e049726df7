//! # leto-crypto — Cryptographic Primitives for the LETO Stack
//!
//! This crate provides the cryptographic building blocks used throughout
//! the workspace:
//!
//! - **Ed25519** signing and verification for assurance and orchestration
//!   tokens.
//! - **SHA-256 digest computation** from
//!   [`CanonicalBytes`](leto_core::CanonicalBytes), producing
//!   [`ContentDigest`](leto_core::ContentDigest) values — used for the
//!   server-side token hashes that stand in for raw token storage.
//!
//! Signing and digest functions accept only `CanonicalBytes`, never raw
//! byte slices, so every signature and hash in the workspace covers
//! properly canonicalized data.

pub mod ed25519;
pub mod error;
pub mod sha256;

// Re-export primary types.
pub use ed25519::{Ed25519Signature, SigningKey, VerifyingKey};
pub use error::CryptoError;
pub use sha256::sha256_digest;
