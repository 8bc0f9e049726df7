//! # Canonical JSON serialization and content digests
//!
//! [`CanonicalBytes`] is the deterministic byte representation of a JSON
//! document: object keys sorted lexicographically, no insignificant
//! whitespace, and non-integer numbers rejected outright. It is the only
//! input type accepted by the workspace's signing and digest paths, which
//! rules out the class of bugs where two components disagree about the
//! bytes a signature covers.
//!
//! ## Invariants
//!
//! - Serializing the same value twice yields identical bytes.
//! - Floats are rejected: a token claim carrying `1.5` fails
//!   canonicalization instead of round-tripping through a lossy float
//!   representation.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from canonicalization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// The value contains a non-integer number.
    #[error("non-integer number not permitted in canonical form: {0}")]
    FloatRejected(String),

    /// JSON serialization of the input value failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Deterministic canonical bytes of a JSON document.
///
/// Construct via [`CanonicalBytes::new`] (from any `Serialize` value) or
/// [`CanonicalBytes::from_value`]. There is no way to build this type from
/// arbitrary bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    pub fn new<T: Serialize>(value: &T) -> Result<Self, CanonicalizationError> {
        Self::from_value(serde_json::to_value(value)?)
    }

    /// Canonicalize an already-built JSON value.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        let mut out = Vec::new();
        write_canonical(&value, &mut out)?;
        Ok(Self(out))
    }

    /// Access the canonical byte representation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the canonical representation in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the empty representation (never produced by
    /// canonicalizing a JSON value, but kept for API completeness).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Recursively write a value in canonical form: sorted object keys, no
/// whitespace, integers only.
fn write_canonical(value: &Value, out: &mut Vec<u8>) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.extend_from_slice(i.to_string().as_bytes());
            } else if let Some(u) = n.as_u64() {
                out.extend_from_slice(u.to_string().as_bytes());
            } else {
                return Err(CanonicalizationError::FloatRejected(n.to_string()));
            }
        }
        Value::String(s) => {
            // serde_json's string serialization is deterministic and
            // handles all escaping.
            let escaped = serde_json::to_string(s)?;
            out.extend_from_slice(escaped.as_bytes());
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                let escaped = serde_json::to_string(key)?;
                out.extend_from_slice(escaped.as_bytes());
                out.push(b':');
                write_canonical(&map[key.as_str()], out)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

/// A SHA-256 content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Access the raw 32-byte digest value.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Return the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a digest from a 64-character lowercase hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 64 {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let hi = (chunk[0] as char).to_digit(16)?;
            let lo = (chunk[1] as char).to_digit(16)?;
            bytes[i] = ((hi << 4) | lo) as u8;
        }
        Some(Self(bytes))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Compute a SHA-256 content digest from canonical bytes.
///
/// The input must be [`CanonicalBytes`] — raw byte slices are not accepted,
/// so every digest in the workspace was computed from canonicalized data.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    let out = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&out);
    ContentDigest(bytes)
}
