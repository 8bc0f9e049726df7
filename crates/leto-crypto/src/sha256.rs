//! # SHA-256 Digest Computation
//!
//! Computes [`ContentDigest`] values from [`CanonicalBytes`]. This is the
//! only sanctioned path for producing the server-side token hashes stored
//! in issuance records.

use leto_core::{sha256_digest as core_sha256_digest, CanonicalBytes, ContentDigest};

/// Compute a SHA-256 content digest from canonical bytes.
///
/// The input must be [`CanonicalBytes`] — raw byte slices are not accepted.
/// Delegates to [`leto_core::sha256_digest()`] — the single implementation
/// in the workspace.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    core_sha256_digest(data)
}
