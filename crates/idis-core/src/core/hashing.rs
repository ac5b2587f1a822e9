// crates/idis-core/src/core/hashing.rs
// ============================================================================
// Module: IDIS Canonical Hashing
// Description: RFC 8785 canonical JSON serialization and SHA-256 digests.
// Purpose: Give every hashed artifact a single byte-exact representation.
// Dependencies: serde, serde_jcs, serde_json, sha2, thiserror
// ============================================================================

//! ## Overview
//! Reproducibility hashes, audit lines, position hashes, and break-glass
//! token scopes all hash the same way: serialize to RFC 8785 canonical JSON
//! (sorted keys, minimal separators, normalized numbers) and digest with
//! SHA-256. Canonicalization failures (non-finite floats, unserializable
//! values) are hard errors — nothing falls back to non-canonical bytes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Canonical hashing errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum HashError {
    /// Canonical serialization failed (non-finite float, map key issue).
    #[error("canonicalization failed: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Digest Type
// ============================================================================

/// SHA-256 digest rendered as lowercase hex.
///
/// # Invariants
/// - `value` is exactly 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashDigest(String);

impl HashDigest {
    /// Returns the hex digest as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Hash Functions
// ============================================================================

/// Computes the SHA-256 digest of raw bytes as lowercase hex.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> HashDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    HashDigest(out)
}

/// Serializes a value to RFC 8785 canonical JSON bytes.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when the value cannot be
/// canonically serialized.
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes a value's canonical JSON representation with SHA-256.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize>(value: &T) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(sha256_hex(&bytes))
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions are permitted."
    )]

    use serde_json::json;

    use super::*;

    #[test]
    fn canonical_hash_is_key_order_independent() {
        let a = json!({"b": 2, "a": 1});
        let b = json!({"a": 1, "b": 2});
        assert_eq!(
            hash_canonical_json(&a).unwrap(),
            hash_canonical_json(&b).unwrap()
        );
    }

    #[test]
    fn sha256_matches_known_vector() {
        // SHA-256 of the empty string.
        assert_eq!(
            sha256_hex(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn canonical_bytes_use_minimal_separators() {
        let value = json!({"k": [1, 2], "a": "x"});
        let bytes = canonical_json_bytes(&value).unwrap();
        assert_eq!(bytes, br#"{"a":"x","k":[1,2]}"#.to_vec());
    }
}
