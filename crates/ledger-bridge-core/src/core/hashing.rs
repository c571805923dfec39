// crates/ledger-bridge-core/src/core/hashing.rs
// ============================================================================
// Module: Ledger Bridge Idempotency Keys
// Description: Deterministic idempotency key derivation for ledger submissions.
// Purpose: Give every retry of a command the same ledger-side deduplication key.
// Dependencies: serde, sha2
// ============================================================================

//! ## Overview
//! The idempotency key is a SHA-256 digest over the outbox uniqueness tuple
//! `(tenant_id, service, request_id)`. Each field is length-prefixed before
//! hashing so that `("ab", "c")` and `("a", "bc")` never collide.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use crate::core::identifiers::RequestId;
use crate::core::identifiers::ServiceName;
use crate::core::identifiers::TenantId;

// ============================================================================
// SECTION: Idempotency Key
// ============================================================================

/// Ledger-side deduplication key derived from a command's request identity.
///
/// # Invariants
/// - Lowercase hex SHA-256 digest (64 characters).
/// - Stable across processes and releases for the same input tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Derives the key for a `(tenant, service, request)` tuple.
    #[must_use]
    pub fn derive(tenant_id: &TenantId, service: &ServiceName, request_id: &RequestId) -> Self {
        let mut hasher = Sha256::new();
        for field in [tenant_id.as_str(), service.as_str(), request_id.as_str()] {
            hasher.update((field.len() as u64).to_be_bytes());
            hasher.update(field.as_bytes());
        }
        Self(hex_encode(&hasher.finalize()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::IdempotencyKey;
    use crate::core::identifiers::RequestId;
    use crate::core::identifiers::ServiceName;
    use crate::core::identifiers::TenantId;

    #[test]
    fn key_is_stable_and_hex() {
        let first = IdempotencyKey::derive(
            &TenantId::new("acme"),
            &ServiceName::new("payments"),
            &RequestId::new("tx-1"),
        );
        let second = IdempotencyKey::derive(
            &TenantId::new("acme"),
            &ServiceName::new("payments"),
            &RequestId::new("tx-1"),
        );
        assert_eq!(first, second);
        assert_eq!(first.as_str().len(), 64);
        assert!(first.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn field_boundaries_are_not_ambiguous() {
        let left =
            IdempotencyKey::derive(&TenantId::new("ab"), &ServiceName::new("c"), &RequestId::new("r"));
        let right =
            IdempotencyKey::derive(&TenantId::new("a"), &ServiceName::new("bc"), &RequestId::new("r"));
        assert_ne!(left, right);
    }
}
