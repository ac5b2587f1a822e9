// crates/idis-core/src/core/identifiers.rs
// ============================================================================
// Module: IDIS Identifiers
// Description: Canonical opaque identifiers for IDIS entities and runs.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical identifiers used throughout IDIS.
//! Identifiers are opaque UUID-shaped strings and serialize transparently on
//! the wire. No normalization is applied; existence checks and tenant scoping
//! happen at service boundaries, never inside identifier types.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

/// Declares an opaque string identifier newtype with stable wire form.
macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        ///
        /// # Invariants
        /// - Opaque UTF-8 string; no normalization or validation is applied by this type.
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

opaque_id!(
    /// Tenant identifier; the isolation boundary for every persisted entity.
    TenantId
);

opaque_id!(
    /// Actor identifier for humans, agents, and system principals.
    ActorId
);

opaque_id!(
    /// Deal identifier; a single investment opportunity under analysis.
    DealId
);

opaque_id!(
    /// Claim identifier for extracted factual assertions.
    ClaimId
);

opaque_id!(
    /// Evidence item identifier pointing at a source artifact.
    EvidenceId
);

opaque_id!(
    /// Transmission node identifier within a sanad chain.
    NodeId
);

opaque_id!(
    /// Sanad identifier binding a claim to its provenance chain.
    SanadId
);

opaque_id!(
    /// Defect identifier for recorded provenance flaws.
    DefectId
);

opaque_id!(
    /// Deterministic calculation identifier.
    CalcId
);

opaque_id!(
    /// Pipeline run identifier scoped to a tenant.
    RunId
);

opaque_id!(
    /// Run step ledger row identifier.
    StepId
);

opaque_id!(
    /// Audit event identifier.
    EventId
);

opaque_id!(
    /// Agent output identifier.
    OutputId
);

opaque_id!(
    /// Document span identifier anchoring a claim to source text.
    SpanId
);

opaque_id!(
    /// Prompt artifact identifier in the prompt registry.
    PromptId
);

opaque_id!(
    /// Request identifier supplied by the transport layer.
    RequestId
);

// ============================================================================
// SECTION: UUID Shape Check
// ============================================================================

/// Returns whether `value` has the canonical UUID shape
/// (8-4-4-4-12 lowercase or uppercase hex groups).
#[must_use]
pub fn is_uuid_shaped(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    for (idx, byte) in bytes.iter().enumerate() {
        match idx {
            8 | 13 | 18 | 23 => {
                if *byte != b'-' {
                    return false;
                }
            }
            _ => {
                if !byte.is_ascii_hexdigit() {
                    return false;
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions are permitted."
    )]

    use super::*;

    #[test]
    fn uuid_shape_accepts_canonical_form() {
        assert!(is_uuid_shaped("6f1f9a2e-64ba-4f3c-9d2e-0a5b7c8d9e0f"));
        assert!(is_uuid_shaped("6F1F9A2E-64BA-4F3C-9D2E-0A5B7C8D9E0F"));
    }

    #[test]
    fn uuid_shape_rejects_malformed_values() {
        assert!(!is_uuid_shaped(""));
        assert!(!is_uuid_shaped("not-a-uuid"));
        assert!(!is_uuid_shaped("6f1f9a2e64ba4f3c9d2e0a5b7c8d9e0f"));
        assert!(!is_uuid_shaped("6f1f9a2e-64ba-4f3c-9d2e-0a5b7c8d9e0g"));
    }

    #[test]
    fn identifiers_serialize_transparently() {
        let id = ClaimId::new("claim-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"claim-1\"");
    }
}
