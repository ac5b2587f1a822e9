// crates/idis-core/src/core/error.rs
// ============================================================================
// Module: IDIS Error Kinds
// Description: The stable error-kind vocabulary shared across subsystems.
// Purpose: Let the transport layer map typed crate errors onto wire codes.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every typed error in the workspace maps onto exactly one [`ErrorKind`].
//! The kinds are the contract with the transport collaborator: they are
//! stable strings, never carry sensitive detail, and are never swallowed or
//! downgraded inside the core.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Error Kinds
// ============================================================================

/// Stable error kinds surfaced to the transport layer.
///
/// # Invariants
/// - Variants are stable wire codes; renames are breaking changes.
/// - Cross-tenant misses surface as `NotFound`, indistinguishable from a
///   genuinely missing resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// No valid credential was presented.
    Unauthenticated,
    /// Role set disallows the operation.
    RbacDenied,
    /// Deal-level access denied: no assignment for the actor.
    AbacDeniedNoAssignment,
    /// Deal-level access denied: auditors may not mutate.
    AbacDeniedAuditorMutation,
    /// Deal-level access denied: admin requires a break-glass token.
    AbacDeniedBreakGlassRequired,
    /// Deal-level access denied: deal unknown in this tenant.
    AbacDeniedUnknownDeal,
    /// Resource missing, or owned by another tenant.
    NotFound,
    /// Structural input violation (bad enum, out-of-range, missing field).
    InvalidInput,
    /// Factual section lacks claim or calc references.
    NoFreeFactsViolation,
    /// Output-boundary Muḥāsabah gate denied the output.
    MuhasabahRejected,
    /// Reproducibility hash mismatch; stored calculation was mutated.
    CalcIntegrity,
    /// Dual-write failed and both sides were rolled back.
    SagaCompensated,
    /// Dual-write compensation itself failed; operator action required.
    SagaCompensationFailed,
    /// Audit sink refused the event; the triggering operation must fail.
    AuditEmitFailed,
    /// State-machine transition invalid; no state change occurred.
    Conflict,
    /// Pipeline step not implemented in this build.
    Blocked,
}

impl ErrorKind {
    /// Returns the stable wire code for this kind.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::RbacDenied => "RBAC_DENIED",
            Self::AbacDeniedNoAssignment => "ABAC_DENIED_NO_ASSIGNMENT",
            Self::AbacDeniedAuditorMutation => "ABAC_DENIED_AUDITOR_MUTATION",
            Self::AbacDeniedBreakGlassRequired => "ABAC_DENIED_BREAK_GLASS_REQUIRED",
            Self::AbacDeniedUnknownDeal => "ABAC_DENIED_UNKNOWN_DEAL",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidInput => "INVALID_INPUT",
            Self::NoFreeFactsViolation => "NO_FREE_FACTS_VIOLATION",
            Self::MuhasabahRejected => "MUHASABAH_REJECTED",
            Self::CalcIntegrity => "CALC_INTEGRITY",
            Self::SagaCompensated => "SAGA_COMPENSATED",
            Self::SagaCompensationFailed => "SAGA_COMPENSATION_FAILED",
            Self::AuditEmitFailed => "AUDIT_EMIT_FAILED",
            Self::Conflict => "CONFLICT",
            Self::Blocked => "BLOCKED",
        }
    }
}
