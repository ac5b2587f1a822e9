// crates/idis-core/src/core/claims.rs
// ============================================================================
// Module: IDIS Claim Model
// Description: Claims, verdicts, actions, and materiality.
// Purpose: Describe a single factual assertion about a deal.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! A claim is one factual assertion extracted from deal documents. Claims are
//! created by the extract step, graded by the auto-grade step, and mutated
//! only through the claim service, which enforces the IC-bound invariant and
//! emits an audit event per mutation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ClaimId;
use crate::core::identifiers::DealId;
use crate::core::identifiers::DefectId;
use crate::core::identifiers::SanadId;
use crate::core::identifiers::SpanId;
use crate::core::identifiers::TenantId;
use crate::core::sanad::Grade;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Claim Class
// ============================================================================

/// Open claim-class label (e.g. `FINANCIAL`, `TRACTION`).
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimClass(String);

impl ClaimClass {
    /// Creates a claim-class label.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Returns the label as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// SECTION: Verdicts and Actions
// ============================================================================

/// Verdict on a claim after grading and reconciliation.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimVerdict {
    /// Supported by its provenance chain.
    Verified,
    /// Stated value exceeds what sources support.
    Inflated,
    /// Contradicted by a stronger source.
    Contradicted,
    /// Insufficient provenance to verify.
    Unverified,
    /// Opinion or projection; not a checkable fact.
    Subjective,
    /// Blocked from downstream use (missing evidence anchor).
    Blocked,
}

/// Follow-up action attached to a claim verdict.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimAction {
    /// No action required.
    None,
    /// Escalate a contradiction to human arbitration.
    EscalateContradiction,
    /// Reject under the No-Free-Facts rule.
    RejectNoFreeFacts,
    /// Request fresher evidence.
    RefreshEvidence,
}

/// Materiality of a claim to the investment decision.
///
/// # Invariants
/// - `High` claims may not rest solely on support-only source tiers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Materiality {
    /// Immaterial detail.
    Low,
    /// Relevant but not decisive.
    Medium,
    /// Decisive for the investment committee.
    High,
}

// ============================================================================
// SECTION: Claim Record
// ============================================================================

/// A single factual assertion about a deal.
///
/// # Invariants
/// - `ic_bound == true` requires `sanad_id` or `primary_span_id`.
/// - Mutations go through the claim service, which emits one audit event
///   per mutation and enforces the invariant above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim identifier.
    pub claim_id: ClaimId,
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Deal scope.
    pub deal_id: DealId,
    /// Claim-class label.
    pub claim_class: ClaimClass,
    /// Assertion text as extracted.
    pub claim_text: String,
    /// Predicate label, when structured (e.g. `arr_usd`).
    pub predicate: Option<String>,
    /// Structured value, when the assertion carries one.
    pub value: Option<Value>,
    /// Backing sanad, once graded.
    pub sanad_id: Option<SanadId>,
    /// Current grade.
    pub claim_grade: Grade,
    /// Current verdict.
    pub claim_verdict: ClaimVerdict,
    /// Follow-up action for the verdict.
    pub claim_action: ClaimAction,
    /// Defects attached to the claim.
    pub defect_ids: Vec<DefectId>,
    /// Materiality to the investment decision.
    pub materiality: Materiality,
    /// Whether the claim is bound for investment-committee output.
    pub ic_bound: bool,
    /// Source span anchoring the claim, when extracted from text.
    pub primary_span_id: Option<SpanId>,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Last-mutation timestamp.
    pub updated_at: Timestamp,
}

impl Claim {
    /// Returns whether the IC-bound evidence-anchor invariant holds.
    #[must_use]
    pub const fn ic_anchor_satisfied(&self) -> bool {
        !self.ic_bound || self.sanad_id.is_some() || self.primary_span_id.is_some()
    }
}
