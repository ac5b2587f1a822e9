// crates/idis-core/src/core/sanad.rs
// ============================================================================
// Module: IDIS Sanad Model
// Description: The sanad record, grade scale, and grade explanations.
// Purpose: Bind a claim to its provenance chain and derived grade.
// Dependencies: crate::core::{defects, evidence, identifiers, time}, serde
// ============================================================================

//! ## Overview
//! A sanad is the provenance object for a claim: primary evidence,
//! corroborating evidence, an ordered transmission chain, and a derived
//! grade on the `A > B > C > D` scale. `D` is terminal — unusable for
//! investment-committee output. Grade derivation lives in `idis-sanad`;
//! this module only defines the value types.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::defects::Defect;
use crate::core::evidence::TransmissionNode;
use crate::core::identifiers::ClaimId;
use crate::core::identifiers::DealId;
use crate::core::identifiers::EvidenceId;
use crate::core::identifiers::SanadId;
use crate::core::identifiers::TenantId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Grade Scale
// ============================================================================

/// Evidentiary grade on the four-level `A > B > C > D` scale.
///
/// # Invariants
/// - `Ord` ranks `A` first; "worse" means later in declaration order.
/// - `D` is terminal and blocks investment-committee use.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Grade {
    /// Highest evidentiary standing.
    A,
    /// Solid standing with minor reservations.
    B,
    /// Weak standing; usable only with caveats.
    C,
    /// Unusable for investment-committee output.
    D,
}

impl Grade {
    /// Returns the grade one step worse, saturating at `D`.
    #[must_use]
    pub const fn downgraded(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::C,
            Self::C | Self::D => Self::D,
        }
    }

    /// Returns the grade one step worse, bounded below by `floor`.
    #[must_use]
    pub fn downgraded_not_below(self, floor: Self) -> Self {
        let next = self.downgraded();
        if next > floor { floor } else { next }
    }

    /// Returns the grade one step better, saturating at `A`.
    #[must_use]
    pub const fn upgraded(self) -> Self {
        match self {
            Self::A | Self::B => Self::A,
            Self::C => Self::B,
            Self::D => Self::C,
        }
    }

    /// Returns the worse of two grades.
    #[must_use]
    pub fn worse_of(self, other: Self) -> Self {
        if other > self { other } else { self }
    }

    /// Returns the worst grade across `grades`, or `None` when empty.
    #[must_use]
    pub fn worst(grades: impl IntoIterator<Item = Self>) -> Option<Self> {
        grades.into_iter().max()
    }

    /// Returns the stable letter for this grade.
    #[must_use]
    pub const fn letter(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

// ============================================================================
// SECTION: Corroboration
// ============================================================================

/// Independence classification of a claim's corroboration.
///
/// # Invariants
/// - Variants are stable for serialization and grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorroborationStatus {
    /// No independent corroboration.
    None,
    /// One independent attestation.
    Ahad1,
    /// Two independent attestations.
    Ahad2,
    /// Three or more independent attestations with low collusion risk.
    Mutawatir,
}

// ============================================================================
// SECTION: Grade Explanation
// ============================================================================

/// One step in a grade derivation, rendered for auditors.
///
/// # Invariants
/// - Entries appear in derivation order; replaying them reproduces the grade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationEntry {
    /// Derivation step label (e.g. `base_grade`, `major_downgrade`).
    pub step: String,
    /// Claim involved, when the step is claim-specific.
    pub claim_id: Option<ClaimId>,
    /// Impact description (e.g. `B -> C`).
    pub impact: Option<String>,
}

impl ExplanationEntry {
    /// Creates an explanation entry with no claim binding.
    #[must_use]
    pub fn new(step: impl Into<String>, impact: Option<String>) -> Self {
        Self {
            step: step.into(),
            claim_id: None,
            impact,
        }
    }
}

// ============================================================================
// SECTION: Sanad Record
// ============================================================================

/// Provenance record binding a claim to its evidence and grade.
///
/// # Invariants
/// - `transmission_chain` is non-empty.
/// - `corroborating_evidence_ids` is sorted for byte-stable serialization.
/// - Any FATAL defect in `defects` implies `sanad_grade == Grade::D`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sanad {
    /// Sanad identifier.
    pub sanad_id: SanadId,
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Claim this sanad backs.
    pub claim_id: ClaimId,
    /// Deal scope.
    pub deal_id: DealId,
    /// Primary evidence item.
    pub primary_evidence_id: EvidenceId,
    /// Corroborating evidence items, sorted.
    pub corroborating_evidence_ids: Vec<EvidenceId>,
    /// Ordered transmission chain, non-empty.
    pub transmission_chain: Vec<TransmissionNode>,
    /// Extraction confidence in `[0, 1]`.
    pub extraction_confidence: f64,
    /// Composite Dabt precision score in `[0, 1]`, when computed.
    pub dhabt_score: Option<f64>,
    /// Independence classification.
    pub corroboration_status: CorroborationStatus,
    /// Derived grade.
    pub sanad_grade: Grade,
    /// Ordered derivation explanation.
    pub grade_explanation: Vec<ExplanationEntry>,
    /// Defects detected during grading.
    pub defects: Vec<Defect>,
    /// Creation timestamp.
    pub created_at: Timestamp,
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
    fn grade_ordering_ranks_a_best() {
        assert!(Grade::A < Grade::B);
        assert_eq!(Grade::worst([Grade::A, Grade::C, Grade::B]), Some(Grade::C));
        assert_eq!(Grade::B.worse_of(Grade::D), Grade::D);
    }

    #[test]
    fn downgrade_saturates_and_respects_floor() {
        assert_eq!(Grade::A.downgraded(), Grade::B);
        assert_eq!(Grade::D.downgraded(), Grade::D);
        assert_eq!(Grade::B.downgraded_not_below(Grade::C), Grade::C);
        assert_eq!(Grade::C.downgraded_not_below(Grade::C), Grade::C);
    }

    #[test]
    fn upgrade_saturates_at_a() {
        assert_eq!(Grade::B.upgraded(), Grade::A);
        assert_eq!(Grade::A.upgraded(), Grade::A);
    }
}
