// crates/idis-core/src/core/facts.rs
// ============================================================================
// Module: IDIS Fact Sections
// Description: The section shape validated by the No-Free-Facts rule.
// Purpose: Give deliverables and agent outputs one validatable fact surface.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! Anything that renders factual prose — deliverable sections, agent output
//! summaries — normalizes to a list of [`FactSection`] values before the
//! No-Free-Facts validator sees it. A factual, non-subjective section with
//! no claim and no calc references is a violation; there is no override.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::CalcId;
use crate::core::identifiers::ClaimId;

// ============================================================================
// SECTION: Fact Section
// ============================================================================

/// One validatable span of output text.
///
/// # Invariants
/// - `is_factual && !is_subjective` requires at least one reference across
///   `referenced_claim_ids` and `referenced_calc_ids`.
/// - Reference lists are sorted for byte-stable serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactSection {
    /// Section text.
    pub text: String,
    /// Whether the section asserts facts.
    pub is_factual: bool,
    /// Whether the section is explicitly subjective.
    pub is_subjective: bool,
    /// Claims referenced by the section, sorted.
    pub referenced_claim_ids: Vec<ClaimId>,
    /// Calculations referenced by the section, sorted.
    pub referenced_calc_ids: Vec<CalcId>,
}

impl FactSection {
    /// Returns whether the section satisfies the No-Free-Facts rule in
    /// isolation (reference existence is checked by callers).
    #[must_use]
    pub fn has_required_refs(&self) -> bool {
        !self.is_factual
            || self.is_subjective
            || !self.referenced_claim_ids.is_empty()
            || !self.referenced_calc_ids.is_empty()
    }
}
