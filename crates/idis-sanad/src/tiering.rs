// crates/idis-sanad/src/tiering.rs
// ============================================================================
// Module: Source Tiering
// Description: The six-tier source hierarchy with weights and eligibility.
// Purpose: Map source-type labels onto graded tiers, failing closed.
// Dependencies: idis-core, serde
// ============================================================================

//! ## Overview
//! Every evidence item is assigned one of six tiers. Tiers 1–4 are
//! primary-eligible; tiers 5–6 are support-only and may not be the sole
//! backing for a high-materiality claim. Unknown source types fail closed to
//! the weakest tier rather than erroring — an unrecognized source is treated
//! as the least trustworthy, never as a hard failure that would drop the
//! evidence silently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use idis_core::Grade;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Tiers
// ============================================================================

/// Six-tier source hierarchy, strongest first.
///
/// # Invariants
/// - Variants are stable for serialization and grading.
/// - `Ord` ranks stronger tiers first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceTier {
    /// Audited primary records (weight 1.00).
    AthbatAlNas,
    /// Verified system-of-record exports (weight 0.90).
    ThiqahThabit,
    /// Trusted first-party documents (weight 0.80).
    Thiqah,
    /// Credible but unaudited materials (weight 0.65).
    Saduq,
    /// Secondary commentary (weight 0.50, support-only).
    Shaykh,
    /// Acceptable-at-best sources (weight 0.40, support-only).
    Maqbul,
}

impl SourceTier {
    /// Returns the tier weight used in grade derivation.
    #[must_use]
    pub const fn weight(self) -> f64 {
        match self {
            Self::AthbatAlNas => 1.00,
            Self::ThiqahThabit => 0.90,
            Self::Thiqah => 0.80,
            Self::Saduq => 0.65,
            Self::Shaykh => 0.50,
            Self::Maqbul => 0.40,
        }
    }

    /// Returns whether the tier may serve as primary backing.
    #[must_use]
    pub const fn primary_eligible(self) -> bool {
        matches!(
            self,
            Self::AthbatAlNas | Self::ThiqahThabit | Self::Thiqah | Self::Saduq
        )
    }

    /// Maps a source-type label to a tier, failing closed to [`Self::Maqbul`].
    #[must_use]
    pub fn from_source_type(source_type: &str) -> Self {
        match source_type {
            "AUDITED_FINANCIALS" | "BANK_STATEMENT" | "REGISTRY_FILING" => Self::AthbatAlNas,
            "SYSTEM_OF_RECORD_EXPORT" | "SIGNED_CONTRACT" => Self::ThiqahThabit,
            "FINANCIAL_MODEL" | "BOARD_DECK" | "CAP_TABLE" => Self::Thiqah,
            "PITCH_DECK" | "MANAGEMENT_REPORT" | "DATA_ROOM_DOC" => Self::Saduq,
            "ANALYST_NOTE" | "PRESS_RELEASE" => Self::Shaykh,
            "FOUNDER_STATEMENT" | "THIRD_PARTY_BLOG" => Self::Maqbul,
            _ => Self::Maqbul,
        }
    }

    /// Returns the base grade implied by this tier's weight.
    #[must_use]
    pub fn base_grade(self) -> Grade {
        let weight = self.weight();
        if weight >= 0.90 {
            Grade::A
        } else if weight >= 0.65 {
            Grade::B
        } else {
            Grade::C
        }
    }
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
    fn unknown_source_types_fail_closed_to_maqbul() {
        assert_eq!(SourceTier::from_source_type("CRYSTAL_BALL"), SourceTier::Maqbul);
        assert_eq!(SourceTier::from_source_type(""), SourceTier::Maqbul);
    }

    #[test]
    fn support_only_tiers_are_not_primary_eligible() {
        assert!(SourceTier::Thiqah.primary_eligible());
        assert!(SourceTier::Saduq.primary_eligible());
        assert!(!SourceTier::Shaykh.primary_eligible());
        assert!(!SourceTier::Maqbul.primary_eligible());
    }

    #[test]
    fn base_grades_follow_weights() {
        assert_eq!(SourceTier::AthbatAlNas.base_grade(), Grade::A);
        assert_eq!(SourceTier::ThiqahThabit.base_grade(), Grade::A);
        assert_eq!(SourceTier::Thiqah.base_grade(), Grade::B);
        assert_eq!(SourceTier::Saduq.base_grade(), Grade::B);
        assert_eq!(SourceTier::Shaykh.base_grade(), Grade::C);
        assert_eq!(SourceTier::Maqbul.base_grade(), Grade::C);
    }
}
