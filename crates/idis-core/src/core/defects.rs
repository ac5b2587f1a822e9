// crates/idis-core/src/core/defects.rs
// ============================================================================
// Module: IDIS Defect Model
// Description: Defect records, the canonical severity table, and state machine.
// Purpose: Record provenance flaws with a single source of truth for severity.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! A defect is a recorded flaw in a claim's provenance. Severity is decided
//! once, in [`DefectType::profile`] — the grader, the defect service, and
//! the claims path all consult the same table. The lifecycle is a strict
//! state machine: `OPEN -> {CURED, WAIVED}`; terminal states accept no
//! further transitions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ActorId;
use crate::core::identifiers::ClaimId;
use crate::core::identifiers::DealId;
use crate::core::identifiers::DefectId;
use crate::core::identifiers::TenantId;

// ============================================================================
// SECTION: Severity and Status
// ============================================================================

/// Defect severity scale.
///
/// # Invariants
/// - A FATAL defect forces sanad grade `D` with no cure short of waiver
///   review; MAJOR downgrades one step; MINOR is advisory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefectSeverity {
    /// Forces grade `D`; terminates derivation.
    Fatal,
    /// Downgrades the grade one step (minimum `C`).
    Major,
    /// Advisory; no grade impact.
    Minor,
}

/// Defect lifecycle status.
///
/// # Invariants
/// - `Cured` and `Waived` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefectStatus {
    /// Defect is open and affects grading.
    Open,
    /// Defect was cured with a recorded reason.
    Cured,
    /// Defect was waived with a recorded reason.
    Waived,
}

// ============================================================================
// SECTION: Defect Types
// ============================================================================

/// Canonical defect types recorded by the defect service.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
/// - [`DefectType::profile`] is the single source of truth for severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefectType {
    /// Transmission node references a missing parent.
    BrokenChain,
    /// Upstream origin mismatch across linked hops.
    ChainGrafting,
    /// Child hop timestamp precedes its parent's.
    ChronoImpossible,
    /// Claim cites a stale document version.
    Inconsistency,
    /// Lower-tier source contradicts a higher-tier source beyond tolerance.
    AnomalyVsStrongerSources,
    /// Units do not reconcile across attestations.
    UnitMismatch,
    /// Reporting periods do not match across attestations.
    TimeWindowMismatch,
    /// High-severity conflict of interest left undisclosed.
    Concealment,
    /// Claim scope drifted from its source span.
    ScopeDrift,
}

impl DefectType {
    /// Returns the canonical severity for this defect type.
    #[must_use]
    pub const fn profile(self) -> DefectSeverity {
        match self {
            Self::BrokenChain | Self::ChainGrafting | Self::ChronoImpossible => {
                DefectSeverity::Fatal
            }
            Self::Inconsistency
            | Self::AnomalyVsStrongerSources
            | Self::UnitMismatch
            | Self::TimeWindowMismatch
            | Self::Concealment => DefectSeverity::Major,
            Self::ScopeDrift => DefectSeverity::Minor,
        }
    }
}

// ============================================================================
// SECTION: Defect Record
// ============================================================================

/// A recorded provenance flaw.
///
/// # Invariants
/// - `severity` always equals `defect_type.profile()`.
/// - Waive and cure each require a non-empty actor and non-empty reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defect {
    /// Defect identifier.
    pub defect_id: DefectId,
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Claim the defect attaches to.
    pub claim_id: ClaimId,
    /// Deal scope.
    pub deal_id: DealId,
    /// Canonical defect type.
    pub defect_type: DefectType,
    /// Severity from the canonical table.
    pub severity: DefectSeverity,
    /// Human-readable description of the flaw.
    pub description: String,
    /// Cure protocol label (e.g. `HUMAN_ARBITRATION`).
    pub cure_protocol: String,
    /// Lifecycle status.
    pub status: DefectStatus,
    /// Actor who waived the defect, when waived.
    pub waived_by: Option<ActorId>,
    /// Waiver reason, when waived.
    pub waiver_reason: Option<String>,
    /// Actor who cured the defect, when cured.
    pub cured_by: Option<ActorId>,
    /// Cure reason, when cured.
    pub cured_reason: Option<String>,
}
