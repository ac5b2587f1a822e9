// crates/idis-sanad/src/grader.rs
// ============================================================================
// Module: Sanad Grade Derivation
// Description: Deterministic grade pipeline over sanad structure.
// Purpose: Derive grades, verdicts, and defects reproducibly for auditors.
// Dependencies: crate::{coi, dabt, ilal, shudhudh, tawatur, tiering}, idis-core
// ============================================================================

//! ## Overview
//! Grade derivation runs in a fixed order: base grade from the primary
//! source tier; any FATAL defect forces `D` and terminates; each MAJOR
//! defect downgrades one step (minimum `C`); the Dabt and COI caps apply
//! when lower than the derived grade; `MUTAWATIR` corroboration with no
//! remaining MAJOR defects upgrades one step (maximum `A`). A claim value
//! contradicted by a stronger source is terminal: grade `D`, verdict
//! `CONTRADICTED`. The ordered explanation lets auditors replay the
//! derivation step by step.

// ============================================================================
// SECTION: Imports
// ============================================================================

use idis_core::AttestedValue;
use idis_core::ClaimVerdict;
use idis_core::CorroborationStatus;
use idis_core::DefectSeverity;
use idis_core::DefectType;
use idis_core::EvidenceItem;
use idis_core::ExplanationEntry;
use idis_core::Grade;
use idis_core::Materiality;
use idis_core::TransmissionNode;

use crate::coi::assess_coi;
use crate::dabt::DABT_GRADE_CAP_THRESHOLD;
use crate::dabt::DabtDimensions;
use crate::dabt::compute_dabt;
use crate::ilal::IlalFinding;
use crate::ilal::inspect_chain;
use crate::shudhudh::ShudhudhFinding;
use crate::shudhudh::reconcile;
use crate::tawatur::assess_corroboration;
use crate::tiering::SourceTier;

// ============================================================================
// SECTION: Defect Codes
// ============================================================================

/// Stable grader defect codes.
///
/// # Invariants
/// - Codes are stable wire strings; [`GraderCode::defect_type`] is the
///   single mapping onto defect-service types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraderCode {
    /// Missing parent reference in the chain.
    IlalChainBreak,
    /// Mismatched upstream origin across linked hops.
    IlalChainGrafting,
    /// Child hop precedes its parent in time.
    IlalChronologyImpossible,
    /// Claim cites a stale document version.
    IlalVersionDrift,
    /// Lower-tier source contradicts a higher-tier source.
    ShudhudhAnomaly,
    /// Units do not reconcile.
    ShudhudhUnitMismatch,
    /// Reporting periods do not match.
    ShudhudhTimeWindow,
    /// High-severity undisclosed conflict of interest.
    CoiHighUndisclosed,
}

impl GraderCode {
    /// Returns the stable code string.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::IlalChainBreak => "ILAL_CHAIN_BREAK",
            Self::IlalChainGrafting => "ILAL_CHAIN_GRAFTING",
            Self::IlalChronologyImpossible => "ILAL_CHRONOLOGY_IMPOSSIBLE",
            Self::IlalVersionDrift => "ILAL_VERSION_DRIFT",
            Self::ShudhudhAnomaly => "SHUDHUDH_ANOMALY",
            Self::ShudhudhUnitMismatch => "SHUDHUDH_UNIT_MISMATCH",
            Self::ShudhudhTimeWindow => "SHUDHUDH_TIME_WINDOW",
            Self::CoiHighUndisclosed => "COI_HIGH_UNDISCLOSED",
        }
    }

    /// Maps the grader code onto the canonical defect type.
    #[must_use]
    pub const fn defect_type(self) -> DefectType {
        match self {
            Self::IlalChainBreak => DefectType::BrokenChain,
            Self::IlalChainGrafting => DefectType::ChainGrafting,
            Self::IlalChronologyImpossible => DefectType::ChronoImpossible,
            Self::IlalVersionDrift => DefectType::Inconsistency,
            Self::ShudhudhAnomaly => DefectType::AnomalyVsStrongerSources,
            Self::ShudhudhUnitMismatch => DefectType::UnitMismatch,
            Self::ShudhudhTimeWindow => DefectType::TimeWindowMismatch,
            Self::CoiHighUndisclosed => DefectType::Concealment,
        }
    }

    /// Returns the severity from the canonical table.
    #[must_use]
    pub const fn severity(self) -> DefectSeverity {
        self.defect_type().profile()
    }
}

/// One defect detected during grading, before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedDefect {
    /// Grader code.
    pub code: GraderCode,
    /// Severity from the canonical table.
    pub severity: DefectSeverity,
    /// Human-readable description.
    pub description: String,
}

// ============================================================================
// SECTION: Input and Outcome
// ============================================================================

/// Everything the grader needs for one claim.
#[derive(Debug, Clone, Copy)]
pub struct GradeInput<'a> {
    /// Ordered transmission chain.
    pub chain: &'a [TransmissionNode],
    /// Primary evidence item.
    pub primary: &'a EvidenceItem,
    /// All attesting sources, primary included.
    pub sources: &'a [EvidenceItem],
    /// The claim's own stated value, when it carries one.
    pub claim_value: Option<&'a AttestedValue>,
    /// Claim materiality.
    pub materiality: Materiality,
    /// Dabt precision dimensions, when assessed.
    pub dabt: Option<&'a DabtDimensions>,
}

/// Grading outcome for one claim.
///
/// # Invariants
/// - Any FATAL defect in `defects` implies `grade == Grade::D`.
/// - `explanation` replays the derivation in order.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
    /// Derived grade.
    pub grade: Grade,
    /// Verdict recommendation for the claim service.
    pub verdict: ClaimVerdict,
    /// Independence classification.
    pub corroboration_status: CorroborationStatus,
    /// Composite Dabt score, when dimensions were supplied.
    pub dhabt_score: Option<f64>,
    /// Ordered derivation explanation.
    pub explanation: Vec<ExplanationEntry>,
    /// Detected defects in detection order.
    pub defects: Vec<DetectedDefect>,
}

// ============================================================================
// SECTION: Derivation
// ============================================================================

/// Grades one claim's sanad structure deterministically.
#[must_use]
pub fn grade_sanad(input: &GradeInput<'_>) -> GradeOutcome {
    let mut explanation = Vec::new();
    let mut defects = Vec::new();

    // 1. Source tiering.
    let tier = SourceTier::from_source_type(&input.primary.source_type);
    let mut grade = tier.base_grade();
    explanation.push(ExplanationEntry::new(
        "source_tier",
        Some(format!("{tier:?} -> base {grade}")),
    ));

    // 2. Dabt.
    let dhabt_score = input.dabt.map(compute_dabt);

    // 3. Tawatur.
    let corroboration_status = assess_corroboration(input.sources);

    // 4. Shudhudh.
    let mut contradicts_claim = false;
    for finding in reconcile(input.sources, input.claim_value) {
        match finding {
            ShudhudhFinding::Anomaly {
                description,
                contradicts_claim: against_claim,
            } => {
                contradicts_claim |= against_claim;
                defects.push(DetectedDefect {
                    code: GraderCode::ShudhudhAnomaly,
                    severity: GraderCode::ShudhudhAnomaly.severity(),
                    description,
                });
            }
            ShudhudhFinding::UnitMismatch { description } => defects.push(DetectedDefect {
                code: GraderCode::ShudhudhUnitMismatch,
                severity: GraderCode::ShudhudhUnitMismatch.severity(),
                description,
            }),
            ShudhudhFinding::TimeWindow { description } => defects.push(DetectedDefect {
                code: GraderCode::ShudhudhTimeWindow,
                severity: GraderCode::ShudhudhTimeWindow.severity(),
                description,
            }),
        }
    }

    // 5. I'lal.
    let mut version_drift = false;
    for finding in inspect_chain(input.chain, input.sources) {
        let (code, description) = match finding {
            IlalFinding::ChainBreak { description } => (GraderCode::IlalChainBreak, description),
            IlalFinding::ChainGrafting { description } => {
                (GraderCode::IlalChainGrafting, description)
            }
            IlalFinding::ChronologyImpossible { description } => {
                (GraderCode::IlalChronologyImpossible, description)
            }
            IlalFinding::VersionDrift { description } => {
                version_drift = true;
                (GraderCode::IlalVersionDrift, description)
            }
        };
        defects.push(DetectedDefect {
            code,
            severity: code.severity(),
            description,
        });
    }

    // 6. COI.
    let coi = assess_coi(input.primary, input.sources);
    for description in &coi.findings {
        defects.push(DetectedDefect {
            code: GraderCode::CoiHighUndisclosed,
            severity: GraderCode::CoiHighUndisclosed.severity(),
            description: description.clone(),
        });
    }

    // Grade derivation, in order.
    let has_fatal = defects
        .iter()
        .any(|defect| defect.severity == DefectSeverity::Fatal);
    if has_fatal {
        explanation.push(ExplanationEntry::new(
            "fatal_defect",
            Some(format!("{grade} -> D")),
        ));
        return GradeOutcome {
            grade: Grade::D,
            verdict: ClaimVerdict::Unverified,
            corroboration_status,
            dhabt_score,
            explanation,
            defects,
        };
    }

    if contradicts_claim {
        explanation.push(ExplanationEntry::new(
            "claim_contradicted",
            Some(format!("{grade} -> D")),
        ));
        return GradeOutcome {
            grade: Grade::D,
            verdict: ClaimVerdict::Contradicted,
            corroboration_status,
            dhabt_score,
            explanation,
            defects,
        };
    }

    let major_count = defects
        .iter()
        .filter(|defect| defect.severity == DefectSeverity::Major)
        .count();
    for _ in 0..major_count {
        let downgraded = grade.downgraded_not_below(Grade::C);
        if downgraded != grade {
            explanation.push(ExplanationEntry::new(
                "major_downgrade",
                Some(format!("{grade} -> {downgraded}")),
            ));
            grade = downgraded;
        }
    }

    if let Some(score) = dhabt_score
        && score < DABT_GRADE_CAP_THRESHOLD
    {
        let capped = grade.worse_of(Grade::B);
        if capped != grade {
            explanation.push(ExplanationEntry::new(
                "dabt_cap",
                Some(format!("{grade} -> {capped}")),
            ));
            grade = capped;
        }
    }

    if coi.grade_capped {
        let capped = grade.worse_of(Grade::C);
        if capped != grade {
            explanation.push(ExplanationEntry::new(
                "coi_cap",
                Some(format!("{grade} -> {capped}")),
            ));
            grade = capped;
        }
    }

    if input.materiality == Materiality::High && !tier.primary_eligible() {
        let cured = input.sources.iter().any(|item| {
            item.evidence_id != input.primary.evidence_id
                && SourceTier::from_source_type(&item.source_type).primary_eligible()
        });
        if !cured {
            let capped = grade.worse_of(Grade::C);
            explanation.push(ExplanationEntry::new(
                "support_only_primary_cap",
                Some(format!("{grade} -> {capped}")),
            ));
            grade = capped;
        }
    }

    if corroboration_status == CorroborationStatus::Mutawatir && major_count == 0 {
        let upgraded = grade.upgraded();
        if upgraded != grade {
            explanation.push(ExplanationEntry::new(
                "tawatur_upgrade",
                Some(format!("{grade} -> {upgraded}")),
            ));
            grade = upgraded;
        }
    }

    let verdict = if version_drift {
        ClaimVerdict::Unverified
    } else {
        ClaimVerdict::Verified
    };

    explanation.push(ExplanationEntry::new("final", Some(grade.to_string())));
    GradeOutcome {
        grade,
        verdict,
        corroboration_status,
        dhabt_score,
        explanation,
        defects,
    }
}
