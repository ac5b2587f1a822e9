// crates/idis-sanad/src/coi.rs
// ============================================================================
// Module: Conflict-of-Interest Checks
// Description: COI detection and cure assessment over evidence sources.
// Purpose: Cap grades when interested sources go undisclosed and uncured.
// Dependencies: crate::{tawatur, tiering}, idis-core
// ============================================================================

//! ## Overview
//! A source with a high-severity, undisclosed conflict of interest caps the
//! achievable grade at `C` unless an independent primary-tier corroborator
//! cures it. Low severity requires no cure. The cure must come from a
//! different independence key — a second export of the conflicted source
//! cures nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use idis_core::CoiSeverity;
use idis_core::EvidenceItem;

use crate::tawatur::independence_key;
use crate::tiering::SourceTier;

// ============================================================================
// SECTION: Findings
// ============================================================================

/// COI assessment over the attesting sources.
///
/// # Invariants
/// - `grade_capped` is true only for uncured high-undisclosed conflicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoiAssessment {
    /// Whether an uncured high-undisclosed conflict caps the grade at `C`.
    pub grade_capped: bool,
    /// Descriptions of detected high-undisclosed conflicts.
    pub findings: Vec<String>,
}

// ============================================================================
// SECTION: Assessment
// ============================================================================

/// Assesses conflicts of interest across sources.
#[must_use]
pub fn assess_coi(primary: &EvidenceItem, sources: &[EvidenceItem]) -> CoiAssessment {
    let mut findings = Vec::new();
    let mut uncured = false;

    for item in sources {
        let high_undisclosed = item.coi_present
            && item.coi_severity == Some(CoiSeverity::High)
            && !item.coi_disclosed;
        if !high_undisclosed {
            continue;
        }
        let conflicted_key = independence_key(item);
        let cured = sources.iter().any(|other| {
            independence_key(other) != conflicted_key
                && !other.coi_present
                && SourceTier::from_source_type(&other.source_type).primary_eligible()
        });
        findings.push(format!(
            "evidence {} carries an undisclosed high-severity conflict{}",
            item.evidence_id,
            if cured {
                " (cured by independent corroborator)"
            } else {
                ""
            }
        ));
        if !cured {
            uncured = true;
        }
    }

    // The primary source is part of `sources` for callers that follow the
    // service path; guard against a conflicted primary passed separately.
    if primary.coi_present
        && primary.coi_severity == Some(CoiSeverity::High)
        && !primary.coi_disclosed
        && !sources
            .iter()
            .any(|item| item.evidence_id == primary.evidence_id)
    {
        findings.push(format!(
            "primary evidence {} carries an undisclosed high-severity conflict",
            primary.evidence_id
        ));
        uncured = true;
    }

    CoiAssessment {
        grade_capped: uncured,
        findings,
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions are permitted."
    )]
    use idis_core::EvidenceId;

    use super::*;

    fn item(id: &str, source_type: &str, coi: bool, severity: Option<CoiSeverity>, disclosed: bool) -> EvidenceItem {
        EvidenceItem {
            evidence_id: EvidenceId::new(id),
            source_type: source_type.to_string(),
            source_system: "dataroom".to_string(),
            upstream_origin_id: Some(id.to_string()),
            document_version: None,
            latest_document_version: None,
            attested_value: None,
            collusion_risk: None,
            coi_present: coi,
            coi_severity: severity,
            coi_disclosed: disclosed,
        }
    }

    #[test]
    fn high_undisclosed_without_cure_caps_grade() {
        let primary = item("ev-1", "MANAGEMENT_REPORT", true, Some(CoiSeverity::High), false);
        let sources = vec![primary.clone()];
        let assessment = assess_coi(&primary, &sources);
        assert!(assessment.grade_capped);
        assert_eq!(assessment.findings.len(), 1);
    }

    #[test]
    fn independent_primary_tier_corroborator_cures() {
        let primary = item("ev-1", "MANAGEMENT_REPORT", true, Some(CoiSeverity::High), false);
        let corroborator = item("ev-2", "AUDITED_FINANCIALS", false, None, false);
        let assessment = assess_coi(&primary, &[primary.clone(), corroborator]);
        assert!(!assessment.grade_capped);
        assert_eq!(assessment.findings.len(), 1);
    }

    #[test]
    fn low_severity_requires_no_cure() {
        let primary = item("ev-1", "MANAGEMENT_REPORT", true, Some(CoiSeverity::Low), false);
        let assessment = assess_coi(&primary, &[primary.clone()]);
        assert!(!assessment.grade_capped);
        assert!(assessment.findings.is_empty());
    }

    #[test]
    fn disclosed_high_severity_does_not_cap() {
        let primary = item("ev-1", "MANAGEMENT_REPORT", true, Some(CoiSeverity::High), true);
        let assessment = assess_coi(&primary, &[primary.clone()]);
        assert!(!assessment.grade_capped);
    }
}
