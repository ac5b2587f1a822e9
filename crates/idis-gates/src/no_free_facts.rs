// crates/idis-gates/src/no_free_facts.rs
// ============================================================================
// Module: No-Free-Facts Validator
// Description: Structural reference check over fact sections.
// Purpose: Ensure no factual assertion exists without an evidence reference.
// Dependencies: idis-core, serde
// ============================================================================

//! ## Overview
//! The validator walks sections in order and reports every violation with a
//! deterministic path. A section fails when it is factual, not subjective,
//! and carries no claim and no calc references. When a registry of known ids
//! is supplied, dangling references fail too — a reference to an id outside
//! the deal's registry is as ungrounded as no reference at all.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use idis_core::CalcId;
use idis_core::ClaimId;
use idis_core::FactSection;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// One validation failure with a deterministic path.
///
/// # Invariants
/// - `path` follows `sections[<index>]` traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionError {
    /// Deterministic path of the failing section.
    pub path: String,
    /// Stable failure reason.
    pub reason: String,
}

/// Aggregate validation outcome.
///
/// # Invariants
/// - `passed` is true iff `errors` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoFreeFactsReport {
    /// Whether every section passed.
    pub passed: bool,
    /// Failures in deterministic traversal order.
    pub errors: Vec<SectionError>,
}

// ============================================================================
// SECTION: Known Reference Registry
// ============================================================================

/// Known claim and calc ids for one deal.
///
/// # Invariants
/// - Ids belong to a single deal; callers build one registry per validation.
#[derive(Debug, Clone, Default)]
pub struct KnownRefs {
    /// Claims registered for the deal.
    pub claim_ids: BTreeSet<ClaimId>,
    /// Calculations registered for the deal.
    pub calc_ids: BTreeSet<CalcId>,
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates sections against the No-Free-Facts rule.
///
/// When `known` is `Some`, every referenced id must exist in the registry;
/// when `None`, only the structural reference-presence rule applies.
#[must_use]
pub fn validate_sections(sections: &[FactSection], known: Option<&KnownRefs>) -> NoFreeFactsReport {
    let mut errors = Vec::new();
    for (idx, section) in sections.iter().enumerate() {
        let path = format!("sections[{idx}]");
        if !section.has_required_refs() {
            errors.push(SectionError {
                path: path.clone(),
                reason: "factual section has no claim or calc references".to_string(),
            });
            continue;
        }
        if let Some(registry) = known {
            for claim_id in &section.referenced_claim_ids {
                if !registry.claim_ids.contains(claim_id) {
                    errors.push(SectionError {
                        path: format!("{path}.referenced_claim_ids"),
                        reason: format!("unknown claim reference: {claim_id}"),
                    });
                }
            }
            for calc_id in &section.referenced_calc_ids {
                if !registry.calc_ids.contains(calc_id) {
                    errors.push(SectionError {
                        path: format!("{path}.referenced_calc_ids"),
                        reason: format!("unknown calc reference: {calc_id}"),
                    });
                }
            }
        }
    }
    NoFreeFactsReport {
        passed: errors.is_empty(),
        errors,
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

    fn section(factual: bool, subjective: bool, claims: &[&str]) -> FactSection {
        FactSection {
            text: "section text".to_string(),
            is_factual: factual,
            is_subjective: subjective,
            referenced_claim_ids: claims.iter().map(|id| ClaimId::new(*id)).collect(),
            referenced_calc_ids: vec![],
        }
    }

    #[test]
    fn factual_section_without_refs_fails() {
        let report = validate_sections(&[section(true, false, &[])], None);
        assert!(!report.passed);
        assert_eq!(report.errors[0].path, "sections[0]");
    }

    #[test]
    fn subjective_section_passes_without_refs() {
        let report = validate_sections(&[section(true, true, &[])], None);
        assert!(report.passed);
    }

    #[test]
    fn dangling_reference_fails_against_registry() {
        let known = KnownRefs {
            claim_ids: [ClaimId::new("claim-1")].into_iter().collect(),
            calc_ids: BTreeSet::new(),
        };
        let report = validate_sections(&[section(true, false, &["claim-2"])], Some(&known));
        assert!(!report.passed);
        assert!(report.errors[0].reason.contains("claim-2"));
    }

    #[test]
    fn error_paths_follow_traversal_order() {
        let report = validate_sections(
            &[section(true, false, &[]), section(true, false, &[])],
            None,
        );
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].path, "sections[0]");
        assert_eq!(report.errors[1].path, "sections[1]");
    }
}
