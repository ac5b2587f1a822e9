// crates/idis-sanad/src/tawatur.rs
// ============================================================================
// Module: Tawatur Independence Assessment
// Description: Independence keys and corroboration classification.
// Purpose: Distinguish genuinely independent attestations from echoes.
// Dependencies: idis-core
// ============================================================================

//! ## Overview
//! Each evidence item has an independence key derived from
//! `(source_system, upstream_origin_id)` — two exports of the same upstream
//! record share a key and corroborate nothing. `MUTAWATIR` requires at least
//! three independent keys and a collusion risk below 0.30; otherwise the
//! classification steps down through `AHAD_2`, `AHAD_1`, and `NONE`.
//! Collusion risk is the maximum across attesting sources (missing values
//! count as zero), so one risky source taints the whole set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use idis_core::CorroborationStatus;
use idis_core::EvidenceItem;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Collusion risk at or above which `MUTAWATIR` is refused.
const COLLUSION_RISK_LIMIT: f64 = 0.30;

/// Independent keys required for `MUTAWATIR`.
const MUTAWATIR_MIN_KEYS: usize = 3;

// ============================================================================
// SECTION: Independence Keys
// ============================================================================

/// Derives the independence key for one evidence item.
#[must_use]
pub fn independence_key(item: &EvidenceItem) -> String {
    match &item.upstream_origin_id {
        Some(origin) => format!("{}::{origin}", item.source_system),
        None => format!("{}::{}", item.source_system, item.evidence_id),
    }
}

// ============================================================================
// SECTION: Assessment
// ============================================================================

/// Classifies corroboration across all attesting sources.
#[must_use]
pub fn assess_corroboration(sources: &[EvidenceItem]) -> CorroborationStatus {
    let keys: BTreeSet<String> = sources.iter().map(independence_key).collect();
    let collusion_risk = sources
        .iter()
        .filter_map(|item| item.collusion_risk)
        .fold(0.0_f64, f64::max);

    if keys.len() >= MUTAWATIR_MIN_KEYS {
        if collusion_risk < COLLUSION_RISK_LIMIT {
            CorroborationStatus::Mutawatir
        } else {
            CorroborationStatus::Ahad2
        }
    } else {
        match keys.len() {
            2 => CorroborationStatus::Ahad1,
            _ => CorroborationStatus::None,
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
    use idis_core::EvidenceId;

    use super::*;

    fn item(id: &str, system: &str, origin: Option<&str>, risk: Option<f64>) -> EvidenceItem {
        EvidenceItem {
            evidence_id: EvidenceId::new(id),
            source_type: "BOARD_DECK".to_string(),
            source_system: system.to_string(),
            upstream_origin_id: origin.map(str::to_string),
            document_version: None,
            latest_document_version: None,
            attested_value: None,
            collusion_risk: risk,
            coi_present: false,
            coi_severity: None,
            coi_disclosed: false,
        }
    }

    #[test]
    fn three_independent_keys_with_low_risk_are_mutawatir() {
        let sources = vec![
            item("ev-1", "dataroom", Some("origin-a"), Some(0.1)),
            item("ev-2", "crm", Some("origin-b"), Some(0.2)),
            item("ev-3", "bank", Some("origin-c"), None),
        ];
        assert_eq!(assess_corroboration(&sources), CorroborationStatus::Mutawatir);
    }

    #[test]
    fn high_collusion_risk_downgrades_to_ahad_2() {
        let sources = vec![
            item("ev-1", "dataroom", Some("origin-a"), Some(0.5)),
            item("ev-2", "crm", Some("origin-b"), None),
            item("ev-3", "bank", Some("origin-c"), None),
        ];
        assert_eq!(assess_corroboration(&sources), CorroborationStatus::Ahad2);
    }

    #[test]
    fn shared_upstream_origin_collapses_keys() {
        let sources = vec![
            item("ev-1", "dataroom", Some("origin-a"), None),
            item("ev-2", "dataroom", Some("origin-a"), None),
        ];
        assert_eq!(assess_corroboration(&sources), CorroborationStatus::None);
    }

    #[test]
    fn two_independent_sources_are_ahad_1() {
        let sources = vec![
            item("ev-1", "dataroom", Some("origin-a"), None),
            item("ev-2", "crm", Some("origin-b"), None),
        ];
        assert_eq!(assess_corroboration(&sources), CorroborationStatus::Ahad1);
    }
}
