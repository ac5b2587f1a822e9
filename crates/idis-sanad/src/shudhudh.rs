// crates/idis-sanad/src/shudhudh.rs
// ============================================================================
// Module: Shudhudh Anomaly Detection
// Description: Value-level reconciliation and contradiction checks.
// Purpose: Detect attested values that cannot be reconciled across sources.
// Dependencies: crate::tiering, idis-core, bigdecimal
// ============================================================================

//! ## Overview
//! When the same claim value is attested by multiple sources, reconciliation
//! runs first: units normalize to a common base and values within a 1%
//! rounding tolerance agree. A lower-tier source contradicting a higher-tier
//! source beyond tolerance is a MAJOR anomaly. Units that do not reconcile
//! are a MAJOR unit mismatch; differing reporting periods are a MAJOR
//! time-window mismatch. A higher-tier source contradicting the claim's own
//! stated value beyond the contradiction threshold additionally marks the
//! claim `CONTRADICTED`, which is terminal for grading.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;

use bigdecimal::BigDecimal;
use bigdecimal::Zero;
use idis_core::AttestedValue;
use idis_core::EvidenceItem;

use crate::tiering::SourceTier;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Rounding tolerance for reconciliation, as a fraction.
const RECONCILE_TOLERANCE: f64 = 0.01;

/// Discrepancy above which a stronger source contradicts the claim value.
const CONTRADICTION_THRESHOLD: f64 = 0.05;

// ============================================================================
// SECTION: Findings
// ============================================================================

/// Anomaly findings produced by reconciliation.
///
/// # Invariants
/// - Findings are ordered by detection; each maps to one MAJOR defect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShudhudhFinding {
    /// A lower-tier source contradicts a higher-tier source beyond tolerance.
    Anomaly {
        /// Description naming both sources and the discrepancy.
        description: String,
        /// Whether the claim's own value is contradicted by a stronger source.
        contradicts_claim: bool,
    },
    /// Units could not be normalized to a common base.
    UnitMismatch {
        /// Description naming the irreconcilable units.
        description: String,
    },
    /// Reporting periods differ across attestations.
    TimeWindow {
        /// Description naming the mismatched periods.
        description: String,
    },
}

// ============================================================================
// SECTION: Unit Normalization
// ============================================================================

/// Splits a unit label into `(base, multiplier)`; `None` when unknown.
fn unit_multiplier(unit: &str) -> Option<(String, BigDecimal)> {
    let (base, factor) = match unit.rsplit_once('_') {
        Some((base, "K")) => (base, BigDecimal::from(1_000)),
        Some((base, "M")) => (base, BigDecimal::from(1_000_000)),
        Some((base, "B")) => (base, BigDecimal::from(1_000_000_000)),
        _ => (unit, BigDecimal::from(1)),
    };
    if base.is_empty() || !base.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    Some((base.to_string(), factor))
}

/// Normalizes an attested value to `(base_unit, amount)`.
///
/// Values without a unit normalize to the pseudo-base `"" `so unit-less
/// attestations compare among themselves.
fn normalize(value: &AttestedValue) -> Result<(String, BigDecimal), String> {
    let amount = BigDecimal::from_str(value.raw.trim())
        .map_err(|_| format!("unparseable value '{}'", value.raw))?;
    match &value.unit {
        None => Ok((String::new(), amount)),
        Some(unit) => {
            let (base, factor) =
                unit_multiplier(unit).ok_or_else(|| format!("unknown unit '{unit}'"))?;
            Ok((base, amount * factor))
        }
    }
}

/// Returns the relative discrepancy between two normalized amounts.
fn relative_discrepancy(left: &BigDecimal, right: &BigDecimal) -> f64 {
    let larger = if left.abs() > right.abs() {
        left.abs()
    } else {
        right.abs()
    };
    if larger.is_zero() {
        return 0.0;
    }
    let diff = (left - right).abs();
    let ratio = diff / larger;
    ratio.to_string().parse::<f64>().unwrap_or(f64::MAX)
}

// ============================================================================
// SECTION: Reconciliation
// ============================================================================

/// Reconciles attested values across sources and against the claim value.
///
/// `claim_value` is the claim's own stated value, when it carries one.
#[must_use]
pub fn reconcile(
    sources: &[EvidenceItem],
    claim_value: Option<&AttestedValue>,
) -> Vec<ShudhudhFinding> {
    let mut findings = Vec::new();

    let mut attestations: Vec<(&EvidenceItem, SourceTier, String, BigDecimal, Option<&str>)> =
        Vec::new();
    for item in sources {
        let Some(value) = &item.attested_value else {
            continue;
        };
        match normalize(value) {
            Ok((base, amount)) => {
                attestations.push((
                    item,
                    SourceTier::from_source_type(&item.source_type),
                    base,
                    amount,
                    value.period.as_deref(),
                ));
            }
            Err(reason) => {
                findings.push(ShudhudhFinding::UnitMismatch {
                    description: format!("evidence {}: {reason}", item.evidence_id),
                });
            }
        }
    }

    // Pairwise checks in stable order.
    for i in 0..attestations.len() {
        for j in (i + 1)..attestations.len() {
            let (left, left_tier, left_base, left_amount, left_period) = &attestations[i];
            let (right, right_tier, right_base, right_amount, right_period) = &attestations[j];

            if left_base != right_base {
                findings.push(ShudhudhFinding::UnitMismatch {
                    description: format!(
                        "evidence {} ({left_base}) and {} ({right_base}) do not share a unit base",
                        left.evidence_id, right.evidence_id
                    ),
                });
                continue;
            }
            if let (Some(lp), Some(rp)) = (left_period, right_period)
                && lp != rp
            {
                findings.push(ShudhudhFinding::TimeWindow {
                    description: format!(
                        "evidence {} ({lp}) and {} ({rp}) cover different periods",
                        left.evidence_id, right.evidence_id
                    ),
                });
                continue;
            }
            let discrepancy = relative_discrepancy(left_amount, right_amount);
            if discrepancy > RECONCILE_TOLERANCE && left_tier != right_tier {
                findings.push(ShudhudhFinding::Anomaly {
                    description: format!(
                        "evidence {} contradicts stronger evidence {} by {:.1}%",
                        weaker(left, right, *left_tier, *right_tier),
                        stronger(left, right, *left_tier, *right_tier),
                        discrepancy * 100.0
                    ),
                    contradicts_claim: false,
                });
            }
        }
    }

    // Claim-value contradiction by a stronger source.
    if let Some(claim_value) = claim_value
        && let Ok((claim_base, claim_amount)) = normalize(claim_value)
    {
        for (item, tier, base, amount, _) in &attestations {
            if *base != claim_base || !tier.primary_eligible() {
                continue;
            }
            let discrepancy = relative_discrepancy(amount, &claim_amount);
            if discrepancy > CONTRADICTION_THRESHOLD {
                findings.push(ShudhudhFinding::Anomaly {
                    description: format!(
                        "claim value contradicted by evidence {} ({:.1}% discrepancy)",
                        item.evidence_id,
                        discrepancy * 100.0
                    ),
                    contradicts_claim: true,
                });
            }
        }
    }

    findings
}

/// Returns the evidence id of the weaker-tier item.
fn weaker<'a>(
    left: &'a EvidenceItem,
    right: &'a EvidenceItem,
    left_tier: SourceTier,
    right_tier: SourceTier,
) -> &'a idis_core::EvidenceId {
    if left_tier > right_tier {
        &left.evidence_id
    } else {
        &right.evidence_id
    }
}

/// Returns the evidence id of the stronger-tier item.
fn stronger<'a>(
    left: &'a EvidenceItem,
    right: &'a EvidenceItem,
    left_tier: SourceTier,
    right_tier: SourceTier,
) -> &'a idis_core::EvidenceId {
    if left_tier > right_tier {
        &right.evidence_id
    } else {
        &left.evidence_id
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

    fn item(id: &str, source_type: &str, raw: &str, unit: Option<&str>, period: Option<&str>) -> EvidenceItem {
        EvidenceItem {
            evidence_id: EvidenceId::new(id),
            source_type: source_type.to_string(),
            source_system: "dataroom".to_string(),
            upstream_origin_id: Some(id.to_string()),
            document_version: None,
            latest_document_version: None,
            attested_value: Some(AttestedValue {
                raw: raw.to_string(),
                unit: unit.map(str::to_string),
                period: period.map(str::to_string),
            }),
            collusion_risk: None,
            coi_present: false,
            coi_severity: None,
            coi_disclosed: false,
        }
    }

    #[test]
    fn values_within_tolerance_reconcile_silently() {
        let sources = vec![
            item("ev-deck", "PITCH_DECK", "5000000", Some("USD"), None),
            item("ev-model", "FINANCIAL_MODEL", "5020000", Some("USD"), None),
        ];
        assert!(reconcile(&sources, None).is_empty());
    }

    #[test]
    fn unit_normalization_reconciles_thousands() {
        let sources = vec![
            item("ev-deck", "PITCH_DECK", "5200", Some("USD_K"), None),
            item("ev-model", "FINANCIAL_MODEL", "5200000", Some("USD"), None),
        ];
        assert!(reconcile(&sources, None).is_empty());
    }

    #[test]
    fn cross_tier_discrepancy_is_an_anomaly() {
        // Deck says 5.2M; model says 4.8M -> ~7.7% discrepancy.
        let sources = vec![
            item("ev-deck", "PITCH_DECK", "5200000", Some("USD"), None),
            item("ev-model", "FINANCIAL_MODEL", "4800000", Some("USD"), None),
        ];
        let findings = reconcile(&sources, None);
        assert_eq!(findings.len(), 1);
        assert!(matches!(findings[0], ShudhudhFinding::Anomaly { .. }));
    }

    #[test]
    fn stronger_source_contradicting_claim_value_is_flagged() {
        let sources = vec![item(
            "ev-model",
            "FINANCIAL_MODEL",
            "4800000",
            Some("USD"),
            None,
        )];
        let claim_value = AttestedValue {
            raw: "5200000".to_string(),
            unit: Some("USD".to_string()),
            period: None,
        };
        let findings = reconcile(&sources, Some(&claim_value));
        assert!(findings.iter().any(|finding| matches!(
            finding,
            ShudhudhFinding::Anomaly {
                contradicts_claim: true,
                ..
            }
        )));
    }

    #[test]
    fn irreconcilable_unit_bases_mismatch() {
        let sources = vec![
            item("ev-deck", "PITCH_DECK", "5200000", Some("USD"), None),
            item("ev-model", "FINANCIAL_MODEL", "4700000", Some("EUR"), None),
        ];
        let findings = reconcile(&sources, None);
        assert!(matches!(findings[0], ShudhudhFinding::UnitMismatch { .. }));
    }

    #[test]
    fn differing_periods_are_time_window_mismatches() {
        let sources = vec![
            item("ev-deck", "PITCH_DECK", "5200000", Some("USD"), Some("2025-Q4")),
            item("ev-model", "FINANCIAL_MODEL", "4800000", Some("USD"), Some("2025-Q3")),
        ];
        let findings = reconcile(&sources, None);
        assert!(matches!(findings[0], ShudhudhFinding::TimeWindow { .. }));
    }
}
