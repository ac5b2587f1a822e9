// crates/idis-gates/src/muhasabah.rs
// ============================================================================
// Module: Muḥāsabah Gate
// Description: Output-boundary self-audit enforcement for agent outputs.
// Purpose: Deny outputs whose self-audit record is absent or inconsistent.
// Dependencies: idis-core, serde
// ============================================================================

//! ## Overview
//! The gate evaluates one agent output at a time and denies when the
//! embedded record is schema-invalid, when a non-subjective output supports
//! no claims, when high confidence comes with no stated uncertainties, or
//! when the output identifiers do not match the evaluation scope. The gate
//! is always enforced; callers that skip it are outside the trust boundary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use idis_core::ActorId;
use idis_core::AgentOutput;
use idis_core::OutputId;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Confidence above which uncertainties become mandatory.
const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.80;

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Gate decision for one agent output.
///
/// # Invariants
/// - `reason` is present iff `allowed` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    /// Whether the output may enter debate state.
    pub allowed: bool,
    /// Stable denial reason, when denied.
    pub reason: Option<String>,
}

impl GateDecision {
    /// Builds an allow decision.
    #[must_use]
    pub const fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// Builds a deny decision.
    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates one agent output against the Muḥāsabah rules.
///
/// `expected_agent` and `expected_output` pin the output to the evaluation
/// scope; identifier mismatches deny.
#[must_use]
pub fn evaluate_output(
    output: &AgentOutput,
    expected_agent: &ActorId,
    expected_output: &OutputId,
) -> GateDecision {
    let record = &output.muhasabah;
    if !(0.0..=1.0).contains(&record.confidence) {
        return GateDecision::deny("confidence outside [0, 1]");
    }
    if record.evidence_summary.trim().is_empty() {
        return GateDecision::deny("evidence_summary is empty");
    }
    if !record.is_subjective && record.supported_claim_ids.is_empty() {
        return GateDecision::deny("non-subjective output supports no claims");
    }
    if record.confidence > HIGH_CONFIDENCE_THRESHOLD && record.uncertainties.is_empty() {
        return GateDecision::deny("high confidence requires stated uncertainties");
    }
    if output.agent_id != *expected_agent {
        return GateDecision::deny("agent identifier mismatch");
    }
    if output.output_id != *expected_output {
        return GateDecision::deny("output identifier mismatch");
    }
    GateDecision::allow()
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions are permitted."
    )]

    use std::collections::BTreeMap;

    use idis_core::AgentRole;
    use idis_core::ClaimId;
    use idis_core::MuhasabahRecord;
    use idis_core::Timestamp;

    use super::*;

    fn output(confidence: f64, subjective: bool, claims: &[&str], uncertainties: &[&str]) -> AgentOutput {
        AgentOutput {
            output_id: OutputId::new("out-1"),
            agent_id: ActorId::new("agent-1"),
            role: AgentRole::Advocate,
            output_type: "opening".to_string(),
            content: BTreeMap::new(),
            muhasabah: MuhasabahRecord {
                supported_claim_ids: claims.iter().map(|id| ClaimId::new(*id)).collect(),
                supported_calc_ids: vec![],
                evidence_summary: "grounded in deck and model".to_string(),
                counter_hypothesis: "growth may be channel-concentrated".to_string(),
                falsifiability_tests: vec!["check cohort retention".to_string()],
                uncertainties: uncertainties.iter().map(|u| (*u).to_string()).collect(),
                failure_modes: vec![],
                confidence,
                is_subjective: subjective,
            },
            round_number: 1,
            timestamp: Timestamp::parse("2026-03-01T00:00:00Z").unwrap(),
        }
    }

    #[test]
    fn grounded_output_passes() {
        let out = output(0.7, false, &["claim-1"], &[]);
        let decision = evaluate_output(&out, &ActorId::new("agent-1"), &OutputId::new("out-1"));
        assert!(decision.allowed);
    }

    #[test]
    fn free_facts_at_record_level_deny() {
        let out = output(0.7, false, &[], &[]);
        let decision = evaluate_output(&out, &ActorId::new("agent-1"), &OutputId::new("out-1"));
        assert!(!decision.allowed);
    }

    #[test]
    fn high_confidence_without_uncertainties_denies() {
        let out = output(0.9, false, &["claim-1"], &[]);
        let decision = evaluate_output(&out, &ActorId::new("agent-1"), &OutputId::new("out-1"));
        assert!(!decision.allowed);

        let out = output(0.9, false, &["claim-1"], &["late-stage churn unknown"]);
        let decision = evaluate_output(&out, &ActorId::new("agent-1"), &OutputId::new("out-1"));
        assert!(decision.allowed);
    }

    #[test]
    fn identifier_mismatch_denies() {
        let out = output(0.7, false, &["claim-1"], &[]);
        let decision = evaluate_output(&out, &ActorId::new("other"), &OutputId::new("out-1"));
        assert!(!decision.allowed);
    }

    #[test]
    fn subjective_output_needs_no_claims() {
        let out = output(0.5, true, &[], &[]);
        let decision = evaluate_output(&out, &ActorId::new("agent-1"), &OutputId::new("out-1"));
        assert!(decision.allowed);
    }
}
