// crates/idis-debate/src/stop.rs
// ============================================================================
// Module: Debate Stop Conditions
// Description: Priority-ordered stop-condition evaluation.
// Purpose: End debates deterministically; first matching condition wins.
// Dependencies: crate::state
// ============================================================================

//! ## Overview
//! Stop conditions are evaluated in strict priority order after each round:
//! critical defect, max rounds, consensus, stable dissent, evidence
//! exhausted. The first match wins; a round with no match loops the debate
//! back for another round.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::state::DebateConfig;
use crate::state::DebateState;
use crate::state::StopReason;

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates stop conditions in priority order; `None` means keep debating.
#[must_use]
pub fn check_stop_condition(state: &DebateState, config: &DebateConfig) -> Option<StopReason> {
    if state.critical_defect_flagged {
        return Some(StopReason::CriticalDefect);
    }
    if state.round_number >= config.max_rounds() {
        return Some(StopReason::MaxRounds);
    }
    if consensus_reached(state, config) {
        return Some(StopReason::Consensus);
    }
    if stable_dissent(state, config) {
        return Some(StopReason::StableDissent);
    }
    if state.evidence_retrieval_requested
        && state.evidence_retrieval_completed
        && !state.new_evidence_found
        && !state.open_questions.is_empty()
    {
        return Some(StopReason::EvidenceExhausted);
    }
    None
}

/// Returns whether all current-round confidences lie within the spread.
fn consensus_reached(state: &DebateState, config: &DebateConfig) -> bool {
    let confidences: Vec<f64> = state
        .current_round_outputs()
        .iter()
        .map(|output| output.muhasabah.confidence)
        .collect();
    if confidences.len() < 2 {
        return false;
    }
    let max = confidences.iter().fold(f64::MIN, |acc, c| acc.max(*c));
    let min = confidences.iter().fold(f64::MAX, |acc, c| acc.min(*c));
    (max - min) <= config.consensus_spread()
}

/// Returns whether per-agent positions are unchanged across the window.
fn stable_dissent(state: &DebateState, config: &DebateConfig) -> bool {
    let window = config.stable_dissent_rounds() as usize;
    if state.position_history.len() < window || window < 2 {
        return false;
    }
    let recent = &state.position_history[state.position_history.len() - window..];
    let reference = &recent[0].agent_positions;
    if reference.is_empty() {
        return false;
    }
    recent
        .iter()
        .skip(1)
        .all(|snapshot| snapshot.agent_positions == *reference)
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions are permitted."
    )]

    use std::collections::BTreeMap;

    use idis_core::DealId;
    use idis_core::TenantId;

    use super::*;
    use crate::state::PositionSnapshot;

    fn state() -> DebateState {
        DebateState::new(TenantId::new("tenant-1"), DealId::new("deal-1"))
    }

    fn snapshot(round: u32, positions: &[(&str, &str)]) -> PositionSnapshot {
        PositionSnapshot {
            round_number: round,
            agent_positions: positions
                .iter()
                .map(|(agent, hash)| ((*agent).to_string(), (*hash).to_string()))
                .collect(),
            agent_confidences: BTreeMap::new(),
        }
    }

    #[test]
    fn critical_defect_has_highest_priority() {
        let mut s = state();
        s.critical_defect_flagged = true;
        s.round_number = 5;
        let config = DebateConfig::default();
        assert_eq!(
            check_stop_condition(&s, &config),
            Some(StopReason::CriticalDefect)
        );
    }

    #[test]
    fn max_rounds_stops_at_the_cap() {
        let mut s = state();
        s.round_number = 5;
        let config = DebateConfig::default();
        assert_eq!(check_stop_condition(&s, &config), Some(StopReason::MaxRounds));
    }

    #[test]
    fn stable_dissent_needs_identical_positions_across_window() {
        let mut s = state();
        s.position_history = vec![
            snapshot(1, &[("advocate", "h1"), ("arbiter", "h2")]),
            snapshot(2, &[("advocate", "h1"), ("arbiter", "h2")]),
        ];
        let config = DebateConfig::default();
        assert_eq!(
            check_stop_condition(&s, &config),
            Some(StopReason::StableDissent)
        );

        s.position_history[1] = snapshot(2, &[("advocate", "h1"), ("arbiter", "h3")]);
        assert_eq!(check_stop_condition(&s, &config), None);
    }

    #[test]
    fn evidence_exhausted_requires_open_questions() {
        let mut s = state();
        s.evidence_retrieval_requested = true;
        s.evidence_retrieval_completed = true;
        s.new_evidence_found = false;
        let config = DebateConfig::default();
        assert_eq!(check_stop_condition(&s, &config), None);

        s.open_questions.push("churn unexplained".to_string());
        assert_eq!(
            check_stop_condition(&s, &config),
            Some(StopReason::EvidenceExhausted)
        );
    }
}
