// crates/idis-debate/src/state.rs
// ============================================================================
// Module: Debate State
// Description: Debate configuration, state, snapshots, and stop reasons.
// Purpose: Capture the full deterministic trajectory of one debate.
// Dependencies: idis-core, serde, thiserror
// ============================================================================

//! ## Overview
//! Debate state is append-only: outputs, visited nodes, and position
//! snapshots accumulate; nothing is rewritten. Configuration is validated at
//! construction — `max_rounds` is hard-capped at five and values above it
//! are rejected, not clamped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use idis_core::AgentOutput;
use idis_core::DealId;
use idis_core::TenantId;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Hard cap on debate rounds.
pub const MAX_ROUNDS_HARD_CAP: u32 = 5;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Debate configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum DebateConfigError {
    /// `max_rounds` was zero or above the hard cap.
    #[error("max_rounds must be in 1..={MAX_ROUNDS_HARD_CAP}, got {0}")]
    MaxRounds(u32),
    /// `consensus_spread` was outside `(0, 1]`.
    #[error("consensus_spread must be in (0, 1], got {0}")]
    ConsensusSpread(f64),
    /// `stable_dissent_rounds` was zero.
    #[error("stable_dissent_rounds must be at least 1")]
    StableDissentRounds,
}

/// Validated debate configuration.
///
/// # Invariants
/// - `max_rounds <= MAX_ROUNDS_HARD_CAP`; construction rejects violations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DebateConfig {
    /// Maximum rounds before `MAX_ROUNDS` stops the debate.
    max_rounds: u32,
    /// Confidence spread within which the round reaches consensus.
    consensus_spread: f64,
    /// Snapshots across which unchanged positions mean stable dissent.
    stable_dissent_rounds: u32,
}

impl DebateConfig {
    /// Builds a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DebateConfigError`] for out-of-range values; `max_rounds`
    /// above the hard cap is rejected, never clamped.
    pub fn new(
        max_rounds: u32,
        consensus_spread: f64,
        stable_dissent_rounds: u32,
    ) -> Result<Self, DebateConfigError> {
        if max_rounds == 0 || max_rounds > MAX_ROUNDS_HARD_CAP {
            return Err(DebateConfigError::MaxRounds(max_rounds));
        }
        if !(consensus_spread > 0.0 && consensus_spread <= 1.0) {
            return Err(DebateConfigError::ConsensusSpread(consensus_spread));
        }
        if stable_dissent_rounds == 0 {
            return Err(DebateConfigError::StableDissentRounds);
        }
        Ok(Self {
            max_rounds,
            consensus_spread,
            stable_dissent_rounds,
        })
    }

    /// Returns the maximum round count.
    #[must_use]
    pub const fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Returns the consensus confidence spread.
    #[must_use]
    pub const fn consensus_spread(&self) -> f64 {
        self.consensus_spread
    }

    /// Returns the stable-dissent snapshot window.
    #[must_use]
    pub const fn stable_dissent_rounds(&self) -> u32 {
        self.stable_dissent_rounds
    }
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            max_rounds: MAX_ROUNDS_HARD_CAP,
            consensus_spread: 0.10,
            stable_dissent_rounds: 2,
        }
    }
}

// ============================================================================
// SECTION: Stop Reasons
// ============================================================================

/// Why a debate stopped, in evaluation priority order.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopReason {
    /// An output flagged a grade-D material claim or failed the gate.
    CriticalDefect,
    /// The round cap was reached.
    MaxRounds,
    /// All current-round confidences lie within the configured spread.
    Consensus,
    /// Positions unchanged across the stable-dissent window.
    StableDissent,
    /// Retrieval completed, found nothing new, yet questions remain.
    EvidenceExhausted,
}

// ============================================================================
// SECTION: Snapshots
// ============================================================================

/// Per-round position snapshot used for stable-dissent detection.
///
/// # Invariants
/// - Maps are keyed by agent identifier for deterministic iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// Round the snapshot covers.
    pub round_number: u32,
    /// Position hash per agent.
    pub agent_positions: BTreeMap<String, String>,
    /// Confidence per agent.
    pub agent_confidences: BTreeMap<String, f64>,
}

// ============================================================================
// SECTION: Debate State
// ============================================================================

/// Full debate state; append-only across nodes and rounds.
///
/// # Invariants
/// - `round_number` starts at 1 and only increments.
/// - Every output in `agent_outputs` passed the Muḥāsabah gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateState {
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Deal scope.
    pub deal_id: DealId,
    /// Current round, 1-based.
    pub round_number: u32,
    /// Nodes visited, in execution order.
    pub nodes_visited: Vec<String>,
    /// Gate-accepted agent outputs.
    pub agent_outputs: Vec<AgentOutput>,
    /// Position snapshots, one per completed round.
    pub position_history: Vec<PositionSnapshot>,
    /// Whether any role requested evidence retrieval.
    pub evidence_retrieval_requested: bool,
    /// Whether the retrieval node has completed.
    pub evidence_retrieval_completed: bool,
    /// Whether retrieval surfaced new evidence.
    pub new_evidence_found: bool,
    /// Open questions carried across rounds.
    pub open_questions: Vec<String>,
    /// Whether any output flagged a grade-D material claim.
    pub critical_defect_flagged: bool,
    /// Stop reason, once determined.
    pub stop_reason: Option<StopReason>,
    /// Whether the stop was a consensus.
    pub consensus_reached: bool,
}

impl DebateState {
    /// Creates the initial state for a deal.
    #[must_use]
    pub fn new(tenant_id: TenantId, deal_id: DealId) -> Self {
        Self {
            tenant_id,
            deal_id,
            round_number: 1,
            nodes_visited: Vec::new(),
            agent_outputs: Vec::new(),
            position_history: Vec::new(),
            evidence_retrieval_requested: false,
            evidence_retrieval_completed: false,
            new_evidence_found: false,
            open_questions: Vec::new(),
            critical_defect_flagged: false,
            stop_reason: None,
            consensus_reached: false,
        }
    }

    /// Returns the outputs produced in the current round.
    #[must_use]
    pub fn current_round_outputs(&self) -> Vec<&AgentOutput> {
        self.agent_outputs
            .iter()
            .filter(|output| output.round_number == self.round_number)
            .collect()
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
    fn max_rounds_above_hard_cap_rejects() {
        assert!(DebateConfig::new(6, 0.10, 2).is_err());
        assert!(DebateConfig::new(0, 0.10, 2).is_err());
        assert!(DebateConfig::new(5, 0.10, 2).is_ok());
    }

    #[test]
    fn consensus_spread_must_be_a_fraction() {
        assert!(DebateConfig::new(3, 0.0, 2).is_err());
        assert!(DebateConfig::new(3, 1.5, 2).is_err());
        assert!(DebateConfig::new(3, 1.0, 2).is_ok());
    }
}
