// crates/idis-core/src/core/agents.rs
// ============================================================================
// Module: IDIS Agent Output Model
// Description: Agent outputs and the Muḥāsabah self-audit record.
// Purpose: Describe the structures evaluated at the output boundary.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! Every agent output carries a [`MuhasabahRecord`]: the evidence references,
//! counter-hypothesis, falsifiability tests, uncertainties, and confidence
//! that make the output auditable. The Muḥāsabah gate in `idis-gates`
//! evaluates these records; this module only defines the value types and
//! their structural invariants.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ActorId;
use crate::core::identifiers::CalcId;
use crate::core::identifiers::ClaimId;
use crate::core::identifiers::OutputId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Agent Roles
// ============================================================================

/// Agent roles recognised across debate and deliverables.
///
/// # Invariants
/// - Variants are stable for serialization and bundle validation.
/// - The first five are debate roles; all eight are required report types
///   for deliverable generation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentRole {
    /// Argues the deal's strengths.
    Advocate,
    /// Attacks provenance chains.
    SanadBreaker,
    /// Hunts cross-claim contradictions.
    ContradictionFinder,
    /// Surfaces downside risks.
    RiskOfficer,
    /// Closes each round with a reasoned position.
    Arbiter,
    /// Financial analysis report author.
    FinancialAnalyst,
    /// Market analysis report author.
    MarketAnalyst,
    /// Technical diligence report author.
    TechnicalDiligence,
}

impl AgentRole {
    /// Returns the stable upper-case label for this role.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Advocate => "ADVOCATE",
            Self::SanadBreaker => "SANAD_BREAKER",
            Self::ContradictionFinder => "CONTRADICTION_FINDER",
            Self::RiskOfficer => "RISK_OFFICER",
            Self::Arbiter => "ARBITER",
            Self::FinancialAnalyst => "FINANCIAL_ANALYST",
            Self::MarketAnalyst => "MARKET_ANALYST",
            Self::TechnicalDiligence => "TECHNICAL_DILIGENCE",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SECTION: Muḥāsabah Record
// ============================================================================

/// Self-audit record attached to every agent output.
///
/// # Invariants
/// - `supported_claim_ids` is non-empty unless `is_subjective`.
/// - `uncertainties` is non-empty when `confidence > 0.80`.
/// - `confidence` lies in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuhasabahRecord {
    /// Claims the output relies on.
    pub supported_claim_ids: Vec<ClaimId>,
    /// Calculations the output relies on.
    pub supported_calc_ids: Vec<CalcId>,
    /// Short summary of the evidence relied on.
    pub evidence_summary: String,
    /// Strongest hypothesis against the output's position.
    pub counter_hypothesis: String,
    /// Tests that would falsify the position.
    pub falsifiability_tests: Vec<String>,
    /// Known uncertainties.
    pub uncertainties: Vec<String>,
    /// Failure modes the agent identified.
    pub failure_modes: Vec<String>,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Whether the output is an opinion rather than a factual position.
    pub is_subjective: bool,
}

// ============================================================================
// SECTION: Agent Output
// ============================================================================

/// One output produced by an agent during a debate round.
///
/// # Invariants
/// - `agent_id` and `output_id` must match the embedded record's scope at
///   the gate; mismatches are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Output identifier (deterministically derived in the debate path).
    pub output_id: OutputId,
    /// Producing agent identifier.
    pub agent_id: ActorId,
    /// Role the agent played.
    pub role: AgentRole,
    /// Output-type label (e.g. `opening`, `challenge`, `rebuttal`).
    pub output_type: String,
    /// Structured content payload.
    pub content: BTreeMap<String, Value>,
    /// Embedded self-audit record.
    pub muhasabah: MuhasabahRecord,
    /// Debate round that produced the output.
    pub round_number: u32,
    /// Output timestamp (derived, not wall-clock, in the debate path).
    pub timestamp: Timestamp,
}
