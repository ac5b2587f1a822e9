// crates/idis-debate/src/roles.rs
// ============================================================================
// Module: Debate Roles
// Description: The role-runner seam and the injected role collection.
// Purpose: Keep role logic outside the orchestrator, dispatch deterministic.
// Dependencies: crate::{orchestrator, state}, idis-core
// ============================================================================

//! ## Overview
//! Role runners are injected — the orchestrator owns sequencing, identity
//! derivation, and gating, never role content. A runner receives the current
//! state and a fully derived invocation (role, round, step, output id, agent
//! id, timestamp) and must stamp its outputs with exactly those identifiers;
//! the gate rejects anything else.

// ============================================================================
// SECTION: Imports
// ============================================================================

use idis_core::AgentOutput;

use crate::orchestrator::RoleInvocation;
use crate::state::DebateState;

// ============================================================================
// SECTION: Role Result
// ============================================================================

/// What one role invocation produced.
///
/// # Invariants
/// - `outputs` are stamped with the invocation's identifiers.
#[derive(Debug, Clone, Default)]
pub struct RoleResult {
    /// Outputs to gate and (when accepted) append to state.
    pub outputs: Vec<AgentOutput>,
    /// Whether the role requested evidence retrieval this round.
    pub evidence_retrieval_requested: bool,
    /// Whether the role flagged a grade-D material claim.
    pub flags_critical_defect: bool,
    /// Open questions the role wants carried forward.
    pub open_questions: Vec<String>,
}

// ============================================================================
// SECTION: Role Runner
// ============================================================================

/// One debate role's behavior.
pub trait RoleRunner: Send + Sync {
    /// Produces this role's outputs for the invocation.
    fn run(&self, state: &DebateState, invocation: &RoleInvocation) -> RoleResult;
}

// ============================================================================
// SECTION: Runner Collection
// ============================================================================

/// The five injected debate role runners.
pub struct RoleRunners<'a> {
    /// Argues the deal's strengths.
    pub advocate: &'a dyn RoleRunner,
    /// Attacks provenance chains.
    pub sanad_breaker: &'a dyn RoleRunner,
    /// Hunts cross-claim contradictions.
    pub contradiction_finder: &'a dyn RoleRunner,
    /// Surfaces downside risks.
    pub risk_officer: &'a dyn RoleRunner,
    /// Closes each round with a reasoned position.
    pub arbiter: &'a dyn RoleRunner,
}
