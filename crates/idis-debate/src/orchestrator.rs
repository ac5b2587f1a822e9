// crates/idis-debate/src/orchestrator.rs
// ============================================================================
// Module: Debate Orchestration Logic
// Description: The fixed node sequence, identity derivation, and gating.
// Purpose: Produce byte-identical state trajectories for identical inputs.
// Dependencies: crate::{roles, state, stop}, idis-core, idis-gates
// ============================================================================

//! ## Overview
//! One round visits, in order: `advocate_opening`,
//! `sanad_breaker_challenge`, `observer_critiques_parallel` (contradiction
//! finder then risk officer, fixed sub-order), `advocate_rebuttal`, the
//! conditional `evidence_call_retrieval`, `arbiter_close`, and
//! `stop_condition_check`. When a stop reason is set the run proceeds to
//! `muhasabah_validate_all` and `finalize_outputs`; otherwise the round
//! number increments and the sequence repeats. Identity derivation hashes
//! `(tenant_id, deal_id, role, round_number, step_index)` so two runs with
//! identical inputs produce identical ids, timestamps, and position hashes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use idis_core::ActorId;
use idis_core::AgentRole;
use idis_core::OutputId;
use idis_core::Timestamp;
use idis_core::hash_canonical_json;
use idis_gates::GateDecision;
use idis_gates::evaluate_output;
use tracing::info;
use tracing::warn;

use crate::roles::RoleResult;
use crate::roles::RoleRunner;
use crate::roles::RoleRunners;
use crate::state::DebateConfig;
use crate::state::DebateState;
use crate::state::PositionSnapshot;
use crate::state::StopReason;
use crate::stop::check_stop_condition;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Unix-seconds epoch all derived debate timestamps offset from.
const DEBATE_EPOCH_SECONDS: i64 = 1_767_225_600;

/// Normative node order within one round (excluding terminal nodes).
pub const NODE_ORDER: &[&str] = &[
    "advocate_opening",
    "sanad_breaker_challenge",
    "observer_critiques_parallel",
    "advocate_rebuttal",
    "evidence_call_retrieval",
    "arbiter_close",
    "stop_condition_check",
];

// ============================================================================
// SECTION: Role Invocation
// ============================================================================

/// Fully derived identity for one role dispatch.
///
/// # Invariants
/// - All fields derive from `(tenant, deal, role, round, step_index)`;
///   nothing here comes from the wall clock or randomness.
#[derive(Debug, Clone)]
pub struct RoleInvocation {
    /// Role being dispatched.
    pub role: AgentRole,
    /// Node name for `nodes_visited`.
    pub node: &'static str,
    /// Round number, 1-based.
    pub round_number: u32,
    /// Step index within the round.
    pub step_index: u32,
    /// Derived agent identifier for the role.
    pub agent_id: ActorId,
    /// Derivation seed carried for per-output ids.
    seed: String,
}

impl RoleInvocation {
    /// Derives the invocation for a role dispatch.
    fn derive(state: &DebateState, role: AgentRole, node: &'static str, step_index: u32) -> Self {
        let seed = derive_seed(state, role, state.round_number, step_index);
        Self {
            role,
            node,
            round_number: state.round_number,
            step_index,
            agent_id: agent_id_for(role),
            seed,
        }
    }

    /// Returns the derived output identifier for output `index`.
    #[must_use]
    pub fn output_id(&self, index: usize) -> OutputId {
        OutputId::new(format!("out-{}-{index}", &self.seed[..24]))
    }

    /// Returns the derived timestamp for this invocation.
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        let offset =
            i64::from(self.round_number) * 3_600 + i64::from(self.step_index) * 60;
        Timestamp::from_unix_seconds(DEBATE_EPOCH_SECONDS + offset)
            .unwrap_or_else(|_| Timestamp::now())
    }
}

/// Derives the hex seed for one `(tenant, deal, role, round, step)` tuple.
fn derive_seed(state: &DebateState, role: AgentRole, round: u32, step: u32) -> String {
    hash_canonical_json(&(
        state.tenant_id.as_str(),
        state.deal_id.as_str(),
        role.label(),
        round,
        step,
    ))
    .map_or_else(|_| format!("{role}-{round}-{step}"), |digest| digest.as_str().to_string())
}

/// Returns the stable agent identifier for a role.
fn agent_id_for(role: AgentRole) -> ActorId {
    ActorId::new(format!("agent-{}", role.label().to_lowercase()))
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// A gate rejection retained for caller inspection.
#[derive(Debug, Clone)]
pub struct GateFailure {
    /// Output that failed the gate.
    pub output_id: OutputId,
    /// Producing agent.
    pub agent_id: ActorId,
    /// The gate's decision.
    pub decision: GateDecision,
}

/// Final debate outcome.
#[derive(Debug, Clone)]
pub struct DebateOutcome {
    /// Final state after completion or halt.
    pub state: DebateState,
    /// Gate failure details when the run halted on a rejection.
    pub gate_failure: Option<GateFailure>,
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Deterministic debate orchestrator with injected role runners.
pub struct DebateOrchestrator<'a> {
    /// Validated configuration.
    config: DebateConfig,
    /// Injected role runners.
    runners: RoleRunners<'a>,
}

impl<'a> DebateOrchestrator<'a> {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(config: DebateConfig, runners: RoleRunners<'a>) -> Self {
        Self { config, runners }
    }

    /// Runs the debate to completion or halt.
    #[must_use]
    pub fn run(&self, initial_state: DebateState) -> DebateOutcome {
        let mut state = initial_state;
        let mut gate_failure = None;

        loop {
            let halted = self.run_round(&mut state, &mut gate_failure);
            if halted || state.stop_reason.is_some() {
                break;
            }
            state.round_number += 1;
        }

        self.validate_all(&mut state, &mut gate_failure);
        state.nodes_visited.push("finalize_outputs".to_string());
        info!(
            rounds = state.round_number,
            outputs = state.agent_outputs.len(),
            "debate finished"
        );
        DebateOutcome {
            state,
            gate_failure,
        }
    }

    /// Executes one round; returns true when the run halted mid-round.
    fn run_round(&self, state: &mut DebateState, gate_failure: &mut Option<GateFailure>) -> bool {
        let dispatches: [(&'static str, AgentRole, &dyn RoleRunner, u32); 4] = [
            ("advocate_opening", AgentRole::Advocate, self.runners.advocate, 0),
            (
                "sanad_breaker_challenge",
                AgentRole::SanadBreaker,
                self.runners.sanad_breaker,
                1,
            ),
            (
                "observer_critiques_parallel",
                AgentRole::ContradictionFinder,
                self.runners.contradiction_finder,
                2,
            ),
            (
                "observer_critiques_parallel",
                AgentRole::RiskOfficer,
                self.runners.risk_officer,
                3,
            ),
        ];
        for (node, role, runner, step) in dispatches {
            if self.dispatch_role(state, runner, role, node, step, gate_failure) {
                return true;
            }
        }

        if self.dispatch_role(
            state,
            self.runners.advocate,
            AgentRole::Advocate,
            "advocate_rebuttal",
            4,
            gate_failure,
        ) {
            return true;
        }

        if state.evidence_retrieval_requested && !state.evidence_retrieval_completed {
            state
                .nodes_visited
                .push("evidence_call_retrieval".to_string());
            state.evidence_retrieval_completed = true;
        }

        if self.dispatch_role(
            state,
            self.runners.arbiter,
            AgentRole::Arbiter,
            "arbiter_close",
            6,
            gate_failure,
        ) {
            return true;
        }
        let snapshot = build_position_snapshot(state);
        state.position_history.push(snapshot);

        state.nodes_visited.push("stop_condition_check".to_string());
        if let Some(reason) = check_stop_condition(state, &self.config) {
            state.stop_reason = Some(reason);
            if reason == StopReason::Consensus {
                state.consensus_reached = true;
            }
        }
        false
    }

    /// Dispatches one role and gates its outputs; returns true on halt.
    fn dispatch_role(
        &self,
        state: &mut DebateState,
        runner: &dyn RoleRunner,
        role: AgentRole,
        node: &'static str,
        step_index: u32,
        gate_failure: &mut Option<GateFailure>,
    ) -> bool {
        let invocation = RoleInvocation::derive(state, role, node, step_index);
        let result = runner.run(state, &invocation);
        state.nodes_visited.push(node.to_string());
        self.apply_role_result(state, &invocation, result, gate_failure)
    }

    /// Applies a role result, enforcing the gate per output.
    fn apply_role_result(
        &self,
        state: &mut DebateState,
        invocation: &RoleInvocation,
        result: RoleResult,
        gate_failure: &mut Option<GateFailure>,
    ) -> bool {
        for (index, output) in result.outputs.into_iter().enumerate() {
            let expected_output = invocation.output_id(index);
            let decision = evaluate_output(&output, &invocation.agent_id, &expected_output);
            if !decision.allowed {
                warn!(agent = %output.agent_id, "output rejected at the gate");
                state.stop_reason = Some(StopReason::CriticalDefect);
                *gate_failure = Some(GateFailure {
                    output_id: output.output_id.clone(),
                    agent_id: output.agent_id.clone(),
                    decision,
                });
                return true;
            }
            state.agent_outputs.push(output);
        }
        if result.evidence_retrieval_requested {
            state.evidence_retrieval_requested = true;
        }
        if result.flags_critical_defect {
            state.critical_defect_flagged = true;
        }
        for question in result.open_questions {
            if !state.open_questions.contains(&question) {
                state.open_questions.push(question);
            }
        }
        false
    }

    /// Re-validates every accepted output before finalization.
    fn validate_all(&self, state: &mut DebateState, gate_failure: &mut Option<GateFailure>) {
        state
            .nodes_visited
            .push("muhasabah_validate_all".to_string());
        if gate_failure.is_some() {
            state.stop_reason = Some(StopReason::CriticalDefect);
            return;
        }
        let failed = state.agent_outputs.iter().find_map(|output| {
            let decision = evaluate_output(output, &output.agent_id, &output.output_id);
            if decision.allowed {
                None
            } else {
                Some(GateFailure {
                    output_id: output.output_id.clone(),
                    agent_id: output.agent_id.clone(),
                    decision,
                })
            }
        });
        if let Some(failure) = failed {
            state.stop_reason = Some(StopReason::CriticalDefect);
            *gate_failure = Some(failure);
        }
    }
}

// ============================================================================
// SECTION: Snapshots
// ============================================================================

/// Builds the position snapshot for the current round.
fn build_position_snapshot(state: &DebateState) -> PositionSnapshot {
    let mut snapshot = PositionSnapshot {
        round_number: state.round_number,
        agent_positions: std::collections::BTreeMap::new(),
        agent_confidences: std::collections::BTreeMap::new(),
    };
    for output in state.current_round_outputs() {
        let position_hash = output
            .content
            .get("position_hash")
            .and_then(serde_json::Value::as_str)
            .map_or_else(
                || {
                    hash_canonical_json(&output.content)
                        .map_or_else(|_| String::new(), |digest| digest.as_str().to_string())
                },
                str::to_string,
            );
        snapshot
            .agent_positions
            .insert(output.agent_id.to_string(), position_hash);
        snapshot
            .agent_confidences
            .insert(output.agent_id.to_string(), output.muhasabah.confidence);
    }
    snapshot
}

// Helper visible to tests and callers that need to pre-compute identities.
/// Returns the derived agent identifier for a role.
#[must_use]
pub fn derived_agent_id(role: AgentRole) -> ActorId {
    agent_id_for(role)
}
