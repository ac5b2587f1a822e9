// crates/idis-debate/tests/debate_flow.rs
// ============================================================================
// Module: Debate Flow Tests
// Description: Node order, gating, stop conditions, and replay determinism.
// ============================================================================
//! ## Overview
//! Verifies the fixed node sequence (observers in sub-order), per-output
//! gate enforcement with CRITICAL_DEFECT halts, priority-ordered stop
//! conditions, and byte-identical state trajectories across replays.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;

use idis_core::AgentOutput;
use idis_core::ClaimId;
use idis_core::DealId;
use idis_core::MuhasabahRecord;
use idis_core::TenantId;
use idis_debate::DebateConfig;
use idis_debate::DebateOrchestrator;
use idis_debate::DebateState;
use idis_debate::RoleInvocation;
use idis_debate::RoleResult;
use idis_debate::RoleRunner;
use idis_debate::RoleRunners;
use idis_debate::StopReason;
use serde_json::json;

/// Role runner producing one well-grounded output per invocation.
struct GroundedRole {
    /// Confidence stamped into outputs.
    confidence: f64,
    /// Whether to omit supported claims (forcing a gate rejection).
    drop_claims: bool,
}

impl GroundedRole {
    const fn new(confidence: f64) -> Self {
        Self {
            confidence,
            drop_claims: false,
        }
    }
}

impl RoleRunner for GroundedRole {
    fn run(&self, _state: &DebateState, invocation: &RoleInvocation) -> RoleResult {
        let claims = if self.drop_claims {
            vec![]
        } else {
            vec![ClaimId::new("claim-1")]
        };
        let mut content = BTreeMap::new();
        content.insert(
            "position_hash".to_string(),
            json!(format!("pos-{}", invocation.role.label())),
        );
        RoleResult {
            outputs: vec![AgentOutput {
                output_id: invocation.output_id(0),
                agent_id: invocation.agent_id.clone(),
                role: invocation.role,
                output_type: invocation.node.to_string(),
                content,
                muhasabah: MuhasabahRecord {
                    supported_claim_ids: claims,
                    supported_calc_ids: vec![],
                    evidence_summary: "grounded in graded claims".to_string(),
                    counter_hypothesis: "figures may be stale".to_string(),
                    falsifiability_tests: vec!["re-pull bank data".to_string()],
                    uncertainties: vec!["cohort mix unknown".to_string()],
                    failure_modes: vec![],
                    confidence: self.confidence,
                    is_subjective: false,
                },
                round_number: invocation.round_number,
                timestamp: invocation.timestamp(),
            }],
            evidence_retrieval_requested: false,
            flags_critical_defect: false,
            open_questions: vec![],
        }
    }
}

fn state() -> DebateState {
    DebateState::new(TenantId::new("tenant-1"), DealId::new("deal-1"))
}

#[test]
fn consensus_stops_after_one_round_with_tight_confidences() {
    let advocate = GroundedRole::new(0.80);
    let breaker = GroundedRole::new(0.78);
    let contradiction = GroundedRole::new(0.75);
    let risk = GroundedRole::new(0.77);
    let arbiter = GroundedRole::new(0.79);
    let orchestrator = DebateOrchestrator::new(
        DebateConfig::default(),
        RoleRunners {
            advocate: &advocate,
            sanad_breaker: &breaker,
            contradiction_finder: &contradiction,
            risk_officer: &risk,
            arbiter: &arbiter,
        },
    );

    let outcome = orchestrator.run(state());
    assert_eq!(outcome.state.stop_reason, Some(StopReason::Consensus));
    assert!(outcome.state.consensus_reached);
    assert!(outcome.gate_failure.is_none());
    // 6 outputs in round 1: advocate x2 (opening + rebuttal), breaker,
    // both observers, arbiter.
    assert_eq!(outcome.state.agent_outputs.len(), 6);
}

#[test]
fn node_sequence_is_fixed_with_observer_sub_order() {
    let advocate = GroundedRole::new(0.80);
    let breaker = GroundedRole::new(0.78);
    let contradiction = GroundedRole::new(0.75);
    let risk = GroundedRole::new(0.77);
    let arbiter = GroundedRole::new(0.79);
    let orchestrator = DebateOrchestrator::new(
        DebateConfig::default(),
        RoleRunners {
            advocate: &advocate,
            sanad_breaker: &breaker,
            contradiction_finder: &contradiction,
            risk_officer: &risk,
            arbiter: &arbiter,
        },
    );

    let outcome = orchestrator.run(state());
    assert_eq!(
        outcome.state.nodes_visited,
        vec![
            "advocate_opening",
            "sanad_breaker_challenge",
            "observer_critiques_parallel",
            "observer_critiques_parallel",
            "advocate_rebuttal",
            "arbiter_close",
            "stop_condition_check",
            "muhasabah_validate_all",
            "finalize_outputs",
        ]
    );
    // Observer sub-order: contradiction finder dispatches before risk officer.
    let observer_roles: Vec<String> = outcome
        .state
        .agent_outputs
        .iter()
        .filter(|output| output.output_type == "observer_critiques_parallel")
        .map(|output| output.role.label().to_string())
        .collect();
    assert_eq!(observer_roles, vec!["CONTRADICTION_FINDER", "RISK_OFFICER"]);
}

#[test]
fn replays_produce_byte_identical_trajectories() {
    let run_once = || {
        let advocate = GroundedRole::new(0.80);
        let breaker = GroundedRole::new(0.78);
        let contradiction = GroundedRole::new(0.75);
        let risk = GroundedRole::new(0.77);
        let arbiter = GroundedRole::new(0.79);
        let orchestrator = DebateOrchestrator::new(
            DebateConfig::default(),
            RoleRunners {
                advocate: &advocate,
                sanad_breaker: &breaker,
                contradiction_finder: &contradiction,
                risk_officer: &risk,
                arbiter: &arbiter,
            },
        );
        serde_json::to_string(&orchestrator.run(state()).state).unwrap()
    };
    assert_eq!(run_once(), run_once());
}

#[test]
fn gate_rejection_halts_with_critical_defect_and_excludes_output() {
    let advocate = GroundedRole::new(0.80);
    let ungrounded = GroundedRole {
        confidence: 0.78,
        drop_claims: true,
    };
    let contradiction = GroundedRole::new(0.75);
    let risk = GroundedRole::new(0.77);
    let arbiter = GroundedRole::new(0.79);
    let orchestrator = DebateOrchestrator::new(
        DebateConfig::default(),
        RoleRunners {
            advocate: &advocate,
            sanad_breaker: &ungrounded,
            contradiction_finder: &contradiction,
            risk_officer: &risk,
            arbiter: &arbiter,
        },
    );

    let outcome = orchestrator.run(state());
    assert_eq!(outcome.state.stop_reason, Some(StopReason::CriticalDefect));
    let failure = outcome.gate_failure.unwrap();
    assert_eq!(failure.agent_id.as_str(), "agent-sanad_breaker");
    // The rejected output never entered state; only the opening survived.
    assert_eq!(outcome.state.agent_outputs.len(), 1);
}

#[test]
fn wide_confidence_spread_runs_to_the_round_cap() {
    let advocate = GroundedRole::new(0.95);
    let breaker = GroundedRole::new(0.40);
    let contradiction = GroundedRole::new(0.60);
    let risk = GroundedRole::new(0.75);
    let arbiter = GroundedRole::new(0.85);
    let config = DebateConfig::new(3, 0.10, 5).unwrap();
    let orchestrator = DebateOrchestrator::new(
        config,
        RoleRunners {
            advocate: &advocate,
            sanad_breaker: &breaker,
            contradiction_finder: &contradiction,
            risk_officer: &risk,
            arbiter: &arbiter,
        },
    );

    let outcome = orchestrator.run(state());
    assert_eq!(outcome.state.stop_reason, Some(StopReason::MaxRounds));
    assert_eq!(outcome.state.round_number, 3);
}
