// crates/idis-debate/src/lib.rs
// ============================================================================
// Module: IDIS Debate Orchestrator
// Description: Fixed-order role dispatch with output-boundary gating.
// Purpose: Run deterministic multi-role debates with audited stop reasons.
// Dependencies: idis-core, idis-gates, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! The debate coordinates five roles across up to five rounds in a fixed
//! node sequence. Observers run "in parallel" only logically — dispatch is
//! strictly sequential in a fixed sub-order so replays are byte-identical.
//! Every output passes the Muḥāsabah gate at the output boundary; a failing
//! output never enters state and halts the run with `CRITICAL_DEFECT`. All
//! identifiers, timestamps, and position hashes derive from
//! `(tenant_id, deal_id, role, round_number, step_index)` — the debate path
//! never reads the wall clock.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod orchestrator;
pub mod roles;
pub mod state;
pub mod stop;

pub use orchestrator::DebateOrchestrator;
pub use orchestrator::DebateOutcome;
pub use orchestrator::GateFailure;
pub use orchestrator::NODE_ORDER;
pub use orchestrator::RoleInvocation;
pub use orchestrator::derived_agent_id;
pub use roles::RoleResult;
pub use roles::RoleRunner;
pub use roles::RoleRunners;
pub use state::DebateConfig;
pub use state::DebateConfigError;
pub use state::DebateState;
pub use state::PositionSnapshot;
pub use state::StopReason;
pub use stop::check_stop_condition;
