// crates/idis-runs/src/lib.rs
// ============================================================================
// Module: IDIS Run Orchestrator
// Description: Canonical step execution with a durable ledger and audit.
// Purpose: Execute pipeline runs idempotently with fail-closed audit.
// Dependencies: idis-core, idis-audit, serde_json, thiserror, tracing, uuid
// ============================================================================

//! ## Overview
//! The orchestrator traverses the canonical step sequence for a run's mode,
//! recording every attempt in the step ledger and emitting an audit event at
//! each transition. `COMPLETED` steps are skipped on resume with their stored
//! summaries merged back into the running context; `FAILED` steps retry with
//! an incremented `retry_count`. The orchestrator owns no business logic —
//! handlers are injected per step, and a missing required handler fails
//! closed. Audit emission failure aborts the run immediately.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod ledger;
pub mod orchestrator;

pub use ledger::InMemoryRunStepsRepo;
pub use ledger::LedgerError;
pub use ledger::RunStepsRepo;
pub use orchestrator::OrchestratorResult;
pub use orchestrator::RunContext;
pub use orchestrator::RunError;
pub use orchestrator::RunOrchestrator;
pub use orchestrator::StepHandler;
pub use orchestrator::StepHandlerError;
pub use orchestrator::StepResult;
