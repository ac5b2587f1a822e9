// crates/idis-runs/src/orchestrator.rs
// ============================================================================
// Module: Run Orchestration Logic
// Description: Step sequencing, resume, retry, blocking, and audit emission.
// Purpose: Drive a run through its canonical sequence fail-closed.
// Dependencies: crate::ledger, idis-audit, idis-core, serde_json, uuid
// ============================================================================

//! ## Overview
//! `execute` walks the mode's canonical sequence. Per step: a `COMPLETED`
//! ledger row is skipped and its summary merged into the running context; an
//! unimplemented step inserts a `BLOCKED` row and stops the run; otherwise a
//! `RUNNING` row is upserted (incrementing `retry_count` on retry), the
//! injected handler dispatches, and the row transitions to `COMPLETED` or
//! `FAILED`. Audit events fire at every transition and any emission failure
//! aborts the run. Calling `execute` again with the same `run_id`
//! reconstructs state from the ledger and picks up where it stopped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use idis_audit::AuditActor;
use idis_audit::AuditActorType;
use idis_audit::AuditEvent;
use idis_audit::AuditPayload;
use idis_audit::AuditRequest;
use idis_audit::AuditResource;
use idis_audit::AuditSeverity;
use idis_audit::AuditSink;
use idis_audit::AuditSinkError;
use idis_core::DealId;
use idis_core::EventId;
use idis_core::RequestId;
use idis_core::RunId;
use idis_core::RunMode;
use idis_core::RunStatus;
use idis_core::RunStep;
use idis_core::StepId;
use idis_core::StepName;
use idis_core::StepStatus;
use idis_core::TenantId;
use idis_core::Timestamp;
use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use crate::ledger::LedgerError;
use crate::ledger::RunStepsRepo;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum persisted error-message length.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Handler-reported step failure.
///
/// # Invariants
/// - `code` becomes the ledger's `error_code` upper-cased.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct StepHandlerError {
    /// Stable failure code.
    pub code: String,
    /// Failure description.
    pub message: String,
}

impl StepHandlerError {
    /// Builds a handler error.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Orchestrator-fatal errors that abort the run outright.
///
/// # Invariants
/// - Handler failures are NOT here — they surface through the result's
///   `FAILED` status. These variants are infrastructure failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// Audit emission failed; the step transition did not take effect.
    #[error("audit emission failed: {0}")]
    AuditEmitFailed(#[from] AuditSinkError),
    /// Ledger storage refused a write.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

// ============================================================================
// SECTION: Context and Handlers
// ============================================================================

/// Step result summary merged into the running context.
pub type StepResult = BTreeMap<String, Value>;

/// Injected step handler. Receives the run context and the accumulated
/// results of prior steps; returns this step's result summary.
pub type StepHandler<'a> =
    Box<dyn Fn(&RunContext, &StepResult) -> Result<StepResult, StepHandlerError> + 'a>;

/// All inputs needed to execute a run.
///
/// # Invariants
/// - `mode` fixes the canonical step sequence.
/// - Handlers for every implemented step in the sequence must be present;
///   missing handlers fail closed at dispatch.
pub struct RunContext<'a> {
    /// Run identifier.
    pub run_id: RunId,
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Deal scope.
    pub deal_id: DealId,
    /// Execution mode.
    pub mode: RunMode,
    /// Transport request identifier for audit events.
    pub request_id: RequestId,
    /// Injected step handlers.
    pub handlers: BTreeMap<StepName, StepHandler<'a>>,
}

// ============================================================================
// SECTION: Result
// ============================================================================

/// Aggregate result of one orchestration pass.
///
/// # Invariants
/// - `steps` are in canonical order.
/// - `block_reason` is present iff `status == RunStatus::Blocked`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorResult {
    /// Final run status.
    pub status: RunStatus,
    /// All ledger rows for the run, canonical order.
    pub steps: Vec<RunStep>,
    /// Stable reason code when blocked.
    pub block_reason: Option<String>,
    /// Top-level error code on failure.
    pub error_code: Option<String>,
    /// Top-level error message on failure.
    pub error_message: Option<String>,
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Orchestrates pipeline steps with a durable ledger and fail-closed audit.
pub struct RunOrchestrator<'a> {
    /// Audit sink; emission failure aborts the run.
    sink: &'a dyn AuditSink,
    /// Durable step ledger.
    ledger: &'a dyn RunStepsRepo,
    /// Steps implemented in this build; sequence steps outside the set
    /// insert a `BLOCKED` row and stop the run.
    implemented: BTreeSet<StepName>,
}

impl<'a> RunOrchestrator<'a> {
    /// Creates an orchestrator with every canonical step implemented.
    #[must_use]
    pub fn new(sink: &'a dyn AuditSink, ledger: &'a dyn RunStepsRepo) -> Self {
        Self {
            sink,
            ledger,
            implemented: idis_core::FULL_STEPS.iter().copied().collect(),
        }
    }

    /// Replaces the implemented-step set (used by builds that ship a
    /// partial pipeline).
    #[must_use]
    pub fn with_implemented(mut self, implemented: BTreeSet<StepName>) -> Self {
        self.implemented = implemented;
        self
    }

    /// Executes all pipeline steps for the run context.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] on audit or ledger infrastructure failure;
    /// handler failures surface through the result's `FAILED` status.
    pub fn execute(&self, ctx: &RunContext<'_>) -> Result<OrchestratorResult, RunError> {
        let sequence = ctx.mode.steps();
        let mut accumulated = StepResult::new();

        for step_name in sequence {
            if !self.implemented.contains(step_name) {
                let reason = format!("{}_NOT_IMPLEMENTED", step_name.label());
                self.insert_blocked(ctx, *step_name, &reason)?;
                self.emit_step_event(ctx, *step_name, "blocked", |safe| {
                    safe.insert("block_reason".to_string(), Value::String(reason.clone()));
                })?;
                warn!(run_id = %ctx.run_id, step = %step_name, "step blocked");
                return Ok(OrchestratorResult {
                    status: RunStatus::Blocked,
                    steps: self.ledger.get_by_run(&ctx.tenant_id, &ctx.run_id),
                    block_reason: Some(reason),
                    error_code: None,
                    error_message: None,
                });
            }

            let existing = self.ledger.get_step(&ctx.tenant_id, &ctx.run_id, *step_name);
            if let Some(row) = &existing
                && row.status == StepStatus::Completed
            {
                for (key, value) in &row.result_summary {
                    accumulated.insert(key.clone(), value.clone());
                }
                continue;
            }

            let mut step = self.start_step(ctx, *step_name, existing)?;

            match self.dispatch(ctx, *step_name, &accumulated) {
                Ok(result) => {
                    self.complete_step(ctx, &mut step, &result)?;
                    for (key, value) in result {
                        accumulated.insert(key, value);
                    }
                }
                Err(err) => {
                    self.fail_step(ctx, &mut step, &err)?;
                    return Ok(OrchestratorResult {
                        status: self.final_status(ctx),
                        steps: self.ledger.get_by_run(&ctx.tenant_id, &ctx.run_id),
                        block_reason: None,
                        error_code: step.error_code.clone(),
                        error_message: step.error_message.clone(),
                    });
                }
            }
        }

        let steps = self.ledger.get_by_run(&ctx.tenant_id, &ctx.run_id);
        let status = compute_final_status(&steps);
        Ok(OrchestratorResult {
            status,
            steps,
            block_reason: None,
            error_code: None,
            error_message: None,
        })
    }

    /// Routes a step to its injected handler, failing closed when absent.
    fn dispatch(
        &self,
        ctx: &RunContext<'_>,
        step_name: StepName,
        accumulated: &StepResult,
    ) -> Result<StepResult, StepHandlerError> {
        let Some(handler) = ctx.handlers.get(&step_name) else {
            return Err(StepHandlerError::new(
                "VALUEERROR",
                format!("{}_fn not provided", step_name.event_label()),
            ));
        };
        handler(ctx, accumulated)
    }

    /// Creates or reuses a ledger row and marks it `RUNNING`.
    fn start_step(
        &self,
        ctx: &RunContext<'_>,
        step_name: StepName,
        existing: Option<RunStep>,
    ) -> Result<RunStep, RunError> {
        let now = Timestamp::now();
        let step = match existing {
            Some(mut row) => {
                row.status = StepStatus::Running;
                row.started_at = now;
                row.finished_at = None;
                row.error_code = None;
                row.error_message = None;
                row.retry_count += 1;
                row
            }
            None => RunStep {
                step_id: StepId::new(Uuid::new_v4().to_string()),
                run_id: ctx.run_id.clone(),
                tenant_id: ctx.tenant_id.clone(),
                step_name,
                step_order: step_name.order(),
                status: StepStatus::Running,
                started_at: now,
                finished_at: None,
                retry_count: 0,
                result_summary: BTreeMap::new(),
                error_code: None,
                error_message: None,
            },
        };
        self.ledger.upsert(&step)?;
        let retry_count = step.retry_count;
        self.emit_step_event(ctx, step_name, "started", |safe| {
            safe.insert(
                "retry_count".to_string(),
                Value::Number(retry_count.into()),
            );
        })?;
        Ok(step)
    }

    /// Marks a step `COMPLETED` and stores its summary.
    fn complete_step(
        &self,
        ctx: &RunContext<'_>,
        step: &mut RunStep,
        result: &StepResult,
    ) -> Result<(), RunError> {
        step.status = StepStatus::Completed;
        step.finished_at = Some(Timestamp::now());
        step.result_summary = result.clone();
        self.ledger.upsert(step)?;
        let key_count = result.len();
        self.emit_step_event(ctx, step.step_name, "completed", |safe| {
            safe.insert(
                "result_keys".to_string(),
                Value::Number(key_count.into()),
            );
        })?;
        info!(run_id = %ctx.run_id, step = %step.step_name, "step completed");
        Ok(())
    }

    /// Marks a step `FAILED` with a truncated message.
    fn fail_step(
        &self,
        ctx: &RunContext<'_>,
        step: &mut RunStep,
        err: &StepHandlerError,
    ) -> Result<(), RunError> {
        step.status = StepStatus::Failed;
        step.finished_at = Some(Timestamp::now());
        step.error_code = Some(err.code.to_uppercase());
        step.error_message = Some(truncate(&err.message, MAX_ERROR_MESSAGE_LEN));
        self.ledger.upsert(step)?;
        let code = step.error_code.clone().unwrap_or_default();
        self.emit_step_event(ctx, step.step_name, "failed", |safe| {
            safe.insert("error_code".to_string(), Value::String(code.clone()));
        })?;
        warn!(run_id = %ctx.run_id, step = %step.step_name, "step failed");
        Ok(())
    }

    /// Inserts a `BLOCKED` row for an unimplemented step.
    fn insert_blocked(
        &self,
        ctx: &RunContext<'_>,
        step_name: StepName,
        reason: &str,
    ) -> Result<(), RunError> {
        let now = Timestamp::now();
        let step = RunStep {
            step_id: StepId::new(Uuid::new_v4().to_string()),
            run_id: ctx.run_id.clone(),
            tenant_id: ctx.tenant_id.clone(),
            step_name,
            step_order: step_name.order(),
            status: StepStatus::Blocked,
            started_at: now,
            finished_at: Some(now),
            retry_count: 0,
            result_summary: BTreeMap::new(),
            error_code: Some(reason.to_string()),
            error_message: Some("Step is not yet implemented".to_string()),
        };
        self.ledger.upsert(&step)?;
        Ok(())
    }

    /// Emits one `run.step.<name>.<phase>` audit event, fail-closed.
    fn emit_step_event(
        &self,
        ctx: &RunContext<'_>,
        step_name: StepName,
        phase: &str,
        fill_safe: impl FnOnce(&mut BTreeMap<String, Value>),
    ) -> Result<(), RunError> {
        let mut safe = BTreeMap::new();
        safe.insert(
            "step_name".to_string(),
            Value::String(step_name.label().to_string()),
        );
        fill_safe(&mut safe);
        let event = AuditEvent {
            event_id: EventId::new(Uuid::new_v4().to_string()),
            occurred_at: Timestamp::now(),
            tenant_id: ctx.tenant_id.clone(),
            actor: AuditActor {
                actor_type: AuditActorType::System,
                actor_id: "run-orchestrator".to_string(),
                roles: vec!["SERVICE".to_string()],
                ip: None,
                user_agent: None,
            },
            request: AuditRequest {
                request_id: ctx.request_id.clone(),
                method: "POST".to_string(),
                path: format!("/internal/runs/{}", ctx.run_id),
                status_code: None,
                idempotency_key: None,
            },
            resource: AuditResource {
                resource_type: "run".to_string(),
                resource_id: ctx.run_id.to_string(),
            },
            event_type: format!("run.step.{}.{phase}", step_name.event_label()),
            severity: AuditSeverity::Low,
            summary: format!("run step {} {phase}", step_name.label()),
            payload: AuditPayload {
                safe,
                hashes: vec![],
                refs: vec![],
            },
        };
        self.sink.emit(&event)?;
        Ok(())
    }

    /// Derives the failure-path status from the current ledger.
    fn final_status(&self, ctx: &RunContext<'_>) -> RunStatus {
        compute_final_status(&self.ledger.get_by_run(&ctx.tenant_id, &ctx.run_id))
    }
}

// ============================================================================
// SECTION: Status Derivation
// ============================================================================

/// Derives the final run status from step statuses.
fn compute_final_status(steps: &[RunStep]) -> RunStatus {
    if steps.is_empty() {
        return RunStatus::Failed;
    }
    if steps.iter().any(|step| step.status == StepStatus::Blocked) {
        return RunStatus::Blocked;
    }
    let has_failed = steps.iter().any(|step| step.status == StepStatus::Failed);
    let has_completed = steps
        .iter()
        .any(|step| step.status == StepStatus::Completed);
    if has_failed && has_completed {
        RunStatus::Partial
    } else if has_failed {
        RunStatus::Failed
    } else {
        RunStatus::Completed
    }
}

/// Truncates a message to `limit` bytes on a char boundary.
fn truncate(message: &str, limit: usize) -> String {
    if message.len() <= limit {
        return message.to_string();
    }
    let mut end = limit;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message[..end].to_string()
}
