// crates/idis-saga/src/lib.rs
// ============================================================================
// Module: IDIS Dual-Write Saga
// Description: Forward-step / reverse-compensation executor for dual writes.
// Purpose: Keep relational and graph stores consistent or fully rolled back.
// Dependencies: idis-core, idis-audit, serde_json, thiserror, tracing, uuid
// ============================================================================

//! ## Overview
//! Any write that must land in both the relational store and the graph
//! projection is described as an ordered list of steps, each carrying a
//! forward action and a reverse compensation. The executor runs forwards in
//! order; when step `k` fails, compensations for steps `k-1 .. 0` run in
//! reverse. The executor never touches a database itself — callers inject
//! the concrete actions, so the machinery is testable with pure closures.
//! A compensation failure is an operator incident: the saga enters
//! `COMPENSATION_FAILED` and emits a dedicated audit event before the error
//! propagates.

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
use idis_core::EventId;
use idis_core::RequestId;
use idis_core::TenantId;
use idis_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

// ============================================================================
// SECTION: Context
// ============================================================================

/// Shared mutable context threaded through saga steps.
///
/// Keys are documented per saga variant by the caller; later steps read ids
/// produced by earlier ones. There is no hidden implicit state.
pub type SagaContext = BTreeMap<String, Value>;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error raised by a single forward or compensation action.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SagaStepError(pub String);

/// Saga execution outcomes that did not commit.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SagaError {
    /// A forward step failed and all completed steps were compensated.
    #[error("saga compensated after step '{failed_step}' failed: {cause}")]
    Compensated {
        /// Name of the step whose forward action failed.
        failed_step: String,
        /// Failure description from the forward action.
        cause: String,
    },
    /// A compensation failed; stores may disagree until an operator acts.
    #[error("saga compensation failed at step '{failed_compensation}': {cause}")]
    CompensationFailed {
        /// Name of the step whose compensation failed.
        failed_compensation: String,
        /// Failure description from the compensation.
        cause: String,
    },
}

// ============================================================================
// SECTION: Step Records
// ============================================================================

/// Execution status of one saga step.
///
/// # Invariants
/// - Variants are stable for serialization and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SagaStepStatus {
    /// Not yet attempted.
    Pending,
    /// Forward action succeeded.
    Completed,
    /// Forward action failed.
    Failed,
    /// Compensation ran after a later failure.
    Compensated,
}

/// Per-step record returned to callers.
///
/// # Invariants
/// - Records appear in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaStepRecord {
    /// Step name.
    pub name: String,
    /// Final status.
    pub status: SagaStepStatus,
    /// Forward action result, when completed.
    pub result: Option<Value>,
}

// ============================================================================
// SECTION: Steps
// ============================================================================

/// Forward action signature; may record results into the context.
pub type ForwardFn<'a> = Box<dyn FnMut(&mut SagaContext) -> Result<Option<Value>, SagaStepError> + 'a>;

/// Compensation signature; must undo the forward action's durable effects.
pub type CompensateFn<'a> = Box<dyn FnMut(&mut SagaContext) -> Result<(), SagaStepError> + 'a>;

/// One saga step with a forward action and its compensation.
pub struct SagaStep<'a> {
    /// Step name for records and audit.
    pub name: String,
    /// Forward action.
    pub forward: ForwardFn<'a>,
    /// Reverse compensation.
    pub compensate: CompensateFn<'a>,
}

impl<'a> SagaStep<'a> {
    /// Builds a step from a name, forward action, and compensation.
    pub fn new(
        name: impl Into<String>,
        forward: impl FnMut(&mut SagaContext) -> Result<Option<Value>, SagaStepError> + 'a,
        compensate: impl FnMut(&mut SagaContext) -> Result<(), SagaStepError> + 'a,
    ) -> Self {
        Self {
            name: name.into(),
            forward: Box::new(forward),
            compensate: Box::new(compensate),
        }
    }
}

// ============================================================================
// SECTION: Audit Scope
// ============================================================================

/// Audit context for compensation-failure events.
///
/// # Invariants
/// - Supplied by the caller that owns the mutation being protected.
#[derive(Debug, Clone)]
pub struct SagaAuditScope {
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Transport request identifier.
    pub request_id: RequestId,
    /// Resource type label for the protected write.
    pub resource_type: String,
    /// Resource identifier for the protected write.
    pub resource_id: String,
}

// ============================================================================
// SECTION: Executor
// ============================================================================

/// Runs saga steps in order with reverse compensation on failure.
///
/// # Errors
///
/// Returns [`SagaError::Compensated`] when a forward step failed and every
/// completed step was compensated, or [`SagaError::CompensationFailed`] when
/// a compensation itself failed (after emitting the dedicated audit event).
pub fn execute_saga(
    saga_name: &str,
    steps: &mut [SagaStep<'_>],
    ctx: &mut SagaContext,
    scope: &SagaAuditScope,
    sink: &dyn AuditSink,
) -> Result<Vec<SagaStepRecord>, SagaError> {
    let mut records: Vec<SagaStepRecord> = steps
        .iter()
        .map(|step| SagaStepRecord {
            name: step.name.clone(),
            status: SagaStepStatus::Pending,
            result: None,
        })
        .collect();

    let mut failure: Option<(usize, String)> = None;
    for (idx, step) in steps.iter_mut().enumerate() {
        match (step.forward)(ctx) {
            Ok(result) => {
                records[idx].status = SagaStepStatus::Completed;
                records[idx].result = result;
            }
            Err(err) => {
                records[idx].status = SagaStepStatus::Failed;
                failure = Some((idx, err.0));
                break;
            }
        }
    }

    let Some((failed_idx, cause)) = failure else {
        return Ok(records);
    };

    for idx in (0..failed_idx).rev() {
        let step = &mut steps[idx];
        if let Err(err) = (step.compensate)(ctx) {
            error!(saga = saga_name, step = %step.name, "saga compensation failed");
            emit_compensation_failed(saga_name, &step.name, scope, sink);
            return Err(SagaError::CompensationFailed {
                failed_compensation: step.name.clone(),
                cause: err.0,
            });
        }
        records[idx].status = SagaStepStatus::Compensated;
    }

    Err(SagaError::Compensated {
        failed_step: steps[failed_idx].name.clone(),
        cause,
    })
}

/// Emits the dedicated compensation-failure audit event.
///
/// Emission failure here is logged but not propagated — the saga error that
/// triggered it is the operator's signal either way.
fn emit_compensation_failed(
    saga_name: &str,
    step_name: &str,
    scope: &SagaAuditScope,
    sink: &dyn AuditSink,
) {
    let mut payload = AuditPayload::default();
    payload.safe.insert(
        "saga".to_string(),
        Value::String(saga_name.to_string()),
    );
    payload.safe.insert(
        "failed_compensation".to_string(),
        Value::String(step_name.to_string()),
    );
    let event = AuditEvent {
        event_id: EventId::new(Uuid::new_v4().to_string()),
        occurred_at: Timestamp::now(),
        tenant_id: scope.tenant_id.clone(),
        actor: AuditActor {
            actor_type: AuditActorType::System,
            actor_id: "saga-executor".to_string(),
            roles: vec!["SERVICE".to_string()],
            ip: None,
            user_agent: None,
        },
        request: AuditRequest {
            request_id: scope.request_id.clone(),
            method: "POST".to_string(),
            path: "/internal/saga".to_string(),
            status_code: None,
            idempotency_key: None,
        },
        resource: AuditResource {
            resource_type: scope.resource_type.clone(),
            resource_id: scope.resource_id.clone(),
        },
        event_type: "saga.compensation.failed".to_string(),
        severity: AuditSeverity::Critical,
        summary: "saga compensation failed; manual reconciliation required".to_string(),
        payload,
    };
    if sink.emit(&event).is_err() {
        error!(saga = saga_name, "failed to emit saga.compensation.failed");
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions are permitted."
    )]

    use std::cell::RefCell;

    use idis_audit::MemoryAuditSink;
    use serde_json::json;

    use super::*;

    fn scope() -> SagaAuditScope {
        SagaAuditScope {
            tenant_id: TenantId::new("tenant-1"),
            request_id: RequestId::new("req-1"),
            resource_type: "claim".to_string(),
            resource_id: "claim-1".to_string(),
        }
    }

    #[test]
    fn all_steps_commit_in_order() {
        let sink = MemoryAuditSink::new();
        let mut ctx = SagaContext::new();
        let mut steps = vec![
            SagaStep::new(
                "relational_insert",
                |ctx: &mut SagaContext| {
                    ctx.insert("row_id".to_string(), json!("row-7"));
                    Ok(Some(json!("row-7")))
                },
                |_| Ok(()),
            ),
            SagaStep::new(
                "graph_project",
                |ctx: &mut SagaContext| {
                    assert_eq!(ctx.get("row_id"), Some(&json!("row-7")));
                    Ok(None)
                },
                |_| Ok(()),
            ),
        ];
        let records = execute_saga("claim_write", &mut steps, &mut ctx, &scope(), &sink).unwrap();
        assert!(records.iter().all(|r| r.status == SagaStepStatus::Completed));
    }

    #[test]
    fn failure_compensates_completed_steps_in_reverse() {
        let sink = MemoryAuditSink::new();
        let order: RefCell<Vec<&'static str>> = RefCell::new(Vec::new());
        let mut ctx = SagaContext::new();
        let mut steps = vec![
            SagaStep::new(
                "first",
                |_ctx: &mut SagaContext| Ok(None),
                |_| {
                    order.borrow_mut().push("undo_first");
                    Ok(())
                },
            ),
            SagaStep::new(
                "second",
                |_ctx: &mut SagaContext| Ok(None),
                |_| {
                    order.borrow_mut().push("undo_second");
                    Ok(())
                },
            ),
            SagaStep::new(
                "third",
                |_ctx: &mut SagaContext| Err(SagaStepError("graph write refused".to_string())),
                |_| Ok(()),
            ),
        ];
        let err = execute_saga("claim_write", &mut steps, &mut ctx, &scope(), &sink).unwrap_err();
        assert!(matches!(err, SagaError::Compensated { .. }));
        assert_eq!(*order.borrow(), vec!["undo_second", "undo_first"]);
    }

    #[test]
    fn compensation_failure_emits_dedicated_event() {
        let sink = MemoryAuditSink::new();
        let mut ctx = SagaContext::new();
        let mut steps = vec![
            SagaStep::new(
                "first",
                |_ctx: &mut SagaContext| Ok(None),
                |_| Err(SagaStepError("undo refused".to_string())),
            ),
            SagaStep::new(
                "second",
                |_ctx: &mut SagaContext| Err(SagaStepError("forward refused".to_string())),
                |_| Ok(()),
            ),
        ];
        let err = execute_saga("claim_write", &mut steps, &mut ctx, &scope(), &sink).unwrap_err();
        assert!(matches!(err, SagaError::CompensationFailed { .. }));
        assert_eq!(sink.events_of_type("saga.compensation.failed").len(), 1);
    }
}
