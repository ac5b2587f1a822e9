// crates/idis-prompts/src/versioning.rs
// ============================================================================
// Module: Prompt Versioning Service
// Description: Gated promotion, rollback, and retire with audited atomicity.
// Purpose: Make prompt lifecycle transitions atomic, gated, and compensated.
// Dependencies: crate::registry, idis-audit, idis-core, thiserror, uuid
// ============================================================================

//! ## Overview
//! Every mutating operation validates preconditions, enforces the gate
//! requirements for the artifact's risk class, performs the atomic file
//! update, and emits exactly one audit event. Audit emission failure after
//! the pointer write compensates by writing the prior pointer back before
//! propagating — a promoted pointer without its event never survives.
//! Retire never deletes content; past deliverables must remain
//! reproducible.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use idis_audit::AuditActor;
use idis_audit::AuditActorType;
use idis_audit::AuditEvent;
use idis_audit::AuditPayload;
use idis_audit::AuditRequest;
use idis_audit::AuditResource;
use idis_audit::AuditSeverity;
use idis_audit::AuditSink;
use idis_audit::AuditSinkError;
use idis_core::EventId;
use idis_core::RequestId;
use idis_core::TenantId;
use idis_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use crate::registry::Environment;
use crate::registry::PromptRegistry;
use crate::registry::PromptRegistryError;
use crate::registry::PromptStatus;
use crate::registry::RegistryFile;
use crate::registry::RiskClass;

// ============================================================================
// SECTION: Gate Requirements
// ============================================================================

/// Returns the required gate set for a risk class.
#[must_use]
pub const fn required_gates(risk_class: RiskClass) -> &'static [u8] {
    match risk_class {
        RiskClass::Low => &[1],
        RiskClass::Medium => &[1, 2],
        RiskClass::High => &[1, 2, 3, 4],
    }
}

/// Result of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResult {
    /// Gate number (1 through 4).
    pub gate: u8,
    /// Whether the gate passed.
    pub passed: bool,
    /// Evaluation detail.
    pub details: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Prompt versioning errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum PromptVersioningError {
    /// Registry loading or writing failed.
    #[error(transparent)]
    Registry(#[from] PromptRegistryError),
    /// Required gates are missing or failed.
    #[error("gate requirements not met for {risk_class:?}: missing {missing:?}, failed {failed:?}")]
    GateRequirements {
        /// Risk class whose requirements were unmet.
        risk_class: RiskClass,
        /// Required gates with no result.
        missing: Vec<u8>,
        /// Required gates with `passed == false`.
        failed: Vec<u8>,
    },
    /// Rollback target version does not exist.
    #[error("rollback target '{version}' does not exist for prompt '{prompt_id}'")]
    RollbackTarget {
        /// Prompt identifier.
        prompt_id: String,
        /// Missing target version.
        version: String,
    },
    /// Audit emission failed; the pointer write was compensated.
    #[error("audit emission failed: {0}")]
    AuditEmitFailed(#[from] AuditSinkError),
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Request to promote a prompt version.
#[derive(Debug, Clone)]
pub struct PromotionRequest {
    /// Prompt identifier.
    pub prompt_id: String,
    /// Version to promote.
    pub new_version: String,
    /// Target environment.
    pub env: Environment,
    /// Acting operator.
    pub actor: String,
    /// Operator-supplied reason.
    pub reason: String,
    /// Gate results supplied with the request.
    pub gate_results: Vec<GateResult>,
}

/// Request to roll a prompt back to a prior version.
#[derive(Debug, Clone)]
pub struct RollbackRequest {
    /// Prompt identifier.
    pub prompt_id: String,
    /// Version to roll back to.
    pub rollback_target_version: String,
    /// Target environment.
    pub env: Environment,
    /// Acting operator.
    pub actor: String,
    /// Operator-supplied reason.
    pub reason: String,
}

/// Request to retire a prompt version.
#[derive(Debug, Clone)]
pub struct RetireRequest {
    /// Prompt identifier.
    pub prompt_id: String,
    /// Version to retire.
    pub version: String,
    /// Acting operator.
    pub actor: String,
    /// Operator-supplied reason.
    pub reason: String,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Prompt versioning service with atomic, audited transitions.
pub struct PromptVersioningService {
    /// Registry the service operates on.
    registry: PromptRegistry,
    /// Audit sink; emission failure compensates and propagates.
    sink: Arc<dyn AuditSink>,
    /// Tenant context for audit events.
    tenant_id: TenantId,
}

impl PromptVersioningService {
    /// Creates a versioning service.
    #[must_use]
    pub fn new(registry: PromptRegistry, sink: Arc<dyn AuditSink>, tenant_id: TenantId) -> Self {
        Self {
            registry,
            sink,
            tenant_id,
        }
    }

    /// Promotes a version after gate checks; atomic and audited.
    ///
    /// # Errors
    ///
    /// Returns [`PromptVersioningError`] on load failure, unmet gate
    /// requirements, write failure, or audit failure (compensated).
    pub fn promote(
        &self,
        request: &PromotionRequest,
        request_id: &RequestId,
    ) -> Result<(), PromptVersioningError> {
        let artifact = self
            .registry
            .load_artifact(&request.prompt_id, &request.new_version)?;
        check_gates(artifact.metadata.risk_class, &request.gate_results)?;

        let prior = self.registry.load_pointer(request.env)?;
        let mut updated = prior.clone();
        updated
            .prompts
            .insert(request.prompt_id.clone(), request.new_version.clone());
        updated.updated_at = Timestamp::now();
        self.registry.write_pointer(&updated)?;

        let gates_satisfied = required_gates(artifact.metadata.risk_class)
            .iter()
            .map(u8::to_string)
            .collect::<Vec<String>>()
            .join(",");
        let mut safe = BTreeMap::new();
        safe.insert(
            "version".to_string(),
            Value::String(request.new_version.clone()),
        );
        safe.insert(
            "env".to_string(),
            Value::String(request.env.as_str().to_string()),
        );
        safe.insert(
            "risk_class".to_string(),
            Value::String(format!("{:?}", artifact.metadata.risk_class)),
        );
        safe.insert("gates_satisfied".to_string(), Value::String(gates_satisfied));
        self.emit_or_compensate(
            "prompt.version.promoted",
            &request.prompt_id,
            &request.actor,
            safe,
            &prior,
            request_id,
        )?;
        info!(prompt_id = %request.prompt_id, version = %request.new_version, "prompt promoted");
        Ok(())
    }

    /// Rolls the pointer back to an existing prior version.
    ///
    /// # Errors
    ///
    /// Returns [`PromptVersioningError`] when the target does not exist,
    /// writing fails, or audit fails (compensated).
    pub fn rollback(
        &self,
        request: &RollbackRequest,
        request_id: &RequestId,
    ) -> Result<(), PromptVersioningError> {
        if self
            .registry
            .load_artifact(&request.prompt_id, &request.rollback_target_version)
            .is_err()
        {
            return Err(PromptVersioningError::RollbackTarget {
                prompt_id: request.prompt_id.clone(),
                version: request.rollback_target_version.clone(),
            });
        }

        let prior = self.registry.load_pointer(request.env)?;
        let mut updated = prior.clone();
        updated.prompts.insert(
            request.prompt_id.clone(),
            request.rollback_target_version.clone(),
        );
        updated.updated_at = Timestamp::now();
        self.registry.write_pointer(&updated)?;

        let mut safe = BTreeMap::new();
        safe.insert(
            "version".to_string(),
            Value::String(request.rollback_target_version.clone()),
        );
        safe.insert(
            "env".to_string(),
            Value::String(request.env.as_str().to_string()),
        );
        self.emit_or_compensate(
            "prompt.version.rolledback",
            &request.prompt_id,
            &request.actor,
            safe,
            &prior,
            request_id,
        )?;
        Ok(())
    }

    /// Retires a version by marking its metadata `DEPRECATED`.
    ///
    /// Content is never deleted — past deliverables must remain
    /// reproducible.
    ///
    /// # Errors
    ///
    /// Returns [`PromptVersioningError`] on load/write failure or audit
    /// failure (metadata compensated).
    pub fn retire(
        &self,
        request: &RetireRequest,
        request_id: &RequestId,
    ) -> Result<(), PromptVersioningError> {
        let artifact = self
            .registry
            .load_artifact(&request.prompt_id, &request.version)?;
        let prior_metadata = artifact.metadata.clone();
        let mut retired = artifact.metadata;
        retired.status = PromptStatus::Deprecated;
        write_metadata(&self.registry, &request.prompt_id, &request.version, &retired)?;

        let mut safe = BTreeMap::new();
        safe.insert("version".to_string(), Value::String(request.version.clone()));
        let event = self.build_event(
            "prompt.version.retired",
            &request.prompt_id,
            &request.actor,
            safe,
            request_id,
        );
        if let Err(err) = self.sink.emit(&event) {
            warn!(prompt_id = %request.prompt_id, "retire audit failed; restoring metadata");
            write_metadata(
                &self.registry,
                &request.prompt_id,
                &request.version,
                &prior_metadata,
            )?;
            return Err(PromptVersioningError::AuditEmitFailed(err));
        }
        Ok(())
    }

    /// Emits an event; on failure, restores the prior pointer first.
    fn emit_or_compensate(
        &self,
        event_type: &str,
        prompt_id: &str,
        actor: &str,
        safe: BTreeMap<String, Value>,
        prior: &RegistryFile,
        request_id: &RequestId,
    ) -> Result<(), PromptVersioningError> {
        let event = self.build_event(event_type, prompt_id, actor, safe, request_id);
        if let Err(err) = self.sink.emit(&event) {
            warn!(prompt_id, "audit failed after pointer write; compensating");
            self.registry.write_pointer(prior)?;
            return Err(PromptVersioningError::AuditEmitFailed(err));
        }
        Ok(())
    }

    /// Builds one versioning audit event.
    fn build_event(
        &self,
        event_type: &str,
        prompt_id: &str,
        actor: &str,
        safe: BTreeMap<String, Value>,
        request_id: &RequestId,
    ) -> AuditEvent {
        AuditEvent {
            event_id: EventId::new(Uuid::new_v4().to_string()),
            occurred_at: Timestamp::now(),
            tenant_id: self.tenant_id.clone(),
            actor: AuditActor {
                actor_type: AuditActorType::Human,
                actor_id: actor.to_string(),
                roles: vec!["ADMIN".to_string()],
                ip: None,
                user_agent: None,
            },
            request: AuditRequest {
                request_id: request_id.clone(),
                method: "POST".to_string(),
                path: format!("/internal/prompts/{prompt_id}"),
                status_code: None,
                idempotency_key: None,
            },
            resource: AuditResource {
                resource_type: "prompt".to_string(),
                resource_id: prompt_id.to_string(),
            },
            event_type: event_type.to_string(),
            severity: AuditSeverity::High,
            summary: format!("prompt lifecycle: {event_type}"),
            payload: AuditPayload {
                safe,
                hashes: vec![],
                refs: vec![],
            },
        }
    }
}

// ============================================================================
// SECTION: Gate Checking
// ============================================================================

/// Verifies that every required gate has a passing result.
fn check_gates(
    risk_class: RiskClass,
    results: &[GateResult],
) -> Result<(), PromptVersioningError> {
    let required: BTreeSet<u8> = required_gates(risk_class).iter().copied().collect();
    let mut missing = Vec::new();
    let mut failed = Vec::new();
    for gate in &required {
        match results.iter().find(|result| result.gate == *gate) {
            None => missing.push(*gate),
            Some(result) if !result.passed => failed.push(*gate),
            Some(_) => {}
        }
    }
    if missing.is_empty() && failed.is_empty() {
        Ok(())
    } else {
        Err(PromptVersioningError::GateRequirements {
            risk_class,
            missing,
            failed,
        })
    }
}

// ============================================================================
// SECTION: Metadata Writing
// ============================================================================

/// Writes artifact metadata atomically via temp + rename.
fn write_metadata(
    registry: &PromptRegistry,
    prompt_id: &str,
    version: &str,
    metadata: &crate::registry::PromptMetadata,
) -> Result<(), PromptVersioningError> {
    let dir = registry.artifact_dir(prompt_id, version);
    let rendered = serde_json::to_string_pretty(metadata)
        .map_err(|err| PromptRegistryError::Write(err.to_string()))?;
    let tmp = dir.join(format!(".metadata.{}.tmp", Uuid::new_v4()));
    std::fs::write(&tmp, format!("{rendered}\n").as_bytes())
        .map_err(|err| PromptRegistryError::Write(err.to_string()))?;
    std::fs::rename(&tmp, dir.join("metadata.json")).map_err(|err| {
        let _ = std::fs::remove_file(&tmp);
        PromptVersioningError::Registry(PromptRegistryError::Write(err.to_string()))
    })?;
    Ok(())
}
