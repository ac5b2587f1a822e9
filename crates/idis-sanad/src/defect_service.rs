// crates/idis-sanad/src/defect_service.rs
// ============================================================================
// Module: Defect Service
// Description: Defect persistence and the OPEN -> {CURED, WAIVED} machine.
// Purpose: Record provenance flaws and their audited resolution.
// Dependencies: crate::{events, repo}, idis-audit, idis-core, thiserror, uuid
// ============================================================================

//! ## Overview
//! Defects are created with severity taken from the canonical table — a
//! caller cannot soften a chain break. The lifecycle is a strict state
//! machine: `OPEN -> {CURED, WAIVED}`; terminal states accept no further
//! transitions and return `CONFLICT` with no state change. Waive and cure
//! each require a non-empty actor and a non-empty reason, and each emits
//! its audit event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use idis_audit::AuditSeverity;
use idis_audit::AuditSink;
use idis_audit::AuditSinkError;
use idis_core::ActorId;
use idis_core::ClaimId;
use idis_core::DealId;
use idis_core::Defect;
use idis_core::DefectId;
use idis_core::DefectStatus;
use idis_core::DefectType;
use idis_core::RequestId;
use idis_core::TenantId;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::events::service_event;
use crate::repo::DefectsRepo;
use crate::repo::ProvenanceRepoError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Defect service errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum DefectServiceError {
    /// Defect not found in this tenant.
    #[error("defect not found")]
    NotFound,
    /// Transition from a terminal state; no state change occurred.
    #[error("defect is already {0:?}; transition refused")]
    Conflict(DefectStatus),
    /// Actor or reason was empty.
    #[error("defect resolution requires a non-empty actor and reason")]
    MissingActorOrReason,
    /// Storage refused the write.
    #[error(transparent)]
    Repo(#[from] ProvenanceRepoError),
    /// Audit emission failed; the mutation was rolled back.
    #[error("audit emission failed: {0}")]
    AuditEmitFailed(#[from] AuditSinkError),
}

// ============================================================================
// SECTION: Inputs
// ============================================================================

/// Input for defect creation.
#[derive(Debug, Clone)]
pub struct CreateDefectInput {
    /// Claim the defect attaches to.
    pub claim_id: ClaimId,
    /// Deal scope.
    pub deal_id: DealId,
    /// Canonical defect type; severity follows its profile.
    pub defect_type: DefectType,
    /// Human-readable description.
    pub description: String,
    /// Cure protocol label.
    pub cure_protocol: String,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Tenant-scoped defect service.
pub struct DefectService {
    /// Tenant scope for every operation.
    tenant_id: TenantId,
    /// Defect storage.
    repo: Arc<dyn DefectsRepo>,
    /// Audit sink; emission failure fails the mutation.
    sink: Arc<dyn AuditSink>,
}

impl DefectService {
    /// Creates a defect service bound to one tenant.
    #[must_use]
    pub fn new(tenant_id: TenantId, repo: Arc<dyn DefectsRepo>, sink: Arc<dyn AuditSink>) -> Self {
        Self {
            tenant_id,
            repo,
            sink,
        }
    }

    /// Persists a new open defect and emits `defect.detected`.
    ///
    /// # Errors
    ///
    /// Returns [`DefectServiceError`] on storage refusal or audit failure.
    pub fn create(
        &self,
        input: CreateDefectInput,
        request_id: &RequestId,
    ) -> Result<Defect, DefectServiceError> {
        let defect = Defect {
            defect_id: DefectId::new(Uuid::new_v4().to_string()),
            tenant_id: self.tenant_id.clone(),
            claim_id: input.claim_id,
            deal_id: input.deal_id,
            defect_type: input.defect_type,
            severity: input.defect_type.profile(),
            description: input.description,
            cure_protocol: input.cure_protocol,
            status: DefectStatus::Open,
            waived_by: None,
            waiver_reason: None,
            cured_by: None,
            cured_reason: None,
        };
        self.repo.create(&defect)?;

        let mut safe = BTreeMap::new();
        safe.insert(
            "defect_type".to_string(),
            Value::String(format!("{:?}", defect.defect_type)),
        );
        safe.insert(
            "severity".to_string(),
            Value::String(format!("{:?}", defect.severity)),
        );
        let event = service_event(
            &self.tenant_id,
            request_id,
            "defects",
            "defect.detected",
            AuditSeverity::Medium,
            "defect",
            defect.defect_id.as_str(),
            "defect detected",
            safe,
        );
        if let Err(err) = self.sink.emit(&event) {
            // Compensate the durable write before propagating.
            self.repo.delete(&self.tenant_id, &defect.defect_id)?;
            return Err(DefectServiceError::AuditEmitFailed(err));
        }
        Ok(defect)
    }

    /// Waives an open defect.
    ///
    /// # Errors
    ///
    /// Returns [`DefectServiceError::Conflict`] for non-open defects and
    /// [`DefectServiceError::MissingActorOrReason`] for empty inputs.
    pub fn waive(
        &self,
        defect_id: &DefectId,
        actor: &ActorId,
        reason: &str,
        request_id: &RequestId,
    ) -> Result<Defect, DefectServiceError> {
        self.resolve(defect_id, actor, reason, request_id, Resolution::Waive)
    }

    /// Cures an open defect.
    ///
    /// # Errors
    ///
    /// Returns [`DefectServiceError::Conflict`] for non-open defects and
    /// [`DefectServiceError::MissingActorOrReason`] for empty inputs.
    pub fn cure(
        &self,
        defect_id: &DefectId,
        actor: &ActorId,
        reason: &str,
        request_id: &RequestId,
    ) -> Result<Defect, DefectServiceError> {
        self.resolve(defect_id, actor, reason, request_id, Resolution::Cure)
    }

    /// Returns a defect; cross-tenant probes are misses.
    ///
    /// # Errors
    ///
    /// Returns [`DefectServiceError::NotFound`] when absent in this tenant.
    pub fn get(&self, defect_id: &DefectId) -> Result<Defect, DefectServiceError> {
        self.repo
            .get(&self.tenant_id, defect_id)
            .ok_or(DefectServiceError::NotFound)
    }

    /// Shared waive/cure transition.
    fn resolve(
        &self,
        defect_id: &DefectId,
        actor: &ActorId,
        reason: &str,
        request_id: &RequestId,
        resolution: Resolution,
    ) -> Result<Defect, DefectServiceError> {
        if actor.as_str().trim().is_empty() || reason.trim().is_empty() {
            return Err(DefectServiceError::MissingActorOrReason);
        }
        let previous = self
            .repo
            .get(&self.tenant_id, defect_id)
            .ok_or(DefectServiceError::NotFound)?;
        if previous.status != DefectStatus::Open {
            return Err(DefectServiceError::Conflict(previous.status));
        }
        let mut defect = previous.clone();
        let event_type = match resolution {
            Resolution::Waive => {
                defect.status = DefectStatus::Waived;
                defect.waived_by = Some(actor.clone());
                defect.waiver_reason = Some(reason.to_string());
                "defect.waived"
            }
            Resolution::Cure => {
                defect.status = DefectStatus::Cured;
                defect.cured_by = Some(actor.clone());
                defect.cured_reason = Some(reason.to_string());
                "defect.cured"
            }
        };
        self.repo.update(&defect)?;

        let mut safe = BTreeMap::new();
        safe.insert(
            "status".to_string(),
            Value::String(format!("{:?}", defect.status)),
        );
        safe.insert(
            "reason_len".to_string(),
            Value::Number(reason.len().into()),
        );
        let event = service_event(
            &self.tenant_id,
            request_id,
            "defects",
            event_type,
            AuditSeverity::High,
            "defect",
            defect.defect_id.as_str(),
            "defect resolved",
            safe,
        );
        if let Err(err) = self.sink.emit(&event) {
            let _ = self.repo.update(&previous);
            return Err(DefectServiceError::AuditEmitFailed(err));
        }
        Ok(defect)
    }
}

/// Resolution kind for the shared transition path.
#[derive(Debug, Clone, Copy)]
enum Resolution {
    /// Mark the defect waived.
    Waive,
    /// Mark the defect cured.
    Cure,
}
