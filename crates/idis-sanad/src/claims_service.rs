// crates/idis-sanad/src/claims_service.rs
// ============================================================================
// Module: Claims Service
// Description: The only mutation path for claims, with audit emission.
// Purpose: Enforce the IC-bound invariant and tenant isolation on claims.
// Dependencies: crate::{events, repo}, idis-audit, idis-core, thiserror, uuid
// ============================================================================

//! ## Overview
//! Claims are mutated only through this service. Creation validates the
//! IC-bound invariant (an IC-bound claim must carry a sanad or a primary
//! span); grading updates set grade, verdict, and the verdict's follow-up
//! action. Every successful mutation emits exactly one audit event; audit
//! failure fails the mutation and the claim write is rolled back. Reads are
//! tenant-scoped and a cross-tenant probe is indistinguishable from a miss.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use idis_audit::AuditSeverity;
use idis_audit::AuditSink;
use idis_audit::AuditSinkError;
use idis_core::Claim;
use idis_core::ClaimAction;
use idis_core::ClaimClass;
use idis_core::ClaimId;
use idis_core::ClaimVerdict;
use idis_core::DealId;
use idis_core::Grade;
use idis_core::Materiality;
use idis_core::RequestId;
use idis_core::SanadId;
use idis_core::SpanId;
use idis_core::TenantId;
use idis_core::Timestamp;
use serde_json::Value;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::events::service_event;
use crate::repo::ClaimsRepo;
use crate::repo::ProvenanceRepoError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Claims service errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ClaimsServiceError {
    /// IC-bound claim lacks both sanad and primary span.
    #[error("ic_bound claim requires sanad_id or primary_span_id")]
    IcAnchorMissing,
    /// Claim not found in this tenant.
    #[error("claim not found")]
    NotFound,
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

/// Input for claim creation.
///
/// # Invariants
/// - `ic_bound == true` requires `sanad_id` or `primary_span_id`.
#[derive(Debug, Clone)]
pub struct CreateClaimInput {
    /// Deal scope.
    pub deal_id: DealId,
    /// Claim-class label.
    pub claim_class: ClaimClass,
    /// Assertion text.
    pub claim_text: String,
    /// Predicate label, when structured.
    pub predicate: Option<String>,
    /// Structured value, when carried.
    pub value: Option<Value>,
    /// Backing sanad, when already graded.
    pub sanad_id: Option<SanadId>,
    /// Materiality.
    pub materiality: Materiality,
    /// Whether the claim is IC-bound.
    pub ic_bound: bool,
    /// Anchoring span, when extracted from text.
    pub primary_span_id: Option<SpanId>,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Tenant-scoped claims service.
pub struct ClaimsService {
    /// Tenant scope for every operation.
    tenant_id: TenantId,
    /// Claim storage.
    repo: Arc<dyn ClaimsRepo>,
    /// Audit sink; emission failure fails the mutation.
    sink: Arc<dyn AuditSink>,
}

impl ClaimsService {
    /// Creates a claims service bound to one tenant.
    #[must_use]
    pub fn new(tenant_id: TenantId, repo: Arc<dyn ClaimsRepo>, sink: Arc<dyn AuditSink>) -> Self {
        Self {
            tenant_id,
            repo,
            sink,
        }
    }

    /// Creates a claim, enforcing the IC-bound invariant.
    ///
    /// The claim row is written first, then the audit event; if emission
    /// fails the row is removed again before the error propagates, so the
    /// caller never observes a mutation without its event.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimsServiceError`] on invariant violation, storage
    /// refusal, or audit failure.
    pub fn create(
        &self,
        input: CreateClaimInput,
        request_id: &RequestId,
    ) -> Result<Claim, ClaimsServiceError> {
        if input.ic_bound && input.sanad_id.is_none() && input.primary_span_id.is_none() {
            return Err(ClaimsServiceError::IcAnchorMissing);
        }
        let now = Timestamp::now();
        let claim = Claim {
            claim_id: ClaimId::new(Uuid::new_v4().to_string()),
            tenant_id: self.tenant_id.clone(),
            deal_id: input.deal_id,
            claim_class: input.claim_class,
            claim_text: input.claim_text,
            predicate: input.predicate,
            value: input.value,
            sanad_id: input.sanad_id,
            claim_grade: Grade::D,
            claim_verdict: ClaimVerdict::Unverified,
            claim_action: ClaimAction::None,
            defect_ids: vec![],
            materiality: input.materiality,
            ic_bound: input.ic_bound,
            primary_span_id: input.primary_span_id,
            created_at: now,
            updated_at: now,
        };
        self.repo.create(&claim)?;

        let mut safe = BTreeMap::new();
        safe.insert(
            "claim_class".to_string(),
            Value::String(claim.claim_class.as_str().to_string()),
        );
        safe.insert(
            "claim_text_len".to_string(),
            Value::Number(claim.claim_text.len().into()),
        );
        let event = service_event(
            &self.tenant_id,
            request_id,
            "claims",
            "claim.created",
            AuditSeverity::Low,
            "claim",
            claim.claim_id.as_str(),
            "claim created",
            safe,
        );
        if let Err(err) = self.sink.emit(&event) {
            // Compensate the durable write before propagating.
            self.repo.delete(&self.tenant_id, &claim.claim_id)?;
            return Err(ClaimsServiceError::AuditEmitFailed(err));
        }
        info!(claim_id = %claim.claim_id, "claim created");
        Ok(claim)
    }

    /// Applies a grading outcome to a claim.
    ///
    /// Sets grade, sanad binding, verdict, the verdict's follow-up action,
    /// and attached defects, then emits `claim.updated`.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimsServiceError`] when the claim is missing, storage
    /// refuses, or audit emission fails.
    pub fn apply_grading(
        &self,
        claim_id: &ClaimId,
        grade: Grade,
        verdict: ClaimVerdict,
        sanad_id: Option<SanadId>,
        defect_ids: Vec<idis_core::DefectId>,
        request_id: &RequestId,
    ) -> Result<Claim, ClaimsServiceError> {
        let previous = self
            .repo
            .get(&self.tenant_id, claim_id)
            .ok_or(ClaimsServiceError::NotFound)?;
        let mut claim = previous.clone();
        claim.claim_grade = grade;
        claim.claim_verdict = verdict;
        claim.claim_action = action_for_verdict(verdict);
        if sanad_id.is_some() {
            claim.sanad_id = sanad_id;
        }
        claim.defect_ids = defect_ids;
        claim.updated_at = Timestamp::now();
        self.repo.update(&claim)?;

        let mut safe = BTreeMap::new();
        safe.insert(
            "grade".to_string(),
            Value::String(grade.letter().to_string()),
        );
        safe.insert(
            "defect_count".to_string(),
            Value::Number(claim.defect_ids.len().into()),
        );
        let event = service_event(
            &self.tenant_id,
            request_id,
            "claims",
            "claim.updated",
            AuditSeverity::Low,
            "claim",
            claim.claim_id.as_str(),
            "claim grading applied",
            safe,
        );
        if let Err(err) = self.sink.emit(&event) {
            // Roll the row back to its pre-mutation state.
            let _ = self.repo.update(&previous);
            return Err(ClaimsServiceError::AuditEmitFailed(err));
        }
        Ok(claim)
    }

    /// Returns a claim; cross-tenant probes are indistinguishable from
    /// misses.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimsServiceError::NotFound`] when absent in this tenant.
    pub fn get(&self, claim_id: &ClaimId) -> Result<Claim, ClaimsServiceError> {
        self.repo
            .get(&self.tenant_id, claim_id)
            .ok_or(ClaimsServiceError::NotFound)
    }

    /// Lists the claims of a deal.
    #[must_use]
    pub fn list_by_deal(&self, deal_id: &DealId) -> Vec<Claim> {
        self.repo.list_by_deal(&self.tenant_id, deal_id)
    }
}

/// Maps a verdict to its follow-up action.
#[must_use]
pub fn action_for_verdict(verdict: ClaimVerdict) -> ClaimAction {
    match verdict {
        ClaimVerdict::Contradicted => ClaimAction::EscalateContradiction,
        ClaimVerdict::Blocked => ClaimAction::RejectNoFreeFacts,
        ClaimVerdict::Unverified => ClaimAction::RefreshEvidence,
        ClaimVerdict::Verified | ClaimVerdict::Inflated | ClaimVerdict::Subjective => {
            ClaimAction::None
        }
    }
}
