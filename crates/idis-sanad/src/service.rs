// crates/idis-sanad/src/service.rs
// ============================================================================
// Module: Sanad Service and Auto-Grade Step
// Description: Sanad persistence plus the post-extraction grading lifecycle.
// Purpose: Build, grade, and persist sanads for every extracted claim.
// Dependencies: crate::{chain, claims_service, defect_service, events, grader,
//               repo}, idis-audit, idis-core, thiserror, uuid
// ============================================================================

//! ## Overview
//! The auto-grade step drives the post-extraction lifecycle for a run: for
//! each claim, gather evidence, build the transmission chain, grade, persist
//! the sanad and its defects, and update the claim — emitting
//! `sanad.created`, `sanad.graded`, and `defect.detected` along the way.
//! Chain-build failure marks the claim `grade_failed` rather than silently
//! skipping it; a run where every claim failed grading is reported so the
//! orchestrator can fail the GRADE step.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use idis_audit::AuditSeverity;
use idis_audit::AuditSink;
use idis_audit::AuditSinkError;
use idis_core::AttestedValue;
use idis_core::ClaimId;
use idis_core::DealId;
use idis_core::DefectId;
use idis_core::Grade;
use idis_core::RequestId;
use idis_core::Sanad;
use idis_core::SanadId;
use idis_core::TenantId;
use idis_core::Timestamp;
use idis_core::TransmissionNode;
use serde_json::Value;
use thiserror::Error;
use tracing::error;
use tracing::info;
use uuid::Uuid;

use crate::chain::build_sanad_chain;
use crate::claims_service::ClaimsService;
use crate::dabt::DabtDimensions;
use crate::defect_service::CreateDefectInput;
use crate::defect_service::DefectService;
use crate::events::service_event;
use crate::grader::GradeInput;
use crate::grader::GradeOutcome;
use crate::grader::grade_sanad;
use crate::repo::EvidenceRepo;
use crate::repo::ProvenanceRepoError;
use crate::repo::SanadsRepo;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Sanad service errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SanadError {
    /// The transmission chain was empty.
    #[error("sanad requires a non-empty transmission chain")]
    EmptyChain,
    /// A FATAL defect was supplied with a grade other than `D`.
    #[error("a fatal defect requires sanad grade D")]
    FatalDefectGrade,
    /// Storage refused the write.
    #[error(transparent)]
    Repo(#[from] ProvenanceRepoError),
    /// Audit emission failed; the mutation did not take effect.
    #[error("audit emission failed: {0}")]
    AuditEmitFailed(#[from] AuditSinkError),
}

// ============================================================================
// SECTION: Sanad Service
// ============================================================================

/// Tenant-scoped sanad persistence.
pub struct SanadService {
    /// Tenant scope for every operation.
    tenant_id: TenantId,
    /// Sanad storage.
    repo: Arc<dyn SanadsRepo>,
    /// Audit sink; emission failure fails the mutation.
    sink: Arc<dyn AuditSink>,
}

impl SanadService {
    /// Creates a sanad service bound to one tenant.
    #[must_use]
    pub fn new(tenant_id: TenantId, repo: Arc<dyn SanadsRepo>, sink: Arc<dyn AuditSink>) -> Self {
        Self {
            tenant_id,
            repo,
            sink,
        }
    }

    /// Persists a graded sanad and emits `sanad.created` and `sanad.graded`.
    ///
    /// Corroborating evidence ids are sorted for byte-stable serialization.
    /// The persisted defects ride on the record; a FATAL defect with any
    /// grade other than `D` is refused. The row is written first and both
    /// events emitted after; if either emission fails, the row is removed
    /// again before the error propagates, so the caller never observes a
    /// sanad without its events.
    ///
    /// # Errors
    ///
    /// Returns [`SanadError`] on an empty chain, a violated grade invariant,
    /// storage refusal, or audit failure (compensated).
    #[allow(
        clippy::too_many_arguments,
        reason = "The record's fields are the arguments; a builder would only relabel them."
    )]
    pub fn create_graded(
        &self,
        claim_id: &ClaimId,
        deal_id: &DealId,
        primary_evidence_id: idis_core::EvidenceId,
        mut corroborating_evidence_ids: Vec<idis_core::EvidenceId>,
        transmission_chain: Vec<TransmissionNode>,
        extraction_confidence: f64,
        outcome: &GradeOutcome,
        defects: Vec<idis_core::Defect>,
        request_id: &RequestId,
    ) -> Result<Sanad, SanadError> {
        if transmission_chain.is_empty() {
            return Err(SanadError::EmptyChain);
        }
        let has_fatal = defects
            .iter()
            .any(|defect| defect.severity == idis_core::DefectSeverity::Fatal);
        if has_fatal && outcome.grade != Grade::D {
            return Err(SanadError::FatalDefectGrade);
        }
        corroborating_evidence_ids.sort();
        let sanad = Sanad {
            sanad_id: SanadId::new(Uuid::new_v4().to_string()),
            tenant_id: self.tenant_id.clone(),
            claim_id: claim_id.clone(),
            deal_id: deal_id.clone(),
            primary_evidence_id,
            corroborating_evidence_ids,
            transmission_chain,
            extraction_confidence,
            dhabt_score: outcome.dhabt_score,
            corroboration_status: outcome.corroboration_status,
            sanad_grade: outcome.grade,
            grade_explanation: outcome.explanation.clone(),
            defects,
            created_at: Timestamp::now(),
        };
        self.repo.create(&sanad)?;

        let created = service_event(
            &self.tenant_id,
            request_id,
            "sanad",
            "sanad.created",
            AuditSeverity::Low,
            "sanad",
            sanad.sanad_id.as_str(),
            "sanad created",
            BTreeMap::new(),
        );
        if let Err(err) = self.sink.emit(&created) {
            // Compensate the durable write before propagating.
            self.repo.delete(&self.tenant_id, &sanad.sanad_id)?;
            return Err(SanadError::AuditEmitFailed(err));
        }

        let mut safe = BTreeMap::new();
        safe.insert(
            "grade".to_string(),
            Value::String(outcome.grade.letter().to_string()),
        );
        safe.insert(
            "defect_count".to_string(),
            Value::Number(outcome.defects.len().into()),
        );
        let graded = service_event(
            &self.tenant_id,
            request_id,
            "sanad",
            "sanad.graded",
            AuditSeverity::Low,
            "sanad",
            sanad.sanad_id.as_str(),
            "sanad graded",
            safe,
        );
        if let Err(err) = self.sink.emit(&graded) {
            self.repo.delete(&self.tenant_id, &sanad.sanad_id)?;
            return Err(SanadError::AuditEmitFailed(err));
        }
        Ok(sanad)
    }
}

// ============================================================================
// SECTION: Auto-Grade Results
// ============================================================================

/// Grading outcome for a single claim.
///
/// # Invariants
/// - `status == "grade_failed"` implies `error` is present.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimGradeResult {
    /// Claim graded.
    pub claim_id: ClaimId,
    /// Persisted sanad, when grading succeeded.
    pub sanad_id: Option<SanadId>,
    /// Computed grade, when grading succeeded.
    pub grade: Option<Grade>,
    /// Persisted defect ids.
    pub defect_ids: Vec<DefectId>,
    /// `graded` or `grade_failed`.
    pub status: String,
    /// Error description when grading failed.
    pub error: Option<String>,
}

/// Aggregate result for all claims in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoGradeRunResult {
    /// Pipeline run scope.
    pub run_id: idis_core::RunId,
    /// Per-claim grading results, in input order.
    pub results: Vec<ClaimGradeResult>,
    /// Successfully graded claim count.
    pub graded_count: usize,
    /// Failed claim count.
    pub failed_count: usize,
    /// Total defects persisted across claims.
    pub total_defects: usize,
}

impl AutoGradeRunResult {
    /// Returns whether every claim failed grading.
    #[must_use]
    pub const fn all_failed(&self) -> bool {
        self.failed_count > 0 && self.graded_count == 0
    }
}

// ============================================================================
// SECTION: Auto-Grade Step
// ============================================================================

/// Auto-grades all extracted claims for a run.
///
/// For each claim: gather evidence, build the chain, grade, persist the
/// sanad and its defects, and apply the grading to the claim. Failures mark
/// the claim `grade_failed` and continue with the remaining claims.
///
/// # Errors
///
/// Returns [`SanadError::AuditEmitFailed`] when any audit emission fails —
/// the step aborts immediately per the fail-closed audit contract.
#[allow(
    clippy::too_many_arguments,
    reason = "The step wires every provenance service; a context struct would only relabel them."
)]
pub fn auto_grade_claims_for_run(
    run_id: &idis_core::RunId,
    deal_id: &DealId,
    created_claim_ids: &[ClaimId],
    evidence_repo: &dyn EvidenceRepo,
    claims_service: &ClaimsService,
    sanad_service: &SanadService,
    defect_service: &DefectService,
    dabt_by_claim: &BTreeMap<ClaimId, DabtDimensions>,
    request_id: &RequestId,
) -> Result<AutoGradeRunResult, SanadError> {
    let mut result = AutoGradeRunResult {
        run_id: run_id.clone(),
        results: Vec::with_capacity(created_claim_ids.len()),
        graded_count: 0,
        failed_count: 0,
        total_defects: 0,
    };

    for claim_id in created_claim_ids {
        let claim_result = grade_single_claim(
            claim_id,
            deal_id,
            evidence_repo,
            claims_service,
            sanad_service,
            defect_service,
            dabt_by_claim.get(claim_id),
            request_id,
        )?;
        if claim_result.status == "graded" {
            result.graded_count += 1;
        } else {
            result.failed_count += 1;
        }
        result.total_defects += claim_result.defect_ids.len();
        result.results.push(claim_result);
    }

    Ok(result)
}

/// Grades one claim end to end: chain, grade, persist, update.
#[allow(
    clippy::too_many_arguments,
    reason = "Mirrors the step signature; every argument is a distinct service seam."
)]
fn grade_single_claim(
    claim_id: &ClaimId,
    deal_id: &DealId,
    evidence_repo: &dyn EvidenceRepo,
    claims_service: &ClaimsService,
    sanad_service: &SanadService,
    defect_service: &DefectService,
    dabt: Option<&DabtDimensions>,
    request_id: &RequestId,
) -> Result<ClaimGradeResult, SanadError> {
    let claim = match claims_service.get(claim_id) {
        Ok(claim) => claim,
        Err(_) => {
            error!(claim_id = %claim_id, "claim missing at grade time");
            return Ok(grade_failed(claim_id, "claim not found"));
        }
    };
    let tenant_id = claim.tenant_id.clone();
    let evidence = evidence_repo.get_by_claim(&tenant_id, claim_id);

    let built = match build_sanad_chain(claim_id, &evidence, Timestamp::now()) {
        Ok(built) => built,
        Err(err) => {
            error!(claim_id = %claim_id, "chain build failed");
            // A claim with no provenance chain is unusable for IC output.
            match claims_service.apply_grading(
                claim_id,
                Grade::D,
                idis_core::ClaimVerdict::Blocked,
                None,
                vec![],
                request_id,
            ) {
                Ok(_) => {}
                Err(crate::claims_service::ClaimsServiceError::AuditEmitFailed(inner)) => {
                    return Err(SanadError::AuditEmitFailed(inner));
                }
                Err(update_err) => {
                    error!(claim_id = %claim_id, "blocked-claim update failed: {update_err}");
                }
            }
            return Ok(grade_failed(claim_id, &err.to_string()));
        }
    };

    let claim_value = claim_attested_value(&claim.value);
    let Some(primary) = evidence.first() else {
        return Ok(grade_failed(claim_id, "no primary evidence"));
    };
    let outcome = grade_sanad(&GradeInput {
        chain: &built.transmission_chain,
        primary,
        sources: &evidence,
        claim_value: claim_value.as_ref(),
        materiality: claim.materiality,
        dabt,
    });

    let mut persisted_defects = Vec::with_capacity(outcome.defects.len());
    let mut defect_ids = Vec::with_capacity(outcome.defects.len());
    for detected in &outcome.defects {
        let persisted = defect_service
            .create(
                CreateDefectInput {
                    claim_id: claim_id.clone(),
                    deal_id: deal_id.clone(),
                    defect_type: detected.code.defect_type(),
                    description: detected.description.clone(),
                    cure_protocol: "HUMAN_ARBITRATION".to_string(),
                },
                request_id,
            )
            .map_err(|err| match err {
                crate::defect_service::DefectServiceError::AuditEmitFailed(inner) => {
                    SanadError::AuditEmitFailed(inner)
                }
                crate::defect_service::DefectServiceError::Repo(inner) => SanadError::Repo(inner),
                other => {
                    error!(claim_id = %claim_id, "defect persistence failed: {other}");
                    SanadError::Repo(ProvenanceRepoError::Store(other.to_string()))
                }
            })?;
        defect_ids.push(persisted.defect_id.clone());
        persisted_defects.push(persisted);
    }

    let corroborating: Vec<idis_core::EvidenceId> = evidence
        .iter()
        .skip(1)
        .map(|item| item.evidence_id.clone())
        .collect();
    let sanad = sanad_service.create_graded(
        claim_id,
        deal_id,
        built.primary_evidence_id,
        corroborating,
        built.transmission_chain,
        0.9,
        &outcome,
        persisted_defects,
        request_id,
    )?;

    match claims_service.apply_grading(
        claim_id,
        outcome.grade,
        outcome.verdict,
        Some(sanad.sanad_id.clone()),
        defect_ids.clone(),
        request_id,
    ) {
        Ok(_) => {}
        Err(crate::claims_service::ClaimsServiceError::AuditEmitFailed(inner)) => {
            return Err(SanadError::AuditEmitFailed(inner));
        }
        Err(err) => {
            error!(claim_id = %claim_id, "claim grade update failed: {err}");
            return Ok(grade_failed(claim_id, &err.to_string()));
        }
    }

    info!(claim_id = %claim_id, grade = %outcome.grade, "claim graded");
    Ok(ClaimGradeResult {
        claim_id: claim_id.clone(),
        sanad_id: Some(sanad.sanad_id),
        grade: Some(outcome.grade),
        defect_ids,
        status: "graded".to_string(),
        error: None,
    })
}

/// Builds a `grade_failed` result.
fn grade_failed(claim_id: &ClaimId, reason: &str) -> ClaimGradeResult {
    ClaimGradeResult {
        claim_id: claim_id.clone(),
        sanad_id: None,
        grade: None,
        defect_ids: vec![],
        status: "grade_failed".to_string(),
        error: Some(reason.to_string()),
    }
}

/// Extracts an attested value from a claim's structured value payload.
fn claim_attested_value(value: &Option<Value>) -> Option<AttestedValue> {
    let object = value.as_ref()?.as_object()?;
    let raw = object.get("amount")?;
    let raw = match raw {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    Some(AttestedValue {
        raw,
        unit: object
            .get("unit")
            .and_then(Value::as_str)
            .map(str::to_string),
        period: object
            .get("period")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions are permitted."
    )]
    use super::*;

    #[test]
    fn attested_value_parses_amount_unit_period() {
        let value = serde_json::json!({"amount": "5200000", "unit": "USD", "period": "2025-Q4"});
        let parsed = claim_attested_value(&Some(value));
        assert_eq!(
            parsed,
            Some(AttestedValue {
                raw: "5200000".to_string(),
                unit: Some("USD".to_string()),
                period: Some("2025-Q4".to_string()),
            })
        );
    }

    #[test]
    fn non_object_values_have_no_attestation() {
        assert_eq!(claim_attested_value(&Some(serde_json::json!(42))), None);
        assert_eq!(claim_attested_value(&None), None);
    }
}
