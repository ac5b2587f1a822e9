// crates/idis-deliverables/src/generator.rs
// ============================================================================
// Module: Deliverable Generation
// Description: Validate-before-assemble generation with audited outcomes.
// Purpose: Emit complete, fully referenced bundles or nothing at all.
// Dependencies: crate::bundle, idis-audit, idis-core, idis-gates, serde_jcs
// ============================================================================

//! ## Overview
//! Generation is fail-closed: all preconditions are checked before any
//! document is assembled. A missing report type, an unreferenced factual
//! section, or a dangling reference aborts the run with
//! `deliverable.generation.failed`. Assembly applies the ordering rules —
//! appendix entries by `(ref_type, ref_id)`, truth rows by
//! `(dimension, assertion)`, QA items by `(topic, agent_type, question)`,
//! references sorted within every fact — so output is byte-stable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use idis_audit::AuditActor;
use idis_audit::AuditActorType;
use idis_audit::AuditEvent;
use idis_audit::AuditPayload;
use idis_audit::AuditRequest;
use idis_audit::AuditResource;
use idis_audit::AuditSeverity;
use idis_audit::AuditSink;
use idis_audit::AuditSinkError;
use idis_core::AgentRole;
use idis_core::ClaimId;
use idis_core::EventId;
use idis_core::FactSection;
use idis_core::HashDigest;
use idis_core::RequestId;
use idis_core::Timestamp;
use idis_core::sha256_hex;
use idis_gates::no_free_facts::KnownRefs;
use idis_gates::validate_sections;
use serde_json::Value;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::bundle::AgentReport;
use crate::bundle::AnalysisBundle;
use crate::bundle::AppendixEntry;
use crate::bundle::AuditAppendix;
use crate::bundle::DealContext;
use crate::bundle::DeliverableBundle;
use crate::bundle::DeliverableKind;
use crate::bundle::QAItem;
use crate::bundle::REQUIRED_AGENT_TYPES;
use crate::bundle::Routing;
use crate::bundle::Scorecard;
use crate::bundle::SectionedDeliverable;
use crate::bundle::TruthRow;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Deliverable generation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum DeliverableError {
    /// A required agent report is missing.
    #[error("missing required agent report: {0}")]
    MissingReport(String),
    /// A factual section violated the No-Free-Facts rule.
    #[error("no-free-facts violation at {path}: {reason}")]
    NoFreeFacts {
        /// Deterministic path of the failing section.
        path: String,
        /// Stable failure reason.
        reason: String,
    },
    /// Canonical serialization failed during export.
    #[error("bundle export failed: {0}")]
    Export(String),
    /// Audit emission failed; generation did not complete.
    #[error("audit emission failed: {0}")]
    AuditEmitFailed(#[from] AuditSinkError),
}

// ============================================================================
// SECTION: Export Result
// ============================================================================

/// Exported bundle bytes with integrity metadata.
///
/// # Invariants
/// - `sha256` covers exactly `content_bytes`; `content_len` equals its
///   length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverableExportResult {
    /// Canonical bundle bytes.
    pub content_bytes: Vec<u8>,
    /// SHA-256 of the bytes.
    pub sha256: HashDigest,
    /// Byte length of the content.
    pub content_len: usize,
}

/// Exports a bundle as canonical JSON bytes with integrity metadata.
///
/// # Errors
///
/// Returns [`DeliverableError::Export`] when serialization fails.
pub fn export_bundle(bundle: &DeliverableBundle) -> Result<DeliverableExportResult, DeliverableError> {
    let content_bytes =
        serde_jcs::to_vec(bundle).map_err(|err| DeliverableError::Export(err.to_string()))?;
    let sha256 = sha256_hex(&content_bytes);
    let content_len = content_bytes.len();
    Ok(DeliverableExportResult {
        content_bytes,
        sha256,
        content_len,
    })
}

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Deliverables generator bound to an audit sink.
pub struct DeliverablesGenerator<'a> {
    /// Audit sink; emission failure propagates.
    sink: &'a dyn AuditSink,
}

impl<'a> DeliverablesGenerator<'a> {
    /// Creates a generator.
    #[must_use]
    pub const fn new(sink: &'a dyn AuditSink) -> Self {
        Self { sink }
    }

    /// Validates and assembles the deliverable bundle.
    ///
    /// # Errors
    ///
    /// Returns [`DeliverableError`] when any precondition fails (after
    /// emitting `deliverable.generation.failed`) or when audit emission
    /// itself fails.
    pub fn generate(
        &self,
        context: &DealContext,
        analysis: &AnalysisBundle,
        scorecard: &Scorecard,
        request_id: &RequestId,
    ) -> Result<DeliverableBundle, DeliverableError> {
        self.emit(context, request_id, "deliverable.generation.started", |_| {})?;

        if let Err(err) = validate_preconditions(context, analysis) {
            let code = match &err {
                DeliverableError::MissingReport(_) => "MISSING_REPORT",
                DeliverableError::NoFreeFacts { .. } => "NO_FREE_FACTS_VIOLATION",
                DeliverableError::Export(_) => "EXPORT_FAILED",
                DeliverableError::AuditEmitFailed(_) => "AUDIT_EMIT_FAILED",
            };
            self.emit(context, request_id, "deliverable.generation.failed", |safe| {
                safe.insert(
                    "error_code".to_string(),
                    Value::String(code.to_string()),
                );
            })?;
            return Err(err);
        }

        let bundle = assemble(context, analysis, scorecard);
        let count = bundle.deliverable_count();
        self.emit(context, request_id, "deliverable.generation.completed", |safe| {
            safe.insert(
                "deliverable_count".to_string(),
                Value::Number(count.into()),
            );
        })?;
        info!(deal_id = %context.deal_id, count, "deliverables generated");
        Ok(bundle)
    }

    /// Emits one generation-lifecycle event, fail-closed.
    fn emit(
        &self,
        context: &DealContext,
        request_id: &RequestId,
        event_type: &str,
        fill_safe: impl FnOnce(&mut BTreeMap<String, Value>),
    ) -> Result<(), DeliverableError> {
        let mut safe = BTreeMap::new();
        fill_safe(&mut safe);
        let event = AuditEvent {
            event_id: EventId::new(Uuid::new_v4().to_string()),
            occurred_at: Timestamp::now(),
            tenant_id: context.tenant_id.clone(),
            actor: AuditActor {
                actor_type: AuditActorType::System,
                actor_id: "deliverables-generator".to_string(),
                roles: vec!["SERVICE".to_string()],
                ip: None,
                user_agent: None,
            },
            request: AuditRequest {
                request_id: request_id.clone(),
                method: "POST".to_string(),
                path: format!("/internal/deliverables/{}", context.deal_id),
                status_code: None,
                idempotency_key: None,
            },
            resource: AuditResource {
                resource_type: "deliverable_bundle".to_string(),
                resource_id: context.deal_id.to_string(),
            },
            event_type: event_type.to_string(),
            severity: AuditSeverity::Medium,
            summary: format!("deliverable generation: {event_type}"),
            payload: AuditPayload {
                safe,
                hashes: vec![],
                refs: vec![],
            },
        };
        self.sink.emit(&event)?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Checks every generation precondition before assembly.
fn validate_preconditions(
    context: &DealContext,
    analysis: &AnalysisBundle,
) -> Result<(), DeliverableError> {
    for required in REQUIRED_AGENT_TYPES {
        if !analysis.reports.contains_key(required) {
            return Err(DeliverableError::MissingReport(required.label().to_string()));
        }
    }
    let known = KnownRefs {
        claim_ids: context.known_claim_ids.clone(),
        calc_ids: context.known_calc_ids.clone(),
    };
    for (role, report) in &analysis.reports {
        let outcome = validate_sections(&report.sections, Some(&known));
        if let Some(first) = outcome.errors.first() {
            return Err(DeliverableError::NoFreeFacts {
                path: format!("reports[{}].{}", role.label(), first.path),
                reason: first.reason.clone(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Assembly
// ============================================================================

/// Assembles the bundle with the byte-stable ordering rules applied.
fn assemble(
    context: &DealContext,
    analysis: &AnalysisBundle,
    scorecard: &Scorecard,
) -> DeliverableBundle {
    let mut truth_dashboard: Vec<TruthRow> = Vec::new();
    let mut qa_brief: Vec<QAItem> = Vec::new();
    let mut refs: BTreeSet<AppendixEntry> = BTreeSet::new();

    for report in analysis.reports.values() {
        for row in &report.truth_rows {
            let mut row = row.clone();
            row.claim_refs.sort();
            collect_claim_refs(&mut refs, &row.claim_refs);
            truth_dashboard.push(row);
        }
        for item in &report.qa_items {
            let mut item = item.clone();
            item.claim_refs.sort();
            collect_claim_refs(&mut refs, &item.claim_refs);
            qa_brief.push(item);
        }
        for section in &report.sections {
            collect_section_refs(&mut refs, section);
        }
    }
    truth_dashboard.sort_by(|a, b| {
        (a.dimension.as_str(), a.assertion.as_str())
            .cmp(&(b.dimension.as_str(), b.assertion.as_str()))
    });
    qa_brief.sort_by(|a, b| {
        (a.topic.as_str(), a.agent_type, a.question.as_str())
            .cmp(&(b.topic.as_str(), b.agent_type, b.question.as_str()))
    });

    let screening_snapshot = sectioned(
        DeliverableKind::ScreeningSnapshot,
        context,
        analysis,
        &[AgentRole::Advocate, AgentRole::RiskOfficer],
    );
    let ic_memo = sectioned(
        DeliverableKind::IcMemo,
        context,
        analysis,
        REQUIRED_AGENT_TYPES,
    );
    let decline_letter = (scorecard.routing == Routing::Decline).then(|| {
        sectioned(
            DeliverableKind::DeclineLetter,
            context,
            analysis,
            &[AgentRole::Arbiter, AgentRole::RiskOfficer],
        )
    });

    DeliverableBundle {
        screening_snapshot,
        ic_memo,
        truth_dashboard,
        qa_brief,
        decline_letter,
        audit_appendix: AuditAppendix {
            entries: refs.into_iter().collect(),
        },
        scorecard: scorecard.clone(),
    }
}

/// Builds a sectioned document from the named reports, in role order.
fn sectioned(
    kind: DeliverableKind,
    context: &DealContext,
    analysis: &AnalysisBundle,
    roles: &[AgentRole],
) -> SectionedDeliverable {
    let mut sections: Vec<FactSection> = Vec::new();
    for role in roles {
        if let Some(report) = analysis.reports.get(role) {
            for section in &report.sections {
                let mut section = section.clone();
                section.referenced_claim_ids.sort();
                section.referenced_calc_ids.sort();
                sections.push(section);
            }
        }
    }
    SectionedDeliverable {
        kind,
        deal_name: context.deal_name.clone(),
        sections,
    }
}

/// Collects claim references into the appendix set.
fn collect_claim_refs(refs: &mut BTreeSet<AppendixEntry>, claim_refs: &[ClaimId]) {
    for claim in claim_refs {
        refs.insert(AppendixEntry {
            ref_type: "claim".to_string(),
            ref_id: claim.to_string(),
        });
    }
}

/// Collects a section's references into the appendix set.
fn collect_section_refs(refs: &mut BTreeSet<AppendixEntry>, section: &FactSection) {
    collect_claim_refs(refs, &section.referenced_claim_ids);
    for calc in &section.referenced_calc_ids {
        refs.insert(AppendixEntry {
            ref_type: "calc".to_string(),
            ref_id: calc.to_string(),
        });
    }
}

/// Reference assembly helper used by tests.
#[must_use]
pub fn report_with_sections(agent_type: AgentRole, sections: Vec<FactSection>) -> AgentReport {
    AgentReport {
        agent_type,
        sections,
        truth_rows: vec![],
        qa_items: vec![],
    }
}
