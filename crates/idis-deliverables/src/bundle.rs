// crates/idis-deliverables/src/bundle.rs
// ============================================================================
// Module: Deliverable Bundle Types
// Description: Reports, scorecard, deliverable documents, and the appendix.
// Purpose: Define the byte-stable composite documents the generator emits.
// Dependencies: idis-core, serde
// ============================================================================

//! ## Overview
//! Deliverables are composite documents of [`FactSection`] values plus typed
//! rows for the truth dashboard and QA brief. Every collection that reaches
//! the wire carries a defined sort order so repeated generation with the
//! same inputs is byte-identical.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use idis_core::AgentRole;
use idis_core::CalcId;
use idis_core::ClaimId;
use idis_core::DealId;
use idis_core::FactSection;
use idis_core::Grade;
use idis_core::TenantId;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Inputs
// ============================================================================

/// One agent's report contribution to the bundle.
///
/// # Invariants
/// - `sections` obey the No-Free-Facts rule (validated by the generator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReport {
    /// Authoring agent type.
    pub agent_type: AgentRole,
    /// Report sections.
    pub sections: Vec<FactSection>,
    /// Truth-dashboard rows contributed by this agent.
    pub truth_rows: Vec<TruthRow>,
    /// QA-brief items contributed by this agent.
    pub qa_items: Vec<QAItem>,
}

/// The full analysis bundle, one report per required agent type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBundle {
    /// Reports keyed by agent type.
    pub reports: BTreeMap<AgentRole, AgentReport>,
}

/// Deal routing decision carried on the scorecard.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Routing {
    /// Advance toward investment committee.
    Proceed,
    /// Request further diligence.
    FurtherDiligence,
    /// Decline the deal.
    Decline,
}

/// Scorecard summarizing the scoring step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    /// Overall score in `[0, 100]`.
    pub overall_score: f64,
    /// Routing decision.
    pub routing: Routing,
}

/// Deal context consumed by the generator.
///
/// # Invariants
/// - `known_claim_ids` and `known_calc_ids` are the deal's full registries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealContext {
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Deal scope.
    pub deal_id: DealId,
    /// Display name for rendered documents.
    pub deal_name: String,
    /// Claims registered for the deal.
    pub known_claim_ids: BTreeSet<ClaimId>,
    /// Calculations registered for the deal.
    pub known_calc_ids: BTreeSet<CalcId>,
}

// ============================================================================
// SECTION: Rows and Items
// ============================================================================

/// One truth-dashboard row.
///
/// # Invariants
/// - Rows sort by `(dimension, assertion)` in the emitted document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TruthRow {
    /// Analysis dimension label.
    pub dimension: String,
    /// Asserted statement.
    pub assertion: String,
    /// Verdict label for the assertion.
    pub verdict: String,
    /// Supporting grade.
    pub grade: Grade,
    /// Supporting claim references, sorted.
    pub claim_refs: Vec<ClaimId>,
}

/// One QA-brief item.
///
/// # Invariants
/// - Items sort by `(topic, agent_type, question)` in the emitted document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QAItem {
    /// Question topic label.
    pub topic: String,
    /// Agent type that raised the question.
    pub agent_type: AgentRole,
    /// The question for management.
    pub question: String,
    /// Context claim references, sorted.
    pub claim_refs: Vec<ClaimId>,
}

// ============================================================================
// SECTION: Appendix
// ============================================================================

/// One appendix entry naming a referenced artifact.
///
/// # Invariants
/// - Entries are distinct and sorted by `(ref_type, ref_id)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppendixEntry {
    /// Reference type (`calc` or `claim`).
    pub ref_type: String,
    /// Referenced identifier.
    pub ref_id: String,
}

/// The audit appendix enumerating every distinct reference in the bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditAppendix {
    /// Distinct entries sorted by `(ref_type, ref_id)`.
    pub entries: Vec<AppendixEntry>,
}

// ============================================================================
// SECTION: Deliverable Documents
// ============================================================================

/// Document kinds in the bundle.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliverableKind {
    /// One-page screening snapshot.
    ScreeningSnapshot,
    /// Investment-committee memo.
    IcMemo,
    /// Truth dashboard.
    TruthDashboard,
    /// Management QA brief.
    QaBrief,
    /// Decline letter (only when routing is DECLINE).
    DeclineLetter,
}

/// A section-based deliverable document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionedDeliverable {
    /// Document kind.
    pub kind: DeliverableKind,
    /// Deal display name.
    pub deal_name: String,
    /// Ordered sections.
    pub sections: Vec<FactSection>,
}

/// The assembled deliverable bundle.
///
/// # Invariants
/// - `decline_letter` is present iff the scorecard routing was DECLINE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverableBundle {
    /// Screening snapshot.
    pub screening_snapshot: SectionedDeliverable,
    /// IC memo.
    pub ic_memo: SectionedDeliverable,
    /// Truth dashboard rows, sorted.
    pub truth_dashboard: Vec<TruthRow>,
    /// QA brief items, sorted.
    pub qa_brief: Vec<QAItem>,
    /// Decline letter, when routed DECLINE.
    pub decline_letter: Option<SectionedDeliverable>,
    /// Audit appendix.
    pub audit_appendix: AuditAppendix,
    /// Scorecard echoed into the bundle.
    pub scorecard: Scorecard,
}

impl DeliverableBundle {
    /// Returns the number of deliverable documents in the bundle.
    #[must_use]
    pub const fn deliverable_count(&self) -> usize {
        // Snapshot, memo, dashboard, QA brief, plus the optional letter.
        if self.decline_letter.is_some() { 5 } else { 4 }
    }
}

/// The eight report types required before generation may begin.
pub const REQUIRED_AGENT_TYPES: &[AgentRole] = &[
    AgentRole::Advocate,
    AgentRole::SanadBreaker,
    AgentRole::ContradictionFinder,
    AgentRole::RiskOfficer,
    AgentRole::Arbiter,
    AgentRole::FinancialAnalyst,
    AgentRole::MarketAnalyst,
    AgentRole::TechnicalDiligence,
];
