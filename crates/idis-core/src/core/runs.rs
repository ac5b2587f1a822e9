// crates/idis-core/src/core/runs.rs
// ============================================================================
// Module: IDIS Run Model
// Description: Runs, canonical step sequences, and the step ledger row.
// Purpose: Capture durable run evolution for idempotent resume.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! A run traverses a canonical step sequence. The step ledger records one row
//! per attempted step; `COMPLETED` rows are skipped on resume and `FAILED`
//! rows are retried with an incremented `retry_count`. Sequences and step
//! ordering are fixed constants — the orchestrator never invents steps.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::DealId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::StepId;
use crate::core::identifiers::TenantId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Step Names
// ============================================================================

/// Canonical pipeline step names.
///
/// # Invariants
/// - Variants are stable for serialization and ledger matching.
/// - Ordering in the sequences below is normative.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepName {
    /// Verify ingested documents exist for the deal.
    IngestCheck,
    /// Extract claims from documents.
    Extract,
    /// Auto-grade extracted claims.
    Grade,
    /// Run deterministic calculations.
    Calc,
    /// Enrich claims with external context.
    Enrichment,
    /// Run the structured debate.
    Debate,
    /// Aggregate agent analysis.
    Analysis,
    /// Compute scorecard.
    Scoring,
    /// Generate deliverables.
    Deliverables,
}

impl StepName {
    /// Returns the canonical zero-based order of this step.
    #[must_use]
    pub const fn order(self) -> u32 {
        match self {
            Self::IngestCheck => 0,
            Self::Extract => 1,
            Self::Grade => 2,
            Self::Calc => 3,
            Self::Enrichment => 4,
            Self::Debate => 5,
            Self::Analysis => 6,
            Self::Scoring => 7,
            Self::Deliverables => 8,
        }
    }

    /// Returns the stable upper-case label for this step.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::IngestCheck => "INGEST_CHECK",
            Self::Extract => "EXTRACT",
            Self::Grade => "GRADE",
            Self::Calc => "CALC",
            Self::Enrichment => "ENRICHMENT",
            Self::Debate => "DEBATE",
            Self::Analysis => "ANALYSIS",
            Self::Scoring => "SCORING",
            Self::Deliverables => "DELIVERABLES",
        }
    }

    /// Returns the lower-case label used in audit event types.
    #[must_use]
    pub const fn event_label(self) -> &'static str {
        match self {
            Self::IngestCheck => "ingest_check",
            Self::Extract => "extract",
            Self::Grade => "grade",
            Self::Calc => "calc",
            Self::Enrichment => "enrichment",
            Self::Debate => "debate",
            Self::Analysis => "analysis",
            Self::Scoring => "scoring",
            Self::Deliverables => "deliverables",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Canonical step sequence for `SNAPSHOT` runs.
pub const SNAPSHOT_STEPS: &[StepName] = &[
    StepName::IngestCheck,
    StepName::Extract,
    StepName::Grade,
    StepName::Calc,
];

/// Canonical step sequence for `FULL` runs.
pub const FULL_STEPS: &[StepName] = &[
    StepName::IngestCheck,
    StepName::Extract,
    StepName::Grade,
    StepName::Calc,
    StepName::Enrichment,
    StepName::Debate,
    StepName::Analysis,
    StepName::Scoring,
    StepName::Deliverables,
];

// ============================================================================
// SECTION: Run and Step Status
// ============================================================================

/// Run execution mode.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunMode {
    /// Ingest, extract, grade, calc.
    Snapshot,
    /// Full pipeline through deliverables.
    Full,
}

impl RunMode {
    /// Returns the canonical step sequence for this mode.
    #[must_use]
    pub const fn steps(self) -> &'static [StepName] {
        match self {
            Self::Snapshot => SNAPSHOT_STEPS,
            Self::Full => FULL_STEPS,
        }
    }
}

/// Final status of a run.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// All steps completed.
    Completed,
    /// A step failed and no step completed.
    Failed,
    /// A step failed after earlier steps completed.
    Partial,
    /// A step in the sequence is not implemented in this build.
    Blocked,
}

/// Status of one step ledger row.
///
/// # Invariants
/// - Variants are stable for serialization and ledger matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    /// Row created but not yet started.
    Pending,
    /// Handler currently executing.
    Running,
    /// Handler finished; `result_summary` is stored.
    Completed,
    /// Handler raised; `error_code` and `error_message` are stored.
    Failed,
    /// Step not implemented in this build.
    Blocked,
}

// ============================================================================
// SECTION: Run Record
// ============================================================================

/// A pipeline run.
///
/// # Invariants
/// - `mode` fixes the canonical step sequence for the run's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    /// Run identifier.
    pub run_id: RunId,
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Deal scope.
    pub deal_id: DealId,
    /// Execution mode.
    pub mode: RunMode,
    /// Final status once execution ends.
    pub status: RunStatus,
}

// ============================================================================
// SECTION: Step Ledger Row
// ============================================================================

/// One attempted step in the durable ledger.
///
/// # Invariants
/// - `(run_id, step_name)` is unique; retries update the row in place with
///   an incremented `retry_count`.
/// - Rows appear in canonical step order within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStep {
    /// Ledger row identifier.
    pub step_id: StepId,
    /// Run scope.
    pub run_id: RunId,
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Canonical step name.
    pub step_name: StepName,
    /// Canonical step order.
    pub step_order: u32,
    /// Row status.
    pub status: StepStatus,
    /// Start timestamp.
    pub started_at: Timestamp,
    /// Finish timestamp, once the step ends.
    pub finished_at: Option<Timestamp>,
    /// Number of retries after the first attempt.
    pub retry_count: u32,
    /// Handler result summary merged into the run context.
    pub result_summary: BTreeMap<String, Value>,
    /// Stable error code, when failed or blocked.
    pub error_code: Option<String>,
    /// Truncated error message, when failed or blocked.
    pub error_message: Option<String>,
}
