// crates/idis-deliverables/src/lib.rs
// ============================================================================
// Module: IDIS Deliverables Generator
// Description: Evidence-linked deliverable bundles with validate-before-export.
// Purpose: Assemble byte-stable, fully referenced deliverables or nothing.
// Dependencies: idis-core, idis-audit, idis-gates, serde, serde_jcs, thiserror
// ============================================================================

//! ## Overview
//! The generator takes the analysis bundle, scorecard, and deal context and
//! produces up to five deliverables. Validation runs before any assembly:
//! one report per required agent type, every factual section referenced per
//! the No-Free-Facts rule, and every reference resolvable in the deal's
//! registry. Ordering rules make repeated generation byte-stable. Every run
//! emits `deliverable.generation.started` then `.completed` or `.failed`;
//! audit-sink failure propagates.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod bundle;
pub mod generator;

pub use bundle::AgentReport;
pub use bundle::AnalysisBundle;
pub use bundle::AppendixEntry;
pub use bundle::AuditAppendix;
pub use bundle::DealContext;
pub use bundle::DeliverableBundle;
pub use bundle::QAItem;
pub use bundle::Routing;
pub use bundle::Scorecard;
pub use bundle::TruthRow;
pub use generator::DeliverableError;
pub use generator::DeliverableExportResult;
pub use generator::DeliverablesGenerator;
pub use generator::export_bundle;
