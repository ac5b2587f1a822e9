// crates/idis-core/src/core/evidence.rs
// ============================================================================
// Module: IDIS Evidence Model
// Description: Evidence items, attested values, and transmission nodes.
// Purpose: Describe one hop of provenance and the sources behind claims.
// Dependencies: crate::core::{identifiers, time}, serde
// ============================================================================

//! ## Overview
//! An [`EvidenceItem`] points at a source artifact together with the
//! precision, independence, and conflict-of-interest attributes the Sanad
//! engine grades on. A [`TransmissionNode`] records one hop in a provenance
//! chain; chains are ordered and child timestamps must not precede their
//! parent's (enforced by the I'lal checks, not by this type).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ActorId;
use crate::core::identifiers::EvidenceId;
use crate::core::identifiers::NodeId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Actor and Node Types
// ============================================================================

/// Kind of actor that produced a transmission hop.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorType {
    /// A human operator.
    Human,
    /// An automated pipeline component.
    System,
    /// A model-backed agent.
    Agent,
}

/// Kind of transmission hop within a sanad chain.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    /// Document ingestion hop.
    Ingest,
    /// Claim extraction hop.
    Extract,
    /// Value normalization hop.
    Normalize,
    /// Human review hop.
    Review,
}

// ============================================================================
// SECTION: Attested Values
// ============================================================================

/// A value attested by a source, kept textual until compared.
///
/// # Invariants
/// - `raw` is parsed as a decimal only at reconciliation time; this type
///   performs no numeric interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestedValue {
    /// Textual decimal value as attested.
    pub raw: String,
    /// Unit label, when the source states one (e.g. `USD`, `USD_K`).
    pub unit: Option<String>,
    /// Reporting period label, when the source states one (e.g. `2025-Q4`).
    pub period: Option<String>,
}

// ============================================================================
// SECTION: Conflict of Interest
// ============================================================================

/// Severity of a disclosed or undisclosed conflict of interest.
///
/// # Invariants
/// - Variants are stable for serialization and grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoiSeverity {
    /// Low-severity interest; requires no cure.
    Low,
    /// Medium-severity interest.
    Medium,
    /// High-severity interest; undisclosed caps the grade at C.
    High,
}

// ============================================================================
// SECTION: Evidence Items
// ============================================================================

/// Pointer to a source artifact with grading attributes.
///
/// # Invariants
/// - `source_type` is an open label; the tier mapping fails closed to the
///   weakest tier for unknown values.
/// - `(source_system, upstream_origin_id)` is the independence key input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Evidence identifier.
    pub evidence_id: EvidenceId,
    /// Source-type label mapped to a tier by the Sanad engine.
    pub source_type: String,
    /// Originating system label.
    pub source_system: String,
    /// Upstream origin identifier shared by derived copies of a source.
    pub upstream_origin_id: Option<String>,
    /// Document version cited, when the artifact is versioned.
    pub document_version: Option<u32>,
    /// Latest known version of the same artifact.
    pub latest_document_version: Option<u32>,
    /// Value attested for the claim, when the source states one.
    pub attested_value: Option<AttestedValue>,
    /// Collusion-risk estimate in `[0, 1]` for independence assessment.
    pub collusion_risk: Option<f64>,
    /// Whether a conflict of interest is present for this source.
    pub coi_present: bool,
    /// Severity of the conflict, when present.
    pub coi_severity: Option<CoiSeverity>,
    /// Whether the conflict was disclosed.
    pub coi_disclosed: bool,
}

// ============================================================================
// SECTION: Transmission Nodes
// ============================================================================

/// One hop in a provenance chain.
///
/// # Invariants
/// - `prev_node_id` links to the parent hop; a dangling link is a FATAL
///   chain-break defect.
/// - `timestamp` must not precede the parent hop's timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionNode {
    /// Node identifier.
    pub node_id: NodeId,
    /// Hop kind.
    pub node_type: NodeType,
    /// Kind of actor that produced the hop.
    pub actor_type: ActorType,
    /// Actor identifier.
    pub actor_id: ActorId,
    /// Input artifact references consumed by this hop.
    pub input_refs: Vec<String>,
    /// Output artifact references produced by this hop.
    pub output_refs: Vec<String>,
    /// Hop timestamp.
    pub timestamp: Timestamp,
    /// Parent hop, when this is not the chain root.
    pub prev_node_id: Option<NodeId>,
    /// Upstream origin carried along the chain for grafting checks.
    pub upstream_origin_id: Option<String>,
    /// Extraction confidence in `[0, 1]`, when the hop reports one.
    pub confidence: Option<f64>,
}
