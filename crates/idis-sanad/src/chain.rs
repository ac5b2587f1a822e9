// crates/idis-sanad/src/chain.rs
// ============================================================================
// Module: Sanad Chain Builder
// Description: Builds the INGEST -> EXTRACT transmission chain for a claim.
// Purpose: Give every extracted claim a non-empty, well-linked chain.
// Dependencies: idis-core, thiserror, uuid
// ============================================================================

//! ## Overview
//! The chain builder turns a claim's evidence items into an ordered
//! transmission chain: one INGEST hop per primary evidence item followed by
//! an EXTRACT hop linked to it. Building fails closed when a claim has no
//! evidence — a claim with no chain is marked `grade_failed`, never silently
//! skipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use idis_core::ActorId;
use idis_core::ActorType;
use idis_core::ClaimId;
use idis_core::EvidenceId;
use idis_core::EvidenceItem;
use idis_core::NodeId;
use idis_core::NodeType;
use idis_core::Timestamp;
use idis_core::TransmissionNode;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Chain construction errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ChainBuildError {
    /// The claim has no evidence items.
    #[error("claim {0} has no evidence items; cannot build a chain")]
    NoEvidence(ClaimId),
}

// ============================================================================
// SECTION: Built Chain
// ============================================================================

/// Output of chain construction.
///
/// # Invariants
/// - `transmission_chain` is non-empty and internally linked.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltChain {
    /// Primary evidence backing the claim.
    pub primary_evidence_id: EvidenceId,
    /// Ordered transmission chain.
    pub transmission_chain: Vec<TransmissionNode>,
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builds the transmission chain for one claim from its evidence.
///
/// The first evidence item becomes the primary source; its ingest hop roots
/// the chain and the extract hop links to it.
///
/// # Errors
///
/// Returns [`ChainBuildError::NoEvidence`] when `evidence_items` is empty.
pub fn build_sanad_chain(
    claim_id: &ClaimId,
    evidence_items: &[EvidenceItem],
    extracted_at: Timestamp,
) -> Result<BuiltChain, ChainBuildError> {
    let Some(primary) = evidence_items.first() else {
        return Err(ChainBuildError::NoEvidence(claim_id.clone()));
    };

    let ingest_node_id = NodeId::new(Uuid::new_v4().to_string());
    let ingest = TransmissionNode {
        node_id: ingest_node_id.clone(),
        node_type: NodeType::Ingest,
        actor_type: ActorType::System,
        actor_id: ActorId::new("ingest-pipeline"),
        input_refs: vec![primary.evidence_id.to_string()],
        output_refs: vec![format!("document:{}", primary.evidence_id)],
        timestamp: extracted_at,
        prev_node_id: None,
        upstream_origin_id: primary.upstream_origin_id.clone(),
        confidence: None,
    };

    let extract = TransmissionNode {
        node_id: NodeId::new(Uuid::new_v4().to_string()),
        node_type: NodeType::Extract,
        actor_type: ActorType::Agent,
        actor_id: ActorId::new("claim-extractor"),
        input_refs: vec![format!("document:{}", primary.evidence_id)],
        output_refs: vec![format!("claim:{claim_id}")],
        timestamp: extracted_at.plus_seconds(1),
        prev_node_id: Some(ingest_node_id),
        upstream_origin_id: primary.upstream_origin_id.clone(),
        confidence: Some(0.9),
    };

    Ok(BuiltChain {
        primary_evidence_id: primary.evidence_id.clone(),
        transmission_chain: vec![ingest, extract],
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
    fn empty_evidence_fails_closed() {
        let err = build_sanad_chain(
            &ClaimId::new("claim-1"),
            &[],
            Timestamp::parse("2026-03-01T00:00:00Z").unwrap(),
        );
        assert!(matches!(err, Err(ChainBuildError::NoEvidence(_))));
    }

    #[test]
    fn chain_links_extract_to_ingest() {
        let evidence = EvidenceItem {
            evidence_id: EvidenceId::new("ev-1"),
            source_type: "BOARD_DECK".to_string(),
            source_system: "dataroom".to_string(),
            upstream_origin_id: Some("doc-1".to_string()),
            document_version: None,
            latest_document_version: None,
            attested_value: None,
            collusion_risk: None,
            coi_present: false,
            coi_severity: None,
            coi_disclosed: false,
        };
        let built = build_sanad_chain(
            &ClaimId::new("claim-1"),
            &[evidence],
            Timestamp::parse("2026-03-01T00:00:00Z").unwrap(),
        )
        .unwrap();
        assert_eq!(built.transmission_chain.len(), 2);
        assert_eq!(
            built.transmission_chain[1].prev_node_id,
            Some(built.transmission_chain[0].node_id.clone())
        );
        assert!(
            built.transmission_chain[0]
                .timestamp
                .is_before(&built.transmission_chain[1].timestamp)
        );
    }
}
