// crates/idis-sanad/src/ilal.rs
// ============================================================================
// Module: I'lal Hidden-Defect Detection
// Description: Structural checks over the transmission chain.
// Purpose: Catch chain breaks, grafting, impossible chronology, and drift.
// Dependencies: idis-core
// ============================================================================

//! ## Overview
//! I'lal defects are structural: a hop referencing a missing parent is a
//! FATAL chain break; mismatched upstream origins across linked hops are
//! FATAL grafting; a child hop timestamped before its parent is FATAL
//! impossible chronology. Version drift — a claim citing an older document
//! version while a newer one exists — is MAJOR.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use idis_core::EvidenceItem;
use idis_core::NodeId;
use idis_core::TransmissionNode;

// ============================================================================
// SECTION: Findings
// ============================================================================

/// Structural chain findings.
///
/// # Invariants
/// - Findings are ordered by detection within one pass over the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IlalFinding {
    /// A hop references a parent that does not exist (FATAL).
    ChainBreak {
        /// Description naming the dangling reference.
        description: String,
    },
    /// Linked hops disagree on upstream origin (FATAL).
    ChainGrafting {
        /// Description naming the mismatched hops.
        description: String,
    },
    /// A child hop precedes its parent in time (FATAL).
    ChronologyImpossible {
        /// Description naming the out-of-order hops.
        description: String,
    },
    /// Evidence cites a stale document version (MAJOR).
    VersionDrift {
        /// Description naming the cited and latest versions.
        description: String,
    },
}

// ============================================================================
// SECTION: Checks
// ============================================================================

/// Runs all structural checks over a chain and its evidence.
#[must_use]
pub fn inspect_chain(chain: &[TransmissionNode], sources: &[EvidenceItem]) -> Vec<IlalFinding> {
    let mut findings = Vec::new();
    let by_id: BTreeMap<&NodeId, &TransmissionNode> =
        chain.iter().map(|node| (&node.node_id, node)).collect();

    for node in chain {
        let Some(prev_id) = &node.prev_node_id else {
            continue;
        };
        let Some(parent) = by_id.get(prev_id) else {
            findings.push(IlalFinding::ChainBreak {
                description: format!(
                    "node {} references missing parent {prev_id}",
                    node.node_id
                ),
            });
            continue;
        };
        if let (Some(node_origin), Some(parent_origin)) =
            (&node.upstream_origin_id, &parent.upstream_origin_id)
            && node_origin != parent_origin
        {
            findings.push(IlalFinding::ChainGrafting {
                description: format!(
                    "node {} origin '{node_origin}' grafted onto parent {} origin '{parent_origin}'",
                    node.node_id, parent.node_id
                ),
            });
        }
        if node.timestamp.is_before(&parent.timestamp) {
            findings.push(IlalFinding::ChronologyImpossible {
                description: format!(
                    "node {} precedes its parent {} in time",
                    node.node_id, parent.node_id
                ),
            });
        }
    }

    for item in sources {
        if let (Some(cited), Some(latest)) = (item.document_version, item.latest_document_version)
            && cited < latest
        {
            findings.push(IlalFinding::VersionDrift {
                description: format!(
                    "evidence {} cites version {cited} while version {latest} exists",
                    item.evidence_id
                ),
            });
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions are permitted."
    )]

    use idis_core::ActorId;
    use idis_core::ActorType;
    use idis_core::EvidenceId;
    use idis_core::NodeType;
    use idis_core::Timestamp;

    use super::*;

    fn node(id: &str, prev: Option<&str>, at: &str, origin: Option<&str>) -> TransmissionNode {
        TransmissionNode {
            node_id: NodeId::new(id),
            node_type: NodeType::Ingest,
            actor_type: ActorType::System,
            actor_id: ActorId::new("pipeline"),
            input_refs: vec![],
            output_refs: vec![],
            timestamp: Timestamp::parse(at).unwrap(),
            prev_node_id: prev.map(NodeId::new),
            upstream_origin_id: origin.map(str::to_string),
            confidence: None,
        }
    }

    #[test]
    fn missing_parent_is_a_chain_break() {
        let chain = vec![
            node("n-1", None, "2026-01-01T00:00:00Z", Some("doc-1")),
            node("n-2", Some("n-missing"), "2026-01-01T01:00:00Z", Some("doc-1")),
        ];
        let findings = inspect_chain(&chain, &[]);
        assert!(matches!(findings[0], IlalFinding::ChainBreak { .. }));
    }

    #[test]
    fn mismatched_origins_are_grafting() {
        let chain = vec![
            node("n-1", None, "2026-01-01T00:00:00Z", Some("doc-1")),
            node("n-2", Some("n-1"), "2026-01-01T01:00:00Z", Some("doc-2")),
        ];
        let findings = inspect_chain(&chain, &[]);
        assert!(matches!(findings[0], IlalFinding::ChainGrafting { .. }));
    }

    #[test]
    fn child_before_parent_is_impossible_chronology() {
        let chain = vec![
            node("n-1", None, "2026-01-02T00:00:00Z", Some("doc-1")),
            node("n-2", Some("n-1"), "2026-01-01T00:00:00Z", Some("doc-1")),
        ];
        let findings = inspect_chain(&chain, &[]);
        assert!(matches!(findings[0], IlalFinding::ChronologyImpossible { .. }));
    }

    #[test]
    fn stale_document_version_is_drift() {
        let mut item = EvidenceItem {
            evidence_id: EvidenceId::new("ev-1"),
            source_type: "BOARD_DECK".to_string(),
            source_system: "dataroom".to_string(),
            upstream_origin_id: None,
            document_version: Some(1),
            latest_document_version: Some(2),
            attested_value: None,
            collusion_risk: None,
            coi_present: false,
            coi_severity: None,
            coi_disclosed: false,
        };
        let findings = inspect_chain(&[], std::slice::from_ref(&item));
        assert!(matches!(findings[0], IlalFinding::VersionDrift { .. }));

        item.document_version = Some(2);
        assert!(inspect_chain(&[], &[item]).is_empty());
    }
}
