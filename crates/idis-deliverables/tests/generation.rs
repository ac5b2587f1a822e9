// crates/idis-deliverables/tests/generation.rs
// ============================================================================
// Module: Deliverable Generation Tests
// Description: Preconditions, ordering stability, and audited outcomes.
// ============================================================================
//! ## Overview
//! Verifies fail-closed validation (missing reports, free facts, dangling
//! references), byte-stable ordering under repeated generation, the
//! decline-letter routing rule, and generation lifecycle events.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;

use idis_audit::MemoryAuditSink;
use idis_core::AgentRole;
use idis_core::CalcId;
use idis_core::ClaimId;
use idis_core::DealId;
use idis_core::FactSection;
use idis_core::Grade;
use idis_core::RequestId;
use idis_core::TenantId;
use idis_deliverables::AgentReport;
use idis_deliverables::AnalysisBundle;
use idis_deliverables::DealContext;
use idis_deliverables::DeliverableError;
use idis_deliverables::DeliverablesGenerator;
use idis_deliverables::QAItem;
use idis_deliverables::Routing;
use idis_deliverables::Scorecard;
use idis_deliverables::TruthRow;
use idis_deliverables::export_bundle;

fn section(text: &str, claims: &[&str]) -> FactSection {
    FactSection {
        text: text.to_string(),
        is_factual: true,
        is_subjective: false,
        referenced_claim_ids: claims.iter().map(|id| ClaimId::new(*id)).collect(),
        referenced_calc_ids: vec![],
    }
}

fn context() -> DealContext {
    DealContext {
        tenant_id: TenantId::new("tenant-1"),
        deal_id: DealId::new("deal-1"),
        deal_name: "Acme Robotics".to_string(),
        known_claim_ids: ["claim-1", "claim-2", "claim-3"]
            .into_iter()
            .map(ClaimId::new)
            .collect(),
        known_calc_ids: [CalcId::new("calc-1")].into_iter().collect(),
    }
}

fn full_bundle() -> AnalysisBundle {
    let roles = [
        AgentRole::Advocate,
        AgentRole::SanadBreaker,
        AgentRole::ContradictionFinder,
        AgentRole::RiskOfficer,
        AgentRole::Arbiter,
        AgentRole::FinancialAnalyst,
        AgentRole::MarketAnalyst,
        AgentRole::TechnicalDiligence,
    ];
    let mut reports = BTreeMap::new();
    for role in roles {
        reports.insert(
            role,
            AgentReport {
                agent_type: role,
                sections: vec![section("grounded statement", &["claim-2", "claim-1"])],
                truth_rows: vec![TruthRow {
                    dimension: "financial".to_string(),
                    assertion: format!("{} assertion", role.label()),
                    verdict: "VERIFIED".to_string(),
                    grade: Grade::B,
                    claim_refs: vec![ClaimId::new("claim-2"), ClaimId::new("claim-1")],
                }],
                qa_items: vec![QAItem {
                    topic: "revenue".to_string(),
                    agent_type: role,
                    question: "What drives Q4 concentration?".to_string(),
                    claim_refs: vec![ClaimId::new("claim-3")],
                }],
            },
        );
    }
    AnalysisBundle { reports }
}

fn scorecard(routing: Routing) -> Scorecard {
    Scorecard {
        overall_score: 72.5,
        routing,
    }
}

#[test]
fn generation_emits_started_and_completed() {
    let sink = MemoryAuditSink::new();
    let generator = DeliverablesGenerator::new(&sink);
    let bundle = generator
        .generate(
            &context(),
            &full_bundle(),
            &scorecard(Routing::Proceed),
            &RequestId::new("req-1"),
        )
        .unwrap();

    assert_eq!(bundle.deliverable_count(), 4);
    assert!(bundle.decline_letter.is_none());
    assert_eq!(
        sink.events_of_type("deliverable.generation.started").len(),
        1
    );
    assert_eq!(
        sink.events_of_type("deliverable.generation.completed").len(),
        1
    );
}

#[test]
fn decline_routing_adds_the_decline_letter() {
    let sink = MemoryAuditSink::new();
    let generator = DeliverablesGenerator::new(&sink);
    let bundle = generator
        .generate(
            &context(),
            &full_bundle(),
            &scorecard(Routing::Decline),
            &RequestId::new("req-1"),
        )
        .unwrap();
    assert_eq!(bundle.deliverable_count(), 5);
    assert!(bundle.decline_letter.is_some());
}

#[test]
fn missing_report_fails_closed_with_failed_event() {
    let sink = MemoryAuditSink::new();
    let generator = DeliverablesGenerator::new(&sink);
    let mut analysis = full_bundle();
    analysis.reports.remove(&AgentRole::MarketAnalyst);

    let err = generator.generate(
        &context(),
        &analysis,
        &scorecard(Routing::Proceed),
        &RequestId::new("req-1"),
    );
    assert!(matches!(err, Err(DeliverableError::MissingReport(_))));
    assert_eq!(
        sink.events_of_type("deliverable.generation.failed").len(),
        1
    );
}

#[test]
fn free_fact_or_dangling_reference_fails_closed() {
    let sink = MemoryAuditSink::new();
    let generator = DeliverablesGenerator::new(&sink);

    let mut analysis = full_bundle();
    if let Some(report) = analysis.reports.get_mut(&AgentRole::Advocate) {
        report.sections = vec![section("unreferenced factual statement", &[])];
    }
    let err = generator.generate(
        &context(),
        &analysis,
        &scorecard(Routing::Proceed),
        &RequestId::new("req-1"),
    );
    assert!(matches!(err, Err(DeliverableError::NoFreeFacts { .. })));

    let mut analysis = full_bundle();
    if let Some(report) = analysis.reports.get_mut(&AgentRole::Advocate) {
        report.sections = vec![section("dangling reference", &["claim-unknown"])];
    }
    let err = generator.generate(
        &context(),
        &analysis,
        &scorecard(Routing::Proceed),
        &RequestId::new("req-1"),
    );
    assert!(matches!(err, Err(DeliverableError::NoFreeFacts { .. })));
}

#[test]
fn repeated_generation_is_byte_stable() {
    let sink = MemoryAuditSink::new();
    let generator = DeliverablesGenerator::new(&sink);
    let run = || {
        let bundle = generator
            .generate(
                &context(),
                &full_bundle(),
                &scorecard(Routing::Proceed),
                &RequestId::new("req-1"),
            )
            .unwrap();
        export_bundle(&bundle).unwrap()
    };
    let first = run();
    let second = run();
    assert_eq!(first.content_bytes, second.content_bytes);
    assert_eq!(first.sha256, second.sha256);
    assert_eq!(first.content_len, first.content_bytes.len());
}

#[test]
fn appendix_and_rows_are_sorted_and_distinct() {
    let sink = MemoryAuditSink::new();
    let generator = DeliverablesGenerator::new(&sink);
    let bundle = generator
        .generate(
            &context(),
            &full_bundle(),
            &scorecard(Routing::Proceed),
            &RequestId::new("req-1"),
        )
        .unwrap();

    let entries = &bundle.audit_appendix.entries;
    let mut sorted = entries.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(*entries, sorted, "appendix sorted by (ref_type, ref_id)");

    let mut rows = bundle.truth_dashboard.clone();
    rows.sort_by(|a, b| {
        (a.dimension.as_str(), a.assertion.as_str())
            .cmp(&(b.dimension.as_str(), b.assertion.as_str()))
    });
    assert_eq!(bundle.truth_dashboard, rows);

    for row in &bundle.truth_dashboard {
        let mut refs = row.claim_refs.clone();
        refs.sort();
        assert_eq!(row.claim_refs, refs, "claim refs sorted within rows");
    }
}
