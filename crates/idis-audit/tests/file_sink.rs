// crates/idis-audit/tests/file_sink.rs
// ============================================================================
// Module: File Audit Sink Tests
// Description: Verifies canonical JSONL emission and fail-closed behavior.
// ============================================================================
//! ## Overview
//! Ensures the file sink writes byte-exact canonical lines, appends in
//! order, and refuses directory paths so callers fail closed.

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

use std::fs;

use idis_audit::AuditActor;
use idis_audit::AuditActorType;
use idis_audit::AuditEvent;
use idis_audit::AuditPayload;
use idis_audit::AuditRequest;
use idis_audit::AuditResource;
use idis_audit::AuditSeverity;
use idis_audit::AuditSink;
use idis_audit::FileAuditSink;
use idis_audit::MemoryAuditSink;
use idis_core::EventId;
use idis_core::RequestId;
use idis_core::TenantId;
use idis_core::Timestamp;
use serde_json::json;

fn event(event_id: &str, event_type: &str) -> AuditEvent {
    AuditEvent {
        event_id: EventId::new(event_id),
        occurred_at: Timestamp::parse("2026-03-01T00:00:00Z").unwrap(),
        tenant_id: TenantId::new("1b2d7a90-5f44-4a1e-a1c3-55aa05b1d001"),
        actor: AuditActor {
            actor_type: AuditActorType::System,
            actor_id: "orchestrator".to_string(),
            roles: vec!["SERVICE".to_string()],
            ip: None,
            user_agent: None,
        },
        request: AuditRequest {
            request_id: RequestId::new("req-1"),
            method: "POST".to_string(),
            path: "/v1/runs".to_string(),
            status_code: None,
            idempotency_key: None,
        },
        resource: AuditResource {
            resource_type: "run".to_string(),
            resource_id: "run-1".to_string(),
        },
        event_type: event_type.to_string(),
        severity: AuditSeverity::Low,
        summary: "test event".to_string(),
        payload: AuditPayload::default(),
    }
}

#[test]
fn file_sink_writes_one_canonical_line_per_event() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let sink = FileAuditSink::open(&path).unwrap();

    sink.emit(&event("evt-1", "run.step.grade.started")).unwrap();
    sink.emit(&event("evt-2", "run.step.grade.completed")).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);

    // Canonical form: sorted keys, minimal separators.
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["event_id"], json!("evt-1"));
    assert!(!lines[0].contains(": "), "no inter-element whitespace");
    let keys: Vec<&str> = first
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    let mut sorted = keys.clone();
    sorted.sort_unstable();
    assert_eq!(keys, sorted, "top-level keys are sorted");
}

#[test]
fn file_sink_refuses_directory_path() {
    let dir = tempfile::tempdir().unwrap();
    let err = FileAuditSink::open(dir.path());
    assert!(err.is_err(), "directory path must fail sink construction");
}

#[test]
fn reopened_sink_appends_after_existing_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    {
        let sink = FileAuditSink::open(&path).unwrap();
        sink.emit(&event("evt-1", "claim.created")).unwrap();
    }
    {
        let sink = FileAuditSink::open(&path).unwrap();
        sink.emit(&event("evt-2", "claim.updated")).unwrap();
    }
    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 2);
}

#[test]
fn memory_sink_records_in_emission_order() {
    let sink = MemoryAuditSink::new();
    sink.emit(&event("evt-1", "claim.created")).unwrap();
    sink.emit(&event("evt-2", "claim.updated")).unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_id, EventId::new("evt-1"));
    assert_eq!(sink.events_of_type("claim.updated").len(), 1);
}
