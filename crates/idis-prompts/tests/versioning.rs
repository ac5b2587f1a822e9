// crates/idis-prompts/tests/versioning.rs
// ============================================================================
// Module: Prompt Registry and Versioning Tests
// Description: Strict loading, gated promotion, atomicity, and compensation.
// ============================================================================
//! ## Overview
//! Exercises the strict loader (mismatches, schema refs, semver), the gate
//! requirements per risk class, pointer-file canonical form, and the
//! compensation path when audit emission fails after a pointer write.

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
use std::path::Path;
use std::sync::Arc;

use idis_audit::AuditEvent;
use idis_audit::AuditSink;
use idis_audit::AuditSinkError;
use idis_audit::MemoryAuditSink;
use idis_core::RequestId;
use idis_core::TenantId;
use idis_core::Timestamp;
use idis_prompts::Environment;
use idis_prompts::GateResult;
use idis_prompts::PromotionRequest;
use idis_prompts::PromptRegistry;
use idis_prompts::PromptRegistryError;
use idis_prompts::PromptVersioningError;
use idis_prompts::PromptVersioningService;
use idis_prompts::RegistryFile;
use idis_prompts::RollbackRequest;
use serde_json::json;

/// Sink that refuses every event.
struct FailingSink;

impl AuditSink for FailingSink {
    fn emit(&self, _event: &AuditEvent) -> Result<(), AuditSinkError> {
        Err(AuditSinkError::Io("audit store down".to_string()))
    }
}

fn write_artifact(root: &Path, prompt_id: &str, version: &str, risk_class: &str) {
    let dir = root.join(prompt_id).join(version);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("prompt.md"), "You are the advocate.\n").unwrap();
    let metadata = json!({
        "prompt_id": prompt_id,
        "version": version,
        "status": "STAGING",
        "risk_class": risk_class,
        "validation_gates_required": risk_class_gates(risk_class),
        "evaluation_results_ref": "eval://results/1",
    });
    fs::write(
        dir.join("metadata.json"),
        serde_json::to_string_pretty(&metadata).unwrap(),
    )
    .unwrap();
}

fn risk_class_gates(risk_class: &str) -> Vec<u8> {
    match risk_class {
        "LOW" => vec![1],
        "MEDIUM" => vec![1, 2],
        _ => vec![1, 2, 3, 4],
    }
}

fn seed_pointer(registry: &PromptRegistry, prompts: &[(&str, &str)]) {
    let file = RegistryFile {
        env: Environment::Prod,
        updated_at: Timestamp::parse("2026-01-01T00:00:00Z").unwrap(),
        prompts: prompts
            .iter()
            .map(|(id, version)| ((*id).to_string(), (*version).to_string()))
            .collect(),
    };
    registry.write_pointer(&file).unwrap();
}

fn gates(passing: &[u8]) -> Vec<GateResult> {
    passing
        .iter()
        .map(|gate| GateResult {
            gate: *gate,
            passed: true,
            details: "ok".to_string(),
        })
        .collect()
}

#[test]
fn loader_rejects_mismatched_metadata() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), "advocate", "1.0.0", "LOW");
    // Corrupt the metadata version.
    let meta_path = dir.path().join("advocate/1.0.0/metadata.json");
    let raw = fs::read_to_string(&meta_path).unwrap();
    fs::write(&meta_path, raw.replace("1.0.0", "2.0.0")).unwrap();

    let registry = PromptRegistry::new(dir.path().to_path_buf(), None);
    let err = registry.load_artifact("advocate", "1.0.0");
    assert!(matches!(err, Err(PromptRegistryError::Mismatch(_))));
}

#[test]
fn loader_fails_closed_on_schema_ref_without_schema_root() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), "advocate", "1.0.0", "LOW");
    let meta_path = dir.path().join("advocate/1.0.0/metadata.json");
    let mut metadata: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&meta_path).unwrap()).unwrap();
    metadata["schema_ref"] = json!("schemas/advocate.json");
    fs::write(&meta_path, serde_json::to_string_pretty(&metadata).unwrap()).unwrap();

    let registry = PromptRegistry::new(dir.path().to_path_buf(), None);
    let err = registry.load_artifact("advocate", "1.0.0");
    assert!(matches!(err, Err(PromptRegistryError::SchemaRef(_))));
}

#[test]
fn pointer_file_has_canonical_form() {
    let dir = tempfile::tempdir().unwrap();
    let registry = PromptRegistry::new(dir.path().to_path_buf(), None);
    seed_pointer(&registry, &[("b-prompt", "1.0.0"), ("a-prompt", "2.0.0")]);

    let raw = fs::read_to_string(registry.pointer_path(Environment::Prod)).unwrap();
    assert!(raw.ends_with('\n'), "trailing newline required");
    assert!(raw.contains("  \"env\""), "2-space indent required");
    let a_pos = raw.find("a-prompt").unwrap();
    let b_pos = raw.find("b-prompt").unwrap();
    assert!(a_pos < b_pos, "prompt keys sorted");
}

#[test]
fn promotion_requires_all_gates_for_risk_class() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), "advocate", "1.1.0", "HIGH");
    let registry = PromptRegistry::new(dir.path().to_path_buf(), None);
    seed_pointer(&registry, &[("advocate", "1.0.0")]);

    let sink = Arc::new(MemoryAuditSink::new());
    let service = PromptVersioningService::new(
        registry.clone(),
        sink.clone(),
        TenantId::new("tenant-1"),
    );

    // Gates 3 and 4 missing.
    let err = service.promote(
        &PromotionRequest {
            prompt_id: "advocate".to_string(),
            new_version: "1.1.0".to_string(),
            env: Environment::Prod,
            actor: "ops-1".to_string(),
            reason: "weekly release".to_string(),
            gate_results: gates(&[1, 2]),
        },
        &RequestId::new("req-1"),
    );
    assert!(matches!(
        err,
        Err(PromptVersioningError::GateRequirements { .. })
    ));

    // All four gates pass.
    service
        .promote(
            &PromotionRequest {
                prompt_id: "advocate".to_string(),
                new_version: "1.1.0".to_string(),
                env: Environment::Prod,
                actor: "ops-1".to_string(),
                reason: "weekly release".to_string(),
                gate_results: gates(&[1, 2, 3, 4]),
            },
            &RequestId::new("req-2"),
        )
        .unwrap();

    let pointer = registry.load_pointer(Environment::Prod).unwrap();
    assert_eq!(pointer.prompts.get("advocate").map(String::as_str), Some("1.1.0"));

    let events = sink.events_of_type("prompt.version.promoted");
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].payload.safe.get("gates_satisfied"),
        Some(&json!("1,2,3,4"))
    );
}

#[test]
fn audit_failure_after_pointer_write_compensates() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), "advocate", "1.1.0", "LOW");
    let registry = PromptRegistry::new(dir.path().to_path_buf(), None);
    seed_pointer(&registry, &[("advocate", "1.0.0")]);

    let service = PromptVersioningService::new(
        registry.clone(),
        Arc::new(FailingSink),
        TenantId::new("tenant-1"),
    );
    let err = service.promote(
        &PromotionRequest {
            prompt_id: "advocate".to_string(),
            new_version: "1.1.0".to_string(),
            env: Environment::Prod,
            actor: "ops-1".to_string(),
            reason: "weekly release".to_string(),
            gate_results: gates(&[1]),
        },
        &RequestId::new("req-1"),
    );
    assert!(matches!(err, Err(PromptVersioningError::AuditEmitFailed(_))));

    // The pointer was restored to the prior version.
    let pointer = registry.load_pointer(Environment::Prod).unwrap();
    assert_eq!(pointer.prompts.get("advocate").map(String::as_str), Some("1.0.0"));
}

#[test]
fn rollback_requires_an_existing_target() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), "advocate", "1.0.0", "LOW");
    write_artifact(dir.path(), "advocate", "1.1.0", "LOW");
    let registry = PromptRegistry::new(dir.path().to_path_buf(), None);
    seed_pointer(&registry, &[("advocate", "1.1.0")]);

    let sink = Arc::new(MemoryAuditSink::new());
    let service = PromptVersioningService::new(
        registry.clone(),
        sink.clone(),
        TenantId::new("tenant-1"),
    );

    let err = service.rollback(
        &RollbackRequest {
            prompt_id: "advocate".to_string(),
            rollback_target_version: "0.9.0".to_string(),
            env: Environment::Prod,
            actor: "ops-1".to_string(),
            reason: "regression".to_string(),
        },
        &RequestId::new("req-1"),
    );
    assert!(matches!(
        err,
        Err(PromptVersioningError::RollbackTarget { .. })
    ));

    service
        .rollback(
            &RollbackRequest {
                prompt_id: "advocate".to_string(),
                rollback_target_version: "1.0.0".to_string(),
                env: Environment::Prod,
                actor: "ops-1".to_string(),
                reason: "regression".to_string(),
            },
            &RequestId::new("req-2"),
        )
        .unwrap();
    let pointer = registry.load_pointer(Environment::Prod).unwrap();
    assert_eq!(pointer.prompts.get("advocate").map(String::as_str), Some("1.0.0"));
    assert_eq!(sink.events_of_type("prompt.version.rolledback").len(), 1);
}
