// crates/idis-sanad/src/events.rs
// ============================================================================
// Module: Service Audit Event Construction
// Description: Shared builder for provenance-service audit events.
// Purpose: Keep event shape uniform across claim, defect, and sanad services.
// Dependencies: idis-audit, idis-core, serde_json, uuid
// ============================================================================

//! ## Overview
//! Provenance services emit system-actor events with id-only payloads. The
//! builder centralizes the shape so every service event carries the same
//! actor, request, and payload hygiene.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use idis_audit::AuditActor;
use idis_audit::AuditActorType;
use idis_audit::AuditEvent;
use idis_audit::AuditPayload;
use idis_audit::AuditRequest;
use idis_audit::AuditResource;
use idis_audit::AuditSeverity;
use idis_core::EventId;
use idis_core::RequestId;
use idis_core::TenantId;
use idis_core::Timestamp;
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builds a system-actor audit event with an id-only payload.
pub(crate) fn service_event(
    tenant_id: &TenantId,
    request_id: &RequestId,
    service: &str,
    event_type: &str,
    severity: AuditSeverity,
    resource_type: &str,
    resource_id: &str,
    summary: &str,
    safe: BTreeMap<String, Value>,
) -> AuditEvent {
    AuditEvent {
        event_id: EventId::new(Uuid::new_v4().to_string()),
        occurred_at: Timestamp::now(),
        tenant_id: tenant_id.clone(),
        actor: AuditActor {
            actor_type: AuditActorType::System,
            actor_id: service.to_string(),
            roles: vec!["SERVICE".to_string()],
            ip: None,
            user_agent: None,
        },
        request: AuditRequest {
            request_id: request_id.clone(),
            method: "POST".to_string(),
            path: format!("/internal/{service}"),
            status_code: None,
            idempotency_key: None,
        },
        resource: AuditResource {
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
        },
        event_type: event_type.to_string(),
        severity,
        summary: summary.to_string(),
        payload: AuditPayload {
            safe,
            hashes: vec![],
            refs: vec![],
        },
    }
}
