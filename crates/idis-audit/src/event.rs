// crates/idis-audit/src/event.rs
// ============================================================================
// Module: Audit Event Schema
// Description: The closed audit event shape and payload hygiene validation.
// Purpose: Keep secrets and justification text out of the audit stream.
// Dependencies: idis-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! An [`AuditEvent`] is a closed struct: unknown top-level fields reject at
//! deserialization. The payload is partitioned into `safe` (ids, lengths,
//! category tags), `hashes` (tagged SHA-256 hex strings), and `refs` (opaque
//! ids). [`validate_event`] refuses any event that smuggles raw free text
//! outside `summary` — validation runs before sink I/O, so a malformed event
//! never reaches storage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use idis_core::EventId;
use idis_core::RequestId;
use idis_core::TenantId;
use idis_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum length of a `safe` string value.
const MAX_SAFE_STRING_LEN: usize = 128;
/// Maximum length of the event summary.
const MAX_SUMMARY_LEN: usize = 512;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Audit event validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - The first failing path in deterministic traversal order is reported.
#[derive(Debug, Error)]
pub enum AuditEventError {
    /// A payload field carried disallowed raw content.
    #[error("unsafe audit payload at {path}: {reason}")]
    UnsafePayload {
        /// Deterministic path of the offending field.
        path: String,
        /// Why the value was refused.
        reason: String,
    },
    /// A required field was empty.
    #[error("missing audit field: {0}")]
    MissingField(String),
}

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Audit event severity.
///
/// # Invariants
/// - Variants are stable wire strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditSeverity {
    /// Routine mutation.
    Low,
    /// Noteworthy mutation.
    Medium,
    /// Sensitive mutation (promotion, waiver).
    High,
    /// Emergency-access or integrity-relevant mutation.
    Critical,
}

// ============================================================================
// SECTION: Event Components
// ============================================================================

/// Kind of principal that triggered an event.
///
/// # Invariants
/// - Variants are stable wire strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditActorType {
    /// Human principal.
    Human,
    /// Machine principal.
    System,
    /// Model-backed agent.
    Agent,
}

/// Actor block of an audit event.
///
/// # Invariants
/// - `roles` are the roles held at event time, not a permission grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditActor {
    /// Principal kind.
    pub actor_type: AuditActorType,
    /// Principal identifier.
    pub actor_id: String,
    /// Roles held at event time.
    pub roles: Vec<String>,
    /// Caller IP, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Caller user agent, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Request block of an audit event.
///
/// # Invariants
/// - `request_id` is supplied by the transport layer and never synthesized
///   from event content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditRequest {
    /// Transport request identifier.
    pub request_id: RequestId,
    /// HTTP-style method label.
    pub method: String,
    /// Operation path label.
    pub path: String,
    /// Response status code, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Idempotency key, when the caller supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

/// Resource block of an audit event.
///
/// # Invariants
/// - `resource_id` is an opaque identifier, never a composite of user data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditResource {
    /// Resource type label (e.g. `claim`, `prompt`).
    pub resource_type: String,
    /// Resource identifier.
    pub resource_id: String,
}

/// Partitioned audit payload.
///
/// # Invariants
/// - `safe` values are booleans, numbers, or identifier-shaped strings.
/// - `hashes` entries match `label:64-hex`.
/// - `refs` are opaque ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditPayload {
    /// Safe scalar facts (lengths, counts, category tags, ids).
    #[serde(default)]
    pub safe: BTreeMap<String, Value>,
    /// Tagged SHA-256 hex digests of sensitive content.
    #[serde(default)]
    pub hashes: Vec<String>,
    /// Opaque entity references.
    #[serde(default)]
    pub refs: Vec<String>,
}

// ============================================================================
// SECTION: Audit Event
// ============================================================================

/// One append-only audit event.
///
/// # Invariants
/// - Unknown top-level fields reject at deserialization.
/// - `payload` never carries raw secrets or justification text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: EventId,
    /// Event timestamp (UTC).
    pub occurred_at: Timestamp,
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Actor block.
    pub actor: AuditActor,
    /// Request block.
    pub request: AuditRequest,
    /// Resource block.
    pub resource: AuditResource,
    /// Event type label (e.g. `claim.created`).
    pub event_type: String,
    /// Severity.
    pub severity: AuditSeverity,
    /// Human-readable summary; the only free-text field.
    pub summary: String,
    /// Partitioned payload.
    pub payload: AuditPayload,
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Returns whether `value` looks like an identifier-shaped token: no
/// whitespace, bounded length.
fn is_safe_token(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_SAFE_STRING_LEN
        && !value.chars().any(char::is_whitespace)
}

/// Returns whether `entry` matches the `label:64-hex` hash form.
fn is_tagged_hash(entry: &str) -> bool {
    let Some((label, hex)) = entry.rsplit_once(':') else {
        return false;
    };
    !label.is_empty()
        && hex.len() == 64
        && hex.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

/// Validates an event's payload hygiene before sink I/O.
///
/// # Errors
///
/// Returns [`AuditEventError`] naming the first failing path in
/// deterministic traversal order.
pub fn validate_event(event: &AuditEvent) -> Result<(), AuditEventError> {
    if event.event_type.is_empty() {
        return Err(AuditEventError::MissingField("event_type".to_string()));
    }
    if event.summary.len() > MAX_SUMMARY_LEN {
        return Err(AuditEventError::UnsafePayload {
            path: "summary".to_string(),
            reason: format!("exceeds {MAX_SUMMARY_LEN} bytes"),
        });
    }
    for (key, value) in &event.payload.safe {
        let path = format!("payload.safe.{key}");
        match value {
            Value::Bool(_) | Value::Number(_) => {}
            Value::String(text) => {
                if !is_safe_token(text) {
                    return Err(AuditEventError::UnsafePayload {
                        path,
                        reason: "free text is not permitted outside summary".to_string(),
                    });
                }
            }
            Value::Null | Value::Array(_) | Value::Object(_) => {
                return Err(AuditEventError::UnsafePayload {
                    path,
                    reason: "only scalar values are permitted".to_string(),
                });
            }
        }
    }
    for (idx, entry) in event.payload.hashes.iter().enumerate() {
        if !is_tagged_hash(entry) {
            return Err(AuditEventError::UnsafePayload {
                path: format!("payload.hashes[{idx}]"),
                reason: "expected label:64-lowercase-hex".to_string(),
            });
        }
    }
    for (idx, entry) in event.payload.refs.iter().enumerate() {
        if !is_safe_token(entry) {
            return Err(AuditEventError::UnsafePayload {
                path: format!("payload.refs[{idx}]"),
                reason: "refs must be opaque ids".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions are permitted."
    )]

    use serde_json::json;

    use super::*;

    /// Builds a minimal valid event for hygiene tests.
    fn sample_event() -> AuditEvent {
        AuditEvent {
            event_id: EventId::new("evt-1"),
            occurred_at: Timestamp::parse("2026-03-01T00:00:00Z").unwrap(),
            tenant_id: TenantId::new("tenant-1"),
            actor: AuditActor {
                actor_type: AuditActorType::System,
                actor_id: "svc-1".to_string(),
                roles: vec![],
                ip: None,
                user_agent: None,
            },
            request: AuditRequest {
                request_id: RequestId::new("req-1"),
                method: "POST".to_string(),
                path: "/v1/claims".to_string(),
                status_code: None,
                idempotency_key: None,
            },
            resource: AuditResource {
                resource_type: "claim".to_string(),
                resource_id: "claim-1".to_string(),
            },
            event_type: "claim.created".to_string(),
            severity: AuditSeverity::Low,
            summary: "claim created".to_string(),
            payload: AuditPayload::default(),
        }
    }

    #[test]
    fn scalar_safe_values_pass() {
        let mut event = sample_event();
        event.payload.safe.insert("count".to_string(), json!(3));
        event
            .payload
            .safe
            .insert("grade".to_string(), json!("B"));
        assert!(validate_event(&event).is_ok());
    }

    #[test]
    fn free_text_in_safe_is_refused() {
        let mut event = sample_event();
        event
            .payload
            .safe
            .insert("note".to_string(), json!("user wrote this sentence"));
        let err = validate_event(&event).unwrap_err();
        assert!(matches!(err, AuditEventError::UnsafePayload { .. }));
    }

    #[test]
    fn hashes_require_tagged_lowercase_hex() {
        let mut event = sample_event();
        event.payload.hashes.push(format!("token:{}", "a".repeat(64)));
        assert!(validate_event(&event).is_ok());

        event.payload.hashes.push("token:short".to_string());
        assert!(validate_event(&event).is_err());
    }

    #[test]
    fn unknown_top_level_fields_reject() {
        let mut value = serde_json::to_value(sample_event()).unwrap();
        value["surprise"] = json!(true);
        let parsed: Result<AuditEvent, _> = serde_json::from_value(value);
        assert!(parsed.is_err());
    }
}
