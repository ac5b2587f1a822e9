// crates/idis-policy/src/break_glass.rs
// ============================================================================
// Module: Break-Glass Tokens
// Description: Time-limited emergency-access tokens with mandatory audit.
// Purpose: Let unassigned admins act on a deal under a signed, audited grant.
// Dependencies: idis-core, idis-audit, base64, blake3, subtle, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! A break-glass token is a signed bearer string scoped to
//! `{actor_id, tenant_id, deal_id?, justification, iat, exp}` with a maximum
//! lifetime of fifteen minutes. The signature is a keyed BLAKE3 MAC over the
//! scope's canonical JSON, derived from the process-wide secret; comparison
//! is constant-time. Validation without a configured secret denies. Every
//! successful validation emits exactly one `break_glass.used` event of
//! severity CRITICAL carrying only hashes and length metadata — if that
//! emission fails, the access is denied.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use idis_audit::AuditActor;
use idis_audit::AuditActorType;
use idis_audit::AuditEvent;
use idis_audit::AuditPayload;
use idis_audit::AuditRequest;
use idis_audit::AuditResource;
use idis_audit::AuditSeverity;
use idis_audit::AuditSink;
use idis_audit::AuditSinkError;
use idis_core::ActorId;
use idis_core::DealId;
use idis_core::EventId;
use idis_core::RequestId;
use idis_core::TenantId;
use idis_core::Timestamp;
use idis_core::canonical_json_bytes;
use idis_core::sha256_hex;
use serde::Deserialize;
use serde::Serialize;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum break-glass token lifetime in seconds (fifteen minutes).
pub const MAX_TOKEN_LIFETIME_SECONDS: i64 = 15 * 60;

/// Minimum justification length in non-whitespace characters.
pub const MIN_JUSTIFICATION_CHARS: usize = 20;

/// Key-derivation context for the token MAC key.
const MAC_KEY_CONTEXT: &str = "idis break-glass token mac v1";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Break-glass creation and validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Every validation failure denies access; there is no advisory mode.
#[derive(Debug, Error)]
pub enum BreakGlassError {
    /// No process-wide secret is configured; validation denies.
    #[error("break-glass secret not configured")]
    MissingSecret,
    /// Justification is shorter than the minimum.
    #[error("justification requires at least {MIN_JUSTIFICATION_CHARS} non-whitespace characters")]
    JustificationTooShort,
    /// Requested lifetime exceeds the maximum or is non-positive.
    #[error("token lifetime invalid or exceeds {MAX_TOKEN_LIFETIME_SECONDS}s")]
    InvalidLifetime,
    /// Token string is structurally malformed.
    #[error("malformed break-glass token")]
    Malformed,
    /// MAC verification failed.
    #[error("break-glass signature mismatch")]
    SignatureMismatch,
    /// Token has expired.
    #[error("break-glass token expired")]
    Expired,
    /// Token scope does not match the authenticated caller.
    #[error("break-glass scope mismatch: {0}")]
    ScopeMismatch(String),
    /// Mandatory audit emission failed; access is denied.
    #[error("break-glass audit emission failed: {0}")]
    AuditFailed(#[from] AuditSinkError),
    /// Scope could not be canonically serialized.
    #[error("break-glass scope serialization failed: {0}")]
    Serialization(String),
}

// ============================================================================
// SECTION: Scope
// ============================================================================

/// Signed scope of a break-glass grant.
///
/// # Invariants
/// - `exp - iat` never exceeds [`MAX_TOKEN_LIFETIME_SECONDS`].
/// - `justification` holds at least [`MIN_JUSTIFICATION_CHARS`]
///   non-whitespace characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BreakGlassScope {
    /// Actor the grant is issued to.
    pub actor_id: ActorId,
    /// Tenant the grant is bound to.
    pub tenant_id: TenantId,
    /// Deal binding; absent means any deal in the tenant.
    pub deal_id: Option<DealId>,
    /// Raw justification text; never emitted to audit.
    pub justification: String,
    /// Issued-at unix seconds.
    pub iat: i64,
    /// Expiry unix seconds.
    pub exp: i64,
}

/// Counts non-whitespace characters in a justification.
fn justification_chars(justification: &str) -> usize {
    justification.chars().filter(|c| !c.is_whitespace()).count()
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Break-glass token service bound to the process-wide secret.
///
/// # Invariants
/// - A missing secret makes every create and validate call deny.
#[derive(Debug)]
pub struct BreakGlassService {
    /// Derived 32-byte MAC key, when a secret is configured.
    mac_key: Option<[u8; 32]>,
}

impl BreakGlassService {
    /// Builds the service from the optional process-wide secret.
    #[must_use]
    pub fn new(secret: Option<&str>) -> Self {
        let mac_key = secret
            .filter(|value| !value.is_empty())
            .map(|value| blake3::derive_key(MAC_KEY_CONTEXT, value.as_bytes()));
        Self { mac_key }
    }

    /// Creates a signed token for `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`BreakGlassError`] when the secret is missing, the
    /// justification is too short, or the lifetime is invalid.
    pub fn create(&self, scope: &BreakGlassScope) -> Result<String, BreakGlassError> {
        let key = self.mac_key.ok_or(BreakGlassError::MissingSecret)?;
        if justification_chars(&scope.justification) < MIN_JUSTIFICATION_CHARS {
            return Err(BreakGlassError::JustificationTooShort);
        }
        let lifetime = scope.exp - scope.iat;
        if lifetime <= 0 || lifetime > MAX_TOKEN_LIFETIME_SECONDS {
            return Err(BreakGlassError::InvalidLifetime);
        }
        let scope_bytes = canonical_json_bytes(scope)
            .map_err(|err| BreakGlassError::Serialization(err.to_string()))?;
        let mac = blake3::keyed_hash(&key, &scope_bytes);
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&scope_bytes),
            URL_SAFE_NO_PAD.encode(mac.as_bytes())
        ))
    }

    /// Verifies a token's signature, expiry, and scope without auditing.
    ///
    /// # Errors
    ///
    /// Returns [`BreakGlassError`] on any verification failure.
    fn verify(
        &self,
        token: &str,
        tenant_id: &TenantId,
        actor_id: &ActorId,
        deal_id: Option<&DealId>,
        now: &Timestamp,
    ) -> Result<BreakGlassScope, BreakGlassError> {
        let key = self.mac_key.ok_or(BreakGlassError::MissingSecret)?;
        let (scope_part, mac_part) = token.split_once('.').ok_or(BreakGlassError::Malformed)?;
        let scope_bytes = URL_SAFE_NO_PAD
            .decode(scope_part)
            .map_err(|_| BreakGlassError::Malformed)?;
        let presented_mac = URL_SAFE_NO_PAD
            .decode(mac_part)
            .map_err(|_| BreakGlassError::Malformed)?;
        let expected_mac = blake3::keyed_hash(&key, &scope_bytes);
        let matches: bool = expected_mac
            .as_bytes()
            .as_slice()
            .ct_eq(presented_mac.as_slice())
            .into();
        if !matches {
            return Err(BreakGlassError::SignatureMismatch);
        }
        let scope: BreakGlassScope =
            serde_json::from_slice(&scope_bytes).map_err(|_| BreakGlassError::Malformed)?;
        if justification_chars(&scope.justification) < MIN_JUSTIFICATION_CHARS {
            return Err(BreakGlassError::JustificationTooShort);
        }
        if scope.exp - scope.iat <= 0 || scope.exp - scope.iat > MAX_TOKEN_LIFETIME_SECONDS {
            return Err(BreakGlassError::InvalidLifetime);
        }
        if now.unix_seconds() >= scope.exp {
            return Err(BreakGlassError::Expired);
        }
        if scope.tenant_id != *tenant_id {
            return Err(BreakGlassError::ScopeMismatch("tenant".to_string()));
        }
        if scope.actor_id != *actor_id {
            return Err(BreakGlassError::ScopeMismatch("actor".to_string()));
        }
        if let Some(bound) = &scope.deal_id {
            match deal_id {
                Some(requested) if requested == bound => {}
                _ => return Err(BreakGlassError::ScopeMismatch("deal".to_string())),
            }
        }
        Ok(scope)
    }

    /// Validates a token and emits the mandatory `break_glass.used` event.
    ///
    /// Exactly one CRITICAL event is emitted per successful validation. If
    /// emission fails, the access is denied and the error propagates.
    ///
    /// # Errors
    ///
    /// Returns [`BreakGlassError`] on verification failure or audit failure.
    pub fn validate_and_audit(
        &self,
        token: &str,
        tenant_id: &TenantId,
        actor_id: &ActorId,
        deal_id: Option<&DealId>,
        now: &Timestamp,
        request_id: &RequestId,
        sink: &dyn AuditSink,
    ) -> Result<BreakGlassScope, BreakGlassError> {
        let scope = self.verify(token, tenant_id, actor_id, deal_id, now)?;
        let event = build_used_event(&scope, token, now, request_id);
        if let Err(err) = sink.emit(&event) {
            warn!("break-glass audit emission failed; denying access");
            return Err(BreakGlassError::AuditFailed(err));
        }
        Ok(scope)
    }
}

// ============================================================================
// SECTION: Audit Event Construction
// ============================================================================

/// Builds the CRITICAL `break_glass.used` event for a validated scope.
fn build_used_event(
    scope: &BreakGlassScope,
    token: &str,
    now: &Timestamp,
    request_id: &RequestId,
) -> AuditEvent {
    let mut payload = AuditPayload::default();
    let scope_label = scope.deal_id.as_ref().map_or_else(
        || format!("tenant:{}", scope.tenant_id),
        |deal| format!("tenant:{}:deal:{deal}", scope.tenant_id),
    );
    payload
        .safe
        .insert("scope".to_string(), serde_json::Value::String(scope_label));
    payload.safe.insert(
        "expires_at".to_string(),
        serde_json::Value::Number(scope.exp.into()),
    );
    payload.safe.insert(
        "justification_len".to_string(),
        serde_json::Value::Number(scope.justification.len().into()),
    );
    payload
        .hashes
        .push(format!("token:{}", sha256_hex(token.as_bytes())));
    payload.hashes.push(format!(
        "justification:{}",
        sha256_hex(scope.justification.as_bytes())
    ));
    AuditEvent {
        event_id: EventId::new(Uuid::new_v4().to_string()),
        occurred_at: *now,
        tenant_id: scope.tenant_id.clone(),
        actor: AuditActor {
            actor_type: AuditActorType::Human,
            actor_id: scope.actor_id.to_string(),
            roles: vec!["ADMIN".to_string()],
            ip: None,
            user_agent: None,
        },
        request: AuditRequest {
            request_id: request_id.clone(),
            method: "POST".to_string(),
            path: "/internal/break-glass/validate".to_string(),
            status_code: None,
            idempotency_key: None,
        },
        resource: AuditResource {
            resource_type: "break_glass_token".to_string(),
            resource_id: sha256_hex(token.as_bytes()).as_str().to_string(),
        },
        event_type: "break_glass.used".to_string(),
        severity: AuditSeverity::Critical,
        summary: "break-glass token used".to_string(),
        payload,
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions are permitted."
    )]

    use idis_audit::MemoryAuditSink;

    use super::*;

    fn scope(now: &Timestamp) -> BreakGlassScope {
        BreakGlassScope {
            actor_id: ActorId::new("admin-1"),
            tenant_id: TenantId::new("tenant-1"),
            deal_id: Some(DealId::new("deal-1")),
            justification: "Emergency valuation review before IC meeting".to_string(),
            iat: now.unix_seconds(),
            exp: now.unix_seconds() + 600,
        }
    }

    #[test]
    fn create_then_validate_round_trips() {
        let now = Timestamp::parse("2026-03-01T00:00:00Z").unwrap();
        let service = BreakGlassService::new(Some("test-secret"));
        let sink = MemoryAuditSink::new();
        let token = service.create(&scope(&now)).unwrap();

        let validated = service
            .validate_and_audit(
                &token,
                &TenantId::new("tenant-1"),
                &ActorId::new("admin-1"),
                Some(&DealId::new("deal-1")),
                &now,
                &RequestId::new("req-1"),
                &sink,
            )
            .unwrap();
        assert_eq!(validated.actor_id, ActorId::new("admin-1"));

        let used = sink.events_of_type("break_glass.used");
        assert_eq!(used.len(), 1);
        assert_eq!(used[0].severity, AuditSeverity::Critical);
        assert_eq!(used[0].payload.hashes.len(), 2);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let now = Timestamp::parse("2026-03-01T00:00:00Z").unwrap();
        let service = BreakGlassService::new(Some("test-secret"));
        let token = service.create(&scope(&now)).unwrap();
        let mut bytes = token.into_bytes();
        let last = bytes.len() - 1;
        bytes[last] = if bytes[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        let sink = MemoryAuditSink::new();
        let err = service.validate_and_audit(
            &tampered,
            &TenantId::new("tenant-1"),
            &ActorId::new("admin-1"),
            Some(&DealId::new("deal-1")),
            &now,
            &RequestId::new("req-1"),
            &sink,
        );
        assert!(err.is_err());
        assert!(sink.events().is_empty(), "no audit on failed validation");
    }

    #[test]
    fn short_justification_rejects_at_creation() {
        let now = Timestamp::parse("2026-03-01T00:00:00Z").unwrap();
        let service = BreakGlassService::new(Some("test-secret"));
        let mut s = scope(&now);
        s.justification = "too short".to_string();
        assert!(matches!(
            service.create(&s),
            Err(BreakGlassError::JustificationTooShort)
        ));
    }

    #[test]
    fn lifetime_over_fifteen_minutes_rejects() {
        let now = Timestamp::parse("2026-03-01T00:00:00Z").unwrap();
        let service = BreakGlassService::new(Some("test-secret"));
        let mut s = scope(&now);
        s.exp = s.iat + MAX_TOKEN_LIFETIME_SECONDS + 1;
        assert!(matches!(
            service.create(&s),
            Err(BreakGlassError::InvalidLifetime)
        ));
    }

    #[test]
    fn missing_secret_denies_validation() {
        let now = Timestamp::parse("2026-03-01T00:00:00Z").unwrap();
        let service = BreakGlassService::new(None);
        assert!(matches!(
            service.create(&scope(&now)),
            Err(BreakGlassError::MissingSecret)
        ));
    }
}
