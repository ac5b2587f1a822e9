// crates/idis-audit/src/lib.rs
// ============================================================================
// Module: IDIS Audit
// Description: Audit event schema, payload hygiene, and append-only sinks.
// Purpose: Make every mutation emit exactly one validated audit event.
// Dependencies: idis-core, serde, serde_json, serde_jcs, thiserror, tracing
// ============================================================================

//! ## Overview
//! The audit contract is the spine of the trust model: every mutation emits
//! one event, and emission failure is fatal to the operation that triggered
//! it. Sinks are append-only; the file sink writes one canonical (RFC 8785)
//! JSON line per event. Payload hygiene is enforced before any sink I/O —
//! raw free text is permitted only in `summary`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod event;
pub mod sink;

pub use event::AuditActor;
pub use event::AuditActorType;
pub use event::AuditEvent;
pub use event::AuditPayload;
pub use event::AuditRequest;
pub use event::AuditResource;
pub use event::AuditSeverity;
pub use event::validate_event;
pub use sink::AuditSink;
pub use sink::AuditSinkError;
pub use sink::FileAuditSink;
pub use sink::MemoryAuditSink;
