// crates/idis-audit/src/sink.rs
// ============================================================================
// Module: Audit Sinks
// Description: Append-only audit sinks (canonical JSONL file, in-memory).
// Purpose: Deliver validated events durably; fail the caller on any error.
// Dependencies: crate::event, idis-core, serde_jcs, thiserror, tracing
// ============================================================================

//! ## Overview
//! A sink exposes one operation: [`AuditSink::emit`]. Emission is synchronous
//! and fail-closed — callers must not continue, must not report success, and
//! must compensate any durable write already performed when emission fails.
//! The file sink writes one RFC 8785 canonical JSON line per event and
//! flushes before returning. The in-memory sink backs tests and the
//! composition root's default wiring.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing::error;

use crate::event::AuditEvent;
use crate::event::AuditEventError;
use crate::event::validate_event;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Audit emission errors. Any variant is fatal to the triggering operation.
///
/// # Invariants
/// - Variants are stable for programmatic handling; all map to the
///   `AUDIT_EMIT_FAILED` error kind at the boundary.
#[derive(Debug, Error)]
pub enum AuditSinkError {
    /// Event failed payload hygiene validation.
    #[error("audit event rejected: {0}")]
    Rejected(#[from] AuditEventError),
    /// Event could not be canonically serialized.
    #[error("audit serialization failed: {0}")]
    Serialization(String),
    /// Sink storage refused the write.
    #[error("audit sink io error: {0}")]
    Io(String),
}

// ============================================================================
// SECTION: Sink Trait
// ============================================================================

/// Append-only audit sink.
///
/// Emission is synchronous from the caller's perspective. Implementations
/// must be durable before returning `Ok` and must never partially apply an
/// event.
pub trait AuditSink: Send + Sync {
    /// Validates and appends one event.
    ///
    /// # Errors
    ///
    /// Returns [`AuditSinkError`] when validation or the append fails; the
    /// caller's operation must then fail without reporting success.
    fn emit(&self, event: &AuditEvent) -> Result<(), AuditSinkError>;
}

// ============================================================================
// SECTION: Memory Sink
// ============================================================================

/// In-memory append-only sink for tests and default wiring.
///
/// # Invariants
/// - Events are stored in emission order.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    /// Recorded events in emission order.
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Returns the recorded events matching `event_type`.
    #[must_use]
    pub fn events_of_type(&self, event_type: &str) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.event_type == event_type)
            .collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn emit(&self, event: &AuditEvent) -> Result<(), AuditSinkError> {
        validate_event(event)?;
        let mut guard = self
            .events
            .lock()
            .map_err(|_| AuditSinkError::Io("memory sink poisoned".to_string()))?;
        guard.push(event.clone());
        Ok(())
    }
}

// ============================================================================
// SECTION: File Sink
// ============================================================================

/// File-backed sink writing one canonical JSON line per event.
///
/// # Invariants
/// - Lines are appended in emission order and flushed before `emit` returns.
/// - A path that is a directory or unwritable fails emission.
#[derive(Debug)]
pub struct FileAuditSink {
    /// Log file path, kept for diagnostics.
    path: PathBuf,
    /// Open append handle guarded for cross-thread emission.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens or creates the audit log at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditSinkError::Io`] when the path is a directory or cannot
    /// be opened for append.
    pub fn open(path: &Path) -> Result<Self, AuditSinkError> {
        if path.is_dir() {
            return Err(AuditSinkError::Io(format!(
                "audit log path is a directory: {}",
                path.display()
            )));
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| AuditSinkError::Io(err.to_string()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Returns the configured log path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileAuditSink {
    fn emit(&self, event: &AuditEvent) -> Result<(), AuditSinkError> {
        validate_event(event)?;
        let mut line = serde_jcs::to_vec(event)
            .map_err(|err| AuditSinkError::Serialization(err.to_string()))?;
        line.push(b'\n');
        let mut guard = self
            .file
            .lock()
            .map_err(|_| AuditSinkError::Io("file sink poisoned".to_string()))?;
        if let Err(err) = guard.write_all(&line).and_then(|()| guard.flush()) {
            error!(path = %self.path.display(), "audit append failed");
            return Err(AuditSinkError::Io(err.to_string()));
        }
        Ok(())
    }
}
