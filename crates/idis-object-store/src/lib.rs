// crates/idis-object-store/src/lib.rs
// ============================================================================
// Module: IDIS Object Store
// Description: Tenant-prefixed, versioned filesystem storage with traversal
//              defense.
// Purpose: Store artifacts content-addressed per tenant, fail-closed on any
//          unsafe key or path.
// Dependencies: idis-core, idis-audit, serde, sha2, thiserror, uuid
// ============================================================================

//! ## Overview
//! Layout (bit-exact):
//!
//! ```text
//! <base>/<tenant_id>/<safe_key>_<key_hash_16hex>/
//!     _latest                 (single line: current version_id)
//!     <uuid>.data             (opaque bytes)
//!     <uuid>.meta.json        (UTF-8 JSON)
//! ```
//!
//! Every write is a new version; `_latest` is updated atomically via
//! temp + rename. Path-traversal defense is mandatory: unsafe keys reject
//! before any filesystem access, and the resolved path must remain under
//! the base directory. Tenant ids must be UUID-shaped. Mutations emit
//! `object.put` / `object.deleted`; emission failure rolls the mutation
//! back before the error propagates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use idis_audit::AuditActor;
use idis_audit::AuditActorType;
use idis_audit::AuditEvent;
use idis_audit::AuditPayload;
use idis_audit::AuditRequest;
use idis_audit::AuditResource;
use idis_audit::AuditSeverity;
use idis_audit::AuditSink;
use idis_audit::AuditSinkError;
use idis_core::EventId;
use idis_core::RequestId;
use idis_core::TenantId;
use idis_core::Timestamp;
use idis_core::is_uuid_shaped;
use idis_core::sha256_hex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Latest-version pointer file name.
const LATEST_POINTER: &str = "_latest";
/// Content file suffix.
const CONTENT_SUFFIX: &str = ".data";
/// Metadata file suffix.
const METADATA_SUFFIX: &str = ".meta.json";
/// Maximum sanitized key prefix length in the directory name.
const SAFE_KEY_PREFIX_LEN: usize = 64;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Object store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// Key contains traversal sequences or unsafe characters.
    #[error("unsafe object key")]
    PathTraversal,
    /// Tenant id is not UUID-shaped.
    #[error("invalid tenant id shape")]
    InvalidTenant,
    /// Object or version not found (cross-tenant misses look identical).
    #[error("object not found")]
    NotFound,
    /// Filesystem operation failed.
    #[error("object store io error: {0}")]
    Io(String),
    /// Audit emission failed; the mutation was rolled back.
    #[error("audit emission failed: {0}")]
    AuditEmitFailed(#[from] AuditSinkError),
}

// ============================================================================
// SECTION: Metadata
// ============================================================================

/// Per-version object metadata (`<version>.meta.json`).
///
/// # Invariants
/// - `sha256` covers the stored bytes; `size_bytes` equals their length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectMetadata {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Object key as supplied.
    pub key: String,
    /// Version identifier.
    pub version_id: String,
    /// SHA-256 of the content bytes.
    pub sha256: String,
    /// Content length in bytes.
    pub size_bytes: u64,
    /// Content type, when supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Creation timestamp.
    pub created_at: Timestamp,
}

/// A stored object returned by `get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Content bytes.
    pub data: Vec<u8>,
    /// Version metadata.
    pub metadata: ObjectMetadata,
}

// ============================================================================
// SECTION: Key Validation
// ============================================================================

/// Returns whether a key is safe: no traversal, no absolute paths, no
/// backslashes, no null bytes, and only `[A-Za-z0-9_.\-/]` characters.
fn is_safe_key(key: &str) -> bool {
    if key.is_empty()
        || key.contains('\0')
        || key.contains('\\')
        || key.starts_with('/')
        || key.starts_with('~')
    {
        return false;
    }
    if key.len() >= 2 && key.as_bytes()[1] == b':' {
        return false;
    }
    if key.split('/').any(|segment| segment == "..") {
        return false;
    }
    key.bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-' | b'/'))
}

/// Sanitizes a key into a directory-name prefix.
fn safe_key_prefix(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(SAFE_KEY_PREFIX_LEN)
        .collect()
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Filesystem-backed, tenant-prefixed object store.
pub struct FilesystemObjectStore {
    /// Resolved base directory; all paths must remain under it.
    base_dir: PathBuf,
    /// Audit sink for mutation events.
    sink: Arc<dyn AuditSink>,
}

impl FilesystemObjectStore {
    /// Creates a store rooted at `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Io`] when the base directory cannot be
    /// created or resolved.
    pub fn new(base_dir: &Path, sink: Arc<dyn AuditSink>) -> Result<Self, ObjectStoreError> {
        fs::create_dir_all(base_dir).map_err(|err| ObjectStoreError::Io(err.to_string()))?;
        let base_dir = base_dir
            .canonicalize()
            .map_err(|err| ObjectStoreError::Io(err.to_string()))?;
        debug!(base = %base_dir.display(), "object store initialized");
        Ok(Self { base_dir, sink })
    }

    /// Returns the resolved base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolves the object directory for `(tenant, key)`, fail-closed.
    fn object_dir(&self, tenant_id: &TenantId, key: &str) -> Result<PathBuf, ObjectStoreError> {
        if !is_uuid_shaped(tenant_id.as_str()) {
            return Err(ObjectStoreError::InvalidTenant);
        }
        if !is_safe_key(key) {
            return Err(ObjectStoreError::PathTraversal);
        }
        let key_hash = sha256_hex(key.as_bytes());
        let dir_name = format!("{}_{}", safe_key_prefix(key), &key_hash.as_str()[..16]);
        let dir = self.base_dir.join(tenant_id.as_str()).join(dir_name);
        // Defense in depth: the constructed path must stay under the base.
        let probe = dir
            .ancestors()
            .find(|candidate| candidate.exists())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.base_dir.clone());
        let resolved = probe
            .canonicalize()
            .map_err(|err| ObjectStoreError::Io(err.to_string()))?;
        if !resolved.starts_with(&self.base_dir) {
            return Err(ObjectStoreError::PathTraversal);
        }
        Ok(dir)
    }

    /// Stores a new version and rewires `_latest` to it.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] on unsafe inputs, I/O failure, or audit
    /// failure (the version and pointer are rolled back first).
    pub fn put(
        &self,
        tenant_id: &TenantId,
        key: &str,
        data: &[u8],
        content_type: Option<&str>,
        request_id: &RequestId,
    ) -> Result<ObjectMetadata, ObjectStoreError> {
        let dir = self.object_dir(tenant_id, key)?;
        fs::create_dir_all(&dir).map_err(|err| ObjectStoreError::Io(err.to_string()))?;
        let prior_latest = self.read_latest(&dir);

        let version_id = Uuid::new_v4().to_string();
        let metadata = ObjectMetadata {
            tenant_id: tenant_id.clone(),
            key: key.to_string(),
            version_id: version_id.clone(),
            sha256: sha256_hex(data).as_str().to_string(),
            size_bytes: data.len() as u64,
            content_type: content_type.map(str::to_string),
            created_at: Timestamp::now(),
        };

        fs::write(dir.join(format!("{version_id}{CONTENT_SUFFIX}")), data)
            .map_err(|err| ObjectStoreError::Io(err.to_string()))?;
        let meta_rendered = serde_json::to_string_pretty(&metadata)
            .map_err(|err| ObjectStoreError::Io(err.to_string()))?;
        fs::write(
            dir.join(format!("{version_id}{METADATA_SUFFIX}")),
            meta_rendered,
        )
        .map_err(|err| ObjectStoreError::Io(err.to_string()))?;
        self.write_latest(&dir, &version_id)?;

        let event = self.mutation_event(
            tenant_id,
            key,
            &version_id,
            "object.put",
            &metadata.sha256,
            request_id,
        );
        if let Err(err) = self.sink.emit(&event) {
            // Roll the version back before propagating.
            let _ = fs::remove_file(dir.join(format!("{version_id}{CONTENT_SUFFIX}")));
            let _ = fs::remove_file(dir.join(format!("{version_id}{METADATA_SUFFIX}")));
            match prior_latest {
                Some(prior) => {
                    let _ = self.write_latest(&dir, &prior);
                }
                None => {
                    let _ = fs::remove_file(dir.join(LATEST_POINTER));
                }
            }
            return Err(ObjectStoreError::AuditEmitFailed(err));
        }
        Ok(metadata)
    }

    /// Returns a version's content and metadata; `None` version reads the
    /// current `_latest`.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::NotFound`] when absent in this tenant.
    pub fn get(
        &self,
        tenant_id: &TenantId,
        key: &str,
        version: Option<&str>,
    ) -> Result<StoredObject, ObjectStoreError> {
        let dir = self.object_dir(tenant_id, key)?;
        let version_id = self.resolve_version(&dir, version)?;
        let metadata = self
            .read_metadata(&dir, &version_id)
            .ok_or(ObjectStoreError::NotFound)?;
        let data = fs::read(dir.join(format!("{version_id}{CONTENT_SUFFIX}")))
            .map_err(|_| ObjectStoreError::NotFound)?;
        Ok(StoredObject { data, metadata })
    }

    /// Returns a version's metadata without its content.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::NotFound`] when absent in this tenant.
    pub fn head(
        &self,
        tenant_id: &TenantId,
        key: &str,
        version: Option<&str>,
    ) -> Result<ObjectMetadata, ObjectStoreError> {
        let dir = self.object_dir(tenant_id, key)?;
        let version_id = self.resolve_version(&dir, version)?;
        self.read_metadata(&dir, &version_id)
            .ok_or(ObjectStoreError::NotFound)
    }

    /// Lists versions for a key, most recent first by `created_at`.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] on unsafe inputs; an unknown key lists
    /// as empty.
    pub fn list_versions(
        &self,
        tenant_id: &TenantId,
        key: &str,
    ) -> Result<Vec<ObjectMetadata>, ObjectStoreError> {
        let dir = self.object_dir(tenant_id, key)?;
        let Ok(entries) = fs::read_dir(&dir) else {
            return Ok(Vec::new());
        };
        let mut versions = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(version_id) = name.strip_suffix(METADATA_SUFFIX)
                && let Some(metadata) = self.read_metadata(&dir, version_id)
            {
                versions.push(metadata);
            }
        }
        versions.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.version_id.cmp(&a.version_id))
        });
        Ok(versions)
    }

    /// Deletes a version (or the latest when `None`), rewiring `_latest` to
    /// the next most recent remaining version.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] on unsafe inputs, missing versions, or
    /// audit failure.
    pub fn delete(
        &self,
        tenant_id: &TenantId,
        key: &str,
        version: Option<&str>,
        request_id: &RequestId,
    ) -> Result<(), ObjectStoreError> {
        let dir = self.object_dir(tenant_id, key)?;
        let version_id = self.resolve_version(&dir, version)?;
        let metadata = self
            .read_metadata(&dir, &version_id)
            .ok_or(ObjectStoreError::NotFound)?;

        fs::remove_file(dir.join(format!("{version_id}{CONTENT_SUFFIX}")))
            .map_err(|err| ObjectStoreError::Io(err.to_string()))?;
        fs::remove_file(dir.join(format!("{version_id}{METADATA_SUFFIX}")))
            .map_err(|err| ObjectStoreError::Io(err.to_string()))?;

        let remaining = self.list_versions(tenant_id, key)?;
        match remaining.first() {
            Some(next) => self.write_latest(&dir, &next.version_id)?,
            None => {
                let _ = fs::remove_file(dir.join(LATEST_POINTER));
            }
        }

        let event = self.mutation_event(
            tenant_id,
            key,
            &version_id,
            "object.deleted",
            &metadata.sha256,
            request_id,
        );
        self.sink.emit(&event)?;
        Ok(())
    }

    /// Resolves an explicit or latest version identifier.
    fn resolve_version(
        &self,
        dir: &Path,
        version: Option<&str>,
    ) -> Result<String, ObjectStoreError> {
        match version {
            Some(explicit) => {
                if !is_uuid_shaped(explicit) {
                    return Err(ObjectStoreError::NotFound);
                }
                Ok(explicit.to_string())
            }
            None => self.read_latest(dir).ok_or(ObjectStoreError::NotFound),
        }
    }

    /// Reads the `_latest` pointer.
    fn read_latest(&self, dir: &Path) -> Option<String> {
        fs::read_to_string(dir.join(LATEST_POINTER))
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Writes the `_latest` pointer atomically via temp + rename.
    fn write_latest(&self, dir: &Path, version_id: &str) -> Result<(), ObjectStoreError> {
        let tmp = dir.join(format!("._latest.{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, version_id).map_err(|err| ObjectStoreError::Io(err.to_string()))?;
        fs::rename(&tmp, dir.join(LATEST_POINTER)).map_err(|err| {
            let _ = fs::remove_file(&tmp);
            ObjectStoreError::Io(err.to_string())
        })
    }

    /// Reads one version's metadata.
    fn read_metadata(&self, dir: &Path, version_id: &str) -> Option<ObjectMetadata> {
        let raw = fs::read_to_string(dir.join(format!("{version_id}{METADATA_SUFFIX}"))).ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// Builds one object-mutation audit event.
    fn mutation_event(
        &self,
        tenant_id: &TenantId,
        key: &str,
        version_id: &str,
        event_type: &str,
        content_sha256: &str,
        request_id: &RequestId,
    ) -> AuditEvent {
        let mut safe = BTreeMap::new();
        safe.insert(
            "version_id".to_string(),
            Value::String(version_id.to_string()),
        );
        AuditEvent {
            event_id: EventId::new(Uuid::new_v4().to_string()),
            occurred_at: Timestamp::now(),
            tenant_id: tenant_id.clone(),
            actor: AuditActor {
                actor_type: AuditActorType::System,
                actor_id: "object-store".to_string(),
                roles: vec!["SERVICE".to_string()],
                ip: None,
                user_agent: None,
            },
            request: AuditRequest {
                request_id: request_id.clone(),
                method: "POST".to_string(),
                path: "/internal/objects".to_string(),
                status_code: None,
                idempotency_key: None,
            },
            resource: AuditResource {
                resource_type: "object".to_string(),
                resource_id: format!("{}:{}", sha256_hex(key.as_bytes()), version_id),
            },
            event_type: event_type.to_string(),
            severity: AuditSeverity::Low,
            summary: format!("object store mutation: {event_type}"),
            payload: AuditPayload {
                safe,
                hashes: vec![format!("content:{content_sha256}")],
                refs: vec![],
            },
        }
    }
}
