// crates/idis-config/src/registry.rs
// ============================================================================
// Module: Service Registry
// Description: Construction-time wiring of sinks, stores, and services.
// Purpose: Replace process-wide globals with one explicit composition root.
// Dependencies: crate::env, idis-audit, idis-calc, idis-object-store,
//               idis-policy, tracing-subscriber
// ============================================================================

//! ## Overview
//! The registry is built once at startup and holds references for the
//! application's lifetime; nothing relies on module-initialization order.
//! Tests construct fresh registries instead of mutating globals. Wiring
//! follows the config fail-closed: a directory audit path fails registry
//! construction, and a missing break-glass secret yields a service that
//! denies every token.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use idis_audit::AuditSink;
use idis_audit::FileAuditSink;
use idis_audit::MemoryAuditSink;
use idis_calc::CalcRegistry;
use idis_calc::formulas::builtin_registry;
use idis_object_store::FilesystemObjectStore;
use idis_object_store::ObjectStoreError;
use idis_policy::BreakGlassService;
use idis_policy::InMemoryAssignmentStore;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::env::IdisConfig;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry construction errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Audit sink construction failed (bad path, unwritable file).
    #[error("audit sink construction failed: {0}")]
    AuditSink(String),
    /// Object store construction failed.
    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),
}

// ============================================================================
// SECTION: Tracing
// ============================================================================

/// Initializes the process-wide tracing subscriber.
///
/// Safe to call once at startup; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Process-wide service registry.
///
/// # Invariants
/// - Built once at startup; read-mostly for the process lifetime.
pub struct ServiceRegistry {
    /// Parsed configuration the registry was built from.
    pub config: IdisConfig,
    /// Audit sink shared by every service.
    pub audit_sink: Arc<dyn AuditSink>,
    /// Break-glass token service.
    pub break_glass: BreakGlassService,
    /// Formula registry with built-ins registered.
    pub calc_registry: CalcRegistry,
    /// Deal assignment store for ABAC checks.
    pub assignments: Arc<InMemoryAssignmentStore>,
    /// Tenant-prefixed object store.
    pub object_store: FilesystemObjectStore,
}

impl ServiceRegistry {
    /// Wires the registry from parsed configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the audit sink or object store cannot
    /// be constructed — a registry never comes up half-wired.
    pub fn build(config: IdisConfig) -> Result<Self, RegistryError> {
        let audit_sink: Arc<dyn AuditSink> = match &config.audit_log_path {
            Some(path) => Arc::new(
                FileAuditSink::open(path).map_err(|err| RegistryError::AuditSink(err.to_string()))?,
            ),
            None => Arc::new(MemoryAuditSink::new()),
        };
        let break_glass = BreakGlassService::new(config.break_glass_secret.as_deref());
        let object_store =
            FilesystemObjectStore::new(&config.object_store_base_dir, audit_sink.clone())?;
        Ok(Self {
            config,
            audit_sink,
            break_glass,
            calc_registry: builtin_registry(),
            assignments: Arc::new(InMemoryAssignmentStore::new()),
            object_store,
        })
    }
}
