// crates/idis-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Store Implementation
// Description: WAL-mode connection handling and the repo trait impls.
// Purpose: Durable, tenant-scoped persistence behind the ledger and claim
//          seams.
// Dependencies: idis-core, idis-runs, idis-sanad, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! Entities persist as JSON snapshots in two tables:
//!
//! - `run_steps(tenant_id, run_id, step_name, step_order, snapshot)` with a
//!   composite primary key over the first three columns.
//! - `claims(tenant_id, claim_id, deal_id, snapshot)` keyed by tenant and
//!   claim.
//!
//! Snapshot (de)serialization failures map to store errors and fail the
//! calling operation; nothing is silently dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Mutex;

use idis_core::Claim;
use idis_core::ClaimId;
use idis_core::DealId;
use idis_core::RunId;
use idis_core::RunStep;
use idis_core::StepName;
use idis_core::TenantId;
use idis_runs::LedgerError;
use idis_runs::RunStepsRepo;
use idis_sanad::ClaimsRepo;
use idis_sanad::ProvenanceRepoError;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Schema version pinned via `user_version`.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// SQLite store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Database open or pragma setup failed.
    #[error("sqlite open failed: {0}")]
    Open(String),
    /// Stored schema version does not match this build.
    #[error("sqlite schema version mismatch: found {found}, expected {expected}")]
    SchemaVersion {
        /// Version found in the database.
        found: i64,
        /// Version this build expects.
        expected: i64,
    },
    /// Query or statement execution failed.
    #[error("sqlite query failed: {0}")]
    Query(String),
    /// Snapshot (de)serialization failed.
    #[error("sqlite snapshot corrupt: {0}")]
    Snapshot(String),
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for the `SQLite` store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Durable ledger and claim registry over one `SQLite` database.
pub struct SqliteStore {
    /// Guarded connection; `SQLite` serializes writers anyway.
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database, applying pragmas and the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when opening, pragma setup, schema
    /// creation, or the version check fails.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        let conn = Connection::open(&config.path)
            .map_err(|err| SqliteStoreError::Open(err.to_string()))?;
        conn.pragma_update(None, "journal_mode", "wal")
            .map_err(|err| SqliteStoreError::Open(err.to_string()))?;
        conn.pragma_update(None, "synchronous", "full")
            .map_err(|err| SqliteStoreError::Open(err.to_string()))?;
        conn.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
            .map_err(|err| SqliteStoreError::Open(err.to_string()))?;

        let found: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(|err| SqliteStoreError::Open(err.to_string()))?;
        if found == 0 {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS run_steps (
                     tenant_id  TEXT NOT NULL,
                     run_id     TEXT NOT NULL,
                     step_name  TEXT NOT NULL,
                     step_order INTEGER NOT NULL,
                     snapshot   TEXT NOT NULL,
                     PRIMARY KEY (tenant_id, run_id, step_name)
                 );
                 CREATE TABLE IF NOT EXISTS claims (
                     tenant_id TEXT NOT NULL,
                     claim_id  TEXT NOT NULL,
                     deal_id   TEXT NOT NULL,
                     snapshot  TEXT NOT NULL,
                     PRIMARY KEY (tenant_id, claim_id)
                 );",
            )
            .map_err(|err| SqliteStoreError::Open(err.to_string()))?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                .map_err(|err| SqliteStoreError::Open(err.to_string()))?;
        } else if found != SCHEMA_VERSION {
            return Err(SqliteStoreError::SchemaVersion {
                found,
                expected: SCHEMA_VERSION,
            });
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs a closure with the guarded connection.
    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| SqliteStoreError::Query("connection lock poisoned".to_string()))?;
        f(&guard)
    }
}

// ============================================================================
// SECTION: Run Step Ledger
// ============================================================================

impl RunStepsRepo for SqliteStore {
    fn get_step(
        &self,
        tenant_id: &TenantId,
        run_id: &RunId,
        step_name: StepName,
    ) -> Option<RunStep> {
        self.with_conn(|conn| {
            let snapshot: Option<String> = conn
                .query_row(
                    "SELECT snapshot FROM run_steps
                     WHERE tenant_id = ?1 AND run_id = ?2 AND step_name = ?3",
                    params![tenant_id.as_str(), run_id.as_str(), step_name.label()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|err| SqliteStoreError::Query(err.to_string()))?;
            match snapshot {
                None => Ok(None),
                Some(raw) => serde_json::from_str(&raw)
                    .map(Some)
                    .map_err(|err| SqliteStoreError::Snapshot(err.to_string())),
            }
        })
        .ok()
        .flatten()
    }

    fn upsert(&self, step: &RunStep) -> Result<(), LedgerError> {
        let snapshot = serde_json::to_string(step)
            .map_err(|err| LedgerError::Store(format!("snapshot encode failed: {err}")))?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO run_steps (tenant_id, run_id, step_name, step_order, snapshot)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (tenant_id, run_id, step_name)
                 DO UPDATE SET step_order = excluded.step_order,
                               snapshot = excluded.snapshot",
                params![
                    step.tenant_id.as_str(),
                    step.run_id.as_str(),
                    step.step_name.label(),
                    step.step_order,
                    snapshot,
                ],
            )
            .map_err(|err| SqliteStoreError::Query(err.to_string()))?;
            Ok(())
        })
        .map_err(|err| LedgerError::Store(err.to_string()))
    }

    fn get_by_run(&self, tenant_id: &TenantId, run_id: &RunId) -> Vec<RunStep> {
        self.with_conn(|conn| {
            let mut statement = conn
                .prepare(
                    "SELECT snapshot FROM run_steps
                     WHERE tenant_id = ?1 AND run_id = ?2
                     ORDER BY step_order ASC",
                )
                .map_err(|err| SqliteStoreError::Query(err.to_string()))?;
            let rows = statement
                .query_map(params![tenant_id.as_str(), run_id.as_str()], |row| {
                    row.get::<_, String>(0)
                })
                .map_err(|err| SqliteStoreError::Query(err.to_string()))?;
            let mut steps = Vec::new();
            for raw in rows {
                let raw = raw.map_err(|err| SqliteStoreError::Query(err.to_string()))?;
                let step: RunStep = serde_json::from_str(&raw)
                    .map_err(|err| SqliteStoreError::Snapshot(err.to_string()))?;
                steps.push(step);
            }
            Ok(steps)
        })
        .unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Claim Registry
// ============================================================================

impl ClaimsRepo for SqliteStore {
    fn create(&self, claim: &Claim) -> Result<(), ProvenanceRepoError> {
        let snapshot = serde_json::to_string(claim)
            .map_err(|err| ProvenanceRepoError::Store(format!("snapshot encode failed: {err}")))?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO claims (tenant_id, claim_id, deal_id, snapshot)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (tenant_id, claim_id)
                 DO UPDATE SET deal_id = excluded.deal_id,
                               snapshot = excluded.snapshot",
                params![
                    claim.tenant_id.as_str(),
                    claim.claim_id.as_str(),
                    claim.deal_id.as_str(),
                    snapshot,
                ],
            )
            .map_err(|err| SqliteStoreError::Query(err.to_string()))?;
            Ok(())
        })
        .map_err(|err| ProvenanceRepoError::Store(err.to_string()))
    }

    fn get(&self, tenant_id: &TenantId, claim_id: &ClaimId) -> Option<Claim> {
        self.with_conn(|conn| {
            let snapshot: Option<String> = conn
                .query_row(
                    "SELECT snapshot FROM claims WHERE tenant_id = ?1 AND claim_id = ?2",
                    params![tenant_id.as_str(), claim_id.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|err| SqliteStoreError::Query(err.to_string()))?;
            match snapshot {
                None => Ok(None),
                Some(raw) => serde_json::from_str(&raw)
                    .map(Some)
                    .map_err(|err| SqliteStoreError::Snapshot(err.to_string())),
            }
        })
        .ok()
        .flatten()
    }

    fn update(&self, claim: &Claim) -> Result<(), ProvenanceRepoError> {
        self.create(claim)
    }

    fn list_by_deal(&self, tenant_id: &TenantId, deal_id: &DealId) -> Vec<Claim> {
        self.with_conn(|conn| {
            let mut statement = conn
                .prepare(
                    "SELECT snapshot FROM claims
                     WHERE tenant_id = ?1 AND deal_id = ?2
                     ORDER BY claim_id ASC",
                )
                .map_err(|err| SqliteStoreError::Query(err.to_string()))?;
            let rows = statement
                .query_map(params![tenant_id.as_str(), deal_id.as_str()], |row| {
                    row.get::<_, String>(0)
                })
                .map_err(|err| SqliteStoreError::Query(err.to_string()))?;
            let mut claims = Vec::new();
            for raw in rows {
                let raw = raw.map_err(|err| SqliteStoreError::Query(err.to_string()))?;
                let claim: Claim = serde_json::from_str(&raw)
                    .map_err(|err| SqliteStoreError::Snapshot(err.to_string()))?;
                claims.push(claim);
            }
            Ok(claims)
        })
        .unwrap_or_default()
    }

    fn delete(&self, tenant_id: &TenantId, claim_id: &ClaimId) -> Result<(), ProvenanceRepoError> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM claims WHERE tenant_id = ?1 AND claim_id = ?2",
                params![tenant_id.as_str(), claim_id.as_str()],
            )
            .map_err(|err| SqliteStoreError::Query(err.to_string()))?;
            Ok(())
        })
        .map_err(|err| ProvenanceRepoError::Store(err.to_string()))
    }
}
