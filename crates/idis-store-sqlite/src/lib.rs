// crates/idis-store-sqlite/src/lib.rs
// ============================================================================
// Module: IDIS SQLite Store
// Description: Durable step ledger and claim registry on SQLite WAL.
// Purpose: Persist run resume state and claims with tenant-scoped access.
// Dependencies: idis-core, idis-runs, idis-sanad, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! This crate implements the run-step ledger and claim-registry seams over
//! `SQLite`. Rows serialize as canonical JSON snapshots keyed by tenant plus
//! entity identifiers; every read filters by tenant so a cross-tenant probe
//! is indistinguishable from a miss. The connection opens in WAL mode with a
//! busy timeout, and the schema version is pinned by `user_version` — an
//! unexpected version fails open-time rather than corrupting on write.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

pub use store::SqliteStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
