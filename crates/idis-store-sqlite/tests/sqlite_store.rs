// crates/idis-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Durable ledger rows, tenant scoping, and reopen behavior.
// ============================================================================
//! ## Overview
//! Verifies that ledger rows and claims survive a process restart (reopen),
//! that tenant scoping hides rows across tenants, and that the schema
//! version check refuses databases from other builds.

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

use std::collections::BTreeMap;

use idis_core::Claim;
use idis_core::ClaimAction;
use idis_core::ClaimClass;
use idis_core::ClaimId;
use idis_core::ClaimVerdict;
use idis_core::DealId;
use idis_core::Grade;
use idis_core::Materiality;
use idis_core::RunId;
use idis_core::RunStep;
use idis_core::StepId;
use idis_core::StepName;
use idis_core::StepStatus;
use idis_core::TenantId;
use idis_core::Timestamp;
use idis_runs::RunStepsRepo;
use idis_sanad::ClaimsRepo;
use idis_store_sqlite::SqliteStore;
use idis_store_sqlite::SqliteStoreConfig;
use idis_store_sqlite::SqliteStoreError;

fn config(dir: &std::path::Path) -> SqliteStoreConfig {
    SqliteStoreConfig {
        path: dir.join("idis.db"),
        busy_timeout_ms: 1_000,
    }
}

fn step(tenant: &str, run: &str, name: StepName, status: StepStatus) -> RunStep {
    RunStep {
        step_id: StepId::new(format!("step-{}", name.label())),
        run_id: RunId::new(run),
        tenant_id: TenantId::new(tenant),
        step_name: name,
        step_order: name.order(),
        status,
        started_at: Timestamp::parse("2026-03-01T00:00:00Z").unwrap(),
        finished_at: None,
        retry_count: 0,
        result_summary: BTreeMap::new(),
        error_code: None,
        error_message: None,
    }
}

fn claim(tenant: &str, id: &str, deal: &str) -> Claim {
    let now = Timestamp::parse("2026-03-01T00:00:00Z").unwrap();
    Claim {
        claim_id: ClaimId::new(id),
        tenant_id: TenantId::new(tenant),
        deal_id: DealId::new(deal),
        claim_class: ClaimClass::new("FINANCIAL"),
        claim_text: "ARR is $5.2M".to_string(),
        predicate: None,
        value: None,
        sanad_id: None,
        claim_grade: Grade::B,
        claim_verdict: ClaimVerdict::Verified,
        claim_action: ClaimAction::None,
        defect_ids: vec![],
        materiality: Materiality::High,
        ic_bound: false,
        primary_span_id: None,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn ledger_rows_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = SqliteStore::open(&config(dir.path())).unwrap();
        store
            .upsert(&step("tenant-1", "run-1", StepName::IngestCheck, StepStatus::Completed))
            .unwrap();
        store
            .upsert(&step("tenant-1", "run-1", StepName::Extract, StepStatus::Failed))
            .unwrap();
    }
    let store = SqliteStore::open(&config(dir.path())).unwrap();
    let rows = store.get_by_run(&TenantId::new("tenant-1"), &RunId::new("run-1"));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].step_name, StepName::IngestCheck);
    assert_eq!(rows[1].status, StepStatus::Failed);
}

#[test]
fn upsert_replaces_the_same_step_row() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&config(dir.path())).unwrap();
    let mut row = step("tenant-1", "run-1", StepName::Grade, StepStatus::Running);
    store.upsert(&row).unwrap();
    row.status = StepStatus::Completed;
    row.retry_count = 2;
    store.upsert(&row).unwrap();

    let fetched = store
        .get_step(&TenantId::new("tenant-1"), &RunId::new("run-1"), StepName::Grade)
        .unwrap();
    assert_eq!(fetched.status, StepStatus::Completed);
    assert_eq!(fetched.retry_count, 2);
    assert_eq!(
        store
            .get_by_run(&TenantId::new("tenant-1"), &RunId::new("run-1"))
            .len(),
        1
    );
}

#[test]
fn tenant_scoping_hides_rows_across_tenants() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&config(dir.path())).unwrap();
    store
        .upsert(&step("tenant-1", "run-1", StepName::Grade, StepStatus::Completed))
        .unwrap();
    store.create(&claim("tenant-1", "claim-1", "deal-1")).unwrap();

    let other = TenantId::new("tenant-2");
    assert!(store.get_step(&other, &RunId::new("run-1"), StepName::Grade).is_none());
    assert!(ClaimsRepo::get(&store, &other, &ClaimId::new("claim-1")).is_none());
    assert!(store.list_by_deal(&other, &DealId::new("deal-1")).is_empty());
}

#[test]
fn claims_round_trip_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&config(dir.path())).unwrap();
    let tenant = TenantId::new("tenant-1");
    store.create(&claim("tenant-1", "claim-1", "deal-1")).unwrap();
    store.create(&claim("tenant-1", "claim-2", "deal-1")).unwrap();

    let listed = store.list_by_deal(&tenant, &DealId::new("deal-1"));
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].claim_id, ClaimId::new("claim-1"));

    store.delete(&tenant, &ClaimId::new("claim-1")).unwrap();
    assert!(ClaimsRepo::get(&store, &tenant, &ClaimId::new("claim-1")).is_none());
    assert_eq!(store.list_by_deal(&tenant, &DealId::new("deal-1")).len(), 1);
}

#[test]
fn schema_version_mismatch_fails_open() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = SqliteStore::open(&config(dir.path())).unwrap();
        drop(store);
    }
    {
        let conn = rusqlite::Connection::open(dir.path().join("idis.db")).unwrap();
        conn.pragma_update(None, "user_version", 99).unwrap();
    }
    let err = SqliteStore::open(&config(dir.path()));
    assert!(matches!(
        err,
        Err(SqliteStoreError::SchemaVersion { found: 99, .. })
    ));
}
