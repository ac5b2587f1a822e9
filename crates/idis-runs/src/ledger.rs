// crates/idis-runs/src/ledger.rs
// ============================================================================
// Module: Run Step Ledger
// Description: Durable ledger seam and the in-memory implementation.
// Purpose: Record one row per attempted step, keyed by (run, step).
// Dependencies: idis-core, thiserror
// ============================================================================

//! ## Overview
//! The ledger is the orchestrator's durable memory: one row per
//! `(run_id, step_name)`, updated in place on retry. Reads return rows in
//! canonical step order so resume and reporting are deterministic.
//! `idis-store-sqlite` provides the durable implementation behind the same
//! trait.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::RwLock;

use idis_core::RunId;
use idis_core::RunStep;
use idis_core::StepName;
use idis_core::TenantId;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Ledger storage errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Underlying storage refused the operation.
    #[error("run step ledger error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Durable step ledger seam.
pub trait RunStepsRepo: Send + Sync {
    /// Returns the row for `(run_id, step_name)`, tenant-scoped.
    fn get_step(
        &self,
        tenant_id: &TenantId,
        run_id: &RunId,
        step_name: StepName,
    ) -> Option<RunStep>;

    /// Inserts or replaces a step row.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when storage refuses the write.
    fn upsert(&self, step: &RunStep) -> Result<(), LedgerError>;

    /// Returns all rows for a run in canonical step order.
    fn get_by_run(&self, tenant_id: &TenantId, run_id: &RunId) -> Vec<RunStep>;
}

// ============================================================================
// SECTION: In-Memory Implementation
// ============================================================================

/// In-memory ledger for tests and default wiring.
#[derive(Debug, Default)]
pub struct InMemoryRunStepsRepo {
    /// Rows keyed by `(tenant, run, step)`.
    rows: RwLock<BTreeMap<(TenantId, RunId, StepName), RunStep>>,
}

impl InMemoryRunStepsRepo {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunStepsRepo for InMemoryRunStepsRepo {
    fn get_step(
        &self,
        tenant_id: &TenantId,
        run_id: &RunId,
        step_name: StepName,
    ) -> Option<RunStep> {
        self.rows
            .read()
            .ok()?
            .get(&(tenant_id.clone(), run_id.clone(), step_name))
            .cloned()
    }

    fn upsert(&self, step: &RunStep) -> Result<(), LedgerError> {
        let mut guard = self
            .rows
            .write()
            .map_err(|_| LedgerError::Store("ledger lock poisoned".to_string()))?;
        guard.insert(
            (step.tenant_id.clone(), step.run_id.clone(), step.step_name),
            step.clone(),
        );
        Ok(())
    }

    fn get_by_run(&self, tenant_id: &TenantId, run_id: &RunId) -> Vec<RunStep> {
        let mut rows: Vec<RunStep> = self
            .rows
            .read()
            .map(|guard| {
                guard
                    .values()
                    .filter(|row| row.tenant_id == *tenant_id && row.run_id == *run_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by_key(|row| row.step_order);
        rows
    }
}
