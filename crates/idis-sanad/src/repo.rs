// crates/idis-sanad/src/repo.rs
// ============================================================================
// Module: Provenance Repositories
// Description: Tenant-scoped repository traits and in-memory implementations.
// Purpose: Give services a storage seam; cross-tenant reads return nothing.
// Dependencies: idis-core, thiserror
// ============================================================================

//! ## Overview
//! Repositories are tenant-scoped: every read filters by tenant and a miss
//! is indistinguishable from a cross-tenant probe. The in-memory
//! implementations back tests and default wiring; `idis-store-sqlite`
//! provides the durable claim registry behind the same traits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::RwLock;

use idis_core::Claim;
use idis_core::ClaimId;
use idis_core::DealId;
use idis_core::Defect;
use idis_core::DefectId;
use idis_core::EvidenceItem;
use idis_core::Sanad;
use idis_core::SanadId;
use idis_core::TenantId;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Repository-level errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ProvenanceRepoError {
    /// Underlying storage refused the operation.
    #[error("provenance store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Traits
// ============================================================================

/// Tenant-scoped claim storage.
pub trait ClaimsRepo: Send + Sync {
    /// Persists a new claim.
    ///
    /// # Errors
    ///
    /// Returns [`ProvenanceRepoError`] when storage refuses the write.
    fn create(&self, claim: &Claim) -> Result<(), ProvenanceRepoError>;

    /// Returns a claim by tenant and id; cross-tenant reads return `None`.
    fn get(&self, tenant_id: &TenantId, claim_id: &ClaimId) -> Option<Claim>;

    /// Replaces a stored claim.
    ///
    /// # Errors
    ///
    /// Returns [`ProvenanceRepoError`] when storage refuses the write.
    fn update(&self, claim: &Claim) -> Result<(), ProvenanceRepoError>;

    /// Lists claims for a deal in claim-id order.
    fn list_by_deal(&self, tenant_id: &TenantId, deal_id: &DealId) -> Vec<Claim>;

    /// Removes a claim; used to compensate a write whose audit event failed.
    ///
    /// # Errors
    ///
    /// Returns [`ProvenanceRepoError`] when storage refuses the delete.
    fn delete(&self, tenant_id: &TenantId, claim_id: &ClaimId) -> Result<(), ProvenanceRepoError>;
}

/// Tenant-scoped evidence storage.
pub trait EvidenceRepo: Send + Sync {
    /// Attaches evidence items to a claim.
    fn put_for_claim(&self, tenant_id: &TenantId, claim_id: &ClaimId, items: Vec<EvidenceItem>);

    /// Returns the evidence attached to a claim.
    fn get_by_claim(&self, tenant_id: &TenantId, claim_id: &ClaimId) -> Vec<EvidenceItem>;
}

/// Tenant-scoped sanad storage.
pub trait SanadsRepo: Send + Sync {
    /// Persists a sanad.
    ///
    /// # Errors
    ///
    /// Returns [`ProvenanceRepoError`] when storage refuses the write.
    fn create(&self, sanad: &Sanad) -> Result<(), ProvenanceRepoError>;

    /// Returns a sanad by tenant and id; cross-tenant reads return `None`.
    fn get(&self, tenant_id: &TenantId, sanad_id: &SanadId) -> Option<Sanad>;

    /// Removes a sanad; used to compensate a write whose audit event failed.
    ///
    /// # Errors
    ///
    /// Returns [`ProvenanceRepoError`] when storage refuses the delete.
    fn delete(&self, tenant_id: &TenantId, sanad_id: &SanadId)
    -> Result<(), ProvenanceRepoError>;
}

/// Tenant-scoped defect storage.
pub trait DefectsRepo: Send + Sync {
    /// Persists a defect.
    ///
    /// # Errors
    ///
    /// Returns [`ProvenanceRepoError`] when storage refuses the write.
    fn create(&self, defect: &Defect) -> Result<(), ProvenanceRepoError>;

    /// Returns a defect by tenant and id; cross-tenant reads return `None`.
    fn get(&self, tenant_id: &TenantId, defect_id: &DefectId) -> Option<Defect>;

    /// Replaces a stored defect.
    ///
    /// # Errors
    ///
    /// Returns [`ProvenanceRepoError`] when storage refuses the write.
    fn update(&self, defect: &Defect) -> Result<(), ProvenanceRepoError>;

    /// Removes a defect; used to compensate a write whose audit event failed.
    ///
    /// # Errors
    ///
    /// Returns [`ProvenanceRepoError`] when storage refuses the delete.
    fn delete(&self, tenant_id: &TenantId, defect_id: &DefectId)
    -> Result<(), ProvenanceRepoError>;
}

// ============================================================================
// SECTION: In-Memory Implementations
// ============================================================================

/// In-memory claim repository.
#[derive(Debug, Default)]
pub struct InMemoryClaimsRepo {
    /// Claims keyed by `(tenant, claim)`.
    claims: RwLock<BTreeMap<(TenantId, ClaimId), Claim>>,
}

impl InMemoryClaimsRepo {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClaimsRepo for InMemoryClaimsRepo {
    fn create(&self, claim: &Claim) -> Result<(), ProvenanceRepoError> {
        let mut guard = self
            .claims
            .write()
            .map_err(|_| ProvenanceRepoError::Store("claims lock poisoned".to_string()))?;
        guard.insert(
            (claim.tenant_id.clone(), claim.claim_id.clone()),
            claim.clone(),
        );
        Ok(())
    }

    fn get(&self, tenant_id: &TenantId, claim_id: &ClaimId) -> Option<Claim> {
        self.claims
            .read()
            .ok()?
            .get(&(tenant_id.clone(), claim_id.clone()))
            .cloned()
    }

    fn update(&self, claim: &Claim) -> Result<(), ProvenanceRepoError> {
        self.create(claim)
    }

    fn list_by_deal(&self, tenant_id: &TenantId, deal_id: &DealId) -> Vec<Claim> {
        self.claims
            .read()
            .map(|guard| {
                guard
                    .values()
                    .filter(|claim| claim.tenant_id == *tenant_id && claim.deal_id == *deal_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn delete(&self, tenant_id: &TenantId, claim_id: &ClaimId) -> Result<(), ProvenanceRepoError> {
        let mut guard = self
            .claims
            .write()
            .map_err(|_| ProvenanceRepoError::Store("claims lock poisoned".to_string()))?;
        guard.remove(&(tenant_id.clone(), claim_id.clone()));
        Ok(())
    }
}

/// In-memory evidence repository.
#[derive(Debug, Default)]
pub struct InMemoryEvidenceRepo {
    /// Evidence keyed by `(tenant, claim)`.
    evidence: RwLock<BTreeMap<(TenantId, ClaimId), Vec<EvidenceItem>>>,
}

impl InMemoryEvidenceRepo {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvidenceRepo for InMemoryEvidenceRepo {
    fn put_for_claim(&self, tenant_id: &TenantId, claim_id: &ClaimId, items: Vec<EvidenceItem>) {
        if let Ok(mut guard) = self.evidence.write() {
            guard.insert((tenant_id.clone(), claim_id.clone()), items);
        }
    }

    fn get_by_claim(&self, tenant_id: &TenantId, claim_id: &ClaimId) -> Vec<EvidenceItem> {
        self.evidence
            .read()
            .map(|guard| {
                guard
                    .get(&(tenant_id.clone(), claim_id.clone()))
                    .cloned()
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }
}

/// In-memory sanad repository.
#[derive(Debug, Default)]
pub struct InMemorySanadsRepo {
    /// Sanads keyed by `(tenant, sanad)`.
    sanads: RwLock<BTreeMap<(TenantId, SanadId), Sanad>>,
}

impl InMemorySanadsRepo {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sanads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sanads.read().map(|guard| guard.len()).unwrap_or(0)
    }

    /// Returns whether the repository holds no sanads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SanadsRepo for InMemorySanadsRepo {
    fn create(&self, sanad: &Sanad) -> Result<(), ProvenanceRepoError> {
        let mut guard = self
            .sanads
            .write()
            .map_err(|_| ProvenanceRepoError::Store("sanads lock poisoned".to_string()))?;
        guard.insert(
            (sanad.tenant_id.clone(), sanad.sanad_id.clone()),
            sanad.clone(),
        );
        Ok(())
    }

    fn get(&self, tenant_id: &TenantId, sanad_id: &SanadId) -> Option<Sanad> {
        self.sanads
            .read()
            .ok()?
            .get(&(tenant_id.clone(), sanad_id.clone()))
            .cloned()
    }

    fn delete(
        &self,
        tenant_id: &TenantId,
        sanad_id: &SanadId,
    ) -> Result<(), ProvenanceRepoError> {
        let mut guard = self
            .sanads
            .write()
            .map_err(|_| ProvenanceRepoError::Store("sanads lock poisoned".to_string()))?;
        guard.remove(&(tenant_id.clone(), sanad_id.clone()));
        Ok(())
    }
}

/// In-memory defect repository.
#[derive(Debug, Default)]
pub struct InMemoryDefectsRepo {
    /// Defects keyed by `(tenant, defect)`.
    defects: RwLock<BTreeMap<(TenantId, DefectId), Defect>>,
}

impl InMemoryDefectsRepo {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DefectsRepo for InMemoryDefectsRepo {
    fn create(&self, defect: &Defect) -> Result<(), ProvenanceRepoError> {
        let mut guard = self
            .defects
            .write()
            .map_err(|_| ProvenanceRepoError::Store("defects lock poisoned".to_string()))?;
        guard.insert(
            (defect.tenant_id.clone(), defect.defect_id.clone()),
            defect.clone(),
        );
        Ok(())
    }

    fn get(&self, tenant_id: &TenantId, defect_id: &DefectId) -> Option<Defect> {
        self.defects
            .read()
            .ok()?
            .get(&(tenant_id.clone(), defect_id.clone()))
            .cloned()
    }

    fn update(&self, defect: &Defect) -> Result<(), ProvenanceRepoError> {
        self.create(defect)
    }

    fn delete(
        &self,
        tenant_id: &TenantId,
        defect_id: &DefectId,
    ) -> Result<(), ProvenanceRepoError> {
        let mut guard = self
            .defects
            .write()
            .map_err(|_| ProvenanceRepoError::Store("defects lock poisoned".to_string()))?;
        guard.remove(&(tenant_id.clone(), defect_id.clone()));
        Ok(())
    }
}
