// crates/idis-policy/src/abac.rs
// ============================================================================
// Module: ABAC Deal Access
// Description: Deal-level assignment checks layered over the role decision.
// Purpose: Gate deal access on assignments, with break-glass for admins.
// Dependencies: crate::break_glass, idis-core, serde
// ============================================================================

//! ## Overview
//! ABAC extends the role decision with deal-level assignments. Assigned
//! actors pass. Auditors never mutate. Admins without an assignment pass
//! only when a validated break-glass token is present. Unknown deals deny —
//! existence never leaks through an access check.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::RwLock;

use idis_core::ActorId;
use idis_core::DealId;
use idis_core::Role;
use idis_core::TenantId;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Deal-level access decision.
///
/// # Invariants
/// - Variants are stable wire codes for the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealAccessDecision {
    /// Access granted.
    Allowed,
    /// Actor holds no assignment for the deal.
    DeniedNoAssignment,
    /// Auditor attempted a mutation.
    DeniedAuditorMutation,
    /// Admin without assignment needs a break-glass token.
    DeniedBreakGlassRequired,
    /// Deal is unknown in this tenant.
    DeniedUnknownDeal,
}

// ============================================================================
// SECTION: Assignment Store
// ============================================================================

/// Deal assignment lookups consumed by the ABAC check.
pub trait AssignmentStore: Send + Sync {
    /// Returns whether the deal exists in the tenant.
    fn deal_exists(&self, tenant_id: &TenantId, deal_id: &DealId) -> bool;

    /// Returns whether the actor is assigned to the deal (directly or via
    /// group membership).
    fn is_assigned(&self, tenant_id: &TenantId, deal_id: &DealId, actor_id: &ActorId) -> bool;
}

/// In-memory assignment store for tests and default wiring.
///
/// # Invariants
/// - Assignments are scoped by `(tenant_id, deal_id)`.
#[derive(Debug, Default)]
pub struct InMemoryAssignmentStore {
    /// Known deals per tenant.
    deals: RwLock<BTreeSet<(TenantId, DealId)>>,
    /// Assigned actors per deal.
    assignments: RwLock<BTreeMap<(TenantId, DealId), BTreeSet<ActorId>>>,
}

impl InMemoryAssignmentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a deal in the tenant.
    pub fn add_deal(&self, tenant_id: &TenantId, deal_id: &DealId) {
        if let Ok(mut guard) = self.deals.write() {
            guard.insert((tenant_id.clone(), deal_id.clone()));
        }
    }

    /// Assigns an actor to a deal.
    pub fn assign(&self, tenant_id: &TenantId, deal_id: &DealId, actor_id: &ActorId) {
        self.add_deal(tenant_id, deal_id);
        if let Ok(mut guard) = self.assignments.write() {
            guard
                .entry((tenant_id.clone(), deal_id.clone()))
                .or_default()
                .insert(actor_id.clone());
        }
    }
}

impl AssignmentStore for InMemoryAssignmentStore {
    fn deal_exists(&self, tenant_id: &TenantId, deal_id: &DealId) -> bool {
        self.deals
            .read()
            .map(|guard| guard.contains(&(tenant_id.clone(), deal_id.clone())))
            .unwrap_or(false)
    }

    fn is_assigned(&self, tenant_id: &TenantId, deal_id: &DealId, actor_id: &ActorId) -> bool {
        self.assignments
            .read()
            .map(|guard| {
                guard
                    .get(&(tenant_id.clone(), deal_id.clone()))
                    .is_some_and(|actors| actors.contains(actor_id))
            })
            .unwrap_or(false)
    }
}

// ============================================================================
// SECTION: Access Check
// ============================================================================

/// Evaluates deal-level access for an authenticated actor.
///
/// `break_glass_valid` reflects a token already validated (and audited) by
/// [`crate::break_glass::BreakGlassService`]; passing `true` without a
/// validated token is a caller bug, not a bypass this function can detect.
#[must_use]
pub fn check_deal_access(
    store: &dyn AssignmentStore,
    tenant_id: &TenantId,
    actor_id: &ActorId,
    roles: &BTreeSet<Role>,
    deal_id: &DealId,
    is_mutation: bool,
    break_glass_valid: bool,
) -> DealAccessDecision {
    if !store.deal_exists(tenant_id, deal_id) {
        return DealAccessDecision::DeniedUnknownDeal;
    }
    if is_mutation && roles.contains(&Role::Auditor) {
        return DealAccessDecision::DeniedAuditorMutation;
    }
    if store.is_assigned(tenant_id, deal_id, actor_id) {
        return DealAccessDecision::Allowed;
    }
    if roles.contains(&Role::Admin) {
        if break_glass_valid {
            return DealAccessDecision::Allowed;
        }
        return DealAccessDecision::DeniedBreakGlassRequired;
    }
    DealAccessDecision::DeniedNoAssignment
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions are permitted."
    )]
    use super::*;

    fn scope() -> (TenantId, DealId, ActorId) {
        (
            TenantId::new("tenant-1"),
            DealId::new("deal-1"),
            ActorId::new("actor-1"),
        )
    }

    #[test]
    fn assigned_actor_passes() {
        let (tenant, deal, actor) = scope();
        let store = InMemoryAssignmentStore::new();
        store.assign(&tenant, &deal, &actor);
        let roles: BTreeSet<Role> = [Role::Analyst].into_iter().collect();
        assert_eq!(
            check_deal_access(&store, &tenant, &actor, &roles, &deal, true, false),
            DealAccessDecision::Allowed
        );
    }

    #[test]
    fn unassigned_admin_requires_break_glass() {
        let (tenant, deal, actor) = scope();
        let store = InMemoryAssignmentStore::new();
        store.add_deal(&tenant, &deal);
        let roles: BTreeSet<Role> = [Role::Admin].into_iter().collect();
        assert_eq!(
            check_deal_access(&store, &tenant, &actor, &roles, &deal, true, false),
            DealAccessDecision::DeniedBreakGlassRequired
        );
        assert_eq!(
            check_deal_access(&store, &tenant, &actor, &roles, &deal, true, true),
            DealAccessDecision::Allowed
        );
    }

    #[test]
    fn unknown_deal_denies_before_assignment_checks() {
        let (tenant, deal, actor) = scope();
        let store = InMemoryAssignmentStore::new();
        let roles: BTreeSet<Role> = [Role::Admin].into_iter().collect();
        assert_eq!(
            check_deal_access(&store, &tenant, &actor, &roles, &deal, false, true),
            DealAccessDecision::DeniedUnknownDeal
        );
    }

    #[test]
    fn auditor_mutation_denies_even_when_assigned() {
        let (tenant, deal, actor) = scope();
        let store = InMemoryAssignmentStore::new();
        store.assign(&tenant, &deal, &actor);
        let roles: BTreeSet<Role> = [Role::Auditor].into_iter().collect();
        assert_eq!(
            check_deal_access(&store, &tenant, &actor, &roles, &deal, true, false),
            DealAccessDecision::DeniedAuditorMutation
        );
        assert_eq!(
            check_deal_access(&store, &tenant, &actor, &roles, &deal, false, false),
            DealAccessDecision::Allowed
        );
    }
}
