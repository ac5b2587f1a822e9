// crates/idis-core/src/core/context.rs
// ============================================================================
// Module: IDIS Tenant Context
// Description: Per-request tenant context and the RBAC role set.
// Purpose: Carry the authenticated scope consumed by every downstream check.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! A [`TenantContext`] is created by the authentication collaborator once per
//! request and threaded through every service call. It is a pure value; the
//! policy crate interprets it. Roles are a sealed set — unknown role strings
//! reject at deserialization, never default to a permissive value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ActorId;
use crate::core::identifiers::TenantId;

// ============================================================================
// SECTION: Roles
// ============================================================================

/// RBAC roles recognised by the policy engine.
///
/// # Invariants
/// - Variants are stable for serialization and rule-table matching.
/// - `Auditor` is read-only by policy; no other variant implies it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Tenant administrator; may use break-glass for unassigned deals.
    Admin,
    /// Deal analyst; day-to-day read/write on assigned deals.
    Analyst,
    /// Investment-committee reviewer; reads deliverables and verdicts.
    IcReviewer,
    /// Read-only auditor; every mutating method is denied.
    Auditor,
    /// Machine principal for pipeline steps.
    Service,
}

// ============================================================================
// SECTION: Data Region
// ============================================================================

/// Data-residency region attached to a tenant.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataRegion {
    /// European Union residency.
    Eu,
    /// United States residency.
    Us,
    /// Gulf region residency.
    Me,
}

// ============================================================================
// SECTION: Tenant Context
// ============================================================================

/// Authenticated per-request scope.
///
/// # Invariants
/// - Lives for one request; never cached across requests.
/// - `roles` is the complete role set for the actor; empty means deny-all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    /// Tenant identifier.
    pub tenant_id: TenantId,
    /// Authenticated actor identifier.
    pub actor_id: ActorId,
    /// Roles held by the actor within the tenant.
    pub roles: BTreeSet<Role>,
    /// Data-residency region for the tenant.
    pub data_region: DataRegion,
    /// Policy tags attached by the authentication layer.
    pub policy_tags: Vec<String>,
}

impl TenantContext {
    /// Returns whether the actor holds `role`.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}
