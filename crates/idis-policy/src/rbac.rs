// crates/idis-policy/src/rbac.rs
// ============================================================================
// Module: RBAC Rule Table
// Description: Deny-by-default role checks over the operation inventory.
// Purpose: Map every known operation to the roles permitted per method.
// Dependencies: idis-core, serde
// ============================================================================

//! ## Overview
//! A central rule table maps every known operation to the role set permitted
//! for each method. The table and the published operation inventory must
//! stay in lockstep — `rule_table_covers_inventory_exactly` fails the build's
//! test run on drift. Unknown operations deny. Empty role sets deny. The
//! auditor role is read-only: any mutating method denies regardless of the
//! actor's other roles.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use idis_core::Role;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Operations and Methods
// ============================================================================

/// Known core operations, the policy contract surface.
///
/// # Invariants
/// - Variants are stable wire identifiers.
/// - [`OPERATION_INVENTORY`] lists every variant exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationId {
    /// List or read claims for a deal.
    ClaimsRead,
    /// Create or update claims.
    ClaimsWrite,
    /// Read sanads and grade explanations.
    SanadRead,
    /// Trigger grading or regrade.
    SanadWrite,
    /// Read defects.
    DefectsRead,
    /// Waive or cure defects.
    DefectsResolve,
    /// Read deterministic calculations.
    CalcRead,
    /// Execute deterministic calculations.
    CalcExecute,
    /// Read runs and step ledgers.
    RunsRead,
    /// Start or resume runs.
    RunsExecute,
    /// Read deliverables.
    DeliverablesRead,
    /// Generate deliverables.
    DeliverablesGenerate,
    /// Read prompt registry entries.
    PromptsRead,
    /// Promote, rollback, or retire prompt versions.
    PromptsAdminister,
    /// Read stored objects.
    ObjectsRead,
    /// Write or delete stored objects.
    ObjectsWrite,
    /// Read audit events.
    AuditRead,
}

/// The published operation inventory; the rule table must cover it exactly.
pub const OPERATION_INVENTORY: &[OperationId] = &[
    OperationId::ClaimsRead,
    OperationId::ClaimsWrite,
    OperationId::SanadRead,
    OperationId::SanadWrite,
    OperationId::DefectsRead,
    OperationId::DefectsResolve,
    OperationId::CalcRead,
    OperationId::CalcExecute,
    OperationId::RunsRead,
    OperationId::RunsExecute,
    OperationId::DeliverablesRead,
    OperationId::DeliverablesGenerate,
    OperationId::PromptsRead,
    OperationId::PromptsAdminister,
    OperationId::ObjectsRead,
    OperationId::ObjectsWrite,
    OperationId::AuditRead,
];

/// Request method classification.
///
/// # Invariants
/// - `is_mutation` is authoritative for the auditor read-only rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// Read-only access.
    Get,
    /// Creation.
    Post,
    /// Replacement.
    Put,
    /// Partial update.
    Patch,
    /// Deletion.
    Delete,
}

impl Method {
    /// Returns whether the method mutates state.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        !matches!(self, Self::Get)
    }
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Result of a policy check.
///
/// # Invariants
/// - `code` is a stable wire code; `details` is safe for clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// Whether access is allowed.
    pub allow: bool,
    /// Stable decision code (`ALLOWED`, `RBAC_DENIED`).
    pub code: String,
    /// Safe human-readable detail.
    pub details: String,
}

impl PolicyDecision {
    /// Builds an allow decision.
    fn allowed(details: impl Into<String>) -> Self {
        Self {
            allow: true,
            code: "ALLOWED".to_string(),
            details: details.into(),
        }
    }

    /// Builds a deny decision with the RBAC code.
    fn denied(details: impl Into<String>) -> Self {
        Self {
            allow: false,
            code: "RBAC_DENIED".to_string(),
            details: details.into(),
        }
    }
}

// ============================================================================
// SECTION: Rule Table
// ============================================================================

/// Returns the roles permitted to read under `operation`.
const fn read_roles(operation: OperationId) -> &'static [Role] {
    match operation {
        OperationId::ClaimsRead
        | OperationId::SanadRead
        | OperationId::DefectsRead
        | OperationId::CalcRead
        | OperationId::RunsRead
        | OperationId::DeliverablesRead
        | OperationId::ObjectsRead => {
            &[Role::Admin, Role::Analyst, Role::IcReviewer, Role::Auditor, Role::Service]
        }
        OperationId::PromptsRead => &[Role::Admin, Role::Analyst, Role::Auditor, Role::Service],
        OperationId::AuditRead => &[Role::Admin, Role::Auditor],
        // Write-shaped operations have no read surface.
        OperationId::ClaimsWrite
        | OperationId::SanadWrite
        | OperationId::DefectsResolve
        | OperationId::CalcExecute
        | OperationId::RunsExecute
        | OperationId::DeliverablesGenerate
        | OperationId::PromptsAdminister
        | OperationId::ObjectsWrite => &[],
    }
}

/// Returns the roles permitted to mutate under `operation`.
const fn write_roles(operation: OperationId) -> &'static [Role] {
    match operation {
        OperationId::ClaimsWrite | OperationId::SanadWrite | OperationId::CalcExecute => {
            &[Role::Admin, Role::Analyst, Role::Service]
        }
        OperationId::DefectsResolve => &[Role::Admin, Role::Analyst],
        OperationId::RunsExecute | OperationId::DeliverablesGenerate | OperationId::ObjectsWrite => {
            &[Role::Admin, Role::Analyst, Role::Service]
        }
        OperationId::PromptsAdminister => &[Role::Admin],
        // Read-shaped operations have no mutation surface.
        OperationId::ClaimsRead
        | OperationId::SanadRead
        | OperationId::DefectsRead
        | OperationId::CalcRead
        | OperationId::RunsRead
        | OperationId::DeliverablesRead
        | OperationId::PromptsRead
        | OperationId::ObjectsRead
        | OperationId::AuditRead => &[],
    }
}

// ============================================================================
// SECTION: Policy Check
// ============================================================================

/// Evaluates the RBAC rule table for one operation.
///
/// Deny-by-default: unknown pairings, empty role sets, and auditor mutation
/// attempts all deny.
#[must_use]
pub fn policy_check(
    roles: &BTreeSet<Role>,
    operation: OperationId,
    method: Method,
) -> PolicyDecision {
    if roles.is_empty() {
        return PolicyDecision::denied("empty role set");
    }
    if method.is_mutation() && roles.contains(&Role::Auditor) {
        return PolicyDecision::denied("auditor role is read-only");
    }
    let permitted = if method.is_mutation() {
        write_roles(operation)
    } else {
        read_roles(operation)
    };
    if permitted.iter().any(|role| roles.contains(role)) {
        PolicyDecision::allowed("role permitted by rule table")
    } else {
        PolicyDecision::denied("no role permits this operation")
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions are permitted."
    )]
    use super::*;

    #[test]
    fn rule_table_covers_inventory_exactly() {
        // Every inventory entry must have at least one permitted role on at
        // least one method, and no entry may be missing from the inventory.
        for operation in OPERATION_INVENTORY {
            let has_rule = !read_roles(*operation).is_empty() || !write_roles(*operation).is_empty();
            assert!(has_rule, "operation {operation:?} has no rule");
        }
        let distinct: BTreeSet<OperationId> = OPERATION_INVENTORY.iter().copied().collect();
        assert_eq!(distinct.len(), OPERATION_INVENTORY.len(), "inventory has duplicates");
    }

    #[test]
    fn auditor_mutation_denies_despite_other_roles() {
        let roles: BTreeSet<Role> = [Role::Auditor, Role::Admin].into_iter().collect();
        let decision = policy_check(&roles, OperationId::ClaimsWrite, Method::Post);
        assert!(!decision.allow);
        assert_eq!(decision.code, "RBAC_DENIED");
    }

    #[test]
    fn empty_role_set_denies() {
        let decision = policy_check(&BTreeSet::new(), OperationId::ClaimsRead, Method::Get);
        assert!(!decision.allow);
    }

    #[test]
    fn analyst_reads_and_writes_claims() {
        let roles: BTreeSet<Role> = [Role::Analyst].into_iter().collect();
        assert!(policy_check(&roles, OperationId::ClaimsRead, Method::Get).allow);
        assert!(policy_check(&roles, OperationId::ClaimsWrite, Method::Post).allow);
        assert!(!policy_check(&roles, OperationId::PromptsAdminister, Method::Post).allow);
    }
}
