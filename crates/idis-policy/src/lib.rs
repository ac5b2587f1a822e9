// crates/idis-policy/src/lib.rs
// ============================================================================
// Module: IDIS Policy
// Description: RBAC rule table, ABAC deal access, and break-glass tokens.
// Purpose: Provide deny-by-default authorization for every core operation.
// Dependencies: idis-core, idis-audit, base64, blake3, subtle, serde, thiserror
// ============================================================================

//! ## Overview
//! Policy is deny-by-default at every layer: an unknown operation denies, an
//! empty role set denies, an auditor mutating denies, and an admin without a
//! deal assignment denies unless a valid break-glass token is present. Using
//! a break-glass token emits exactly one CRITICAL audit event; if that
//! emission fails, the access is denied.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod abac;
pub mod break_glass;
pub mod rbac;

pub use abac::AssignmentStore;
pub use abac::DealAccessDecision;
pub use abac::InMemoryAssignmentStore;
pub use abac::check_deal_access;
pub use break_glass::BreakGlassError;
pub use break_glass::BreakGlassScope;
pub use break_glass::BreakGlassService;
pub use break_glass::MAX_TOKEN_LIFETIME_SECONDS;
pub use break_glass::MIN_JUSTIFICATION_CHARS;
pub use rbac::Method;
pub use rbac::OPERATION_INVENTORY;
pub use rbac::OperationId;
pub use rbac::PolicyDecision;
pub use rbac::policy_check;
