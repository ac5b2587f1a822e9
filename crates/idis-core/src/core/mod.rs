// crates/idis-core/src/core/mod.rs
// ============================================================================
// Module: IDIS Core Domain
// Description: Domain submodules for identifiers, time, hashing, and entities.
// Purpose: Group the sealed value types shared across the workspace.
// Dependencies: serde, serde_json, serde_jcs, sha2, thiserror, time
// ============================================================================

//! ## Overview
//! Submodules of the IDIS domain model. Entities are immutable value types;
//! services in downstream crates own mutation and invariant enforcement.

pub mod agents;
pub mod calc;
pub mod claims;
pub mod context;
pub mod defects;
pub mod error;
pub mod evidence;
pub mod facts;
pub mod hashing;
pub mod identifiers;
pub mod runs;
pub mod sanad;
pub mod time;
