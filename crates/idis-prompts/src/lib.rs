// crates/idis-prompts/src/lib.rs
// ============================================================================
// Module: IDIS Prompt Registry
// Description: On-disk prompt artifacts with strict loading and versioning.
// Purpose: Make every prompt version auditable, promotable, and reproducible.
// Dependencies: idis-core, idis-audit, serde, serde_json, sha2, thiserror
// ============================================================================

//! ## Overview
//! Prompt artifacts live on disk under `<root>/<prompt_id>/<version>/` with
//! a `prompt.md` body and `metadata.json`. Registry pointer files map
//! `prompt_id -> version` per environment. The loader is strict: missing
//! files, invalid JSON, schema violations, pointer/metadata mismatches,
//! unresolvable schema refs, and malformed semver all fail — there is no
//! silent bypass. Promotion, rollback, and retire are the only state
//! transitions; each is atomic (temp + rename) and audited, with pointer
//! compensation when audit emission fails after the write.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod registry;
pub mod versioning;

pub use registry::Environment;
pub use registry::PromptArtifact;
pub use registry::PromptMetadata;
pub use registry::PromptRegistry;
pub use registry::PromptRegistryError;
pub use registry::PromptStatus;
pub use registry::RegistryFile;
pub use registry::RiskClass;
pub use registry::parse_semver;
pub use versioning::GateResult;
pub use versioning::PromotionRequest;
pub use versioning::PromptVersioningError;
pub use versioning::PromptVersioningService;
pub use versioning::RetireRequest;
pub use versioning::RollbackRequest;
pub use versioning::required_gates;
