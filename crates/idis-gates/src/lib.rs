// crates/idis-gates/src/lib.rs
// ============================================================================
// Module: IDIS Output Gates
// Description: No-Free-Facts validator and the Muḥāsabah gate.
// Purpose: Reject ungrounded assertions at every output boundary.
// Dependencies: idis-core, serde
// ============================================================================

//! ## Overview
//! Two validators guard the output boundary. The No-Free-Facts validator is
//! structural: every factual, non-subjective section must reference at least
//! one known claim or calculation. The Muḥāsabah gate is semantic: every
//! agent output must carry a well-formed self-audit record consistent with
//! its confidence. Both are pure functions and always enforced — there is no
//! bypass parameter.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod muhasabah;
pub mod no_free_facts;

pub use muhasabah::GateDecision;
pub use muhasabah::evaluate_output;
pub use no_free_facts::NoFreeFactsReport;
pub use no_free_facts::SectionError;
pub use no_free_facts::validate_sections;
