// crates/idis-sanad/src/lib.rs
// ============================================================================
// Module: IDIS Sanad Engine
// Description: Source tiering, precision, independence, defect detection,
//              deterministic grade derivation, and provenance services.
// Purpose: Grade every claim's evidentiary standing reproducibly.
// Dependencies: idis-core, idis-audit, bigdecimal, serde, thiserror, uuid
// ============================================================================

//! ## Overview
//! The Sanad engine grades a claim's evidentiary standing on the
//! `A > B > C > D` scale as a deterministic pipeline: source tiering, Dabt
//! (precision), Tawatur (independence), Shudhudh (value anomalies), I'lal
//! (hidden chain defects), and COI (conflict of interest), followed by a
//! fixed derivation order. Any FATAL defect forces grade `D` and terminates
//! derivation. The services in this crate own claim, defect, and sanad
//! mutation: every mutation is tenant-scoped, invariant-checked, and emits
//! exactly one audit event.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod chain;
pub mod claims_service;
pub mod coi;
pub mod dabt;
pub mod defect_service;
mod events;
pub mod grader;
pub mod ilal;
pub mod repo;
pub mod service;
pub mod shudhudh;
pub mod tawatur;
pub mod tiering;

pub use chain::build_sanad_chain;
pub use claims_service::ClaimsService;
pub use claims_service::CreateClaimInput;
pub use dabt::DABT_GRADE_CAP_THRESHOLD;
pub use dabt::DabtDimensions;
pub use dabt::compute_dabt;
pub use defect_service::CreateDefectInput;
pub use defect_service::DefectService;
pub use grader::DetectedDefect;
pub use grader::GradeInput;
pub use grader::GradeOutcome;
pub use grader::GraderCode;
pub use grader::grade_sanad;
pub use claims_service::ClaimsServiceError;
pub use defect_service::DefectServiceError;
pub use repo::ClaimsRepo;
pub use repo::DefectsRepo;
pub use repo::EvidenceRepo;
pub use repo::InMemoryClaimsRepo;
pub use repo::InMemoryDefectsRepo;
pub use repo::InMemoryEvidenceRepo;
pub use repo::InMemorySanadsRepo;
pub use repo::ProvenanceRepoError;
pub use repo::SanadsRepo;
pub use service::AutoGradeRunResult;
pub use service::ClaimGradeResult;
pub use service::SanadError;
pub use service::SanadService;
pub use service::auto_grade_claims_for_run;
pub use tawatur::assess_corroboration;
pub use tiering::SourceTier;
