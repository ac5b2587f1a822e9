// crates/idis-core/src/lib.rs
// ============================================================================
// Module: IDIS Core
// Description: Domain model for the IDIS trust-and-provenance core.
// Purpose: Provide identifiers, canonical hashing, and sealed domain entities.
// Dependencies: serde, serde_json, serde_jcs, sha2, thiserror, time
// ============================================================================

//! ## Overview
//! `idis-core` holds the shared domain model for the IDIS trust-and-provenance
//! core: opaque identifiers, RFC 3339 timestamps, canonical (RFC 8785) JSON
//! hashing, the tenant context, and the sealed entity types every subsystem
//! consumes — claims, evidence, sanads, defects, deterministic calculations,
//! runs, agent outputs, and deliverable facts.
//!
//! The crate is deliberately free of I/O: persistence, audit emission, and
//! orchestration live in downstream crates. Everything here is a value type
//! with structural equality and validation at construction boundaries.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;

pub use crate::core::agents::AgentOutput;
pub use crate::core::agents::AgentRole;
pub use crate::core::agents::MuhasabahRecord;
pub use crate::core::calc::CalcInput;
pub use crate::core::calc::CalcInputGrade;
pub use crate::core::calc::CalcSanad;
pub use crate::core::calc::CalcType;
pub use crate::core::calc::DeterministicCalculation;
pub use crate::core::claims::Claim;
pub use crate::core::claims::ClaimAction;
pub use crate::core::claims::ClaimClass;
pub use crate::core::claims::ClaimVerdict;
pub use crate::core::claims::Materiality;
pub use crate::core::context::DataRegion;
pub use crate::core::context::Role;
pub use crate::core::context::TenantContext;
pub use crate::core::defects::Defect;
pub use crate::core::defects::DefectSeverity;
pub use crate::core::defects::DefectStatus;
pub use crate::core::defects::DefectType;
pub use crate::core::error::ErrorKind;
pub use crate::core::evidence::ActorType;
pub use crate::core::evidence::AttestedValue;
pub use crate::core::evidence::CoiSeverity;
pub use crate::core::evidence::EvidenceItem;
pub use crate::core::evidence::NodeType;
pub use crate::core::evidence::TransmissionNode;
pub use crate::core::facts::FactSection;
pub use crate::core::hashing::HashDigest;
pub use crate::core::hashing::HashError;
pub use crate::core::hashing::canonical_json_bytes;
pub use crate::core::hashing::hash_canonical_json;
pub use crate::core::hashing::sha256_hex;
pub use crate::core::identifiers::ActorId;
pub use crate::core::identifiers::CalcId;
pub use crate::core::identifiers::ClaimId;
pub use crate::core::identifiers::DealId;
pub use crate::core::identifiers::DefectId;
pub use crate::core::identifiers::EventId;
pub use crate::core::identifiers::EvidenceId;
pub use crate::core::identifiers::NodeId;
pub use crate::core::identifiers::OutputId;
pub use crate::core::identifiers::PromptId;
pub use crate::core::identifiers::RequestId;
pub use crate::core::identifiers::RunId;
pub use crate::core::identifiers::SanadId;
pub use crate::core::identifiers::SpanId;
pub use crate::core::identifiers::StepId;
pub use crate::core::identifiers::TenantId;
pub use crate::core::identifiers::is_uuid_shaped;
pub use crate::core::runs::FULL_STEPS;
pub use crate::core::runs::Run;
pub use crate::core::runs::RunMode;
pub use crate::core::runs::RunStatus;
pub use crate::core::runs::RunStep;
pub use crate::core::runs::SNAPSHOT_STEPS;
pub use crate::core::runs::StepName;
pub use crate::core::runs::StepStatus;
pub use crate::core::sanad::CorroborationStatus;
pub use crate::core::sanad::ExplanationEntry;
pub use crate::core::sanad::Grade;
pub use crate::core::sanad::Sanad;
pub use crate::core::time::Timestamp;
pub use crate::core::time::TimestampError;
