// crates/idis-core/src/core/calc.rs
// ============================================================================
// Module: IDIS Calculation Model
// Description: Deterministic calculations and their provenance binding.
// Purpose: Record reproducibility-hashed numeric computations.
// Dependencies: crate::core::{identifiers, sanad, time}, serde
// ============================================================================

//! ## Overview
//! A [`DeterministicCalculation`] stores everything needed to re-execute a
//! formula byte-for-byte: ordered textual decimal inputs, the formula-source
//! hash, the code version, and the output. The `reproducibility_hash` covers
//! `(calc_type, inputs, output, formula_hash, code_version)` canonically
//! serialized; any field mutation invalidates it. A [`CalcSanad`] binds the
//! calculation to the grades of its input claims.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::HashDigest;
use crate::core::identifiers::CalcId;
use crate::core::identifiers::ClaimId;
use crate::core::identifiers::DealId;
use crate::core::identifiers::SanadId;
use crate::core::identifiers::TenantId;
use crate::core::sanad::Grade;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Calc Types
// ============================================================================

/// Registered calculation types.
///
/// # Invariants
/// - Variants are stable registry keys; adding one requires a formula
///   registration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalcType {
    /// Months of runway at current burn.
    Runway,
    /// Gross margin percentage.
    GrossMargin,
    /// Net burn multiple.
    BurnMultiple,
}

impl fmt::Display for CalcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Runway => "RUNWAY",
            Self::GrossMargin => "GROSS_MARGIN",
            Self::BurnMultiple => "BURN_MULTIPLE",
        };
        f.write_str(label)
    }
}

// ============================================================================
// SECTION: Calculation Inputs
// ============================================================================

/// One named decimal input, kept textual for byte-stable hashing.
///
/// # Invariants
/// - `value` parses as a decimal; the engine validates at execution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalcInput {
    /// Input name as declared by the formula.
    pub name: String,
    /// Textual decimal value.
    pub value: String,
}

// ============================================================================
// SECTION: Calculation Record
// ============================================================================

/// A stored deterministic calculation.
///
/// # Invariants
/// - `inputs` are sorted by name.
/// - Re-executing the formula over `inputs` reproduces `output` exactly.
/// - `reproducibility_hash` covers `(calc_type, inputs, output,
///   formula_hash, code_version)` canonically serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicCalculation {
    /// Calculation identifier.
    pub calc_id: CalcId,
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Deal scope.
    pub deal_id: DealId,
    /// Registered calculation type.
    pub calc_type: CalcType,
    /// Named inputs, sorted by name.
    pub inputs: Vec<CalcInput>,
    /// SHA-256 of the formula source text.
    pub formula_hash: HashDigest,
    /// Engine code version stamped at execution.
    pub code_version: String,
    /// Textual decimal output at the formula's declared scale.
    pub output: String,
    /// Tamper-detection hash.
    pub reproducibility_hash: HashDigest,
    /// Execution timestamp.
    pub executed_at: Timestamp,
}

// ============================================================================
// SECTION: Calc Sanad
// ============================================================================

/// Grade standing of one calculation input.
///
/// # Invariants
/// - Non-material inputs are excluded from `calc_grade` but still listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalcInputGrade {
    /// Claim backing the input.
    pub claim_id: ClaimId,
    /// Grade of the backing claim.
    pub grade: Grade,
    /// Whether the input is material to the calculation.
    pub material: bool,
}

/// Provenance binding for a calculation's inputs.
///
/// # Invariants
/// - `calc_grade` is the worst grade across material inputs; a material
///   grade-D input forces `calc_grade == Grade::D`.
/// - `input_min_grade` is the worst grade across all inputs, material or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalcSanad {
    /// Sanad identifier for the calculation binding.
    pub sanad_id: SanadId,
    /// Calculation this binding covers.
    pub calc_id: CalcId,
    /// Input claims in input order.
    pub input_claim_ids: Vec<ClaimId>,
    /// Per-input grade standing.
    pub input_grades: Vec<CalcInputGrade>,
    /// Worst grade across all inputs.
    pub input_min_grade: Grade,
    /// Derived grade from material inputs only.
    pub calc_grade: Grade,
    /// Ordered explanation of the derivation, including exclusions.
    pub explanation: Vec<String>,
}
