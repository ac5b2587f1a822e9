// crates/idis-calc/src/registry.rs
// ============================================================================
// Module: Calc Registry and Execution
// Description: Formula registration, deterministic execution, grade binding.
// Purpose: Execute registered formulas reproducibly and propagate grades.
// Dependencies: idis-core, bigdecimal, serde, thiserror, uuid
// ============================================================================

//! ## Overview
//! The registry is read-mostly process-wide state initialized at startup;
//! ordinary request handling reads without locks. `run` validates inputs
//! against the formula's declaration, executes with [`BigDecimal`]
//! arithmetic, rounds half-even at the declared scale, and returns the
//! calculation together with its [`CalcSanad`]. The optional strict
//! extraction gate verifies every cited claim against the deal's registry
//! before executing and fails closed on violation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use bigdecimal::RoundingMode;
use idis_core::CalcId;
use idis_core::CalcInput;
use idis_core::CalcInputGrade;
use idis_core::CalcSanad;
use idis_core::CalcType;
use idis_core::ClaimId;
use idis_core::DealId;
use idis_core::DeterministicCalculation;
use idis_core::Grade;
use idis_core::HashDigest;
use idis_core::SanadId;
use idis_core::TenantId;
use idis_core::Timestamp;
use idis_core::hash_canonical_json;
use idis_core::sha256_hex;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Calculation engine errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum CalcError {
    /// Calc type has no registration.
    #[error("no formula registered for calc type {0}")]
    UnknownCalcType(CalcType),
    /// A required input is missing or an unexpected input was supplied.
    #[error("invalid calc inputs: {0}")]
    InvalidInputs(String),
    /// An input value failed decimal parsing.
    #[error("input '{name}' is not a decimal: {value}")]
    NotADecimal {
        /// Input name.
        name: String,
        /// Offending textual value.
        value: String,
    },
    /// Formula evaluation failed (division by zero, domain error).
    #[error("formula evaluation failed: {0}")]
    Evaluation(String),
    /// Strict gate: a cited claim is not in the deal's registry.
    #[error("cited claim {0} is not registered for this deal")]
    UnknownClaim(ClaimId),
    /// Reproducibility hash mismatch; the stored record was mutated.
    #[error("reproducibility hash mismatch for calc {0}")]
    Integrity(CalcId),
    /// Canonical serialization failed while hashing.
    #[error("calc hashing failed: {0}")]
    Hashing(String),
}

// ============================================================================
// SECTION: Formula Specification
// ============================================================================

/// Pure formula signature over named decimal inputs.
pub type FormulaFn =
    Box<dyn Fn(&BTreeMap<String, BigDecimal>) -> Result<BigDecimal, CalcError> + Send + Sync>;

/// One registered formula.
///
/// # Invariants
/// - `formula` is pure: same inputs, same output, no I/O.
/// - `source` is the text hashed into `formula_hash`.
pub struct FormulaSpec {
    /// Registry key.
    pub calc_type: CalcType,
    /// Required input names, in declaration order.
    pub required_inputs: Vec<String>,
    /// Rounding scale applied half-even to the output.
    pub scale: i64,
    /// Formula source text.
    pub source: String,
    /// Engine code version stamped into executions.
    pub code_version: String,
    /// Pure evaluation function.
    pub formula: FormulaFn,
}

impl FormulaSpec {
    /// Returns the SHA-256 of the formula source text.
    #[must_use]
    pub fn formula_hash(&self) -> HashDigest {
        sha256_hex(self.source.as_bytes())
    }
}

// ============================================================================
// SECTION: Input Claims
// ============================================================================

/// Claim backing one calculation input.
///
/// # Invariants
/// - `material == false` excludes the input from `calc_grade` but keeps it
///   in the explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalcInputClaim {
    /// Backing claim.
    pub claim_id: ClaimId,
    /// Grade of the backing claim.
    pub grade: Grade,
    /// Whether the input is material to the calculation.
    pub material: bool,
}

// ============================================================================
// SECTION: Reproducibility Hashing
// ============================================================================

/// Canonical hash preimage for a calculation.
#[derive(Serialize)]
struct HashPreimage<'a> {
    /// Calc type label.
    calc_type: &'a CalcType,
    /// Inputs sorted by name.
    inputs: &'a [CalcInput],
    /// Output at the declared scale.
    output: &'a str,
    /// Formula source hash.
    formula_hash: &'a str,
    /// Engine code version.
    code_version: &'a str,
}

/// Computes the reproducibility hash over the canonical preimage.
fn reproducibility_hash(
    calc_type: &CalcType,
    inputs: &[CalcInput],
    output: &str,
    formula_hash: &HashDigest,
    code_version: &str,
) -> Result<HashDigest, CalcError> {
    hash_canonical_json(&HashPreimage {
        calc_type,
        inputs,
        output,
        formula_hash: formula_hash.as_str(),
        code_version,
    })
    .map_err(|err| CalcError::Hashing(err.to_string()))
}

/// Recomputes a stored calculation's hash and fails on mismatch.
///
/// This is the tamper-detection contract: any field mutation invalidates
/// the stored hash.
///
/// # Errors
///
/// Returns [`CalcError::Integrity`] when the recomputed hash differs.
pub fn verify_reproducibility(calc: &DeterministicCalculation) -> Result<(), CalcError> {
    let recomputed = reproducibility_hash(
        &calc.calc_type,
        &calc.inputs,
        &calc.output,
        &calc.formula_hash,
        &calc.code_version,
    )?;
    if recomputed == calc.reproducibility_hash {
        Ok(())
    } else {
        Err(CalcError::Integrity(calc.calc_id.clone()))
    }
}

// ============================================================================
// SECTION: Execution Result
// ============================================================================

/// A calculation together with its provenance binding.
#[derive(Debug, Clone, PartialEq)]
pub struct CalcExecution {
    /// The stored calculation record.
    pub calculation: DeterministicCalculation,
    /// The grade binding over its inputs.
    pub calc_sanad: CalcSanad,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Process-wide formula registry.
///
/// Writes happen only during startup; concurrent reads do not lock.
pub struct CalcRegistry {
    /// Registered formulas keyed by calc type.
    formulas: BTreeMap<CalcType, FormulaSpec>,
}

impl CalcRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            formulas: BTreeMap::new(),
        }
    }

    /// Registers a formula, replacing any prior registration for its type.
    pub fn register(&mut self, spec: FormulaSpec) {
        self.formulas.insert(spec.calc_type, spec);
    }

    /// Returns the registered spec for `calc_type`.
    #[must_use]
    pub fn get(&self, calc_type: CalcType) -> Option<&FormulaSpec> {
        self.formulas.get(&calc_type)
    }

    /// Returns the registered calc types in stable order.
    #[must_use]
    pub fn registered_types(&self) -> Vec<CalcType> {
        self.formulas.keys().copied().collect()
    }

    /// Executes a registered formula deterministically.
    ///
    /// When `claim_registry` is `Some`, the strict extraction gate verifies
    /// every cited claim before executing and fails closed on violation.
    ///
    /// # Errors
    ///
    /// Returns [`CalcError`] on unknown calc types, input violations,
    /// evaluation failures, or hashing failures.
    pub fn run(
        &self,
        tenant_id: &TenantId,
        deal_id: &DealId,
        calc_type: CalcType,
        input_values: &BTreeMap<String, String>,
        input_claims: &[CalcInputClaim],
        claim_registry: Option<&BTreeSet<ClaimId>>,
    ) -> Result<CalcExecution, CalcError> {
        let spec = self
            .formulas
            .get(&calc_type)
            .ok_or(CalcError::UnknownCalcType(calc_type))?;

        if let Some(registry) = claim_registry {
            for cited in input_claims {
                if !registry.contains(&cited.claim_id) {
                    return Err(CalcError::UnknownClaim(cited.claim_id.clone()));
                }
            }
        }

        let mut parsed: BTreeMap<String, BigDecimal> = BTreeMap::new();
        for name in &spec.required_inputs {
            let value = input_values.get(name).ok_or_else(|| {
                CalcError::InvalidInputs(format!("missing required input '{name}'"))
            })?;
            let decimal = BigDecimal::from_str(value).map_err(|_| CalcError::NotADecimal {
                name: name.clone(),
                value: value.clone(),
            })?;
            parsed.insert(name.clone(), decimal);
        }
        for name in input_values.keys() {
            if !spec.required_inputs.iter().any(|required| required == name) {
                return Err(CalcError::InvalidInputs(format!(
                    "unexpected input '{name}'"
                )));
            }
        }

        let raw_output = (spec.formula)(&parsed)?;
        let output = raw_output
            .with_scale_round(spec.scale, RoundingMode::HalfEven)
            .to_string();

        let inputs: Vec<CalcInput> = input_values
            .iter()
            .map(|(name, value)| CalcInput {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();

        let formula_hash = spec.formula_hash();
        let hash = reproducibility_hash(
            &calc_type,
            &inputs,
            &output,
            &formula_hash,
            &spec.code_version,
        )?;

        let calc_id = CalcId::new(Uuid::new_v4().to_string());
        let calculation = DeterministicCalculation {
            calc_id: calc_id.clone(),
            tenant_id: tenant_id.clone(),
            deal_id: deal_id.clone(),
            calc_type,
            inputs,
            formula_hash,
            code_version: spec.code_version.clone(),
            output,
            reproducibility_hash: hash,
            executed_at: Timestamp::now(),
        };
        let calc_sanad = derive_calc_sanad(&calc_id, input_claims);
        Ok(CalcExecution {
            calculation,
            calc_sanad,
        })
    }
}

impl Default for CalcRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Grade Propagation
// ============================================================================

/// Derives the calc-sanad grade binding from input claims.
///
/// `calc_grade` is the worst grade across material inputs; a material
/// grade-D input therefore forces `D`. Non-material inputs are excluded from
/// the minimum but appear in the explanation. A calculation whose inputs
/// carry no graded claims defaults to `A` — there is nothing to propagate.
fn derive_calc_sanad(calc_id: &CalcId, input_claims: &[CalcInputClaim]) -> CalcSanad {
    let input_min_grade =
        Grade::worst(input_claims.iter().map(|claim| claim.grade)).unwrap_or(Grade::A);
    let calc_grade = Grade::worst(
        input_claims
            .iter()
            .filter(|claim| claim.material)
            .map(|claim| claim.grade),
    )
    .unwrap_or(Grade::A);

    let mut explanation = Vec::with_capacity(input_claims.len() + 1);
    for claim in input_claims {
        if claim.material {
            explanation.push(format!(
                "input {} grade {} (material)",
                claim.claim_id, claim.grade
            ));
        } else {
            explanation.push(format!(
                "input {} grade {} excluded from calc_grade (non-material)",
                claim.claim_id, claim.grade
            ));
        }
    }
    explanation.push(format!("calc_grade = {calc_grade}"));

    CalcSanad {
        sanad_id: SanadId::new(Uuid::new_v4().to_string()),
        calc_id: calc_id.clone(),
        input_claim_ids: input_claims
            .iter()
            .map(|claim| claim.claim_id.clone())
            .collect(),
        input_grades: input_claims
            .iter()
            .map(|claim| CalcInputGrade {
                claim_id: claim.claim_id.clone(),
                grade: claim.grade,
                material: claim.material,
            })
            .collect(),
        input_min_grade,
        calc_grade,
        explanation,
    }
}
