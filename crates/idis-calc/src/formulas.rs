// crates/idis-calc/src/formulas.rs
// ============================================================================
// Module: Built-in Formulas
// Description: Registered formulas for runway, gross margin, and burn multiple.
// Purpose: Provide the startup registry used by the pipeline's CALC step.
// Dependencies: crate::registry, bigdecimal, idis-core
// ============================================================================

//! ## Overview
//! Built-in formulas are registered once at startup. Each declares its input
//! names, source text, rounding scale, and a code version; changing any of
//! these changes the formula hash and therefore every downstream
//! reproducibility hash.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use bigdecimal::Zero;
use idis_core::CalcType;

use crate::registry::CalcError;
use crate::registry::CalcRegistry;
use crate::registry::FormulaSpec;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Engine code version stamped into every execution.
pub const CODE_VERSION: &str = "calc-engine/1.2.0";

/// Runway formula source text.
const RUNWAY_SOURCE: &str = "runway_months = cash_balance / monthly_burn";

/// Gross-margin formula source text.
const GROSS_MARGIN_SOURCE: &str = "gross_margin_pct = (revenue - cogs) / revenue * 100";

/// Burn-multiple formula source text.
const BURN_MULTIPLE_SOURCE: &str = "burn_multiple = net_burn / net_new_arr";

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Looks up a parsed input by name.
fn input<'a>(
    inputs: &'a BTreeMap<String, BigDecimal>,
    name: &str,
) -> Result<&'a BigDecimal, CalcError> {
    inputs
        .get(name)
        .ok_or_else(|| CalcError::Evaluation(format!("input '{name}' missing at evaluation")))
}

/// Divides with a domain check for zero denominators.
fn checked_div(
    numerator: &BigDecimal,
    denominator: &BigDecimal,
    label: &str,
) -> Result<BigDecimal, CalcError> {
    if denominator.is_zero() {
        return Err(CalcError::Evaluation(format!("{label} is zero")));
    }
    Ok(numerator / denominator)
}

// ============================================================================
// SECTION: Registration
// ============================================================================

/// Builds a registry with every built-in formula registered.
#[must_use]
pub fn builtin_registry() -> CalcRegistry {
    let mut registry = CalcRegistry::new();

    registry.register(FormulaSpec {
        calc_type: CalcType::Runway,
        required_inputs: vec!["cash_balance".to_string(), "monthly_burn".to_string()],
        scale: 1,
        source: RUNWAY_SOURCE.to_string(),
        code_version: CODE_VERSION.to_string(),
        formula: Box::new(|inputs| {
            let cash = input(inputs, "cash_balance")?;
            let burn = input(inputs, "monthly_burn")?;
            checked_div(cash, burn, "monthly_burn")
        }),
    });

    registry.register(FormulaSpec {
        calc_type: CalcType::GrossMargin,
        required_inputs: vec!["revenue".to_string(), "cogs".to_string()],
        scale: 2,
        source: GROSS_MARGIN_SOURCE.to_string(),
        code_version: CODE_VERSION.to_string(),
        formula: Box::new(|inputs| {
            let revenue = input(inputs, "revenue")?;
            let cogs = input(inputs, "cogs")?;
            let margin = checked_div(&(revenue - cogs), revenue, "revenue")?;
            Ok(margin * BigDecimal::from(100))
        }),
    });

    registry.register(FormulaSpec {
        calc_type: CalcType::BurnMultiple,
        required_inputs: vec!["net_burn".to_string(), "net_new_arr".to_string()],
        scale: 2,
        source: BURN_MULTIPLE_SOURCE.to_string(),
        code_version: CODE_VERSION.to_string(),
        formula: Box::new(|inputs| {
            let burn = input(inputs, "net_burn")?;
            let arr = input(inputs, "net_new_arr")?;
            checked_div(burn, arr, "net_new_arr")
        }),
    });

    registry
}
