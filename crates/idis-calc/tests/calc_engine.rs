// crates/idis-calc/tests/calc_engine.rs
// ============================================================================
// Module: Calc Engine Tests
// Description: Verifies deterministic execution, hashing, and grade binding.
// ============================================================================
//! ## Overview
//! Ensures re-execution reproduces outputs and hashes byte-for-byte, tamper
//! detection fires on any field mutation, and material grade-D inputs force
//! a grade-D calc sanad.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use idis_calc::CalcError;
use idis_calc::CalcInputClaim;
use idis_calc::formulas::builtin_registry;
use idis_calc::verify_reproducibility;
use idis_core::CalcType;
use idis_core::ClaimId;
use idis_core::DealId;
use idis_core::Grade;
use idis_core::TenantId;

fn inputs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
        .collect()
}

fn claims(entries: &[(&str, Grade, bool)]) -> Vec<CalcInputClaim> {
    entries
        .iter()
        .map(|(id, grade, material)| CalcInputClaim {
            claim_id: ClaimId::new(*id),
            grade: *grade,
            material: *material,
        })
        .collect()
}

#[test]
fn runway_rounds_half_even_at_declared_scale() {
    let registry = builtin_registry();
    let execution = registry
        .run(
            &TenantId::new("tenant-1"),
            &DealId::new("deal-1"),
            CalcType::Runway,
            &inputs(&[("cash_balance", "1250000"), ("monthly_burn", "120000")]),
            &claims(&[("claim-cash", Grade::A, true), ("claim-burn", Grade::B, true)]),
            None,
        )
        .unwrap();
    // 1250000 / 120000 = 10.41666... -> 10.4 at scale 1.
    assert_eq!(execution.calculation.output, "10.4");
}

#[test]
fn re_execution_reproduces_output_and_hash() {
    let registry = builtin_registry();
    let run = |_: u32| {
        registry
            .run(
                &TenantId::new("tenant-1"),
                &DealId::new("deal-1"),
                CalcType::GrossMargin,
                &inputs(&[("revenue", "5200000"), ("cogs", "1300000")]),
                &claims(&[("claim-rev", Grade::B, true), ("claim-cogs", Grade::B, true)]),
                None,
            )
            .unwrap()
    };
    let first = run(0);
    let second = run(1);
    assert_eq!(first.calculation.output, second.calculation.output);
    assert_eq!(
        first.calculation.reproducibility_hash,
        second.calculation.reproducibility_hash
    );
    assert_eq!(first.calculation.output, "75.00");
}

#[test]
fn verify_reproducibility_detects_any_field_mutation() {
    let registry = builtin_registry();
    let execution = registry
        .run(
            &TenantId::new("tenant-1"),
            &DealId::new("deal-1"),
            CalcType::Runway,
            &inputs(&[("cash_balance", "900000"), ("monthly_burn", "100000")]),
            &claims(&[("claim-cash", Grade::A, true)]),
            None,
        )
        .unwrap();
    verify_reproducibility(&execution.calculation).unwrap();

    let mut tampered = execution.calculation.clone();
    tampered.output = "99.0".to_string();
    assert!(matches!(
        verify_reproducibility(&tampered),
        Err(CalcError::Integrity(_))
    ));

    let mut tampered = execution.calculation.clone();
    tampered.inputs[0].value = "900001".to_string();
    assert!(verify_reproducibility(&tampered).is_err());

    let mut tampered = execution.calculation;
    tampered.code_version = "calc-engine/9.9.9".to_string();
    assert!(verify_reproducibility(&tampered).is_err());
}

#[test]
fn material_grade_d_input_forces_calc_grade_d() {
    let registry = builtin_registry();
    let execution = registry
        .run(
            &TenantId::new("tenant-1"),
            &DealId::new("deal-1"),
            CalcType::BurnMultiple,
            &inputs(&[("net_burn", "400000"), ("net_new_arr", "800000")]),
            &claims(&[
                ("claim-burn", Grade::D, true),
                ("claim-arr", Grade::A, true),
            ]),
            None,
        )
        .unwrap();
    assert_eq!(execution.calc_sanad.calc_grade, Grade::D);
    assert_eq!(execution.calc_sanad.input_min_grade, Grade::D);
}

#[test]
fn non_material_inputs_are_excluded_but_explained() {
    let registry = builtin_registry();
    let execution = registry
        .run(
            &TenantId::new("tenant-1"),
            &DealId::new("deal-1"),
            CalcType::Runway,
            &inputs(&[("cash_balance", "1000000"), ("monthly_burn", "100000")]),
            &claims(&[
                ("claim-cash", Grade::B, true),
                ("claim-context", Grade::D, false),
            ]),
            None,
        )
        .unwrap();
    assert_eq!(execution.calc_sanad.calc_grade, Grade::B);
    assert_eq!(execution.calc_sanad.input_min_grade, Grade::D);
    assert!(
        execution
            .calc_sanad
            .explanation
            .iter()
            .any(|line| line.contains("excluded from calc_grade"))
    );
}

#[test]
fn no_input_grades_defaults_to_a() {
    let registry = builtin_registry();
    let execution = registry
        .run(
            &TenantId::new("tenant-1"),
            &DealId::new("deal-1"),
            CalcType::Runway,
            &inputs(&[("cash_balance", "1000000"), ("monthly_burn", "100000")]),
            &[],
            None,
        )
        .unwrap();
    assert_eq!(execution.calc_sanad.calc_grade, Grade::A);
    assert_eq!(execution.calc_sanad.input_min_grade, Grade::A);
    assert!(execution.calc_sanad.input_claim_ids.is_empty());
}

#[test]
fn strict_gate_rejects_unregistered_claims() {
    let registry = builtin_registry();
    let known: BTreeSet<ClaimId> = [ClaimId::new("claim-cash")].into_iter().collect();
    let err = registry.run(
        &TenantId::new("tenant-1"),
        &DealId::new("deal-1"),
        CalcType::Runway,
        &inputs(&[("cash_balance", "1000000"), ("monthly_burn", "100000")]),
        &claims(&[("claim-unknown", Grade::B, true)]),
        Some(&known),
    );
    assert!(matches!(err, Err(CalcError::UnknownClaim(_))));
}

#[test]
fn missing_and_unexpected_inputs_fail_closed() {
    let registry = builtin_registry();
    let err = registry.run(
        &TenantId::new("tenant-1"),
        &DealId::new("deal-1"),
        CalcType::Runway,
        &inputs(&[("cash_balance", "1000000")]),
        &[],
        None,
    );
    assert!(matches!(err, Err(CalcError::InvalidInputs(_))));

    let err = registry.run(
        &TenantId::new("tenant-1"),
        &DealId::new("deal-1"),
        CalcType::Runway,
        &inputs(&[
            ("cash_balance", "1000000"),
            ("monthly_burn", "100000"),
            ("extra", "1"),
        ]),
        &[],
        None,
    );
    assert!(matches!(err, Err(CalcError::InvalidInputs(_))));
}

#[test]
fn zero_denominator_is_an_evaluation_error() {
    let registry = builtin_registry();
    let err = registry.run(
        &TenantId::new("tenant-1"),
        &DealId::new("deal-1"),
        CalcType::Runway,
        &inputs(&[("cash_balance", "1000000"), ("monthly_burn", "0")]),
        &[],
        None,
    );
    assert!(matches!(err, Err(CalcError::Evaluation(_))));
}
