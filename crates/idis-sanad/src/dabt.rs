// crates/idis-sanad/src/dabt.rs
// ============================================================================
// Module: Dabt Precision Scoring
// Description: Composite source-precision score over four dimensions.
// Purpose: Cap grades when precision is too weak to support them.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Dabt is the weighted combination of documentation, transmission, temporal,
//! and cognitive precision, each in `[0, 1]`. Missing dimensions count as
//! zero — no silent exclusion. A final score below 0.50 caps the achievable
//! grade at `B`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Dabt score below which the achievable grade is capped at `B`.
pub const DABT_GRADE_CAP_THRESHOLD: f64 = 0.50;

/// Dimension weights: documentation, transmission, temporal, cognitive.
const WEIGHTS: [f64; 4] = [0.35, 0.25, 0.20, 0.20];

// ============================================================================
// SECTION: Dimensions
// ============================================================================

/// The four Dabt precision dimensions, each in `[0, 1]` when present.
///
/// # Invariants
/// - A missing dimension scores zero; it is never dropped from the weighting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DabtDimensions {
    /// How precisely the source documents its figures.
    pub documentation_precision: Option<f64>,
    /// How faithfully the value survived transmission.
    pub transmission_precision: Option<f64>,
    /// How current the source is relative to the claim's period.
    pub temporal_precision: Option<f64>,
    /// How well the source understood what it reported.
    pub cognitive_precision: Option<f64>,
}

// ============================================================================
// SECTION: Scoring
// ============================================================================

/// Computes the composite Dabt score with missing dimensions as zero.
///
/// Out-of-range dimension values clamp into `[0, 1]` so a malformed input
/// can never inflate the score above a fully precise source.
#[must_use]
pub fn compute_dabt(dimensions: &DabtDimensions) -> f64 {
    let values = [
        dimensions.documentation_precision,
        dimensions.transmission_precision,
        dimensions.temporal_precision,
        dimensions.cognitive_precision,
    ];
    values
        .iter()
        .zip(WEIGHTS.iter())
        .map(|(value, weight)| value.unwrap_or(0.0).clamp(0.0, 1.0) * weight)
        .sum()
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions are permitted."
    )]
    use super::*;

    #[test]
    fn full_precision_scores_one() {
        let dims = DabtDimensions {
            documentation_precision: Some(1.0),
            transmission_precision: Some(1.0),
            temporal_precision: Some(1.0),
            cognitive_precision: Some(1.0),
        };
        assert!((compute_dabt(&dims) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn missing_dimensions_count_as_zero() {
        let dims = DabtDimensions {
            documentation_precision: Some(1.0),
            transmission_precision: None,
            temporal_precision: None,
            cognitive_precision: None,
        };
        assert!((compute_dabt(&dims) - 0.35).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_values_clamp() {
        let dims = DabtDimensions {
            documentation_precision: Some(5.0),
            transmission_precision: Some(-1.0),
            temporal_precision: Some(1.0),
            cognitive_precision: Some(1.0),
        };
        assert!((compute_dabt(&dims) - (0.35 + 0.20 + 0.20)).abs() < 1e-9);
    }
}
