//! Elementwise bias-corrected and accelerated (BCa) intervals for PCA loadings.
//!
//! Every cell `[component, variable]` of the loading matrix gets its own
//! interval:
//! - `z0` from the share of bootstrap loadings strictly below the empirical one,
//! - `a` from the jackknife skewness `Σ(θ̄−θᵢ)³ / (6·[Σ(θ̄−θᵢ)²]^(3/2))`,
//! - tail location `Φ(z0 + (z0 + zα) / (1 − a·(z0 + zα)))`,
//! - bound = sorted bootstrap loadings at `floor(location · B)`.
//!
//! Reference: Babamoradi, van den Berg & Rinnan (2013), "Bootstrap based
//! confidence limits in principal component analysis: A case study",
//! Chemometrics and Intelligent Laboratory Systems 120, 97–105.

use log::{debug, warn};
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt;

use crate::error::ConfidenceError;

pub const MIN_BOOTSTRAP_SAMPLES: usize = 2;
pub const MIN_JACKKNIFE_SAMPLES: usize = 3;

/// Which end of the interval a value belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundKind {
    #[serde(rename = "lb")]
    Lower,
    #[serde(rename = "ub")]
    Upper,
}

impl BoundKind {
    /// Short tabular label.
    pub fn label(&self) -> &'static str {
        match self {
            BoundKind::Lower => "lb",
            BoundKind::Upper => "ub",
        }
    }
}

impl fmt::Display for BoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What pushed a tail location to the edge of `[0, 1]`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivergenceCause {
    /// No bootstrap loading (or every one) lies below the empirical loading.
    InfiniteBiasCorrection,
    /// `1 − a·(z0 + zα)` reached zero or changed sign.
    DenominatorPole,
    /// The location was valid but `floor(location · B)` fell outside `[0, B)`.
    IndexOutOfRange,
}

/// A bound whose rank index had to be saturated or clamped.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct QuantileDivergence {
    pub component: usize,
    pub variable: usize,
    pub bound: BoundKind,
    pub cause: DivergenceCause,
    /// Tail location after saturation.
    pub location: f64,
    /// Index finally used in the sorted bootstrap values.
    pub index: usize,
}

/// Tail location in `[0, 1]`, with the reason when it was saturated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustedLocation {
    pub location: f64,
    pub saturated: Option<DivergenceCause>,
}

/// Rank into the sorted bootstrap values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankIndex {
    pub index: usize,
    pub clamped: bool,
}

/// Lower and upper bound matrices plus the per-cell BCa terms.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConfidenceIntervals {
    /// Shape: (n_components, n_variables)
    pub lower: Array2<f64>,
    /// Shape: (n_components, n_variables)
    pub upper: Array2<f64>,
    pub lower_indices: Array2<usize>,
    pub upper_indices: Array2<usize>,
    pub bias_correction: Array2<f64>,
    pub acceleration: Array2<f64>,
    pub divergences: Vec<QuantileDivergence>,
}

#[inline]
fn standard_normal() -> Normal {
    // mean 0, sd 1 is always a valid parameterization
    Normal::new(0.0, 1.0).expect("standard normal is constructible")
}

/// Bias-correction term `z0 = Φ⁻¹(#{θ*_b < θ̂} / B)`.
///
/// A proportion of 0 or 1 maps to −∞ or +∞. An empty lane gives NaN.
pub fn bias_correction(bootstrap_values: ArrayView1<f64>, empirical_value: f64) -> f64 {
    if bootstrap_values.is_empty() {
        return f64::NAN;
    }
    let below = bootstrap_values.iter().filter(|&&value| value < empirical_value).count();
    let proportion = below as f64 / bootstrap_values.len() as f64;
    if proportion <= 0.0 {
        f64::NEG_INFINITY
    } else if proportion >= 1.0 {
        f64::INFINITY
    } else {
        standard_normal().inverse_cdf(proportion)
    }
}

/// Jackknife acceleration `Σ(θ̄−θᵢ)³ / (6·[Σ(θ̄−θᵢ)²]^(3/2))`; zero when the
/// jackknife values do not vary.
pub fn acceleration(jackknife_values: ArrayView1<f64>) -> f64 {
    // the float mean of identical values can miss them by an ulp
    let Some(&first) = jackknife_values.first() else {
        return 0.0;
    };
    if jackknife_values.iter().all(|&value| value == first) {
        return 0.0;
    }
    let n = jackknife_values.len() as f64;
    let mean = jackknife_values.sum() / n;
    let mut sum_squares = 0.0;
    let mut sum_cubes = 0.0;
    for &value in jackknife_values.iter() {
        let deviation = mean - value;
        sum_squares += deviation * deviation;
        sum_cubes += deviation * deviation * deviation;
    }
    if sum_squares <= 0.0 {
        return 0.0;
    }
    sum_cubes / (6.0 * sum_squares.powf(1.5))
}

/// Standard-normal critical values at `α/2` and `1 − α/2`.
pub fn critical_values(significance_level: f64) -> Result<(f64, f64), ConfidenceError> {
    if !(significance_level > 0.0 && significance_level < 1.0) {
        return Err(ConfidenceError::InvalidSignificanceLevel(significance_level));
    }
    let normal = standard_normal();
    Ok((
        normal.inverse_cdf(significance_level / 2.0),
        normal.inverse_cdf(1.0 - significance_level / 2.0),
    ))
}

/// BCa tail location `Φ(z0 + (z0 + zα) / (1 − a·(z0 + zα)))`.
///
/// Past the pole of the denominator, or with an infinite `z0`, the location
/// saturates at 0 or 1 following the sign of the numerator, which is the
/// limit reached from the valid side.
pub fn adjusted_location(z0: f64, acceleration: f64, z_critical: f64) -> AdjustedLocation {
    if !z0.is_finite() {
        return AdjustedLocation {
            location: if z0 > 0.0 { 1.0 } else { 0.0 },
            saturated: Some(DivergenceCause::InfiniteBiasCorrection),
        };
    }
    let shifted = z0 + z_critical;
    let denominator = 1.0 - acceleration * shifted;
    if !(denominator > 0.0) {
        return AdjustedLocation {
            location: if shifted > 0.0 { 1.0 } else { 0.0 },
            saturated: Some(DivergenceCause::DenominatorPole),
        };
    }
    AdjustedLocation {
        location: standard_normal().cdf(z0 + shifted / denominator),
        saturated: None,
    }
}

/// Products closer than this to an integer are taken as that integer.
pub const RANK_SNAP_TOLERANCE: f64 = 1e-6;

/// `floor(location · n_bootstrap)`, clamped into `[0, n_bootstrap)`.
///
/// `Φ(Φ⁻¹(p))` does not return `p` exactly, so a product that lands within
/// [`RANK_SNAP_TOLERANCE`] of an integer is snapped to it before flooring.
pub fn rank_index(location: f64, n_bootstrap: usize) -> RankIndex {
    let scaled = location * n_bootstrap as f64;
    let nearest = scaled.round();
    let raw = if (scaled - nearest).abs() <= RANK_SNAP_TOLERANCE { nearest } else { scaled.floor() };
    if raw < 0.0 {
        RankIndex { index: 0, clamped: true }
    } else if raw >= n_bootstrap as f64 {
        RankIndex { index: n_bootstrap.saturating_sub(1), clamped: true }
    } else {
        RankIndex { index: raw as usize, clamped: false }
    }
}

fn sorted_lane(lane: ArrayView1<f64>) -> Vec<f64> {
    let mut values = lane.to_vec();
    values.sort_by(f64::total_cmp);
    values
}

/// Picks, for every cell, the value at the given rank of that cell's sorted
/// bootstrap loadings. `bootstrap` is stacked as (member, component, variable).
pub fn confidence_intervals_from_indexes(
    indexes: ArrayView2<usize>,
    bootstrap: ArrayView3<f64>,
) -> Result<Array2<f64>, ConfidenceError> {
    let (n_members, n_components, n_variables) = bootstrap.dim();
    if indexes.dim() != (n_components, n_variables) {
        return Err(ConfidenceError::ShapeMismatch {
            context: "rank index matrix",
            expected: (n_components, n_variables),
            found: indexes.dim(),
        });
    }
    let mut bounds = Array2::zeros((n_components, n_variables));
    for ((component, variable), &index) in indexes.indexed_iter() {
        let index = index.min(n_members.saturating_sub(1));
        let values = sorted_lane(bootstrap.slice(ndarray::s![.., component, variable]));
        bounds[[component, variable]] = values[index];
    }
    Ok(bounds)
}

fn validate_inputs(
    bootstrap: &ArrayView3<f64>,
    jackknife: &ArrayView3<f64>,
    empirical: &ArrayView2<f64>,
    significance_level: f64,
) -> Result<(), ConfidenceError> {
    if !(significance_level > 0.0 && significance_level < 1.0) {
        return Err(ConfidenceError::InvalidSignificanceLevel(significance_level));
    }
    let (n_bootstrap, b_components, b_variables) = bootstrap.dim();
    let (n_jackknife, j_components, j_variables) = jackknife.dim();
    if n_bootstrap < MIN_BOOTSTRAP_SAMPLES {
        return Err(ConfidenceError::InsufficientBootstrapSamples {
            found: n_bootstrap,
            required: MIN_BOOTSTRAP_SAMPLES,
        });
    }
    if n_jackknife < MIN_JACKKNIFE_SAMPLES {
        return Err(ConfidenceError::InsufficientJackknifeSamples {
            found: n_jackknife,
            required: MIN_JACKKNIFE_SAMPLES,
        });
    }
    if (b_components, b_variables) != empirical.dim() {
        return Err(ConfidenceError::ShapeMismatch {
            context: "bootstrap eigenvectors",
            expected: empirical.dim(),
            found: (b_components, b_variables),
        });
    }
    if (j_components, j_variables) != empirical.dim() {
        return Err(ConfidenceError::ShapeMismatch {
            context: "jackknife eigenvectors",
            expected: empirical.dim(),
            found: (j_components, j_variables),
        });
    }
    if bootstrap.iter().any(|value| !value.is_finite()) {
        return Err(ConfidenceError::NonFiniteEnsembleValue { context: "bootstrap ensemble" });
    }
    if jackknife.iter().any(|value| !value.is_finite()) {
        return Err(ConfidenceError::NonFiniteEnsembleValue { context: "jackknife ensemble" });
    }
    if empirical.iter().any(|value| !value.is_finite()) {
        return Err(ConfidenceError::NonFiniteEnsembleValue { context: "empirical eigenvectors" });
    }
    Ok(())
}

/// Computes elementwise BCa bounds for every loading.
///
/// `bootstrap` holds the aligned bootstrap eigenvectors and `jackknife` the
/// leave-one-out eigenvectors, both stacked as (member, component, variable).
/// Bounds whose location saturates or whose rank falls outside the ensemble
/// are clamped to the nearest valid rank and reported in `divergences`.
pub fn produce_confidence_intervals(
    bootstrap: ArrayView3<f64>,
    jackknife: ArrayView3<f64>,
    empirical: ArrayView2<f64>,
    significance_level: f64,
) -> Result<ConfidenceIntervals, ConfidenceError> {
    validate_inputs(&bootstrap, &jackknife, &empirical, significance_level)?;
    let n_bootstrap = bootstrap.len_of(Axis(0));
    let (n_components, n_variables) = empirical.dim();
    let (lower_critical, upper_critical) = critical_values(significance_level)?;
    debug!(
        "BCa on {} bootstrap and {} jackknife members, critical values ({:.6}, {:.6}).",
        n_bootstrap,
        jackknife.len_of(Axis(0)),
        lower_critical,
        upper_critical
    );

    let mut intervals = ConfidenceIntervals {
        lower: Array2::zeros((n_components, n_variables)),
        upper: Array2::zeros((n_components, n_variables)),
        lower_indices: Array2::zeros((n_components, n_variables)),
        upper_indices: Array2::zeros((n_components, n_variables)),
        bias_correction: Array2::zeros((n_components, n_variables)),
        acceleration: Array2::zeros((n_components, n_variables)),
        divergences: Vec::new(),
    };

    for component in 0..n_components {
        for variable in 0..n_variables {
            let bootstrap_lane = bootstrap.slice(ndarray::s![.., component, variable]);
            let jackknife_lane = jackknife.slice(ndarray::s![.., component, variable]);
            let z0 = bias_correction(bootstrap_lane, empirical[[component, variable]]);
            let a = acceleration(jackknife_lane);
            intervals.bias_correction[[component, variable]] = z0;
            intervals.acceleration[[component, variable]] = a;

            let sorted = sorted_lane(bootstrap_lane);
            for (bound, z_critical) in [(BoundKind::Lower, lower_critical), (BoundKind::Upper, upper_critical)] {
                let adjusted = adjusted_location(z0, a, z_critical);
                let rank = rank_index(adjusted.location, n_bootstrap);
                let cause = match (adjusted.saturated, rank.clamped) {
                    (Some(cause), _) => Some(cause),
                    (None, true) => Some(DivergenceCause::IndexOutOfRange),
                    (None, false) => None,
                };
                if let Some(cause) = cause {
                    warn!(
                        "BCa {} bound for component {} / variable {} diverged ({:?}); using rank {} of {}.",
                        bound, component, variable, cause, rank.index, n_bootstrap
                    );
                    intervals.divergences.push(QuantileDivergence {
                        component,
                        variable,
                        bound,
                        cause,
                        location: adjusted.location,
                        index: rank.index,
                    });
                }
                let value = sorted[rank.index];
                match bound {
                    BoundKind::Lower => {
                        intervals.lower[[component, variable]] = value;
                        intervals.lower_indices[[component, variable]] = rank.index;
                    }
                    BoundKind::Upper => {
                        intervals.upper[[component, variable]] = value;
                        intervals.upper_indices[[component, variable]] = rank.index;
                    }
                }
            }
        }
    }
    Ok(intervals)
}
