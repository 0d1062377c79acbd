// Tabular records for exporting intervals and resampled data

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::bca::BoundKind;
use crate::error::ConfidenceError;

pub const INDICATOR_HEADER: &str = "indicator";
pub const BOUND_HEADER: &str = "confidence interval bound";

/// Column labels for [`confidence_interval_rows`].
pub fn confidence_interval_header(n_components: usize) -> Vec<String> {
    let mut header = vec![INDICATOR_HEADER.to_string(), BOUND_HEADER.to_string()];
    header.extend((1..=n_components).map(|component| format!("PC {}", component)));
    header
}

/// One variable's bound across every component (wide form).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConfidenceIntervalRow {
    pub indicator: String,
    pub bound: BoundKind,
    /// Indexed by component.
    pub values: Vec<f64>,
}

/// A single bound of a single loading (long form).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConfidenceIntervalRecord {
    pub indicator: String,
    pub bound: BoundKind,
    pub component: usize,
    pub value: f64,
}

/// A resampled observation row tagged with its 1-based sample number.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub sample_number: usize,
    pub values: Vec<f64>,
}

fn check_bounds(
    lower: &ArrayView2<f64>,
    upper: &ArrayView2<f64>,
    identifiers: &[String],
) -> Result<(), ConfidenceError> {
    if lower.dim() != upper.dim() {
        return Err(ConfidenceError::ShapeMismatch {
            context: "upper bound matrix",
            expected: lower.dim(),
            found: upper.dim(),
        });
    }
    if identifiers.len() != lower.ncols() {
        return Err(ConfidenceError::VariableCountMismatch {
            identifiers: identifiers.len(),
            columns: lower.ncols(),
        });
    }
    Ok(())
}

/// Wide-form rows: every variable's lower bound first, then every variable's
/// upper bound, variables in column order.
///
/// `lower` and `upper` are (n_components, n_variables).
pub fn confidence_interval_rows(
    lower: ArrayView2<f64>,
    upper: ArrayView2<f64>,
    identifiers: &[String],
) -> Result<Vec<ConfidenceIntervalRow>, ConfidenceError> {
    check_bounds(&lower, &upper, identifiers)?;
    let mut rows = Vec::with_capacity(2 * identifiers.len());
    for (bound, matrix) in [(BoundKind::Lower, lower.view()), (BoundKind::Upper, upper.view())] {
        for (variable, indicator) in identifiers.iter().enumerate() {
            rows.push(ConfidenceIntervalRow {
                indicator: indicator.clone(),
                bound,
                values: matrix.column(variable).to_vec(),
            });
        }
    }
    Ok(rows)
}

/// Long-form records ordered by bound, then variable, then component.
pub fn confidence_interval_records(
    lower: ArrayView2<f64>,
    upper: ArrayView2<f64>,
    identifiers: &[String],
) -> Result<Vec<ConfidenceIntervalRecord>, ConfidenceError> {
    Ok(confidence_interval_rows(lower, upper, identifiers)?
        .into_iter()
        .flat_map(|row| {
            let ConfidenceIntervalRow { indicator, bound, values } = row;
            values.into_iter().enumerate().map(move |(component, value)| ConfidenceIntervalRecord {
                indicator: indicator.clone(),
                bound,
                component,
                value,
            })
        })
        .collect())
}

/// Every row of every sample, prefixed with the sample's 1-based number.
pub fn flatten_samples<'a, I>(samples: I) -> Vec<SampleRow>
where
    I: IntoIterator<Item = &'a Array2<f64>>,
{
    samples
        .into_iter()
        .enumerate()
        .flat_map(|(index, sample)| {
            sample
                .axis_iter(Axis(0))
                .map(move |row| SampleRow { sample_number: index + 1, values: row.to_vec() })
                .collect::<Vec<_>>()
        })
        .collect()
}
