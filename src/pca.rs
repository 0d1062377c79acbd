// Correlation-matrix principal component analysis

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::ConfidenceError;
use crate::linalg_backends::{BackendEigh, EighOutput, LinAlgBackendProvider};

/// Minimum number of observations and of variables the engine accepts.
pub const MIN_PCA_ROWS: usize = 2;
pub const MIN_PCA_COLUMNS: usize = 2;

/// Result of a correlation-matrix PCA.
///
/// Components are sorted by decreasing eigenvalue magnitude and every
/// loading vector carries the deterministic sign convention applied by
/// [`canonicalize_signs`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PcaResult {
    /// Absolute eigenvalues, sorted descending.
    /// Shape: (n_components)
    pub eigenvalues: Array1<f64>,
    /// Loading vectors, one principal component per row.
    /// Shape: (n_components, n_variables)
    pub eigenvectors: Array2<f64>,
    /// Eigenvalue divided by the sum of all (signed) eigenvalues.
    /// Shape: (n_components)
    pub explained_variance: Array1<f64>,
}

impl PcaResult {
    pub fn num_components(&self) -> usize {
        self.eigenvectors.nrows()
    }

    pub fn num_variables(&self) -> usize {
        self.eigenvectors.ncols()
    }
}

/// Checks the shape and completeness requirements shared by every PCA input.
pub fn validate_observations(observations: ArrayView2<f64>) -> Result<(), ConfidenceError> {
    let (n_rows, n_columns) = observations.dim();
    if n_rows < MIN_PCA_ROWS {
        return Err(ConfidenceError::InsufficientRows { rows: n_rows, required: MIN_PCA_ROWS });
    }
    if n_columns < MIN_PCA_COLUMNS {
        return Err(ConfidenceError::InsufficientColumns { columns: n_columns, required: MIN_PCA_COLUMNS });
    }
    if let Some(((row, column), _)) = observations.indexed_iter().find(|(_, value)| !value.is_finite()) {
        return Err(ConfidenceError::MissingValue { row, column });
    }
    Ok(())
}

/// Column-wise z-score standardization on a copy of `observations`.
///
/// Uses the population standard deviation. A column whose values are all
/// identical has no variance to divide by and is rejected.
pub fn standardize(observations: ArrayView2<f64>) -> Result<Array2<f64>, ConfidenceError> {
    if observations.nrows() == 0 {
        return Err(ConfidenceError::InsufficientRows { rows: 0, required: MIN_PCA_ROWS });
    }
    let mut standardized = observations.to_owned();
    for (column_index, mut column) in standardized.axis_iter_mut(Axis(1)).enumerate() {
        let first = column[0];
        if column.iter().all(|&value| value == first) {
            return Err(ConfidenceError::DegenerateColumn { column: column_index });
        }
        let mean = column.mean().ok_or(ConfidenceError::DegenerateColumn { column: column_index })?;
        let std_dev = column.std(0.0);
        if !(std_dev.is_finite() && std_dev > 0.0) {
            return Err(ConfidenceError::DegenerateColumn { column: column_index });
        }
        column.mapv_inplace(|value| (value - mean) / std_dev);
    }
    Ok(standardized)
}

/// Pearson correlation matrix between the columns of standardized data.
///
/// The diagonal is renormalized so it is exactly one.
pub fn correlation_matrix(standardized: ArrayView2<f64>) -> Array2<f64> {
    let n_rows = standardized.nrows() as f64;
    let mut correlation = standardized.t().dot(&standardized) / n_rows;
    let scale = correlation.diag().mapv(f64::sqrt);
    for ((i, j), value) in correlation.indexed_iter_mut() {
        *value /= scale[i] * scale[j];
    }
    correlation
}

/// Forces the largest-magnitude loading of every eigenvector (column) to be positive.
///
/// When several loadings share the largest magnitude the first one decides.
pub fn canonicalize_signs(eigenvectors: &mut Array2<f64>) {
    for mut column in eigenvectors.axis_iter_mut(Axis(1)) {
        let mut pivot = 0;
        for (index, value) in column.iter().enumerate() {
            if value.abs() > column[pivot].abs() {
                pivot = index;
            }
        }
        if column.len() > 0 && column[pivot] < 0.0 {
            column.mapv_inplace(|value| -value);
        }
    }
}

/// Runs the PCA engine with the backend selected at compile time.
pub fn apply_pca(observations: ArrayView2<f64>) -> Result<PcaResult, ConfidenceError> {
    apply_pca_with(&LinAlgBackendProvider::new(), observations)
}

/// Runs the PCA engine on an explicit eigensolver backend.
///
/// Standardizes a copy of the data, decomposes its correlation matrix,
/// canonicalizes eigenvector signs, then sorts components by decreasing
/// `|eigenvalue|`. The sort is stable, so components with equal magnitude
/// keep the solver's ascending order.
pub fn apply_pca_with<B: BackendEigh>(
    backend: &B,
    observations: ArrayView2<f64>,
) -> Result<PcaResult, ConfidenceError> {
    validate_observations(observations)?;
    let standardized = standardize(observations)?;
    let correlation = correlation_matrix(standardized.view());

    let EighOutput { eigenvalues, mut eigenvectors } = backend.eigh_upper(&correlation)?;
    canonicalize_signs(&mut eigenvectors);

    let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
    order.sort_by(|&a, &b| {
        eigenvalues[b]
            .abs()
            .partial_cmp(&eigenvalues[a].abs())
            .unwrap_or(Ordering::Equal)
    });

    let sorted_eigenvalues: Array1<f64> = order.iter().map(|&i| eigenvalues[i].abs()).collect();
    let sorted_eigenvectors = eigenvectors.t().select(Axis(0), &order);
    let eigenvalue_total = eigenvalues.sum();
    let explained_variance = sorted_eigenvalues.mapv(|value| value / eigenvalue_total);

    Ok(PcaResult {
        eigenvalues: sorted_eigenvalues,
        eigenvectors: sorted_eigenvectors,
        explained_variance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_observations(n_rows: usize, n_columns: usize, seed: u64) -> Array2<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut data = Array2::from_shape_fn((n_rows, n_columns), |_| rng.gen_range(-5.0..5.0));
        // correlate the first two columns so the spectrum is not flat
        for mut row in data.axis_iter_mut(Axis(0)) {
            row[1] += 2.0 * row[0];
        }
        data
    }

    #[test]
    fn standardized_columns_have_zero_mean_and_unit_variance() {
        let data = random_observations(25, 4, 7);
        let standardized = standardize(data.view()).unwrap();
        for column in standardized.axis_iter(Axis(1)) {
            assert_abs_diff_eq!(column.mean().unwrap(), 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(column.std(0.0), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn constant_column_is_degenerate() {
        let data = array![[1.0, 3.0, 2.0], [2.0, 3.0, 5.0], [4.0, 3.0, 1.0]];
        let err = apply_pca(data.view()).unwrap_err();
        assert!(matches!(err, ConfidenceError::DegenerateColumn { column: 1 }));
    }

    #[test]
    fn rejects_too_few_rows_and_columns() {
        let one_row = array![[1.0, 2.0, 3.0]];
        assert!(matches!(
            apply_pca(one_row.view()).unwrap_err(),
            ConfidenceError::InsufficientRows { rows: 1, required: 2 }
        ));
        let one_column = array![[1.0], [2.0], [3.0]];
        assert!(matches!(
            apply_pca(one_column.view()).unwrap_err(),
            ConfidenceError::InsufficientColumns { columns: 1, required: 2 }
        ));
    }

    #[test]
    fn standardize_rejects_empty_matrix() {
        let empty = Array2::<f64>::zeros((0, 3));
        assert!(matches!(
            standardize(empty.view()),
            Err(ConfidenceError::InsufficientRows { rows: 0, required: 2 })
        ));
    }

    #[test]
    fn rejects_missing_values() {
        let data = array![[1.0, 2.0], [f64::NAN, 3.0], [2.0, 7.0]];
        assert!(matches!(
            apply_pca(data.view()).unwrap_err(),
            ConfidenceError::MissingValue { row: 1, column: 0 }
        ));
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal() {
        let data = random_observations(30, 5, 11);
        let correlation = correlation_matrix(standardize(data.view()).unwrap().view());
        for i in 0..5 {
            assert_abs_diff_eq!(correlation[[i, i]], 1.0, epsilon = 1e-15);
            for j in 0..5 {
                assert_abs_diff_eq!(correlation[[i, j]], correlation[[j, i]], epsilon = 1e-12);
                assert!(correlation[[i, j]].abs() <= 1.0 + 1e-12);
            }
        }
    }

    #[test]
    fn canonicalize_signs_makes_largest_loading_positive() {
        let mut vectors = array![[0.2, 0.9], [-0.8, 0.1], [0.1, -0.3]];
        canonicalize_signs(&mut vectors);
        assert_eq!(vectors.column(0).to_vec(), vec![-0.2, 0.8, -0.1]);
        assert_eq!(vectors.column(1).to_vec(), vec![0.9, 0.1, -0.3]);
    }

    #[test]
    fn pca_is_deterministic_and_canonical() {
        let data = random_observations(40, 5, 3);
        let first = apply_pca(data.view()).unwrap();
        let second = apply_pca(data.view()).unwrap();
        assert_eq!(first, second);

        assert_eq!((first.num_components(), first.num_variables()), (5, 5));
        for component in first.eigenvectors.axis_iter(Axis(0)) {
            let largest = component
                .iter()
                .copied()
                .fold(0.0_f64, |best, value| if value.abs() > best.abs() { value } else { best });
            assert!(largest > 0.0);
            assert_abs_diff_eq!(component.dot(&component), 1.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn eigenvalues_are_sorted_and_explained_variance_sums_to_one() {
        for seed in 0..5 {
            let data = random_observations(20 + seed as usize, 4, seed);
            let result = apply_pca(data.view()).unwrap();
            for pair in result.eigenvalues.windows(2) {
                assert!(pair[0] >= pair[1]);
            }
            assert_abs_diff_eq!(result.explained_variance.sum(), 1.0, epsilon = 1e-10);
            // trace of a correlation matrix equals the number of variables
            assert_abs_diff_eq!(result.eigenvalues.sum(), 4.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn input_matrix_is_not_modified() {
        let data = random_observations(10, 3, 5);
        let copy = data.clone();
        let _ = apply_pca(data.view()).unwrap();
        assert_eq!(data, copy);
    }
}
