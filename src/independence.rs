// Pairwise independence of variables in the plane of the first two components

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::ConfidenceError;

/// Pairwise angles and degrees of independence between variables.
///
/// Only the strict upper triangle (`j > i`) is filled; all other cells are 0.
/// Shape of both matrices: (n_variables, n_variables)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IndependenceMatrices {
    /// Angle in degrees between the PC1/PC2 loading vectors of two variables.
    pub angles: Array2<f64>,
    /// Angle folded into `[0, 90]` and divided by 90. 1 is orthogonal, 0 collinear.
    pub degrees: Array2<f64>,
}

/// Compares every pair of variables through their loadings on the first two
/// components. `eigenvectors` is (n_components, n_variables).
///
/// A variable whose two loadings are both zero has no direction, and its
/// cells are NaN.
pub fn degrees_of_independence(eigenvectors: ArrayView2<f64>) -> Result<IndependenceMatrices, ConfidenceError> {
    let (n_components, n_variables) = eigenvectors.dim();
    if n_components < 2 {
        return Err(ConfidenceError::InsufficientComponents { components: n_components, required: 2 });
    }
    let first = eigenvectors.row(0);
    let second = eigenvectors.row(1);

    let mut angles = Array2::zeros((n_variables, n_variables));
    let mut degrees = Array2::zeros((n_variables, n_variables));
    for i in 0..n_variables {
        let (xi, yi) = (first[i], second[i]);
        let norm_i = xi.hypot(yi);
        for j in (i + 1)..n_variables {
            let (xj, yj) = (first[j], second[j]);
            let cosine = (xi * xj + yi * yj) / (norm_i * xj.hypot(yj));
            // NaN passes through clamp unchanged
            let angle = cosine.clamp(-1.0, 1.0).acos().to_degrees();
            let folded = if angle > 90.0 { 180.0 - angle } else { angle };
            angles[[i, j]] = angle;
            degrees[[i, j]] = folded / 90.0;
        }
    }
    Ok(IndependenceMatrices { angles, degrees })
}
