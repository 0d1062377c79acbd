// src/linalg_backends.rs

use ndarray::{Array1, Array2};
use std::marker::PhantomData;

use crate::error::ConfidenceError;

/// Output of a symmetric eigendecomposition.
#[derive(Debug)]
pub struct EighOutput {
    /// Eigenvalues, in ascending order as returned by the solver.
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors as columns of the matrix.
    /// eigenvectors.column(i) corresponds to eigenvalues[i].
    pub eigenvectors: Array2<f64>,
}

/// Symmetric eigendecomposition (LAPACK's DSYEVD family).
/// Implementers read the upper triangle of `matrix`.
pub trait BackendEigh {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, ConfidenceError>;
}

/// Dispatches to the backend selected by cargo features.
#[derive(Debug, Default, Copy, Clone)]
pub struct LinAlgBackendProvider {
    _phantom: PhantomData<f64>,
}

impl LinAlgBackendProvider {
    pub fn new() -> Self {
        Self { _phantom: PhantomData }
    }
}

fn require_square(matrix: &Array2<f64>) -> Result<(), ConfidenceError> {
    if matrix.nrows() != matrix.ncols() {
        return Err(ConfidenceError::ShapeMismatch {
            context: "eigendecomposition input",
            expected: (matrix.nrows(), matrix.nrows()),
            found: matrix.dim(),
        });
    }
    Ok(())
}

// --- ndarray-linalg (LAPACK) backend ---
use ndarray_linalg::{Eigh as NdLinalgEigh, UPLO};

#[derive(Debug, Default, Copy, Clone)]
pub struct NdarrayLinAlgBackend;

impl BackendEigh for NdarrayLinAlgBackend {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, ConfidenceError> {
        require_square(matrix)?;
        let (eigenvalues, eigenvectors) = matrix
            .eigh(UPLO::Upper)
            .map_err(|e| ConfidenceError::Eigendecomposition(e.to_string()))?;
        Ok(EighOutput { eigenvalues, eigenvectors })
    }
}

// --- faer backend ---
#[cfg(feature = "backend_faer")]
mod faer_specific_code {
    use super::{require_square, BackendEigh, EighOutput};
    use crate::error::ConfidenceError;
    use ndarray::{Array1, Array2};

    #[derive(Debug, Default, Copy, Clone)]
    pub struct FaerLinAlgBackend;

    impl BackendEigh for FaerLinAlgBackend {
        fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, ConfidenceError> {
            require_square(matrix)?;
            let n = matrix.nrows();
            if n == 0 {
                return Ok(EighOutput { eigenvalues: Array1::zeros(0), eigenvectors: Array2::zeros((0, 0)) });
            }
            // Owned copy so faer never depends on the ndarray memory layout.
            let faer_mat = faer::Mat::<f64>::from_fn(n, n, |i, j| matrix[[i, j]]);
            let eig = faer_mat
                .as_ref()
                .self_adjoint_eigen(faer::Side::Upper)
                .map_err(|e| ConfidenceError::Eigendecomposition(format!("faer: {:?}", e)))?;
            let values = eig.S().column_vector();
            let vectors = eig.U();
            Ok(EighOutput {
                eigenvalues: Array1::from_shape_fn(n, |i| values[i]),
                eigenvectors: Array2::from_shape_fn((n, n), |(i, j)| vectors[(i, j)]),
            })
        }
    }
}

impl BackendEigh for LinAlgBackendProvider {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, ConfidenceError> {
        #[cfg(feature = "backend_faer")]
        {
            faer_specific_code::FaerLinAlgBackend.eigh_upper(matrix)
        }
        #[cfg(not(feature = "backend_faer"))]
        {
            NdarrayLinAlgBackend.eigh_upper(matrix)
        }
    }
}
