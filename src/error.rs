use std::time::Duration;
use thiserror::Error;

/// Every failure the confidence-interval pipeline can report.
///
/// Structural problems with the input (degenerate columns, too few rows)
/// abort a run immediately. Problems local to a single bootstrap draw are
/// retried inside the alignment loop and only surface here once the
/// configured attempt cap or time budget is used up.
#[derive(Error, Debug)]
pub enum ConfidenceError {
    #[error("Column {column} has zero variance and cannot be standardized.")]
    DegenerateColumn { column: usize },

    #[error("Observation matrix has a missing or non-finite value at row {row}, column {column}.")]
    MissingValue { row: usize, column: usize },

    #[error("At least {required} observations are required, but only {rows} were provided.")]
    InsufficientRows { rows: usize, required: usize },

    #[error("At least {required} variables are required, but only {columns} were provided.")]
    InsufficientColumns { columns: usize, required: usize },

    #[error("At least {required} principal components are required, but only {components} were provided.")]
    InsufficientComponents { components: usize, required: usize },

    #[error("At least {required} jackknife samples are required to estimate skewness, found {found}.")]
    InsufficientJackknifeSamples { found: usize, required: usize },

    #[error("At least {required} bootstrap samples are required, found {found}.")]
    InsufficientBootstrapSamples { found: usize, required: usize },

    #[error("Shape mismatch for {context}: expected {expected:?}, found {found:?}.")]
    ShapeMismatch {
        context: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("{identifiers} variable identifiers were given for {columns} columns.")]
    VariableCountMismatch { identifiers: usize, columns: usize },

    #[error("Significance level must lie strictly between 0 and 1, got {0}.")]
    InvalidSignificanceLevel(f64),

    #[error("Bootstrap ensemble size must be at least 2, got {0}.")]
    InvalidEnsembleSize(usize),

    #[error("Non-finite loading found in the {context}.")]
    NonFiniteEnsembleValue { context: &'static str },

    #[error("No valid principal axis alignment found after {attempts} bootstrap draws.")]
    AlignmentRetryExhausted { attempts: usize },

    #[error("Bootstrap time budget exceeded after {elapsed:?}.")]
    DeadlineExceeded { elapsed: Duration },

    #[error("Eigendecomposition of the correlation matrix failed: {0}")]
    Eigendecomposition(String),

    #[error("Failed to assemble ensemble arrays: {0}")]
    Shape(#[from] ndarray::ShapeError),
}
