// Bootstrap confidence intervals for principal component loadings

#![doc = include_str!("../README.md")]

pub mod alignment;
pub mod analysis;
pub mod bca;
pub mod ensemble;
pub mod error;
pub mod independence;
pub mod linalg_backends;
pub mod pca;
pub mod report;
pub mod resampling;

pub use alignment::{bootstrap_and_apply_pca, AlignmentPolicy, Deadline};
pub use analysis::{AnalysisOutput, ConfidenceAnalysis, ConfidenceAnalysisConfig};
pub use bca::{produce_confidence_intervals, BoundKind, ConfidenceIntervals, QuantileDivergence};
pub use ensemble::{generate_bootstrap_ensemble, generate_jackknife_ensemble, BootstrapEnsemble, JackknifeEnsemble};
pub use error::ConfidenceError;
pub use pca::{apply_pca, PcaResult};
