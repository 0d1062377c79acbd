// One-call orchestration: empirical PCA, ensembles, then BCa intervals

use log::info;
use ndarray::ArrayView2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::alignment::{AlignmentPolicy, Deadline};
use crate::bca::{produce_confidence_intervals, ConfidenceIntervals};
use crate::ensemble::{
    generate_bootstrap_ensemble, generate_jackknife_ensemble, BootstrapEnsemble, JackknifeEnsemble,
    DEFAULT_NUMBER_OF_SAMPLES, MIN_JACKKNIFE_ROWS,
};
use crate::error::ConfidenceError;
use crate::independence::{degrees_of_independence, IndependenceMatrices};
use crate::pca::{apply_pca, validate_observations, PcaResult};
use crate::report::{
    confidence_interval_records, confidence_interval_rows, flatten_samples, ConfidenceIntervalRecord,
    ConfidenceIntervalRow, SampleRow,
};

/// Parameters of a confidence-interval run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConfidenceAnalysisConfig {
    /// Number of aligned bootstrap PCAs (B).
    pub number_of_samples: usize,
    /// Two-sided significance level α; intervals cover 1 − α.
    pub significance_level: f64,
    /// Base seed of the per-member ChaCha8 streams. `None` draws one from the
    /// thread-local generator, so the run is not reproducible.
    pub random_seed: Option<u64>,
    /// Draws allowed per bootstrap member before the run aborts. `None` retries forever.
    pub max_alignment_attempts: Option<usize>,
    /// Best-effort wall-clock budget for the bootstrap stage.
    pub time_budget: Option<Duration>,
}

impl Default for ConfidenceAnalysisConfig {
    fn default() -> Self {
        ConfidenceAnalysisConfig {
            number_of_samples: DEFAULT_NUMBER_OF_SAMPLES,
            significance_level: 0.05,
            random_seed: None,
            max_alignment_attempts: Some(10_000),
            time_budget: None,
        }
    }
}

/// Everything a run produced.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AnalysisOutput {
    pub variable_ids: Vec<String>,
    pub empirical: PcaResult,
    pub bootstrap: BootstrapEnsemble,
    pub jackknife: JackknifeEnsemble,
    pub intervals: ConfidenceIntervals,
    /// Seed the bootstrap streams were derived from.
    pub seed: u64,
}

impl AnalysisOutput {
    pub fn interval_rows(&self) -> Result<Vec<ConfidenceIntervalRow>, ConfidenceError> {
        confidence_interval_rows(self.intervals.lower.view(), self.intervals.upper.view(), &self.variable_ids)
    }

    pub fn interval_records(&self) -> Result<Vec<ConfidenceIntervalRecord>, ConfidenceError> {
        confidence_interval_records(self.intervals.lower.view(), self.intervals.upper.view(), &self.variable_ids)
    }

    pub fn bootstrap_sample_rows(&self) -> Vec<SampleRow> {
        flatten_samples(self.bootstrap.samples())
    }

    pub fn jackknife_sample_rows(&self) -> Vec<SampleRow> {
        flatten_samples(self.jackknife.samples())
    }

    /// Degrees of independence of the empirical loadings.
    pub fn independence(&self) -> Result<IndependenceMatrices, ConfidenceError> {
        degrees_of_independence(self.empirical.eigenvectors.view())
    }
}

/// Runs the full pipeline for one observation matrix.
pub struct ConfidenceAnalysis {
    config: ConfidenceAnalysisConfig,
}

impl ConfidenceAnalysis {
    pub fn new(config: ConfidenceAnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConfidenceAnalysisConfig {
        &self.config
    }

    /// Computes BCa intervals for every loading of `observations`
    /// (rows are observations, columns are variables named by `variable_ids`).
    ///
    /// Configuration errors are reported before any resampling starts.
    pub fn run(
        &self,
        observations: ArrayView2<f64>,
        variable_ids: &[String],
    ) -> Result<AnalysisOutput, ConfidenceError> {
        let config = &self.config;
        let alpha = config.significance_level;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ConfidenceError::InvalidSignificanceLevel(alpha));
        }
        if config.number_of_samples < 2 {
            return Err(ConfidenceError::InvalidEnsembleSize(config.number_of_samples));
        }
        validate_observations(observations)?;
        if observations.nrows() < MIN_JACKKNIFE_ROWS {
            return Err(ConfidenceError::InsufficientRows {
                rows: observations.nrows(),
                required: MIN_JACKKNIFE_ROWS,
            });
        }
        if variable_ids.len() != observations.ncols() {
            return Err(ConfidenceError::VariableCountMismatch {
                identifiers: variable_ids.len(),
                columns: observations.ncols(),
            });
        }

        let overall_start_time = Instant::now();
        let seed = config.random_seed.unwrap_or_else(|| rand::thread_rng().gen());
        info!(
            "Starting BCa analysis: {} observations x {} variables, B = {}, alpha = {}, seed = {}.",
            observations.nrows(),
            observations.ncols(),
            config.number_of_samples,
            alpha,
            seed
        );

        let stage_start_time = Instant::now();
        let empirical = apply_pca(observations)?;
        info!(
            "Empirical PCA of {} variables gave {} components in {:?}.",
            empirical.num_variables(),
            empirical.num_components(),
            stage_start_time.elapsed()
        );

        let policy = AlignmentPolicy {
            max_attempts: config.max_alignment_attempts,
            deadline: config.time_budget.map(Deadline::starting_now),
        };
        let bootstrap = generate_bootstrap_ensemble(
            observations,
            empirical.eigenvectors.view(),
            config.number_of_samples,
            seed,
            &policy,
        )?;
        let jackknife = generate_jackknife_ensemble(observations)?;

        let stage_start_time = Instant::now();
        let intervals = produce_confidence_intervals(
            bootstrap.eigenvector_stack()?.view(),
            jackknife.eigenvector_stack()?.view(),
            empirical.eigenvectors.view(),
            alpha,
        )?;
        info!(
            "BCa intervals computed in {:?} with {} divergent bounds.",
            stage_start_time.elapsed(),
            intervals.divergences.len()
        );
        info!("BCa analysis finished in {:?}.", overall_start_time.elapsed());

        Ok(AnalysisOutput {
            variable_ids: variable_ids.to_vec(),
            empirical,
            bootstrap,
            jackknife,
            intervals,
            seed,
        })
    }
}
