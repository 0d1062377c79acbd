// Bootstrap and jackknife ensembles of PCA loadings

use log::info;
use ndarray::{Array2, Array3, ArrayView2, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::alignment::{bootstrap_and_apply_pca, AlignmentPolicy};
use crate::error::ConfidenceError;
use crate::pca::{apply_pca, validate_observations};
use crate::resampling::{jackknife_samples, RowSampler, UniformRowSampler};

/// Number of bootstrap draws used when none is configured.
pub const DEFAULT_NUMBER_OF_SAMPLES: usize = 2000;

/// Jackknife samples must still hold at least two rows for a PCA.
pub const MIN_JACKKNIFE_ROWS: usize = 3;

/// One accepted bootstrap draw.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BootstrapMember {
    /// The resampled observations. Shape: (n_rows, n_variables)
    pub sample: Array2<f64>,
    /// Loadings aligned and reflected onto the empirical components.
    /// Shape: (n_components, n_variables)
    pub eigenvectors: Array2<f64>,
    /// Draws spent to obtain this member, including the accepted one.
    pub attempts: usize,
}

/// One leave-one-out sample and its raw (unaligned) loadings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JackknifeMember {
    pub omitted_row: usize,
    /// Shape: (n_rows - 1, n_variables)
    pub sample: Array2<f64>,
    /// Shape: (n_components, n_variables)
    pub eigenvectors: Array2<f64>,
}

fn stack_eigenvectors<'a, I>(views: I) -> Result<Array3<f64>, ConfidenceError>
where
    I: Iterator<Item = ArrayView2<'a, f64>>,
{
    let views: Vec<ArrayView2<f64>> = views.collect();
    if views.is_empty() {
        return Ok(Array3::zeros((0, 0, 0)));
    }
    Ok(ndarray::stack(Axis(0), &views)?)
}

/// Ordered collection of aligned bootstrap draws.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BootstrapEnsemble {
    members: Vec<BootstrapMember>,
}

impl BootstrapEnsemble {
    pub fn from_members(members: Vec<BootstrapMember>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[BootstrapMember] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = &Array2<f64>> + '_ {
        self.members.iter().map(|member| &member.sample)
    }

    /// Total draws spent across the ensemble, rejected ones included.
    pub fn total_attempts(&self) -> usize {
        self.members.iter().map(|member| member.attempts).sum()
    }

    /// Aligned loadings stacked as (member, component, variable).
    pub fn eigenvector_stack(&self) -> Result<Array3<f64>, ConfidenceError> {
        stack_eigenvectors(self.members.iter().map(|member| member.eigenvectors.view()))
    }
}

/// The `n` leave-one-out PCAs of an `n`-row matrix, indexed by omitted row.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JackknifeEnsemble {
    members: Vec<JackknifeMember>,
}

impl JackknifeEnsemble {
    pub fn from_members(members: Vec<JackknifeMember>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[JackknifeMember] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = &Array2<f64>> + '_ {
        self.members.iter().map(|member| &member.sample)
    }

    /// Raw loadings stacked as (member, component, variable).
    pub fn eigenvector_stack(&self) -> Result<Array3<f64>, ConfidenceError> {
        stack_eigenvectors(self.members.iter().map(|member| member.eigenvectors.view()))
    }
}

/// Builds the bootstrap ensemble in parallel.
///
/// Member `k` draws from `ChaCha8Rng::seed_from_u64(base_seed)` on stream `k`,
/// so the ensemble depends only on `base_seed`, never on thread scheduling.
/// The first member to exhaust its attempts or hit the deadline aborts the
/// whole ensemble.
pub fn generate_bootstrap_ensemble(
    observations: ArrayView2<f64>,
    empirical_eigenvectors: ArrayView2<f64>,
    number_of_samples: usize,
    base_seed: u64,
    policy: &AlignmentPolicy,
) -> Result<BootstrapEnsemble, ConfidenceError> {
    validate_bootstrap_inputs(observations, empirical_eigenvectors, number_of_samples)?;
    info!(
        "Generating {} aligned bootstrap PCAs on a {}x{} observation matrix.",
        number_of_samples,
        observations.nrows(),
        observations.ncols()
    );
    let start_time = Instant::now();

    let members = (0..number_of_samples)
        .into_par_iter()
        .map(|member_index| {
            let mut rng = ChaCha8Rng::seed_from_u64(base_seed);
            rng.set_stream(member_index as u64);
            let mut sampler = UniformRowSampler::new(rng);
            bootstrap_and_apply_pca(&mut sampler, observations, empirical_eigenvectors, policy)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let ensemble = BootstrapEnsemble::from_members(members);
    info!(
        "Generated bootstrap ensemble in {:?} ({} draws for {} members).",
        start_time.elapsed(),
        ensemble.total_attempts(),
        ensemble.len()
    );
    Ok(ensemble)
}

/// Builds the bootstrap ensemble sequentially from a single caller-owned sampler.
pub fn generate_bootstrap_ensemble_with_sampler<S: RowSampler + ?Sized>(
    sampler: &mut S,
    observations: ArrayView2<f64>,
    empirical_eigenvectors: ArrayView2<f64>,
    number_of_samples: usize,
    policy: &AlignmentPolicy,
) -> Result<BootstrapEnsemble, ConfidenceError> {
    validate_bootstrap_inputs(observations, empirical_eigenvectors, number_of_samples)?;
    let members = (0..number_of_samples)
        .map(|_| bootstrap_and_apply_pca(&mut *sampler, observations, empirical_eigenvectors, policy))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(BootstrapEnsemble::from_members(members))
}

fn validate_bootstrap_inputs(
    observations: ArrayView2<f64>,
    empirical_eigenvectors: ArrayView2<f64>,
    number_of_samples: usize,
) -> Result<(), ConfidenceError> {
    if number_of_samples < 2 {
        return Err(ConfidenceError::InvalidEnsembleSize(number_of_samples));
    }
    validate_observations(observations)?;
    let n_variables = observations.ncols();
    if empirical_eigenvectors.dim() != (n_variables, n_variables) {
        return Err(ConfidenceError::ShapeMismatch {
            context: "empirical eigenvectors",
            expected: (n_variables, n_variables),
            found: empirical_eigenvectors.dim(),
        });
    }
    Ok(())
}

/// Runs the PCA engine on every leave-one-out sample.
///
/// Components are left in their own sorted order and sign convention; they
/// are not aligned to the empirical axes.
pub fn generate_jackknife_ensemble(observations: ArrayView2<f64>) -> Result<JackknifeEnsemble, ConfidenceError> {
    validate_observations(observations)?;
    if observations.nrows() < MIN_JACKKNIFE_ROWS {
        return Err(ConfidenceError::InsufficientRows {
            rows: observations.nrows(),
            required: MIN_JACKKNIFE_ROWS,
        });
    }
    let start_time = Instant::now();

    let members = jackknife_samples(observations)
        .into_par_iter()
        .enumerate()
        .map(|(omitted_row, sample)| {
            let result = apply_pca(sample.view())?;
            Ok(JackknifeMember { omitted_row, sample, eigenvectors: result.eigenvectors })
        })
        .collect::<Result<Vec<_>, ConfidenceError>>()?;

    info!("Computed {} jackknife PCAs in {:?}.", members.len(), start_time.elapsed());
    Ok(JackknifeEnsemble::from_members(members))
}
