// Principal axis correspondence between a bootstrap PCA and the empirical PCA

use log::{debug, trace};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use std::time::{Duration, Instant};

use crate::ensemble::BootstrapMember;
use crate::error::ConfidenceError;
use crate::linalg_backends::{BackendEigh, LinAlgBackendProvider};
use crate::pca::apply_pca_with;
use crate::resampling::RowSampler;

/// Pearson correlation between two loading vectors.
///
/// Returns NaN when either vector has no spread.
pub fn pearson_correlation(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.sum() / n;
    let mean_b = b.sum() / n;
    let mut covariance = 0.0;
    let mut variance_a = 0.0;
    let mut variance_b = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        covariance += dx * dy;
        variance_a += dx * dx;
        variance_b += dy * dy;
    }
    covariance / (variance_a * variance_b).sqrt()
}

/// Correlation-alignment matrix: entry `[i, j]` is the Pearson correlation
/// between empirical component `i` and candidate component `j`.
///
/// Both inputs are component-major (components × variables).
pub fn correlation_matrix_between_pcas(
    empirical: ArrayView2<f64>,
    candidate: ArrayView2<f64>,
) -> Result<Array2<f64>, ConfidenceError> {
    if empirical.dim() != candidate.dim() {
        return Err(ConfidenceError::ShapeMismatch {
            context: "candidate eigenvectors",
            expected: empirical.dim(),
            found: candidate.dim(),
        });
    }
    let n_components = empirical.nrows();
    Ok(Array2::from_shape_fn((n_components, n_components), |(i, j)| {
        pearson_correlation(empirical.row(i), candidate.row(j))
    }))
}

/// For every empirical component (row) picks the candidate component (column)
/// with the largest absolute correlation.
///
/// Returns `None` when two empirical components pick the same candidate, or
/// when a row has no finite correlation at all. Ties within a row go to the
/// lowest column index.
pub fn best_matching_components(correlation: ArrayView2<f64>) -> Option<Vec<usize>> {
    let n_candidates = correlation.ncols();
    let mut taken = vec![false; n_candidates];
    let mut matches = Vec::with_capacity(correlation.nrows());
    for row in correlation.axis_iter(Axis(0)) {
        let mut best: Option<(usize, f64)> = None;
        for (j, value) in row.iter().enumerate() {
            let magnitude = value.abs();
            if !magnitude.is_finite() {
                continue;
            }
            match best {
                Some((_, best_magnitude)) if magnitude <= best_magnitude => {}
                _ => best = Some((j, magnitude)),
            }
        }
        let (column, _) = best?;
        if taken[column] {
            return None;
        }
        taken[column] = true;
        matches.push(column);
    }
    Some(matches)
}

/// Candidate eigenvectors permuted and reflected onto the empirical axes.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentAlignment {
    /// `permutation[i]` is the candidate component matched with empirical component `i`.
    pub permutation: Vec<usize>,
    /// Signed correlation of each matched pair, before reflection.
    pub matched_correlations: Array1<f64>,
    /// Aligned loadings, row `i` corresponding to empirical component `i`.
    /// Shape: (n_components, n_variables)
    pub eigenvectors: Array2<f64>,
}

/// Reorders candidate rows by `permutation` and flips every component whose
/// matched correlation is negative. Pure: returns new matrices.
pub fn reorder_and_reflect(
    candidate: ArrayView2<f64>,
    correlation: ArrayView2<f64>,
    permutation: &[usize],
) -> ComponentAlignment {
    let reordered_correlation = correlation.select(Axis(1), permutation);
    let matched_correlations = reordered_correlation.diag().to_owned();
    let mut eigenvectors = candidate.select(Axis(0), permutation);
    for (component, mut loadings) in eigenvectors.axis_iter_mut(Axis(0)).enumerate() {
        if matched_correlations[component] < 0.0 {
            loadings.mapv_inplace(|value| -value);
        }
    }
    ComponentAlignment {
        permutation: permutation.to_vec(),
        matched_correlations,
        eigenvectors,
    }
}

/// Aligns `candidate` onto `empirical`, or returns `Ok(None)` when the best
/// matches do not form a permutation.
pub fn align_components(
    empirical: ArrayView2<f64>,
    candidate: ArrayView2<f64>,
) -> Result<Option<ComponentAlignment>, ConfidenceError> {
    let correlation = correlation_matrix_between_pcas(empirical, candidate)?;
    Ok(best_matching_components(correlation.view())
        .map(|permutation| reorder_and_reflect(candidate, correlation.view(), &permutation)))
}

/// Wall-clock budget measured from the moment it is created.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn starting_now(budget: Duration) -> Self {
        Self { started: Instant::now(), budget }
    }

    pub fn check(&self) -> Result<(), ConfidenceError> {
        let elapsed = self.started.elapsed();
        if elapsed >= self.budget {
            return Err(ConfidenceError::DeadlineExceeded { elapsed });
        }
        Ok(())
    }
}

/// Bounds on the draw-until-aligned loop.
///
/// `max_attempts: None` retries without limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignmentPolicy {
    pub max_attempts: Option<usize>,
    pub deadline: Option<Deadline>,
}

impl AlignmentPolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(max_attempts: usize) -> Self {
        Self { max_attempts: Some(max_attempts), deadline: None }
    }
}

/// Why a bootstrap draw was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// A resampled column had zero variance.
    DegenerateSample,
    /// Two empirical components matched the same bootstrap component.
    ComponentCollision,
}

enum DrawState {
    Draw,
    Align { sample: Array2<f64>, candidate: Array2<f64> },
    Validate { sample: Array2<f64>, candidate: Array2<f64>, correlation: Array2<f64> },
    Accept(BootstrapMember),
    Reject(RejectReason),
}

/// Draws bootstrap samples until one yields a PCA whose axes map one-to-one
/// onto the empirical axes, then returns that sample with its aligned,
/// sign-corrected eigenvectors.
pub fn bootstrap_and_apply_pca<S: RowSampler + ?Sized>(
    sampler: &mut S,
    observations: ArrayView2<f64>,
    empirical_eigenvectors: ArrayView2<f64>,
    policy: &AlignmentPolicy,
) -> Result<BootstrapMember, ConfidenceError> {
    bootstrap_and_apply_pca_with(
        &LinAlgBackendProvider::new(),
        sampler,
        observations,
        empirical_eigenvectors,
        policy,
    )
}

pub fn bootstrap_and_apply_pca_with<B: BackendEigh, S: RowSampler + ?Sized>(
    backend: &B,
    sampler: &mut S,
    observations: ArrayView2<f64>,
    empirical_eigenvectors: ArrayView2<f64>,
    policy: &AlignmentPolicy,
) -> Result<BootstrapMember, ConfidenceError> {
    let mut attempts = 0usize;
    let mut state = DrawState::Draw;
    loop {
        state = match state {
            DrawState::Draw => {
                if policy.max_attempts.is_some_and(|limit| attempts >= limit) {
                    return Err(ConfidenceError::AlignmentRetryExhausted { attempts });
                }
                if let Some(deadline) = &policy.deadline {
                    deadline.check()?;
                }
                attempts += 1;
                let sample = sampler.draw(observations);
                match apply_pca_with(backend, sample.view()) {
                    Ok(result) => DrawState::Align { sample, candidate: result.eigenvectors },
                    Err(ConfidenceError::DegenerateColumn { .. }) => {
                        DrawState::Reject(RejectReason::DegenerateSample)
                    }
                    Err(other) => return Err(other),
                }
            }
            DrawState::Align { sample, candidate } => {
                let correlation =
                    correlation_matrix_between_pcas(empirical_eigenvectors, candidate.view())?;
                DrawState::Validate { sample, candidate, correlation }
            }
            DrawState::Validate { sample, candidate, correlation } => {
                match best_matching_components(correlation.view()) {
                    Some(permutation) => {
                        let alignment =
                            reorder_and_reflect(candidate.view(), correlation.view(), &permutation);
                        DrawState::Accept(BootstrapMember {
                            sample,
                            eigenvectors: alignment.eigenvectors,
                            attempts,
                        })
                    }
                    None => DrawState::Reject(RejectReason::ComponentCollision),
                }
            }
            DrawState::Accept(member) => {
                trace!("Accepted bootstrap draw after {} attempt(s).", member.attempts);
                return Ok(member);
            }
            DrawState::Reject(reason) => {
                debug!("Rejected bootstrap draw {} ({:?}); redrawing.", attempts, reason);
                DrawState::Draw
            }
        };
    }
}
