use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::{Array2, Axis};
use ndarray_rand::RandomExt;
use pca_confidence::alignment::AlignmentPolicy;
use pca_confidence::bca::produce_confidence_intervals;
use pca_confidence::ensemble::{generate_bootstrap_ensemble, generate_jackknife_ensemble};
use pca_confidence::pca::apply_pca;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;

/// Gaussian observations with a few correlated column pairs, seeded for reproducibility.
fn generate_observations(n_rows: usize, n_columns: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let distribution = Normal::new(0.0, 1.0).unwrap();
    let mut data = Array2::random_using((n_rows, n_columns), distribution, &mut rng);
    for mut row in data.axis_iter_mut(Axis(0)) {
        for column in (1..n_columns).step_by(2) {
            row[column] += 0.8 * row[column - 1];
        }
    }
    data
}

fn benchmark_pca(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_pca");
    for &(n_rows, n_columns) in &[(18, 6), (100, 20), (500, 50)] {
        let data = generate_observations(n_rows, n_columns, 42);
        group.throughput(Throughput::Elements((n_rows * n_columns) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", n_rows, n_columns)),
            &data,
            |b, data| b.iter(|| apply_pca(data.view()).unwrap()),
        );
    }
    group.finish();
}

fn benchmark_ensembles(c: &mut Criterion) {
    let mut group = c.benchmark_group("ensembles");
    group.sample_size(10);
    let data = generate_observations(60, 8, 7);
    let empirical = apply_pca(data.view()).unwrap().eigenvectors;
    let policy = AlignmentPolicy::with_max_attempts(10_000);
    for &number_of_samples in &[200usize, 1000] {
        group.bench_with_input(
            BenchmarkId::new("bootstrap", number_of_samples),
            &number_of_samples,
            |b, &n| b.iter(|| generate_bootstrap_ensemble(data.view(), empirical.view(), n, 3, &policy).unwrap()),
        );
    }
    group.bench_function("jackknife", |b| b.iter(|| generate_jackknife_ensemble(data.view()).unwrap()));
    group.finish();
}

fn benchmark_bca(c: &mut Criterion) {
    let data = generate_observations(60, 8, 11);
    let empirical = apply_pca(data.view()).unwrap().eigenvectors;
    let bootstrap = generate_bootstrap_ensemble(
        data.view(),
        empirical.view(),
        2000,
        5,
        &AlignmentPolicy::with_max_attempts(10_000),
    )
    .unwrap()
    .eigenvector_stack()
    .unwrap();
    let jackknife = generate_jackknife_ensemble(data.view()).unwrap().eigenvector_stack().unwrap();
    c.bench_function("produce_confidence_intervals/2000x8x8", |b| {
        b.iter(|| produce_confidence_intervals(bootstrap.view(), jackknife.view(), empirical.view(), 0.05).unwrap())
    });
}

criterion_group!(benches, benchmark_pca, benchmark_ensembles, benchmark_bca);
criterion_main!(benches);
