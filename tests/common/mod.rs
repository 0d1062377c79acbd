// Shared fixtures for the integration tests
#![allow(dead_code)]

use ndarray::{arr2, Array2, ArrayView2, Axis};

/// 18 observations of 6 socio-economic indicators.
pub fn indicator_observations() -> Array2<f64> {
    arr2(&[
        [23.44833333, 124.745, 7388.0, 16.9, 22.05333333, 235.5166667],
        [13.971, 141.1563333, 5813.0, 21.0, 28.95666667, 227.61],
        [19.55066667, 128.865, 17387.33333, 35.83333333, 31.02, 456.8366667],
        [22.23266667, 166.1116667, 2678.0, 19.76666667, 53.58333333, 179.0466667],
        [16.79066667, 174.826, 3186.666667, 11.9, 18.45, 327.9333333],
        [15.58633333, 144.378, 4857.666667, 19.56666667, 26.66666667, 241.21],
        [23.15966667, 122.4816667, 3606.0, 17.26666667, 26.27333333, 223.6866667],
        [27.29866667, 106.2463333, 16051.0, 23.16666667, 4.963333333, 389.16],
        [12.92033333, 123.4203333, 4526.0, 30.1, 49.04333333, 236.73],
        [48.67133333, 87.935, 22201.66667, 16.0, 0.333333333, 233.8833333],
        [13.036, 144.3146667, 4847.0, 18.63333333, 18.36666667, 195.5966667],
        [15.44266667, 249.443, 3109.666667, 21.23333333, 13.12, 212.54],
        [11.09133333, 157.6246667, 2833.0, 26.13333333, 19.37, 181.11],
        [16.36666667, 106.1196667, 1132.0, 27.23333333, 3.816666667, 519.9066667],
        [11.40066667, 110.0233333, 5435.666667, 19.76666667, 57.49666667, 203.06],
        [15.81566667, 136.939, 1528.333333, 22.16666667, 19.69, 225.14],
        [13.34166667, 178.6033333, 3400.333333, 15.53333333, 13.67, 261.5933333],
        [13.693, 156.29, 2190.0, 15.36666667, 17.76666667, 416.7166667],
    ])
}

pub fn indicator_codes() -> Vec<String> {
    ["cei_pc020", "cei_pc030", "cei_pc034", "sdg_01_10", "sdg_06_40", "sdg_03_42"]
        .iter()
        .map(|code| code.to_string())
        .collect()
}

/// Row indices of a fixed bootstrap resample of [`indicator_observations`].
pub const FIXED_RESAMPLE_ROWS: [usize; 18] = [13, 7, 10, 0, 7, 13, 5, 2, 14, 13, 12, 13, 1, 11, 0, 15, 2, 17];

pub fn fixed_resample() -> Array2<f64> {
    indicator_observations().select(Axis(0), &FIXED_RESAMPLE_ROWS)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn assert_f64_matrices_are_close(left: ArrayView2<f64>, right: ArrayView2<f64>, tolerance: f64, context: &str) {
    assert_eq!(left.dim(), right.dim(), "Matrix dimensions differ for {}.", context);
    for ((index, a), b) in left.indexed_iter().zip(right.iter()) {
        assert!(
            (a - b).abs() < tolerance,
            "Mismatch at {:?} for {}: {} vs {} (diff: {})",
            index,
            context,
            a,
            b,
            (a - b).abs()
        );
    }
}
