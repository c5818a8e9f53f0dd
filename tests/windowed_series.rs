mod common;

use approx::assert_abs_diff_eq;
use common::RecordingSink;
use smoother::analysis::SplitPolicy;
use smoother::{
    CoefficientSelector, EngineError, EngineSettings, compute_windowed_series,
    compute_windowed_series_with,
};

fn zigzag(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| (i as f64 * 0.37).sin() * 10.0 + i as f64 * 0.1)
        .collect()
}

#[test]
fn linear_series_reports_slope_intercept_and_sum() {
    let prices: Vec<f64> = (1..=100).map(f64::from).collect();

    let a = compute_windowed_series(&prices, 10, CoefficientSelector::A, 4).unwrap();
    let b = compute_windowed_series(&prices, 10, CoefficientSelector::B, 4).unwrap();
    let ab = compute_windowed_series(&prices, 10, CoefficientSelector::AB, 4).unwrap();

    assert_eq!(a.len(), 90);
    for (i, ((a, b), ab)) in a.iter().zip(&b).zip(&ab).enumerate() {
        // Window for output i covers prices i+1 ..= i+10, so the line is y = x + (i + 1).
        assert_abs_diff_eq!(*a, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(*b, (i + 1) as f64, epsilon = 1e-9);
        assert_abs_diff_eq!(*ab, (i + 2) as f64, epsilon = 1e-9);
    }
}

#[test]
fn output_does_not_depend_on_workers_batch_or_policy() {
    let prices = zigzag(1_000);
    let baseline = compute_windowed_series(&prices, 37, CoefficientSelector::AB, 1).unwrap();

    for workers in [2, 3, 5, 8, 16] {
        for policy in [SplitPolicy::Parity, SplitPolicy::Ceil] {
            let settings = EngineSettings {
                worker_count: workers,
                batch_size: 7,
                split_policy: policy,
            };
            let values = compute_windowed_series_with(
                &prices,
                37,
                CoefficientSelector::AB,
                &settings,
                RecordingSink::default(),
            )
            .unwrap();
            assert_eq!(values, baseline, "workers={} policy={:?}", workers, policy);
        }
    }
}

#[test]
fn progress_reaches_the_number_of_positions() {
    for (workers, batch_size) in [(1, 100), (4, 1), (6, 33), (3, 10_000)] {
        let sink = RecordingSink::default();
        let seen = sink.seen.clone();
        let settings = EngineSettings {
            worker_count: workers,
            batch_size,
            split_policy: SplitPolicy::Parity,
        };

        compute_windowed_series_with(&zigzag(500), 20, CoefficientSelector::A, &settings, sink)
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.finished, Some((480, 480)));
        assert_eq!(seen.label, "LinearRegressionProgress");
        assert!(seen.updates.windows(2).all(|w| w[0].0 <= w[1].0));
        assert!(seen.updates.iter().all(|(done, total)| done <= total));
    }
}

#[test]
fn constant_series_is_degenerate_only_through_the_slope() {
    let prices = vec![4.2; 50];
    let values = compute_windowed_series(&prices, 5, CoefficientSelector::AB, 3).unwrap();
    assert_eq!(values.len(), 45);
    for value in values {
        assert_abs_diff_eq!(value, 4.2, epsilon = 1e-12);
    }
}

#[test]
fn non_finite_price_fails_the_whole_call() {
    let mut prices = zigzag(200);
    prices[150] = f64::NAN;

    let err = compute_windowed_series(&prices, 10, CoefficientSelector::AB, 4).unwrap_err();
    match err {
        EngineError::ChunkCompute { source, .. } => {
            assert!(matches!(
                source.downcast_ref::<EngineError>(),
                Some(EngineError::NonFiniteSample { .. })
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn rejects_windows_outside_the_series() {
    let prices = zigzag(20);
    for window in [0, 1, 20, 21] {
        assert!(matches!(
            compute_windowed_series(&prices, window, CoefficientSelector::A, 2),
            Err(EngineError::InvalidDomain { .. })
        ));
    }
    assert!(matches!(
        compute_windowed_series(&prices, 5, CoefficientSelector::A, 0),
        Err(EngineError::InvalidDomain { .. })
    ));
}
