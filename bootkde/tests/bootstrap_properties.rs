//! Property and scenario tests for the bootstrap ensemble
//!
//! These tests exercise the public API end to end: resampling, member
//! construction and aggregation.

use approx::assert_relative_eq;
use bootkde::{BootstrapKde, KdeConfig, KdeError, SampleSet, bootstrap_indices};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

fn draw_normal(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    normal.sample_iter(&mut rng).take(n).collect()
}

#[test]
fn test_ensemble_size_and_index_ranges() {
    for &(n, niter) in &[(7usize, 3usize), (12, 1), (40, 12)] {
        let data = draw_normal(n, n as u64);
        let samples = SampleSet::from_slice(&data).unwrap();
        let ensemble: BootstrapKde =
            BootstrapKde::with_seed(samples, niter, None, &KdeConfig::default(), 17).unwrap();

        assert_eq!(ensemble.niter(), niter);
        assert_eq!(ensemble.members().len(), niter);
        assert_eq!(ensemble.bootstrap_indices().len(), niter);
        for indices in ensemble.bootstrap_indices() {
            assert_eq!(indices.len(), n);
            assert!(indices.iter().all(|&i| i < n));
        }
        for member in ensemble.members() {
            assert_eq!(member.n_samples(), n);
        }
    }
}

#[test]
fn test_members_hold_their_resamples() {
    let data: Vec<f64> = (0..20).map(|i| i as f64 * 0.5).collect();
    let samples = SampleSet::from_slice(&data).unwrap();
    let ensemble: BootstrapKde =
        BootstrapKde::with_seed(samples, 5, None, &KdeConfig::default(), 3).unwrap();

    for (member, indices) in ensemble.members().iter().zip(ensemble.bootstrap_indices()) {
        let expected: Vec<f64> = indices.iter().map(|&i| data[i]).collect();
        assert_eq!(member.samples().view().row(0).to_vec(), expected);
    }
}

#[test]
fn test_non_adaptive_members_have_unit_lambdas() {
    let samples = SampleSet::from_slice(&draw_normal(30, 8)).unwrap();
    let ensemble: BootstrapKde =
        BootstrapKde::with_seed(samples, 4, None, &KdeConfig::default(), 8).unwrap();
    for member in ensemble.members() {
        assert_eq!(member.lambdas(), vec![1.0; 30].as_slice());
    }
}

#[test]
fn test_adaptive_zero_alpha_members_have_unit_lambdas() {
    let samples = SampleSet::from_slice(&draw_normal(30, 8)).unwrap();
    let config = KdeConfig {
        adaptive: true,
        alpha: 0.0,
        ..Default::default()
    };
    let ensemble: BootstrapKde = BootstrapKde::with_seed(samples, 4, None, &config, 8).unwrap();
    for member in ensemble.members() {
        assert!(member.lambdas().iter().all(|&l| l == 1.0));
    }
}

#[test]
fn test_same_seed_same_ensemble() {
    let data = draw_normal(60, 21);
    let config = KdeConfig {
        adaptive: true,
        ..Default::default()
    };
    let query = [-2.0, -0.5, 0.0, 1.0, 2.5];

    let a: BootstrapKde =
        BootstrapKde::with_seed(SampleSet::from_slice(&data).unwrap(), 15, None, &config, 1234)
            .unwrap();
    let b: BootstrapKde =
        BootstrapKde::with_seed(SampleSet::from_slice(&data).unwrap(), 15, None, &config, 1234)
            .unwrap();

    assert_eq!(a.bootstrap_indices(), b.bootstrap_indices());
    assert_eq!(a.evaluate(&query).unwrap(), b.evaluate(&query).unwrap());

    let c: BootstrapKde =
        BootstrapKde::with_seed(SampleSet::from_slice(&data).unwrap(), 15, None, &config, 4321)
            .unwrap();
    assert_ne!(a.bootstrap_indices(), c.bootstrap_indices());
}

#[test]
fn test_unit_weights_match_unweighted() {
    let data = draw_normal(50, 5);
    let config = KdeConfig::default();
    let query = [-3.0, -1.0, 0.0, 0.5, 2.0];

    let unweighted: BootstrapKde =
        BootstrapKde::with_seed(SampleSet::from_slice(&data).unwrap(), 10, None, &config, 77)
            .unwrap();
    let weighted: BootstrapKde = BootstrapKde::with_seed(
        SampleSet::from_slice(&data).unwrap(),
        10,
        Some(vec![1.0; 50]),
        &config,
        77,
    )
    .unwrap();

    assert!(weighted.is_weighted());
    assert!(!unweighted.is_weighted());
    assert_eq!(unweighted.bootstrap_indices(), weighted.bootstrap_indices());

    let a = unweighted.evaluate(&query).unwrap();
    let b = weighted.evaluate(&query).unwrap();
    for (x, y) in a.mean.iter().zip(&b.mean) {
        assert_relative_eq!(*x, *y, max_relative = 1e-9);
    }
}

#[test]
fn test_standard_normal_scenario() {
    let samples = SampleSet::from_slice(&draw_normal(100, 2024)).unwrap();
    let config = KdeConfig {
        adaptive: false,
        ..Default::default()
    };
    let ensemble: BootstrapKde = BootstrapKde::with_seed(samples, 50, None, &config, 9).unwrap();

    let (mean, stderr) = ensemble.evaluate(&[-3.0, 0.0, 3.0]).unwrap().into_parts();
    assert_eq!(mean.len(), 3);
    assert!(mean[1] > mean[0]);
    assert!(mean[1] > mean[2]);
    assert!(stderr.iter().all(|&e| e > 0.0));
    // The true density at 0 is ~0.399
    assert!(mean[1] > 0.2 && mean[1] < 0.6);
}

#[test]
fn test_single_iteration_has_no_spread() {
    let samples = SampleSet::from_slice(&draw_normal(25, 6)).unwrap();
    let ensemble: BootstrapKde =
        BootstrapKde::with_seed(samples, 1, None, &KdeConfig::default(), 6).unwrap();
    let query = [-1.0, 0.0, 1.0];

    let estimate = ensemble.evaluate(&query).unwrap();
    let member = ensemble.members()[0].evaluate(&query).unwrap();
    assert_eq!(estimate.stderr, vec![0.0; 3]);
    assert_eq!(estimate.mean, member);
}

#[test]
fn test_index_sets_for_a_single_sample() {
    let mut rng = StdRng::seed_from_u64(2);
    for _ in 0..4 {
        assert_eq!(bootstrap_indices(1, &mut rng), vec![0]);
    }
}

#[test]
fn test_single_sample_cannot_be_bootstrapped() {
    let samples = SampleSet::from_slice(&[0.7]).unwrap();
    let result: Result<BootstrapKde, KdeError> =
        BootstrapKde::with_seed(samples, 4, None, &KdeConfig::default(), 2);
    assert!(matches!(result, Err(KdeError::SingularCovariance(_))));
}

#[test]
fn test_flat_resamples_are_errors_at_any_scale() {
    // Two close points: many resamples repeat one of them, whatever the units
    for scale in [1e-3, 1.0, 1e3] {
        let samples = SampleSet::from_slice(&[0.0, scale]).unwrap();
        let result: Result<BootstrapKde, KdeError> =
            BootstrapKde::with_seed(samples, 400, None, &KdeConfig::default(), 3);
        assert!(matches!(result, Err(KdeError::SingularCovariance(_))));
    }
}

#[test]
fn test_fractional_niter_is_rejected() {
    let samples = SampleSet::from_slice(&draw_normal(10, 1)).unwrap();
    let result: Result<BootstrapKde, KdeError> =
        BootstrapKde::with_seed(samples, 10.5, None, &KdeConfig::default(), 1);
    assert!(matches!(result, Err(KdeError::InvalidIterationCount(_))));
}

#[test]
fn test_whole_float_niter_is_accepted() {
    let samples = SampleSet::from_slice(&draw_normal(10, 1)).unwrap();
    let ensemble: BootstrapKde =
        BootstrapKde::with_seed(samples, 3.0, None, &KdeConfig::default(), 1).unwrap();
    assert_eq!(ensemble.niter(), 3);
}

#[test]
fn test_short_weights_are_rejected() {
    let samples = SampleSet::from_slice(&draw_normal(10, 1)).unwrap();
    let result: Result<BootstrapKde, KdeError> =
        BootstrapKde::with_seed(samples, 4, Some(vec![1.0; 9]), &KdeConfig::default(), 1);
    assert!(matches!(
        result,
        Err(KdeError::LengthMismatch {
            expected: 10,
            actual: 9
        })
    ));
}

#[test]
fn test_precomputed_values_are_rejected() {
    let samples = SampleSet::from_slice(&draw_normal(10, 1)).unwrap();
    let config = KdeConfig {
        kde_values: Some(vec![0.5; 10]),
        ..Default::default()
    };
    let result: Result<BootstrapKde, KdeError> =
        BootstrapKde::with_seed(samples, 4, None, &config, 1);
    assert!(matches!(result, Err(KdeError::Unsupported(_))));
}

#[test]
fn test_two_dimensional_ensemble() {
    let xs = draw_normal(40, 10);
    let ys = draw_normal(40, 11);
    let points: Vec<Vec<f64>> = xs
        .iter()
        .zip(&ys)
        .map(|(&x, &y)| vec![x, 0.5 * x + y])
        .collect();
    let samples = SampleSet::from_points(&points).unwrap();
    let config = KdeConfig {
        adaptive: true,
        ..Default::default()
    };
    let ensemble: BootstrapKde = BootstrapKde::with_seed(samples, 8, None, &config, 10).unwrap();

    // A flat query of length d is a single point
    let single = ensemble.evaluate(&[0.0, 0.0]).unwrap();
    assert_eq!(single.len(), 1);

    let query = ndarray::array![[0.0, 4.0], [0.0, -4.0]];
    let estimate = ensemble.evaluate(&query).unwrap();
    assert_eq!(estimate.len(), 2);
    assert_relative_eq!(estimate.mean[0], single.mean[0]);
    assert!(estimate.mean[0] > estimate.mean[1]);

    assert!(matches!(
        ensemble.evaluate(&[0.0, 0.0, 0.0]),
        Err(KdeError::DimensionMismatch {
            expected: 2,
            actual: 3
        })
    ));
}
