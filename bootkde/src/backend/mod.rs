//! Density-evaluation backends
//!
//! A backend owns the raw samples and weights of one estimator and knows how
//! to:
//! - compute a Gaussian kernel bandwidth from them ([`DensityBackend::compute_bandwidth`])
//! - evaluate a pilot density at the samples themselves ([`DensityBackend::evaluate_pilot`])
//! - evaluate the density at arbitrary query points ([`DensityBackend::evaluate`])
//!
//! Adaptive bandwidths and bootstrap aggregation are layered on top of this
//! trait, so any backend (CPU, GPU, ...) can be plugged in. [`CpuBackend`] is
//! the reference implementation.

mod bandwidth;
mod cpu;

pub use bandwidth::{Bandwidth, BandwidthRule, covariance};
pub use cpu::CpuBackend;

use crate::data::{SampleSet, Weights};
use crate::error::Result;
use ndarray::ArrayView2;

/// Capability required from a Gaussian KDE primitive
pub trait DensityBackend: Send + Sync + Sized {
    /// Bind samples and optional weights
    ///
    /// # Errors
    /// Must fail with `LengthMismatch` when the number of weights differs from
    /// the number of samples.
    fn bind(samples: SampleSet, weights: Option<Weights>) -> Result<Self>;

    fn samples(&self) -> &SampleSet;

    fn weights(&self) -> Option<&Weights>;

    /// Compute a bandwidth using `rule`; the covariance is weighted when
    /// `weighted_cov` is set and weights are bound
    fn compute_bandwidth(&self, rule: &BandwidthRule, weighted_cov: bool) -> Result<Bandwidth>;

    /// Density at each `d × m` query point, with point `i`'s kernel scaled by
    /// `lambdas[i]`
    fn evaluate(
        &self,
        points: ArrayView2<'_, f64>,
        bandwidth: &Bandwidth,
        lambdas: &[f64],
        weighted: bool,
    ) -> Result<Vec<f64>>;

    /// Fixed-bandwidth density at each sample point
    fn evaluate_pilot(&self, bandwidth: &Bandwidth, weighted: bool) -> Result<Vec<f64>> {
        let samples = self.samples();
        let ones = vec![1.0; samples.n_samples()];
        self.evaluate(samples.view(), bandwidth, &ones, weighted)
    }

    fn dim(&self) -> usize {
        self.samples().dim()
    }

    fn n_samples(&self) -> usize {
        self.samples().n_samples()
    }
}
