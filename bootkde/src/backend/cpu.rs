use super::bandwidth::{Bandwidth, BandwidthRule, covariance};
use super::DensityBackend;
use crate::data::{SampleSet, Weights};
use crate::error::{KdeError, Result};
use ndarray::ArrayView2;
use rayon::prelude::*;
use tracing::debug;

/// Direct-summation Gaussian KDE on the CPU
///
/// Every query point sums the kernels of all `n` samples, so a call costs
/// `O(n · m · d)`. Query points are processed in parallel with `rayon`; the
/// sum for a single point is always accumulated in sample order, so results do
/// not depend on the thread count.
#[derive(Debug, Clone)]
pub struct CpuBackend {
    samples: SampleSet,
    weights: Option<Weights>,
}

impl DensityBackend for CpuBackend {
    fn bind(samples: SampleSet, weights: Option<Weights>) -> Result<Self> {
        if let Some(w) = &weights {
            w.check_len(samples.n_samples())?;
        }
        Ok(Self { samples, weights })
    }

    fn samples(&self) -> &SampleSet {
        &self.samples
    }

    fn weights(&self) -> Option<&Weights> {
        self.weights.as_ref()
    }

    fn compute_bandwidth(&self, rule: &BandwidthRule, weighted_cov: bool) -> Result<Bandwidth> {
        let weights = self.weights.as_ref().filter(|_| weighted_cov);
        let neff = weights
            .map(Weights::effective_sample_size)
            .unwrap_or(self.samples.n_samples() as f64);
        let factor = rule.factor(neff, self.samples.dim())?;

        let cov = covariance(&self.samples, weights);
        debug!(
            "bandwidth rule {} gives factor {:.4} (neff = {:.1}, weighted covariance: {})",
            rule,
            factor,
            neff,
            weights.is_some()
        );
        Bandwidth::new(factor, cov)
    }

    fn evaluate(
        &self,
        points: ArrayView2<'_, f64>,
        bandwidth: &Bandwidth,
        lambdas: &[f64],
        weighted: bool,
    ) -> Result<Vec<f64>> {
        let dim = self.samples.dim();
        let n = self.samples.n_samples();
        if points.nrows() != dim {
            return Err(KdeError::DimensionMismatch {
                expected: dim,
                actual: points.nrows(),
            });
        }
        if bandwidth.dim() != dim {
            return Err(KdeError::DimensionMismatch {
                expected: dim,
                actual: bandwidth.dim(),
            });
        }
        if lambdas.len() != n {
            return Err(KdeError::invalid_config(format!(
                "expected {} bandwidth multipliers, got {}",
                n,
                lambdas.len()
            )));
        }

        let weights = self.weights.as_ref().filter(|_| weighted);
        let total = weights.map(Weights::total).unwrap_or(n as f64);
        let norm = (-bandwidth.log_normalization()).exp() / total;

        // Per-sample kernel coefficient w_i / λ_i^d and 1 / λ_i²
        let coefficients: Vec<f64> = lambdas
            .iter()
            .enumerate()
            .map(|(i, &lambda)| {
                let w = weights.map(|w| w.as_slice()[i]).unwrap_or(1.0);
                w / lambda.powi(dim as i32)
            })
            .collect();
        let inv_sq: Vec<f64> = lambdas.iter().map(|&l| 1.0 / (l * l)).collect();

        let whitened_samples = bandwidth.whiten(self.samples.view())?;
        let whitened_points = bandwidth.whiten(points)?;

        let values = (0..points.ncols())
            .into_par_iter()
            .map(|j| {
                let query = whitened_points.column(j);
                let sum: f64 = whitened_samples
                    .columns()
                    .into_iter()
                    .zip(coefficients.iter().zip(&inv_sq))
                    .map(|(sample, (&coef, &inv))| {
                        let r2: f64 = sample
                            .iter()
                            .zip(query.iter())
                            .map(|(a, b)| (a - b) * (a - b))
                            .sum();
                        coef * (-0.5 * r2 * inv).exp()
                    })
                    .sum();
                sum * norm
            })
            .collect();

        Ok(values)
    }
}
