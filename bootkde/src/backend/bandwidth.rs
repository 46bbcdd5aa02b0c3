use crate::data::{SampleSet, Weights};
use crate::error::{KdeError, Result};
use nalgebra::{Cholesky, DMatrix};
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const LN_2PI: f64 = 1.837_877_066_409_345_5; // ln(2*pi)

/// Rule used to derive the bandwidth factor from the data
///
/// The kernel covariance is `factor² · Σ`, where `Σ` is the (optionally
/// weighted) sample covariance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandwidthRule {
    /// `neff^(-1/(d+4))`
    Scott,
    /// `(neff · (d+2) / 4)^(-1/(d+4))`
    #[default]
    Silverman,
    /// A user-chosen factor, used as-is
    Factor(f64),
}

impl BandwidthRule {
    /// Bandwidth factor for `dim`-dimensional data with effective sample size `neff`
    pub fn factor(&self, neff: f64, dim: usize) -> Result<f64> {
        let exponent = -1.0 / (dim as f64 + 4.0);
        let factor = match *self {
            Self::Scott => neff.powf(exponent),
            Self::Silverman => (neff * (dim as f64 + 2.0) / 4.0).powf(exponent),
            Self::Factor(f) => f,
        };

        if !factor.is_finite() || factor <= 0.0 {
            return Err(KdeError::invalid_config(format!(
                "bandwidth factor must be finite and positive, got {} from {}",
                factor, self
            )));
        }
        Ok(factor)
    }
}

impl fmt::Display for BandwidthRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scott => write!(f, "scott"),
            Self::Silverman => write!(f, "silverman"),
            Self::Factor(factor) => write!(f, "{}", factor),
        }
    }
}

impl FromStr for BandwidthRule {
    type Err = KdeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "scott" => Ok(Self::Scott),
            "silverman" => Ok(Self::Silverman),
            other => other
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite() && *f > 0.0)
                .map(Self::Factor)
                .ok_or_else(|| {
                    KdeError::invalid_config(format!(
                        "unknown bandwidth method '{}': expected 'scott', 'silverman' or a positive number",
                        s
                    ))
                }),
        }
    }
}

/// A fixed Gaussian kernel bandwidth
///
/// Holds the data covariance `Σ`, the rule's factor, and the lower Cholesky
/// factor `L` of the kernel covariance `H = factor² · Σ`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bandwidth {
    factor: f64,
    covariance: Array2<f64>,
    lower: DMatrix<f64>,
    log_normalization: f64,
}

impl Bandwidth {
    /// # Errors
    /// Returns `SingularCovariance` if any dimension has no spread or
    /// `factor² · covariance` is not positive definite.
    pub fn new(factor: f64, covariance: Array2<f64>) -> Result<Self> {
        let dim = covariance.nrows();
        if dim == 0 || covariance.ncols() != dim {
            return Err(KdeError::singular_covariance(format!(
                "covariance must be a non-empty square matrix, got {:?}",
                covariance.dim()
            )));
        }

        let flat: Vec<usize> = (0..dim)
            .filter(|&j| {
                let var = covariance[[j, j]];
                !var.is_finite() || var <= 0.0
            })
            .collect();
        if !flat.is_empty() {
            return Err(KdeError::singular_covariance(format!(
                "dimensions {:?} have no spread, a kernel bandwidth needs at least two distinct points",
                flat
            )));
        }

        let kernel = to_dmatrix((&covariance * (factor * factor)).view());
        let lower = Cholesky::new(kernel)
            .ok_or_else(|| {
                KdeError::singular_covariance("kernel covariance is not positive definite")
            })?
            .unpack();
        let log_det_sqrt: f64 = lower.diagonal().iter().map(|l| l.ln()).sum();
        let log_normalization = 0.5 * dim as f64 * LN_2PI + log_det_sqrt;

        Ok(Self {
            factor,
            covariance,
            lower,
            log_normalization,
        })
    }

    pub fn dim(&self) -> usize {
        self.covariance.nrows()
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Data covariance `Σ`
    pub fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }

    /// `ln((2π)^(d/2) · sqrt(det H))`, the log normaliser of a unit-lambda kernel
    pub fn log_normalization(&self) -> f64 {
        self.log_normalization
    }

    /// Map `d × m` points into kernel coordinates by solving `L z = x`
    pub fn whiten(&self, points: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let whitened = self
            .lower
            .solve_lower_triangular(&to_dmatrix(points))
            .ok_or_else(|| {
                KdeError::singular_covariance("kernel Cholesky factor has a zero pivot")
            })?;
        Ok(Array2::from_shape_fn(points.dim(), |(i, j)| whitened[(i, j)]))
    }
}

fn to_dmatrix(view: ArrayView2<'_, f64>) -> DMatrix<f64> {
    DMatrix::from_fn(view.nrows(), view.ncols(), |i, j| view[[i, j]])
}

/// Sample covariance of `samples`
///
/// Unweighted: unbiased covariance with divisor `n - 1`. Weighted: with
/// normalised weights `w`, `Σ w_i (x_i - μ)(x_i - μ)ᵀ / (1 - Σ w_i²)`.
/// When the divisor vanishes (a single effective point) the result is the
/// zero matrix, which [`Bandwidth::new`] rejects.
pub fn covariance(samples: &SampleSet, weights: Option<&Weights>) -> Array2<f64> {
    let dim = samples.dim();
    let mean = samples.mean(weights);
    let centered = &samples.view() - &mean.insert_axis(Axis(1));

    let (scaled, divisor) = match weights {
        Some(w) => {
            let normalized = w.normalized();
            let sum_sq: f64 = normalized.iter().map(|x| x * x).sum();
            (&centered * &normalized.insert_axis(Axis(0)), 1.0 - sum_sq)
        }
        None => (centered.clone(), samples.n_samples() as f64 - 1.0),
    };

    if divisor <= f64::EPSILON {
        return Array2::zeros((dim, dim));
    }
    scaled.dot(&centered.t()) / divisor
}
