use crate::backend::{Bandwidth, BandwidthRule, CpuBackend, DensityBackend};
use crate::data::{QueryPoints, SampleSet, Weights};
use crate::error::{KdeError, Result};
use derive_builder::Builder;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Configuration for a single [`AdaptiveKde`]
///
/// # Example
///
/// ```rust
/// use bootkde::{BandwidthRule, KdeConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = KdeConfig::new()
///     .adaptive(true)
///     .alpha(0.5)
///     .bw_method(BandwidthRule::Scott)
///     .build()?;
/// assert!(config.adaptive);
/// # Ok(())
/// # }
/// ```
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[builder(
    setter(into, strip_option),
    default,
    build_fn(validate = "Self::validate")
)]
#[serde(default)]
pub struct KdeConfig {
    /// Derive per-point bandwidth multipliers from a pilot density
    pub adaptive: bool,

    /// Use the weights (and a weighted covariance) for the pilot pass
    pub weight_adaptive_bw: bool,

    /// Sensitivity of the multipliers to the pilot density, usually in `[0, 1]`
    pub alpha: f64,

    pub bw_method: BandwidthRule,

    /// Precomputed density values. Not supported: estimators always work from
    /// raw samples, and construction fails if this is set.
    pub kde_values: Option<Vec<f64>>,
}

impl Default for KdeConfig {
    fn default() -> Self {
        Self {
            adaptive: false,
            weight_adaptive_bw: false,
            alpha: 0.3,
            bw_method: BandwidthRule::Silverman,
            kde_values: None,
        }
    }
}

impl KdeConfig {
    /// Create a new builder for KdeConfig
    pub fn new() -> KdeConfigBuilder {
        KdeConfigBuilder::default()
    }

    /// Reject configurations this estimator cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.kde_values.is_some() {
            return Err(KdeError::unsupported(
                "`kde_values` is not supported, densities are always computed from raw samples",
            ));
        }
        check_alpha(self.alpha)
    }
}

impl KdeConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(alpha) = self.alpha {
            check_alpha(alpha).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

impl From<KdeConfigBuilderError> for KdeError {
    fn from(err: KdeConfigBuilderError) -> Self {
        KdeError::invalid_config(err.to_string())
    }
}

fn check_alpha(alpha: f64) -> Result<()> {
    if !alpha.is_finite() || alpha < 0.0 {
        return Err(KdeError::invalid_config(format!(
            "alpha must be finite and non-negative, got {}",
            alpha
        )));
    }
    Ok(())
}

/// Gaussian KDE with optional adaptive (per-point) bandwidths
///
/// The bandwidth is computed once from the data with the configured rule. When
/// `adaptive` is set, a pilot density `p_i` is evaluated at every sample and
/// each sample's kernel is widened by
///
/// `lambda_i = (p_i / g)^(-alpha)`
///
/// where `g` is the geometric mean of the pilot densities (Abramson's rule,
/// generalised with the exponent `alpha`). Samples in sparse regions get wider
/// kernels, samples in dense regions narrower ones.
///
/// The estimator is immutable after construction and [`AdaptiveKde::evaluate`]
/// has no side effects.
#[derive(Debug, Clone)]
pub struct AdaptiveKde<B: DensityBackend = CpuBackend> {
    backend: B,
    config: KdeConfig,
    weighted: bool,
    bandwidth: Bandwidth,
    lambdas: Vec<f64>,
}

impl<B: DensityBackend> AdaptiveKde<B> {
    /// Fit an estimator to `samples`
    ///
    /// `weights` may be `None` or empty for an unweighted estimate.
    ///
    /// # Errors
    /// - `Unsupported` if `config.kde_values` is set
    /// - `InvalidConfig` for a negative or non-finite `alpha`
    /// - `InvalidWeights` / `LengthMismatch` for malformed weights
    /// - `SingularCovariance` if no usable kernel covariance exists
    pub fn new(samples: SampleSet, weights: Option<Vec<f64>>, config: &KdeConfig) -> Result<Self> {
        config.validate()?;
        let weights = Weights::from_optional(weights)?;
        Self::with_weights(samples, weights, config)
    }

    /// Like [`AdaptiveKde::new`], with already validated weights
    pub fn with_weights(
        samples: SampleSet,
        weights: Option<Weights>,
        config: &KdeConfig,
    ) -> Result<Self> {
        config.validate()?;
        warn_unused_weight_flag(config, weights.is_some());
        Self::fit(samples, weights, config)
    }

    /// Fit with a configuration that has already been validated
    pub(crate) fn fit(
        samples: SampleSet,
        weights: Option<Weights>,
        config: &KdeConfig,
    ) -> Result<Self> {
        let backend = B::bind(samples, weights)?;
        let weighted = backend.weights().is_some();
        let bandwidth = backend.compute_bandwidth(&config.bw_method, weighted)?;

        let lambdas = if config.adaptive {
            let pilot_weighted = config.weight_adaptive_bw && weighted;
            let pilot_bandwidth = if pilot_weighted == weighted {
                bandwidth.clone()
            } else {
                backend.compute_bandwidth(&config.bw_method, pilot_weighted)?
            };

            let pilot = backend.evaluate_pilot(&pilot_bandwidth, pilot_weighted)?;
            let lambdas = abramson_lambdas(&pilot, config.alpha);
            debug!(
                "adaptive bandwidth: {} samples, multipliers in [{:.3}, {:.3}]",
                lambdas.len(),
                lambdas.iter().cloned().fold(f64::INFINITY, f64::min),
                lambdas.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
            );
            lambdas
        } else {
            vec![1.0; backend.n_samples()]
        };

        Ok(Self {
            backend,
            config: config.clone(),
            weighted,
            bandwidth,
            lambdas,
        })
    }

    /// Density at each query point
    ///
    /// A flat sequence is read as `m` points for a 1-D estimator, or as a
    /// single point otherwise.
    pub fn evaluate<'a>(&self, points: impl Into<QueryPoints<'a>>) -> Result<Vec<f64>> {
        let points = points.into().promote(self.dim())?;
        self.evaluate_view(points)
    }

    pub(crate) fn evaluate_view(&self, points: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        self.backend
            .evaluate(points, &self.bandwidth, &self.lambdas, self.weighted)
    }

    /// Per-sample bandwidth multipliers (all ones when not adaptive)
    pub fn lambdas(&self) -> &[f64] {
        &self.lambdas
    }

    pub fn bandwidth(&self) -> &Bandwidth {
        &self.bandwidth
    }

    pub fn samples(&self) -> &SampleSet {
        self.backend.samples()
    }

    pub fn weights(&self) -> Option<&Weights> {
        self.backend.weights()
    }

    /// Whether weights were supplied
    pub fn is_weighted(&self) -> bool {
        self.weighted
    }

    pub fn dim(&self) -> usize {
        self.backend.dim()
    }

    pub fn n_samples(&self) -> usize {
        self.backend.n_samples()
    }

    pub fn config(&self) -> &KdeConfig {
        &self.config
    }
}

/// A weighted pilot was requested but there is nothing to weight it with
pub(crate) fn warn_unused_weight_flag(config: &KdeConfig, weighted: bool) {
    if config.adaptive && config.weight_adaptive_bw && !weighted {
        warn!("Since `weights` aren't given `weight_adaptive_bw` will have no effect");
    }
}

/// Bandwidth multipliers from pilot densities: `(p_i / g)^(-alpha)` with `g`
/// the geometric mean of `pilot`
///
/// Pilot values are clamped to `f64::MIN_POSITIVE` before taking logarithms, so
/// an underflowed pilot yields a large but finite multiplier. With
/// `alpha = 0` every multiplier is exactly one.
pub fn abramson_lambdas(pilot: &[f64], alpha: f64) -> Vec<f64> {
    if pilot.is_empty() {
        return Vec::new();
    }

    let logs: Vec<f64> = pilot.iter().map(|p| p.max(f64::MIN_POSITIVE).ln()).collect();
    let log_g = logs.iter().sum::<f64>() / logs.len() as f64;
    logs.iter().map(|lp| (-alpha * (lp - log_g)).exp()).collect()
}
