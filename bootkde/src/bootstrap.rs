use crate::adaptive::{AdaptiveKde, KdeConfig, warn_unused_weight_flag};
use crate::backend::{CpuBackend, DensityBackend};
use crate::data::{QueryPoints, SampleSet, Weights};
use crate::error::{KdeError, Result};
use derive_builder::Builder;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Conversion of a caller-supplied bootstrap iteration count
///
/// Integers are accepted when non-negative; floats only when they are whole
/// numbers (`10.0` is fine, `10.5` is not).
pub trait IntoIterationCount {
    fn into_iteration_count(self) -> Result<usize>;
}

macro_rules! impl_unsigned_iteration_count {
    ($($t:ty),*) => {
        $(impl IntoIterationCount for $t {
            fn into_iteration_count(self) -> Result<usize> {
                usize::try_from(self).map_err(|_| {
                    KdeError::invalid_iteration_count(format!("{} does not fit in usize", self))
                })
            }
        })*
    };
}

macro_rules! impl_signed_iteration_count {
    ($($t:ty),*) => {
        $(impl IntoIterationCount for $t {
            fn into_iteration_count(self) -> Result<usize> {
                usize::try_from(self).map_err(|_| {
                    KdeError::invalid_iteration_count(format!(
                        "niter must be a non-negative integer, got {}",
                        self
                    ))
                })
            }
        })*
    };
}

impl_unsigned_iteration_count!(usize, u8, u16, u32, u64);
impl_signed_iteration_count!(isize, i8, i16, i32, i64);

impl IntoIterationCount for f64 {
    fn into_iteration_count(self) -> Result<usize> {
        if !self.is_finite() || self.fract() != 0.0 {
            return Err(KdeError::invalid_iteration_count(format!(
                "niter must be a whole number, got {}",
                self
            )));
        }
        if self < 0.0 || self > usize::MAX as f64 {
            return Err(KdeError::invalid_iteration_count(format!(
                "niter must be a non-negative integer, got {}",
                self
            )));
        }
        Ok(self as usize)
    }
}

impl IntoIterationCount for f32 {
    fn into_iteration_count(self) -> Result<usize> {
        f64::from(self).into_iteration_count()
    }
}

/// Configuration for a [`BootstrapKde`]
///
/// # Example
///
/// ```rust
/// use bootkde::{BootstrapConfig, KdeConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = BootstrapConfig::new()
///     .niter(50usize)
///     .seed(7u64)
///     .kde(KdeConfig::new().adaptive(true).build()?)
///     .build()?;
/// assert_eq!(config.niter, 50);
/// # Ok(())
/// # }
/// ```
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[builder(setter(into, strip_option), default)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Number of resampled estimators
    pub niter: usize,

    /// Seed for the resampling; `None` draws a seed from the OS
    pub seed: Option<u64>,

    /// Passed through to every ensemble member
    pub kde: KdeConfig,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            niter: 10,
            seed: None,
            kde: KdeConfig::default(),
        }
    }
}

impl BootstrapConfig {
    /// Create a new builder for BootstrapConfig
    pub fn new() -> BootstrapConfigBuilder {
        BootstrapConfigBuilder::default()
    }
}

impl From<BootstrapConfigBuilderError> for KdeError {
    fn from(err: BootstrapConfigBuilderError) -> Self {
        KdeError::invalid_config(err.to_string())
    }
}

/// Per-point mean density and its bootstrap standard error
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapEstimate {
    pub mean: Vec<f64>,
    pub stderr: Vec<f64>,
}

impl BootstrapEstimate {
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// `(mean, stderr)`
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.mean, self.stderr)
    }
}

/// `n` indices drawn uniformly with replacement from `[0, n)`
pub fn bootstrap_indices<R: Rng>(n: usize, rng: &mut R) -> Vec<usize> {
    (0..n).map(|_| rng.random_range(0..n)).collect()
}

/// Ensemble of [`AdaptiveKde`]s fit to bootstrap resamples of the data
///
/// Evaluating the ensemble gives, per query point, the mean density over all
/// members and the spread of the member densities around it.
///
/// # Reproducibility
///
/// The random source is always explicit. One seed per iteration is drawn from
/// it up front and each resample uses its own generator seeded from that, so
/// members can be fit in parallel and the ensemble is identical for a given
/// seed regardless of thread count. Evaluation sums member results in member
/// order, so outputs are bit-for-bit repeatable too.
#[derive(Debug, Clone)]
pub struct BootstrapKde<B: DensityBackend = CpuBackend> {
    members: Vec<AdaptiveKde<B>>,
    bootstrap_indices: Vec<Vec<usize>>,
    dim: usize,
    n_samples: usize,
    weighted: bool,
}

impl<B: DensityBackend> BootstrapKde<B> {
    /// Build an ensemble of `niter` estimators
    ///
    /// # Arguments
    /// * `samples` - Data to resample
    /// * `niter` - Number of bootstrap iterations; must be a non-negative whole number
    /// * `weights` - Optional per-sample weights (`None` or empty for unweighted)
    /// * `config` - Configuration passed to every member
    /// * `rng` - Random source for the resampling
    ///
    /// # Errors
    /// `InvalidIterationCount` for a bad `niter` and `LengthMismatch` for a bad
    /// weight count, both before any resampling happens. Otherwise the error
    /// of the first member (in member order) that fails to fit is returned
    /// as-is. A resample with no spread in some dimension, such as one that
    /// drew a single distinct point, fails with `SingularCovariance`.
    pub fn new<R: Rng>(
        samples: SampleSet,
        niter: impl IntoIterationCount,
        weights: Option<Vec<f64>>,
        config: &KdeConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let niter = niter.into_iteration_count()?;
        config.validate()?;

        let n_samples = samples.n_samples();
        let dim = samples.dim();
        let weights = Weights::from_optional(weights)?;
        if let Some(w) = &weights {
            w.check_len(n_samples)?;
        }
        let weighted = weights.is_some();
        warn_unused_weight_flag(config, weighted);

        debug!(
            "building bootstrap ensemble: {} iterations over {} samples in {} dimensions",
            niter, n_samples, dim
        );

        let seeds: Vec<u64> = (0..niter).map(|_| rng.random()).collect();
        let (members, resample_indices): (Vec<_>, Vec<_>) = seeds
            .par_iter()
            .map(|&seed| -> Result<(AdaptiveKde<B>, Vec<usize>)> {
                let mut member_rng = StdRng::seed_from_u64(seed);
                let indices = bootstrap_indices(n_samples, &mut member_rng);
                let resampled = samples.select(&indices);
                let resampled_weights = weights
                    .as_ref()
                    .map(|w| w.select(&indices))
                    .transpose()?;
                let kde = AdaptiveKde::fit(resampled, resampled_weights, config)?;
                Ok((kde, indices))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .unzip();

        info!("Built bootstrap ensemble with {} members", members.len());

        Ok(Self {
            members,
            bootstrap_indices: resample_indices,
            dim,
            n_samples,
            weighted,
        })
    }

    /// [`BootstrapKde::new`] with a `StdRng` seeded from `seed`
    pub fn with_seed(
        samples: SampleSet,
        niter: impl IntoIterationCount,
        weights: Option<Vec<f64>>,
        config: &KdeConfig,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new(samples, niter, weights, config, &mut rng)
    }

    /// Build from a [`BootstrapConfig`]
    pub fn from_config(
        samples: SampleSet,
        weights: Option<Vec<f64>>,
        config: &BootstrapConfig,
    ) -> Result<Self> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::new(samples, config.niter, weights, &config.kde, &mut rng)
    }

    /// Mean density and standard error at each query point
    ///
    /// `stderr = sqrt(max(0, E[f²] - E[f]²))` over the ensemble members.
    ///
    /// # Errors
    /// `EmptyEnsemble` when built with `niter = 0`, `DimensionMismatch` for
    /// query points of the wrong dimensionality.
    pub fn evaluate<'a>(&self, points: impl Into<QueryPoints<'a>>) -> Result<BootstrapEstimate> {
        if self.members.is_empty() {
            return Err(KdeError::EmptyEnsemble);
        }
        let points = points.into().promote(self.dim)?;
        let m = points.ncols();

        let per_member: Vec<Vec<f64>> = self
            .members
            .par_iter()
            .map(|kde| kde.evaluate_view(points))
            .collect::<Result<_>>()?;

        let mut sum = vec![0.0; m];
        let mut sum_sq = vec![0.0; m];
        for values in &per_member {
            for ((s, sq), &v) in sum.iter_mut().zip(sum_sq.iter_mut()).zip(values) {
                *s += v;
                *sq += v * v;
            }
        }

        let k = self.members.len() as f64;
        let mean: Vec<f64> = sum.iter().map(|s| s / k).collect();
        let stderr = sum_sq
            .iter()
            .zip(&mean)
            .map(|(sq, mu)| (sq / k - mu * mu).max(0.0).sqrt())
            .collect();

        Ok(BootstrapEstimate { mean, stderr })
    }

    pub fn members(&self) -> &[AdaptiveKde<B>] {
        &self.members
    }

    /// Resample indices used for each member, in member order
    pub fn bootstrap_indices(&self) -> &[Vec<usize>] {
        &self.bootstrap_indices
    }

    pub fn niter(&self) -> usize {
        self.members.len()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn is_weighted(&self) -> bool {
        self.weighted
    }
}
