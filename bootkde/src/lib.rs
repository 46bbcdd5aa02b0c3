//! Adaptive Gaussian kernel density estimation with bootstrap uncertainty
//!
//! This crate provides two estimators:
//!
//! - [`AdaptiveKde`]: a Gaussian KDE whose per-sample bandwidth can adapt to
//!   the local density of the data (derived from a pilot estimate)
//! - [`BootstrapKde`]: an ensemble of [`AdaptiveKde`]s fit to resamples of the
//!   data, reporting a mean density and its standard error at every query point
//!
//! Kernel summation is delegated to a [`DensityBackend`]; [`CpuBackend`] is
//! the default and runs in parallel with `rayon`.
//!
//! # Quick Start
//!
//! ```rust
//! use bootkde::{BootstrapKde, KdeConfig, SampleSet};
//!
//! let samples = SampleSet::from_slice(&[-1.3, -0.4, -0.1, 0.0, 0.2, 0.6, 1.1, 2.0])?;
//! let config = KdeConfig {
//!     adaptive: true,
//!     alpha: 0.5,
//!     ..Default::default()
//! };
//!
//! // 20 resamples, seeded for reproducibility
//! let ensemble: BootstrapKde = BootstrapKde::with_seed(samples, 20, None, &config, 42)?;
//! let estimate = ensemble.evaluate(&[-2.0, 0.0, 2.0])?;
//!
//! for ((x, mean), err) in [-2.0, 0.0, 2.0].iter().zip(&estimate.mean).zip(&estimate.stderr) {
//!     println!("f({x}) = {mean:.4} ± {err:.4}");
//! }
//! # Ok::<(), bootkde::KdeError>(())
//! ```
//!
//! # Weights
//!
//! Both estimators accept optional non-negative per-sample weights. `None` and
//! an empty vector both mean "unweighted":
//!
//! ```rust
//! use bootkde::{AdaptiveKde, KdeConfig, SampleSet};
//!
//! let samples = SampleSet::from_slice(&[0.0, 1.0, 2.0, 3.0])?;
//! let kde: AdaptiveKde = AdaptiveKde::new(
//!     samples,
//!     Some(vec![4.0, 1.0, 1.0, 1.0]),
//!     &KdeConfig::default(),
//! )?;
//! let density = kde.evaluate(&[0.0, 3.0])?;
//! assert!(density[0] > density[1]);
//! # Ok::<(), bootkde::KdeError>(())
//! ```
//!
//! # Logging
//!
//! Diagnostics are emitted with `tracing`; install a subscriber (for example
//! `tracing-subscriber`) to see them. The only warning is for
//! `weight_adaptive_bw` without weights, which is otherwise ignored.

pub mod adaptive;
pub mod backend;
pub mod bootstrap;
pub mod data;
pub mod error;

pub use adaptive::{AdaptiveKde, KdeConfig, KdeConfigBuilder, abramson_lambdas};
pub use backend::{Bandwidth, BandwidthRule, CpuBackend, DensityBackend};
pub use bootstrap::{
    BootstrapConfig, BootstrapConfigBuilder, BootstrapEstimate, BootstrapKde, IntoIterationCount,
    bootstrap_indices,
};
pub use data::{QueryPoints, SampleSet, Weights};
pub use error::{KdeError, Result};
