//! Sample sets, weights and query points.
//!
//! Samples are stored column-major in the statistical sense: a `d × n` matrix
//! where each column is one point. Query points use the same `d × m` layout.

use crate::error::{KdeError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// An immutable set of `n` points in `d`-dimensional space
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    data: Array2<f64>,
}

impl SampleSet {
    /// Wrap a `d × n` matrix (one column per point)
    ///
    /// # Errors
    /// Returns `InvalidSamples` if the matrix has no rows or no columns, or if
    /// any coordinate is NaN or infinite.
    pub fn new(data: Array2<f64>) -> Result<Self> {
        let (dim, n) = data.dim();
        if dim == 0 {
            return Err(KdeError::invalid_samples(
                "samples need at least one dimension",
            ));
        }
        if n == 0 {
            return Err(KdeError::invalid_samples("samples need at least one point"));
        }
        if let Some(((row, col), value)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(KdeError::invalid_samples(format!(
                "coordinate {} of point {} is not finite ({})",
                row, col, value
            )));
        }

        Ok(Self { data })
    }

    /// One-dimensional samples
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let data = Array2::from_shape_vec((1, values.len()), values.to_vec())
            .map_err(|e| KdeError::invalid_samples(e.to_string()))?;
        Self::new(data)
    }

    /// Build from a list of points, each point being a row of `d` coordinates
    pub fn from_points(points: &[Vec<f64>]) -> Result<Self> {
        let dim = points.first().map(Vec::len).unwrap_or(0);
        if let Some((idx, point)) = points.iter().enumerate().find(|(_, p)| p.len() != dim) {
            return Err(KdeError::invalid_samples(format!(
                "point {} has {} coordinates, expected {}",
                idx,
                point.len(),
                dim
            )));
        }

        let mut data = Array2::zeros((dim, points.len()));
        for (mut column, point) in data.columns_mut().into_iter().zip(points) {
            column.assign(&ArrayView1::from(point.as_slice()));
        }
        Self::new(data)
    }

    /// Dimensionality `d`
    pub fn dim(&self) -> usize {
        self.data.nrows()
    }

    /// Number of points `n`
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// The `i`-th point
    pub fn point(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.column(i)
    }

    /// Select points by index, keeping duplicates and order
    ///
    /// # Panics
    /// Panics if any index is out of bounds.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            data: self.data.select(Axis(1), indices),
        }
    }

    /// Per-dimension mean, optionally weighted by normalised weights
    pub(crate) fn mean(&self, weights: Option<&Weights>) -> Array1<f64> {
        match weights {
            Some(w) => self.data.dot(&w.normalized()),
            None => self.data.sum_axis(Axis(1)) / self.n_samples() as f64,
        }
    }
}

/// Non-negative per-point weights, parallel-indexed to a [`SampleSet`]
#[derive(Debug, Clone, PartialEq)]
pub struct Weights {
    values: Vec<f64>,
    total: f64,
}

impl Weights {
    /// # Errors
    /// Returns `InvalidWeights` if the vector is empty, contains a negative or
    /// non-finite entry, or sums to zero.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(KdeError::invalid_weights("weights must not be empty"));
        }
        if let Some((idx, w)) = values
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(KdeError::invalid_weights(format!(
                "weight {} must be finite and non-negative, got {}",
                idx, w
            )));
        }

        let total: f64 = values.iter().sum();
        if total <= 0.0 {
            return Err(KdeError::invalid_weights("total weight must be positive"));
        }

        Ok(Self { values, total })
    }

    /// Interpret caller-supplied weights: `None` and an empty vector both mean
    /// "unweighted".
    pub fn from_optional(values: Option<Vec<f64>>) -> Result<Option<Self>> {
        match values {
            Some(values) if !values.is_empty() => Self::new(values).map(Some),
            _ => Ok(None),
        }
    }

    /// Fail with `LengthMismatch` unless there is exactly one weight per sample
    pub fn check_len(&self, n_samples: usize) -> Result<()> {
        if self.values.len() != n_samples {
            return Err(KdeError::LengthMismatch {
                expected: n_samples,
                actual: self.values.len(),
            });
        }
        Ok(())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sum of all weights
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Kish effective sample size: `(Σw)² / Σw²`
    pub fn effective_sample_size(&self) -> f64 {
        let sum_sq: f64 = self.values.iter().map(|w| w * w).sum();
        self.total * self.total / sum_sq
    }

    /// Weights scaled to sum to one
    pub fn normalized(&self) -> Array1<f64> {
        self.values.iter().map(|w| w / self.total).collect()
    }

    /// Select weights by index, keeping duplicates and order
    ///
    /// # Errors
    /// Returns `InvalidWeights` if the selection only picks zero weights.
    pub fn select(&self, indices: &[usize]) -> Result<Self> {
        Self::new(indices.iter().map(|&i| self.values[i]).collect())
    }
}

/// Points at which a density is evaluated
///
/// A flat sequence is promoted to a 2-D `d × m` set by [`QueryPoints::promote`]:
/// for a 1-D estimator every entry is its own point, otherwise a flat sequence
/// of length `d` is a single point.
#[derive(Debug, Clone, Copy)]
pub enum QueryPoints<'a> {
    Flat(ArrayView1<'a, f64>),
    Matrix(ArrayView2<'a, f64>),
}

impl<'a> QueryPoints<'a> {
    /// Promote to a `dim × m` view
    ///
    /// # Errors
    /// Returns `DimensionMismatch` when the points cannot be read as
    /// `dim`-dimensional.
    pub fn promote(self, dim: usize) -> Result<ArrayView2<'a, f64>> {
        match self {
            Self::Flat(view) if dim == 1 => Ok(view.insert_axis(Axis(0))),
            Self::Flat(view) if view.len() == dim => Ok(view.insert_axis(Axis(1))),
            Self::Flat(view) => Err(KdeError::DimensionMismatch {
                expected: dim,
                actual: view.len(),
            }),
            Self::Matrix(view) if view.nrows() == dim => Ok(view),
            Self::Matrix(view) => Err(KdeError::DimensionMismatch {
                expected: dim,
                actual: view.nrows(),
            }),
        }
    }
}

impl<'a> From<&'a [f64]> for QueryPoints<'a> {
    fn from(values: &'a [f64]) -> Self {
        Self::Flat(ArrayView1::from(values))
    }
}

impl<'a, const N: usize> From<&'a [f64; N]> for QueryPoints<'a> {
    fn from(values: &'a [f64; N]) -> Self {
        Self::Flat(ArrayView1::from(&values[..]))
    }
}

impl<'a> From<&'a Vec<f64>> for QueryPoints<'a> {
    fn from(values: &'a Vec<f64>) -> Self {
        Self::Flat(ArrayView1::from(values.as_slice()))
    }
}

impl<'a> From<&'a Array1<f64>> for QueryPoints<'a> {
    fn from(values: &'a Array1<f64>) -> Self {
        Self::Flat(values.view())
    }
}

impl<'a> From<ArrayView1<'a, f64>> for QueryPoints<'a> {
    fn from(values: ArrayView1<'a, f64>) -> Self {
        Self::Flat(values)
    }
}

impl<'a> From<&'a Array2<f64>> for QueryPoints<'a> {
    fn from(values: &'a Array2<f64>) -> Self {
        Self::Matrix(values.view())
    }
}

impl<'a> From<ArrayView2<'a, f64>> for QueryPoints<'a> {
    fn from(values: ArrayView2<'a, f64>) -> Self {
        Self::Matrix(values)
    }
}

impl<'a> From<&'a SampleSet> for QueryPoints<'a> {
    fn from(samples: &'a SampleSet) -> Self {
        Self::Matrix(samples.view())
    }
}
