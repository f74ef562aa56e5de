//! The model collaborator.
//!
//! Plots never look inside a trained model; they go through the
//! [`LatentModel`] capability trait. [`InMemoryModel`] implements it for
//! factor values and training tables already held in memory.

mod memory;

pub use memory::InMemoryModel;

use std::collections::HashSet;

use crate::annotation::AnnotationValue;
use crate::error::{Error, Result};

/// Query interface every plottable model must provide.
///
/// Implementations are read-only from the crate's point of view.
pub trait LatentModel {
    /// Ordered factor identifiers. With an intercept, the intercept is at position 0.
    fn factor_names(&self) -> &[String];

    /// Ordered sample identifiers (length N). This order defines sample alignment.
    fn sample_names(&self) -> &[String];

    /// Whether the model was fit with an intercept pseudo-factor.
    fn has_intercept(&self) -> bool;

    /// Factor values for the requested factors, columns in request order.
    fn factors(&self, factors: &[String]) -> Result<FactorMatrix>;

    /// Training data, one table per view, in declared view order.
    fn train_data(&self) -> &[ViewTable];

    /// Per-sample covariate values by name.
    ///
    /// `None` when the model has no covariate source or does not know `name`.
    fn covariate(&self, _name: &str) -> Option<Vec<(String, AnnotationValue)>> {
        None
    }

    /// Name of the intercept factor, if the model has one.
    fn intercept_name(&self) -> Option<&str> {
        if self.has_intercept() {
            self.factor_names().first().map(String::as_str)
        } else {
            None
        }
    }
}

fn ensure_unique(kind: &str, names: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(Error::InvalidSpecification(format!("duplicate {kind} '{name}'")));
        }
    }
    Ok(())
}

/// Sample x factor matrix of inferred factor values.
///
/// Values are row-major (one row per sample); `NaN` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorMatrix {
    samples: Vec<String>,
    factors: Vec<String>,
    values: Vec<f32>,
}

impl FactorMatrix {
    /// Create a matrix from row-major values.
    ///
    /// # Errors
    ///
    /// Fails on a length mismatch or duplicate sample/factor names.
    pub fn new(samples: Vec<String>, factors: Vec<String>, values: Vec<f32>) -> Result<Self> {
        let expected = samples.len() * factors.len();
        if values.len() != expected {
            return Err(Error::DataLengthMismatch {
                x_len: expected,
                y_len: values.len(),
            });
        }
        ensure_unique("sample", &samples)?;
        ensure_unique("factor", &factors)?;
        Ok(Self {
            samples,
            factors,
            values,
        })
    }

    /// Sample identifiers (row labels).
    #[must_use]
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    /// Factor identifiers (column labels).
    #[must_use]
    pub fn factors(&self) -> &[String] {
        &self.factors
    }

    /// Number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// Number of factors.
    #[must_use]
    pub fn n_factors(&self) -> usize {
        self.factors.len()
    }

    /// Value at (sample row, factor column).
    #[must_use]
    pub fn value(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.n_samples() || col >= self.n_factors() {
            return None;
        }
        Some(self.values[row * self.n_factors() + col])
    }

    /// Column index of a factor.
    #[must_use]
    pub fn factor_index(&self, factor: &str) -> Option<usize> {
        self.factors.iter().position(|f| f == factor)
    }

    /// Copy of one factor column, in sample order.
    #[must_use]
    pub fn column(&self, col: usize) -> Option<Vec<f32>> {
        if col >= self.n_factors() {
            return None;
        }
        Some(self.values.iter().skip(col).step_by(self.n_factors()).copied().collect())
    }

    /// Matrix restricted to `factors`, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFactor`] for a name not in the matrix.
    pub fn select(&self, factors: &[String]) -> Result<Self> {
        let cols = factors
            .iter()
            .map(|f| self.factor_index(f).ok_or_else(|| Error::UnknownFactor(f.clone())))
            .collect::<Result<Vec<_>>>()?;

        let k = self.n_factors();
        let mut values = Vec::with_capacity(self.n_samples() * cols.len());
        for row in self.values.chunks_exact(k.max(1)).take(self.n_samples()) {
            values.extend(cols.iter().map(|&c| row[c]));
        }
        Self::new(self.samples.clone(), factors.to_vec(), values)
    }
}

/// One view of the training data: a feature x sample table.
///
/// Each view carries its own sample columns, which need not match the
/// model's sample order or cover every sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewTable {
    name: String,
    features: Vec<String>,
    samples: Vec<String>,
    values: Vec<f32>,
}

impl ViewTable {
    /// Create a view from row-major values (one row per feature).
    ///
    /// # Errors
    ///
    /// Fails on a length mismatch or duplicate sample columns.
    pub fn new(
        name: &str,
        features: Vec<String>,
        samples: Vec<String>,
        values: Vec<f32>,
    ) -> Result<Self> {
        let expected = features.len() * samples.len();
        if values.len() != expected {
            return Err(Error::DataLengthMismatch {
                x_len: expected,
                y_len: values.len(),
            });
        }
        ensure_unique("sample", &samples)?;
        Ok(Self {
            name: name.to_string(),
            features,
            samples,
            values,
        })
    }

    /// View name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Feature names (row labels).
    #[must_use]
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Sample identifiers (column labels).
    #[must_use]
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    /// Values of one feature row, in this view's sample order.
    #[must_use]
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        let n = self.samples.len();
        self.values.get(row * n..(row + 1) * n)
    }
}
