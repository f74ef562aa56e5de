//! In-memory model: factor values, training views and covariates held directly.

use super::{ensure_unique, FactorMatrix, LatentModel, ViewTable};
use crate::annotation::AnnotationValue;
use crate::error::{Error, Result};

/// A [`LatentModel`] backed by owned tables.
///
/// # Example
///
/// ```
/// use factor_viz::model::{InMemoryModel, LatentModel};
///
/// let model = InMemoryModel::new()
///     .samples(&["s1", "s2", "s3"])
///     .factors(&["Factor1", "Factor2"], vec![0.1, 1.0, -0.4, 0.2, 0.9, -1.3])
///     .build()
///     .unwrap();
/// assert_eq!(model.sample_names().len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryModel {
    samples: Vec<String>,
    factor_names: Vec<String>,
    factor_values: Vec<f32>,
    intercept: bool,
    views: Vec<ViewTable>,
    covariates: Vec<(String, Vec<AnnotationValue>)>,
    matrix: Option<FactorMatrix>,
}

impl InMemoryModel {
    /// Create an empty model builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sample identifiers, in model order.
    #[must_use]
    pub fn samples(mut self, samples: &[&str]) -> Self {
        self.samples = samples.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Set factor names and row-major (sample x factor) values.
    #[must_use]
    pub fn factors(mut self, names: &[&str], values: Vec<f32>) -> Self {
        self.factor_names = names.iter().map(|s| (*s).to_string()).collect();
        self.factor_values = values;
        self
    }

    /// Mark the first factor as the intercept.
    #[must_use]
    pub fn intercept(mut self, intercept: bool) -> Self {
        self.intercept = intercept;
        self
    }

    /// Append a training view (declared order is append order).
    #[must_use]
    pub fn view(mut self, view: ViewTable) -> Self {
        self.views.push(view);
        self
    }

    /// Add a covariate aligned to the model's sample order.
    #[must_use]
    pub fn covariate(mut self, name: &str, values: Vec<AnnotationValue>) -> Self {
        self.covariates.push((name.to_string(), values));
        self
    }

    /// Validate and finish the model.
    ///
    /// # Errors
    ///
    /// Fails when there are no samples, factor values do not fill the
    /// sample x factor grid, names repeat, or a covariate has the wrong length.
    pub fn build(mut self) -> Result<Self> {
        if self.samples.is_empty() || self.factor_names.is_empty() {
            return Err(Error::EmptyData);
        }
        ensure_unique("sample", &self.samples)?;

        for (name, values) in &self.covariates {
            if values.len() != self.samples.len() {
                return Err(Error::InvalidSpecification(format!(
                    "covariate '{name}' has {} values for {} samples",
                    values.len(),
                    self.samples.len()
                )));
            }
        }

        self.matrix = Some(FactorMatrix::new(
            self.samples.clone(),
            self.factor_names.clone(),
            std::mem::take(&mut self.factor_values),
        )?);
        Ok(self)
    }
}

impl LatentModel for InMemoryModel {
    fn factor_names(&self) -> &[String] {
        &self.factor_names
    }

    fn sample_names(&self) -> &[String] {
        &self.samples
    }

    fn has_intercept(&self) -> bool {
        self.intercept
    }

    fn factors(&self, factors: &[String]) -> Result<FactorMatrix> {
        let matrix = self.matrix.as_ref().ok_or(Error::EmptyData)?;
        matrix.select(factors)
    }

    fn train_data(&self) -> &[ViewTable] {
        &self.views
    }

    fn covariate(&self, name: &str) -> Option<Vec<(String, AnnotationValue)>> {
        let (_, values) = self.covariates.iter().find(|(n, _)| n == name)?;
        Some(self.samples.iter().cloned().zip(values.iter().cloned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> InMemoryModel {
        InMemoryModel::new()
            .samples(&["s1", "s2"])
            .factors(&["intercept", "Factor1"], vec![1.0, 0.5, 1.0, -0.5])
            .intercept(true)
            .covariate("sex", vec!["F".into(), "M".into()])
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_and_query() {
        let m = model();
        assert_eq!(m.intercept_name(), Some("intercept"));
        let f = LatentModel::factors(&m, &["Factor1".to_string()]).unwrap();
        assert_eq!(f.column(0).unwrap(), vec![0.5, -0.5]);
    }

    #[test]
    fn test_covariate_lookup() {
        let m = model();
        let sex = LatentModel::covariate(&m, "sex").unwrap();
        assert_eq!(sex[1], ("s2".to_string(), AnnotationValue::from("M")));
        assert!(LatentModel::covariate(&m, "age").is_none());
    }

    #[test]
    fn test_build_rejects_short_covariate() {
        let err = InMemoryModel::new()
            .samples(&["s1", "s2"])
            .factors(&["Factor1"], vec![0.0, 1.0])
            .covariate("age", vec![AnnotationValue::Number(30.0)])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSpecification(_)));
    }

    #[test]
    fn test_build_rejects_empty() {
        assert!(matches!(InMemoryModel::new().build(), Err(Error::EmptyData)));
    }

    #[test]
    fn test_unbuilt_model_has_no_factors() {
        let m = InMemoryModel::new().samples(&["s1"]).factors(&["F1"], vec![1.0]);
        assert!(LatentModel::factors(&m, &["F1".to_string()]).is_err());
    }
}
