//! Annotation resolution against a model.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::{
    distinct_levels, Aesthetic, AnnotationScale, AnnotationSource, AnnotationSpec, AnnotationValue,
    FeatureIndex, ResolvedAnnotation, MAX_SHAPE_LEVELS,
};
use crate::error::{Error, Result};
use crate::model::{LatentModel, ViewTable};

/// What to do when a name matches features in more than one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmbiguityPolicy {
    /// Use the first matching view in declared view order.
    #[default]
    FirstView,
    /// Fail with [`Error::AmbiguousAnnotationName`].
    Reject,
}

/// Resolves [`AnnotationSpec`]s against one model.
///
/// # Example
///
/// ```
/// use factor_viz::annotation::{Aesthetic, AnnotationResolver, AnnotationSpec};
/// use factor_viz::model::InMemoryModel;
///
/// let model = InMemoryModel::new()
///     .samples(&["s1", "s2"])
///     .factors(&["Factor1"], vec![0.3, -0.2])
///     .build()
///     .unwrap();
///
/// let resolved = AnnotationResolver::new(&model)
///     .resolve(&AnnotationSpec::labels(&["case", "control"]), Aesthetic::Color)
///     .unwrap();
/// assert!(resolved.is_categorical());
/// ```
#[derive(Debug)]
pub struct AnnotationResolver<'a, M: LatentModel + ?Sized> {
    model: &'a M,
    display_name: Option<String>,
    ambiguity: AmbiguityPolicy,
}

impl<'a, M: LatentModel + ?Sized> AnnotationResolver<'a, M> {
    /// Create a resolver for `model`.
    #[must_use]
    pub fn new(model: &'a M) -> Self {
        Self {
            model,
            display_name: None,
            ambiguity: AmbiguityPolicy::default(),
        }
    }

    /// Override the display name (legend title).
    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.display_name = if name.is_empty() { None } else { Some(name) };
        self
    }

    /// Set the multi-view match policy.
    #[must_use]
    pub fn ambiguity(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity = policy;
        self
    }

    /// Resolve `spec` for `aesthetic`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSpecification`] for unknown names, empty or
    ///   single-value explicit vectors, and length mismatches.
    /// - [`Error::AmbiguousAnnotationName`] under [`AmbiguityPolicy::Reject`].
    /// - [`Error::TooManyShapeLevels`] for shape annotations with more
    ///   levels than marker shapes.
    pub fn resolve(
        &self,
        spec: &AnnotationSpec,
        aesthetic: Aesthetic,
    ) -> Result<ResolvedAnnotation> {
        let samples = self.model.sample_names();

        let (values, source, show_legend, default_name) = match spec {
            AnnotationSpec::Absent => (
                vec![AnnotationValue::Flag(true); samples.len()],
                AnnotationSource::Constant,
                false,
                String::new(),
            ),
            AnnotationSpec::Named(name) => {
                let (values, source) = self.lookup_name(name)?;
                (values, source, true, name.clone())
            }
            AnnotationSpec::Explicit(values) => {
                check_explicit_length(values.len(), samples.len())?;
                (values.clone(), AnnotationSource::Explicit, true, String::new())
            }
        };

        let scale = classify(&values, aesthetic)?;
        let name = self.display_name.clone().unwrap_or(default_name);
        debug!(
            %aesthetic,
            name = %name,
            ?source,
            categorical = matches!(scale, AnnotationScale::Categorical { .. }),
            "resolved annotation"
        );

        Ok(ResolvedAnnotation {
            name,
            show_legend,
            aesthetic,
            source,
            samples: samples.to_vec(),
            values,
            scale,
        })
    }

    fn lookup_name(&self, name: &str) -> Result<(Vec<AnnotationValue>, AnnotationSource)> {
        let views = self.model.train_data();
        let index = FeatureIndex::build(views);
        let hits = index.lookup(name);

        if let Some(first) = hits.first() {
            if hits.len() > 1 {
                let view_names: Vec<String> = hits
                    .iter()
                    .map(|h| views[h.view].name().to_string())
                    .collect();
                if self.ambiguity == AmbiguityPolicy::Reject {
                    return Err(Error::AmbiguousAnnotationName {
                        name: name.to_string(),
                        views: view_names,
                    });
                }
                warn!(
                    name,
                    views = ?view_names,
                    "feature name found in several views; using the first"
                );
            }
            let view = &views[first.view];
            let values = align_feature_row(view, first.row, self.model.sample_names());
            let source = AnnotationSource::Feature {
                view: view.name().to_string(),
            };
            return Ok((values, source));
        }

        if let Some(pairs) = self.model.covariate(name) {
            let values = align_pairs(pairs, self.model.sample_names());
            return Ok((values, AnnotationSource::Covariate));
        }

        Err(Error::InvalidSpecification(format!(
            "'{name}' is neither a training feature nor a covariate"
        )))
    }
}

/// Resolve `spec` for `aesthetic` with default resolver options.
///
/// # Errors
///
/// See [`AnnotationResolver::resolve`].
pub fn resolve<M: LatentModel + ?Sized>(
    model: &M,
    spec: &AnnotationSpec,
    aesthetic: Aesthetic,
) -> Result<ResolvedAnnotation> {
    AnnotationResolver::new(model).resolve(spec, aesthetic)
}

fn check_explicit_length(len: usize, n_samples: usize) -> Result<()> {
    match len {
        0 => Err(Error::InvalidSpecification("empty annotation vector".to_string())),
        1 => Err(Error::InvalidSpecification(
            "single-value annotation must be given as a feature or covariate name".to_string(),
        )),
        n if n != n_samples => Err(Error::InvalidSpecification(format!(
            "length mismatch: annotation has {n} values, model has {n_samples} samples"
        ))),
        _ => Ok(()),
    }
}

/// Values of one feature row, keyed by sample identifier.
fn align_feature_row(view: &ViewTable, row: usize, samples: &[String]) -> Vec<AnnotationValue> {
    let Some(values) = view.row(row) else {
        return vec![AnnotationValue::Missing; samples.len()];
    };
    let columns: HashMap<&str, usize> = view
        .samples()
        .iter()
        .enumerate()
        .map(|(i, s)| (s.as_str(), i))
        .collect();

    samples
        .iter()
        .map(|sample| match columns.get(sample.as_str()) {
            Some(&col) if !values[col].is_nan() => AnnotationValue::Number(values[col]),
            _ => AnnotationValue::Missing,
        })
        .collect()
}

fn align_pairs(pairs: Vec<(String, AnnotationValue)>, samples: &[String]) -> Vec<AnnotationValue> {
    let mut by_sample: HashMap<String, AnnotationValue> = pairs.into_iter().collect();
    samples
        .iter()
        .map(|s| by_sample.remove(s).unwrap_or(AnnotationValue::Missing))
        .collect()
}

fn classify(values: &[AnnotationValue], aesthetic: Aesthetic) -> Result<AnnotationScale> {
    let levels = distinct_levels(values);

    if aesthetic == Aesthetic::Shape && levels.len() > MAX_SHAPE_LEVELS {
        return Err(Error::TooManyShapeLevels {
            levels: levels.len(),
            max: MAX_SHAPE_LEVELS,
        });
    }

    let all_numeric = levels.iter().all(|l| matches!(l, AnnotationValue::Number(_)));
    if levels.len() < aesthetic.level_threshold() || !all_numeric {
        return Ok(AnnotationScale::Categorical { levels });
    }

    let numbers: Vec<f32> = levels.iter().filter_map(AnnotationValue::as_f32).collect();
    let min = numbers.iter().copied().fold(f32::INFINITY, f32::min);
    let max = numbers.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    Ok(AnnotationScale::Continuous { min, max })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InMemoryModel;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn model() -> InMemoryModel {
        let mrna = ViewTable::new(
            "mRNA",
            strings(&["TP53", "MYC"]),
            strings(&["s3", "s1"]),
            vec![1.0, 2.0, 10.0, f32::NAN],
        )
        .unwrap();
        let mutations = ViewTable::new(
            "Mutations",
            strings(&["TP53"]),
            strings(&["s1", "s2", "s3"]),
            vec![0.0, 1.0, 1.0],
        )
        .unwrap();

        InMemoryModel::new()
            .samples(&["s1", "s2", "s3"])
            .factors(&["Factor1"], vec![0.1, 0.2, 0.3])
            .view(mrna)
            .view(mutations)
            .covariate("batch", vec!["A".into(), "B".into(), "A".into()])
            .build()
            .unwrap()
    }

    #[test]
    fn test_absent_is_constant_without_legend() {
        let r = resolve(&model(), &AnnotationSpec::Absent, Aesthetic::Color).unwrap();
        assert!(!r.show_legend());
        assert_eq!(r.values(), &[AnnotationValue::Flag(true), AnnotationValue::Flag(true), AnnotationValue::Flag(true)]);
        assert_eq!(r.levels().len(), 1);
        assert_eq!(r.source(), &AnnotationSource::Constant);
    }

    #[test]
    fn test_named_feature_aligned_by_sample_id() {
        let r = resolve(&model(), &"MYC".into(), Aesthetic::Color).unwrap();
        // mRNA columns are (s3, s1): s1 is NaN, s2 absent, s3 = 10
        assert_eq!(
            r.values(),
            &[
                AnnotationValue::Missing,
                AnnotationValue::Missing,
                AnnotationValue::Number(10.0)
            ]
        );
        assert_eq!(r.name(), "MYC");
        assert!(r.show_legend());
    }

    #[test]
    fn test_ambiguous_name_takes_first_view() {
        let r = resolve(&model(), &"TP53".into(), Aesthetic::Color).unwrap();
        assert_eq!(
            r.source(),
            &AnnotationSource::Feature {
                view: "mRNA".to_string()
            }
        );
        assert_eq!(r.get("s3"), Some(&AnnotationValue::Number(1.0)));
    }

    #[test]
    fn test_ambiguous_name_rejected_on_request() {
        let err = AnnotationResolver::new(&model())
            .ambiguity(AmbiguityPolicy::Reject)
            .resolve(&"TP53".into(), Aesthetic::Color)
            .unwrap_err();
        match err {
            Error::AmbiguousAnnotationName { views, .. } => {
                assert_eq!(views, strings(&["mRNA", "Mutations"]));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_covariate_fallback() {
        let r = resolve(&model(), &"batch".into(), Aesthetic::Shape).unwrap();
        assert_eq!(r.source(), &AnnotationSource::Covariate);
        assert_eq!(
            r.levels(),
            &[AnnotationValue::from("A"), AnnotationValue::from("B")]
        );
    }

    #[test]
    fn test_unknown_name() {
        let err = resolve(&model(), &"nope".into(), Aesthetic::Color).unwrap_err();
        assert!(matches!(err, Error::InvalidSpecification(_)));
    }

    #[test]
    fn test_display_name_override() {
        let r = AnnotationResolver::new(&model())
            .display_name("Batch")
            .resolve(&"batch".into(), Aesthetic::Color)
            .unwrap();
        assert_eq!(r.name(), "Batch");
    }

    #[test]
    fn test_explicit_shapes_rejected() {
        let m = model();
        let short = vec![AnnotationValue::Number(1.0), AnnotationValue::Number(2.0)];
        for values in [Vec::new(), vec![AnnotationValue::Number(1.0)], short] {
            let err = resolve(&m, &AnnotationSpec::Explicit(values), Aesthetic::Color).unwrap_err();
            assert!(matches!(err, Error::InvalidSpecification(_)));
        }
    }

    #[test]
    fn test_labels_are_categorical_regardless_of_count() {
        let m = InMemoryModel::new()
            .samples(&["a", "b", "c", "d", "e", "f"])
            .factors(&["F1"], vec![0.0; 6])
            .build()
            .unwrap();
        let spec = AnnotationSpec::labels(&["1", "2", "3", "4", "5", "6"]);
        let r = resolve(&m, &spec, Aesthetic::Color).unwrap();
        assert!(r.is_categorical());
    }

    #[test]
    fn test_continuous_extent() {
        let m = InMemoryModel::new()
            .samples(&["a", "b", "c", "d", "e"])
            .factors(&["F1"], vec![0.0; 5])
            .build()
            .unwrap();
        let spec = AnnotationSpec::numbers(&[3.0, -1.0, 2.0, 8.0, 0.5]);
        let r = resolve(&m, &spec, Aesthetic::Color).unwrap();
        assert_eq!(
            r.scale(),
            &AnnotationScale::Continuous {
                min: -1.0,
                max: 8.0
            }
        );
        assert!(r.levels().is_empty());
    }

    #[test]
    fn test_group_is_always_categorical() {
        let m = InMemoryModel::new()
            .samples(&["a", "b", "c", "d", "e", "f", "g", "h"])
            .factors(&["F1"], vec![0.0; 8])
            .build()
            .unwrap();
        let values: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let r = resolve(&m, &AnnotationSpec::numbers(&values), Aesthetic::Group).unwrap();
        assert_eq!(r.levels().len(), 8);
    }
}
