//! Plot frames: factor values joined with resolved annotations.
//!
//! A [`PlotFrame`] is a small columnar table with one row per sample,
//! keyed by sample identifier. [`LongFrame`] is the row-per-(sample, factor)
//! view used by panel-per-factor charts.

use tracing::debug;

use crate::annotation::{AnnotationValue, ResolvedAnnotation};
use crate::error::{Error, Result};
use crate::model::FactorMatrix;

/// Wide frame: one row per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotFrame {
    samples: Vec<String>,
    factor_names: Vec<String>,
    /// Factor columns, each aligned with `samples`.
    factors: Vec<Vec<f32>>,
    annotations: Vec<ResolvedAnnotation>,
    /// Annotation columns, each aligned with `samples`.
    columns: Vec<Vec<AnnotationValue>>,
}

impl PlotFrame {
    /// Frame holding every column of `matrix`.
    #[must_use]
    pub fn from_factors(matrix: &FactorMatrix) -> Self {
        let factors = (0..matrix.n_factors())
            .filter_map(|c| matrix.column(c))
            .collect();
        Self {
            samples: matrix.samples().to_vec(),
            factor_names: matrix.factors().to_vec(),
            factors,
            annotations: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Add an annotation column, matched to rows by sample identifier.
    ///
    /// Rows whose sample is unknown to the annotation get
    /// [`AnnotationValue::Missing`].
    #[must_use]
    pub fn join(mut self, annotation: &ResolvedAnnotation) -> Self {
        let column = self
            .samples
            .iter()
            .map(|s| annotation.get(s).cloned().unwrap_or(AnnotationValue::Missing))
            .collect();
        self.annotations.push(annotation.clone());
        self.columns.push(column);
        self
    }

    /// Apply the missing-value policy.
    ///
    /// With `show_missing = false`, drops every row missing a value in any
    /// annotation column. Factor values are never used for filtering.
    #[must_use]
    pub fn filter_missing(self, show_missing: bool) -> Self {
        if show_missing || self.columns.is_empty() {
            return self;
        }
        let keep: Vec<bool> = (0..self.samples.len())
            .map(|row| self.columns.iter().all(|col| !col[row].is_missing()))
            .collect();
        let dropped = keep.iter().filter(|k| !**k).count();
        if dropped == 0 {
            return self;
        }
        debug!(
            dropped,
            remaining = self.samples.len() - dropped,
            "dropped samples with missing annotation values"
        );
        self.retain_rows(&keep)
    }

    fn retain_rows(self, keep: &[bool]) -> Self {
        fn pick<T: Clone>(values: &[T], keep: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(keep)
                .filter(|(_, k)| **k)
                .map(|(v, _)| v.clone())
                .collect()
        }
        Self {
            samples: pick(&self.samples, keep),
            factors: self.factors.iter().map(|c| pick(c, keep)).collect(),
            columns: self.columns.iter().map(|c| pick(c, keep)).collect(),
            factor_names: self.factor_names,
            annotations: self.annotations,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn nrow(&self) -> usize {
        self.samples.len()
    }

    /// Whether the frame has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Row keys.
    #[must_use]
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    /// Factor column names.
    #[must_use]
    pub fn factor_names(&self) -> &[String] {
        &self.factor_names
    }

    /// Values of one factor column.
    #[must_use]
    pub fn factor(&self, name: &str) -> Option<&[f32]> {
        let idx = self.factor_names.iter().position(|f| f == name)?;
        Some(&self.factors[idx])
    }

    /// Values of the factor column at `idx`.
    #[must_use]
    pub fn factor_at(&self, idx: usize) -> Option<&[f32]> {
        self.factors.get(idx).map(Vec::as_slice)
    }

    /// Joined annotations, in join order.
    #[must_use]
    pub fn annotations(&self) -> &[ResolvedAnnotation] {
        &self.annotations
    }

    /// Values of the annotation column at `idx`, aligned with rows.
    #[must_use]
    pub fn annotation_column(&self, idx: usize) -> Option<&[AnnotationValue]> {
        self.columns.get(idx).map(Vec::as_slice)
    }

    /// Reshape into one row per (sample, factor).
    ///
    /// Non-finite factor values are skipped.
    #[must_use]
    pub fn to_long(&self) -> LongFrame<'_> {
        let mut rows = Vec::with_capacity(self.nrow() * self.factor_names.len());
        for (factor, values) in self.factors.iter().enumerate() {
            for (row, &value) in values.iter().enumerate() {
                if value.is_finite() {
                    rows.push(LongRow {
                        sample: row,
                        factor,
                        value,
                    });
                }
            }
        }
        LongFrame { frame: self, rows }
    }
}

/// One (sample, factor) observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LongRow {
    /// Row index into the wide frame.
    pub sample: usize,
    /// Factor column index into the wide frame.
    pub factor: usize,
    /// Factor value.
    pub value: f32,
}

/// Long view over a [`PlotFrame`].
#[derive(Debug, Clone)]
pub struct LongFrame<'a> {
    frame: &'a PlotFrame,
    rows: Vec<LongRow>,
}

impl LongFrame<'_> {
    /// All observations, grouped by factor.
    #[must_use]
    pub fn rows(&self) -> &[LongRow] {
        &self.rows
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Observations of one factor column.
    pub fn factor_rows(&self, factor: usize) -> impl Iterator<Item = &LongRow> {
        self.rows.iter().filter(move |r| r.factor == factor)
    }

    /// Sample identifier of an observation.
    #[must_use]
    pub fn sample_name(&self, row: &LongRow) -> &str {
        &self.frame.samples[row.sample]
    }

    /// Factor name of an observation.
    #[must_use]
    pub fn factor_name(&self, row: &LongRow) -> &str {
        &self.frame.factor_names[row.factor]
    }

    /// Annotation value of an observation for annotation column `idx`.
    #[must_use]
    pub fn annotation(&self, row: &LongRow, idx: usize) -> Option<&AnnotationValue> {
        self.frame.columns.get(idx).map(|c| &c[row.sample])
    }
}

/// Fail with [`Error::EmptyData`] when filtering removed every row.
pub(crate) fn ensure_rows(frame: &PlotFrame) -> Result<()> {
    if frame.is_empty() {
        Err(Error::EmptyData)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{resolve, Aesthetic, AnnotationSpec};
    use crate::model::{InMemoryModel, LatentModel};

    fn model() -> InMemoryModel {
        InMemoryModel::new()
            .samples(&["s1", "s2", "s3"])
            .factors(&["F1", "F2"], vec![0.1, 1.0, 0.2, f32::NAN, 0.3, 3.0])
            .build()
            .unwrap()
    }

    fn frame(m: &InMemoryModel) -> PlotFrame {
        let matrix = LatentModel::factors(m, m.factor_names()).unwrap();
        PlotFrame::from_factors(&matrix)
    }

    #[test]
    fn test_from_factors_columns() {
        let m = model();
        let f = frame(&m);
        assert_eq!(f.nrow(), 3);
        assert_eq!(f.factor("F1").unwrap(), &[0.1, 0.2, 0.3]);
        assert!(f.factor("F9").is_none());
    }

    #[test]
    fn test_filter_drops_missing_in_any_annotation() {
        let m = model();
        let color_spec = vec!["a".into(), AnnotationValue::Missing, "b".into()].into();
        let color = resolve(&m, &color_spec, Aesthetic::Color).unwrap();
        let shape_spec = vec![AnnotationValue::Missing, "x".into(), "y".into()].into();
        let shape = resolve(&m, &shape_spec, Aesthetic::Shape).unwrap();
        let joined = frame(&m).join(&color).join(&shape);

        let kept = joined.clone().filter_missing(true);
        assert_eq!(kept.nrow(), 3);

        let filtered = joined.filter_missing(false);
        assert_eq!(filtered.samples(), &["s3".to_string()]);
        assert_eq!(filtered.factor("F2").unwrap(), &[3.0]);
        assert_eq!(
            filtered.annotation_column(1).unwrap(),
            &[AnnotationValue::from("y")]
        );
    }

    #[test]
    fn test_factor_nan_is_not_filtered() {
        let m = model();
        let absent = resolve(&m, &AnnotationSpec::Absent, Aesthetic::Color).unwrap();
        let f = frame(&m).join(&absent).filter_missing(false);
        assert_eq!(f.nrow(), 3);
    }

    #[test]
    fn test_long_frame_skips_nan() {
        let m = model();
        let f = frame(&m);
        let long = f.to_long();
        assert_eq!(long.len(), 5);
        assert_eq!(long.factor_rows(1).count(), 2);
        let first = long.rows()[0];
        assert_eq!(long.sample_name(&first), "s1");
        assert_eq!(long.factor_name(&first), "F1");
    }

    #[test]
    fn test_ensure_rows() {
        let m = model();
        let spec = AnnotationSpec::numbers(&[f32::NAN, f32::NAN, f32::NAN]);
        let all_missing = resolve(&m, &spec, Aesthetic::Color).unwrap();
        let f = frame(&m).join(&all_missing).filter_missing(false);
        assert!(matches!(ensure_rows(&f), Err(Error::EmptyData)));
    }
}
