//! Per-sample annotations for color, shape and grouping aesthetics.
//!
//! Every plot entry point turns a user-supplied [`AnnotationSpec`] into a
//! [`ResolvedAnnotation`] through the [`AnnotationResolver`]. The resolved
//! value carries everything the renderer needs: values aligned to the
//! model's sample order, whether a legend is shown, the display name, and
//! whether the values map to discrete levels or a gradient.

mod index;
mod resolve;

pub use index::{FeatureIndex, FeatureLocation};
pub use resolve::{resolve, AmbiguityPolicy, AnnotationResolver};

use std::cmp::Ordering;
use std::fmt;

/// Distinct-value count below which a color annotation is categorical.
pub const COLOR_LEVEL_THRESHOLD: usize = 5;

/// Distinct-value count below which a shape annotation is categorical.
pub const SHAPE_LEVEL_THRESHOLD: usize = 7;

/// Largest number of shape levels the renderer can distinguish.
pub const MAX_SHAPE_LEVELS: usize = SHAPE_LEVEL_THRESHOLD - 1;

/// A single per-sample annotation value.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    /// A numeric value. `NaN` counts as missing.
    Number(f32),
    /// A categorical label.
    Label(String),
    /// A boolean value.
    Flag(bool),
    /// Not available.
    Missing,
}

impl AnnotationValue {
    /// Whether the value is not available.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            AnnotationValue::Missing => true,
            AnnotationValue::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Get as f32, or None if not a number.
    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            AnnotationValue::Number(n) if !n.is_nan() => Some(*n),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            AnnotationValue::Number(_) => 0,
            AnnotationValue::Flag(_) => 1,
            AnnotationValue::Label(_) => 2,
            AnnotationValue::Missing => 3,
        }
    }

    /// Total order used to sort levels: numbers ascending, then flags, then labels.
    fn level_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (AnnotationValue::Number(a), AnnotationValue::Number(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (AnnotationValue::Flag(a), AnnotationValue::Flag(b)) => a.cmp(b),
            (AnnotationValue::Label(a), AnnotationValue::Label(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationValue::Number(n) if n.is_nan() => write!(f, "NA"),
            AnnotationValue::Number(n) => write!(f, "{n}"),
            AnnotationValue::Label(s) => write!(f, "{s}"),
            AnnotationValue::Flag(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            AnnotationValue::Missing => write!(f, "NA"),
        }
    }
}

impl From<f32> for AnnotationValue {
    fn from(v: f32) -> Self {
        AnnotationValue::Number(v)
    }
}

impl From<&str> for AnnotationValue {
    fn from(s: &str) -> Self {
        AnnotationValue::Label(s.to_string())
    }
}

impl From<String> for AnnotationValue {
    fn from(s: String) -> Self {
        AnnotationValue::Label(s)
    }
}

impl From<bool> for AnnotationValue {
    fn from(b: bool) -> Self {
        AnnotationValue::Flag(b)
    }
}

impl<T: Into<AnnotationValue>> From<Option<T>> for AnnotationValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(AnnotationValue::Missing, Into::into)
    }
}

/// What the caller asked to annotate samples with.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AnnotationSpec {
    /// No annotation requested.
    #[default]
    Absent,
    /// A training-data feature name or a covariate name.
    Named(String),
    /// One value per sample, in the model's declared sample order.
    Explicit(Vec<AnnotationValue>),
}

impl AnnotationSpec {
    /// Explicit numeric values.
    #[must_use]
    pub fn numbers(values: &[f32]) -> Self {
        AnnotationSpec::Explicit(values.iter().map(|&v| AnnotationValue::Number(v)).collect())
    }

    /// Explicit categorical labels.
    #[must_use]
    pub fn labels<S: AsRef<str>>(labels: &[S]) -> Self {
        AnnotationSpec::Explicit(labels.iter().map(|s| AnnotationValue::from(s.as_ref())).collect())
    }

    /// Whether no annotation was requested.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, AnnotationSpec::Absent)
    }
}

impl From<&str> for AnnotationSpec {
    fn from(name: &str) -> Self {
        AnnotationSpec::Named(name.to_string())
    }
}

impl From<String> for AnnotationSpec {
    fn from(name: String) -> Self {
        AnnotationSpec::Named(name)
    }
}

impl From<Vec<AnnotationValue>> for AnnotationSpec {
    fn from(values: Vec<AnnotationValue>) -> Self {
        AnnotationSpec::Explicit(values)
    }
}

/// Visual channel an annotation is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aesthetic {
    /// Point color (discrete palette or gradient).
    Color,
    /// Point marker shape (discrete only).
    Shape,
    /// Histogram grouping (always discrete).
    Group,
}

impl Aesthetic {
    /// Distinct-value count at which the aesthetic stops being categorical.
    #[must_use]
    pub const fn level_threshold(self) -> usize {
        match self {
            Aesthetic::Color => COLOR_LEVEL_THRESHOLD,
            Aesthetic::Shape => SHAPE_LEVEL_THRESHOLD,
            Aesthetic::Group => usize::MAX,
        }
    }
}

impl fmt::Display for Aesthetic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aesthetic::Color => "color",
            Aesthetic::Shape => "shape",
            Aesthetic::Group => "group",
        };
        f.write_str(name)
    }
}

/// Where resolved values came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationSource {
    /// No annotation requested; every sample has the same value.
    Constant,
    /// A feature row of a training view.
    Feature {
        /// View name.
        view: String,
    },
    /// A covariate supplied by the model.
    Covariate,
    /// Values passed in by the caller.
    Explicit,
}

/// How values map to the visual channel.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationScale {
    /// Discrete levels, sorted (numbers ascending, then flags, then labels).
    Categorical {
        /// Distinct non-missing values.
        levels: Vec<AnnotationValue>,
    },
    /// Gradient between the finite extent of the values.
    Continuous {
        /// Smallest value.
        min: f32,
        /// Largest value.
        max: f32,
    },
}

/// An annotation resolved against a model's samples.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAnnotation {
    name: String,
    show_legend: bool,
    aesthetic: Aesthetic,
    source: AnnotationSource,
    samples: Vec<String>,
    values: Vec<AnnotationValue>,
    scale: AnnotationScale,
}

impl ResolvedAnnotation {
    /// Display name used as legend title.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a legend should be drawn.
    #[must_use]
    pub fn show_legend(&self) -> bool {
        self.show_legend
    }

    /// Aesthetic this annotation was resolved for.
    #[must_use]
    pub fn aesthetic(&self) -> Aesthetic {
        self.aesthetic
    }

    /// Origin of the values.
    #[must_use]
    pub fn source(&self) -> &AnnotationSource {
        &self.source
    }

    /// Scale decision.
    #[must_use]
    pub fn scale(&self) -> &AnnotationScale {
        &self.scale
    }

    /// Whether values map to discrete levels.
    #[must_use]
    pub fn is_categorical(&self) -> bool {
        matches!(self.scale, AnnotationScale::Categorical { .. })
    }

    /// Discrete levels (empty for continuous annotations).
    #[must_use]
    pub fn levels(&self) -> &[AnnotationValue] {
        match &self.scale {
            AnnotationScale::Categorical { levels } => levels,
            AnnotationScale::Continuous { .. } => &[],
        }
    }

    /// Index of `value` among the levels.
    #[must_use]
    pub fn level_of(&self, value: &AnnotationValue) -> Option<usize> {
        self.levels().iter().position(|l| l == value)
    }

    /// Sample identifiers, in model order.
    #[must_use]
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    /// Values, aligned with [`samples`](Self::samples).
    #[must_use]
    pub fn values(&self) -> &[AnnotationValue] {
        &self.values
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value for one sample.
    #[must_use]
    pub fn get(&self, sample: &str) -> Option<&AnnotationValue> {
        self.samples.iter().position(|s| s == sample).map(|i| &self.values[i])
    }

    /// (sample, value) pairs in model order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnnotationValue)> {
        self.samples.iter().map(String::as_str).zip(self.values.iter())
    }

    /// Number of missing values.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }

    /// The values as an explicit specification, for re-resolution.
    #[must_use]
    pub fn to_spec(&self) -> AnnotationSpec {
        AnnotationSpec::Explicit(self.values.clone())
    }
}

/// Distinct non-missing values, sorted by level order.
#[must_use]
pub fn distinct_levels(values: &[AnnotationValue]) -> Vec<AnnotationValue> {
    let mut levels: Vec<AnnotationValue> =
        values.iter().filter(|v| !v.is_missing()).cloned().collect();
    levels.sort_by(AnnotationValue::level_cmp);
    levels.dedup_by(|a, b| a.level_cmp(b) == Ordering::Equal);
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_values() {
        assert!(AnnotationValue::Missing.is_missing());
        assert!(AnnotationValue::Number(f32::NAN).is_missing());
        assert!(!AnnotationValue::Number(0.0).is_missing());
        assert!(!AnnotationValue::from("x").is_missing());
        assert_eq!(AnnotationValue::Number(f32::NAN).as_f32(), None);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(AnnotationValue::from(None::<f32>), AnnotationValue::Missing);
        assert_eq!(AnnotationValue::from(Some("M")), AnnotationValue::Label("M".to_string()));
    }

    #[test]
    fn test_distinct_levels_sorted_and_deduped() {
        let values = vec![
            AnnotationValue::from("U"),
            AnnotationValue::Number(2.0),
            AnnotationValue::Missing,
            AnnotationValue::from("M"),
            AnnotationValue::Number(-1.0),
            AnnotationValue::Number(2.0),
            AnnotationValue::from("U"),
            AnnotationValue::Flag(true),
        ];
        let levels = distinct_levels(&values);
        assert_eq!(
            levels,
            vec![
                AnnotationValue::Number(-1.0),
                AnnotationValue::Number(2.0),
                AnnotationValue::Flag(true),
                AnnotationValue::from("M"),
                AnnotationValue::from("U"),
            ]
        );
    }

    #[test]
    fn test_distinct_levels_ignores_nan() {
        let values = vec![AnnotationValue::Number(f32::NAN), AnnotationValue::Number(f32::NAN)];
        assert!(distinct_levels(&values).is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(AnnotationValue::Number(1.5).to_string(), "1.5");
        assert_eq!(AnnotationValue::Flag(false).to_string(), "FALSE");
        assert_eq!(AnnotationValue::Missing.to_string(), "NA");
    }

    #[test]
    fn test_spec_constructors() {
        assert!(AnnotationSpec::default().is_absent());
        assert_eq!(AnnotationSpec::from("IGHV"), AnnotationSpec::Named("IGHV".to_string()));
        assert_eq!(
            AnnotationSpec::labels(&["a", "b"]),
            AnnotationSpec::Explicit(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(Aesthetic::Color.level_threshold(), 5);
        assert_eq!(Aesthetic::Shape.level_threshold(), 7);
        assert_eq!(MAX_SHAPE_LEVELS, crate::render::MarkerShape::ALL.len());
    }
}
