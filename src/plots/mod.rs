//! Factor plot entry points.
//!
//! Every chart follows the same two-step builder API: configure a builder
//! borrowing a [`LatentModel`], call `build()` to select factors, resolve
//! annotations and assemble the [`PlotFrame`](crate::frame::PlotFrame),
//! then render the built chart with `to_framebuffer()`.

mod beeswarm;
mod correlation;
mod histogram;
mod pairs;
mod scatter;

pub use beeswarm::{swarm_offsets, BuiltBeeswarm, FactorBeeswarm, SwarmPoint};
pub use correlation::{BuiltCorrelation, FactorCorrelation};
pub use histogram::{BinSpec, BuiltHistogram, FactorHistogram, HistogramSeries};
pub use pairs::{BuiltPairs, FactorPairs};
pub use scatter::{BuiltScatter, FactorScatter};

use trueno_viz::framebuffer::Framebuffer;

use crate::annotation::{
    Aesthetic, AmbiguityPolicy, AnnotationResolver, AnnotationScale, AnnotationSpec,
    AnnotationValue, ResolvedAnnotation,
};
use crate::color::{Rgba, MISSING, POINT};
use crate::error::{Error, Result};
use crate::model::LatentModel;
use crate::render::{draw_line, draw_marker, MarkerShape};
use crate::scale::{
    finite_extent, linear_from_data, pad_extent, ColorScale, DiscreteScale, LinearScale, Scale,
};

const AXIS_COLOR: Rgba = Rgba::rgb(90, 90, 90);
pub(crate) const BAR_COLOR: Rgba = Rgba::rgb(70, 130, 180);
const LEGEND_WIDTH: u32 = 24;

/// Largest number of histogram bins a [`BinSpec`] may produce.
pub const MAX_BINS: usize = 10_000;

/// An annotation argument as given to a builder.
#[derive(Debug, Clone, Default)]
pub(crate) struct AnnotationArg {
    pub(crate) spec: AnnotationSpec,
    pub(crate) display_name: Option<String>,
}

impl AnnotationArg {
    pub(crate) fn resolve(
        &self,
        model: &dyn LatentModel,
        aesthetic: Aesthetic,
        ambiguity: AmbiguityPolicy,
    ) -> Result<ResolvedAnnotation> {
        let mut resolver = AnnotationResolver::new(model).ambiguity(ambiguity);
        if let Some(name) = &self.display_name {
            resolver = resolver.display_name(name.clone());
        }
        resolver.resolve(&self.spec, aesthetic)
    }
}

/// One legend swatch.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    /// Level label.
    pub label: String,
    /// Swatch color.
    pub color: Rgba,
    /// Marker shape, for shape legends.
    pub shape: Option<MarkerShape>,
}

/// Maps annotation values to colors.
#[derive(Debug, Clone)]
pub(crate) enum Palette {
    Constant(Rgba),
    Discrete {
        levels: Vec<AnnotationValue>,
        scale: DiscreteScale,
    },
    Gradient(ColorScale),
}

impl Palette {
    pub(crate) fn for_annotation(annotation: &ResolvedAnnotation) -> Self {
        if !annotation.show_legend() {
            return Palette::Constant(POINT);
        }
        match annotation.scale() {
            AnnotationScale::Categorical { levels } => match DiscreteScale::hue(levels.len()) {
                Ok(scale) => Palette::Discrete {
                    levels: levels.clone(),
                    scale,
                },
                Err(_) => Palette::Constant(MISSING),
            },
            AnnotationScale::Continuous { min, max } => {
                ColorScale::viridis(pad_extent((*min, *max)))
                    .map_or(Palette::Constant(POINT), Palette::Gradient)
            }
        }
    }

    pub(crate) fn color(&self, value: &AnnotationValue) -> Rgba {
        if value.is_missing() {
            return MISSING;
        }
        match self {
            Palette::Constant(color) => *color,
            Palette::Discrete { levels, scale } => levels
                .iter()
                .position(|l| l == value)
                .map_or(MISSING, |i| scale.scale(i)),
            Palette::Gradient(scale) => value.as_f32().map_or(MISSING, |v| scale.scale(v)),
        }
    }

    pub(crate) fn legend(&self) -> Vec<LegendEntry> {
        match self {
            Palette::Discrete { levels, scale } => levels
                .iter()
                .enumerate()
                .map(|(i, level)| LegendEntry {
                    label: level.to_string(),
                    color: scale.scale(i),
                    shape: None,
                })
                .collect(),
            Palette::Constant(_) | Palette::Gradient(_) => Vec::new(),
        }
    }
}

/// Marker shape for a value of a shape annotation.
pub(crate) fn shape_of(annotation: &ResolvedAnnotation, value: &AnnotationValue) -> MarkerShape {
    if !annotation.show_legend() {
        return MarkerShape::default();
    }
    annotation
        .level_of(value)
        .map_or(MarkerShape::default(), MarkerShape::for_level)
}

pub(crate) fn shape_legend(annotation: &ResolvedAnnotation) -> Vec<LegendEntry> {
    if !annotation.show_legend() {
        return Vec::new();
    }
    annotation
        .levels()
        .iter()
        .enumerate()
        .map(|(i, level)| LegendEntry {
            label: level.to_string(),
            color: POINT,
            shape: Some(MarkerShape::for_level(i)),
        })
        .collect()
}

/// Rectangular drawing area in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Panel {
    pub(crate) x: u32,
    pub(crate) y: u32,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl Panel {
    /// Plot area inside `margin`, leaving room for a legend column when asked.
    pub(crate) fn plot_area(width: u32, height: u32, margin: u32, legend: bool) -> Result<Self> {
        let legend_width = if legend { LEGEND_WIDTH } else { 0 };
        let inner_w = width.checked_sub(2 * margin + legend_width).filter(|w| *w > 0);
        let inner_h = height.checked_sub(2 * margin).filter(|h| *h > 0);
        match (inner_w, inner_h) {
            (Some(w), Some(h)) => Ok(Self {
                x: margin,
                y: margin,
                width: w,
                height: h,
            }),
            _ => Err(Error::InvalidDimensions { width, height }),
        }
    }

    /// Split into `n` equal columns separated by `gap` pixels.
    pub(crate) fn columns(self, n: usize, gap: u32) -> Vec<Self> {
        let n32 = n.max(1) as u32;
        let total_gap = gap * (n32 - 1);
        let w = self.width.saturating_sub(total_gap) / n32;
        (0..n32)
            .map(|i| Self {
                x: self.x + i * (w + gap),
                y: self.y,
                width: w.max(1),
                height: self.height,
            })
            .collect()
    }

    /// Cell (`row`, `col`) of an `n` x `n` grid separated by `gap` pixels.
    pub(crate) fn cell(self, row: usize, col: usize, n: usize, gap: u32) -> Self {
        let n32 = n.max(1) as u32;
        let total_gap = gap * (n32 - 1);
        let w = (self.width.saturating_sub(total_gap) / n32).max(1);
        let h = (self.height.saturating_sub(total_gap) / n32).max(1);
        Self {
            x: self.x + col as u32 * (w + gap),
            y: self.y + row as u32 * (h + gap),
            width: w,
            height: h,
        }
    }

    pub(crate) fn x_scale(&self, data: &[f32]) -> Option<LinearScale> {
        linear_from_data(data, (self.x as f32, (self.x + self.width) as f32))
    }

    /// Vertical scale; larger values are drawn higher.
    pub(crate) fn y_scale(&self, data: &[f32]) -> Option<LinearScale> {
        linear_from_data(data, ((self.y + self.height) as f32, self.y as f32))
    }

    pub(crate) fn count_scale(&self, max_count: usize) -> Result<LinearScale> {
        let range = ((self.y + self.height) as f32, self.y as f32);
        Ok(LinearScale::new((0.0, max_count.max(1) as f32), range)?)
    }

    pub(crate) fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub(crate) fn draw_axes(&self, fb: &mut Framebuffer) {
        let (x0, y0) = (self.x as i32, self.y as i32);
        let (x1, y1) = ((self.x + self.width) as i32, (self.y + self.height) as i32);
        draw_line(fb, x0, y1, x1, y1, AXIS_COLOR);
        draw_line(fb, x0, y0, x0, y1, AXIS_COLOR);
    }
}

/// Draw legend swatches in a column to the right of `area`.
pub(crate) fn draw_legend(
    fb: &mut Framebuffer,
    area: Panel,
    entries: &[LegendEntry],
    radius: i32,
) {
    let cx = (area.x + area.width + LEGEND_WIDTH / 2) as i32;
    let step = (2 * radius + 6).max(8);
    for (i, entry) in entries.iter().enumerate() {
        let cy = area.y as i32 + step / 2 + i as i32 * step;
        let shape = entry.shape.unwrap_or_default();
        draw_marker(fb, cx, cy, radius.max(3), shape, entry.color);
    }
}

/// Histogram bin edges over the finite extent of `values`.
///
/// Fails with [`Error::EmptyData`] when nothing is finite and with
/// [`Error::InvalidSpecification`] for a zero count, a non-positive width or
/// more than [`MAX_BINS`] bins.
pub(crate) fn bin_edges(values: &[f32], bins: BinSpec) -> Result<Vec<f32>> {
    let (min, max) = pad_extent(finite_extent(values).ok_or(Error::EmptyData)?);
    match bins {
        BinSpec::Count(0) => Err(Error::InvalidSpecification(
            "bin count must be at least 1".to_string(),
        )),
        BinSpec::Count(n) if n > MAX_BINS => Err(too_many_bins(n as f64)),
        BinSpec::Count(n) => {
            let width = (max - min) / n as f32;
            Ok((0..=n).map(|i| min + i as f32 * width).collect())
        }
        BinSpec::Width(w) if !(w.is_finite() && w > 0.0) => Err(Error::InvalidSpecification(
            format!("bin width must be positive, got {w}"),
        )),
        BinSpec::Width(w) => {
            let n = (f64::from(max - min) / f64::from(w)).ceil().max(1.0);
            if !n.is_finite() || n > MAX_BINS as f64 {
                return Err(too_many_bins(n));
            }
            let n = n as usize;
            Ok((0..=n).map(|i| min + i as f32 * w).collect())
        }
    }
}

fn too_many_bins(n: f64) -> Error {
    Error::InvalidSpecification(format!("{n} bins requested, at most {MAX_BINS} supported"))
}

/// Bin index of `value` for `edges`; the last bin is closed.
pub(crate) fn bin_index(edges: &[f32], value: f32) -> Option<usize> {
    let n = edges.len().checked_sub(1).filter(|n| *n > 0)?;
    let (min, max) = (edges[0], edges[n]);
    if !value.is_finite() || value < min || value > max {
        return None;
    }
    let width = (max - min) / n as f32;
    Some((((value - min) / width).floor() as usize).min(n - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::resolve;
    use crate::model::InMemoryModel;

    fn model() -> InMemoryModel {
        InMemoryModel::new()
            .samples(&["a", "b", "c"])
            .factors(&["F1"], vec![0.0, 1.0, 2.0])
            .build()
            .unwrap()
    }

    #[test]
    fn test_palette_discrete_and_missing() {
        let m = model();
        let spec = vec!["x".into(), "y".into(), AnnotationValue::Missing].into();
        let ann = resolve(&m, &spec, Aesthetic::Color).unwrap();
        let palette = Palette::for_annotation(&ann);
        assert_ne!(palette.color(&"x".into()), palette.color(&"y".into()));
        assert_eq!(palette.color(&AnnotationValue::Missing), MISSING);
        assert_eq!(palette.legend().len(), 2);
    }

    #[test]
    fn test_palette_absent_is_constant() {
        let m = model();
        let ann = resolve(&m, &AnnotationSpec::Absent, Aesthetic::Color).unwrap();
        let palette = Palette::for_annotation(&ann);
        assert_eq!(palette.color(&AnnotationValue::Flag(true)), POINT);
        assert!(palette.legend().is_empty());
    }

    #[test]
    fn test_shape_of_levels() {
        let m = model();
        let spec = AnnotationSpec::labels(&["p", "q", "p"]);
        let ann = resolve(&m, &spec, Aesthetic::Shape).unwrap();
        assert_eq!(shape_of(&ann, &"p".into()), MarkerShape::Circle);
        assert_eq!(shape_of(&ann, &"q".into()), MarkerShape::Triangle);
        assert_eq!(shape_legend(&ann).len(), 2);
    }

    #[test]
    fn test_plot_area_rejects_tiny() {
        assert!(Panel::plot_area(50, 50, 40, false).is_err());
        let area = Panel::plot_area(200, 100, 10, true).unwrap();
        assert_eq!(area.width, 200 - 20 - LEGEND_WIDTH);
        assert_eq!(area.height, 80);
    }

    #[test]
    fn test_panel_columns_and_cells() {
        let area = Panel {
            x: 0,
            y: 0,
            width: 100,
            height: 100,
        };
        let cols = area.columns(2, 10);
        assert_eq!(cols[1].x, 55);
        assert_eq!(cols[1].width, 45);
        let cell = area.cell(1, 1, 2, 10);
        assert_eq!((cell.x, cell.y), (55, 55));
    }

    #[test]
    fn test_bin_edges_and_index() {
        let edges = bin_edges(&[0.0, 10.0, f32::NAN], BinSpec::Count(5)).unwrap();
        assert_eq!(edges.len(), 6);
        assert_eq!(bin_index(&edges, 0.0), Some(0));
        assert_eq!(bin_index(&edges, 10.0), Some(4));
        assert_eq!(bin_index(&edges, 3.9), Some(1));
        assert_eq!(bin_index(&edges, f32::NAN), None);

        let edges = bin_edges(&[0.0, 1.0], BinSpec::Width(0.25)).unwrap();
        assert_eq!(edges.len(), 5);
        assert!(bin_edges(&[0.0, 1.0], BinSpec::Width(0.0)).is_err());
        assert!(bin_edges(&[f32::NAN], BinSpec::Count(3)).is_err());
    }

    #[test]
    fn test_bin_edges_rejects_runaway_bin_counts() {
        let tiny = bin_edges(&[0.0, 1.0], BinSpec::Width(1e-30));
        assert!(matches!(tiny, Err(Error::InvalidSpecification(_))));
        let huge = bin_edges(&[0.0, 1.0], BinSpec::Count(usize::MAX));
        assert!(matches!(huge, Err(Error::InvalidSpecification(_))));
        let at_cap = bin_edges(&[0.0, 1.0], BinSpec::Count(MAX_BINS)).unwrap();
        assert_eq!(at_cap.len(), MAX_BINS + 1);
    }
}
