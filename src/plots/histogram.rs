//! Factor histogram, grouped by a discrete annotation.
//!
//! Groups are drawn as overlapping semi-transparent bars on a shared set of
//! bins.

use batuta_common::display::WithDimensions;
use tracing::debug;

use trueno_viz::framebuffer::Framebuffer;

use super::{
    bin_edges, bin_index, draw_legend, AnnotationArg, LegendEntry, Palette, Panel, BAR_COLOR,
};
use crate::annotation::{
    Aesthetic, AmbiguityPolicy, AnnotationSpec, AnnotationValue, ResolvedAnnotation,
};
use crate::color::{Rgba, MISSING};
use crate::error::{Error, Result};
use crate::factors::{expect_exactly, select_factors, FactorSelection};
use crate::frame::{ensure_rows, PlotFrame};
use crate::model::LatentModel;
use crate::render::blend_rect;
use crate::scale::{LinearScale, Scale};

#[cfg(feature = "config")]
use crate::config::PlotSettings;

/// How bin edges are chosen.
///
/// Either form may yield at most [`MAX_BINS`](super::MAX_BINS) bins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinSpec {
    /// Fixed number of equal-width bins.
    Count(usize),
    /// Fixed bin width in data units.
    Width(f32),
}

impl Default for BinSpec {
    fn default() -> Self {
        BinSpec::Count(30)
    }
}

/// Builder for a single-factor histogram.
///
/// # Example
///
/// ```
/// use factor_viz::model::InMemoryModel;
/// use factor_viz::plots::FactorHistogram;
///
/// let model = InMemoryModel::new()
///     .samples(&["a", "b", "c", "d"])
///     .factors(&["Factor1"], vec![0.1, 0.4, -0.3, 0.9])
///     .build()
///     .unwrap();
///
/// let chart = FactorHistogram::new(&model)
///     .factor("Factor1")
///     .group_by(factor_viz::annotation::AnnotationSpec::labels(&["x", "x", "y", "y"]))
///     .build()
///     .unwrap();
/// assert_eq!(chart.series().len(), 2);
/// ```
#[derive(Clone)]
pub struct FactorHistogram<'a> {
    model: &'a dyn LatentModel,
    factor: FactorSelection,
    group: AnnotationArg,
    ambiguity: AmbiguityPolicy,
    show_missing: bool,
    bins: BinSpec,
    alpha: f32,
    width: u32,
    height: u32,
    margin: u32,
}

impl<'a> FactorHistogram<'a> {
    /// Create a histogram builder over `model`.
    #[must_use]
    pub fn new(model: &'a dyn LatentModel) -> Self {
        Self {
            model,
            factor: FactorSelection::All,
            group: AnnotationArg::default(),
            ambiguity: AmbiguityPolicy::default(),
            show_missing: false,
            bins: BinSpec::default(),
            alpha: 0.6,
            width: 800,
            height: 600,
            margin: 40,
        }
    }

    /// Select the factor to plot (exactly one).
    #[must_use]
    pub fn factor(mut self, factor: impl Into<FactorSelection>) -> Self {
        self.factor = factor.into();
        self
    }

    /// Group samples by an annotation.
    #[must_use]
    pub fn group_by(mut self, spec: impl Into<AnnotationSpec>) -> Self {
        self.group.spec = spec.into();
        self
    }

    /// Legend title for the grouping annotation.
    #[must_use]
    pub fn group_name(mut self, name: &str) -> Self {
        self.group.display_name = Some(name.to_string());
        self
    }

    /// Policy for names found in several views.
    #[must_use]
    pub fn ambiguity(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity = policy;
        self
    }

    /// Keep samples whose group is missing.
    #[must_use]
    pub fn show_missing(mut self, show: bool) -> Self {
        self.show_missing = show;
        self
    }

    /// Set the binning.
    #[must_use]
    pub fn bins(mut self, bins: BinSpec) -> Self {
        self.bins = bins;
        self
    }

    /// Set the bar opacity (0 to 1).
    #[must_use]
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    /// Set the output dimensions.
    #[must_use]
    pub fn dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the margin around the plot area.
    #[must_use]
    pub fn margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    /// Apply shared plot settings.
    #[cfg(feature = "config")]
    #[must_use]
    pub fn apply_settings(mut self, settings: &PlotSettings) -> Self {
        self.set_dimensions(settings.width, settings.height);
        self.bins = BinSpec::Count(settings.bins);
        self.alpha = settings.alpha;
        self.ambiguity = settings.ambiguity();
        if let Some(show) = settings.show_missing {
            self.show_missing = show;
        }
        self
    }

    /// Select the factor, resolve the grouping and bin the values.
    ///
    /// # Errors
    ///
    /// Fails when the selection is not exactly one factor, the grouping
    /// cannot be resolved, or no finite values remain after filtering.
    pub fn build(self) -> Result<BuiltHistogram> {
        let factors = select_factors(self.model, &self.factor)?;
        expect_exactly(&factors, 1)?;
        let group = self.group.resolve(self.model, Aesthetic::Group, self.ambiguity)?;

        let matrix = self.model.factors(&factors)?;
        let frame = PlotFrame::from_factors(&matrix)
            .join(&group)
            .filter_missing(self.show_missing);
        ensure_rows(&frame)?;

        let values = frame.factor_at(0).ok_or(Error::EmptyData)?;
        let column = frame.annotation_column(0).ok_or(Error::EmptyData)?;
        let edges = bin_edges(values, self.bins)?;

        let palette = Palette::for_annotation(&group);
        let series = count_series(values, column, &group, &palette, &edges);
        debug!(
            factor = %factors[0],
            bins = edges.len() - 1,
            groups = series.len(),
            "built histogram"
        );

        Ok(BuiltHistogram {
            frame,
            group,
            edges,
            series,
            alpha: self.alpha,
            width: self.width,
            height: self.height,
            margin: self.margin,
        })
    }
}

/// Bin `values` into one series per level of `groups`.
///
/// Samples whose group is missing go to a trailing `NA` series. Without a
/// categorical, user-supplied grouping every value lands in a single series.
pub(crate) fn count_series(
    values: &[f32],
    groups: &[AnnotationValue],
    annotation: &ResolvedAnnotation,
    palette: &Palette,
    edges: &[f32],
) -> Vec<HistogramSeries> {
    let n_bins = edges.len().saturating_sub(1);
    if !(annotation.show_legend() && annotation.is_categorical()) {
        let mut counts = vec![0; n_bins];
        for bin in values.iter().filter_map(|&v| bin_index(edges, v)) {
            counts[bin] += 1;
        }
        return vec![HistogramSeries {
            label: annotation.name().to_string(),
            color: BAR_COLOR,
            counts,
        }];
    }

    let mut series: Vec<HistogramSeries> = annotation
        .levels()
        .iter()
        .map(|level| HistogramSeries {
            label: level.to_string(),
            color: palette.color(level),
            counts: vec![0; n_bins],
        })
        .collect();
    let mut missing = vec![0; n_bins];

    for (&value, level) in values.iter().zip(groups) {
        let Some(bin) = bin_index(edges, value) else { continue };
        match annotation.level_of(level) {
            Some(i) => series[i].counts[bin] += 1,
            None => missing[bin] += 1,
        }
    }
    if missing.iter().any(|&c| c > 0) {
        series.push(HistogramSeries {
            label: "NA".to_string(),
            color: MISSING,
            counts: missing,
        });
    }
    series
}

/// Draw overlapping bars for every series inside `panel`.
pub(crate) fn draw_bars(
    fb: &mut Framebuffer,
    panel: Panel,
    edges: &[f32],
    series: &[HistogramSeries],
    alpha: f32,
) -> Result<()> {
    let n = edges
        .len()
        .checked_sub(1)
        .filter(|n| *n > 0)
        .ok_or(Error::EmptyData)?;
    let range = (panel.x as f32, (panel.x + panel.width) as f32);
    let x = LinearScale::new((edges[0], edges[n]), range)?;
    let max_count = series
        .iter()
        .flat_map(|s| s.counts.iter().copied())
        .max()
        .unwrap_or(0);
    let y = panel.count_scale(max_count)?;
    let alpha = (alpha * 255.0).round() as u8;

    for s in series {
        let color = s.color.with_alpha(alpha);
        for (bin, &count) in s.counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let x0 = x.scale(edges[bin]).round() as u32;
            let x1 = x.scale(edges[bin + 1]).round() as u32;
            let top = y.scale(count as f32).round() as u32;
            let w = x1.saturating_sub(x0).max(1);
            let h = panel.bottom().saturating_sub(top);
            blend_rect(fb, x0, top, w, h, color);
        }
    }
    Ok(())
}

impl WithDimensions for FactorHistogram<'_> {
    fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

/// Bin counts of one group.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSeries {
    /// Group label (`NA` for samples with a missing group).
    pub label: String,
    /// Bar color.
    pub color: Rgba,
    /// Count per bin.
    pub counts: Vec<usize>,
}

/// A histogram ready to render.
#[derive(Debug, Clone)]
pub struct BuiltHistogram {
    frame: PlotFrame,
    group: ResolvedAnnotation,
    edges: Vec<f32>,
    series: Vec<HistogramSeries>,
    alpha: f32,
    width: u32,
    height: u32,
    margin: u32,
}

impl BuiltHistogram {
    /// The filtered frame the bins were computed from.
    #[must_use]
    pub fn frame(&self) -> &PlotFrame {
        &self.frame
    }

    /// The resolved grouping annotation.
    #[must_use]
    pub fn group(&self) -> &ResolvedAnnotation {
        &self.group
    }

    /// Bin edges (`bin_count() + 1` values).
    #[must_use]
    pub fn edges(&self) -> &[f32] {
        &self.edges
    }

    /// Number of bins.
    #[must_use]
    pub fn bin_count(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }

    /// One series per group level, in level order.
    #[must_use]
    pub fn series(&self) -> &[HistogramSeries] {
        &self.series
    }

    /// Total number of binned samples.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.series.iter().map(|s| s.counts.iter().sum::<usize>()).sum()
    }

    /// Legend swatches, empty when no grouping was requested.
    #[must_use]
    pub fn legend(&self) -> Vec<LegendEntry> {
        if !self.group.show_legend() {
            return Vec::new();
        }
        self.series
            .iter()
            .map(|s| LegendEntry {
                label: s.label.clone(),
                color: s.color,
                shape: None,
            })
            .collect()
    }

    /// Render into an existing framebuffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the plot area is degenerate.
    pub fn render(&self, fb: &mut Framebuffer) -> Result<()> {
        let legend = self.legend();
        let area = Panel::plot_area(self.width, self.height, self.margin, !legend.is_empty())?;

        draw_bars(fb, area, &self.edges, &self.series, self.alpha)?;
        area.draw_axes(fb);
        draw_legend(fb, area, &legend, 4);
        Ok(())
    }

    /// Render to a new framebuffer.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn to_framebuffer(&self) -> Result<Framebuffer> {
        let mut fb = Framebuffer::new(self.width, self.height)?;
        fb.clear(Rgba::WHITE);
        self.render(&mut fb)?;
        Ok(fb)
    }
}
