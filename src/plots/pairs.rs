//! Pairwise scatterplot matrix.
//!
//! Off-diagonal cells plot factor `col` against factor `row`; diagonal
//! cells show the histogram of that factor, split by color level when the
//! color annotation is categorical.

use batuta_common::display::WithDimensions;
use tracing::debug;
use trueno_viz::framebuffer::Framebuffer;

use super::histogram::{count_series, draw_bars, HistogramSeries};
use super::{
    bin_edges, draw_legend, shape_legend, shape_of, AnnotationArg, BinSpec, LegendEntry, Palette,
    Panel,
};
use crate::annotation::{Aesthetic, AmbiguityPolicy, AnnotationSpec, ResolvedAnnotation};
use crate::color::{Rgba, POINT};
use crate::error::{Error, Result};
use crate::factors::{expect_at_least, select_factors, FactorSelection};
use crate::frame::{ensure_rows, PlotFrame};
use crate::model::LatentModel;
use crate::render::{draw_marker, draw_rect_outline};
use crate::scale::Scale;

#[cfg(feature = "config")]
use crate::config::PlotSettings;

const CELL_GAP: u32 = 8;
const FRAME_COLOR: Rgba = Rgba::rgb(200, 200, 200);

#[derive(Debug, Clone)]
struct Diagonal {
    edges: Vec<f32>,
    series: Vec<HistogramSeries>,
}

/// Builder for a scatterplot matrix over two or more factors.
#[derive(Clone)]
pub struct FactorPairs<'a> {
    model: &'a dyn LatentModel,
    factors: FactorSelection,
    color: AnnotationArg,
    shape: AnnotationArg,
    ambiguity: AmbiguityPolicy,
    show_missing: bool,
    bins: BinSpec,
    alpha: f32,
    point_size: u32,
    width: u32,
    height: u32,
    margin: u32,
}

impl<'a> FactorPairs<'a> {
    /// Create a pairs builder over `model` (all factors by default).
    #[must_use]
    pub fn new(model: &'a dyn LatentModel) -> Self {
        Self {
            model,
            factors: FactorSelection::All,
            color: AnnotationArg::default(),
            shape: AnnotationArg::default(),
            ambiguity: AmbiguityPolicy::default(),
            show_missing: true,
            bins: BinSpec::Count(20),
            alpha: 0.6,
            point_size: 2,
            width: 800,
            height: 800,
            margin: 30,
        }
    }

    /// Select factors (at least two).
    #[must_use]
    pub fn factors(mut self, factors: impl Into<FactorSelection>) -> Self {
        self.factors = factors.into();
        self
    }

    /// Color samples by an annotation.
    #[must_use]
    pub fn color_by(mut self, spec: impl Into<AnnotationSpec>) -> Self {
        self.color.spec = spec.into();
        self
    }

    /// Legend title for the color annotation.
    #[must_use]
    pub fn color_name(mut self, name: &str) -> Self {
        self.color.display_name = Some(name.to_string());
        self
    }

    /// Vary marker shape by an annotation.
    #[must_use]
    pub fn shape_by(mut self, spec: impl Into<AnnotationSpec>) -> Self {
        self.shape.spec = spec.into();
        self
    }

    /// Legend title for the shape annotation.
    #[must_use]
    pub fn shape_name(mut self, name: &str) -> Self {
        self.shape.display_name = Some(name.to_string());
        self
    }

    /// Policy for names found in several views.
    #[must_use]
    pub fn ambiguity(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity = policy;
        self
    }

    /// Keep samples with a missing color or shape value.
    #[must_use]
    pub fn show_missing(mut self, show: bool) -> Self {
        self.show_missing = show;
        self
    }

    /// Binning of the diagonal histograms.
    #[must_use]
    pub fn bins(mut self, bins: BinSpec) -> Self {
        self.bins = bins;
        self
    }

    /// Marker radius in pixels.
    #[must_use]
    pub fn point_size(mut self, size: u32) -> Self {
        self.point_size = size;
        self
    }

    /// Set the output dimensions.
    #[must_use]
    pub fn dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the margin around the grid.
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
        self.point_size = settings.point_size;
        self.bins = BinSpec::Count(settings.bins);
        self.alpha = settings.alpha;
        self.ambiguity = settings.ambiguity();
        if let Some(show) = settings.show_missing {
            self.show_missing = show;
        }
        self
    }

    /// Select factors, resolve annotations and bin the diagonals.
    ///
    /// # Errors
    ///
    /// Fails with fewer than two factors, on selection and resolution errors,
    /// or when the binning is invalid. A factor with no finite value gets an
    /// empty diagonal instead.
    pub fn build(self) -> Result<BuiltPairs> {
        let factors = select_factors(self.model, &self.factors)?;
        expect_at_least(&factors, 2)?;
        let color = self.color.resolve(self.model, Aesthetic::Color, self.ambiguity)?;
        let shape = self.shape.resolve(self.model, Aesthetic::Shape, self.ambiguity)?;

        let matrix = self.model.factors(&factors)?;
        let frame = PlotFrame::from_factors(&matrix)
            .join(&color)
            .join(&shape)
            .filter_missing(self.show_missing);
        ensure_rows(&frame)?;

        let palette = Palette::for_annotation(&color);
        let colors = frame.annotation_column(0).unwrap_or(&[]);
        let mut diagonals = Vec::with_capacity(factors.len());
        for f in 0..factors.len() {
            let Some(values) = frame.factor_at(f) else {
                diagonals.push(None);
                continue;
            };
            let diagonal = match bin_edges(values, self.bins) {
                Ok(edges) => {
                    let series = count_series(values, colors, &color, &palette, &edges);
                    Some(Diagonal { edges, series })
                }
                Err(Error::EmptyData) => None,
                Err(err) => return Err(err),
            };
            diagonals.push(diagonal);
        }
        debug!(factors = factors.len(), rows = frame.nrow(), "built pairs");

        Ok(BuiltPairs {
            frame,
            color,
            shape,
            palette,
            diagonals,
            alpha: self.alpha,
            point_size: self.point_size,
            width: self.width,
            height: self.height,
            margin: self.margin,
        })
    }
}

impl WithDimensions for FactorPairs<'_> {
    fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

/// A scatterplot matrix ready to render.
#[derive(Debug, Clone)]
pub struct BuiltPairs {
    frame: PlotFrame,
    color: ResolvedAnnotation,
    shape: ResolvedAnnotation,
    palette: Palette,
    diagonals: Vec<Option<Diagonal>>,
    alpha: f32,
    point_size: u32,
    width: u32,
    height: u32,
    margin: u32,
}

impl BuiltPairs {
    /// The joined and filtered frame.
    #[must_use]
    pub fn frame(&self) -> &PlotFrame {
        &self.frame
    }

    /// The resolved color annotation.
    #[must_use]
    pub fn color(&self) -> &ResolvedAnnotation {
        &self.color
    }

    /// The resolved shape annotation.
    #[must_use]
    pub fn shape(&self) -> &ResolvedAnnotation {
        &self.shape
    }

    /// Grid size (number of factors).
    #[must_use]
    pub fn size(&self) -> usize {
        self.frame.factor_names().len()
    }

    /// Histogram series of the diagonal cell for factor `factor`.
    ///
    /// `None` when the factor has no finite value.
    #[must_use]
    pub fn diagonal(&self, factor: usize) -> Option<&[HistogramSeries]> {
        self.diagonals.get(factor)?.as_ref().map(|d| d.series.as_slice())
    }

    /// Color and shape legend swatches.
    #[must_use]
    pub fn legend(&self) -> Vec<LegendEntry> {
        let mut entries = self.palette.legend();
        entries.extend(shape_legend(&self.shape));
        entries
    }

    /// Render into an existing framebuffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the plot area is degenerate.
    pub fn render(&self, fb: &mut Framebuffer) -> Result<()> {
        let legend = self.legend();
        let area = Panel::plot_area(self.width, self.height, self.margin, !legend.is_empty())?;
        let k = self.size();
        let radius = self.point_size as i32;
        let colors = self.frame.annotation_column(0).unwrap_or(&[]);
        let shapes = self.frame.annotation_column(1).unwrap_or(&[]);

        for row in 0..k {
            for col in 0..k {
                let cell = area.cell(row, col, k, CELL_GAP);
                let (cx, cy) = (cell.x as i32, cell.y as i32);
                draw_rect_outline(fb, cx, cy, cell.width, cell.height, FRAME_COLOR, 1);

                if row == col {
                    if let Some(Some(diag)) = self.diagonals.get(row) {
                        draw_bars(fb, cell, &diag.edges, &diag.series, self.alpha)?;
                    }
                    continue;
                }

                let (Some(xs), Some(ys)) = (self.frame.factor_at(col), self.frame.factor_at(row))
                else {
                    continue;
                };
                let (Some(x_scale), Some(y_scale)) = (cell.x_scale(xs), cell.y_scale(ys)) else {
                    continue;
                };
                for (i, (&x, &y)) in xs.iter().zip(ys).enumerate() {
                    if !(x.is_finite() && y.is_finite()) {
                        continue;
                    }
                    let color = colors.get(i).map_or(POINT, |v| self.palette.color(v));
                    let shape = shapes
                        .get(i)
                        .map_or_else(Default::default, |v| shape_of(&self.shape, v));
                    let (px, py) = (
                        x_scale.scale(x).round() as i32,
                        y_scale.scale(y).round() as i32,
                    );
                    draw_marker(fb, px, py, radius, shape, color);
                }
            }
        }

        draw_legend(fb, area, &legend, radius);
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
