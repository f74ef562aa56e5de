//! Scatterplot of two factors with optional color and shape annotations.

use batuta_common::display::WithDimensions;
use tracing::debug;
use trueno_viz::framebuffer::Framebuffer;

use super::{draw_legend, shape_legend, shape_of, AnnotationArg, LegendEntry, Palette, Panel};
use crate::annotation::{
    Aesthetic, AmbiguityPolicy, AnnotationSpec, AnnotationValue, ResolvedAnnotation,
};
use crate::color::{Rgba, POINT};
use crate::error::{Error, Result};
use crate::factors::{expect_exactly, select_factors, FactorSelection};
use crate::frame::{ensure_rows, PlotFrame};
use crate::model::LatentModel;
use crate::render::draw_marker;
use crate::scale::Scale;

#[cfg(feature = "config")]
use crate::config::PlotSettings;

/// Builder for a two-factor scatterplot.
///
/// Samples with a missing annotation value are kept by default and drawn
/// in grey.
#[derive(Clone)]
pub struct FactorScatter<'a> {
    model: &'a dyn LatentModel,
    factors: FactorSelection,
    color: AnnotationArg,
    shape: AnnotationArg,
    ambiguity: AmbiguityPolicy,
    show_missing: bool,
    point_size: u32,
    width: u32,
    height: u32,
    margin: u32,
}

impl<'a> FactorScatter<'a> {
    /// Create a scatter builder over `model`.
    #[must_use]
    pub fn new(model: &'a dyn LatentModel) -> Self {
        Self {
            model,
            factors: FactorSelection::indices(&[1, 2]),
            color: AnnotationArg::default(),
            shape: AnnotationArg::default(),
            ambiguity: AmbiguityPolicy::default(),
            show_missing: true,
            point_size: 3,
            width: 800,
            height: 600,
            margin: 40,
        }
    }

    /// Select the two factors (x, then y).
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
        self.point_size = settings.point_size;
        self.ambiguity = settings.ambiguity();
        if let Some(show) = settings.show_missing {
            self.show_missing = show;
        }
        self
    }

    /// Select the factors, resolve annotations and assemble the frame.
    ///
    /// # Errors
    ///
    /// Fails unless exactly two factors are selected, or when an annotation
    /// cannot be resolved.
    pub fn build(self) -> Result<BuiltScatter> {
        let factors = select_factors(self.model, &self.factors)?;
        expect_exactly(&factors, 2)?;
        let color = self.color.resolve(self.model, Aesthetic::Color, self.ambiguity)?;
        let shape = self.shape.resolve(self.model, Aesthetic::Shape, self.ambiguity)?;

        let matrix = self.model.factors(&factors)?;
        let frame = PlotFrame::from_factors(&matrix)
            .join(&color)
            .join(&shape)
            .filter_missing(self.show_missing);
        ensure_rows(&frame)?;
        debug!(x = %factors[0], y = %factors[1], rows = frame.nrow(), "built scatter");

        Ok(BuiltScatter {
            palette: Palette::for_annotation(&color),
            frame,
            color,
            shape,
            point_size: self.point_size,
            width: self.width,
            height: self.height,
            margin: self.margin,
        })
    }
}

impl WithDimensions for FactorScatter<'_> {
    fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

/// A scatterplot ready to render.
#[derive(Debug, Clone)]
pub struct BuiltScatter {
    frame: PlotFrame,
    color: ResolvedAnnotation,
    shape: ResolvedAnnotation,
    palette: Palette,
    point_size: u32,
    width: u32,
    height: u32,
    margin: u32,
}

impl BuiltScatter {
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

    /// Number of drawable points (both coordinates finite).
    #[must_use]
    pub fn point_count(&self) -> usize {
        match (self.frame.factor_at(0), self.frame.factor_at(1)) {
            (Some(x), Some(y)) => x
                .iter()
                .zip(y)
                .filter(|(a, b)| a.is_finite() && b.is_finite())
                .count(),
            _ => 0,
        }
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
    /// Returns an error if the plot area is degenerate or no point is finite.
    pub fn render(&self, fb: &mut Framebuffer) -> Result<()> {
        let legend = self.legend();
        let area = Panel::plot_area(self.width, self.height, self.margin, !legend.is_empty())?;
        let (xs, ys) = self
            .frame
            .factor_at(0)
            .zip(self.frame.factor_at(1))
            .ok_or(Error::EmptyData)?;
        let x_scale = area.x_scale(xs).ok_or(Error::EmptyData)?;
        let y_scale = area.y_scale(ys).ok_or(Error::EmptyData)?;

        let colors = self.frame.annotation_column(0).unwrap_or(&[]);
        let shapes = self.frame.annotation_column(1).unwrap_or(&[]);
        let radius = self.point_size as i32;

        area.draw_axes(fb);
        for row in 0..self.frame.nrow() {
            let (x, y) = (xs[row], ys[row]);
            if !(x.is_finite() && y.is_finite()) {
                continue;
            }
            let color = colors.get(row).map_or(POINT, |v| self.palette.color(v));
            let shape = shapes
                .get(row)
                .map_or_else(Default::default, |v| shape_of(&self.shape, v));
            let (px, py) = (
                x_scale.scale(x).round() as i32,
                y_scale.scale(y).round() as i32,
            );
            draw_marker(fb, px, py, radius, shape, color);
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

    /// Value of the color annotation for row `row` of the frame.
    #[must_use]
    pub fn color_value(&self, row: usize) -> Option<&AnnotationValue> {
        self.frame.annotation_column(0).and_then(|c| c.get(row))
    }
}
