//! Factor correlation heatmap.
//!
//! Cells show absolute correlations on a sequential blue scale from 0 to 1.
//! Undefined coefficients (constant factors, too few complete pairs) are
//! drawn in the missing-value grey.

use batuta_common::display::WithDimensions;
use trueno_viz::framebuffer::Framebuffer;
use trueno_viz::output::{SvgEncoder, TextAnchor};

use super::Panel;
use crate::color::{Rgba, MISSING};
use crate::correlation::{factor_correlation, CorrelationMatrix, CorrelationMethod};
use crate::error::{Error, Result};
use crate::factors::FactorSelection;
use crate::model::LatentModel;
use crate::scale::{ColorScale, Scale};

#[cfg(feature = "config")]
use crate::config::PlotSettings;

const LABEL_COLOR: Rgba = Rgba::rgb(30, 30, 30);

/// Builder for a factor correlation heatmap.
#[derive(Clone)]
pub struct FactorCorrelation<'a> {
    model: &'a dyn LatentModel,
    factors: FactorSelection,
    method: CorrelationMethod,
    width: u32,
    height: u32,
    margin: u32,
    show_borders: bool,
    border_color: Rgba,
}

impl<'a> FactorCorrelation<'a> {
    /// Create a correlation builder over `model` (all factors by default).
    #[must_use]
    pub fn new(model: &'a dyn LatentModel) -> Self {
        Self {
            model,
            factors: FactorSelection::All,
            method: CorrelationMethod::default(),
            width: 600,
            height: 600,
            margin: 60,
            show_borders: true,
            border_color: Rgba::rgb(200, 200, 200),
        }
    }

    /// Select factors. The intercept is always excluded.
    #[must_use]
    pub fn factors(mut self, factors: impl Into<FactorSelection>) -> Self {
        self.factors = factors.into();
        self
    }

    /// Set the correlation coefficient.
    #[must_use]
    pub fn method(mut self, method: CorrelationMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the output dimensions.
    #[must_use]
    pub fn dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the margin reserved for labels.
    #[must_use]
    pub fn margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    /// Enable or disable cell borders.
    #[must_use]
    pub fn borders(mut self, show: bool) -> Self {
        self.show_borders = show;
        self
    }

    /// Apply shared plot settings.
    #[cfg(feature = "config")]
    #[must_use]
    pub fn apply_settings(mut self, settings: &PlotSettings) -> Self {
        self.set_dimensions(settings.width, settings.height);
        self.method = settings.correlation;
        self
    }

    /// Compute the absolute correlation matrix.
    ///
    /// # Errors
    ///
    /// Fails on selection errors or when only the intercept was selected.
    pub fn build(self) -> Result<BuiltCorrelation> {
        let matrix = factor_correlation(self.model, &self.factors, self.method)?;
        Ok(BuiltCorrelation {
            matrix,
            width: self.width,
            height: self.height,
            margin: self.margin,
            show_borders: self.show_borders,
            border_color: self.border_color,
        })
    }
}

impl WithDimensions for FactorCorrelation<'_> {
    fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

/// A correlation heatmap ready to render.
#[derive(Debug, Clone)]
pub struct BuiltCorrelation {
    matrix: CorrelationMatrix,
    width: u32,
    height: u32,
    margin: u32,
    show_borders: bool,
    border_color: Rgba,
}

impl BuiltCorrelation {
    /// The absolute correlation matrix.
    #[must_use]
    pub fn matrix(&self) -> &CorrelationMatrix {
        &self.matrix
    }

    fn color_scale() -> Result<ColorScale> {
        ColorScale::blues((0.0, 1.0))
            .ok_or_else(|| Error::ScaleDomain("correlation color scale".to_string()))
    }

    fn cell_color(scale: &ColorScale, value: f32) -> Rgba {
        if value.is_nan() {
            MISSING
        } else {
            scale.scale(value.clamp(0.0, 1.0))
        }
    }

    fn grid(&self) -> Result<(Panel, u32, u32)> {
        let area = Panel::plot_area(self.width, self.height, self.margin, false)?;
        let k = self.matrix.size().max(1) as u32;
        Ok((area, (area.width / k).max(1), (area.height / k).max(1)))
    }

    /// Render into an existing framebuffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the plot area is degenerate.
    pub fn render(&self, fb: &mut Framebuffer) -> Result<()> {
        let scale = Self::color_scale()?;
        let (area, cell_w, cell_h) = self.grid()?;
        let k = self.matrix.size();

        for row in 0..k {
            for col in 0..k {
                let value = self.matrix.get(row, col).unwrap_or(f32::NAN);
                let x = area.x + col as u32 * cell_w;
                let y = area.y + row as u32 * cell_h;
                fb.fill_rect(x, y, cell_w, cell_h, Self::cell_color(&scale, value));

                if self.show_borders {
                    fb.fill_rect(x + cell_w - 1, y, 1, cell_h, self.border_color);
                    fb.fill_rect(x, y + cell_h - 1, cell_w, 1, self.border_color);
                }
            }
        }
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

    /// Vector rendering with factor labels and cell values.
    ///
    /// # Errors
    ///
    /// Returns an error if the plot area is degenerate.
    pub fn to_svg(&self) -> Result<SvgEncoder> {
        let scale = Self::color_scale()?;
        let (area, cell_w, cell_h) = self.grid()?;
        let (cw, ch) = (cell_w as f32, cell_h as f32);
        let font = (ch * 0.3).clamp(8.0, 14.0);
        let mut svg = SvgEncoder::new(self.width, self.height);

        let (left, top) = (area.x as f32, area.y as f32);
        for (i, name) in self.matrix.names().iter().enumerate() {
            let offset = i as f32 + 0.5;
            svg = svg
                .text_anchored(
                    left - 4.0,
                    top + offset * ch,
                    name,
                    font,
                    LABEL_COLOR,
                    TextAnchor::End,
                )
                .text_anchored(
                    left + offset * cw,
                    top - 6.0,
                    name,
                    font,
                    LABEL_COLOR,
                    TextAnchor::Middle,
                );
        }

        let k = self.matrix.size();
        for row in 0..k {
            for col in 0..k {
                let value = self.matrix.get(row, col).unwrap_or(f32::NAN);
                let (x, y) = (left + col as f32 * cw, top + row as f32 * ch);
                svg = svg.rect(x, y, cw, ch, Self::cell_color(&scale, value));
                let label = if value.is_nan() {
                    "NA".to_string()
                } else {
                    format!("{value:.2}")
                };
                let fill = if value > 0.6 { Rgba::WHITE } else { LABEL_COLOR };
                let (cx, cy) = (x + cw / 2.0, y + ch / 2.0);
                svg = svg.text_anchored(cx, cy, &label, font, fill, TextAnchor::Middle);
            }
        }
        Ok(svg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InMemoryModel;
    use crate::render::count_color;

    fn model() -> InMemoryModel {
        InMemoryModel::new()
            .samples(&["a", "b", "c", "d"])
            .factors(
                &["intercept", "Factor1", "Factor2", "Factor3"],
                vec![
                    1.0, 1.0, 2.0, 5.0, 1.0, 2.0, 4.0, 5.0, 1.0, 3.0, 6.0, 5.0, 1.0, 4.0, 8.0,
                    5.0,
                ],
            )
            .intercept(true)
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_excludes_intercept() {
        let m = model();
        let chart = FactorCorrelation::new(&m).build().unwrap();
        assert_eq!(chart.matrix().size(), 3);
        assert!(!chart.matrix().names().iter().any(|n| n == "intercept"));
        assert!(chart.matrix().is_symmetric(1e-6));
    }

    #[test]
    fn test_constant_factor_is_undefined() {
        let m = model();
        let chart = FactorCorrelation::new(&m).build().unwrap();
        assert!(chart.matrix().get_by_name("Factor3", "Factor1").unwrap().is_nan());
    }

    #[test]
    fn test_render_and_svg() {
        let m = model();
        let chart = FactorCorrelation::new(&m)
            .dimensions(200, 200)
            .margin(20)
            .build()
            .unwrap();
        let fb = chart.to_framebuffer().unwrap();
        assert!(count_color(&fb, MISSING) > 0);

        let out = chart.to_svg().unwrap().render();
        // background plus 9 cells; 3 x 2 factor labels plus 9 value labels
        assert_eq!(out.matches("<rect").count(), 1 + 9);
        assert_eq!(out.matches("<text").count(), 6 + 9);
        assert!(out.contains("Factor2"));
        assert!(out.contains("1.00"));
        assert!(out.contains("NA"));
    }

    #[test]
    fn test_only_intercept_fails() {
        let m = model();
        let err = FactorCorrelation::new(&m)
            .factors("intercept")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::FactorCount { got: 0, .. }));
    }
}
