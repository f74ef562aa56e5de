//! Beeswarm plot: one panel per factor, points spread sideways so they do
//! not overlap.

use batuta_common::display::WithDimensions;
use tracing::debug;
use trueno_viz::framebuffer::Framebuffer;

use super::{draw_legend, shape_legend, shape_of, AnnotationArg, LegendEntry, Palette, Panel};
use crate::annotation::{Aesthetic, AmbiguityPolicy, AnnotationSpec, ResolvedAnnotation};
use crate::color::{Rgba, POINT};
use crate::error::Result;
use crate::factors::{select_factors, FactorSelection};
use crate::frame::{ensure_rows, PlotFrame};
use crate::model::LatentModel;
use crate::render::{draw_line, draw_marker};
use crate::scale::Scale;

#[cfg(feature = "config")]
use crate::config::PlotSettings;

const PANEL_GAP: u32 = 12;
const CENTER_LINE: Rgba = Rgba::rgb(225, 225, 225);

/// A placed point of the swarm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwarmPoint {
    /// Row index into the frame.
    pub sample: usize,
    /// Factor column index into the frame.
    pub factor: usize,
    /// Factor value.
    pub value: f32,
    /// Horizontal slot: 0 on the panel center line, negative to the left.
    pub slot: i32,
}

/// Assign horizontal slots to points at pixel heights `ys`.
///
/// Points are placed in ascending order; each takes the slot nearest the
/// center (0, 1, -1, 2, -2, ...) whose position keeps it at least
/// `diameter` away from every point already placed.
#[must_use]
pub fn swarm_offsets(ys: &[f32], diameter: f32) -> Vec<i32> {
    let mut order: Vec<usize> = (0..ys.len()).collect();
    order.sort_by(|&a, &b| ys[a].total_cmp(&ys[b]));

    let min_dist_sq = diameter * diameter;
    let mut slots = vec![0; ys.len()];
    let mut placed: Vec<(f32, i32)> = Vec::with_capacity(ys.len());

    for &idx in &order {
        let y = ys[idx];
        // only recent points can be within one diameter vertically
        let neighbours: Vec<(f32, i32)> = placed
            .iter()
            .rev()
            .take_while(|(py, _)| y - py < diameter)
            .copied()
            .collect();

        let slot = (0..)
            .flat_map(|k: i32| if k == 0 { vec![0] } else { vec![k, -k] })
            .find(|&candidate| {
                neighbours.iter().all(|&(py, ps)| {
                    let dx = (candidate - ps) as f32 * diameter;
                    let dy = y - py;
                    dx * dx + dy * dy >= min_dist_sq
                })
            })
            .unwrap_or(0);

        slots[idx] = slot;
        placed.push((y, slot));
    }
    slots
}

/// Builder for a beeswarm over one or more factors.
///
/// Points can be colored and shaped by annotations; samples missing either
/// annotation are dropped unless [`show_missing`](Self::show_missing) is set.
#[derive(Clone)]
pub struct FactorBeeswarm<'a> {
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

impl<'a> FactorBeeswarm<'a> {
    /// Create a beeswarm builder over `model` (all factors by default).
    #[must_use]
    pub fn new(model: &'a dyn LatentModel) -> Self {
        Self {
            model,
            factors: FactorSelection::All,
            color: AnnotationArg::default(),
            shape: AnnotationArg::default(),
            ambiguity: AmbiguityPolicy::default(),
            show_missing: false,
            point_size: 3,
            width: 800,
            height: 600,
            margin: 40,
        }
    }

    /// Select factors.
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
        self.point_size = size.max(1);
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
        self.point_size = settings.point_size.max(1);
        self.ambiguity = settings.ambiguity();
        if let Some(show) = settings.show_missing {
            self.show_missing = show;
        }
        self
    }

    /// Select factors, resolve the annotations and lay out the swarm.
    ///
    /// # Errors
    ///
    /// Fails on selection or resolution errors, when every sample is
    /// filtered out, or when the output is too small for the margins.
    pub fn build(self) -> Result<BuiltBeeswarm> {
        let factors = select_factors(self.model, &self.factors)?;
        let color = self.color.resolve(self.model, Aesthetic::Color, self.ambiguity)?;
        let shape = self.shape.resolve(self.model, Aesthetic::Shape, self.ambiguity)?;

        let matrix = self.model.factors(&factors)?;
        let frame = PlotFrame::from_factors(&matrix)
            .join(&color)
            .join(&shape)
            .filter_missing(self.show_missing);
        ensure_rows(&frame)?;

        let palette = Palette::for_annotation(&color);
        let has_legend = !palette.legend().is_empty() || shape.show_legend();
        let area = Panel::plot_area(self.width, self.height, self.margin, has_legend)?;
        let panels = area.columns(factors.len(), PANEL_GAP);
        let diameter = (2 * self.point_size) as f32;

        let long = frame.to_long();
        let mut points = Vec::with_capacity(long.len());
        for (factor, panel) in panels.iter().enumerate() {
            let rows: Vec<_> = long.factor_rows(factor).copied().collect();
            let values: Vec<f32> = rows.iter().map(|r| r.value).collect();
            let Some(y_scale) = panel.y_scale(&values) else {
                continue;
            };
            let ys: Vec<f32> = values.iter().map(|&v| y_scale.scale(v)).collect();
            for (row, slot) in rows.iter().zip(swarm_offsets(&ys, diameter)) {
                points.push(SwarmPoint {
                    sample: row.sample,
                    factor: row.factor,
                    value: row.value,
                    slot,
                });
            }
        }
        debug!(factors = factors.len(), points = points.len(), "built beeswarm");

        Ok(BuiltBeeswarm {
            frame,
            color,
            shape,
            palette,
            points,
            panels,
            area,
            point_size: self.point_size,
            width: self.width,
            height: self.height,
        })
    }
}

impl WithDimensions for FactorBeeswarm<'_> {
    fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

/// A beeswarm ready to render.
#[derive(Debug, Clone)]
pub struct BuiltBeeswarm {
    frame: PlotFrame,
    color: ResolvedAnnotation,
    shape: ResolvedAnnotation,
    palette: Palette,
    points: Vec<SwarmPoint>,
    panels: Vec<Panel>,
    area: Panel,
    point_size: u32,
    width: u32,
    height: u32,
}

impl BuiltBeeswarm {
    /// The filtered wide frame.
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

    /// Placed points, grouped by factor.
    #[must_use]
    pub fn points(&self) -> &[SwarmPoint] {
        &self.points
    }

    /// Number of factor panels.
    #[must_use]
    pub fn panel_count(&self) -> usize {
        self.panels.len()
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
    /// Never fails for a built chart; kept fallible for parity with other charts.
    pub fn render(&self, fb: &mut Framebuffer) -> Result<()> {
        let radius = self.point_size as i32;
        let diameter = 2 * radius;
        let colors = self.frame.annotation_column(0).unwrap_or(&[]);
        let shapes = self.frame.annotation_column(1).unwrap_or(&[]);

        for (factor, panel) in self.panels.iter().enumerate() {
            let center = (panel.x + panel.width / 2) as i32;
            let (top, bottom) = (panel.y as i32, panel.bottom() as i32);
            draw_line(fb, center, top, center, bottom, CENTER_LINE);
            panel.draw_axes(fb);

            let Some(values) = self.frame.factor_at(factor) else {
                continue;
            };
            let Some(y_scale) = panel.y_scale(values) else {
                continue;
            };
            for p in self.points.iter().filter(|p| p.factor == factor) {
                let color = colors
                    .get(p.sample)
                    .map_or(POINT, |v| self.palette.color(v));
                let shape = shapes
                    .get(p.sample)
                    .map_or_else(Default::default, |v| shape_of(&self.shape, v));
                let x = center + p.slot * diameter;
                let y = y_scale.scale(p.value).round() as i32;
                draw_marker(fb, x, y, radius, shape, color);
            }
        }

        draw_legend(fb, self.area, &self.legend(), radius);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationValue;
    use crate::error::Error;
    use crate::model::InMemoryModel;
    use crate::render::{count_color, MarkerShape};

    fn model() -> InMemoryModel {
        InMemoryModel::new()
            .samples(&["a", "b", "c", "d", "e"])
            .factors(
                &["Factor1", "Factor2"],
                vec![0.0, 5.0, 0.0, 4.0, 0.0, 3.0, 1.0, 2.0, 2.0, f32::NAN],
            )
            .covariate(
                "condition",
                vec![
                    "ctrl".into(),
                    "ctrl".into(),
                    "treat".into(),
                    AnnotationValue::Missing,
                    "treat".into(),
                ],
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_swarm_offsets_spread_ties() {
        let slots = swarm_offsets(&[10.0, 10.0, 10.0], 4.0);
        let mut sorted = slots.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![-1, 0, 1]);
    }

    #[test]
    fn test_swarm_offsets_separated_points_stay_centered() {
        assert_eq!(swarm_offsets(&[0.0, 10.0, 20.0], 4.0), vec![0, 0, 0]);
    }

    #[test]
    fn test_swarm_offsets_respect_distance() {
        let ys = [0.0, 1.0, 2.0, 2.5, 9.0, 9.2];
        let d = 3.0;
        let slots = swarm_offsets(&ys, d);
        for i in 0..ys.len() {
            for j in (i + 1)..ys.len() {
                let dx = (slots[i] - slots[j]) as f32 * d;
                let dy = ys[i] - ys[j];
                assert!(dx * dx + dy * dy >= d * d - 1e-4, "points {i} and {j} overlap");
            }
        }
    }

    #[test]
    fn test_one_panel_per_factor_and_nan_skipped() {
        let m = model();
        let chart = FactorBeeswarm::new(&m).build().unwrap();
        assert_eq!(chart.panel_count(), 2);
        assert_eq!(chart.points().iter().filter(|p| p.factor == 1).count(), 4);
        // three tied zeros in Factor1 must not share a slot
        let mut zero_slots: Vec<i32> = chart
            .points()
            .iter()
            .filter(|p| p.factor == 0 && p.value == 0.0)
            .map(|p| p.slot)
            .collect();
        zero_slots.sort_unstable();
        zero_slots.dedup();
        assert_eq!(zero_slots.len(), 3);
    }

    #[test]
    fn test_drops_missing_color_by_default() {
        let m = model();
        let chart = FactorBeeswarm::new(&m).color_by("condition").build().unwrap();
        assert_eq!(chart.frame().nrow(), 4);
        assert_eq!(chart.legend().len(), 2);

        let kept = FactorBeeswarm::new(&m)
            .color_by("condition")
            .show_missing(true)
            .build()
            .unwrap();
        assert_eq!(kept.frame().nrow(), 5);
    }

    #[test]
    fn test_unknown_factor() {
        let m = model();
        let err = FactorBeeswarm::new(&m)
            .factors("Factor7")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::UnknownFactor(_)));
    }

    #[test]
    fn test_render() {
        let m = model();
        let fb = FactorBeeswarm::new(&m)
            .dimensions(240, 160)
            .margin(10)
            .build()
            .unwrap()
            .to_framebuffer()
            .unwrap();
        assert!(count_color(&fb, POINT) > 0);
    }

    #[test]
    fn test_shape_annotation_adds_legend_and_filters() {
        let m = model();
        let chart = FactorBeeswarm::new(&m)
            .color_by("condition")
            .shape_by("condition")
            .shape_name("Condition")
            .build()
            .unwrap();
        assert_eq!(chart.shape().name(), "Condition");
        let legend = chart.legend();
        assert_eq!(legend.len(), 4);
        assert_eq!(legend[2].shape, Some(MarkerShape::Circle));
        assert_eq!(legend[3].shape, Some(MarkerShape::Triangle));
        assert_eq!(chart.frame().nrow(), 4);
    }

    #[test]
    fn test_shape_levels_limit() {
        let m = InMemoryModel::new()
            .samples(&["a", "b", "c", "d", "e", "f", "g"])
            .factors(&["F1"], vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .build()
            .unwrap();
        let seven = AnnotationSpec::labels(&["1", "2", "3", "4", "5", "6", "7"]);
        let err = FactorBeeswarm::new(&m).shape_by(seven).build().unwrap_err();
        assert!(matches!(err, Error::TooManyShapeLevels { levels: 7, max: 6 }));
    }

    #[test]
    fn test_render_draws_shaped_markers() {
        let m = model();
        let chart = FactorBeeswarm::new(&m)
            .factors("Factor2")
            .shape_by(AnnotationSpec::labels(&["p", "q", "p", "q", "p"]))
            .dimensions(200, 160)
            .margin(10)
            .point_size(4)
            .build()
            .unwrap();
        let fb = chart.to_framebuffer().unwrap();
        assert!(count_color(&fb, POINT) > 0);
        assert_eq!(chart.legend().len(), 2);
    }
}
