//! Scale functions for data-to-visual mappings.
//!
//! Continuous scales come from trueno-viz. Factor values routinely carry
//! `NaN` for samples missing in a group, so extents here skip non-finite
//! values, and categorical annotations get a [`DiscreteScale`].

use crate::color::{hue_palette, Rgba, MISSING};
use crate::error::{Error, Result};

pub use trueno_viz::scale::{ColorScale, LinearScale, Scale};

/// Finite extent of `data`, ignoring `NaN` and infinities.
#[must_use]
pub fn finite_extent(data: &[f32]) -> Option<(f32, f32)> {
    let mut finite = data.iter().copied().filter(|v| v.is_finite()).peekable();
    finite.peek()?;
    Some(finite.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    }))
}

/// Widen a degenerate extent so it can back a scale.
#[must_use]
pub fn pad_extent((min, max): (f32, f32)) -> (f32, f32) {
    if (max - min).abs() < f32::EPSILON {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    }
}

/// Linear scale over the finite extent of `data`.
///
/// Constant data is padded by 0.5 on each side; `None` if nothing is finite.
#[must_use]
pub fn linear_from_data(data: &[f32], range: (f32, f32)) -> Option<LinearScale> {
    let extent = pad_extent(finite_extent(data)?);
    LinearScale::new(extent, range).ok()
}

/// Discrete scale mapping level indices to palette colors.
#[derive(Debug, Clone)]
pub struct DiscreteScale {
    colors: Vec<Rgba>,
}

impl DiscreteScale {
    /// Hue palette with one color per level.
    ///
    /// # Errors
    ///
    /// Returns an error if `levels` is zero.
    pub fn hue(levels: usize) -> Result<Self> {
        if levels == 0 {
            return Err(Error::ScaleDomain(
                "Discrete scale requires at least one level".to_string(),
            ));
        }
        Ok(Self {
            colors: hue_palette(levels),
        })
    }

    /// Number of levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Whether the scale has no levels (never true for a constructed scale).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Scale<usize, Rgba> for DiscreteScale {
    fn scale(&self, level: usize) -> Rgba {
        self.colors.get(level).copied().unwrap_or(MISSING)
    }

    fn domain(&self) -> (usize, usize) {
        (0, self.colors.len().saturating_sub(1))
    }

    fn range(&self) -> (Rgba, Rgba) {
        (
            *self.colors.first().unwrap_or(&MISSING),
            *self.colors.last().unwrap_or(&MISSING),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_extent_skips_nan_and_infinity() {
        let extent = finite_extent(&[f32::NAN, -2.0, f32::INFINITY, 5.0]);
        assert_eq!(extent, Some((-2.0, 5.0)));
        assert_eq!(finite_extent(&[f32::NAN]), None);
        assert_eq!(finite_extent(&[]), None);
    }

    #[test]
    fn test_pad_extent() {
        assert_eq!(pad_extent((3.0, 3.0)), (2.5, 3.5));
        assert_eq!(pad_extent((1.0, 4.0)), (1.0, 4.0));
    }

    #[test]
    fn test_linear_from_data_skips_nan() {
        let scale =
            linear_from_data(&[0.0, f32::NAN, 100.0], (0.0, 1.0)).expect("finite values present");
        assert_eq!(scale.domain(), (0.0, 100.0));
        assert!((scale.scale(50.0) - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_linear_from_constant_data_is_padded() {
        let scale = linear_from_data(&[3.0, 3.0], (0.0, 1.0)).expect("padded domain");
        assert_eq!(scale.domain(), (2.5, 3.5));
    }

    #[test]
    fn test_linear_from_data_empty() {
        assert!(linear_from_data(&[], (0.0, 1.0)).is_none());
        assert!(linear_from_data(&[f32::NAN], (0.0, 1.0)).is_none());
    }

    #[test]
    fn test_discrete_scale() {
        let scale = DiscreteScale::hue(3).expect("three levels");
        assert_eq!(scale.len(), 3);
        assert_eq!(scale.domain(), (0, 2));
        assert_ne!(scale.scale(0), scale.scale(1));
        assert_eq!(scale.scale(99), MISSING);
        assert!(DiscreteScale::hue(0).is_err());
    }
}
