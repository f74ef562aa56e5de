//! Chart colors.
//!
//! [`Rgba`] and [`Hsla`] come from trueno-viz. This module adds the fixed
//! colors for unannotated and missing samples and the evenly spaced hue
//! palette used for categorical annotations.

pub use trueno_viz::color::{Hsla, Rgba};

/// Neutral grey used for samples with a missing annotation.
pub const MISSING: Rgba = Rgba::rgb(190, 190, 190);

/// Default point color when no color annotation is mapped.
pub const POINT: Rgba = Rgba::rgb(40, 40, 40);

/// `n` colors with evenly spaced hues, starting at 15 degrees.
///
/// Adjacent levels sit far apart on the color wheel and all share one
/// lightness.
#[must_use]
pub fn hue_palette(n: usize) -> Vec<Rgba> {
    if n == 0 {
        return Vec::new();
    }
    let step = 360.0 / n as f32;
    (0..n)
        .map(|i| {
            let hue = (15.0 + step * i as f32).rem_euclid(360.0);
            Hsla::hsl(hue, 0.65, 0.55).to_rgba()
        })
        .collect()
}
