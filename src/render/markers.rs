//! Point markers for the shape aesthetic, plus raster helpers the charts
//! need on top of the trueno-viz primitives.

use trueno_viz::framebuffer::Framebuffer;
use trueno_viz::render::{draw_circle, draw_line, draw_rect};

use crate::color::Rgba;

/// Point marker shapes available to the shape aesthetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerShape {
    /// Filled circle.
    #[default]
    Circle,
    /// Filled triangle (apex up).
    Triangle,
    /// Filled square.
    Square,
    /// Plus sign.
    Cross,
    /// Diagonal cross.
    X,
    /// Filled diamond.
    Diamond,
}

impl MarkerShape {
    /// Every shape, in the order assigned to categorical levels.
    pub const ALL: [MarkerShape; 6] = [
        MarkerShape::Circle,
        MarkerShape::Triangle,
        MarkerShape::Square,
        MarkerShape::Cross,
        MarkerShape::X,
        MarkerShape::Diamond,
    ];

    /// Shape for the `level`-th categorical level (wraps past the end).
    #[must_use]
    pub fn for_level(level: usize) -> Self {
        Self::ALL[level % Self::ALL.len()]
    }
}

/// Draw a point marker centered at (`cx`, `cy`).
pub fn draw_marker(
    fb: &mut Framebuffer,
    cx: i32,
    cy: i32,
    radius: i32,
    shape: MarkerShape,
    color: Rgba,
) {
    let r = radius.max(1);
    match shape {
        MarkerShape::Circle => draw_circle(fb, cx, cy, r, color),
        MarkerShape::Square => {
            let side = (2 * r) as u32;
            draw_rect(fb, cx - r, cy - r, side, side, color);
        }
        MarkerShape::Triangle => {
            for dy in -r..=r {
                // half-width grows linearly from apex (dy = -r) to base (dy = r)
                let half = (dy + r) / 2;
                fill_span(fb, cx - half, cx + half, cy + dy, color);
            }
        }
        MarkerShape::Diamond => {
            for dy in -r..=r {
                let half = r - dy.abs();
                fill_span(fb, cx - half, cx + half, cy + dy, color);
            }
        }
        MarkerShape::Cross => {
            let t = (r / 3).max(1);
            let arm = (2 * r + 1) as u32;
            draw_rect(fb, cx - r, cy - t / 2, arm, t as u32, color);
            draw_rect(fb, cx - t / 2, cy - r, t as u32, arm, color);
        }
        MarkerShape::X => {
            let spread = (r / 4).max(0);
            for offset in -spread..=spread {
                draw_line(fb, cx - r + offset, cy - r, cx + r + offset, cy + r, color);
                draw_line(fb, cx - r + offset, cy + r, cx + r + offset, cy - r, color);
            }
        }
    }
}

/// Alpha-blend a filled rectangle, clipped to the framebuffer.
pub fn blend_rect(fb: &mut Framebuffer, x: u32, y: u32, w: u32, h: u32, color: Rgba) {
    let x_end = x.saturating_add(w).min(fb.width());
    let y_end = y.saturating_add(h).min(fb.height());
    for py in y..y_end {
        for px in x..x_end {
            fb.blend_pixel(px, py, color);
        }
    }
}

/// Number of pixels exactly equal to `color`.
#[must_use]
pub fn count_color(fb: &Framebuffer, color: Rgba) -> usize {
    (0..fb.height())
        .flat_map(|y| (0..fb.width()).map(move |x| (x, y)))
        .filter(|&(x, y)| fb.get_pixel(x, y) == Some(color))
        .count()
}

#[inline]
fn fill_span(fb: &mut Framebuffer, x1: i32, x2: i32, y: i32, color: Rgba) {
    if y < 0 || y >= fb.height() as i32 {
        return;
    }

    let x_start = x1.max(0) as u32;
    let x_end = (x2 + 1).max(0).min(fb.width() as i32) as u32;

    if x_start < x_end {
        fb.fill_rect(x_start, y as u32, x_end - x_start, 1, color);
    }
}
