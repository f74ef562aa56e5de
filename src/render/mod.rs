//! Rasterization of chart primitives.
//!
//! Lines, rectangles and circles are the trueno-viz rasterizers
//! (Bresenham lines, midpoint circles). [`draw_marker`] builds the six
//! [`MarkerShape`]s of the shape aesthetic from them.

mod markers;

pub use markers::{blend_rect, count_color, draw_marker, MarkerShape};
pub use trueno_viz::render::{draw_circle, draw_line, draw_rect, draw_rect_outline};
