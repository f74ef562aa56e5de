//! Error types for factor-viz operations.

use std::io;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving annotations, assembling frames or rendering.
#[derive(Error, Debug)]
pub enum Error {
    /// Annotation argument shape not recognized, or length mismatch against sample count.
    #[error("Invalid specification: {0}")]
    InvalidSpecification(String),

    /// Requested factor name or index is not present in the model.
    #[error("Unknown factor: {0}")]
    UnknownFactor(String),

    /// Shape annotation has more distinct values than there are marker shapes.
    #[error("Too many shape levels: {levels} distinct values, at most {max} supported")]
    TooManyShapeLevels {
        /// Distinct non-missing values found.
        levels: usize,
        /// Largest number of levels the renderer can draw.
        max: usize,
    },

    /// Annotation name matches features in more than one view.
    #[error("Ambiguous annotation name '{name}': found in views {views:?}")]
    AmbiguousAnnotationName {
        /// The annotation name.
        name: String,
        /// Views containing a feature with that name, in declared order.
        views: Vec<String>,
    },

    /// A chart received the wrong number of factors.
    #[error("Expected {expected} factor(s), got {got}")]
    FactorCount {
        /// Human-readable expectation (e.g. "exactly 2", "at least 2").
        expected: String,
        /// Number of factors supplied.
        got: usize,
    },

    /// I/O error (file operations, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Rendering-layer error (framebuffer allocation, PNG encoding).
    #[error(transparent)]
    Render(#[from] trueno_viz::Error),

    /// Invalid dimensions for framebuffer or plot.
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Width value.
        width: u32,
        /// Height value.
        height: u32,
    },

    /// Data length mismatch between two parallel arrays.
    #[error("Data length mismatch: x has {x_len} elements, y has {y_len} elements")]
    DataLengthMismatch {
        /// Length of x data.
        x_len: usize,
        /// Length of y data.
        y_len: usize,
    },

    /// Empty data provided where non-empty is required.
    #[error("Empty data provided")]
    EmptyData,

    /// Scale domain error (e.g., equal min and max).
    #[error("Scale domain error: {0}")]
    ScaleDomain(String),

    /// Plot settings could not be read or parsed.
    #[error("Configuration error at line {line}: {message}")]
    Config {
        /// Line number where the error occurred (1-indexed, 0 if unknown).
        line: usize,
        /// Parser message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidDimensions {
            width: 0,
            height: 100,
        };
        assert!(err.to_string().contains("Invalid dimensions"));
    }

    #[test]
    fn test_too_many_shape_levels_display() {
        let err = Error::TooManyShapeLevels { levels: 7, max: 6 };
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains('6'));
    }

    #[test]
    fn test_ambiguous_name_lists_views() {
        let err = Error::AmbiguousAnnotationName {
            name: "TP53".to_string(),
            views: vec!["mRNA".to_string(), "Mutations".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("TP53"));
        assert!(msg.contains("Mutations"));
    }

    #[test]
    fn test_factor_count_display() {
        let err = Error::FactorCount {
            expected: "exactly 2".to_string(),
            got: 3,
        };
        assert!(err.to_string().contains("exactly 2"));
    }

    #[test]
    fn test_render_error_converts() {
        let err: Error = trueno_viz::Error::EmptyData.into();
        assert!(matches!(err, Error::Render(_)));
        assert!(err.to_string().contains("Empty data"));
    }
}
