//! # factor-viz
//!
//! Factor-level visualizations for trained multi-omics latent factor models.
//!
//! Given a model exposing inferred per-sample factor values, its training
//! views and optional covariates, factor-viz draws:
//!
//! - **Histograms** of one factor, grouped by a discrete annotation
//! - **Beeswarm plots** of one or more factors, colored by an annotation
//! - **Scatterplots** of two factors, with color and shape annotations
//! - **Pairwise scatterplot matrices** with per-factor histogram diagonals
//! - **Correlation heatmaps** of absolute factor correlations
//!
//! Every chart resolves its color, shape or group argument through the
//! [`annotation`] resolver, which accepts nothing, a feature or covariate
//! name, or one explicit value per sample.
//!
//! ## Quick Start
//!
//! ```
//! use factor_viz::prelude::*;
//!
//! let model = InMemoryModel::new()
//!     .samples(&["s1", "s2", "s3", "s4"])
//!     .factors(
//!         &["Factor1", "Factor2"],
//!         vec![0.3, -1.2, 1.1, 0.4, -0.7, 0.9, 0.2, -0.1],
//!     )
//!     .covariate("sex", vec!["F".into(), "M".into(), "M".into(), "F".into()])
//!     .build()
//!     .unwrap();
//!
//! let chart = FactorScatter::new(&model).color_by("sex").build().unwrap();
//! let fb = chart.to_framebuffer().unwrap();
//! let png = PngEncoder::to_bytes(&fb).unwrap();
//! assert!(!png.is_empty());
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel`: Parallel SIMD kernels through trueno
//! - `config`: YAML plot settings ([`config::PlotSettings`])
//! - `full`: All features enabled
//!
//! ## Logging
//!
//! Resolver and frame decisions are reported through `tracing`. The crate
//! never installs a subscriber.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
// Allow unwrap() in tests only - banned in production code
#![cfg_attr(test, allow(clippy::unwrap_used))]
// Allow common patterns in graphics/visualization code
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Core Modules
// ============================================================================

/// Chart colors and the categorical hue palette.
pub mod color;

/// Scale functions for data-to-visual mappings.
pub mod scale;

// ============================================================================
// Model and Data Modules
// ============================================================================

/// The model query interface and an in-memory implementation.
pub mod model;

/// Annotation specifications and their resolution against a model.
pub mod annotation;

/// Factor selection by name, index or "all".
pub mod factors;

/// Plot frames joining factor values with annotations.
pub mod frame;

/// Pairwise-complete factor correlation.
pub mod correlation;

// ============================================================================
// Visualization Modules
// ============================================================================

/// Chart entry points (histogram, beeswarm, scatter, pairs, correlation).
pub mod plots;

/// Rasterization primitives and marker shapes.
pub mod render;

/// YAML plot settings.
#[cfg(feature = "config")]
#[cfg_attr(docsrs, doc(cfg(feature = "config")))]
pub mod config;

// ============================================================================
// Error Types
// ============================================================================

/// Error types for factor-viz operations.
pub mod error;

pub use error::{Error, Result};

// ============================================================================
// Prelude
// ============================================================================

/// Commonly used types and traits for convenient imports.
///
/// ```rust
/// use factor_viz::prelude::*;
/// ```
pub mod prelude {
    pub use batuta_common::display::WithDimensions;
    pub use crate::annotation::{
        resolve, Aesthetic, AmbiguityPolicy, AnnotationResolver, AnnotationSpec, AnnotationValue,
        ResolvedAnnotation,
    };
    pub use crate::color::{Hsla, Rgba};
    pub use crate::correlation::{factor_correlation, CorrelationMatrix, CorrelationMethod};
    pub use crate::error::{Error, Result};
    pub use crate::factors::{select_factors, FactorSelection};
    pub use crate::frame::PlotFrame;
    pub use crate::model::{FactorMatrix, InMemoryModel, LatentModel, ViewTable};
    pub use crate::plots::{
        BinSpec, FactorBeeswarm, FactorCorrelation, FactorHistogram, FactorPairs, FactorScatter,
    };
    pub use crate::scale::{ColorScale, LinearScale, Scale};
    pub use trueno_viz::framebuffer::Framebuffer;
    pub use trueno_viz::output::{PngEncoder, SvgEncoder};

    #[cfg(feature = "config")]
    pub use crate::config::PlotSettings;
}

// ============================================================================
// Re-exports
// ============================================================================

/// Re-export trueno for direct access to SIMD operations.
pub use trueno;

/// Re-export trueno-viz for the framebuffer, encoders and primitives.
pub use trueno_viz;
