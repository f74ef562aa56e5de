//! YAML plot settings.
//!
//! ```yaml
//! width: 1024
//! height: 768
//! bins: 40
//! show_missing: false
//! correlation: spearman
//! ```
//!
//! Every field is optional. Builders take settings through their
//! `apply_settings` methods; `show_missing` only overrides a chart's own
//! default when it is present.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::annotation::AmbiguityPolicy;
use crate::correlation::CorrelationMethod;
use crate::error::{Error, Result};
use crate::plots::MAX_BINS;

/// Shared chart options loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotSettings {
    /// Output width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Output height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,

    /// Marker radius in pixels.
    #[serde(default = "default_point_size")]
    pub point_size: u32,

    /// Fill opacity for overlapping histogram groups.
    #[serde(default = "default_alpha")]
    pub alpha: f32,

    /// Histogram bin count.
    #[serde(default = "default_bins")]
    pub bins: usize,

    /// Keep samples with missing annotation values. Unset keeps the chart default.
    #[serde(default)]
    pub show_missing: Option<bool>,

    /// Coefficient for correlation charts.
    #[serde(default)]
    pub correlation: CorrelationMethod,

    /// Fail instead of warning when a name matches features in several views.
    #[serde(default)]
    pub reject_ambiguous: bool,
}

fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    600
}
fn default_point_size() -> u32 {
    3
}
fn default_alpha() -> f32 {
    0.6
}
fn default_bins() -> usize {
    30
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            point_size: default_point_size(),
            alpha: default_alpha(),
            bins: default_bins(),
            show_missing: None,
            correlation: CorrelationMethod::default(),
            reject_ambiguous: false,
        }
    }
}

impl PlotSettings {
    /// Loads settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parses settings from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] with the failing line, or line 0 when a
    /// value is out of range.
    pub fn parse(yaml: &str) -> Result<Self> {
        let settings: Self = serde_yaml_ng::from_str(yaml).map_err(|e| {
            let line = e.location().map(|l| l.line()).unwrap_or(0);
            Error::Config {
                line,
                message: e.to_string(),
            }
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::Config { line: 0, message });
        if self.width == 0 || self.height == 0 {
            return invalid(format!(
                "dimensions must be positive, got {}x{}",
                self.width, self.height
            ));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return invalid(format!("alpha must be within 0..=1, got {}", self.alpha));
        }
        if self.bins == 0 || self.bins > MAX_BINS {
            return invalid(format!(
                "bins must be within 1..={MAX_BINS}, got {}",
                self.bins
            ));
        }
        Ok(())
    }

    /// Multi-view match policy implied by `reject_ambiguous`.
    #[must_use]
    pub fn ambiguity(&self) -> AmbiguityPolicy {
        if self.reject_ambiguous {
            AmbiguityPolicy::Reject
        } else {
            AmbiguityPolicy::FirstView
        }
    }
}
