//! Factor selection shared by every entry point.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::LatentModel;

/// Which factors a plot should use.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FactorSelection {
    /// Every factor except the intercept.
    #[default]
    All,
    /// Factors by name, in the given order.
    Names(Vec<String>),
    /// Factors by 1-based index, not counting the intercept.
    Indices(Vec<usize>),
}

impl FactorSelection {
    /// Select factors by name.
    #[must_use]
    pub fn names(names: &[&str]) -> Self {
        FactorSelection::Names(names.iter().map(|s| (*s).to_string()).collect())
    }

    /// Select factors by 1-based index.
    #[must_use]
    pub fn indices(indices: &[usize]) -> Self {
        FactorSelection::Indices(indices.to_vec())
    }
}

impl From<&str> for FactorSelection {
    /// `"all"` selects every factor; anything else is a single name.
    fn from(name: &str) -> Self {
        if name == "all" {
            FactorSelection::All
        } else {
            FactorSelection::Names(vec![name.to_string()])
        }
    }
}

impl From<Vec<String>> for FactorSelection {
    fn from(names: Vec<String>) -> Self {
        FactorSelection::Names(names)
    }
}

impl From<usize> for FactorSelection {
    fn from(index: usize) -> Self {
        FactorSelection::Indices(vec![index])
    }
}

impl From<Vec<usize>> for FactorSelection {
    fn from(indices: Vec<usize>) -> Self {
        FactorSelection::Indices(indices)
    }
}

/// Resolve a selection to factor names in storage order of the request.
///
/// With an intercept, index `1` refers to storage position 1 (the first
/// non-intercept factor).
///
/// # Errors
///
/// - [`Error::UnknownFactor`] for an unknown name or out-of-range index.
/// - [`Error::InvalidSpecification`] for an empty selection or repeats.
pub fn select_factors<M: LatentModel + ?Sized>(
    model: &M,
    selection: &FactorSelection,
) -> Result<Vec<String>> {
    let names = model.factor_names();
    let offset = usize::from(model.has_intercept());

    let selected: Vec<String> = match selection {
        FactorSelection::All => {
            if offset == 1 {
                debug!(
                    intercept = ?model.intercept_name(),
                    "excluding intercept from factor selection"
                );
            }
            names.iter().skip(offset).cloned().collect()
        }
        FactorSelection::Names(requested) => requested
            .iter()
            .map(|name| {
                if names.contains(name) {
                    Ok(name.clone())
                } else {
                    Err(Error::UnknownFactor(name.clone()))
                }
            })
            .collect::<Result<_>>()?,
        FactorSelection::Indices(indices) => indices
            .iter()
            .map(|&i| {
                i.checked_add(offset)
                    .filter(|_| i >= 1)
                    .and_then(|pos| names.get(pos))
                    .cloned()
                    .ok_or_else(|| Error::UnknownFactor(format!("index {i}")))
            })
            .collect::<Result<_>>()?,
    };

    if selected.is_empty() {
        return Err(Error::InvalidSpecification(
            "no factors selected".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(selected.len());
    if let Some(dup) = selected.iter().find(|f| !seen.insert(f.as_str())) {
        return Err(Error::InvalidSpecification(format!(
            "factor '{dup}' selected more than once"
        )));
    }
    Ok(selected)
}

/// Require exactly `expected` factors.
pub(crate) fn expect_exactly(factors: &[String], expected: usize) -> Result<()> {
    if factors.len() == expected {
        Ok(())
    } else {
        Err(Error::FactorCount {
            expected: format!("exactly {expected}"),
            got: factors.len(),
        })
    }
}

/// Require at least `min` factors.
pub(crate) fn expect_at_least(factors: &[String], min: usize) -> Result<()> {
    if factors.len() >= min {
        Ok(())
    } else {
        Err(Error::FactorCount {
            expected: format!("at least {min}"),
            got: factors.len(),
        })
    }
}
