//! Feature-name index over the training views.

use std::collections::HashMap;

use crate::model::ViewTable;

/// Position of a feature row inside the training data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureLocation {
    /// Index of the view in declared view order.
    pub view: usize,
    /// Row of the feature inside that view.
    pub row: usize,
}

/// Maps feature names to every (view, row) where they occur.
///
/// Locations are stored in declared view order, so the first location of a
/// name is always the first view that contains it.
#[derive(Debug, Clone, Default)]
pub struct FeatureIndex {
    locations: HashMap<String, Vec<FeatureLocation>>,
}

impl FeatureIndex {
    /// Index every feature row of `views`.
    #[must_use]
    pub fn build(views: &[ViewTable]) -> Self {
        let mut locations: HashMap<String, Vec<FeatureLocation>> = HashMap::new();
        for (view, table) in views.iter().enumerate() {
            for (row, feature) in table.features().iter().enumerate() {
                let entry = locations.entry(feature.clone()).or_default();
                // a repeated name inside one view keeps its first row
                if entry.last().map_or(true, |loc| loc.view != view) {
                    entry.push(FeatureLocation { view, row });
                }
            }
        }
        Self { locations }
    }

    /// All locations of `name`, one per view, in declared view order.
    #[must_use]
    pub fn lookup(&self, name: &str) -> &[FeatureLocation] {
        self.locations.get(name).map_or(&[], Vec::as_slice)
    }

    /// Number of distinct feature names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether no features were indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
