//! Feature and property storage.

use std::collections::HashMap;

use super::catalog::{IdentifierCatalog, Recognition, RecognitionTable};
use super::types::PropertyValue;

/// Shared key-value store for features and properties.
///
/// The store records whatever it is given. Rejecting unknown or unsupported
/// identifiers is the controller's job, done with [`Self::check_feature`]
/// and [`Self::check_property`] before a value is stored.
#[derive(Debug, Default)]
pub struct Configuration {
    catalog: IdentifierCatalog,
    features: HashMap<String, bool>,
    properties: HashMap<String, PropertyValue>,
}

impl Configuration {
    /// Create an empty store recognizing the identifiers in `catalog`.
    #[must_use]
    pub fn new(catalog: IdentifierCatalog) -> Self {
        Self {
            catalog,
            features: HashMap::new(),
            properties: HashMap::new(),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &IdentifierCatalog {
        &self.catalog
    }

    /// Add a recognition layer that is consulted before the existing ones.
    pub fn extend_catalog(&mut self, table: RecognitionTable) {
        self.catalog.push_front(table);
    }

    #[must_use]
    pub fn check_feature(&self, id: &str) -> Recognition {
        self.catalog.check_feature(id)
    }

    #[must_use]
    pub fn check_property(&self, id: &str) -> Recognition {
        self.catalog.check_property(id)
    }

    /// Record a feature value.
    pub fn store_feature(&mut self, id: impl Into<String>, state: bool) {
        self.features.insert(id.into(), state);
    }

    /// Record a feature value unless one is already stored.
    ///
    /// Returns `true` when the value was written.
    pub fn store_feature_default(&mut self, id: &str, state: bool) -> bool {
        if self.features.contains_key(id) {
            return false;
        }
        self.features.insert(id.to_string(), state);
        true
    }

    /// Stored value of a feature, if any.
    #[must_use]
    pub fn feature(&self, id: &str) -> Option<bool> {
        self.features.get(id).copied()
    }

    /// Stored value of a feature, or `default` when none was stored.
    #[must_use]
    pub fn feature_or(&self, id: &str, default: bool) -> bool {
        self.feature(id).unwrap_or(default)
    }

    /// Record a property value, returning the one it replaces.
    pub fn store_property(
        &mut self,
        id: impl Into<String>,
        value: PropertyValue,
    ) -> Option<PropertyValue> {
        self.properties.insert(id.into(), value)
    }

    /// Remove a property value.
    pub fn remove_property(&mut self, id: &str) -> Option<PropertyValue> {
        self.properties.remove(id)
    }

    #[must_use]
    pub fn property(&self, id: &str) -> Option<&PropertyValue> {
        self.properties.get(id)
    }

    #[must_use]
    pub fn has_property(&self, id: &str) -> bool {
        self.properties.contains_key(id)
    }
}
