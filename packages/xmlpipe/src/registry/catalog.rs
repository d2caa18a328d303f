//! Closed tables of recognized feature and property identifiers.
//!
//! A [`RecognitionTable`] lists the identifiers one layer of the parser knows
//! about. An [`IdentifierCatalog`] stacks layers: the first layer that knows
//! an identifier decides its outcome, and a miss falls through to the next
//! layer. Extensions add a layer in front instead of restating the base set.

use std::collections::HashSet;

use crate::config::{
    split_identifier, SAX_FEATURE_PREFIX, SAX_PROPERTY_PREFIX, XMLPIPE_FEATURE_PREFIX,
    XMLPIPE_PROPERTY_PREFIX,
};
use crate::error::{ParserError, Result};

/// Identifier space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    Feature,
    Property,
}

impl IdentifierKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Property => "property",
        }
    }
}

/// Whether a known identifier can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    Supported,
    Unsupported,
}

/// Outcome of checking an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recognition {
    /// Known and usable.
    Supported,
    /// Known, but reserved or not implemented.
    Unsupported,
    /// Not in any table.
    Unrecognized,
}

impl Recognition {
    /// Convert the outcome into the parser's error taxonomy.
    ///
    /// # Errors
    /// `UnsupportedIdentifier` or `UnrecognizedIdentifier` for the two
    /// rejecting outcomes.
    pub fn into_result(self, id: &str) -> Result<()> {
        match self {
            Self::Supported => Ok(()),
            Self::Unsupported => Err(ParserError::UnsupportedIdentifier(id.to_string())),
            Self::Unrecognized => Err(ParserError::UnrecognizedIdentifier(id.to_string())),
        }
    }
}

impl From<Support> for Recognition {
    fn from(support: Support) -> Self {
        match support {
            Support::Supported => Self::Supported,
            Support::Unsupported => Self::Unsupported,
        }
    }
}

/// One known identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub kind: IdentifierKind,
    pub prefix: &'static str,
    pub suffix: String,
    pub support: Support,
}

impl TableEntry {
    /// The full identifier, prefix and suffix joined.
    #[must_use]
    pub fn identifier(&self) -> String {
        format!("{}{}", self.prefix, self.suffix)
    }
}

/// The identifiers known to one layer of the parser.
#[derive(Debug, Clone)]
pub struct RecognitionTable {
    name: String,
    entries: Vec<TableEntry>,
}

impl RecognitionTable {
    /// Create an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Add a feature entry.
    #[must_use]
    pub fn feature(mut self, prefix: &'static str, suffix: &str, support: Support) -> Self {
        self.entries.push(TableEntry {
            kind: IdentifierKind::Feature,
            prefix,
            suffix: suffix.to_string(),
            support,
        });
        self
    }

    /// Add a property entry.
    #[must_use]
    pub fn property(mut self, prefix: &'static str, suffix: &str, support: Support) -> Self {
        self.entries.push(TableEntry {
            kind: IdentifierKind::Property,
            prefix,
            suffix: suffix.to_string(),
            support,
        });
        self
    }

    /// Table name, used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    /// Look up an identifier in this table only.
    ///
    /// Returns `None` when the table does not know the identifier.
    #[must_use]
    pub fn lookup(&self, kind: IdentifierKind, id: &str) -> Option<Support> {
        let (prefix, suffix) = split_identifier(id)?;
        self.entries
            .iter()
            .find(|e| e.kind == kind && e.prefix == prefix && e.suffix == suffix)
            .map(|e| e.support)
    }

    /// Identifiers every parser recognizes.
    #[must_use]
    pub fn base() -> Self {
        use Support::{Supported, Unsupported};

        Self::new("base")
            // Base-standard features
            .feature(SAX_FEATURE_PREFIX, "validation", Supported)
            .feature(SAX_FEATURE_PREFIX, "external-general-entities", Supported)
            .feature(SAX_FEATURE_PREFIX, "external-parameter-entities", Supported)
            .feature(SAX_FEATURE_PREFIX, "namespaces", Supported)
            // Extension features
            .feature(XMLPIPE_FEATURE_PREFIX, "validation/schema", Supported)
            .feature(XMLPIPE_FEATURE_PREFIX, "validation/dynamic", Supported)
            .feature(XMLPIPE_FEATURE_PREFIX, "validation/default-attribute-values", Unsupported)
            .feature(XMLPIPE_FEATURE_PREFIX, "validation/validate-content-models", Unsupported)
            .feature(XMLPIPE_FEATURE_PREFIX, "validation/nonvalidating/load-dtd-grammar", Supported)
            .feature(XMLPIPE_FEATURE_PREFIX, "validation/validate-datatypes", Unsupported)
            .feature(XMLPIPE_FEATURE_PREFIX, "validation/warn-on-duplicate-attdef", Supported)
            .feature(XMLPIPE_FEATURE_PREFIX, "validation/warn-on-undeclared-elemdef", Supported)
            .feature(XMLPIPE_FEATURE_PREFIX, "allow-implementation-specific-encodings", Supported)
            .feature(XMLPIPE_FEATURE_PREFIX, "continue-after-fatal-error", Supported)
            // Base-standard properties
            .property(SAX_PROPERTY_PREFIX, "xml-string", Unsupported)
            .property(SAX_PROPERTY_PREFIX, "namespace-sep", Unsupported)
            // Extension properties
            .property(XMLPIPE_PROPERTY_PREFIX, "internal/symbol-table", Supported)
            .property(XMLPIPE_PROPERTY_PREFIX, "internal/entity-manager", Supported)
            .property(XMLPIPE_PROPERTY_PREFIX, "internal/error-reporter", Supported)
            .property(XMLPIPE_PROPERTY_PREFIX, "internal/grammar-pool", Supported)
            .property(XMLPIPE_PROPERTY_PREFIX, "internal/datatype-validator-factory", Supported)
            .property(XMLPIPE_PROPERTY_PREFIX, "internal/entity-resolver", Supported)
            .property(XMLPIPE_PROPERTY_PREFIX, "internal/error-handler", Supported)
    }

    /// Identifiers added by the scanner/validator pipeline.
    #[must_use]
    pub fn pipeline() -> Self {
        use Support::Supported;

        Self::new("pipeline")
            .feature(
                XMLPIPE_FEATURE_PREFIX,
                "validation/nonvalidating/load-external-dtd",
                Supported,
            )
            .property(XMLPIPE_PROPERTY_PREFIX, "internal/document-scanner", Supported)
            .property(XMLPIPE_PROPERTY_PREFIX, "internal/dtd-scanner", Supported)
            .property(XMLPIPE_PROPERTY_PREFIX, "internal/validator", Supported)
    }
}

/// Ordered stack of recognition tables.
#[derive(Debug, Clone, Default)]
pub struct IdentifierCatalog {
    layers: Vec<RecognitionTable>,
}

impl IdentifierCatalog {
    /// Create a catalog with no layers; it recognizes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding only the base table.
    #[must_use]
    pub fn base() -> Self {
        Self {
            layers: vec![RecognitionTable::base()],
        }
    }

    /// Catalog used by [`crate::XmlParser`]: pipeline layer over the base table.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            layers: vec![RecognitionTable::pipeline(), RecognitionTable::base()],
        }
    }

    /// Put a layer in front of the existing ones, so it is consulted first.
    pub fn push_front(&mut self, table: RecognitionTable) {
        self.layers.insert(0, table);
    }

    #[must_use]
    pub fn layers(&self) -> &[RecognitionTable] {
        &self.layers
    }

    /// Check an identifier against every layer in order.
    #[must_use]
    pub fn check(&self, kind: IdentifierKind, id: &str) -> Recognition {
        self.layers
            .iter()
            .find_map(|layer| layer.lookup(kind, id))
            .map_or(Recognition::Unrecognized, Recognition::from)
    }

    #[must_use]
    pub fn check_feature(&self, id: &str) -> Recognition {
        self.check(IdentifierKind::Feature, id)
    }

    #[must_use]
    pub fn check_property(&self, id: &str) -> Recognition {
        self.check(IdentifierKind::Property, id)
    }

    /// Every identifier the catalog knows, with the outcome that wins.
    ///
    /// Order follows the layers; an identifier shadowed by an earlier layer
    /// is listed once.
    #[must_use]
    pub fn known(&self) -> Vec<TableEntry> {
        let mut seen = HashSet::new();
        self.layers
            .iter()
            .flat_map(|layer| layer.entries().iter())
            .filter(|entry| seen.insert((entry.kind, entry.identifier())))
            .cloned()
            .collect()
    }
}
