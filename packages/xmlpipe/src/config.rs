//! Identifier constants and defaults for the parser configuration.
//!
//! Features and properties are addressed by namespaced string identifiers.
//! Each identifier is an authority prefix followed by a suffix; the prefixes
//! partition recognition authority between the base standard and the
//! implementation-specific extensions.
//!
//! # Examples
//! ```
//! use xmlpipe::config::{features, split_identifier, SAX_FEATURE_PREFIX};
//!
//! assert_eq!(
//!     split_identifier(features::NAMESPACES),
//!     Some((SAX_FEATURE_PREFIX, "namespaces"))
//! );
//! ```

/// Prefix for base-standard features.
pub const SAX_FEATURE_PREFIX: &str = "http://xml.org/sax/features/";

/// Prefix for base-standard properties.
pub const SAX_PROPERTY_PREFIX: &str = "http://xml.org/sax/properties/";

/// Prefix for implementation-specific features.
pub const XMLPIPE_FEATURE_PREFIX: &str = "http://apache.org/xml/features/";

/// Prefix for implementation-specific properties.
pub const XMLPIPE_PROPERTY_PREFIX: &str = "http://apache.org/xml/properties/";

/// All authority prefixes. None is a prefix of another.
pub const PREFIXES: [&str; 4] = [
    SAX_FEATURE_PREFIX,
    SAX_PROPERTY_PREFIX,
    XMLPIPE_FEATURE_PREFIX,
    XMLPIPE_PROPERTY_PREFIX,
];

/// Full feature identifiers.
pub mod features {
    pub const VALIDATION: &str = "http://xml.org/sax/features/validation";
    pub const EXTERNAL_GENERAL_ENTITIES: &str =
        "http://xml.org/sax/features/external-general-entities";
    pub const EXTERNAL_PARAMETER_ENTITIES: &str =
        "http://xml.org/sax/features/external-parameter-entities";
    pub const NAMESPACES: &str = "http://xml.org/sax/features/namespaces";

    pub const SCHEMA_VALIDATION: &str = "http://apache.org/xml/features/validation/schema";
    pub const DYNAMIC_VALIDATION: &str = "http://apache.org/xml/features/validation/dynamic";
    pub const DEFAULT_ATTRIBUTE_VALUES: &str =
        "http://apache.org/xml/features/validation/default-attribute-values";
    pub const VALIDATE_CONTENT_MODELS: &str =
        "http://apache.org/xml/features/validation/validate-content-models";
    pub const LOAD_DTD_GRAMMAR: &str =
        "http://apache.org/xml/features/validation/nonvalidating/load-dtd-grammar";
    pub const LOAD_EXTERNAL_DTD: &str =
        "http://apache.org/xml/features/validation/nonvalidating/load-external-dtd";
    pub const VALIDATE_DATATYPES: &str =
        "http://apache.org/xml/features/validation/validate-datatypes";
    pub const WARN_ON_DUPLICATE_ATTDEF: &str =
        "http://apache.org/xml/features/validation/warn-on-duplicate-attdef";
    pub const WARN_ON_UNDECLARED_ELEMDEF: &str =
        "http://apache.org/xml/features/validation/warn-on-undeclared-elemdef";
    pub const ALLOW_IMPLEMENTATION_ENCODINGS: &str =
        "http://apache.org/xml/features/allow-implementation-specific-encodings";
    pub const CONTINUE_AFTER_FATAL_ERROR: &str =
        "http://apache.org/xml/features/continue-after-fatal-error";
}

/// Full property identifiers.
pub mod properties {
    pub const XML_STRING: &str = "http://xml.org/sax/properties/xml-string";
    pub const NAMESPACE_SEP: &str = "http://xml.org/sax/properties/namespace-sep";

    pub const SYMBOL_TABLE: &str = "http://apache.org/xml/properties/internal/symbol-table";
    pub const ENTITY_MANAGER: &str = "http://apache.org/xml/properties/internal/entity-manager";
    pub const ERROR_REPORTER: &str = "http://apache.org/xml/properties/internal/error-reporter";
    pub const GRAMMAR_POOL: &str = "http://apache.org/xml/properties/internal/grammar-pool";
    pub const DATATYPE_VALIDATOR_FACTORY: &str =
        "http://apache.org/xml/properties/internal/datatype-validator-factory";
    pub const ENTITY_RESOLVER: &str = "http://apache.org/xml/properties/internal/entity-resolver";
    pub const ERROR_HANDLER: &str = "http://apache.org/xml/properties/internal/error-handler";
    pub const DOCUMENT_SCANNER: &str =
        "http://apache.org/xml/properties/internal/document-scanner";
    pub const DTD_SCANNER: &str = "http://apache.org/xml/properties/internal/dtd-scanner";
    pub const VALIDATOR: &str = "http://apache.org/xml/properties/internal/validator";
}

/// Feature values stored by `initialize()` before any embedder override.
pub const DEFAULT_FEATURES: [(&str, bool); 4] = [
    (features::NAMESPACES, true),
    (features::VALIDATION, false),
    (features::EXTERNAL_GENERAL_ENTITIES, true),
    (features::EXTERNAL_PARAMETER_ENTITIES, true),
];

/// Pipeline feature values stored when the component slots are resolved.
pub const PIPELINE_DEFAULT_FEATURES: [(&str, bool); 1] = [(features::LOAD_EXTERNAL_DTD, true)];

/// Default locale for reported messages.
pub const DEFAULT_LOCALE: &str = "en";

/// Split an identifier into its authority prefix and suffix.
///
/// Returns `None` when the identifier does not start with a known prefix.
pub fn split_identifier(id: &str) -> Option<(&'static str, &str)> {
    PREFIXES
        .iter()
        .find_map(|prefix| id.strip_prefix(prefix).map(|suffix| (*prefix, suffix)))
}
