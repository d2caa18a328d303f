//! Values stored under property identifiers.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::components::{
    DatatypeValidatorFactoryRef, EntityResolverRef, ErrorHandlerRef, ErrorReporterRef,
    GrammarPoolRef, SymbolTableRef,
};
use crate::pipeline::{DocumentScannerRef, DtdScannerRef, EntityManagerRef, ValidatorRef};

/// A property value.
///
/// The registry stores these without inspecting them. Components read the
/// variant they expect at reset time; the assembler rejects a slot holding
/// the wrong variant.
#[derive(Clone)]
pub enum PropertyValue {
    Text(String),
    SymbolTable(SymbolTableRef),
    EntityManager(EntityManagerRef),
    ErrorReporter(ErrorReporterRef),
    GrammarPool(GrammarPoolRef),
    DatatypeValidatorFactory(DatatypeValidatorFactoryRef),
    EntityResolver(EntityResolverRef),
    ErrorHandler(ErrorHandlerRef),
    DocumentScanner(DocumentScannerRef),
    DtdScanner(DtdScannerRef),
    Validator(ValidatorRef),
    /// Opaque value for properties added by extension layers.
    Custom(Rc<dyn Any>),
}

impl PropertyValue {
    /// Variant name, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::SymbolTable(_) => "symbol table",
            Self::EntityManager(_) => "entity manager",
            Self::ErrorReporter(_) => "error reporter",
            Self::GrammarPool(_) => "grammar pool",
            Self::DatatypeValidatorFactory(_) => "datatype validator factory",
            Self::EntityResolver(_) => "entity resolver",
            Self::ErrorHandler(_) => "error handler",
            Self::DocumentScanner(_) => "document scanner",
            Self::DtdScanner(_) => "DTD scanner",
            Self::Validator(_) => "validator",
            Self::Custom(_) => "custom value",
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_symbol_table(&self) -> Option<&SymbolTableRef> {
        match self {
            Self::SymbolTable(table) => Some(table),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_entity_manager(&self) -> Option<&EntityManagerRef> {
        match self {
            Self::EntityManager(manager) => Some(manager),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_error_reporter(&self) -> Option<&ErrorReporterRef> {
        match self {
            Self::ErrorReporter(reporter) => Some(reporter),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_grammar_pool(&self) -> Option<&GrammarPoolRef> {
        match self {
            Self::GrammarPool(pool) => Some(pool),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_datatype_validator_factory(&self) -> Option<&DatatypeValidatorFactoryRef> {
        match self {
            Self::DatatypeValidatorFactory(factory) => Some(factory),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_entity_resolver(&self) -> Option<&EntityResolverRef> {
        match self {
            Self::EntityResolver(resolver) => Some(resolver),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_error_handler(&self) -> Option<&ErrorHandlerRef> {
        match self {
            Self::ErrorHandler(handler) => Some(handler),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_document_scanner(&self) -> Option<&DocumentScannerRef> {
        match self {
            Self::DocumentScanner(scanner) => Some(scanner),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_dtd_scanner(&self) -> Option<&DtdScannerRef> {
        match self {
            Self::DtdScanner(scanner) => Some(scanner),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_validator(&self) -> Option<&ValidatorRef> {
        match self {
            Self::Validator(validator) => Some(validator),
            _ => None,
        }
    }

    /// Downcast a custom value.
    #[must_use]
    pub fn downcast_custom<T: 'static>(&self) -> Option<&T> {
        match self {
            Self::Custom(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            other => write!(f, "PropertyValue({})", other.type_name()),
        }
    }
}

impl From<String> for PropertyValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for PropertyValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}
